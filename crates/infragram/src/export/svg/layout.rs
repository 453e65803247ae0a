//! Nested-box layout for the native SVG exporter.
//!
//! Clusters are laid out recursively. Inside a cluster its own nodes form
//! one stack across the layout direction, followed by its child clusters
//! side by side along the layout direction. The result is not a layered
//! graph layout, but it keeps every cluster boundary intact and is fully
//! determined by the model order.

use infragram_core::{
    diagram::{ClusterTree, DiagramModel},
    render::Direction,
};

/// Points per inch, used to convert preset spacing to SVG units.
const PX_PER_INCH: f32 = 72.0;
/// Average glyph width as a fraction of the font size.
const CHAR_WIDTH: f32 = 0.6;
const LINE_HEIGHT: f32 = 1.2;
const NODE_PADDING: f32 = 12.0;
const CLUSTER_PADDING: f32 = 16.0;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn midpoint(self, other: Point) -> Self {
        Self::new((self.x + other.x) / 2.0, (self.y + other.y) / 2.0)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Size {
    pub width: f32,
    pub height: f32,
}

impl Size {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    pub fn add_padding(self, padding: f32) -> Self {
        Self {
            width: self.width + padding * 2.0,
            height: self.height + padding * 2.0,
        }
    }
}

/// An axis-aligned rectangle.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Bounds {
    pub min_x: f32,
    pub min_y: f32,
    pub max_x: f32,
    pub max_y: f32,
}

impl Bounds {
    pub fn new(origin: Point, size: Size) -> Self {
        Self {
            min_x: origin.x,
            min_y: origin.y,
            max_x: origin.x + size.width,
            max_y: origin.y + size.height,
        }
    }

    pub fn width(&self) -> f32 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f32 {
        self.max_y - self.min_y
    }

    pub fn center(&self) -> Point {
        Point::new(
            (self.min_x + self.max_x) / 2.0,
            (self.min_y + self.max_y) / 2.0,
        )
    }

    pub fn contains(&self, other: &Bounds) -> bool {
        self.min_x <= other.min_x
            && self.min_y <= other.min_y
            && self.max_x >= other.max_x
            && self.max_y >= other.max_y
    }

    /// Where the segment from the center towards `external` leaves the
    /// rectangle.
    pub fn boundary_towards(&self, external: Point) -> Point {
        let center = self.center();
        let dx = external.x - center.x;
        let dy = external.y - center.y;
        if dx == 0.0 && dy == 0.0 {
            return center;
        }

        let scale_x = if dx == 0.0 {
            f32::INFINITY
        } else {
            (self.width() / 2.0) / dx.abs()
        };
        let scale_y = if dy == 0.0 {
            f32::INFINITY
        } else {
            (self.height() / 2.0) / dy.abs()
        };
        let scale = scale_x.min(scale_y);

        Point::new(center.x + dx * scale, center.y + dy * scale)
    }
}

/// A drawn cluster frame.
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterBox {
    pub name: String,
    pub bounds: Bounds,
    pub depth: usize,
}

/// Positions of every node and cluster frame of a model.
#[derive(Debug, Clone, PartialEq)]
pub struct Layout {
    /// Node rectangles, indexed like [`DiagramModel::nodes`].
    pub nodes: Vec<Bounds>,
    /// Cluster frames, parents before children.
    pub clusters: Vec<ClusterBox>,
    pub size: Size,
}

/// Approximate size of a block of text.
pub fn text_size(text: &str, font_size: f32) -> Size {
    let lines: Vec<&str> = text.lines().collect();
    let longest = lines.iter().map(|l| l.chars().count()).max().unwrap_or(0);
    Size::new(
        longest as f32 * font_size * CHAR_WIDTH,
        lines.len().max(1) as f32 * font_size * LINE_HEIGHT,
    )
}

/// Lay out `model` with its top-left corner at `origin`.
pub fn layout(model: &DiagramModel, origin: Point) -> Layout {
    let metrics = model.config().metrics();
    let engine = Engine {
        axis: Axis(model.config().direction()),
        node_sizes: model
            .nodes()
            .iter()
            .map(|node| text_size(&node.display_label(), metrics.node_font).add_padding(NODE_PADDING))
            .collect(),
        node_gap: metrics.node_sep * PX_PER_INCH / 2.0,
        rank_gap: metrics.rank_sep * PX_PER_INCH / 2.0,
        header: metrics.node_font * LINE_HEIGHT,
    };

    let tree = model.cluster_tree();
    let size = engine.measure(&tree);
    let mut result = Layout {
        nodes: vec![Bounds::default(); model.nodes().len()],
        clusters: Vec::new(),
        size,
    };
    engine.place(&tree, origin, 0, &mut result);
    result
}

/// Maps (main, cross) coordinates to (x, y) for a layout direction.
#[derive(Debug, Clone, Copy)]
struct Axis(Direction);

impl Axis {
    fn main(self, size: Size) -> f32 {
        match self.0 {
            Direction::LeftToRight => size.width,
            Direction::TopToBottom => size.height,
        }
    }

    fn cross(self, size: Size) -> f32 {
        match self.0 {
            Direction::LeftToRight => size.height,
            Direction::TopToBottom => size.width,
        }
    }

    fn size(self, main: f32, cross: f32) -> Size {
        match self.0 {
            Direction::LeftToRight => Size::new(main, cross),
            Direction::TopToBottom => Size::new(cross, main),
        }
    }

    fn offset(self, origin: Point, main: f32, cross: f32) -> Point {
        match self.0 {
            Direction::LeftToRight => Point::new(origin.x + main, origin.y + cross),
            Direction::TopToBottom => Point::new(origin.x + cross, origin.y + main),
        }
    }
}

struct Engine {
    axis: Axis,
    node_sizes: Vec<Size>,
    node_gap: f32,
    rank_gap: f32,
    header: f32,
}

impl Engine {
    /// Size of the stack of nodes placed directly in `tree`.
    fn stack_size(&self, tree: &ClusterTree) -> Size {
        let sizes = tree.nodes().iter().map(|&i| self.node_sizes[i]);
        let main = sizes.clone().map(|s| self.axis.main(s)).fold(0.0, f32::max);
        let cross: f32 = sizes.map(|s| self.axis.cross(s)).sum::<f32>()
            + self.node_gap * tree.nodes().len().saturating_sub(1) as f32;
        self.axis.size(main, cross)
    }

    fn content_size(&self, tree: &ClusterTree) -> Size {
        let stack = self.stack_size(tree);
        let mut parts: Vec<Size> = Vec::new();
        if !tree.nodes().is_empty() {
            parts.push(stack);
        }
        parts.extend(tree.children().iter().map(|child| self.measure(child)));

        let main: f32 = parts.iter().map(|s| self.axis.main(*s)).sum::<f32>()
            + self.rank_gap * parts.len().saturating_sub(1) as f32;
        let cross = parts.iter().map(|s| self.axis.cross(*s)).fold(0.0, f32::max);
        self.axis.size(main, cross)
    }

    /// Outer size of `tree`, including its frame when it is a named cluster.
    fn measure(&self, tree: &ClusterTree) -> Size {
        let content = self.content_size(tree);
        match tree.name() {
            None => content,
            Some(name) => {
                let label = text_size(name, self.header / LINE_HEIGHT);
                let padded = content.add_padding(CLUSTER_PADDING);
                Size::new(
                    padded.width.max(label.width + 2.0 * CLUSTER_PADDING),
                    padded.height + self.header,
                )
            }
        }
    }

    fn place(&self, tree: &ClusterTree, origin: Point, depth: usize, out: &mut Layout) {
        let content_origin = match tree.name() {
            None => origin,
            Some(name) => {
                out.clusters.push(ClusterBox {
                    name: name.to_string(),
                    bounds: Bounds::new(origin, self.measure(tree)),
                    depth,
                });
                Point::new(
                    origin.x + CLUSTER_PADDING,
                    origin.y + CLUSTER_PADDING + self.header,
                )
            }
        };

        let mut main_cursor = 0.0;
        if !tree.nodes().is_empty() {
            let stack_main = self.axis.main(self.stack_size(tree));
            let mut cross_cursor = 0.0;
            for &index in tree.nodes() {
                let size = self.node_sizes[index];
                let centered = (stack_main - self.axis.main(size)) / 2.0;
                let position = self.axis.offset(content_origin, centered, cross_cursor);
                out.nodes[index] = Bounds::new(position, size);
                cross_cursor += self.axis.cross(size) + self.node_gap;
            }
            main_cursor = stack_main + self.rank_gap;
        }

        let child_depth = if tree.name().is_some() { depth + 1 } else { depth };
        for child in tree.children() {
            let position = self.axis.offset(content_origin, main_cursor, 0.0);
            self.place(child, position, child_depth, out);
            main_cursor += self.axis.main(self.measure(child)) + self.rank_gap;
        }
    }
}
