//! Native SVG export.

mod layout;

use log::debug;
use svg::{
    Document,
    node::{Text as SvgText, element as svg_element},
};

use infragram_core::{
    diagram::{DiagramModel, DiagramNode},
    relationship::RelationshipKind,
    render::OutputFormat,
};

use self::layout::{Bounds, Point, Size, text_size};
use super::{Error, Exporter, edge_color};

const FONT_FAMILY: &str = "Helvetica, Arial, sans-serif";
const MARGIN: f32 = 50.0;

pub struct SvgExporter;

impl Exporter for SvgExporter {
    fn format(&self) -> OutputFormat {
        OutputFormat::Svg
    }

    fn export(&self, model: &DiagramModel) -> Result<Vec<u8>, Error> {
        let doc = render(model);
        debug!(nodes = model.nodes().len(); "SVG document rendered");

        let mut bytes = Vec::new();
        svg::write(&mut bytes, &doc)?;
        Ok(bytes)
    }
}

/// Draw `model` into an SVG document.
pub fn render(model: &DiagramModel) -> Document {
    let metrics = model.config().metrics();
    let title_height = metrics.title_font * 2.0;
    let title_on_top = model.config().title_on_top();

    let content_origin = Point::new(
        MARGIN,
        MARGIN + if title_on_top { title_height } else { 0.0 },
    );
    let layout = layout::layout(model, content_origin);

    let title_width = text_size(model.title(), metrics.title_font).width;
    let size = Size::new(
        layout.size.width.max(title_width) + MARGIN * 2.0,
        layout.size.height + title_height + MARGIN * 2.0,
    );

    let mut doc = Document::new()
        .set("viewBox", format!("0 0 {} {}", size.width, size.height))
        .set("width", size.width)
        .set("height", size.height)
        .add(
            svg_element::Rectangle::new()
                .set("width", "100%")
                .set("height", "100%")
                .set("fill", "white"),
        );

    let mut defs = svg_element::Definitions::new();
    for kind in RelationshipKind::ALL {
        if model.edges().iter().any(|e| e.kind() == kind) {
            defs = defs.add(arrow_marker(kind));
        }
    }
    doc = doc.add(defs);

    let title_y = if title_on_top {
        MARGIN + title_height / 2.0
    } else {
        size.height - MARGIN - title_height / 2.0
    };
    doc = doc.add(
        svg_element::Text::new("")
            .set("x", size.width / 2.0)
            .set("y", title_y)
            .set("text-anchor", "middle")
            .set("dominant-baseline", "middle")
            .set("font-family", FONT_FAMILY)
            .set("font-size", metrics.title_font)
            .set("font-weight", "bold")
            .add(SvgText::new(model.title())),
    );

    for cluster in &layout.clusters {
        doc = doc.add(render_cluster(&cluster.name, &cluster.bounds, metrics.node_font));
    }

    for edge in model.edges() {
        // Endpoints are validated by the model.
        let (Some(source), Some(target)) = (
            model.node_index(edge.source()),
            model.node_index(edge.target()),
        ) else {
            continue;
        };
        let (source, target) = (&layout.nodes[source], &layout.nodes[target]);
        let start = source.boundary_towards(target.center());
        let end = target.boundary_towards(source.center());

        let mut path = svg_element::Path::new()
            .set("d", format!("M {} {} L {} {}", start.x, start.y, end.x, end.y))
            .set("fill", "none")
            .set("stroke", edge_color(edge.kind()))
            .set("stroke-width", 1.5)
            .set("marker-end", format!("url(#{})", marker_id(edge.kind())));
        if let Some(dasharray) = edge.style().dasharray() {
            path = path.set("stroke-dasharray", dasharray);
        }

        let mut group = svg_element::Group::new().add(path);
        if !edge.label().is_empty() {
            group = group.add(render_label(edge.label(), start.midpoint(end), metrics.edge_font));
        }
        doc = doc.add(group);
    }

    for (node, bounds) in model.nodes().iter().zip(&layout.nodes) {
        doc = doc.add(render_node(node, bounds, metrics.node_font));
    }

    doc
}

fn render_cluster(name: &str, bounds: &Bounds, font_size: f32) -> svg_element::Group {
    svg_element::Group::new()
        .add(
            svg_element::Rectangle::new()
                .set("x", bounds.min_x)
                .set("y", bounds.min_y)
                .set("width", bounds.width())
                .set("height", bounds.height())
                .set("fill", "#f8f9fa")
                .set("fill-opacity", 0.6)
                .set("stroke", "#6c757d")
                .set("rx", 8.0),
        )
        .add(
            svg_element::Text::new("")
                .set("x", bounds.min_x + 10.0)
                .set("y", bounds.min_y + font_size)
                .set("font-family", FONT_FAMILY)
                .set("font-size", font_size)
                .set("font-weight", "bold")
                .add(SvgText::new(name)),
        )
}

fn render_node(node: &DiagramNode, bounds: &Bounds, font_size: f32) -> svg_element::Group {
    let style = node.style();
    let mut rect = svg_element::Rectangle::new()
        .set("x", bounds.min_x)
        .set("y", bounds.min_y)
        .set("width", bounds.width())
        .set("height", bounds.height())
        .set("fill", &style.fill)
        .set("stroke", &style.border)
        .set("stroke-width", 1.5)
        .set("rx", 6.0);
    if let Some(dasharray) = style.stroke.dasharray() {
        rect = rect.set("stroke-dasharray", dasharray);
    }

    let label = node.display_label();
    let lines: Vec<&str> = label.lines().collect();
    let line_height = font_size * 1.2;
    let center = bounds.center();
    let top = center.y - line_height * (lines.len() as f32 - 1.0) / 2.0;

    let mut text = svg_element::Text::new("")
        .set("text-anchor", "middle")
        .set("dominant-baseline", "central")
        .set("font-family", FONT_FAMILY)
        .set("font-size", font_size);
    for (i, line) in lines.into_iter().enumerate() {
        text = text.add(
            svg_element::TSpan::new("")
                .set("x", center.x)
                .set("y", top + line_height * i as f32)
                .add(SvgText::new(line)),
        );
    }

    svg_element::Group::new()
        .set("id", node.id().to_string())
        .set("data-source", node.location().to_string())
        .add(rect)
        .add(text)
}

fn render_label(label: &str, position: Point, font_size: f32) -> svg_element::Group {
    let size = text_size(label, font_size);
    svg_element::Group::new()
        .add(
            svg_element::Rectangle::new()
                .set("x", position.x - size.width / 2.0 - 3.0)
                .set("y", position.y - size.height / 2.0 - 2.0)
                .set("width", size.width + 6.0)
                .set("height", size.height + 4.0)
                .set("fill", "white")
                .set("fill-opacity", 0.8)
                .set("rx", 3.0),
        )
        .add(
            svg_element::Text::new("")
                .set("x", position.x)
                .set("y", position.y)
                .set("text-anchor", "middle")
                .set("dominant-baseline", "middle")
                .set("font-family", FONT_FAMILY)
                .set("font-size", font_size)
                .add(SvgText::new(label)),
        )
}

fn marker_id(kind: RelationshipKind) -> String {
    format!("arrow-{kind}")
}

fn arrow_marker(kind: RelationshipKind) -> svg_element::Marker {
    svg_element::Marker::new()
        .set("id", marker_id(kind))
        .set("viewBox", "0 0 10 10")
        .set("refX", 9)
        .set("refY", 5)
        .set("markerWidth", 6)
        .set("markerHeight", 6)
        .set("orient", "auto")
        .add(
            svg_element::Path::new()
                .set("d", "M 0 0 L 10 5 L 0 10 z")
                .set("fill", edge_color(kind)),
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::tests::sample_model;

    fn export(model: &DiagramModel) -> String {
        String::from_utf8(SvgExporter.export(model).unwrap()).unwrap()
    }

    #[test]
    fn test_svg_contains_nodes_and_markers() {
        let text = export(&sample_model());

        assert!(text.starts_with("<svg"));
        assert!(text.contains("id=\"aws_lb.main\""));
        assert!(text.contains("arrow-network"));
        assert!(text.contains("arrow-data_flow"));
        assert!(!text.contains("arrow-invocation"));
        assert!(text.contains("Infrastructure Architecture"));
        assert!(text.contains("stroke-dasharray"));
    }

    #[test]
    fn test_svg_is_deterministic() {
        let model = sample_model();
        assert_eq!(export(&model), export(&model));
    }

    #[test]
    fn test_multi_line_labels_become_tspans() {
        let text = export(&sample_model());
        assert!(text.contains("t3.micro"));
        assert!(text.contains("(When enable_allocator)"));
        assert!(text.matches("<tspan").count() >= 6);
    }
}
