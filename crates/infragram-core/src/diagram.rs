//! The renderable diagram model.
//!
//! A [`DiagramModel`] is built once per view and is immutable afterwards;
//! exporters only ever borrow it, so several exports can read the same model
//! at the same time.
//!
//! # Overview
//!
//! - [`DiagramNode`] - A resource placed in a cluster, with style metadata.
//! - [`DiagramEdge`] - A labelled edge derived 1:1 from a relationship.
//! - [`ClusterTree`] - Nodes grouped by their cluster path.
//! - [`DiagramModel`] - Nodes, edges and render settings, validated.

use std::{fmt, str::FromStr};

use thiserror::Error;

use crate::{
    category::Category,
    color::Color,
    conditional::ConditionalState,
    identifier::ResourceKey,
    relationship::{Origin, Relationship, RelationshipKind},
    render::RenderConfig,
    resource::{SourceLocation, Tier},
};

/// Line pattern of a node border or an edge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum StrokeStyle {
    #[default]
    Solid,
    Dashed,
    Dotted,
}

impl StrokeStyle {
    /// SVG `stroke-dasharray` value, `None` for solid lines.
    pub fn dasharray(self) -> Option<&'static str> {
        match self {
            StrokeStyle::Solid => None,
            StrokeStyle::Dashed => Some("6,4"),
            StrokeStyle::Dotted => Some("2,3"),
        }
    }
}

impl FromStr for StrokeStyle {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "solid" => Ok(Self::Solid),
            "dashed" => Ok(Self::Dashed),
            "dotted" => Ok(Self::Dotted),
            _ => Err("Unsupported stroke style"),
        }
    }
}

impl From<StrokeStyle> for &'static str {
    fn from(val: StrokeStyle) -> Self {
        match val {
            StrokeStyle::Solid => "solid",
            StrokeStyle::Dashed => "dashed",
            StrokeStyle::Dotted => "dotted",
        }
    }
}

impl fmt::Display for StrokeStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s: &'static str = (*self).into();
        write!(f, "{s}")
    }
}

/// Visual style of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeStyle {
    pub fill: Color,
    pub border: Color,
    pub stroke: StrokeStyle,
}

/// A resource as it appears in a diagram.
#[derive(Debug, Clone, PartialEq)]
pub struct DiagramNode {
    id: ResourceKey,
    label: String,
    annotation: Option<String>,
    category: Category,
    cluster_path: Vec<String>,
    state: ConditionalState,
    tier: Tier,
    style: NodeStyle,
    /// Style and annotation in place before conditional styling was applied.
    unconditional: Option<(NodeStyle, Option<String>)>,
    location: SourceLocation,
}

impl DiagramNode {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: ResourceKey,
        label: impl Into<String>,
        category: Category,
        cluster_path: Vec<String>,
        state: ConditionalState,
        tier: Tier,
        style: NodeStyle,
        location: SourceLocation,
    ) -> Self {
        Self {
            id,
            label: label.into(),
            annotation: None,
            category,
            cluster_path,
            state,
            tier,
            style,
            unconditional: None,
            location,
        }
    }

    /// Attach a secondary annotation line, such as `(Runtime-provisioned)`.
    pub fn with_annotation(mut self, annotation: impl Into<String>) -> Self {
        self.annotation = Some(annotation.into());
        self
    }

    /// Mark the node as conditional: a dashed `border` and a `(When ...)`
    /// annotation replace the current ones until [`DiagramNode::plain`].
    pub fn with_conditional(mut self, border: Color, annotation: impl Into<String>) -> Self {
        let previous = self.annotation.replace(annotation.into());
        self.unconditional = Some((self.style, previous));
        self.style.border = border;
        self.style.stroke = StrokeStyle::Dashed;
        self
    }

    /// A copy of this node with conditional styling removed.
    ///
    /// Views that disable conditional styling render plain nodes. Tier
    /// styling, such as the runtime-provisioned border, is kept.
    pub fn plain(&self) -> Self {
        let mut node = self.clone();
        if let Some((style, annotation)) = node.unconditional.take() {
            node.style = style;
            node.annotation = annotation;
        }
        node
    }

    /// A copy of this node with its cluster path cut to `depth` levels.
    pub fn truncated(&self, depth: usize) -> Self {
        let mut node = self.clone();
        node.cluster_path.truncate(depth);
        node
    }

    pub fn id(&self) -> &ResourceKey {
        &self.id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn annotation(&self) -> Option<&str> {
        self.annotation.as_deref()
    }

    /// The label followed by the annotation on its own line, if any.
    pub fn display_label(&self) -> String {
        match &self.annotation {
            Some(annotation) => format!("{}\n{}", self.label, annotation),
            None => self.label.clone(),
        }
    }

    pub fn category(&self) -> Category {
        self.category
    }

    /// Cluster names from the outermost to the innermost.
    pub fn cluster_path(&self) -> &[String] {
        &self.cluster_path
    }

    pub fn state(&self) -> ConditionalState {
        self.state
    }

    pub fn tier(&self) -> Tier {
        self.tier
    }

    pub fn style(&self) -> NodeStyle {
        self.style
    }

    pub fn location(&self) -> &SourceLocation {
        &self.location
    }
}

/// An edge between two diagram nodes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DiagramEdge {
    source: ResourceKey,
    target: ResourceKey,
    label: String,
    kind: RelationshipKind,
    origin: Origin,
    style: StrokeStyle,
}

impl DiagramEdge {
    pub fn source(&self) -> &ResourceKey {
        &self.source
    }

    pub fn target(&self) -> &ResourceKey {
        &self.target
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn kind(&self) -> RelationshipKind {
        self.kind
    }

    pub fn origin(&self) -> Origin {
        self.origin
    }

    pub fn style(&self) -> StrokeStyle {
        self.style
    }
}

impl From<&Relationship> for DiagramEdge {
    /// Attribute references draw solid; implicit and `depends_on` edges draw
    /// dashed.
    fn from(relationship: &Relationship) -> Self {
        let style = match relationship.origin() {
            Origin::Attribute => StrokeStyle::Solid,
            Origin::Implicit | Origin::DependsOn => StrokeStyle::Dashed,
        };
        Self {
            source: relationship.source().clone(),
            target: relationship.target().clone(),
            label: relationship.label().to_string(),
            kind: relationship.kind(),
            origin: relationship.origin(),
            style,
        }
    }
}

/// An edge whose endpoint is not in the node set.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("edge `{from} -> {to}` references missing node `{missing}`")]
pub struct UnresolvedReferenceError {
    pub from: ResourceKey,
    pub to: ResourceKey,
    pub missing: ResourceKey,
}

/// Nodes grouped by cluster.
///
/// Children and nodes keep the order of first appearance in the model, which
/// is itself deterministic.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClusterTree {
    name: Option<String>,
    nodes: Vec<usize>,
    children: Vec<ClusterTree>,
}

impl ClusterTree {
    fn named(name: &str) -> Self {
        Self {
            name: Some(name.to_string()),
            ..Self::default()
        }
    }

    /// Cluster name; `None` for the root.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Indices into [`DiagramModel::nodes`] placed directly in this cluster.
    pub fn nodes(&self) -> &[usize] {
        &self.nodes
    }

    pub fn children(&self) -> &[ClusterTree] {
        &self.children
    }

    /// Depth of the deepest nested cluster below this one.
    pub fn depth(&self) -> usize {
        self.children.iter().map(|c| c.depth() + 1).max().unwrap_or(0)
    }

    fn insert(&mut self, path: &[String], node: usize) {
        match path.split_first() {
            None => self.nodes.push(node),
            Some((head, rest)) => {
                let position = match self
                    .children
                    .iter()
                    .position(|c| c.name.as_deref() == Some(head.as_str()))
                {
                    Some(position) => position,
                    None => {
                        self.children.push(ClusterTree::named(head));
                        self.children.len() - 1
                    }
                };
                self.children[position].insert(rest, node);
            }
        }
    }
}

/// A validated, immutable diagram.
#[derive(Debug, Clone, PartialEq)]
pub struct DiagramModel {
    title: String,
    nodes: Vec<DiagramNode>,
    edges: Vec<DiagramEdge>,
    config: RenderConfig,
}

impl DiagramModel {
    /// Build a model, checking that every edge endpoint is a node.
    ///
    /// # Errors
    ///
    /// Returns [`UnresolvedReferenceError`] for the first edge, in order,
    /// whose source or target is missing.
    pub fn new(
        title: impl Into<String>,
        nodes: Vec<DiagramNode>,
        edges: Vec<DiagramEdge>,
        config: RenderConfig,
    ) -> Result<Self, UnresolvedReferenceError> {
        let ids: std::collections::HashSet<&ResourceKey> = nodes.iter().map(|n| n.id()).collect();

        for edge in &edges {
            for endpoint in [edge.source(), edge.target()] {
                if !ids.contains(endpoint) {
                    return Err(UnresolvedReferenceError {
                        from: edge.source().clone(),
                        to: edge.target().clone(),
                        missing: endpoint.clone(),
                    });
                }
            }
        }

        Ok(Self {
            title: title.into(),
            nodes,
            edges,
            config,
        })
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn nodes(&self) -> &[DiagramNode] {
        &self.nodes
    }

    pub fn edges(&self) -> &[DiagramEdge] {
        &self.edges
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    /// Position of a node in [`DiagramModel::nodes`].
    pub fn node_index(&self, id: &ResourceKey) -> Option<usize> {
        self.nodes.iter().position(|n| n.id() == id)
    }

    /// Group the nodes into their nested clusters.
    pub fn cluster_tree(&self) -> ClusterTree {
        let mut root = ClusterTree::default();
        for (index, node) in self.nodes.iter().enumerate() {
            root.insert(node.cluster_path(), index);
        }
        root
    }
}
