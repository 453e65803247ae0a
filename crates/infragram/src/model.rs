//! Diagram model building.
//!
//! [`ModelBuilder`] turns the resolved configuration and its relationships
//! into the base node and edge lists once per run, then derives one
//! [`DiagramModel`] per view from them.

use std::collections::{BTreeSet, HashMap};

use log::debug;

use infragram_core::{
    diagram::{DiagramEdge, DiagramModel, DiagramNode, UnresolvedReferenceError},
    identifier::ResourceKey,
    relationship::{Origin, Relationship},
    render::RenderConfig,
};
use infragram_parser::ResolvedResource;

use crate::{catalog::Catalog, view::ViewSpec};

/// Builds per-view diagram models from one run's resources.
#[derive(Debug, Clone)]
pub struct ModelBuilder {
    nodes: Vec<DiagramNode>,
    relationships: Vec<Relationship>,
    config: RenderConfig,
    title: String,
}

impl ModelBuilder {
    /// Resources classified `Never` are left out.
    ///
    /// Nodes are ordered by source file, then by line, independent of the
    /// order in which files were read.
    pub fn new(
        resources: &[ResolvedResource],
        relationships: Vec<Relationship>,
        catalog: &Catalog,
        config: RenderConfig,
        title: impl Into<String>,
    ) -> Self {
        let mut nodes: Vec<DiagramNode> = resources
            .iter()
            .filter(|r| !r.presence().state().is_never())
            .map(|r| catalog.node(r))
            .collect();
        nodes.sort_by(|a, b| a.location().cmp(b.location()).then_with(|| a.id().cmp(b.id())));

        Self {
            nodes,
            relationships,
            config,
            title: title.into(),
        }
    }

    /// Every node, before view filtering.
    pub fn nodes(&self) -> &[DiagramNode] {
        &self.nodes
    }

    pub fn relationships(&self) -> &[Relationship] {
        &self.relationships
    }

    /// The model of one view.
    ///
    /// Edges touching a node the view filters out are dropped with it.
    ///
    /// # Errors
    ///
    /// Returns [`UnresolvedReferenceError`] when a relationship points at a
    /// resource that has no node at all.
    pub fn build(&self, view: &ViewSpec) -> Result<DiagramModel, UnresolvedReferenceError> {
        let mut excluded: BTreeSet<&ResourceKey> = BTreeSet::new();
        let mut nodes = Vec::new();
        for node in &self.nodes {
            if !view.includes_category(node.category()) {
                excluded.insert(node.id());
                continue;
            }
            let mut node = if view.annotations() {
                node.clone()
            } else {
                node.plain()
            };
            if let Some(depth) = view.cluster_depth() {
                node = node.truncated(depth);
            }
            nodes.push(node);
        }

        let index: HashMap<&ResourceKey, usize> =
            nodes.iter().enumerate().map(|(i, n)| (n.id(), i)).collect();

        let mut edges: Vec<DiagramEdge> = self
            .relationships
            .iter()
            .filter(|r| view.includes_kind(r.kind()))
            .filter(|r| view.implicit_edges() || r.origin() != Origin::Implicit)
            .filter(|r| !excluded.contains(r.source()) && !excluded.contains(r.target()))
            .map(DiagramEdge::from)
            .collect();
        edges.sort_by(|a, b| {
            let position = |edge: &DiagramEdge| {
                (
                    index.get(edge.source()).copied().unwrap_or(usize::MAX),
                    index.get(edge.target()).copied().unwrap_or(usize::MAX),
                    edge.kind(),
                )
            };
            position(a)
                .cmp(&position(b))
                .then_with(|| a.label().cmp(b.label()))
        });

        debug!(
            view = view.name(),
            nodes = nodes.len(),
            edges = edges.len();
            "Built view model"
        );

        let title = view.title().unwrap_or(&self.title);
        DiagramModel::new(title, nodes, edges, self.config.clone())
    }
}
