//! Graph description (DOT) export.
//!
//! The graph is assembled as `dot-structures` values and printed with the
//! `graphviz-rust` printer. Nothing in the output depends on time or on
//! hash iteration order, so unchanged input prints byte-identical text.

use dot_structures::{
    Attribute, Edge, EdgeTy, Graph, GraphAttributes, Id, Node, NodeId, Stmt, Subgraph, Vertex,
};
use graphviz_rust::printer::{DotPrinter, PrinterContext};

use infragram_core::{
    diagram::{ClusterTree, DiagramEdge, DiagramModel, DiagramNode, StrokeStyle},
    render::OutputFormat,
};

use super::{Error, Exporter, edge_color};

const FONT: &str = "Helvetica";

pub struct DotExporter;

impl Exporter for DotExporter {
    fn format(&self) -> OutputFormat {
        OutputFormat::Dot
    }

    fn export(&self, model: &DiagramModel) -> Result<Vec<u8>, Error> {
        Ok(to_dot(model).into_bytes())
    }
}

/// Print `model` as DOT text.
pub fn to_dot(model: &DiagramModel) -> String {
    graph(model).print(&mut PrinterContext::default())
}

/// Build the DOT graph for `model`.
pub fn graph(model: &DiagramModel) -> Graph {
    let config = model.config();
    let metrics = config.metrics();

    let mut stmts = vec![
        Stmt::GAttribute(GraphAttributes::Graph(vec![
            attr("rankdir", plain(config.direction())),
            attr("nodesep", plain(metrics.node_sep)),
            attr("ranksep", plain(metrics.rank_sep)),
            attr("dpi", plain(config.dpi())),
            attr("compound", plain("true")),
            attr("newrank", plain("true")),
            attr("fontname", quoted(FONT)),
            attr("fontsize", plain(metrics.title_font)),
            attr("label", quoted(model.title())),
            attr("labelloc", plain(if config.title_on_top() { "t" } else { "b" })),
        ])),
        Stmt::GAttribute(GraphAttributes::Node(vec![
            attr("shape", plain("box")),
            attr("fontname", quoted(FONT)),
            attr("fontsize", plain(metrics.node_font)),
            attr("margin", quoted("0.2,0.1")),
        ])),
        Stmt::GAttribute(GraphAttributes::Edge(vec![
            attr("fontname", quoted(FONT)),
            attr("fontsize", plain(metrics.edge_font)),
        ])),
    ];

    let mut counter = 0;
    stmts.extend(cluster_stmts(model, &model.cluster_tree(), &mut counter));
    stmts.extend(model.edges().iter().map(|edge| Stmt::Edge(dot_edge(edge))));

    Graph::DiGraph {
        id: Id::Plain("infrastructure".to_string()),
        strict: false,
        stmts,
    }
}

fn cluster_stmts(model: &DiagramModel, tree: &ClusterTree, counter: &mut usize) -> Vec<Stmt> {
    let mut stmts: Vec<Stmt> = tree
        .nodes()
        .iter()
        .map(|&index| Stmt::Node(dot_node(&model.nodes()[index])))
        .collect();

    for child in tree.children() {
        *counter += 1;
        let mut child_stmts = vec![
            Stmt::Attribute(attr("label", quoted(child.name().unwrap_or_default()))),
            Stmt::Attribute(attr("style", quoted("rounded"))),
            Stmt::Attribute(attr("color", quoted("#6c757d"))),
        ];
        let id = Id::Plain(format!("cluster_{counter}"));
        child_stmts.extend(cluster_stmts(model, child, counter));
        stmts.push(Stmt::Subgraph(Subgraph {
            id,
            stmts: child_stmts,
        }));
    }

    stmts
}

fn dot_node(node: &DiagramNode) -> Node {
    let style = node.style();
    let mut styles = vec!["rounded", "filled"];
    match style.stroke {
        StrokeStyle::Solid => {}
        StrokeStyle::Dashed => styles.push("dashed"),
        StrokeStyle::Dotted => styles.push("dotted"),
    }

    Node {
        id: NodeId(quoted(&node.id().to_string()), None),
        attributes: vec![
            attr("label", quoted(&node.display_label())),
            attr("style", quoted(&styles.join(","))),
            attr("fillcolor", quoted(&style.fill.to_hex())),
            attr("color", quoted(&style.border.to_hex())),
            attr("tooltip", quoted(&node.location().to_string())),
        ],
    }
}

fn dot_edge(edge: &DiagramEdge) -> Edge {
    let style: &'static str = edge.style().into();
    Edge {
        ty: EdgeTy::Pair(
            Vertex::N(NodeId(quoted(&edge.source().to_string()), None)),
            Vertex::N(NodeId(quoted(&edge.target().to_string()), None)),
        ),
        attributes: vec![
            attr("label", quoted(edge.label())),
            attr("style", plain(style)),
            attr("color", quoted(edge_color(edge.kind()))),
        ],
    }
}

fn attr(key: &str, value: Id) -> Attribute {
    Attribute(Id::Plain(key.to_string()), value)
}

fn plain(value: impl ToString) -> Id {
    Id::Plain(value.to_string())
}

/// A double-quoted DOT string. Newlines become centered line breaks.
fn quoted(value: &str) -> Id {
    let mut escaped = String::with_capacity(value.len() + 2);
    escaped.push('"');
    for c in value.chars() {
        match c {
            '"' => escaped.push_str("\\\""),
            '\\' => escaped.push_str("\\\\"),
            '\n' => escaped.push_str("\\n"),
            c => escaped.push(c),
        }
    }
    escaped.push('"');
    Id::Escaped(escaped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::tests::sample_model;

    #[test]
    fn test_dot_contains_nodes_edges_and_clusters() {
        let text = to_dot(&sample_model());

        assert!(text.starts_with("digraph infrastructure"));
        assert!(text.contains("\"aws_lb.main\""));
        assert!(text.contains("\"aws_lb.main\" -> \"aws_instance.allocator\""));
        assert!(text.contains("subgraph cluster_1"));
        assert!(text.contains("\"Access Layer\""));
        assert!(text.contains("rankdir=LR"));
        assert!(text.contains("dashed"));
    }

    #[test]
    fn test_dot_is_deterministic() {
        let model = sample_model();
        assert_eq!(to_dot(&model), to_dot(&model.clone()));
    }

    #[test]
    fn test_quoting_escapes_special_characters() {
        match quoted("say \"hi\"\nnext") {
            Id::Escaped(text) => assert_eq!(text, r#""say \"hi\"\nnext""#),
            other => panic!("unexpected id {other:?}"),
        }
    }
}
