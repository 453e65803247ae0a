//! Exporters turn a [`DiagramModel`] into the bytes of one output format.

pub mod dot;
#[cfg(feature = "graphviz")]
pub mod raster;
pub mod svg;

use infragram_core::{diagram::DiagramModel, relationship::RelationshipKind, render::OutputFormat};
use thiserror::Error;

/// A single output format.
///
/// Exporters only borrow the model, so one model can be exported to several
/// formats at the same time.
pub trait Exporter: Send + Sync {
    /// The format this exporter produces.
    fn format(&self) -> OutputFormat;

    fn export(&self, _model: &DiagramModel) -> Result<Vec<u8>, Error> {
        Err(Error::Render(format!(
            "{} export not implemented",
            self.format()
        )))
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("Render error: {0}")]
    Render(String),

    #[error("Backend error: {0}")]
    Backend(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// The exporters available in this build, one per format.
pub fn default_exporters() -> Vec<Box<dyn Exporter>> {
    let mut exporters: Vec<Box<dyn Exporter>> =
        vec![Box::new(dot::DotExporter), Box::new(svg::SvgExporter)];
    #[cfg(feature = "graphviz")]
    exporters.extend(
        OutputFormat::all()
            .into_iter()
            .filter(|format| format.is_raster())
            .map(|format| Box::new(raster::RasterExporter::new(format)) as Box<dyn Exporter>),
    );
    exporters
}

/// Stroke color of an edge of the given kind.
pub(crate) fn edge_color(kind: RelationshipKind) -> &'static str {
    match kind {
        RelationshipKind::Network => "#1f77b4",
        RelationshipKind::Identity => "#9467bd",
        RelationshipKind::Invocation => "#ff7f0e",
        RelationshipKind::DataFlow => "#2ca02c",
        RelationshipKind::Dependency => "#7f7f7f",
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use infragram_core::{
        category::Category,
        color::Color,
        conditional::ConditionalState,
        diagram::{DiagramEdge, DiagramNode, NodeStyle, StrokeStyle},
        identifier::ResourceKey,
        relationship::{Origin, Relationship},
        render::RenderConfig,
        resource::{SourceLocation, Tier},
    };

    use super::*;

    fn node(
        resource_type: &str,
        name: &str,
        category: Category,
        cluster: &[&str],
        line: usize,
    ) -> DiagramNode {
        DiagramNode::new(
            ResourceKey::new(resource_type, name),
            name,
            category,
            cluster.iter().map(|s| s.to_string()).collect(),
            ConditionalState::Always,
            Tier::Infrastructure,
            NodeStyle {
                fill: Color::new("#e8f4fd").unwrap(),
                border: Color::new("#495057").unwrap(),
                stroke: StrokeStyle::Solid,
            },
            SourceLocation::new("main.tf", line, line + 2),
        )
    }

    fn edge(
        source: (&str, &str),
        target: (&str, &str),
        kind: RelationshipKind,
        origin: Origin,
        label: &str,
    ) -> DiagramEdge {
        DiagramEdge::from(&Relationship::new(
            ResourceKey::new(source.0, source.1),
            ResourceKey::new(target.0, target.1),
            kind,
            origin,
            label,
        ))
    }

    /// Five nodes in three clusters with four edges, one node conditional.
    pub(crate) fn sample_model() -> DiagramModel {
        let allocator = node("aws_instance", "allocator", Category::Compute, &["Infrastructure"], 20);
        let allocator = DiagramNode::new(
            allocator.id().clone(),
            "allocator\nt3.micro",
            allocator.category(),
            allocator.cluster_path().to_vec(),
            ConditionalState::Dynamic,
            allocator.tier(),
            allocator.style(),
            allocator.location().clone(),
        )
        .with_conditional(Color::new("#28a745").unwrap(), "(When enable_allocator)");

        let nodes = vec![
            node("aws_route53_record", "api", Category::Dns, &["Access Layer"], 1),
            node("aws_lb", "main", Category::LoadBalancing, &["Access Layer"], 10),
            allocator,
            node("aws_iam_role", "allocator", Category::Identity, &["IAM & Permissions"], 30),
            node(
                "aws_cloudwatch_log_group",
                "app",
                Category::Observability,
                &["Observability & Logging"],
                40,
            ),
        ];
        let edges = vec![
            edge(
                ("aws_route53_record", "api"),
                ("aws_lb", "main"),
                RelationshipKind::Network,
                Origin::Attribute,
                "records",
            ),
            edge(
                ("aws_lb", "main"),
                ("aws_instance", "allocator"),
                RelationshipKind::Network,
                Origin::Attribute,
                "target_id",
            ),
            edge(
                ("aws_instance", "allocator"),
                ("aws_iam_role", "allocator"),
                RelationshipKind::Identity,
                Origin::Implicit,
                "assumes",
            ),
            edge(
                ("aws_instance", "allocator"),
                ("aws_cloudwatch_log_group", "app"),
                RelationshipKind::DataFlow,
                Origin::Implicit,
                "writes logs",
            ),
        ];

        DiagramModel::new("Infrastructure Architecture", nodes, edges, RenderConfig::default())
            .unwrap()
    }

    #[test]
    fn test_default_exporters_cover_all_formats() {
        let formats: Vec<_> = default_exporters().iter().map(|e| e.format()).collect();
        assert_eq!(formats.len(), OutputFormat::all().len());
        for format in OutputFormat::all() {
            assert!(formats.contains(&format));
        }
        assert_eq!(formats[..2], [OutputFormat::Dot, OutputFormat::Svg]);
        assert!(formats[2..].iter().all(|format| format.is_raster()));
    }

    #[test]
    fn test_default_export_is_an_error() {
        struct Unimplemented;
        impl Exporter for Unimplemented {
            fn format(&self) -> OutputFormat {
                OutputFormat::Svg
            }
        }

        let err = Unimplemented.export(&sample_model()).unwrap_err();
        assert!(matches!(err, Error::Render(_)));
    }
}
