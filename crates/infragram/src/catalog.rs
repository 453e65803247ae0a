//! Category-driven clustering, coloring and labelling of diagram nodes.
//!
//! A [`Catalog`] is built once per run from the built-in tables and the
//! `[catalog]` configuration section, then passed by reference to the model
//! builder. There is no global lookup state.

use std::collections::BTreeMap;

use infragram_core::{
    category::Category,
    color::Color,
    conditional::ConditionalState,
    diagram::{DiagramNode, NodeStyle, StrokeStyle},
    resource::{ResourceDefinition, Tier},
};
use infragram_parser::ResolvedResource;

use crate::config::CatalogConfig;

/// Outer cluster of every runtime-provisioned resource.
pub const RUNTIME_CLUSTER: &str = "Dynamic Compute (Runtime-Provisioned)";

const DEFAULT_BORDER: &str = "#495057";
const CONDITIONAL_BORDER: &str = "#28a745";
const RUNTIME_BORDER: &str = "#fd7e14";

fn default_cluster_path(category: Category) -> &'static [&'static str] {
    match category {
        Category::Dns | Category::LoadBalancing => &["Access Layer"],
        Category::Compute | Category::Storage | Category::Database => &["Infrastructure"],
        Category::Network => &["Infrastructure", "Network"],
        Category::Security => &["Infrastructure", "Security Groups"],
        Category::Observability => &["Observability & Logging"],
        Category::Identity => &["IAM & Permissions"],
        Category::Unknown => &["Other Resources"],
    }
}

fn default_fill(category: Category) -> &'static str {
    match category {
        Category::Dns => "#e8f4fd",
        Category::LoadBalancing => "#d1ecf1",
        Category::Network => "#e2e3e5",
        Category::Compute => "#fff3cd",
        Category::Storage => "#d4edda",
        Category::Database => "#cce5ff",
        Category::Observability => "#f8d7da",
        Category::Identity => "#e2d9f3",
        Category::Security => "#fde2e4",
        Category::Unknown => "#f8f9fa",
    }
}

/// Cluster paths and colors for every category.
#[derive(Debug, Clone, PartialEq)]
pub struct Catalog {
    clusters: BTreeMap<Category, Vec<String>>,
    fills: BTreeMap<Category, Color>,
    default_border: Color,
    conditional_border: Color,
    runtime_border: Color,
}

impl Catalog {
    /// Build the catalog, applying `config` over the built-in tables.
    ///
    /// # Errors
    ///
    /// Returns a message naming the category when a configured color does
    /// not parse.
    pub fn new(config: &CatalogConfig) -> Result<Self, String> {
        let mut clusters = BTreeMap::new();
        let mut fills = BTreeMap::new();

        for category in Category::ALL {
            let path = match config.clusters().get(&category) {
                Some(path) => path.clone(),
                None => default_cluster_path(category)
                    .iter()
                    .map(|s| s.to_string())
                    .collect(),
            };
            clusters.insert(category, path);

            let fill = match config.colors().get(&category) {
                Some(color) => Color::new(color)
                    .map_err(|err| format!("catalog color for `{category}`: {err}"))?,
                None => Color::new(default_fill(category))?,
            };
            fills.insert(category, fill);
        }

        Ok(Self {
            clusters,
            fills,
            default_border: Color::new(DEFAULT_BORDER)?,
            conditional_border: Color::new(CONDITIONAL_BORDER)?,
            runtime_border: Color::new(RUNTIME_BORDER)?,
        })
    }

    /// Cluster path of a resource, outermost cluster first.
    pub fn cluster_path(&self, category: Category, tier: Tier) -> Vec<String> {
        let mut path = Vec::new();
        if tier == Tier::RuntimeProvisioned {
            path.push(RUNTIME_CLUSTER.to_string());
        }
        if let Some(category_path) = self.clusters.get(&category) {
            path.extend(category_path.iter().cloned());
        }
        path
    }

    pub fn fill(&self, category: Category) -> Color {
        self.fills.get(&category).copied().unwrap_or_default()
    }

    /// The diagram node for a resource that is not classified `Never`.
    ///
    /// Conditional resources get a dashed green border and a `(When ...)`
    /// annotation; runtime-provisioned ones a dotted orange border.
    pub fn node(&self, resource: &ResolvedResource) -> DiagramNode {
        let definition = resource.definition();
        let category = Category::from_resource_type(definition.resource_type());
        let state = resource.presence().state();
        let tier = definition.tier();

        let (border, stroke, annotation) = if tier == Tier::RuntimeProvisioned {
            (
                self.runtime_border,
                StrokeStyle::Dotted,
                Some("(Runtime-provisioned)"),
            )
        } else {
            (self.default_border, StrokeStyle::Solid, None)
        };

        let mut node = DiagramNode::new(
            definition.key().clone(),
            format_label(definition),
            category,
            self.cluster_path(category, tier),
            state,
            tier,
            NodeStyle {
                fill: self.fill(category),
                border,
                stroke,
            },
            definition.location().clone(),
        );
        if let Some(annotation) = annotation {
            node = node.with_annotation(annotation);
        }
        if state == ConditionalState::Dynamic {
            let condition = resource.presence().condition().unwrap_or("condition");
            node = node.with_conditional(self.conditional_border, format!("(When {condition})"));
        }
        node
    }
}

/// The display label of a resource: its name, followed by one detail line
/// for the resource types that have a meaningful one.
pub fn format_label(definition: &ResourceDefinition) -> String {
    let text = |attribute: &str| definition.attribute(attribute).and_then(|v| v.as_str());

    let detail = match definition.resource_type() {
        "aws_instance" => text("instance_type"),
        "aws_lambda_function" => text("runtime"),
        "aws_route53_record" => text("name"),
        "aws_iam_role" => text("name"),
        "aws_cloudwatch_log_group" => text("name")
            .and_then(|name| name.rsplit('/').find(|segment| !segment.is_empty())),
        _ => None,
    };

    match detail {
        Some(detail) if detail != definition.name() => format!("{}\n{detail}", definition.name()),
        _ => definition.name().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use indexmap::IndexMap;
    use infragram_core::{
        conditional::Presence,
        identifier::ResourceKey,
        resource::SourceLocation,
        value::{AttributeValue, Literal},
    };

    use super::*;

    fn definition(resource_type: &str, name: &str, attributes: &[(&str, &str)]) -> ResourceDefinition {
        let attributes: IndexMap<String, AttributeValue> = attributes
            .iter()
            .map(|(k, v)| (k.to_string(), Literal::String(v.to_string()).into()))
            .collect();
        ResourceDefinition::new(
            ResourceKey::new(resource_type, name),
            attributes,
            SourceLocation::new("main.tf", 1, 4),
        )
    }

    #[test]
    fn test_label_details() {
        assert_eq!(
            format_label(&definition("aws_instance", "allocator", &[("instance_type", "t3.large")])),
            "allocator\nt3.large"
        );
        assert_eq!(
            format_label(&definition(
                "aws_cloudwatch_log_group",
                "client",
                &[("name", "/aws/lambda/log-processor")]
            )),
            "client\nlog-processor"
        );
        assert_eq!(format_label(&definition("aws_vpc", "main", &[("cidr_block", "10.0.0.0/16")])), "main");
    }

    #[test]
    fn test_conditional_node_is_dashed_and_annotated() {
        let catalog = Catalog::new(&CatalogConfig::default()).unwrap();
        let resource = ResolvedResource::new(
            definition("aws_eip", "allocator", &[]),
            Presence::dynamic("use_eip"),
        );

        let node = catalog.node(&resource);
        assert_eq!(node.category(), Category::Network);
        assert_eq!(node.cluster_path(), ["Infrastructure", "Network"]);
        assert_eq!(node.style().stroke, StrokeStyle::Dashed);
        assert_eq!(node.style().border.to_hex(), CONDITIONAL_BORDER);
        assert_eq!(node.display_label(), "allocator\n(When use_eip)");
    }

    #[test]
    fn test_runtime_node_is_nested_under_runtime_cluster() {
        let catalog = Catalog::new(&CatalogConfig::default()).unwrap();
        let resource = ResolvedResource::new(
            definition("aws_instance", "client_vm", &[]).with_tier(Tier::RuntimeProvisioned),
            Presence::always(),
        );

        let node = catalog.node(&resource);
        assert_eq!(node.cluster_path(), [RUNTIME_CLUSTER, "Infrastructure"]);
        assert_eq!(node.style().stroke, StrokeStyle::Dotted);
        assert_eq!(node.annotation(), Some("(Runtime-provisioned)"));
    }

    #[test]
    fn test_plain_dynamic_runtime_node_keeps_tier_marking() {
        let catalog = Catalog::new(&CatalogConfig::default()).unwrap();
        let resource = ResolvedResource::new(
            definition("aws_instance", "client_vm", &[]).with_tier(Tier::RuntimeProvisioned),
            Presence::dynamic("var.instance_count > 0"),
        );

        let node = catalog.node(&resource);
        assert_eq!(node.style().stroke, StrokeStyle::Dashed);
        assert_eq!(node.annotation(), Some("(When var.instance_count > 0)"));

        let plain = node.plain();
        assert_eq!(plain.style().stroke, StrokeStyle::Dotted);
        assert_eq!(plain.style().border.to_hex(), RUNTIME_BORDER);
        assert_eq!(plain.annotation(), Some("(Runtime-provisioned)"));
        assert_eq!(plain.cluster_path(), [RUNTIME_CLUSTER, "Infrastructure"]);
    }

    #[test]
    fn test_unknown_type_falls_back() {
        let catalog = Catalog::new(&CatalogConfig::default()).unwrap();
        let node = catalog.node(&ResolvedResource::new(
            definition("random_pet", "name", &[]),
            Presence::always(),
        ));
        assert_eq!(node.category(), Category::Unknown);
        assert_eq!(node.cluster_path(), ["Other Resources"]);
    }

    #[test]
    fn test_config_overrides_and_validation() {
        let config = CatalogConfig::new(
            BTreeMap::from([(Category::Compute, vec!["Workers".to_string()])]),
            BTreeMap::from([(Category::Compute, "red".to_string())]),
        );
        let catalog = Catalog::new(&config).unwrap();
        assert_eq!(catalog.cluster_path(Category::Compute, Tier::Infrastructure), ["Workers"]);
        assert_eq!(catalog.fill(Category::Compute).to_hex(), "#ff0000");

        let invalid = CatalogConfig::new(
            BTreeMap::new(),
            BTreeMap::from([(Category::Dns, "not-a-color".to_string())]),
        );
        let err = Catalog::new(&invalid).unwrap_err();
        assert!(err.contains("dns"));
    }
}
