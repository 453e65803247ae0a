//! Relationship inference.
//!
//! Explicit relationships come from resource references written in
//! attribute values; the attribute name decides the kind. Implicit
//! relationships come from a closed rule table ([`IMPLICIT_RULES`]) of
//! well-known architectural links that the source text does not always
//! spell out as a direct reference. The table is versioned by
//! [`POLICY_VERSION`] and never extended at runtime.
//!
//! Inference never fails. Unknown attributes yield `Dependency` edges and
//! references to undeclared resources are ignored.

use std::collections::BTreeSet;

use log::{debug, info};

use infragram_core::{
    identifier::ResourceKey,
    relationship::{Origin, Relationship, RelationshipKind},
    resource::ResourceDefinition,
    value::{AttributeValue, Literal},
};
use infragram_parser::{
    ResolvedResource,
    extract::{SpecialBlock, SpecialKind},
    references::scan_references,
};

/// Version of the implicit rule table.
pub const POLICY_VERSION: u32 = 1;

/// Names of the implicit rules, in evaluation order.
pub const IMPLICIT_RULES: [&str; 5] = [
    "subscription-filter-chain",
    "instance-profile-role",
    "lambda-log-group-naming",
    "listener-forwarding",
    "policy-attachment",
];

const LAMBDA_LOG_PREFIX: &str = "/aws/lambda/";

/// The kind of an explicit relationship written in `attribute`.
///
/// Only the last segment of a decomposed nested attribute counts, so
/// `default_action[0].target_group_arn` is looked up as `target_group_arn`.
pub fn kind_for_attribute(attribute: &str) -> RelationshipKind {
    match attribute_segment(attribute) {
        "vpc_security_group_ids"
        | "security_groups"
        | "security_group_id"
        | "source_security_group_id"
        | "subnet_id"
        | "subnet_ids"
        | "vpc_id"
        | "load_balancer_arn"
        | "target_group_arn"
        | "target_id"
        | "zone_id"
        | "alias"
        | "records"
        | "instance"
        | "instance_id"
        | "certificate_arn"
        | "default_action" => RelationshipKind::Network,

        "role"
        | "roles"
        | "iam_instance_profile"
        | "policy_arn"
        | "execution_role_arn"
        | "task_role_arn"
        | "assume_role_policy"
        | "policy" => RelationshipKind::Identity,

        "destination_arn" | "function_name" | "lambda_function_arn" | "invoke_arn"
        | "source_arn" => RelationshipKind::Invocation,

        "log_group_name" | "bucket" | "kinesis_stream_arn" | "stream_arn" => {
            RelationshipKind::DataFlow
        }

        _ => RelationshipKind::Dependency,
    }
}

/// Last path segment of an attribute name, without index suffixes.
fn attribute_segment(attribute: &str) -> &str {
    let last = attribute.rsplit('.').next().unwrap_or(attribute);
    match last.find('[') {
        Some(bracket) => &last[..bracket],
        None => last,
    }
}

/// Resource references in one attribute value.
fn references_in(value: &AttributeValue) -> Vec<ResourceKey> {
    match value {
        AttributeValue::Reference(reference) => vec![reference.key().clone()],
        AttributeValue::RawExpression(text) => scan_references(text)
            .into_iter()
            .map(|reference| reference.key().clone())
            .collect(),
        AttributeValue::Literal(_) => Vec::new(),
    }
}

/// Infers relationships between the present resources of a configuration.
pub struct RelationshipInference<'a> {
    resources: Vec<&'a ResourceDefinition>,
    declared: BTreeSet<&'a ResourceKey>,
    special_blocks: &'a [SpecialBlock],
}

impl<'a> RelationshipInference<'a> {
    /// Resources classified `Never` take no part in inference.
    pub fn new(resources: &'a [ResolvedResource], special_blocks: &'a [SpecialBlock]) -> Self {
        let resources: Vec<&ResourceDefinition> = resources
            .iter()
            .filter(|r| !r.presence().state().is_never())
            .map(ResolvedResource::definition)
            .collect();
        let declared = resources.iter().map(|d| d.key()).collect();
        Self {
            resources,
            declared,
            special_blocks,
        }
    }

    /// All relationships, deduplicated and sorted.
    ///
    /// Duplicates of the same `(source, target, kind)` collapse to the most
    /// specific one: attribute labels win over implicit rule labels, which
    /// win over `depends_on`.
    pub fn infer(&self) -> Vec<Relationship> {
        let explicit = self.explicit();
        let implicit = self.implicit();
        let (explicit_count, implicit_count) = (explicit.len(), implicit.len());

        let mut relationships: Vec<Relationship> = explicit.into_iter().chain(implicit).collect();
        relationships.sort();
        relationships.dedup_by(|later, earlier| later.identity() == earlier.identity());

        info!(
            explicit = explicit_count,
            implicit = implicit_count,
            relationships = relationships.len(),
            policy_version = POLICY_VERSION;
            "Inferred relationships"
        );
        relationships
    }

    fn explicit(&self) -> Vec<Relationship> {
        let mut relationships = Vec::new();
        for definition in &self.resources {
            for (attribute, value) in definition.attributes() {
                let segment = attribute_segment(attribute);
                let (kind, origin) = if segment == "depends_on" {
                    (RelationshipKind::Dependency, Origin::DependsOn)
                } else {
                    (kind_for_attribute(segment), Origin::Attribute)
                };

                for target in references_in(value) {
                    if &target == definition.key() || !self.declared.contains(&target) {
                        continue;
                    }
                    relationships.push(Relationship::new(
                        definition.key().clone(),
                        target,
                        kind,
                        origin,
                        segment,
                    ));
                }
            }
        }
        relationships
    }

    fn implicit(&self) -> Vec<Relationship> {
        let mut relationships = Vec::new();
        self.subscription_filter_chain(&mut relationships);
        self.instance_profile_role(&mut relationships);
        self.lambda_log_group_naming(&mut relationships);
        self.listener_forwarding(&mut relationships);
        self.policy_attachment(&mut relationships);

        for relationship in &relationships {
            debug!(relationship = relationship.to_string(); "Implicit relationship");
        }
        relationships
    }

    fn find(&self, key: &ResourceKey) -> Option<&'a ResourceDefinition> {
        self.resources.iter().copied().find(|d| d.key() == key)
    }

    fn of_type<'s>(
        &'s self,
        types: &'s [&'s str],
    ) -> impl Iterator<Item = &'a ResourceDefinition> + 's {
        self.resources
            .iter()
            .copied()
            .filter(move |d| types.contains(&d.resource_type()))
    }

    /// Declared resources of one of `types` referenced by attributes of
    /// `definition` whose last segment is one of `attributes`.
    fn targets(
        &self,
        definition: &ResourceDefinition,
        attributes: &[&str],
        types: &[&str],
    ) -> Vec<ResourceKey> {
        let mut targets: Vec<ResourceKey> = definition
            .attributes()
            .iter()
            .filter(|(name, _)| attributes.contains(&attribute_segment(name)))
            .flat_map(|(_, value)| references_in(value))
            .filter(|key| types.contains(&key.resource_type()) && self.declared.contains(key))
            .collect();
        targets.sort();
        targets.dedup();
        targets
    }

    fn pairs(
        out: &mut Vec<Relationship>,
        sources: &[ResourceKey],
        targets: &[ResourceKey],
        kind: RelationshipKind,
        label: &str,
    ) {
        for source in sources {
            for target in targets.iter().filter(|t| *t != source) {
                out.push(Relationship::new(
                    source.clone(),
                    target.clone(),
                    kind,
                    Origin::Implicit,
                    label,
                ));
            }
        }
    }

    fn subscription_filter_chain(&self, out: &mut Vec<Relationship>) {
        for block in self.special_blocks {
            if block.kind() != SpecialKind::SubscriptionFilter {
                continue;
            }
            let filter = block.definition();
            let mut groups = self.targets(filter, &["log_group_name"], &["aws_cloudwatch_log_group"]);

            // A literal group name matches the group declaring that name.
            if let Some(name) = filter.attribute("log_group_name").and_then(|v| v.as_str()) {
                groups.extend(
                    self.of_type(&["aws_cloudwatch_log_group"])
                        .filter(|group| group.attribute("name").and_then(|v| v.as_str()) == Some(name))
                        .map(|group| group.key().clone()),
                );
                groups.sort();
                groups.dedup();
            }

            let destinations: Vec<ResourceKey> = filter
                .attribute("destination_arn")
                .map(references_in)
                .unwrap_or_default()
                .into_iter()
                .filter(|key| self.declared.contains(key))
                .collect();

            Self::pairs(out, &groups, &destinations, RelationshipKind::DataFlow, "subscription filter");
        }
    }

    fn instance_profile_role(&self, out: &mut Vec<Relationship>) {
        for instance in self.of_type(&["aws_instance", "aws_launch_template"]) {
            let roles: Vec<ResourceKey> = self
                .targets(instance, &["iam_instance_profile"], &["aws_iam_instance_profile"])
                .iter()
                .filter_map(|profile| self.find(profile))
                .flat_map(|profile| self.targets(profile, &["role", "roles"], &["aws_iam_role"]))
                .collect();

            Self::pairs(
                out,
                std::slice::from_ref(instance.key()),
                &roles,
                RelationshipKind::Identity,
                "assumes",
            );
        }
    }

    fn lambda_log_group_naming(&self, out: &mut Vec<Relationship>) {
        let functions: Vec<&ResourceDefinition> = self.of_type(&["aws_lambda_function"]).collect();

        for group in self.of_type(&["aws_cloudwatch_log_group"]) {
            let matching: Vec<ResourceKey> = match group.attribute("name") {
                Some(AttributeValue::Literal(Literal::String(name))) => {
                    match name.strip_prefix(LAMBDA_LOG_PREFIX) {
                        Some(function_name) => functions
                            .iter()
                            .filter(|f| {
                                f.attribute("function_name").and_then(|v| v.as_str())
                                    == Some(function_name)
                            })
                            .map(|f| f.key().clone())
                            .collect(),
                        None => Vec::new(),
                    }
                }
                // `"/aws/lambda/${aws_lambda_function.x.function_name}"`
                Some(AttributeValue::RawExpression(text))
                    if text.trim_start_matches('"').starts_with(LAMBDA_LOG_PREFIX) =>
                {
                    self.targets(group, &["name"], &["aws_lambda_function"])
                }
                _ => Vec::new(),
            };

            Self::pairs(
                out,
                &matching,
                std::slice::from_ref(group.key()),
                RelationshipKind::DataFlow,
                "writes logs",
            );
        }
    }

    fn listener_forwarding(&self, out: &mut Vec<Relationship>) {
        for listener in self.of_type(&["aws_lb_listener", "aws_alb_listener"]) {
            let balancers = self.targets(listener, &["load_balancer_arn"], &["aws_lb", "aws_alb"]);
            let target_groups = self.targets(
                listener,
                &["target_group_arn"],
                &["aws_lb_target_group", "aws_alb_target_group"],
            );
            Self::pairs(out, &balancers, &target_groups, RelationshipKind::Network, "forwards");
        }
    }

    fn policy_attachment(&self, out: &mut Vec<Relationship>) {
        for attachment in self.of_type(&["aws_iam_role_policy_attachment"]) {
            let roles = self.targets(attachment, &["role"], &["aws_iam_role"]);
            let policies = self.targets(attachment, &["policy_arn"], &["aws_iam_policy"]);
            Self::pairs(out, &roles, &policies, RelationshipKind::Identity, "attached policy");
        }
    }
}

/// Infer the relationships of `resources`.
pub fn infer(resources: &[ResolvedResource], special_blocks: &[SpecialBlock]) -> Vec<Relationship> {
    RelationshipInference::new(resources, special_blocks).infer()
}

#[cfg(test)]
mod tests {
    use std::{collections::BTreeMap, sync::Arc};

    use infragram_core::resource::Tier;
    use infragram_parser::{Configuration, loader::SourceFile, parse_sources};

    use super::*;

    fn configuration(text: &str) -> Configuration {
        let files = [SourceFile::new("main.tf", Arc::<str>::from(text), Tier::Infrastructure)];
        parse_sources(&files, &BTreeMap::new()).unwrap()
    }

    fn inferred(text: &str) -> Vec<String> {
        let configuration = configuration(text);
        infer(configuration.resources(), configuration.special_blocks())
            .iter()
            .map(ToString::to_string)
            .collect()
    }

    #[test]
    fn test_attribute_segment() {
        assert_eq!(attribute_segment("default_action[0].target_group_arn"), "target_group_arn");
        assert_eq!(attribute_segment("ingress[1]"), "ingress");
        assert_eq!(attribute_segment("subnet_id"), "subnet_id");
    }

    #[test]
    fn test_kind_table() {
        assert_eq!(kind_for_attribute("vpc_security_group_ids"), RelationshipKind::Network);
        assert_eq!(kind_for_attribute("iam_instance_profile"), RelationshipKind::Identity);
        assert_eq!(kind_for_attribute("destination_arn"), RelationshipKind::Invocation);
        assert_eq!(kind_for_attribute("log_group_name"), RelationshipKind::DataFlow);
        assert_eq!(kind_for_attribute("tags"), RelationshipKind::Dependency);
    }

    #[test]
    fn test_explicit_reference_yields_one_edge() {
        let edges = inferred(
            r#"
resource "aws_security_group" "allocator" {
  name = "allocator"
}

resource "aws_instance" "allocator" {
  vpc_security_group_ids = [aws_security_group.allocator.id]
  tags = {
    Name = "allocator"
  }
}
"#,
        );
        assert_eq!(
            edges,
            [r#"aws_instance.allocator -> aws_security_group.allocator (network, "vpc_security_group_ids")"#]
        );
    }

    #[test]
    fn test_undeclared_and_self_references_are_ignored() {
        let edges = inferred(
            r#"
resource "aws_instance" "allocator" {
  subnet_id = aws_subnet.missing.id
  user_data = "${aws_instance.allocator.id}"
}
"#,
        );
        assert!(edges.is_empty());
    }

    #[test]
    fn test_duplicates_keep_most_specific_label() {
        let edges = inferred(
            r#"
resource "aws_security_group" "allocator" {}

resource "aws_instance" "allocator" {
  vpc_security_group_ids = [aws_security_group.allocator.id]
  security_groups        = [aws_security_group.allocator.name]
  depends_on             = [aws_security_group.allocator]
}
"#,
        );
        assert_eq!(
            edges,
            [
                r#"aws_instance.allocator -> aws_security_group.allocator (network, "security_groups")"#,
                r#"aws_instance.allocator -> aws_security_group.allocator (dependency, "depends_on")"#,
            ]
        );
    }

    #[test]
    fn test_depends_on_loses_to_attribute_of_same_kind() {
        let relationships = {
            let configuration = configuration(
                r#"
resource "aws_s3_bucket" "logs" {}

resource "aws_instance" "allocator" {
  tags       = { Bucket = aws_s3_bucket.logs.id }
  depends_on = [aws_s3_bucket.logs]
}
"#,
            );
            infer(configuration.resources(), configuration.special_blocks())
        };
        assert_eq!(relationships.len(), 1);
        assert_eq!(relationships[0].origin(), Origin::Attribute);
        assert_eq!(relationships[0].label(), "tags");
    }

    #[test]
    fn test_implicit_rules() {
        let edges = inferred(
            r#"
resource "aws_iam_role" "allocator" {
  name = "allocator-role"
}

resource "aws_iam_policy" "logs" {
  name = "logs"
}

resource "aws_iam_role_policy_attachment" "logs" {
  role       = aws_iam_role.allocator.name
  policy_arn = aws_iam_policy.logs.arn
}

resource "aws_iam_instance_profile" "allocator" {
  role = aws_iam_role.allocator.name
}

resource "aws_instance" "allocator" {
  iam_instance_profile = aws_iam_instance_profile.allocator.name
}

resource "aws_lambda_function" "processor" {
  function_name = "log-processor"
}

resource "aws_cloudwatch_log_group" "processor" {
  name = "/aws/lambda/log-processor"
}

resource "aws_cloudwatch_log_group" "client" {
  name = "client-vm-logs"
}

resource "aws_cloudwatch_log_subscription_filter" "client" {
  log_group_name  = aws_cloudwatch_log_group.client.name
  destination_arn = aws_lambda_function.processor.arn
}

resource "aws_lb" "main" {
  internal = false
}

resource "aws_lb_target_group" "allocator" {
  port = 5000
}

resource "aws_lb_listener" "http" {
  load_balancer_arn = aws_lb.main.arn
  default_action {
    type             = "forward"
    target_group_arn = aws_lb_target_group.allocator.arn
  }
}
"#,
        );

        for expected in [
            r#"aws_cloudwatch_log_group.client -> aws_lambda_function.processor (data_flow, "subscription filter")"#,
            r#"aws_instance.allocator -> aws_iam_role.allocator (identity, "assumes")"#,
            r#"aws_lambda_function.processor -> aws_cloudwatch_log_group.processor (data_flow, "writes logs")"#,
            r#"aws_lb.main -> aws_lb_target_group.allocator (network, "forwards")"#,
            r#"aws_iam_role.allocator -> aws_iam_policy.logs (identity, "attached policy")"#,
        ] {
            assert!(edges.iter().any(|e| e == expected), "missing {expected} in {edges:#?}");
        }
    }

    #[test]
    fn test_output_is_sorted() {
        let configuration = configuration(
            r#"
resource "aws_vpc" "main" {}

resource "aws_subnet" "b" {
  vpc_id = aws_vpc.main.id
}

resource "aws_subnet" "a" {
  vpc_id = aws_vpc.main.id
}
"#,
        );
        let relationships = infer(configuration.resources(), configuration.special_blocks());
        let mut sorted = relationships.clone();
        sorted.sort();
        assert_eq!(relationships, sorted);
        assert_eq!(relationships[0].source().name(), "a");
    }
}
