//! Resolution of local values and input variables.
//!
//! Locals form a dependency graph: `local.a` depends on every `local.x`
//! its expression mentions. The graph is sorted topologically and each local
//! is evaluated once all of its dependencies are. A cycle has no valid
//! evaluation order, so it fails the whole run.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use indexmap::IndexMap;
use infragram_core::{resource::ResourceDefinition, value::{AttributeValue, Literal}};
use log::{debug, info};
use petgraph::{
    algo::{tarjan_scc, toposort},
    graph::{DiGraph, NodeIndex},
};
use thiserror::Error;

use crate::{
    error::ErrorCode,
    expr::{self, Evaluation},
    extract::{LocalDefinition, VariableDefinition},
    references::scan_value_names,
};

/// Locals that reference each other in a cycle.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cyclic reference between local values: {}", .members.join(", "))]
pub struct CyclicReferenceError {
    /// Qualified names of the cycle members, sorted.
    pub members: Vec<String>,
}

impl CyclicReferenceError {
    pub fn code(&self) -> ErrorCode {
        ErrorCode::E200
    }
}

/// The outcome of resolution: known values and the names left unknown.
///
/// Names are qualified: `local.region`, `var.environment`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Resolution {
    values: BTreeMap<String, Literal>,
    unresolved: BTreeSet<String>,
}

impl Resolution {
    pub fn get(&self, name: &str) -> Option<&Literal> {
        self.values.get(name)
    }

    pub fn values(&self) -> &BTreeMap<String, Literal> {
        &self.values
    }

    pub fn unresolved(&self) -> &BTreeSet<String> {
        &self.unresolved
    }

    pub fn is_unresolved(&self, name: &str) -> bool {
        self.unresolved.contains(name)
    }
}

/// Resolve every local and variable to a literal where possible.
///
/// A variable takes its value from `overrides` (keyed by unqualified name),
/// then from a literal default. Without either it stays unresolved.
///
/// # Errors
///
/// Returns [`CyclicReferenceError`] if locals reference each other in a
/// cycle, including a local referencing itself.
pub fn resolve(
    locals: &[LocalDefinition],
    variables: &[VariableDefinition],
    overrides: &BTreeMap<String, Literal>,
) -> Result<Resolution, CyclicReferenceError> {
    let mut resolution = Resolution::default();

    for variable in variables {
        let name = format!("var.{}", variable.name());
        let value = overrides.get(variable.name()).cloned().or_else(|| {
            let expr = expr::parse(variable.default()?)?;
            expr.evaluate(&BTreeMap::new()).known().cloned()
        });
        match value {
            Some(literal) => {
                resolution.values.insert(name, literal);
            }
            None => {
                resolution.unresolved.insert(name);
            }
        }
    }
    for (name, literal) in overrides {
        resolution
            .values
            .entry(format!("var.{name}"))
            .or_insert_with(|| literal.clone());
    }

    for local in evaluation_order(locals)? {
        let name = format!("local.{}", local.name());
        match expr::parse(local.expression()).map(|e| e.evaluate(&resolution.values)) {
            Some(Evaluation::Known(literal)) => {
                debug!(name = name.as_str(), value = literal.to_string(); "Resolved local value");
                resolution.values.insert(name, literal);
            }
            Some(Evaluation::Unresolved(_)) | None => {
                debug!(name = name.as_str(); "Local value left unresolved");
                resolution.unresolved.insert(name);
            }
        }
    }

    info!(
        resolved = resolution.values.len(),
        unresolved = resolution.unresolved.len();
        "Resolved locals and variables"
    );

    Ok(resolution)
}

/// Order locals so every local comes after the locals it references.
fn evaluation_order(locals: &[LocalDefinition]) -> Result<Vec<&LocalDefinition>, CyclicReferenceError> {
    let mut graph: DiGraph<&LocalDefinition, ()> = DiGraph::new();
    let indices: HashMap<&str, NodeIndex> = locals
        .iter()
        .map(|local| (local.name(), graph.add_node(local)))
        .collect();

    for local in locals {
        let dependent = indices[local.name()];
        for name in scan_value_names(local.expression()) {
            let Some(dependency) = name.strip_prefix("local.").and_then(|n| indices.get(n)) else {
                continue;
            };
            graph.update_edge(*dependency, dependent, ());
        }
    }

    match toposort(&graph, None) {
        Ok(order) => Ok(order.into_iter().map(|index| graph[index]).collect()),
        Err(_) => Err(cycle_error(&graph)),
    }
}

fn cycle_error(graph: &DiGraph<&LocalDefinition, ()>) -> CyclicReferenceError {
    let component = tarjan_scc(graph)
        .into_iter()
        .find(|scc| scc.len() > 1 || graph.contains_edge(scc[0], scc[0]))
        .unwrap_or_default();

    let mut members: Vec<String> = component
        .into_iter()
        .map(|index| format!("local.{}", graph[index].name()))
        .collect();
    members.sort();
    CyclicReferenceError { members }
}

/// Substitute resolved values into a resource's raw expressions.
///
/// Returns a new definition; the input is left untouched. Applying this to
/// its own output changes nothing.
pub fn resolve_resource(definition: &ResourceDefinition, resolution: &Resolution) -> ResourceDefinition {
    let attributes: IndexMap<String, AttributeValue> = definition
        .attributes()
        .iter()
        .map(|(name, value)| (name.clone(), substitute(value, resolution)))
        .collect();
    definition.with_attributes(attributes)
}

fn substitute(value: &AttributeValue, resolution: &Resolution) -> AttributeValue {
    let AttributeValue::RawExpression(text) = value else {
        return value.clone();
    };
    match expr::parse(text).map(|e| e.evaluate(resolution.values())) {
        Some(Evaluation::Known(literal)) => AttributeValue::Literal(literal),
        _ => value.clone(),
    }
}

#[cfg(test)]
mod tests {
    use infragram_core::resource::SourceLocation;
    use proptest::prelude::*;

    use super::*;

    fn local(name: &str, expression: &str) -> LocalDefinition {
        LocalDefinition::new(name, expression, SourceLocation::new("locals.tf", 1, 1))
    }

    fn variable(name: &str, default: Option<&str>) -> VariableDefinition {
        VariableDefinition::new(name, default.map(str::to_string), SourceLocation::new("variables.tf", 1, 1))
    }

    #[test]
    fn test_resolves_transitive_locals_in_any_declaration_order() {
        let locals = [
            local("name", r#""${local.prefix}-allocator""#),
            local("prefix", r#""${var.project}-${local.env}""#),
            local("env", r#""dev""#),
        ];
        let variables = [variable("project", Some(r#""arena""#))];

        let resolution = resolve(&locals, &variables, &BTreeMap::new()).unwrap();
        assert_eq!(
            resolution.get("local.name"),
            Some(&Literal::String("arena-dev-allocator".into()))
        );
        assert!(resolution.unresolved().is_empty());
    }

    #[test]
    fn test_override_wins_over_default() {
        let variables = [variable("environment", Some(r#""dev""#))];
        let overrides = BTreeMap::from([("environment".to_string(), Literal::String("prod".into()))]);

        let resolution = resolve(&[], &variables, &overrides).unwrap();
        assert_eq!(resolution.get("var.environment"), Some(&Literal::String("prod".into())));
    }

    #[test]
    fn test_inputs_without_default_stay_unresolved() {
        let locals = [local("bastion_count", "var.enable_bastion ? 1 : 0")];
        let variables = [variable("enable_bastion", None)];

        let resolution = resolve(&locals, &variables, &BTreeMap::new()).unwrap();
        assert!(resolution.is_unresolved("var.enable_bastion"));
        assert!(resolution.is_unresolved("local.bastion_count"));
    }

    #[test]
    fn test_expressions_outside_the_subset_stay_unresolved() {
        let locals = [local("tags", r#"merge(local.base, { Name = "x" })"#), local("base", "{}")];
        let resolution = resolve(&locals, &[], &BTreeMap::new()).unwrap();
        assert!(resolution.is_unresolved("local.tags"));
        assert!(resolution.is_unresolved("local.base"));
    }

    #[test]
    fn test_two_member_cycle() {
        let locals = [local("a", "local.b"), local("b", "local.a"), local("c", "1")];
        let err = resolve(&locals, &[], &BTreeMap::new()).unwrap_err();
        assert_eq!(err.members, ["local.a", "local.b"]);
        assert_eq!(err.code(), ErrorCode::E200);
    }

    #[test]
    fn test_self_reference_is_a_cycle() {
        let locals = [local("a", r#""${local.a}-x""#)];
        let err = resolve(&locals, &[], &BTreeMap::new()).unwrap_err();
        assert_eq!(err.members, ["local.a"]);
    }

    #[test]
    fn test_cycle_hidden_in_unsupported_expression_is_detected() {
        let locals = [local("a", "merge(local.b)"), local("b", "concat(local.a)")];
        assert!(resolve(&locals, &[], &BTreeMap::new()).is_err());
    }

    #[test]
    fn test_resolve_resource_substitutes_known_values() {
        use infragram_core::identifier::ResourceKey;

        let resolution = resolve(&[local("type", r#""t3.micro""#)], &[], &BTreeMap::new()).unwrap();
        let definition = ResourceDefinition::new(
            ResourceKey::new("aws_instance", "web"),
            IndexMap::from([
                ("instance_type".to_string(), AttributeValue::RawExpression("local.type".into())),
                ("subnet_id".to_string(), AttributeValue::RawExpression("var.subnet".into())),
            ]),
            SourceLocation::new("main.tf", 1, 4),
        );

        let resolved = resolve_resource(&definition, &resolution);
        assert_eq!(resolved.attribute("instance_type").and_then(|v| v.as_str()), Some("t3.micro"));
        assert_eq!(
            resolved.attribute("subnet_id"),
            Some(&AttributeValue::RawExpression("var.subnet".into()))
        );
        assert_eq!(resolve_resource(&resolved, &resolution), resolved);
        assert_eq!(
            definition.attribute("instance_type"),
            Some(&AttributeValue::RawExpression("local.type".into()))
        );
    }

    proptest! {
        #[test]
        fn prop_cycle_of_any_length_is_detected(len in 1usize..300, offset in 0usize..300) {
            // local.l0 -> l1 -> ... -> l{len-1} -> l0, declared in a rotated order.
            let mut locals: Vec<LocalDefinition> = (0..len)
                .map(|i| local(&format!("l{i}"), &format!("local.l{}", (i + 1) % len)))
                .collect();
            locals.rotate_left(offset % len);

            let err = resolve(&locals, &[], &BTreeMap::new()).unwrap_err();
            prop_assert_eq!(err.members.len(), len);
        }

        #[test]
        fn prop_resolution_is_idempotent(
            values in proptest::collection::vec(
                prop_oneof![
                    any::<bool>().prop_map(Literal::Bool),
                    (-500i32..500).prop_map(|n| Literal::Number(f64::from(n))),
                    "[a-z ${}%\"\\\\]{0,10}".prop_map(Literal::String),
                ],
                1..12,
            ),
            selector in any::<u64>(),
        ) {
            // Each local either is a literal or refers to an earlier one,
            // possibly through a comparison or ternary.
            let locals: Vec<LocalDefinition> = values
                .iter()
                .enumerate()
                .map(|(i, literal)| {
                    let expression = match (i, (selector >> (i * 2)) & 3) {
                        (0, _) | (_, 0) => literal.to_source(),
                        (_, 1) => format!("local.v{}", i - 1),
                        (_, 2) => format!("local.v{} == {}", i - 1, literal.to_source()),
                        _ => format!("local.v{} != {} ? {} : local.v{}", i - 1, literal.to_source(), literal.to_source(), i - 1),
                    };
                    local(&format!("v{i}"), &expression)
                })
                .collect();

            let first = resolve(&locals, &[], &BTreeMap::new()).unwrap();
            prop_assert!(first.unresolved().is_empty());

            let resolved_locals: Vec<LocalDefinition> = first
                .values()
                .iter()
                .map(|(name, literal)| {
                    local(name.trim_start_matches("local."), &literal.to_source())
                })
                .collect();
            let second = resolve(&resolved_locals, &[], &BTreeMap::new()).unwrap();
            prop_assert_eq!(second, first);
        }
    }
}
