//! Presence classification from `count` and `for_each`.

use infragram_core::{
    conditional::Presence,
    resource::ResourceDefinition,
    value::{AttributeValue, Literal},
};

use crate::{
    expr::{self, Evaluation},
    references::{scan_references, scan_value_names},
    resolve::Resolution,
};

/// Classify whether a resource is present in this configuration.
///
/// Runs on the definition as extracted, before substitution, so the
/// condition text shown for dynamic resources reads like the source.
///
/// - No `count` or `for_each`: always present.
/// - `count` that evaluates to zero: never present; to any other valid
///   count: always present.
/// - `for_each` over a literal empty collection: never present; over a
///   literal non-empty collection: always present.
/// - Anything else is dynamic.
pub fn classify(definition: &ResourceDefinition, resolution: &Resolution) -> Presence {
    if let Some(count) = definition.attribute("count") {
        return classify_count(count, resolution);
    }
    if let Some(for_each) = definition.attribute("for_each") {
        return classify_for_each(&for_each.to_source());
    }
    Presence::always()
}

fn presence_of(literal: &Literal, condition: impl FnOnce() -> String) -> Presence {
    match literal.as_count() {
        Some(0) => Presence::never(),
        Some(_) => Presence::always(),
        None => Presence::dynamic(condition()),
    }
}

fn classify_count(count: &AttributeValue, resolution: &Resolution) -> Presence {
    match count {
        AttributeValue::Literal(literal) => presence_of(literal, || literal.to_string()),
        AttributeValue::Reference(reference) => Presence::dynamic(reference.to_string()),
        AttributeValue::RawExpression(text) => {
            let Some(expr) = expr::parse(text) else {
                return Presence::dynamic(text.as_str());
            };
            match expr.evaluate(resolution.values()) {
                Evaluation::Known(literal) => presence_of(&literal, || expr.condition_label()),
                Evaluation::Unresolved(_) => Presence::dynamic(expr.condition_label()),
            }
        }
    }
}

fn classify_for_each(text: &str) -> Presence {
    let compact: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    let literal_collection = (compact.starts_with('{') && compact.ends_with('}'))
        || (compact.starts_with('[') && compact.ends_with(']'));

    if !literal_collection || !scan_value_names(text).is_empty() || !scan_references(text).is_empty() {
        return Presence::dynamic(text);
    }
    if compact == "{}" || compact == "[]" {
        Presence::never()
    } else {
        Presence::always()
    }
}
