//! Resource definitions.
//!
//! A [`ResourceDefinition`] is created once, during extraction, and never
//! mutated afterward. Stages that need to change attribute values (the
//! resolver substituting literals) derive a new definition with
//! [`ResourceDefinition::with_attributes`].

use std::{
    cmp::Ordering,
    fmt,
    path::{Path, PathBuf},
};

use indexmap::IndexMap;
use serde::Deserialize;

use crate::{identifier::ResourceKey, value::AttributeValue};

/// Where a declaration block was found.
///
/// Lines are 1-based and inclusive. Locations order by file path and then by
/// starting line, which is the declaration order used to make every stage of
/// the pipeline deterministic.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SourceLocation {
    file: PathBuf,
    line_start: usize,
    line_end: usize,
}

impl SourceLocation {
    pub fn new(file: impl Into<PathBuf>, line_start: usize, line_end: usize) -> Self {
        Self {
            file: file.into(),
            line_start,
            line_end,
        }
    }

    pub fn file(&self) -> &Path {
        &self.file
    }

    pub fn line_start(&self) -> usize {
        self.line_start
    }

    pub fn line_end(&self) -> usize {
        self.line_end
    }
}

impl Ord for SourceLocation {
    fn cmp(&self, other: &Self) -> Ordering {
        self.file
            .cmp(&other.file)
            .then_with(|| self.line_start.cmp(&other.line_start))
            .then_with(|| self.line_end.cmp(&other.line_end))
    }
}

impl PartialOrd for SourceLocation {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file.display(), self.line_start)
    }
}

/// Deployment tier a resource belongs to.
///
/// The tier is decided by the source directory a file was loaded from, not by
/// anything written in the file itself.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    /// Long-lived infrastructure declared by the operator.
    #[default]
    Infrastructure,
    /// Resources provisioned at runtime by the infrastructure itself.
    RuntimeProvisioned,
}

impl From<Tier> for &'static str {
    fn from(val: Tier) -> Self {
        match val {
            Tier::Infrastructure => "infrastructure",
            Tier::RuntimeProvisioned => "runtime_provisioned",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s: &'static str = (*self).into();
        write!(f, "{s}")
    }
}

/// A single declared resource.
///
/// Attribute order follows the source text. Nested blocks are kept as opaque
/// raw expressions under an indexed key such as `ingress[0]`, so repeated
/// blocks of the same name never overwrite each other.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceDefinition {
    key: ResourceKey,
    attributes: IndexMap<String, AttributeValue>,
    location: SourceLocation,
    tier: Tier,
}

impl ResourceDefinition {
    /// Create a definition in the default [`Tier::Infrastructure`] tier.
    pub fn new(
        key: ResourceKey,
        attributes: IndexMap<String, AttributeValue>,
        location: SourceLocation,
    ) -> Self {
        Self {
            key,
            attributes,
            location,
            tier: Tier::default(),
        }
    }

    /// Returns a copy of this definition placed in `tier`.
    pub fn with_tier(mut self, tier: Tier) -> Self {
        self.tier = tier;
        self
    }

    /// Returns a derived definition with the attribute table replaced.
    ///
    /// Identity, location and tier are carried over unchanged.
    pub fn with_attributes(&self, attributes: IndexMap<String, AttributeValue>) -> Self {
        Self {
            key: self.key.clone(),
            attributes,
            location: self.location.clone(),
            tier: self.tier,
        }
    }

    pub fn key(&self) -> &ResourceKey {
        &self.key
    }

    pub fn resource_type(&self) -> &str {
        self.key.resource_type()
    }

    pub fn name(&self) -> &str {
        self.key.name()
    }

    pub fn attributes(&self) -> &IndexMap<String, AttributeValue> {
        &self.attributes
    }

    /// Look up a single attribute by name.
    pub fn attribute(&self, name: &str) -> Option<&AttributeValue> {
        self.attributes.get(name)
    }

    pub fn location(&self) -> &SourceLocation {
        &self.location
    }

    pub fn tier(&self) -> Tier {
        self.tier
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Literal;

    fn definition(file: &str, line: usize) -> ResourceDefinition {
        let mut attributes = IndexMap::new();
        attributes.insert(
            "instance_type".to_string(),
            AttributeValue::Literal(Literal::String("t3.large".into())),
        );
        ResourceDefinition::new(
            ResourceKey::new("aws_instance", "allocator"),
            attributes,
            SourceLocation::new(file, line, line + 4),
        )
    }

    #[test]
    fn test_source_location_orders_by_file_then_line() {
        let mut locations = vec![
            SourceLocation::new("b.tf", 1, 2),
            SourceLocation::new("a.tf", 10, 12),
            SourceLocation::new("a.tf", 3, 8),
        ];
        locations.sort();

        let rendered: Vec<_> = locations.iter().map(ToString::to_string).collect();
        assert_eq!(rendered, ["a.tf:3", "a.tf:10", "b.tf:1"]);
    }

    #[test]
    fn test_with_attributes_keeps_identity() {
        let original = definition("main.tf", 5).with_tier(Tier::RuntimeProvisioned);
        let derived = original.with_attributes(IndexMap::new());

        assert_eq!(derived.key(), original.key());
        assert_eq!(derived.location(), original.location());
        assert_eq!(derived.tier(), Tier::RuntimeProvisioned);
        assert!(derived.attributes().is_empty());
        assert_eq!(original.attributes().len(), 1);
    }

    #[test]
    fn test_attribute_lookup() {
        let def = definition("main.tf", 1);
        assert_eq!(
            def.attribute("instance_type").and_then(AttributeValue::as_str),
            Some("t3.large")
        );
        assert!(def.attribute("ami").is_none());
    }
}
