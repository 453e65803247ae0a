//! Directed, typed relationships between resources.

use std::{cmp::Ordering, fmt, str::FromStr};

use serde::Deserialize;

use crate::identifier::ResourceKey;

/// What a relationship means architecturally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationshipKind {
    /// Traffic can flow between the two resources.
    Network,
    /// The source assumes, or is granted, the target identity.
    Identity,
    /// The source invokes the target.
    Invocation,
    /// Data (logs, records, objects) moves from source to target.
    DataFlow,
    /// A plain ordering or structural dependency.
    Dependency,
}

impl RelationshipKind {
    /// All kinds, in declaration order.
    pub const ALL: [RelationshipKind; 5] = [
        RelationshipKind::Network,
        RelationshipKind::Identity,
        RelationshipKind::Invocation,
        RelationshipKind::DataFlow,
        RelationshipKind::Dependency,
    ];
}

impl FromStr for RelationshipKind {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "network" => Ok(Self::Network),
            "identity" => Ok(Self::Identity),
            "invocation" => Ok(Self::Invocation),
            "data_flow" => Ok(Self::DataFlow),
            "dependency" => Ok(Self::Dependency),
            _ => Err("Unsupported relationship kind"),
        }
    }
}

impl From<RelationshipKind> for &'static str {
    fn from(val: RelationshipKind) -> Self {
        match val {
            RelationshipKind::Network => "network",
            RelationshipKind::Identity => "identity",
            RelationshipKind::Invocation => "invocation",
            RelationshipKind::DataFlow => "data_flow",
            RelationshipKind::Dependency => "dependency",
        }
    }
}

impl fmt::Display for RelationshipKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s: &'static str = (*self).into();
        write!(f, "{s}")
    }
}

/// How a relationship was discovered.
///
/// Variants are declared from most to least specific; the derived ordering
/// is the specificity order used when duplicates collapse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Origin {
    /// A reference written in an ordinary attribute value.
    Attribute,
    /// Added by a rule of the implicit relationship table.
    Implicit,
    /// A reference listed in `depends_on`.
    DependsOn,
}

/// A directed edge between two declared resources.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Relationship {
    source: ResourceKey,
    target: ResourceKey,
    kind: RelationshipKind,
    origin: Origin,
    label: String,
}

impl Relationship {
    pub fn new(
        source: ResourceKey,
        target: ResourceKey,
        kind: RelationshipKind,
        origin: Origin,
        label: impl Into<String>,
    ) -> Self {
        Self {
            source,
            target,
            kind,
            origin,
            label: label.into(),
        }
    }

    pub fn source(&self) -> &ResourceKey {
        &self.source
    }

    pub fn target(&self) -> &ResourceKey {
        &self.target
    }

    pub fn kind(&self) -> RelationshipKind {
        self.kind
    }

    pub fn origin(&self) -> Origin {
        self.origin
    }

    /// Whether the relationship is written in the source text, as opposed to
    /// being added by the implicit rule table.
    pub fn is_explicit(&self) -> bool {
        !matches!(self.origin, Origin::Implicit)
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// The `(source, target, kind)` triple duplicates collapse on.
    pub fn identity(&self) -> (&ResourceKey, &ResourceKey, RelationshipKind) {
        (&self.source, &self.target, self.kind)
    }

    /// Compare by specificity: lower is more specific.
    ///
    /// Origin decides first; equal origins fall back to the lexicographically
    /// smallest label.
    pub fn specificity_cmp(&self, other: &Self) -> Ordering {
        self.origin
            .cmp(&other.origin)
            .then_with(|| self.label.cmp(&other.label))
    }
}

impl Ord for Relationship {
    fn cmp(&self, other: &Self) -> Ordering {
        self.source
            .cmp(&other.source)
            .then_with(|| self.target.cmp(&other.target))
            .then_with(|| self.kind.cmp(&other.kind))
            .then_with(|| self.specificity_cmp(other))
    }
}

impl PartialOrd for Relationship {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Relationship {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} -> {} ({}, \"{}\")",
            self.source, self.target, self.kind, self.label
        )
    }
}
