//! Resource identity.
//!
//! A declared resource is identified by the `(type, name)` pair written in its
//! block header, e.g. `resource "aws_instance" "allocator"`. [`ResourceKey`]
//! holds that pair; [`ResourceRef`] is a reference to a key from inside some
//! attribute value, optionally naming the attribute being read
//! (`aws_iam_role.lambda.arn`).

use std::{cmp::Ordering, fmt, str::FromStr};

use thiserror::Error;

/// Error returned when a string is not a `type.name` pair.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid resource key `{0}`: expected `<type>.<name>`")]
pub struct InvalidResourceKey(String);

/// Unique identity of a resource definition: its type and its name.
///
/// Keys order by type first, then by name, which keeps every map keyed by
/// [`ResourceKey`] deterministic.
///
/// # Examples
///
/// ```
/// use infragram_core::identifier::ResourceKey;
///
/// let key = ResourceKey::new("aws_instance", "allocator");
/// assert_eq!(key.to_string(), "aws_instance.allocator");
///
/// let parsed: ResourceKey = "aws_lb.main".parse().unwrap();
/// assert_eq!(parsed.resource_type(), "aws_lb");
/// assert_eq!(parsed.name(), "main");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceKey {
    resource_type: String,
    name: String,
}

impl ResourceKey {
    /// Create a key from a resource type and a resource name.
    pub fn new(resource_type: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            name: name.into(),
        }
    }

    /// The resource type, e.g. `aws_instance`.
    pub fn resource_type(&self) -> &str {
        &self.resource_type
    }

    /// The resource name, e.g. `allocator`.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Ord for ResourceKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.resource_type
            .cmp(&other.resource_type)
            .then_with(|| self.name.cmp(&other.name))
    }
}

impl PartialOrd for ResourceKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.resource_type, self.name)
    }
}

impl FromStr for ResourceKey {
    type Err = InvalidResourceKey;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('.') {
            Some((resource_type, name))
                if !resource_type.is_empty() && !name.is_empty() && !name.contains('.') =>
            {
                Ok(Self::new(resource_type, name))
            }
            _ => Err(InvalidResourceKey(s.to_string())),
        }
    }
}

/// A reference from an attribute value to another resource.
///
/// `attribute` is the first attribute segment after the key, if any: for
/// `aws_iam_role.lambda.arn` it is `Some("arn")`, for a bare
/// `aws_iam_role.lambda` (as written in `depends_on`) it is `None`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceRef {
    key: ResourceKey,
    attribute: Option<String>,
}

impl ResourceRef {
    /// Create a reference to `key`, optionally reading `attribute`.
    pub fn new(key: ResourceKey, attribute: Option<String>) -> Self {
        Self { key, attribute }
    }

    /// The referenced resource.
    pub fn key(&self) -> &ResourceKey {
        &self.key
    }

    /// The attribute read from the referenced resource, if any.
    pub fn attribute(&self) -> Option<&str> {
        self.attribute.as_deref()
    }
}

impl fmt::Display for ResourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.attribute {
            Some(attribute) => write!(f, "{}.{}", self.key, attribute),
            None => write!(f, "{}", self.key),
        }
    }
}
