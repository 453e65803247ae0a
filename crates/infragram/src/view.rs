//! Declarative diagram views.
//!
//! A view is a filter over the single model built per run: which categories
//! appear, which relationship kinds are drawn, whether implicit edges and
//! conditional annotations are shown and how deeply clusters nest. Built-in
//! views are plain [`ViewSpec`] values; user views from the configuration
//! file use the same type.

use std::{fmt, str::FromStr};

use serde::Deserialize;

use infragram_core::{category::Category, relationship::RelationshipKind};

/// Which `all-*` selection a view belongs to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewGroup {
    Essential,
    Supplementary,
    /// Only rendered by name or by `all`.
    #[default]
    Custom,
}

impl From<ViewGroup> for &'static str {
    fn from(val: ViewGroup) -> Self {
        match val {
            ViewGroup::Essential => "essential",
            ViewGroup::Supplementary => "supplementary",
            ViewGroup::Custom => "custom",
        }
    }
}

impl fmt::Display for ViewGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s: &'static str = (*self).into();
        write!(f, "{s}")
    }
}

fn default_true() -> bool {
    true
}

/// A named selection over the diagram model.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ViewSpec {
    name: String,

    /// Diagram title; the configured title when absent.
    #[serde(default)]
    title: Option<String>,

    #[serde(default)]
    group: ViewGroup,

    /// Included categories; empty means all.
    #[serde(default)]
    categories: Vec<Category>,

    /// Included relationship kinds; empty means all.
    #[serde(default)]
    kinds: Vec<RelationshipKind>,

    /// Whether edges from the implicit rule table are drawn.
    #[serde(default = "default_true")]
    implicit_edges: bool,

    /// Whether conditional and runtime annotations and border styles are
    /// drawn.
    #[serde(default = "default_true")]
    annotations: bool,

    /// Maximum cluster nesting; unlimited when absent.
    #[serde(default)]
    cluster_depth: Option<usize>,
}

impl ViewSpec {
    /// A view showing everything, in the custom group.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            title: None,
            group: ViewGroup::Custom,
            categories: Vec::new(),
            kinds: Vec::new(),
            implicit_edges: true,
            annotations: true,
            cluster_depth: None,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_group(mut self, group: ViewGroup) -> Self {
        self.group = group;
        self
    }

    pub fn with_categories(mut self, categories: impl IntoIterator<Item = Category>) -> Self {
        self.categories = categories.into_iter().collect();
        self
    }

    pub fn with_kinds(mut self, kinds: impl IntoIterator<Item = RelationshipKind>) -> Self {
        self.kinds = kinds.into_iter().collect();
        self
    }

    pub fn with_implicit_edges(mut self, implicit_edges: bool) -> Self {
        self.implicit_edges = implicit_edges;
        self
    }

    pub fn with_annotations(mut self, annotations: bool) -> Self {
        self.annotations = annotations;
        self
    }

    pub fn with_cluster_depth(mut self, depth: usize) -> Self {
        self.cluster_depth = Some(depth);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn group(&self) -> ViewGroup {
        self.group
    }

    pub fn includes_category(&self, category: Category) -> bool {
        self.categories.is_empty() || self.categories.contains(&category)
    }

    pub fn includes_kind(&self, kind: RelationshipKind) -> bool {
        self.kinds.is_empty() || self.kinds.contains(&kind)
    }

    pub fn implicit_edges(&self) -> bool {
        self.implicit_edges
    }

    pub fn annotations(&self) -> bool {
        self.annotations
    }

    pub fn cluster_depth(&self) -> Option<usize> {
        self.cluster_depth
    }
}

/// The built-in views, essential ones first.
pub fn builtin_views() -> Vec<ViewSpec> {
    use Category as C;
    use RelationshipKind as K;

    vec![
        ViewSpec::new("main")
            .with_title("Infrastructure Overview")
            .with_group(ViewGroup::Essential)
            .with_implicit_edges(false)
            .with_annotations(false)
            .with_cluster_depth(1),
        ViewSpec::new("detailed")
            .with_title("Detailed Infrastructure Architecture")
            .with_group(ViewGroup::Essential),
        ViewSpec::new("network-flow")
            .with_title("Network Traffic Flow")
            .with_group(ViewGroup::Essential)
            .with_categories([C::Dns, C::LoadBalancing, C::Network, C::Compute])
            .with_kinds([K::Network]),
        ViewSpec::new("logging-pipeline")
            .with_title("Logging Pipeline")
            .with_group(ViewGroup::Essential)
            .with_categories([C::Observability, C::Compute])
            .with_kinds([K::DataFlow, K::Invocation]),
        ViewSpec::new("identity")
            .with_title("IAM & Permissions")
            .with_group(ViewGroup::Supplementary)
            .with_categories([C::Identity, C::Compute])
            .with_kinds([K::Identity]),
        ViewSpec::new("security")
            .with_title("Security Groups")
            .with_group(ViewGroup::Supplementary)
            .with_categories([C::Security, C::Compute, C::LoadBalancing])
            .with_kinds([K::Network]),
    ]
}

/// Built-in views with user views merged in.
///
/// A user view named like a built-in one replaces it in place; other user
/// views are appended in configuration order.
pub fn merge_views(user_views: &[ViewSpec]) -> Vec<ViewSpec> {
    let mut views = builtin_views();
    for user_view in user_views {
        match views.iter_mut().find(|v| v.name == user_view.name) {
            Some(existing) => *existing = user_view.clone(),
            None => views.push(user_view.clone()),
        }
    }
    views
}

/// Which views a run renders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewSelection {
    All,
    Group(ViewGroup),
    Named(String),
}

impl ViewSelection {
    /// The selected views out of `views`.
    ///
    /// # Errors
    ///
    /// Returns a message listing the known views when a named view does not
    /// exist.
    pub fn select<'a>(&self, views: &'a [ViewSpec]) -> Result<Vec<&'a ViewSpec>, String> {
        match self {
            ViewSelection::All => Ok(views.iter().collect()),
            ViewSelection::Group(group) => Ok(views.iter().filter(|v| v.group == *group).collect()),
            ViewSelection::Named(name) => match views.iter().find(|v| &v.name == name) {
                Some(view) => Ok(vec![view]),
                None => {
                    let known: Vec<&str> = views.iter().map(ViewSpec::name).collect();
                    Err(format!("unknown view `{name}`; known views: {}", known.join(", ")))
                }
            },
        }
    }
}

impl Default for ViewSelection {
    fn default() -> Self {
        ViewSelection::Group(ViewGroup::Essential)
    }
}

impl FromStr for ViewSelection {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "" => Err("View name must not be empty"),
            "all" => Ok(Self::All),
            "all-essential" => Ok(Self::Group(ViewGroup::Essential)),
            "all-supplementary" => Ok(Self::Group(ViewGroup::Supplementary)),
            name => Ok(Self::Named(name.to_string())),
        }
    }
}

impl fmt::Display for ViewSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ViewSelection::All => write!(f, "all"),
            ViewSelection::Group(group) => write!(f, "all-{group}"),
            ViewSelection::Named(name) => write!(f, "{name}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selection_groups() {
        let views = builtin_views();

        let essential = ViewSelection::Group(ViewGroup::Essential).select(&views).unwrap();
        let names: Vec<_> = essential.iter().map(|v| v.name()).collect();
        assert_eq!(names, ["main", "detailed", "network-flow", "logging-pipeline"]);

        let supplementary: Vec<_> = "all-supplementary"
            .parse::<ViewSelection>()
            .unwrap()
            .select(&views)
            .unwrap()
            .iter()
            .map(|v| v.name())
            .collect();
        assert_eq!(supplementary, ["identity", "security"]);

        assert_eq!(ViewSelection::All.select(&views).unwrap().len(), 6);
    }

    #[test]
    fn test_unknown_view_is_an_error() {
        let err = ViewSelection::Named("nope".into()).select(&builtin_views()).unwrap_err();
        assert!(err.contains("main"));
    }

    #[test]
    fn test_user_view_replaces_builtin() {
        let custom = ViewSpec::new("main").with_categories([Category::Compute]);
        let views = merge_views(&[custom.clone(), ViewSpec::new("extra")]);

        assert_eq!(views.len(), 7);
        assert_eq!(views[0], custom);
        assert_eq!(views[6].name(), "extra");
    }

    #[test]
    fn test_filters() {
        let views = builtin_views();
        let network = &views[2];
        assert!(network.includes_category(Category::Compute));
        assert!(!network.includes_category(Category::Identity));
        assert!(network.includes_kind(RelationshipKind::Network));
        assert!(!network.includes_kind(RelationshipKind::DataFlow));

        let detailed = &views[1];
        assert!(detailed.includes_category(Category::Unknown));
        assert!(detailed.includes_kind(RelationshipKind::Dependency));
    }

    #[test]
    fn test_deserialize_defaults() {
        let view: ViewSpec = toml::from_str("name = \"workers\"\nkinds = [\"data_flow\"]\n").unwrap();
        assert_eq!(view.group(), ViewGroup::Custom);
        assert!(view.implicit_edges());
        assert!(view.annotations());
        assert!(view.includes_kind(RelationshipKind::DataFlow));
        assert!(!view.includes_kind(RelationshipKind::Network));
    }

    #[test]
    fn test_selection_display_round_trip() {
        for text in ["all", "all-essential", "all-supplementary", "security"] {
            assert_eq!(text.parse::<ViewSelection>().unwrap().to_string(), text);
        }
    }
}
