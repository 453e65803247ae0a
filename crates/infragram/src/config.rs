//! Configuration types for Infragram runs.
//!
//! All types implement [`serde::Deserialize`] so the command-line front end
//! can load them from a TOML file. Every section is optional.
//!
//! # Overview
//!
//! - [`AppConfig`] - Top-level configuration combining every section.
//! - [`RenderSettings`] - Preset, direction, DPI, formats and title.
//! - [`ConfigValue`] - A literal override for an input variable.
//! - [`CatalogConfig`] - Cluster path and color overrides per category.
//!
//! # Example
//!
//! ```
//! # use infragram::config::AppConfig;
//! let config = AppConfig::default();
//! assert_eq!(config.render().dpi(), 300);
//! assert!(config.views().is_empty());
//! ```

use std::{collections::BTreeMap, fmt, str::FromStr};

use serde::Deserialize;

use infragram_core::{
    category::Category,
    render::{Direction, OutputFormat, Preset, RenderConfig},
    value::Literal,
};

use crate::view::ViewSpec;

/// Title used when neither the configuration nor a view sets one.
pub const DEFAULT_TITLE: &str = "Infrastructure Architecture";

/// Top-level application configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    render: RenderSettings,

    /// Overrides for input variables, by unqualified name.
    #[serde(default)]
    variables: BTreeMap<String, ConfigValue>,

    #[serde(default)]
    catalog: CatalogConfig,

    /// Additional views. A view named like a built-in one replaces it.
    #[serde(default)]
    views: Vec<ViewSpec>,
}

impl AppConfig {
    pub fn new(
        render: RenderSettings,
        variables: BTreeMap<String, ConfigValue>,
        catalog: CatalogConfig,
        views: Vec<ViewSpec>,
    ) -> Self {
        Self {
            render,
            variables,
            catalog,
            views,
        }
    }

    pub fn render(&self) -> &RenderSettings {
        &self.render
    }

    pub fn variables(&self) -> &BTreeMap<String, ConfigValue> {
        &self.variables
    }

    pub fn catalog(&self) -> &CatalogConfig {
        &self.catalog
    }

    pub fn views(&self) -> &[ViewSpec] {
        &self.views
    }

    /// Replace the render section.
    pub fn with_render(mut self, render: RenderSettings) -> Self {
        self.render = render;
        self
    }

    /// Set or replace one variable override.
    pub fn with_variable(mut self, name: impl Into<String>, value: ConfigValue) -> Self {
        self.variables.insert(name.into(), value);
        self
    }

    /// The variable overrides as literals, ready for resolution.
    pub fn overrides(&self) -> BTreeMap<String, Literal> {
        self.variables
            .iter()
            .map(|(name, value)| (name.clone(), Literal::from(value.clone())))
            .collect()
    }
}

/// The `[render]` section.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RenderSettings {
    preset: Preset,
    direction: Direction,
    dpi: u32,
    formats: Vec<OutputFormat>,
    title: String,
    title_on_top: bool,
}

impl RenderSettings {
    pub fn preset(&self) -> Preset {
        self.preset
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn dpi(&self) -> u32 {
        self.dpi
    }

    pub fn formats(&self) -> &[OutputFormat] {
        &self.formats
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn title_on_top(&self) -> bool {
        self.title_on_top
    }

    pub fn with_preset(mut self, preset: Preset) -> Self {
        self.preset = preset;
        self
    }

    pub fn with_direction(mut self, direction: Direction) -> Self {
        self.direction = direction;
        self
    }

    pub fn with_dpi(mut self, dpi: u32) -> Self {
        self.dpi = dpi;
        self
    }

    pub fn with_formats(mut self, formats: Vec<OutputFormat>) -> Self {
        self.formats = formats;
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Check the values that deserialization alone cannot.
    ///
    /// # Errors
    ///
    /// Returns a message when the DPI is zero or no format is requested.
    pub fn validate(&self) -> Result<(), String> {
        if self.dpi == 0 {
            return Err("dpi must be a positive integer".to_string());
        }
        if self.formats.is_empty() {
            return Err("at least one output format is required".to_string());
        }
        Ok(())
    }

    /// The render configuration shared by every view of a run.
    pub fn render_config(&self) -> RenderConfig {
        let mut formats = self.formats.clone();
        formats.sort();
        formats.dedup();
        RenderConfig::new(self.preset, self.direction, self.dpi, formats)
            .with_title_on_top(self.title_on_top)
    }
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            preset: Preset::default(),
            direction: Direction::default(),
            dpi: RenderConfig::DEFAULT_DPI,
            formats: vec![OutputFormat::Svg],
            title: DEFAULT_TITLE.to_string(),
            title_on_top: true,
        }
    }
}

/// A literal value for an input variable.
///
/// From the command line, `true`/`false` become booleans, anything that
/// parses as a number becomes a number, and everything else a string.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ConfigValue {
    Bool(bool),
    Number(f64),
    String(String),
}

impl FromStr for ConfigValue {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "true" => Self::Bool(true),
            "false" => Self::Bool(false),
            s => match s.parse::<f64>() {
                Ok(number) if number.is_finite() => Self::Number(number),
                _ => Self::String(s.to_string()),
            },
        })
    }
}

impl From<ConfigValue> for Literal {
    fn from(value: ConfigValue) -> Self {
        match value {
            ConfigValue::Bool(b) => Literal::Bool(b),
            ConfigValue::Number(n) => Literal::Number(n),
            ConfigValue::String(s) => Literal::String(s),
        }
    }
}

impl fmt::Display for ConfigValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", Literal::from(self.clone()))
    }
}

/// The `[catalog]` section: per-category overrides of the built-in
/// clustering and coloring.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct CatalogConfig {
    /// Category to cluster path, outermost cluster first.
    #[serde(default)]
    clusters: BTreeMap<Category, Vec<String>>,

    /// Category to fill color, as a CSS color string.
    #[serde(default)]
    colors: BTreeMap<Category, String>,
}

impl CatalogConfig {
    pub fn new(
        clusters: BTreeMap<Category, Vec<String>>,
        colors: BTreeMap<Category, String>,
    ) -> Self {
        Self { clusters, colors }
    }

    pub fn clusters(&self) -> &BTreeMap<Category, Vec<String>> {
        &self.clusters
    }

    pub fn colors(&self) -> &BTreeMap<Category, String> {
        &self.colors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_config_from_toml() {
        let config: AppConfig = toml::from_str(
            r#"
[render]
preset = "poster"
direction = "TB"
dpi = 150
formats = ["svg", "dot"]
title = "Arena"

[variables]
environment = "prod"
enable_bastion = true
replicas = 2

[catalog.clusters]
compute = ["Workers"]

[catalog.colors]
compute = "lightblue"

[[views]]
name = "workers"
categories = ["compute"]
"#,
        )
        .unwrap();

        assert_eq!(config.render().preset(), Preset::Large);
        assert_eq!(config.render().direction(), Direction::TopToBottom);
        assert_eq!(config.render().dpi(), 150);
        assert_eq!(config.render().title(), "Arena");
        assert!(config.render().title_on_top());
        assert_eq!(
            config.render().render_config().formats(),
            &[OutputFormat::Dot, OutputFormat::Svg]
        );

        let overrides = config.overrides();
        assert_eq!(overrides["environment"], Literal::String("prod".into()));
        assert_eq!(overrides["enable_bastion"], Literal::Bool(true));
        assert_eq!(overrides["replicas"], Literal::Number(2.0));

        assert_eq!(config.catalog().clusters()[&Category::Compute], ["Workers"]);
        assert_eq!(config.catalog().colors()[&Category::Compute], "lightblue");
        assert_eq!(config.views()[0].name(), "workers");
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: AppConfig = toml::from_str("").unwrap();
        assert_eq!(config.render(), &RenderSettings::default());
        assert_eq!(config.render().title(), DEFAULT_TITLE);
        assert!(config.variables().is_empty());
    }

    #[test]
    fn test_config_value_from_str() {
        assert_eq!("true".parse::<ConfigValue>(), Ok(ConfigValue::Bool(true)));
        assert_eq!("3".parse::<ConfigValue>(), Ok(ConfigValue::Number(3.0)));
        assert_eq!(
            "prod".parse::<ConfigValue>(),
            Ok(ConfigValue::String("prod".into()))
        );
        assert_eq!(
            "inf".parse::<ConfigValue>(),
            Ok(ConfigValue::String("inf".into()))
        );
    }

    #[test]
    fn test_validate_rejects_zero_dpi() {
        assert!(RenderSettings::default().with_dpi(0).validate().is_err());
        assert!(RenderSettings::default().with_formats(vec![]).validate().is_err());
        assert!(RenderSettings::default().validate().is_ok());
    }
}
