//! Render configuration: presets, layout direction and output formats.
//!
//! # Overview
//!
//! - [`Preset`] - Named size preset controlling font sizes and spacing.
//! - [`PresetMetrics`] - The concrete numbers behind a preset.
//! - [`Direction`] - Layout direction of the graph.
//! - [`OutputFormat`] - A requested export format.
//! - [`RenderConfig`] - Everything above, bundled for one run.

use std::{fmt, str::FromStr};

use serde::Deserialize;

/// Font sizes (points) and spacing (inches) used by a [`Preset`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PresetMetrics {
    pub title_font: f32,
    pub node_font: f32,
    pub edge_font: f32,
    /// Minimum distance between nodes in the same rank.
    pub node_sep: f32,
    /// Minimum distance between ranks.
    pub rank_sep: f32,
}

/// Size preset for the output context.
///
/// Spacing grows with font size: `Large` uses 1.5 times the spacing of
/// `Small` so labels do not overlap as text grows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Preset {
    /// Print-sized output (alias `paper`).
    #[default]
    #[serde(alias = "paper")]
    Small,
    /// Slide-sized output (alias `presentation`).
    #[serde(alias = "presentation")]
    Medium,
    /// Poster-sized output (alias `poster`).
    #[serde(alias = "poster")]
    Large,
}

impl Preset {
    pub fn metrics(self) -> PresetMetrics {
        match self {
            Preset::Small => PresetMetrics {
                title_font: 32.0,
                node_font: 14.0,
                edge_font: 14.0,
                node_sep: 1.0,
                rank_sep: 1.5,
            },
            Preset::Medium => PresetMetrics {
                title_font: 40.0,
                node_font: 16.0,
                edge_font: 16.0,
                node_sep: 1.25,
                rank_sep: 1.875,
            },
            Preset::Large => PresetMetrics {
                title_font: 48.0,
                node_font: 20.0,
                edge_font: 20.0,
                node_sep: 1.5,
                rank_sep: 2.25,
            },
        }
    }
}

impl FromStr for Preset {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "small" | "paper" => Ok(Self::Small),
            "medium" | "presentation" => Ok(Self::Medium),
            "large" | "poster" => Ok(Self::Large),
            _ => Err("Unsupported preset"),
        }
    }
}

impl From<Preset> for &'static str {
    fn from(val: Preset) -> Self {
        match val {
            Preset::Small => "small",
            Preset::Medium => "medium",
            Preset::Large => "large",
        }
    }
}

impl fmt::Display for Preset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s: &'static str = (*self).into();
        write!(f, "{s}")
    }
}

/// Layout direction of the rendered graph.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize)]
pub enum Direction {
    #[default]
    #[serde(rename = "LR")]
    LeftToRight,
    #[serde(rename = "TB")]
    TopToBottom,
}

impl FromStr for Direction {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "LR" | "lr" => Ok(Self::LeftToRight),
            "TB" | "tb" => Ok(Self::TopToBottom),
            _ => Err("Unsupported direction"),
        }
    }
}

impl From<Direction> for &'static str {
    fn from(val: Direction) -> Self {
        match val {
            Direction::LeftToRight => "LR",
            Direction::TopToBottom => "TB",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s: &'static str = (*self).into();
        write!(f, "{s}")
    }
}

/// An export format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    /// Graph description text.
    Dot,
    /// Scalable vector graphics, rendered natively.
    Svg,
    /// Raster image, rendered by the Graphviz `dot` executable.
    Png,
    /// Portable document, rendered by the Graphviz `dot` executable.
    Pdf,
}

impl OutputFormat {
    /// Every format this build can produce.
    ///
    /// `png` and `pdf` need the `graphviz` feature.
    pub fn all() -> Vec<OutputFormat> {
        let mut formats = vec![OutputFormat::Dot, OutputFormat::Svg];
        if cfg!(feature = "graphviz") {
            formats.extend([OutputFormat::Png, OutputFormat::Pdf]);
        }
        formats
    }

    /// File extension used for `<view>.<extension>` output names.
    pub fn extension(self) -> &'static str {
        self.into()
    }

    /// Whether producing this format requires an external layout backend.
    pub fn is_raster(self) -> bool {
        matches!(self, OutputFormat::Png | OutputFormat::Pdf)
    }
}

impl FromStr for OutputFormat {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "dot" | "gv" => Ok(Self::Dot),
            "svg" => Ok(Self::Svg),
            "png" => Ok(Self::Png),
            "pdf" => Ok(Self::Pdf),
            _ => Err("Unsupported output format"),
        }
    }
}

impl From<OutputFormat> for &'static str {
    fn from(val: OutputFormat) -> Self {
        match val {
            OutputFormat::Dot => "dot",
            OutputFormat::Svg => "svg",
            OutputFormat::Png => "png",
            OutputFormat::Pdf => "pdf",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s: &'static str = (*self).into();
        write!(f, "{s}")
    }
}

/// Render settings for one run.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderConfig {
    preset: Preset,
    direction: Direction,
    dpi: u32,
    formats: Vec<OutputFormat>,
    title_on_top: bool,
}

impl RenderConfig {
    pub const DEFAULT_DPI: u32 = 300;

    pub fn new(preset: Preset, direction: Direction, dpi: u32, formats: Vec<OutputFormat>) -> Self {
        Self {
            preset,
            direction,
            dpi,
            formats,
            title_on_top: true,
        }
    }

    /// Place the diagram title below the graph instead of above it.
    pub fn with_title_on_top(mut self, title_on_top: bool) -> Self {
        self.title_on_top = title_on_top;
        self
    }

    pub fn preset(&self) -> Preset {
        self.preset
    }

    pub fn metrics(&self) -> PresetMetrics {
        self.preset.metrics()
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

    pub fn title_on_top(&self) -> bool {
        self.title_on_top
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self::new(
            Preset::default(),
            Direction::default(),
            Self::DEFAULT_DPI,
            vec![OutputFormat::Svg],
        )
    }
}

#[cfg(test)]
mod tests {
    use float_cmp::assert_approx_eq;

    use super::*;

    #[test]
    fn test_large_preset_spacing_is_one_and_a_half_small() {
        let small = Preset::Small.metrics();
        let large = Preset::Large.metrics();

        assert_approx_eq!(f32, large.node_sep / small.node_sep, 1.5);
        assert_approx_eq!(f32, large.rank_sep / small.rank_sep, 1.5);
    }

    #[test]
    fn test_spacing_grows_with_font_size() {
        let presets = [Preset::Small, Preset::Medium, Preset::Large];
        for pair in presets.windows(2) {
            let (a, b) = (pair[0].metrics(), pair[1].metrics());
            assert!(b.node_font > a.node_font);
            assert!(b.node_sep > a.node_sep);
            assert!(b.rank_sep > a.rank_sep);
        }
    }

    #[test]
    fn test_preset_aliases() {
        assert_eq!("paper".parse::<Preset>(), Ok(Preset::Small));
        assert_eq!("presentation".parse::<Preset>(), Ok(Preset::Medium));
        assert_eq!("poster".parse::<Preset>(), Ok(Preset::Large));
        assert!("huge".parse::<Preset>().is_err());
    }

    #[test]
    fn test_output_format_all_contains_native_formats() {
        let all = OutputFormat::all();
        assert!(all.contains(&OutputFormat::Dot));
        assert!(all.contains(&OutputFormat::Svg));
        assert_eq!(
            all.contains(&OutputFormat::Png),
            cfg!(feature = "graphviz")
        );
    }

    #[test]
    fn test_only_graphviz_formats_are_raster() {
        assert!(!OutputFormat::Dot.is_raster());
        assert!(!OutputFormat::Svg.is_raster());
        assert!(OutputFormat::Png.is_raster());
        assert!(OutputFormat::Pdf.is_raster());
    }

    #[test]
    fn test_direction_from_str() {
        assert_eq!("LR".parse::<Direction>(), Ok(Direction::LeftToRight));
        assert_eq!("TB".parse::<Direction>(), Ok(Direction::TopToBottom));
        assert_eq!(Direction::TopToBottom.to_string(), "TB");
    }
}
