//! Command-line argument definitions for the Infragram CLI.
//!
//! This module defines the [`Args`] structure parsed from the command line
//! using [`clap`]. Render flags are kept as strings here and validated
//! against the loaded configuration, so that a bad value is reported the
//! same way as a bad configuration file.

use std::path::PathBuf;

use clap::Parser;

/// Command-line arguments for the Infragram diagram generator
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Directory of infrastructure declaration files (repeatable)
    #[arg(long = "source-dir", value_name = "PATH", required = true)]
    pub source_dirs: Vec<PathBuf>,

    /// Directory of runtime-provisioned declaration files (repeatable)
    #[arg(long = "runtime-source-dir", value_name = "PATH")]
    pub runtime_source_dirs: Vec<PathBuf>,

    /// Descend into sub-directories of every source directory
    #[arg(long)]
    pub recursive: bool,

    /// View to render: a view name, `all`, `all-essential` or `all-supplementary`
    #[arg(long, default_value = "all-essential")]
    pub view: String,

    /// Size preset (small, medium, large; or paper, presentation, poster)
    #[arg(long)]
    pub preset: Option<String>,

    /// Output format (dot, svg, png, pdf) or `all`
    #[arg(long)]
    pub format: Option<String>,

    /// Directory the diagrams are written to
    #[arg(short, long, default_value = "figures")]
    pub output_dir: PathBuf,

    /// Resolution of raster outputs
    #[arg(long)]
    pub dpi: Option<u32>,

    /// Path to configuration file (TOML)
    #[arg(short, long)]
    pub config: Option<String>,

    /// Override an input variable, as `name=value` (repeatable)
    #[arg(long = "var", value_name = "NAME=VALUE")]
    pub vars: Vec<String>,

    /// Do not write the diagram_metadata.txt sidecar
    #[arg(long)]
    pub no_metadata: bool,

    /// Log level (off, error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

impl Args {
    /// Arguments for rendering `source_dirs` into `output_dir` with every
    /// other flag at its default.
    pub fn new(source_dirs: Vec<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            source_dirs,
            runtime_source_dirs: Vec::new(),
            recursive: false,
            view: "all-essential".to_string(),
            preset: None,
            format: None,
            output_dir: output_dir.into(),
            dpi: None,
            config: None,
            vars: Vec::new(),
            no_metadata: false,
            log_level: "info".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repeatable_flags() {
        let args = Args::try_parse_from([
            "infragram",
            "--source-dir",
            "infra",
            "--source-dir",
            "shared",
            "--runtime-source-dir",
            "client",
            "--var",
            "enable_bastion=true",
            "--var",
            "environment=prod",
            "--format",
            "all",
        ])
        .unwrap();

        assert_eq!(args.source_dirs, [PathBuf::from("infra"), PathBuf::from("shared")]);
        assert_eq!(args.runtime_source_dirs, [PathBuf::from("client")]);
        assert_eq!(args.vars, ["enable_bastion=true", "environment=prod"]);
        assert_eq!(args.format.as_deref(), Some("all"));
        assert_eq!(args.view, "all-essential");
        assert_eq!(args.output_dir, PathBuf::from("figures"));
    }

    #[test]
    fn test_source_dir_is_required() {
        assert!(Args::try_parse_from(["infragram", "--view", "main"]).is_err());
    }
}
