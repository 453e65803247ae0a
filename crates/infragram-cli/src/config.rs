//! Configuration file loading for the CLI
//!
//! This module handles finding and loading TOML configuration files
//! from various locations (explicit path, local directory, system directory),
//! and layering command-line flags on top of the loaded configuration.

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use directories::ProjectDirs;
use log::{debug, info};
use thiserror::Error;

use infragram::{
    InfragramError,
    config::{AppConfig, ConfigValue},
};
use infragram_core::render::{OutputFormat, Preset};

use crate::Args;

/// Configuration-related errors for CLI
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to parse TOML configuration: {0}")]
    Parse(String),

    #[error("Missing configuration file: {}", .0.display())]
    MissingFile(PathBuf),

    #[error("Failed to read configuration file: {0}")]
    Io(#[from] io::Error),

    #[error("Validation error: {0}")]
    Validation(String),
}

impl From<ConfigError> for InfragramError {
    fn from(err: ConfigError) -> Self {
        InfragramError::Config(err.to_string())
    }
}

/// Find and load configuration from various locations
///
/// Search order:
/// 1. Explicit path if provided
/// 2. Local project directory (infragram/config.toml)
/// 3. Platform-specific config directory
/// 4. Default config if none found
///
/// # Errors
///
/// Returns error if:
/// - Explicit path is provided but file doesn't exist
/// - Config file exists but cannot be parsed
pub fn load_config(explicit_path: Option<impl AsRef<Path>>) -> Result<AppConfig, ConfigError> {
    if let Some(path) = explicit_path {
        let path = path.as_ref();
        info!(path = path.display().to_string(); "Loading configuration from explicit path");
        return load_config_file(path);
    }

    let local_config = Path::new("infragram/config.toml");
    if local_config.exists() {
        info!(path = local_config.display().to_string(); "Loading configuration from local path");
        return load_config_file(local_config);
    }

    if let Some(proj_dirs) = ProjectDirs::from("io", "infragram", "infragram") {
        let system_config = proj_dirs.config_dir().join("config.toml");

        if system_config.exists() {
            info!(path = system_config.display().to_string(); "Loading configuration from system path");
            return load_config_file(system_config);
        }

        debug!(path = system_config.display().to_string(); "System configuration file not found");
    } else {
        debug!("Could not determine platform-specific config directory");
    }

    debug!("No configuration file found, using default configuration");
    Ok(AppConfig::default())
}

fn load_config_file(path: impl AsRef<Path>) -> Result<AppConfig, ConfigError> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(ConfigError::MissingFile(path.to_path_buf()));
    }

    let content = fs::read_to_string(path)?;
    toml::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))
}

/// Apply `--preset`, `--format`, `--dpi` and `--var` on top of `config`.
///
/// # Errors
///
/// Returns [`ConfigError::Validation`] for an unknown preset or format, or a
/// `--var` value without `=`.
pub fn apply_overrides(config: AppConfig, args: &Args) -> Result<AppConfig, ConfigError> {
    let mut render = config.render().clone();

    if let Some(preset) = &args.preset {
        let preset: Preset = preset
            .parse()
            .map_err(|e: &str| ConfigError::Validation(format!("{e}: `{preset}`")))?;
        render = render.with_preset(preset);
    }

    if let Some(format) = &args.format {
        render = render.with_formats(parse_formats(format)?);
    }

    if let Some(dpi) = args.dpi {
        render = render.with_dpi(dpi);
    }

    let mut config = config.with_render(render);
    for var in &args.vars {
        let (name, value) = parse_var(var)?;
        debug!(name, value:%; "Variable override");
        config = config.with_variable(name, value);
    }
    Ok(config)
}

/// `all`, a single format, or a comma-separated list.
fn parse_formats(value: &str) -> Result<Vec<OutputFormat>, ConfigError> {
    if value == "all" {
        return Ok(OutputFormat::all());
    }
    value
        .split(',')
        .map(str::trim)
        .map(|name| {
            name.parse()
                .map_err(|e: &str| ConfigError::Validation(format!("{e}: `{name}`")))
        })
        .collect()
}

fn parse_var(var: &str) -> Result<(&str, ConfigValue), ConfigError> {
    let Some((name, value)) = var.split_once('=') else {
        return Err(ConfigError::Validation(format!(
            "variable override `{var}` must be written as name=value"
        )));
    };
    let name = name.trim();
    if name.is_empty() {
        return Err(ConfigError::Validation(format!(
            "variable override `{var}` has an empty name"
        )));
    }
    let value = match value.parse::<ConfigValue>() {
        Ok(value) => value,
        Err(never) => match never {},
    };
    Ok((name, value))
}
