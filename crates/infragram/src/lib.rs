//! Infragram - architecture diagrams from declarative infrastructure
//! definitions.
//!
//! The pipeline runs strictly in order, each stage producing a new value
//! for the next:
//!
//! 1. load and parse declaration files ([`infragram_parser`]);
//! 2. infer relationships ([`relations`]);
//! 3. build one diagram model per view ([`model`], [`view`], [`catalog`]);
//! 4. export every view in every requested format ([`render`], [`export`]).
//!
//! Only a missing input directory, a cycle between locals or an invalid
//! configuration abort a run. Malformed blocks, broken views and failed
//! exports are recovered and listed in the [`RunReport`].

pub mod catalog;
pub mod config;
pub mod export;
pub mod metadata;
pub mod model;
pub mod relations;
pub mod render;
pub mod view;

mod error;

pub use infragram_core::{category, color, conditional, diagram, identifier, relationship};
pub use infragram_parser::loader::SourceRoot;

pub use error::InfragramError;

use std::{fs, path::PathBuf};

use chrono::Utc;
use log::{debug, error, info, warn};

use infragram_core::relationship::Relationship;
use infragram_parser::{Configuration, error::FileDiagnostics, loader::load_sources, parse_sources};

use catalog::Catalog;
use config::AppConfig;
use export::Exporter;
use metadata::RunMetadata;
use model::ModelBuilder;
use render::{RenderedOutput, ViewModel, render_all};
use view::{ViewSelection, ViewSpec, merge_views};

/// What to read and where to write.
#[derive(Debug, Clone)]
pub struct RunRequest {
    sources: Vec<SourceRoot>,
    recursive: bool,
    views: ViewSelection,
    output_dir: PathBuf,
    write_metadata: bool,
}

impl RunRequest {
    /// Render the essential views of `sources` into `output_dir`, with a
    /// metadata sidecar.
    pub fn new(sources: Vec<SourceRoot>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            sources,
            recursive: false,
            views: ViewSelection::default(),
            output_dir: output_dir.into(),
            write_metadata: true,
        }
    }

    pub fn with_recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    pub fn with_views(mut self, views: ViewSelection) -> Self {
        self.views = views;
        self
    }

    pub fn with_metadata(mut self, write_metadata: bool) -> Self {
        self.write_metadata = write_metadata;
        self
    }

    pub fn sources(&self) -> &[SourceRoot] {
        &self.sources
    }

    pub fn output_dir(&self) -> &std::path::Path {
        &self.output_dir
    }
}

/// Overall outcome of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    /// Every output was written and no block was skipped.
    Success,
    /// Some output was written, but a block was skipped or an output failed.
    Partial,
    /// Nothing was written.
    Failed,
}

/// The parsed configuration and the models derived from it.
#[derive(Debug, Clone)]
pub struct Analysis {
    configuration: Configuration,
    builder: ModelBuilder,
}

impl Analysis {
    pub fn configuration(&self) -> &Configuration {
        &self.configuration
    }

    pub fn relationships(&self) -> &[Relationship] {
        self.builder.relationships()
    }

    pub fn builder(&self) -> &ModelBuilder {
        &self.builder
    }
}

/// Everything a run produced.
#[derive(Debug)]
pub struct RunReport {
    outputs: Vec<RenderedOutput>,
    failures: Vec<InfragramError>,
    diagnostics: Vec<FileDiagnostics>,
}

impl RunReport {
    pub fn outputs(&self) -> &[RenderedOutput] {
        &self.outputs
    }

    /// Views that could not be built and outputs that could not be written.
    pub fn failures(&self) -> &[InfragramError] {
        &self.failures
    }

    /// Recovered parse problems, one entry per affected file.
    pub fn diagnostics(&self) -> &[FileDiagnostics] {
        &self.diagnostics
    }

    pub fn status(&self) -> RunStatus {
        if self.outputs.is_empty() {
            RunStatus::Failed
        } else if self.failures.is_empty() && self.diagnostics.is_empty() {
            RunStatus::Success
        } else {
            RunStatus::Partial
        }
    }
}

/// Runs the pipeline with one configuration.
///
/// # Examples
///
/// ```rust,no_run
/// use infragram::{Infragram, RunRequest, SourceRoot, config::AppConfig};
///
/// let infragram = Infragram::new(AppConfig::default()).expect("valid configuration");
/// let request = RunRequest::new(vec![SourceRoot::infrastructure("terraform")], "figures");
/// let report = infragram.run(&request).expect("run completes");
/// println!("{} files written", report.outputs().len());
/// ```
pub struct Infragram {
    config: AppConfig,
    catalog: Catalog,
    views: Vec<ViewSpec>,
    exporters: Vec<Box<dyn Exporter>>,
}

impl Infragram {
    /// # Errors
    ///
    /// Returns [`InfragramError::Config`] for an invalid render section or an
    /// invalid catalog color.
    pub fn new(config: AppConfig) -> Result<Self, InfragramError> {
        config.render().validate().map_err(InfragramError::Config)?;
        let catalog = Catalog::new(config.catalog()).map_err(InfragramError::Config)?;
        let views = merge_views(config.views());

        Ok(Self {
            config,
            catalog,
            views,
            exporters: export::default_exporters(),
        })
    }

    /// Use `exporter` for its format, replacing the built-in one.
    pub fn with_exporter(mut self, exporter: Box<dyn Exporter>) -> Self {
        self.exporters.retain(|e| e.format() != exporter.format());
        self.exporters.push(exporter);
        self
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Built-in views merged with the configured ones.
    pub fn views(&self) -> &[ViewSpec] {
        &self.views
    }

    /// Load, parse and resolve `sources`, then infer relationships.
    ///
    /// # Errors
    ///
    /// Returns [`InfragramError::ConfigNotFound`] when a source directory is
    /// missing or holds no declaration files, and
    /// [`InfragramError::CyclicReference`] when locals form a cycle.
    pub fn analyze(&self, sources: &[SourceRoot], recursive: bool) -> Result<Analysis, InfragramError> {
        let files = load_sources(sources, recursive)?;
        info!(files = files.len(); "Loaded declaration files");

        let configuration = parse_sources(&files, &self.config.overrides())?;
        for file in configuration.diagnostics() {
            warn!(file = file.path().display().to_string(); "{file}");
        }

        let relationships = relations::infer(configuration.resources(), configuration.special_blocks());
        let builder = ModelBuilder::new(
            configuration.resources(),
            relationships,
            &self.catalog,
            self.config.render().render_config(),
            self.config.render().title(),
        );
        debug!(
            nodes = builder.nodes().len(),
            relationships = builder.relationships().len();
            "Base model built"
        );

        Ok(Analysis {
            configuration,
            builder,
        })
    }

    /// Run the whole pipeline and write the outputs.
    ///
    /// # Errors
    ///
    /// Fatal errors only: see [`Infragram::analyze`]. An unknown view name
    /// is [`InfragramError::Config`]; failure to create the output
    /// directory is [`InfragramError::Io`].
    pub fn run(&self, request: &RunRequest) -> Result<RunReport, InfragramError> {
        let selected = request
            .views
            .select(&self.views)
            .map_err(InfragramError::Config)?;
        let analysis = self.analyze(&request.sources, request.recursive)?;

        let mut failures = Vec::new();
        let mut models = Vec::new();
        for view in &selected {
            match analysis.builder.build(view) {
                Ok(model) => models.push(ViewModel::new(view.name(), model)),
                Err(source) => {
                    error!(view = view.name(), err:err = source; "Failed to build view");
                    failures.push(InfragramError::UnresolvedReference {
                        view: view.name().to_string(),
                        source,
                    });
                }
            }
        }

        fs::create_dir_all(&request.output_dir)?;
        let (outputs, render_failures) = render_all(&models, &self.exporters, &request.output_dir);
        failures.extend(render_failures);

        if request.write_metadata {
            let metadata = RunMetadata {
                generated_at: Utc::now(),
                sources: request.sources.clone(),
                resources: analysis.configuration.resources().len(),
                nodes: analysis.builder.nodes().len(),
                edges: analysis.builder.relationships().len(),
                views: models.iter().map(|m| m.name().to_string()).collect(),
                formats: self.config.render().render_config().formats().to_vec(),
                dpi: self.config.render().dpi(),
                preset: self.config.render().preset(),
                warnings: RunMetadata::warning_lines(analysis.configuration.diagnostics()),
            };
            if let Err(err) = metadata.write(&request.output_dir) {
                error!(err:err; "Failed to write metadata sidecar");
                failures.push(InfragramError::Io(err));
            }
        }

        let report = RunReport {
            outputs,
            failures,
            diagnostics: analysis.configuration.diagnostics().to_vec(),
        };
        info!(
            outputs = report.outputs.len(),
            failures = report.failures.len(),
            warnings = analysis.configuration.diagnostic_count();
            "Run finished"
        );
        Ok(report)
    }
}
