//! Export orchestration.
//!
//! Every (view, format) pair is an independent job. Jobs run in parallel
//! against shared, immutable models and each writes only its own
//! `<view>.<format>` file. A failed job is logged and reported; it never
//! stops the others.

use std::{
    fs,
    path::{Path, PathBuf},
};

use log::{error, info};
use rayon::prelude::*;

use infragram_core::{diagram::DiagramModel, render::OutputFormat};

use crate::{
    error::InfragramError,
    export::{self, Exporter},
};

/// A file written by a successful job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedOutput {
    view: String,
    format: OutputFormat,
    path: PathBuf,
    size: usize,
}

impl RenderedOutput {
    pub fn view(&self) -> &str {
        &self.view
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Size of the written file in bytes.
    pub fn size(&self) -> usize {
        self.size
    }
}

/// One view's model, ready for export.
#[derive(Debug, Clone)]
pub struct ViewModel {
    name: String,
    model: DiagramModel,
}

impl ViewModel {
    pub fn new(name: impl Into<String>, model: DiagramModel) -> Self {
        Self {
            name: name.into(),
            model,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn model(&self) -> &DiagramModel {
        &self.model
    }
}

/// Output file of `view` in `format`.
pub fn output_path(output_dir: &Path, view: &str, format: OutputFormat) -> PathBuf {
    output_dir.join(format!("{view}.{}", format.extension()))
}

/// Export every view in every format its model requests.
///
/// Results keep job order (views in order, then formats in order) regardless
/// of which job finishes first.
pub fn render_all(
    views: &[ViewModel],
    exporters: &[Box<dyn Exporter>],
    output_dir: &Path,
) -> (Vec<RenderedOutput>, Vec<InfragramError>) {
    let jobs: Vec<(&ViewModel, OutputFormat)> = views
        .iter()
        .flat_map(|view| {
            view.model()
                .config()
                .formats()
                .iter()
                .map(move |&format| (view, format))
        })
        .collect();

    let results: Vec<Result<RenderedOutput, InfragramError>> = jobs
        .par_iter()
        .map(|&(view, format)| {
            render_one(view, format, exporters, output_dir).map_err(|source| {
                error!(view = view.name(), format = format.to_string(), err:err = source; "Failed to render");
                InfragramError::Render {
                    view: view.name().to_string(),
                    format,
                    source,
                }
            })
        })
        .collect();

    let mut outputs = Vec::new();
    let mut failures = Vec::new();
    for result in results {
        match result {
            Ok(output) => outputs.push(output),
            Err(err) => failures.push(err),
        }
    }
    (outputs, failures)
}

fn render_one(
    view: &ViewModel,
    format: OutputFormat,
    exporters: &[Box<dyn Exporter>],
    output_dir: &Path,
) -> Result<RenderedOutput, export::Error> {
    let exporter = exporters
        .iter()
        .find(|exporter| exporter.format() == format)
        .ok_or_else(|| export::Error::Render(format!("no exporter available for {format}")))?;

    let bytes = exporter.export(view.model())?;
    if bytes.is_empty() {
        return Err(export::Error::Render(format!("{format} exporter produced no output")));
    }

    let path = output_path(output_dir, view.name(), format);
    fs::write(&path, &bytes)?;
    info!(view = view.name(), path = path.display().to_string(), bytes = bytes.len(); "Wrote diagram");

    Ok(RenderedOutput {
        view: view.name().to_string(),
        format,
        path,
        size: bytes.len(),
    })
}
