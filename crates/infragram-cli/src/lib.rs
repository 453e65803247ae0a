//! Infragram CLI library
//!
//! This module contains the core CLI logic: it turns [`Args`] and the
//! configuration file into a [`RunRequest`], runs the pipeline, and maps the
//! outcome to a process exit code.

pub mod error_adapter;

mod args;
mod config;

pub use args::Args;

use std::io::{self, Write};

use log::info;

use infragram::{
    Infragram, InfragramError, RunReport, RunRequest, RunStatus, SourceRoot, view::ViewSelection,
};

/// Process exit codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitStatus {
    /// Every requested output was written.
    Success,
    /// Invalid arguments or configuration.
    Usage,
    /// A source directory is missing or holds no declaration files.
    NoInput,
    /// Some outputs were written, but a block was skipped or an output failed.
    Partial,
    /// The pipeline could not produce anything.
    Fatal,
}

impl ExitStatus {
    pub fn code(self) -> i32 {
        match self {
            ExitStatus::Success => 0,
            ExitStatus::Usage => 1,
            ExitStatus::NoInput => 2,
            ExitStatus::Partial => 3,
            ExitStatus::Fatal => 4,
        }
    }
}

impl From<&RunReport> for ExitStatus {
    fn from(report: &RunReport) -> Self {
        match report.status() {
            RunStatus::Success => ExitStatus::Success,
            RunStatus::Partial => ExitStatus::Partial,
            RunStatus::Failed => ExitStatus::Fatal,
        }
    }
}

impl From<&InfragramError> for ExitStatus {
    fn from(err: &InfragramError) -> Self {
        match err {
            InfragramError::Config(_) => ExitStatus::Usage,
            InfragramError::ConfigNotFound(_) => ExitStatus::NoInput,
            InfragramError::Parse(_)
            | InfragramError::UnresolvedReference { .. }
            | InfragramError::Render { .. } => ExitStatus::Partial,
            InfragramError::CyclicReference(_) | InfragramError::Io(_) => ExitStatus::Fatal,
        }
    }
}

/// Help and version requests exit successfully; every other argument error
/// is a usage error.
impl From<&clap::Error> for ExitStatus {
    fn from(err: &clap::Error) -> Self {
        if err.use_stderr() {
            ExitStatus::Usage
        } else {
            ExitStatus::Success
        }
    }
}

impl From<&Result<RunReport, InfragramError>> for ExitStatus {
    fn from(result: &Result<RunReport, InfragramError>) -> Self {
        match result {
            Ok(report) => report.into(),
            Err(err) => err.into(),
        }
    }
}

/// Run the Infragram CLI application
///
/// Loads the configuration, applies the command-line overrides and renders
/// every selected view into the output directory.
///
/// # Errors
///
/// Returns `InfragramError` for:
/// - Invalid arguments or configuration ([`InfragramError::Config`])
/// - Missing input ([`InfragramError::ConfigNotFound`])
/// - Cyclic local values ([`InfragramError::CyclicReference`])
/// - An output directory that cannot be created ([`InfragramError::Io`])
///
/// Recovered problems are returned inside the [`RunReport`].
pub fn run(args: &Args) -> Result<RunReport, InfragramError> {
    info!(
        sources = args.source_dirs.len(),
        runtime_sources = args.runtime_source_dirs.len(),
        output_dir = args.output_dir.display().to_string();
        "Generating diagrams"
    );

    let app_config = config::load_config(args.config.as_ref())?;
    let app_config = config::apply_overrides(app_config, args)?;

    let views: ViewSelection = args
        .view
        .parse()
        .map_err(|e: &str| InfragramError::Config(e.to_string()))?;

    let sources = args
        .source_dirs
        .iter()
        .map(SourceRoot::infrastructure)
        .chain(args.runtime_source_dirs.iter().map(SourceRoot::runtime))
        .collect();
    let request = RunRequest::new(sources, &args.output_dir)
        .with_recursive(args.recursive)
        .with_views(views)
        .with_metadata(!args.no_metadata);

    Infragram::new(app_config)?.run(&request)
}

/// Write the end-of-run summary: outputs, recovered parse warnings with
/// their file and line, and failed views or formats.
pub fn write_summary(out: &mut impl Write, report: &RunReport) -> io::Result<()> {
    writeln!(out, "Generated {} file(s):", report.outputs().len())?;
    for output in report.outputs() {
        writeln!(out, "  {} ({} bytes)", output.path().display(), output.size())?;
    }

    let warnings: Vec<_> = report
        .diagnostics()
        .iter()
        .flat_map(|file| {
            file.error().diagnostics().iter().map(move |diagnostic| {
                match file.line(diagnostic) {
                    Some(line) => format!("{}:{line}: {}", file.path().display(), diagnostic.message()),
                    None => format!("{}: {}", file.path().display(), diagnostic.message()),
                }
            })
        })
        .collect();
    if !warnings.is_empty() {
        writeln!(out, "Skipped {} malformed block(s):", warnings.len())?;
        for warning in &warnings {
            writeln!(out, "  {warning}")?;
        }
    }

    if !report.failures().is_empty() {
        writeln!(out, "Failed {} output(s):", report.failures().len())?;
        for failure in report.failures() {
            writeln!(out, "  {failure}")?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use clap::Parser;
    use infragram_parser::loader::LoadError;

    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(ExitStatus::Success.code(), 0);
        assert_eq!(ExitStatus::Usage.code(), 1);
        assert_eq!(ExitStatus::NoInput.code(), 2);
        assert_eq!(ExitStatus::Partial.code(), 3);
        assert_eq!(ExitStatus::Fatal.code(), 4);
    }

    #[test]
    fn test_error_exit_status() {
        let not_found = InfragramError::ConfigNotFound(LoadError::NoFiles(PathBuf::from("infra")));
        assert_eq!(ExitStatus::from(&not_found), ExitStatus::NoInput);
        assert_eq!(
            ExitStatus::from(&InfragramError::Config("bad dpi".into())),
            ExitStatus::Usage
        );
    }

    #[test]
    fn test_argument_error_exit_status() {
        let missing = Args::try_parse_from(["infragram"]).unwrap_err();
        assert_eq!(ExitStatus::from(&missing), ExitStatus::Usage);

        let unknown = Args::try_parse_from(["infragram", "--source-dir", "infra", "--bogus"])
            .unwrap_err();
        assert_eq!(ExitStatus::from(&unknown).code(), 1);

        let help = Args::try_parse_from(["infragram", "--help"]).unwrap_err();
        assert_eq!(ExitStatus::from(&help), ExitStatus::Success);
    }
}
