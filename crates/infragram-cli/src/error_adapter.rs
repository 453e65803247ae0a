//! Error adapter for converting InfragramError to miette diagnostics.
//!
//! This module provides the bridge between the library's standard error types
//! and miette's rich diagnostic formatting used in the CLI.
//!
//! # Multi-Error Support
//!
//! A [`FileDiagnostics`] may hold several diagnostics for one file; each is
//! rendered independently, with a snippet of that file.

use std::fmt;

use miette::{Diagnostic as MietteDiagnostic, LabeledSpan, SourceSpan};

use infragram::InfragramError;
use infragram_parser::error::{Diagnostic, FileDiagnostics};

/// Adapter for a single parser diagnostic.
pub struct DiagnosticAdapter<'a> {
    diag: &'a Diagnostic,
    file: &'a FileDiagnostics,
    /// Source of `file`, for displaying snippets
    src: &'a str,
}

impl<'a> DiagnosticAdapter<'a> {
    /// Create a new diagnostic adapter for `diag`, reported in `file`.
    pub fn new(diag: &'a Diagnostic, file: &'a FileDiagnostics) -> Self {
        Self {
            diag,
            file,
            src: file.source(),
        }
    }
}

impl fmt::Debug for DiagnosticAdapter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DiagnosticAdapter")
            .field("path", &self.file.path())
            .field("diag", &self.diag)
            .finish()
    }
}

impl fmt::Display for DiagnosticAdapter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.file.line(self.diag) {
            Some(line) => write!(
                f,
                "{}:{line}: {}",
                self.file.path().display(),
                self.diag.message()
            ),
            None => write!(f, "{}: {}", self.file.path().display(), self.diag.message()),
        }
    }
}

impl std::error::Error for DiagnosticAdapter<'_> {}

impl MietteDiagnostic for DiagnosticAdapter<'_> {
    fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        self.diag
            .code()
            .map(|c| Box::new(c) as Box<dyn fmt::Display>)
    }

    fn severity(&self) -> Option<miette::Severity> {
        if self.diag.severity().is_warning() {
            Some(miette::Severity::Warning)
        } else {
            Some(miette::Severity::Error)
        }
    }

    fn help<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        self.diag
            .help()
            .map(|h| Box::new(h) as Box<dyn fmt::Display>)
    }

    fn source_code(&self) -> Option<&dyn miette::SourceCode> {
        Some(&self.src as &dyn miette::SourceCode)
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
        let labels = self.diag.labels();
        if labels.is_empty() {
            return None;
        }

        Some(Box::new(labels.iter().map(|label| {
            let span = span_to_miette(label.span());
            let message = Some(label.message().to_string());
            if label.is_primary() {
                LabeledSpan::new_primary_with_span(message, span)
            } else {
                LabeledSpan::new_with_span(message, span)
            }
        })))
    }
}

/// Adapter for [`InfragramError`] variants without source snippets.
pub struct ErrorAdapter<'a>(pub &'a InfragramError);

impl fmt::Debug for ErrorAdapter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.0, f)
    }
}

impl fmt::Display for ErrorAdapter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl std::error::Error for ErrorAdapter<'_> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.0.source()
    }
}

impl MietteDiagnostic for ErrorAdapter<'_> {
    fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        let code = match &self.0 {
            InfragramError::ConfigNotFound(err) => {
                return err.code().map(|c| Box::new(c) as Box<dyn fmt::Display>);
            }
            InfragramError::CyclicReference(err) => return Some(Box::new(err.code())),
            InfragramError::Parse(_) => return None,
            InfragramError::UnresolvedReference { .. } => "infragram::model",
            InfragramError::Render { .. } => "infragram::render",
            InfragramError::Io(_) => "infragram::io",
            InfragramError::Config(_) => "infragram::config",
        };
        Some(Box::new(code))
    }

    fn help<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        let help = match &self.0 {
            InfragramError::ConfigNotFound(_) => {
                "pass a directory holding `.tf` files with --source-dir"
            }
            InfragramError::CyclicReference(_) => {
                "every local value must be computable without referring back to itself"
            }
            InfragramError::Render { .. } => {
                "png and pdf outputs need the Graphviz `dot` executable on PATH"
            }
            _ => return None,
        };
        Some(Box::new(help))
    }

    fn source_code(&self) -> Option<&dyn miette::SourceCode> {
        None
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
        None
    }
}

/// A reportable error that can be rendered by miette.
#[derive(Debug)]
pub enum Reportable<'a> {
    /// A parser diagnostic with source location information.
    Diagnostic(DiagnosticAdapter<'a>),
    /// A simple error without source location.
    Error(ErrorAdapter<'a>),
}

impl fmt::Display for Reportable<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reportable::Diagnostic(d) => fmt::Display::fmt(d, f),
            Reportable::Error(e) => fmt::Display::fmt(e, f),
        }
    }
}

impl std::error::Error for Reportable<'_> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Reportable::Diagnostic(_) => None,
            Reportable::Error(e) => e.source(),
        }
    }
}

impl MietteDiagnostic for Reportable<'_> {
    fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        match self {
            Reportable::Diagnostic(d) => d.code(),
            Reportable::Error(e) => e.code(),
        }
    }

    fn severity(&self) -> Option<miette::Severity> {
        match self {
            Reportable::Diagnostic(d) => d.severity(),
            Reportable::Error(_) => None,
        }
    }

    fn help<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        match self {
            Reportable::Diagnostic(d) => d.help(),
            Reportable::Error(e) => e.help(),
        }
    }

    fn source_code(&self) -> Option<&dyn miette::SourceCode> {
        match self {
            Reportable::Diagnostic(d) => d.source_code(),
            Reportable::Error(e) => e.source_code(),
        }
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
        match self {
            Reportable::Diagnostic(d) => d.labels(),
            Reportable::Error(e) => e.labels(),
        }
    }
}

fn span_to_miette(span: infragram_parser::Span) -> SourceSpan {
    SourceSpan::new(span.start().into(), span.len())
}

/// Convert an [`InfragramError`] into a list of reportable errors.
///
/// For [`InfragramError::Parse`], this returns one [`Reportable`] for
/// each diagnostic in the file. For other error variants, this returns a
/// single [`Reportable`].
pub fn to_reportables(err: &InfragramError) -> Vec<Reportable<'_>> {
    match err {
        InfragramError::Parse(file) => file
            .error()
            .diagnostics()
            .iter()
            .map(|d| Reportable::Diagnostic(DiagnosticAdapter::new(d, file)))
            .collect(),
        _ => vec![Reportable::Error(ErrorAdapter(err))],
    }
}

/// Render `err` with miette's graphical handler, one report per entry.
pub fn render_reports(err: &InfragramError) -> Vec<String> {
    let reporter = miette::GraphicalReportHandler::new();
    to_reportables(err)
        .iter()
        .map(|reportable| {
            let mut writer = String::new();
            reporter
                .render_report(&mut writer, reportable)
                .expect("Writing to String buffer is infallible");
            writer
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::{path::PathBuf, sync::Arc};

    use infragram_parser::{
        Span,
        error::{ErrorCode, ParseError},
        loader::LoadError,
        resolve::CyclicReferenceError,
    };

    use super::*;

    const SOURCE: &str = "resource \"aws_lb\" \"main\" {\n  internal = false\n";

    fn file(diagnostics: Vec<Diagnostic>) -> FileDiagnostics {
        FileDiagnostics::new("infra/main.tf", Arc::from(SOURCE), ParseError::new(diagnostics))
    }

    #[test]
    fn test_one_reportable_per_diagnostic() {
        let err = InfragramError::Parse(file(vec![
            Diagnostic::error("unbalanced delimiters")
                .with_code(ErrorCode::E100)
                .with_label(Span::new(26..27), "opened here"),
            Diagnostic::error("malformed attribute")
                .with_code(ErrorCode::E103)
                .with_label(Span::new(30..38), "here")
                .with_help("expected `name = value`"),
        ]));

        let reportables = to_reportables(&err);

        assert_eq!(reportables.len(), 2);
        assert_eq!(reportables[0].to_string(), "infra/main.tf:1: unbalanced delimiters");
        assert_eq!(reportables[1].to_string(), "infra/main.tf:2: malformed attribute");
        assert_eq!(
            reportables[1].help().map(|h| h.to_string()).as_deref(),
            Some("expected `name = value`")
        );
    }

    #[test]
    fn test_labels_keep_primary_flag() {
        let diag = Diagnostic::error("unbalanced delimiters")
            .with_label(Span::new(26..27), "opened here")
            .with_secondary_label(Span::new(0..8), "in this block");
        let file = file(vec![]);
        let adapter = DiagnosticAdapter::new(&diag, &file);

        let labels: Vec<_> = adapter.labels().unwrap().collect();
        assert_eq!(labels.len(), 2);
        assert!(labels[0].primary());
        assert!(!labels[1].primary());
        assert_eq!(labels[1].label(), Some("in this block"));
    }

    #[test]
    fn test_codes_of_fatal_errors() {
        let not_found = InfragramError::ConfigNotFound(LoadError::NotFound(PathBuf::from("infra")));
        let reportables = to_reportables(&not_found);
        assert_eq!(reportables.len(), 1);
        assert_eq!(
            reportables[0].code().map(|c| c.to_string()),
            Some(ErrorCode::E300.to_string())
        );
        assert!(reportables[0].help().is_some());

        let cycle = InfragramError::CyclicReference(CyclicReferenceError {
            members: vec!["local.a".into(), "local.b".into()],
        });
        let reportables = to_reportables(&cycle);
        assert_eq!(
            reportables[0].code().map(|c| c.to_string()),
            Some(ErrorCode::E200.to_string())
        );
    }

    #[test]
    fn test_rendered_report_contains_message() {
        let err = InfragramError::Config("unknown view `nope`".into());
        let reports = render_reports(&err);
        assert_eq!(reports.len(), 1);
        assert!(reports[0].contains("unknown view `nope`"));
    }
}
