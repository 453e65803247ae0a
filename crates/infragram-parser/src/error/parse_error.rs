//! The ParseError type for wrapping extraction diagnostics.

use std::{
    fmt,
    path::{Path, PathBuf},
    sync::Arc,
};

use crate::{error::Diagnostic, span::line_of};

/// Error type for one or more recovered extraction problems.
#[derive(Debug, Clone)]
pub struct ParseError {
    diagnostics: Vec<Diagnostic>,
}

impl ParseError {
    /// Create a new parse error from diagnostics.
    pub fn new(diagnostics: Vec<Diagnostic>) -> Self {
        Self { diagnostics }
    }

    /// Get all diagnostics in this error.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(first) = self.diagnostics.first() {
            write!(f, "{}", first)?;
            if self.diagnostics.len() > 1 {
                write!(f, " (+{} more)", self.diagnostics.len() - 1)?;
            }
        }
        Ok(())
    }
}

impl std::error::Error for ParseError {}

impl From<Diagnostic> for ParseError {
    fn from(diagnostic: Diagnostic) -> Self {
        Self {
            diagnostics: vec![diagnostic],
        }
    }
}

impl From<Vec<Diagnostic>> for ParseError {
    fn from(diagnostics: Vec<Diagnostic>) -> Self {
        Self { diagnostics }
    }
}

/// A [`ParseError`] tied to the file it came from.
///
/// The file text is shared rather than copied so diagnostics can be rendered
/// with source snippets after extraction has finished.
#[derive(Debug, Clone)]
pub struct FileDiagnostics {
    path: PathBuf,
    source: Arc<str>,
    error: ParseError,
}

impl FileDiagnostics {
    pub fn new(path: impl Into<PathBuf>, source: Arc<str>, error: ParseError) -> Self {
        Self {
            path: path.into(),
            source,
            error,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn error(&self) -> &ParseError {
        &self.error
    }

    /// 1-based line of a diagnostic's primary label, if it has one.
    pub fn line(&self, diagnostic: &Diagnostic) -> Option<usize> {
        diagnostic
            .primary_span()
            .map(|span| line_of(&self.source, span.start()))
    }
}

impl fmt::Display for FileDiagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path.display(), self.error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{error::ErrorCode, span::Span};

    #[test]
    fn test_parse_error_display_multiple() {
        let err: ParseError = vec![
            Diagnostic::error("first error"),
            Diagnostic::error("second error"),
            Diagnostic::error("third error"),
        ]
        .into();

        assert_eq!(err.to_string(), "error: first error (+2 more)");
    }

    #[test]
    fn test_file_diagnostics_line() {
        let source: Arc<str> = Arc::from("locals {}\n\nresource \"a_b\" \"c\" {\n");
        let diag = Diagnostic::error("never closed")
            .with_code(ErrorCode::E100)
            .with_label(Span::new(11..30), "block");
        let file = FileDiagnostics::new("main.tf", source, diag.clone().into());

        assert_eq!(file.line(&diag), Some(3));
        assert_eq!(
            file.to_string(),
            "main.tf: error[E100]: never closed"
        );
    }
}
