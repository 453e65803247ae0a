//! Collector for accumulating diagnostics during extraction.

use crate::error::Diagnostic;

/// Accumulates diagnostics so one malformed block does not stop the scan.
#[derive(Debug, Default)]
pub struct DiagnosticCollector {
    diagnostics: Vec<Diagnostic>,
    has_errors: bool,
}

impl DiagnosticCollector {
    /// Create a new empty collector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Emit a diagnostic to this collector.
    pub fn emit(&mut self, diagnostic: Diagnostic) {
        if diagnostic.severity().is_error() {
            self.has_errors = true;
        }
        self.diagnostics.push(diagnostic);
    }

    /// Whether any emitted diagnostic is an error.
    pub fn has_errors(&self) -> bool {
        self.has_errors
    }

    /// Finish collection, returning everything emitted in order.
    ///
    /// Unlike a fail-fast phase, extraction reports warnings and recovered
    /// errors alike; the caller decides what they mean for the run.
    pub fn finish(self) -> Vec<Diagnostic> {
        self.diagnostics
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collector_tracks_errors() {
        let mut collector = DiagnosticCollector::new();
        collector.emit(Diagnostic::warning("warning 1"));
        assert!(!collector.has_errors());

        collector.emit(Diagnostic::error("error 1"));
        assert!(collector.has_errors());

        let diagnostics = collector.finish();
        assert_eq!(diagnostics.len(), 2);
        assert_eq!(diagnostics[1].message(), "error 1");
    }
}
