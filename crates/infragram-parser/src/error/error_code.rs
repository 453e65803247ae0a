//! Error codes for the Infragram diagnostic system.
//!
//! Error codes are organized by phase:
//! - `E0xx` - Scanner errors
//! - `E1xx` - Extraction errors
//! - `E2xx` - Resolution errors
//! - `E3xx` - Source loading errors

use std::fmt;

/// Error codes for categorizing diagnostic errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    // =========================================================================
    // Scanner Errors (E0xx)
    // =========================================================================
    /// Unterminated string literal.
    ///
    /// A string was opened with a quote but the line ended before it closed.
    E001,

    /// Unterminated heredoc.
    ///
    /// A `<<MARKER` heredoc has no closing `MARKER` line.
    E002,

    /// Unterminated block comment.
    ///
    /// A `/*` comment was never closed with `*/`.
    E003,

    // =========================================================================
    // Extraction Errors (E1xx)
    // =========================================================================
    /// Unbalanced delimiters.
    ///
    /// A block body opened more braces, brackets or parentheses than it
    /// closed. The block is skipped.
    E100,

    /// Unexpected closing delimiter.
    ///
    /// A closing delimiter was found with no matching opener, or does not
    /// match the innermost open delimiter.
    E101,

    /// Malformed block header.
    ///
    /// A top-level block header does not have the labels its block type
    /// requires, e.g. a `resource` with only one label.
    E102,

    /// Malformed attribute.
    ///
    /// An attribute line inside a block body has no value. The attribute is
    /// skipped and the rest of the block is kept.
    E103,

    // =========================================================================
    // Resolution Errors (E2xx)
    // =========================================================================
    /// Cyclic reference.
    ///
    /// Named values reference each other in a cycle, so no resolution order
    /// exists.
    E200,

    // =========================================================================
    // Loading Errors (E3xx)
    // =========================================================================
    /// Source path not found.
    E300,

    /// No declaration files.
    ///
    /// A source directory exists but contains no declaration files.
    E301,
}

impl ErrorCode {
    /// Returns the numeric code as a string (e.g., "E001").
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::E001 => "E001",
            ErrorCode::E002 => "E002",
            ErrorCode::E003 => "E003",
            ErrorCode::E100 => "E100",
            ErrorCode::E101 => "E101",
            ErrorCode::E102 => "E102",
            ErrorCode::E103 => "E103",
            ErrorCode::E200 => "E200",
            ErrorCode::E300 => "E300",
            ErrorCode::E301 => "E301",
        }
    }

    /// Returns a short description of what this error code means.
    pub fn description(&self) -> &'static str {
        match self {
            ErrorCode::E001 => "unterminated string literal",
            ErrorCode::E002 => "unterminated heredoc",
            ErrorCode::E003 => "unterminated block comment",
            ErrorCode::E100 => "unbalanced delimiters",
            ErrorCode::E101 => "unexpected closing delimiter",
            ErrorCode::E102 => "malformed block header",
            ErrorCode::E103 => "malformed attribute",
            ErrorCode::E200 => "cyclic reference",
            ErrorCode::E300 => "source path not found",
            ErrorCode::E301 => "no declaration files found",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_display() {
        assert_eq!(ErrorCode::E001.to_string(), "E001");
        assert_eq!(ErrorCode::E103.to_string(), "E103");
        assert_eq!(ErrorCode::E301.to_string(), "E301");
    }

    #[test]
    fn test_error_code_description() {
        assert_eq!(ErrorCode::E100.description(), "unbalanced delimiters");
        assert_eq!(ErrorCode::E200.description(), "cyclic reference");
    }
}
