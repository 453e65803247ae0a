//! Error and diagnostic system for the Infragram parser.
//!
//! This module provides an error handling system with:
//! - Error codes for documentation and searchability
//! - Multiple labeled spans for rich error context
//! - Severity levels
//! - Diagnostic collector for accumulating multiple errors
//!
//! # Overview
//!
//! The error system is built around the [`Diagnostic`] type, which represents
//! a single error or warning message with optional error code, multiple source
//! locations, and help text. Diagnostics for one source file are wrapped in
//! [`ParseError`]. Extraction never aborts on these: a malformed block is
//! reported and skipped, and the remaining blocks are still extracted.
//!
//! # Example
//!
//! ```
//! # use infragram_parser::error::{Diagnostic, ErrorCode};
//! # use infragram_parser::Span;
//!
//! let header = Span::new(0..36);
//! let open = Span::new(35..36);
//!
//! let diag = Diagnostic::error("block `aws_instance.allocator` is never closed")
//!     .with_code(ErrorCode::E100)
//!     .with_label(header, "block starts here")
//!     .with_secondary_label(open, "this `{` has no matching `}`")
//!     .with_help("add the missing `}`; the block was skipped");
//! ```

mod collector;
mod diagnostic;
mod error_code;
mod label;
mod parse_error;
mod severity;

pub(crate) use collector::DiagnosticCollector;

pub use diagnostic::Diagnostic;
pub use error_code::ErrorCode;
pub use label::Label;
pub use parse_error::{FileDiagnostics, ParseError};
pub use severity::Severity;
