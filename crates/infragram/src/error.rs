//! Error types for Infragram operations.
//!
//! This module provides the main error type [`InfragramError`]. Which
//! variants abort a run and which are recovered is decided by the caller:
//! [`InfragramError::ConfigNotFound`] and [`InfragramError::CyclicReference`]
//! stop everything, while parse, unresolved-reference and render errors are
//! collected per file, per view or per output.

use std::io;

use thiserror::Error;

use infragram_core::{diagram::UnresolvedReferenceError, render::OutputFormat};
use infragram_parser::{error::FileDiagnostics, loader::LoadError, resolve::CyclicReferenceError};

use crate::export;

/// The main error type for Infragram operations.
#[derive(Debug, Error)]
pub enum InfragramError {
    #[error("{0}")]
    ConfigNotFound(LoadError),

    /// Recovered extraction problems in one file.
    #[error("{0}")]
    Parse(FileDiagnostics),

    #[error(transparent)]
    CyclicReference(#[from] CyclicReferenceError),

    #[error("view `{view}`: {source}")]
    UnresolvedReference {
        view: String,
        #[source]
        source: UnresolvedReferenceError,
    },

    #[error("failed to render view `{view}` as {format}: {source}")]
    Render {
        view: String,
        format: OutputFormat,
        #[source]
        source: export::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<LoadError> for InfragramError {
    fn from(error: LoadError) -> Self {
        match error {
            LoadError::Io { path, source } => Self::Io(io::Error::new(
                source.kind(),
                format!("{}: {source}", path.display()),
            )),
            other => Self::ConfigNotFound(other),
        }
    }
}
