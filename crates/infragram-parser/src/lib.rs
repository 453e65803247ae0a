//! # Infragram Parser
//!
//! Reads infrastructure declaration files and turns them into resolved
//! resource definitions ready for relationship inference.
//!
//! The pipeline is:
//!
//! 1. **Load** - read declaration files from source roots ([`loader`])
//! 2. **Extract** - scan blocks and normalize attributes ([`extract`])
//! 3. **Resolve** - evaluate locals and variables ([`resolve`])
//! 4. **Classify** - decide each resource's presence ([`conditional`])
//!
//! Extraction recovers from malformed blocks and reports them as
//! diagnostics. Only a cycle between locals stops the pipeline.
//!
//! ## Usage
//!
//! ```
//! # use std::{collections::BTreeMap, sync::Arc};
//! # use infragram_core::resource::Tier;
//! # use infragram_parser::{loader::SourceFile, parse_sources, resolve::CyclicReferenceError};
//! fn main() -> Result<(), CyclicReferenceError> {
//!     let text = r#"
//!         resource "aws_instance" "allocator" {
//!           instance_type = "t3.micro"
//!         }
//!     "#;
//!     let files = [SourceFile::new("main.tf", Arc::<str>::from(text), Tier::Infrastructure)];
//!
//!     let configuration = parse_sources(&files, &BTreeMap::new())?;
//!     assert_eq!(configuration.resources().len(), 1);
//!     Ok(())
//! }
//! ```

pub mod conditional;
pub mod error;
pub mod expr;
pub mod extract;
pub mod loader;
pub mod references;
pub mod resolve;
pub mod scanner;
mod span;

pub use span::Span;

use std::collections::BTreeMap;

use infragram_core::{conditional::Presence, resource::ResourceDefinition, value::Literal};
use log::info;

use crate::{
    error::FileDiagnostics,
    extract::{SpecialBlock, extract_all},
    loader::SourceFile,
    resolve::{CyclicReferenceError, Resolution, resolve, resolve_resource},
};

/// A resource after substitution, with its presence classification.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedResource {
    definition: ResourceDefinition,
    presence: Presence,
}

impl ResolvedResource {
    pub fn new(definition: ResourceDefinition, presence: Presence) -> Self {
        Self {
            definition,
            presence,
        }
    }

    pub fn definition(&self) -> &ResourceDefinition {
        &self.definition
    }

    pub fn presence(&self) -> &Presence {
        &self.presence
    }
}

/// The parsed and resolved configuration of a set of files.
#[derive(Debug, Clone)]
pub struct Configuration {
    resources: Vec<ResolvedResource>,
    special_blocks: Vec<SpecialBlock>,
    resolution: Resolution,
    diagnostics: Vec<FileDiagnostics>,
}

impl Configuration {
    /// Resources in file order, then declaration order.
    pub fn resources(&self) -> &[ResolvedResource] {
        &self.resources
    }

    /// Special blocks that are present, with values substituted.
    pub fn special_blocks(&self) -> &[SpecialBlock] {
        &self.special_blocks
    }

    pub fn resolution(&self) -> &Resolution {
        &self.resolution
    }

    /// Recovered extraction problems, one entry per affected file.
    pub fn diagnostics(&self) -> &[FileDiagnostics] {
        &self.diagnostics
    }

    /// Number of recovered diagnostics across all files.
    pub fn diagnostic_count(&self) -> usize {
        self.diagnostics
            .iter()
            .map(|file| file.error().diagnostics().len())
            .sum()
    }
}

/// Extract, resolve and classify the given files.
///
/// `overrides` supplies values for input variables by unqualified name; they
/// take precedence over declared defaults.
///
/// # Errors
///
/// Returns [`CyclicReferenceError`] when locals reference each other in a
/// cycle. Malformed blocks are not errors here: they are skipped and listed
/// in [`Configuration::diagnostics`].
pub fn parse_sources(
    files: &[SourceFile],
    overrides: &BTreeMap<String, Literal>,
) -> Result<Configuration, CyclicReferenceError> {
    let extraction = extract_all(files);
    let resolution = resolve(&extraction.locals, &extraction.variables, overrides)?;

    let resources: Vec<ResolvedResource> = extraction
        .resources
        .iter()
        .map(|definition| {
            let presence = conditional::classify(definition, &resolution);
            ResolvedResource::new(resolve_resource(definition, &resolution), presence)
        })
        .collect();

    let special_blocks: Vec<SpecialBlock> = extraction
        .special_blocks
        .iter()
        .filter(|block| !conditional::classify(block.definition(), &resolution).state().is_never())
        .map(|block| SpecialBlock::new(block.kind(), resolve_resource(block.definition(), &resolution)))
        .collect();

    info!(
        resources = resources.len(),
        never = resources.iter().filter(|r| r.presence().state().is_never()).count(),
        dynamic = resources.iter().filter(|r| r.presence().state().is_dynamic()).count();
        "Classified resource presence"
    );

    Ok(Configuration {
        resources,
        special_blocks,
        resolution,
        diagnostics: extraction.diagnostics,
    })
}
