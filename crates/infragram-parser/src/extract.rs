//! Block extraction: from raw blocks to typed definitions.
//!
//! Each file is scanned into [`RawBlock`]s, and each block body is split
//! into attributes and nested blocks. Nested blocks are decomposed one level
//! deep into `name[i].attribute` entries; anything deeper is kept as opaque
//! text under `name[i].inner[j]`.
//!
//! Files are extracted independently and in parallel. The merge runs in file
//! order, so the result does not depend on scheduling.

use std::collections::HashSet;

use indexmap::IndexMap;
use infragram_core::{
    identifier::ResourceKey,
    resource::{ResourceDefinition, SourceLocation},
    value::AttributeValue,
};
use log::{debug, info, warn};
use rayon::prelude::*;

use crate::{
    error::{Diagnostic, DiagnosticCollector, ErrorCode, FileDiagnostics, ParseError},
    expr::{self, Expr},
    loader::SourceFile,
    references::parse_reference,
    scanner::{Cursor, RawBlock, Unit, scan_blocks},
    span::{Span, line_of},
};

/// Resource type of log subscription filters.
pub const SUBSCRIPTION_FILTER_TYPE: &str = "aws_cloudwatch_log_subscription_filter";

/// A named intermediate value from a `locals` block.
#[derive(Debug, Clone, PartialEq)]
pub struct LocalDefinition {
    name: String,
    expression: String,
    location: SourceLocation,
}

impl LocalDefinition {
    pub fn new(name: impl Into<String>, expression: impl Into<String>, location: SourceLocation) -> Self {
        Self {
            name: name.into(),
            expression: expression.into(),
            location,
        }
    }

    /// The unqualified name (`region` for `local.region`).
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn expression(&self) -> &str {
        &self.expression
    }

    pub fn location(&self) -> &SourceLocation {
        &self.location
    }
}

/// An external input declared by a `variable` block.
#[derive(Debug, Clone, PartialEq)]
pub struct VariableDefinition {
    name: String,
    default: Option<String>,
    location: SourceLocation,
}

impl VariableDefinition {
    pub fn new(name: impl Into<String>, default: Option<String>, location: SourceLocation) -> Self {
        Self {
            name: name.into(),
            default,
            location,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The default expression text, if one is declared.
    pub fn default(&self) -> Option<&str> {
        self.default.as_deref()
    }

    pub fn location(&self) -> &SourceLocation {
        &self.location
    }
}

/// Kinds of blocks kept aside for relationship inference instead of becoming
/// diagram nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecialKind {
    SubscriptionFilter,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SpecialBlock {
    kind: SpecialKind,
    definition: ResourceDefinition,
}

impl SpecialBlock {
    pub fn new(kind: SpecialKind, definition: ResourceDefinition) -> Self {
        Self { kind, definition }
    }

    pub fn kind(&self) -> SpecialKind {
        self.kind
    }

    pub fn definition(&self) -> &ResourceDefinition {
        &self.definition
    }
}

/// Everything extracted from a set of files.
#[derive(Debug, Clone, Default)]
pub struct Extraction {
    pub resources: Vec<ResourceDefinition>,
    pub locals: Vec<LocalDefinition>,
    pub variables: Vec<VariableDefinition>,
    pub special_blocks: Vec<SpecialBlock>,
    /// Recovered problems, one entry per affected file.
    pub diagnostics: Vec<FileDiagnostics>,
}

/// One item of a block body.
#[derive(Debug, Clone, PartialEq)]
enum BodyItem {
    Attribute { name: String, value: String },
    Block { name: String, body: Span },
}

/// Normalize attribute text into a value.
///
/// Literals and bare resource references are recognised; everything else is
/// kept as raw expression text.
pub fn classify(text: &str) -> AttributeValue {
    if let Some(Expr::Literal(literal)) = expr::parse(text) {
        return AttributeValue::Literal(literal);
    }
    if let Some(reference) = parse_reference(text) {
        return AttributeValue::Reference(reference);
    }
    AttributeValue::RawExpression(text.trim().to_string())
}

/// Extract every file and merge the results in file order.
pub fn extract_all(files: &[SourceFile]) -> Extraction {
    let per_file: Vec<Extraction> = files.par_iter().map(extract_file).collect();

    let mut merged = Extraction::default();
    let mut seen_resources: HashSet<ResourceKey> = HashSet::new();
    let mut seen_locals: HashSet<String> = HashSet::new();
    let mut seen_variables: HashSet<String> = HashSet::new();

    for extraction in per_file {
        for resource in extraction.resources {
            if seen_resources.insert(resource.key().clone()) {
                merged.resources.push(resource);
            } else {
                warn!(
                    resource = resource.key().to_string(),
                    location = resource.location().to_string();
                    "Duplicate resource declaration ignored"
                );
            }
        }
        for local in extraction.locals {
            if seen_locals.insert(local.name().to_string()) {
                merged.locals.push(local);
            } else {
                warn!(
                    local = local.name(),
                    location = local.location().to_string();
                    "Duplicate local value ignored"
                );
            }
        }
        for variable in extraction.variables {
            if seen_variables.insert(variable.name().to_string()) {
                merged.variables.push(variable);
            } else {
                warn!(variable = variable.name(); "Duplicate variable declaration ignored");
            }
        }
        merged.special_blocks.extend(extraction.special_blocks);
        merged.diagnostics.extend(extraction.diagnostics);
    }

    info!(
        files = files.len(),
        resources = merged.resources.len(),
        locals = merged.locals.len(),
        variables = merged.variables.len(),
        special_blocks = merged.special_blocks.len(),
        files_with_errors = merged.diagnostics.len();
        "Extracted declaration blocks"
    );

    merged
}

/// Extract a single file.
pub fn extract_file(file: &SourceFile) -> Extraction {
    let text = file.text();
    let (blocks, diagnostics) = scan_blocks(text);
    let mut collector = DiagnosticCollector::new();
    for diagnostic in diagnostics {
        collector.emit(diagnostic);
    }

    let mut extraction = Extraction::default();
    for block in &blocks {
        let location = SourceLocation::new(
            file.path(),
            line_of(text, block.span().start()),
            line_of(text, block.span().end().saturating_sub(1)),
        );
        match block.block_type() {
            "resource" => {
                let Some(definition) = resource_definition(text, block, location, &mut collector) else {
                    continue;
                };
                let definition = definition.with_tier(file.tier());
                if definition.resource_type() == SUBSCRIPTION_FILTER_TYPE {
                    extraction
                        .special_blocks
                        .push(SpecialBlock::new(SpecialKind::SubscriptionFilter, definition));
                } else {
                    extraction.resources.push(definition);
                }
            }
            "locals" => {
                for item in parse_body(text, block.body(), &mut collector) {
                    match item {
                        BodyItem::Attribute { name, value } => extraction
                            .locals
                            .push(LocalDefinition::new(name, value, location.clone())),
                        BodyItem::Block { name, body } => collector.emit(
                            Diagnostic::error(format!("unexpected block `{name}` in locals"))
                                .with_code(ErrorCode::E103)
                                .with_label(body, "locals only hold attributes"),
                        ),
                    }
                }
            }
            "variable" => {
                let default = parse_body(text, block.body(), &mut collector)
                    .into_iter()
                    .find_map(|item| match item {
                        BodyItem::Attribute { name, value } if name == "default" => Some(value),
                        _ => None,
                    });
                if let Some(name) = block.labels().first() {
                    extraction
                        .variables
                        .push(VariableDefinition::new(name.as_str(), default, location));
                }
            }
            other => {
                debug!(block_type = other, location = location.to_string(); "Ignoring block");
            }
        }
    }

    let diagnostics = collector.finish();
    if !diagnostics.is_empty() {
        extraction.diagnostics.push(FileDiagnostics::new(
            file.path(),
            file.shared_text(),
            ParseError::new(diagnostics),
        ));
    }

    debug!(
        path = file.path().display().to_string(),
        blocks = blocks.len(),
        resources = extraction.resources.len();
        "Extracted file"
    );

    extraction
}

fn resource_definition(
    text: &str,
    block: &RawBlock,
    location: SourceLocation,
    collector: &mut DiagnosticCollector,
) -> Option<ResourceDefinition> {
    let [resource_type, name] = block.labels() else {
        return None;
    };
    let key = ResourceKey::new(resource_type.as_str(), name.as_str());

    let mut attributes: IndexMap<String, AttributeValue> = IndexMap::new();
    let mut block_counts: IndexMap<String, usize> = IndexMap::new();

    for item in parse_body(text, block.body(), collector) {
        match item {
            BodyItem::Attribute { name, value } => insert_attribute(&mut attributes, &key, name, &value),
            BodyItem::Block { name, body } => {
                let index = next_index(&mut block_counts, &name);
                let prefix = format!("{name}[{index}]");
                let mut inner_counts: IndexMap<String, usize> = IndexMap::new();
                for inner in parse_body(text, body, collector) {
                    match inner {
                        BodyItem::Attribute { name, value } => {
                            insert_attribute(&mut attributes, &key, format!("{prefix}.{name}"), &value)
                        }
                        BodyItem::Block { name, body } => {
                            let inner_index = next_index(&mut inner_counts, &name);
                            let opaque = body.slice(text).trim();
                            attributes.insert(
                                format!("{prefix}.{name}[{inner_index}]"),
                                AttributeValue::RawExpression(format!("{{ {opaque} }}")),
                            );
                        }
                    }
                }
            }
        }
    }

    Some(ResourceDefinition::new(key, attributes, location))
}

fn next_index(counts: &mut IndexMap<String, usize>, name: &str) -> usize {
    let slot = counts.entry(name.to_string()).or_insert(0);
    let index = *slot;
    *slot += 1;
    index
}

fn insert_attribute(
    attributes: &mut IndexMap<String, AttributeValue>,
    key: &ResourceKey,
    name: String,
    value: &str,
) {
    if attributes.contains_key(&name) {
        debug!(resource = key.to_string(), attribute = name; "Repeated attribute ignored");
        return;
    }
    attributes.insert(name, classify(value));
}

/// Split a block body into attributes and nested blocks.
///
/// A line that is neither is reported with [`ErrorCode::E103`] and skipped;
/// the rest of the body is still read.
fn parse_body(text: &str, body: Span, collector: &mut DiagnosticCollector) -> Vec<BodyItem> {
    let mut cursor = Cursor::new(text, body);
    let mut items = Vec::new();

    loop {
        if let Err(diagnostic) = cursor.skip_trivia() {
            collector.emit(diagnostic);
            break;
        }
        if cursor.at_end() {
            break;
        }

        let line_start = cursor.pos();
        let Some(name_span) = cursor.identifier() else {
            malformed(text, &mut cursor, line_start, collector);
            continue;
        };
        let name = name_span.slice(text).to_string();
        cursor.skip_inline_whitespace();

        match (cursor.peek(), cursor.peek_nth(1)) {
            (Some(b'='), next) if next != Some(b'=') => {
                cursor.bump();
                match attribute_value(text, &mut cursor) {
                    Some(value) => items.push(BodyItem::Attribute { name, value }),
                    None => collector.emit(
                        Diagnostic::error(format!("attribute `{name}` has no value"))
                            .with_code(ErrorCode::E103)
                            .with_label(Span::new(line_start..cursor.pos()), "missing value"),
                    ),
                }
            }
            (Some(b'{' | b'"'), _) | (Some(b'a'..=b'z' | b'A'..=b'Z' | b'_'), _) => {
                match nested_block(&mut cursor) {
                    Some(body) => items.push(BodyItem::Block { name, body }),
                    None => malformed(text, &mut cursor, line_start, collector),
                }
            }
            _ => malformed(text, &mut cursor, line_start, collector),
        }
    }

    items
}

/// Read an attribute value up to the end of its logical line.
fn attribute_value(text: &str, cursor: &mut Cursor<'_>) -> Option<String> {
    cursor.skip_inline_whitespace();
    let start = cursor.pos();
    let mut end = start;
    let mut depth = 0usize;

    loop {
        match cursor.next_unit() {
            Ok(Unit::Open(_)) => depth += 1,
            Ok(Unit::Close(_)) => depth = depth.saturating_sub(1),
            Ok(Unit::Newline) if depth == 0 => break,
            Ok(Unit::End) | Err(_) => break,
            Ok(Unit::Newline | Unit::Trivia) => continue,
            Ok(Unit::Token) => {}
        }
        end = cursor.pos();
    }

    let value = text[start..end].trim();
    (!value.is_empty()).then(|| value.to_string())
}

/// Read the labels and braces of a nested block, returning its body span.
fn nested_block(cursor: &mut Cursor<'_>) -> Option<Span> {
    loop {
        cursor.skip_inline_whitespace();
        match cursor.peek() {
            Some(b'{') => break,
            Some(b'"') => {
                cursor.quoted().ok()?;
            }
            Some(b) if b.is_ascii_alphabetic() || b == b'_' => {
                cursor.identifier()?;
            }
            _ => return None,
        }
    }
    let open = cursor.pos();
    cursor.bump();
    let close = cursor.balanced(open)?;
    Some(Span::new(open + 1..close))
}

fn malformed(text: &str, cursor: &mut Cursor<'_>, line_start: usize, collector: &mut DiagnosticCollector) {
    cursor.skip_to_line_end();
    let span = Span::new(line_start..cursor.pos().max(line_start + 1).min(text.len()));
    collector.emit(
        Diagnostic::error("malformed attribute")
            .with_code(ErrorCode::E103)
            .with_label(span, "expected `name = value` or a nested block")
            .with_help("the attribute was skipped; the rest of the block is kept"),
    );
}
