//! Balanced-delimiter scanning of declaration files.
//!
//! The scanner does not parse the configuration language. It only knows
//! enough lexical structure to find where each top-level block starts and
//! ends: quoted strings (with escapes and `${ ... }` interpolations),
//! heredocs, the three comment forms, and the nesting of `{}`, `[]` and
//! `()`. Its output is a flat list of [`RawBlock`] records.
//!
//! A block that never closes is reported and skipped. Scanning resumes at
//! the next line that starts, in column zero, with a top-level block keyword,
//! so one broken block does not swallow the blocks that follow it.

use crate::{
    error::{Diagnostic, DiagnosticCollector, ErrorCode},
    span::Span,
};

/// Block types that may start a top-level block.
pub(crate) const TOP_LEVEL_KEYWORDS: &[&str] = &[
    "resource",
    "data",
    "locals",
    "variable",
    "output",
    "module",
    "provider",
    "terraform",
    "moved",
    "import",
    "check",
    "removed",
];

/// A top-level block found in a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawBlock {
    block_type: String,
    labels: Vec<String>,
    span: Span,
    header: Span,
    body: Span,
}

impl RawBlock {
    /// The block keyword, e.g. `resource`.
    pub fn block_type(&self) -> &str {
        &self.block_type
    }

    /// Labels following the keyword, unquoted.
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// The whole block, from the keyword through the closing brace.
    pub fn span(&self) -> Span {
        self.span
    }

    /// The keyword, labels and opening brace.
    pub fn header(&self) -> Span {
        self.header
    }

    /// Everything between the braces.
    pub fn body(&self) -> Span {
        self.body
    }
}

/// One lexical unit, as far as delimiter balancing is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Unit {
    Open(u8),
    Close(u8),
    Newline,
    /// Whitespace or a comment.
    Trivia,
    /// Anything else, including whole strings and heredocs.
    Token,
    End,
}

fn closing_for(open: u8) -> u8 {
    match open {
        b'{' => b'}',
        b'[' => b']',
        _ => b')',
    }
}

fn is_identifier_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_'
}

fn is_identifier_continue(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'-'
}

/// A position in a bounded region of a file's text.
///
/// All structural characters are ASCII, so every position the cursor stops
/// at is a character boundary.
#[derive(Debug, Clone)]
pub(crate) struct Cursor<'a> {
    text: &'a str,
    pos: usize,
    end: usize,
}

impl<'a> Cursor<'a> {
    pub(crate) fn new(text: &'a str, region: Span) -> Self {
        let end = region.end().min(text.len());
        Self {
            text,
            pos: region.start().min(end),
            end,
        }
    }

    pub(crate) fn pos(&self) -> usize {
        self.pos
    }

    pub(crate) fn at_end(&self) -> bool {
        self.pos >= self.end
    }

    pub(crate) fn peek(&self) -> Option<u8> {
        self.peek_nth(0)
    }

    pub(crate) fn peek_nth(&self, n: usize) -> Option<u8> {
        let at = self.pos + n;
        if at < self.end {
            Some(self.text.as_bytes()[at])
        } else {
            None
        }
    }

    pub(crate) fn bump(&mut self) {
        if !self.at_end() {
            self.pos += 1;
        }
    }

    fn starts_with(&self, s: &str) -> bool {
        self.text.as_bytes()[self.pos..self.end].starts_with(s.as_bytes())
    }

    pub(crate) fn skip_inline_whitespace(&mut self) {
        while matches!(self.peek(), Some(b' ' | b'\t' | b'\r')) {
            self.pos += 1;
        }
    }

    /// Advance to the next newline without consuming it.
    pub(crate) fn skip_to_line_end(&mut self) {
        while let Some(b) = self.peek() {
            if b == b'\n' {
                break;
            }
            self.pos += 1;
        }
    }

    /// Skip whitespace, newlines and comments.
    pub(crate) fn skip_trivia(&mut self) -> Result<(), Diagnostic> {
        loop {
            match (self.peek(), self.peek_nth(1)) {
                (Some(b' ' | b'\t' | b'\r' | b'\n'), _) => self.pos += 1,
                (Some(b'#'), _) | (Some(b'/'), Some(b'/')) => self.skip_to_line_end(),
                (Some(b'/'), Some(b'*')) => self.block_comment()?,
                _ => return Ok(()),
            }
        }
    }

    fn block_comment(&mut self) -> Result<(), Diagnostic> {
        let start = self.pos;
        self.pos += 2;
        while !self.at_end() {
            if self.starts_with("*/") {
                self.pos += 2;
                return Ok(());
            }
            self.pos += 1;
        }
        Err(Diagnostic::error("unterminated block comment")
            .with_code(ErrorCode::E003)
            .with_label(Span::new(start..start + 2), "comment starts here")
            .with_help("close the comment with `*/`"))
    }

    /// Consume an identifier, if one starts here.
    pub(crate) fn identifier(&mut self) -> Option<Span> {
        let start = self.pos;
        if !self.peek().is_some_and(is_identifier_start) {
            return None;
        }
        while self.peek().is_some_and(is_identifier_continue) {
            self.pos += 1;
        }
        Some(Span::new(start..self.pos))
    }

    /// Consume a quoted string starting at `"`, returning its span including
    /// the quotes.
    ///
    /// On an unterminated string the cursor stops at the end of the line, so
    /// the caller can keep scanning from the next one.
    pub(crate) fn quoted(&mut self) -> Result<Span, Diagnostic> {
        let start = self.pos;
        self.pos += 1;
        loop {
            match self.peek() {
                None | Some(b'\n') => return Err(unterminated_string(start, self.pos)),
                Some(b'\\') => {
                    self.pos += 1;
                    if self.peek().is_some_and(|b| b != b'\n') {
                        self.pos += 1;
                    }
                }
                Some(b'"') => {
                    self.pos += 1;
                    return Ok(Span::new(start..self.pos));
                }
                Some(b'$' | b'%') if self.peek_nth(1) == self.peek() && self.peek_nth(2) == Some(b'{') => {
                    self.pos += 3;
                }
                Some(b'$' | b'%') if self.peek_nth(1) == Some(b'{') => {
                    self.pos += 2;
                    self.interpolation(start)?;
                }
                Some(_) => self.pos += 1,
            }
        }
    }

    /// Skip the inside of `${ ... }` up to and including its closing brace.
    fn interpolation(&mut self, string_start: usize) -> Result<(), Diagnostic> {
        let mut depth = 1usize;
        loop {
            match self.peek() {
                None => return Err(unterminated_string(string_start, self.pos)),
                Some(b'"') => {
                    self.quoted()?;
                }
                Some(b'{') => {
                    depth += 1;
                    self.pos += 1;
                }
                Some(b'}') => {
                    depth -= 1;
                    self.pos += 1;
                    if depth == 0 {
                        return Ok(());
                    }
                }
                Some(_) => self.pos += 1,
            }
        }
    }

    /// Consume a heredoc starting at `<<`, through its closing marker line.
    fn heredoc(&mut self) -> Result<Span, Diagnostic> {
        let start = self.pos;
        self.pos += 2;
        if self.peek() == Some(b'-') {
            self.pos += 1;
        }
        let text = self.text;
        let Some(marker) = self.identifier().map(|span| span.slice(text)) else {
            return Ok(Span::new(start..self.pos));
        };
        let header = Span::new(start..self.pos);

        self.skip_to_line_end();
        while self.peek() == Some(b'\n') {
            self.pos += 1;
            let line_start = self.pos;
            self.skip_to_line_end();
            if text[line_start..self.pos].trim() == marker {
                return Ok(Span::new(start..self.pos));
            }
        }

        Err(Diagnostic::error(format!("unterminated heredoc `{marker}`"))
            .with_code(ErrorCode::E002)
            .with_label(header, "heredoc starts here")
            .with_help(format!("end the heredoc with a line containing only `{marker}`")))
    }

    /// Consume the next lexical unit.
    pub(crate) fn next_unit(&mut self) -> Result<Unit, Diagnostic> {
        let Some(b) = self.peek() else {
            return Ok(Unit::End);
        };
        match (b, self.peek_nth(1)) {
            (b'\n', _) => {
                self.pos += 1;
                Ok(Unit::Newline)
            }
            (b' ' | b'\t' | b'\r', _) => {
                self.skip_inline_whitespace();
                Ok(Unit::Trivia)
            }
            (b'#', _) | (b'/', Some(b'/')) => {
                self.skip_to_line_end();
                Ok(Unit::Trivia)
            }
            (b'/', Some(b'*')) => {
                self.block_comment()?;
                Ok(Unit::Trivia)
            }
            (b'"', _) => {
                self.quoted()?;
                Ok(Unit::Token)
            }
            (b'<', Some(b'<')) => {
                self.heredoc()?;
                Ok(Unit::Token)
            }
            (b'{' | b'[' | b'(', _) => {
                self.pos += 1;
                Ok(Unit::Open(b))
            }
            (b'}' | b']' | b')', _) => {
                self.pos += 1;
                Ok(Unit::Close(b))
            }
            _ => {
                self.pos += 1;
                Ok(Unit::Token)
            }
        }
    }

    /// Whether the cursor sits at the start of a line that opens a top-level
    /// block: a keyword in column zero followed by a label or `{`.
    pub(crate) fn at_top_level_block_start(&self) -> bool {
        let mut probe = self.clone();
        let Some(keyword) = probe.identifier() else {
            return false;
        };
        if !TOP_LEVEL_KEYWORDS.contains(&keyword.slice(self.text)) {
            return false;
        }
        probe.skip_inline_whitespace();
        matches!(probe.peek(), Some(b'"' | b'{'))
            || (probe.peek().is_some_and(is_identifier_start)
                && probe.identifier().is_some()
                && {
                    probe.skip_inline_whitespace();
                    matches!(probe.peek(), Some(b'"' | b'{'))
                })
    }

    /// Scan a balanced region whose opening delimiter sits at `open`.
    ///
    /// The cursor must be just past the opener. Returns the position of the
    /// matching closer; the cursor is left just past it.
    pub(crate) fn balanced(&mut self, open: usize) -> Option<usize> {
        let mut stack = vec![self.text.as_bytes()[open]];
        loop {
            let at = self.pos;
            match self.next_unit() {
                Ok(Unit::Open(b)) => stack.push(b),
                Ok(Unit::Close(b)) => {
                    if stack.last().map(|&o| closing_for(o)) == Some(b) {
                        stack.pop();
                        if stack.is_empty() {
                            return Some(at);
                        }
                    }
                }
                Ok(Unit::End) | Err(_) => return None,
                Ok(_) => {}
            }
        }
    }
}

fn unterminated_string(start: usize, at: usize) -> Diagnostic {
    Diagnostic::error("unterminated string literal")
        .with_code(ErrorCode::E001)
        .with_label(Span::new(start..at.max(start + 1)), "string starts here")
        .with_help("close the string with `\"` on the same line")
}

/// Strip the quotes from a label and undo simple escapes.
fn unquote(raw: &str) -> String {
    let inner = raw
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(raw);
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(escaped) = chars.next() {
                out.push(escaped);
            }
        } else {
            out.push(c);
        }
    }
    out
}

/// Number of labels a block type requires, when it has a fixed arity.
fn expected_labels(block_type: &str) -> Option<usize> {
    match block_type {
        "resource" | "data" => Some(2),
        "variable" | "output" | "module" | "provider" | "check" => Some(1),
        "locals" | "terraform" | "moved" | "import" | "removed" => Some(0),
        _ => None,
    }
}

/// Scan `text` into top-level blocks.
///
/// Never fails: every problem is returned as a diagnostic and the offending
/// block is left out of the result.
pub fn scan_blocks(text: &str) -> (Vec<RawBlock>, Vec<Diagnostic>) {
    let mut cursor = Cursor::new(text, Span::new(0..text.len()));
    let mut collector = DiagnosticCollector::new();
    let mut blocks = Vec::new();

    loop {
        if let Err(diagnostic) = cursor.skip_trivia() {
            collector.emit(diagnostic);
            break;
        }
        if cursor.at_end() {
            break;
        }

        if let Some(b @ (b'}' | b']' | b')')) = cursor.peek() {
            let at = cursor.pos();
            collector.emit(
                Diagnostic::error(format!("unexpected closing delimiter `{}`", b as char))
                    .with_code(ErrorCode::E101)
                    .with_label(Span::new(at..at + 1), "no block is open here"),
            );
            cursor.bump();
            continue;
        }

        if let Some(block) = scan_block(text, &mut cursor, &mut collector) {
            blocks.push(block);
        }
    }

    (blocks, collector.finish())
}

fn scan_block(
    text: &str,
    cursor: &mut Cursor<'_>,
    collector: &mut DiagnosticCollector,
) -> Option<RawBlock> {
    let start = cursor.pos();

    let Some(type_span) = cursor.identifier() else {
        cursor.bump();
        cursor.skip_to_line_end();
        collector.emit(
            Diagnostic::error("expected a block")
                .with_code(ErrorCode::E102)
                .with_label(Span::new(start..cursor.pos()), "not a block header"),
        );
        return None;
    };
    let block_type = type_span.slice(text).to_string();

    let mut labels = Vec::new();
    loop {
        cursor.skip_inline_whitespace();
        match cursor.peek() {
            Some(b'{') => break,
            Some(b'"') => match cursor.quoted() {
                Ok(span) => labels.push(unquote(span.slice(text))),
                Err(diagnostic) => {
                    collector.emit(diagnostic);
                    return None;
                }
            },
            Some(b) if is_identifier_start(b) => {
                if let Some(span) = cursor.identifier() {
                    labels.push(span.slice(text).to_string());
                }
            }
            _ => {
                cursor.skip_to_line_end();
                collector.emit(
                    Diagnostic::error(format!("malformed `{block_type}` block header"))
                        .with_code(ErrorCode::E102)
                        .with_label(Span::new(start..cursor.pos()), "expected labels followed by `{`"),
                );
                return None;
            }
        }
    }

    let open = cursor.pos();
    cursor.bump();
    let header = Span::new(start..open + 1);

    let mut stack: Vec<(u8, usize)> = vec![(b'{', open)];
    let mut broken = false;
    let close = loop {
        let at = cursor.pos();
        match cursor.next_unit() {
            Err(diagnostic) => {
                collector.emit(diagnostic);
                broken = true;
            }
            Ok(Unit::Open(b)) => stack.push((b, at)),
            Ok(Unit::Close(b)) => {
                if stack.last().map(|&(o, _)| closing_for(o)) == Some(b) {
                    stack.pop();
                } else {
                    collector.emit(
                        Diagnostic::error(format!("mismatched closing delimiter `{}`", b as char))
                            .with_code(ErrorCode::E101)
                            .with_label(Span::new(at..at + 1), "does not match the open delimiter")
                            .with_secondary_label(header, "in this block"),
                    );
                    broken = true;
                    if let Some(index) = stack.iter().rposition(|&(o, _)| closing_for(o) == b) {
                        stack.truncate(index);
                    }
                }
                if stack.is_empty() {
                    break at;
                }
            }
            Ok(Unit::Newline) => {
                if cursor.at_top_level_block_start() {
                    report_unbalanced(collector, &block_type, header, &stack, broken);
                    return None;
                }
            }
            Ok(Unit::End) => {
                report_unbalanced(collector, &block_type, header, &stack, broken);
                return None;
            }
            Ok(Unit::Trivia | Unit::Token) => {}
        }
    };

    if broken {
        return None;
    }

    if let Some(expected) = expected_labels(&block_type) {
        if labels.len() != expected {
            collector.emit(
                Diagnostic::error(format!(
                    "`{block_type}` block needs {expected} label(s), found {}",
                    labels.len()
                ))
                .with_code(ErrorCode::E102)
                .with_label(header, "malformed header"),
            );
            return None;
        }
    }

    Some(RawBlock {
        block_type,
        labels,
        span: Span::new(start..close + 1),
        header,
        body: Span::new(open + 1..close),
    })
}

fn report_unbalanced(
    collector: &mut DiagnosticCollector,
    block_type: &str,
    header: Span,
    stack: &[(u8, usize)],
    already_reported: bool,
) {
    if already_reported {
        return;
    }
    let mut diagnostic = Diagnostic::error(format!("unbalanced delimiters in `{block_type}` block"))
        .with_code(ErrorCode::E100)
        .with_label(header, "block starts here");
    if let Some(&(open, at)) = stack.last() {
        diagnostic = diagnostic.with_secondary_label(
            Span::new(at..at + 1),
            format!("this `{}` is never closed", open as char),
        );
    }
    collector.emit(diagnostic.with_help("the block was skipped; add the missing closing delimiter"));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scan(text: &str) -> (Vec<RawBlock>, Vec<Diagnostic>) {
        scan_blocks(text)
    }

    fn codes(diagnostics: &[Diagnostic]) -> Vec<ErrorCode> {
        diagnostics.iter().filter_map(Diagnostic::code).collect()
    }

    #[test]
    fn test_scans_blocks_with_labels() {
        let text = r#"
resource "aws_instance" "allocator" {
  ami = "ami-123"
}

locals {
  region = "us-west-2"
}
"#;
        let (blocks, diagnostics) = scan(text);

        assert!(diagnostics.is_empty());
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].block_type(), "resource");
        assert_eq!(blocks[0].labels(), ["aws_instance", "allocator"]);
        assert_eq!(blocks[0].body().slice(text).trim(), "ami = \"ami-123\"");
        assert_eq!(blocks[1].block_type(), "locals");
        assert!(blocks[1].labels().is_empty());
    }

    #[test]
    fn test_braces_inside_strings_heredocs_and_comments_are_ignored() {
        let text = r#"
resource "aws_iam_role" "r" {
  name = "role-}}}"
  # a comment with a } brace
  /* and { another */
  assume_role_policy = <<EOF
{ "Statement": [ { "Effect": "Allow" ] }
EOF
  tags = { Name = "${var.prefix}-{x}" }
}
resource "aws_lb" "main" {}
"#;
        let (blocks, diagnostics) = scan(text);

        assert!(diagnostics.is_empty(), "{diagnostics:?}");
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[1].labels(), ["aws_lb", "main"]);
    }

    #[test]
    fn test_unclosed_block_is_skipped_and_scanning_resumes() {
        let text = r#"resource "aws_instance" "a" {
  ami = "x"
}

resource "aws_instance" "broken" {
  ami = "y"
  tags = {
    Name = "z"

resource "aws_instance" "c" {
  ami = "w"
}
"#;
        let (blocks, diagnostics) = scan(text);

        let names: Vec<_> = blocks.iter().map(|b| b.labels()[1].as_str()).collect();
        assert_eq!(names, ["a", "c"]);
        assert_eq!(codes(&diagnostics), [ErrorCode::E100]);
    }

    #[test]
    fn test_unclosed_block_at_end_of_file() {
        let (blocks, diagnostics) = scan("resource \"a_b\" \"c\" {\n  x = [1, 2\n");
        assert!(blocks.is_empty());
        assert_eq!(codes(&diagnostics), [ErrorCode::E100]);
    }

    #[test]
    fn test_stray_closing_brace() {
        let (blocks, diagnostics) = scan("}\nlocals {}\n");
        assert_eq!(blocks.len(), 1);
        assert_eq!(codes(&diagnostics), [ErrorCode::E101]);
    }

    #[test]
    fn test_mismatched_delimiter_skips_block() {
        let (blocks, diagnostics) = scan("resource \"a_b\" \"c\" {\n  x = [1, 2)\n}\nlocals {}\n");
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].block_type(), "locals");
        assert!(codes(&diagnostics).contains(&ErrorCode::E101));
    }

    #[test]
    fn test_unterminated_string_skips_block() {
        let text = "resource \"a_b\" \"c\" {\n  name = \"oops\n}\nlocals {}\n";
        let (blocks, diagnostics) = scan(text);
        assert_eq!(blocks.len(), 1);
        assert_eq!(codes(&diagnostics), [ErrorCode::E001]);
    }

    #[test]
    fn test_unterminated_heredoc() {
        let (blocks, diagnostics) = scan("locals {\n  doc = <<EOT\nnever ends\n");
        assert!(blocks.is_empty());
        assert_eq!(codes(&diagnostics), [ErrorCode::E002]);
    }

    #[test]
    fn test_unterminated_block_comment_at_top_level() {
        let (blocks, diagnostics) = scan("locals {}\n/* trailing");
        assert_eq!(blocks.len(), 1);
        assert_eq!(codes(&diagnostics), [ErrorCode::E003]);
    }

    #[test]
    fn test_wrong_label_count() {
        let (blocks, diagnostics) = scan("resource \"aws_instance\" {\n}\n");
        assert!(blocks.is_empty());
        assert_eq!(codes(&diagnostics), [ErrorCode::E102]);
    }

    #[test]
    fn test_balanced_region() {
        let text = "{ a = [1, { b = \"}\" }] }";
        let mut cursor = Cursor::new(text, Span::new(1..text.len()));
        assert_eq!(cursor.balanced(0), Some(text.len() - 1));
    }
}
