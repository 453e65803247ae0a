//! Finding references inside attribute text.
//!
//! Two kinds of names matter downstream: references to other resources
//! (`aws_iam_role.lambda.arn`), which become relationships, and qualified
//! value names (`local.region`, `var.env`), which drive resolution order.
//! Both are only recognised in code context: the literal parts of a string
//! are skipped, while `${ ... }` interpolations inside strings are scanned.

use std::collections::BTreeSet;

use infragram_core::identifier::{ResourceKey, ResourceRef};
use winnow::{
    Parser as _,
    combinator::{alt, delimited, opt, preceded},
    error::ModalResult,
    token::{one_of, take_while},
};

fn is_word_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_'
}

fn is_word_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'-'
}

fn identifier<'a>(input: &mut &'a str) -> ModalResult<&'a str> {
    (
        one_of(|c: char| c.is_ascii_alphabetic() || c == '_'),
        take_while(0.., |c: char| c.is_ascii_alphanumeric() || c == '_' || c == '-'),
    )
        .take()
        .parse_next(input)
}

/// A resource type: an identifier with at least one underscore, which rules
/// out `local`, `var`, `data`, `module`, `each`, `count`, `self` and `path`.
fn resource_type<'a>(input: &mut &'a str) -> ModalResult<&'a str> {
    identifier.verify(|s: &str| s.contains('_')).parse_next(input)
}

fn index(input: &mut &str) -> ModalResult<()> {
    delimited('[', take_while(0.., |c: char| c != ']' && c != '\n'), ']')
        .void()
        .parse_next(input)
}

/// `type.name.attr`, with an optional index or splat after the name.
fn embedded_reference(input: &mut &str) -> ModalResult<ResourceRef> {
    let resource_type = resource_type.parse_next(input)?;
    '.'.parse_next(input)?;
    let name = identifier.parse_next(input)?;
    opt(alt((index, ".*".void()))).parse_next(input)?;
    let attribute = opt(preceded('.', identifier)).parse_next(input)?;
    Ok(ResourceRef::new(
        ResourceKey::new(resource_type, name),
        attribute.map(str::to_string),
    ))
}

/// `type.name` or `type.name.attr` and nothing else.
fn exact_reference(input: &mut &str) -> ModalResult<ResourceRef> {
    (
        resource_type,
        '.',
        identifier,
        opt(preceded('.', identifier)),
    )
        .map(|(resource_type, _, name, attribute)| {
            ResourceRef::new(
                ResourceKey::new(resource_type, name),
                attribute.map(str::to_string),
            )
        })
        .parse_next(input)
}

fn qualified_name<'a>(input: &mut &'a str) -> ModalResult<&'a str> {
    (alt(("local", "var")), '.', identifier)
        .take()
        .parse_next(input)
}

/// Parse `text` as a bare resource reference.
///
/// # Examples
///
/// ```
/// use infragram_parser::references::parse_reference;
///
/// let reference = parse_reference("aws_iam_role.lambda.arn").unwrap();
/// assert_eq!(reference.key().to_string(), "aws_iam_role.lambda");
/// assert_eq!(reference.attribute(), Some("arn"));
///
/// assert!(parse_reference("var.role_arn").is_none());
/// assert!(parse_reference("aws_instance.web[0].id").is_none());
/// ```
pub fn parse_reference(text: &str) -> Option<ResourceRef> {
    exact_reference.parse(text.trim()).ok()
}

/// Every resource reference in `text`, in order of appearance.
pub fn scan_references(text: &str) -> Vec<ResourceRef> {
    word_starts(text)
        .into_iter()
        .filter_map(|start| {
            let mut rest = &text[start..];
            embedded_reference.parse_next(&mut rest).ok()
        })
        .collect()
}

/// Every `local.x` and `var.x` name in `text`.
pub fn scan_value_names(text: &str) -> BTreeSet<String> {
    word_starts(text)
        .into_iter()
        .filter_map(|start| {
            let mut rest = &text[start..];
            qualified_name.parse_next(&mut rest).ok().map(str::to_string)
        })
        .collect()
}

#[derive(Debug, Clone, Copy)]
enum Context {
    /// Code, with the number of `{` opened at this level.
    Code(usize),
    Str,
}

/// Byte offsets where a word starts in code context.
///
/// A word preceded by `.` is a path segment of something else
/// (`data.aws_iam_policy_document.x`) and is not a start.
fn word_starts(text: &str) -> Vec<usize> {
    let bytes = text.as_bytes();
    let mut stack = vec![Context::Code(0)];
    let mut starts = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        let Some(&top) = stack.last() else {
            break;
        };
        let b = bytes[i];
        let next = bytes.get(i + 1).copied();
        match top {
            Context::Str => match b {
                b'\\' => i += 2,
                b'"' => {
                    stack.pop();
                    i += 1;
                }
                b'$' | b'%' if next == Some(b) && bytes.get(i + 2) == Some(&b'{') => i += 3,
                b'$' | b'%' if next == Some(b'{') => {
                    stack.push(Context::Code(0));
                    i += 2;
                }
                _ => i += 1,
            },
            Context::Code(depth) => match b {
                b'"' => {
                    stack.push(Context::Str);
                    i += 1;
                }
                b'{' => {
                    stack.pop();
                    stack.push(Context::Code(depth + 1));
                    i += 1;
                }
                b'}' if depth == 0 && stack.len() > 1 => {
                    stack.pop();
                    i += 1;
                }
                b'}' => {
                    stack.pop();
                    stack.push(Context::Code(depth.saturating_sub(1)));
                    i += 1;
                }
                b'#' => {
                    while i < bytes.len() && bytes[i] != b'\n' {
                        i += 1;
                    }
                }
                b if is_word_start(b) => {
                    let preceded_by_path = i > 0 && bytes[i - 1] == b'.';
                    let glued = i > 0 && is_word_char(bytes[i - 1]);
                    if !preceded_by_path && !glued {
                        starts.push(i);
                    }
                    while i < bytes.len() && is_word_char(bytes[i]) {
                        i += 1;
                    }
                }
                _ => i += 1,
            },
        }
    }

    starts
}
