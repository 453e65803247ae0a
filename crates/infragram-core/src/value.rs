//! Attribute values.
//!
//! Extraction normalizes every attribute of a declaration block into one of
//! three shapes: a [`Literal`], a [`ResourceRef`] to another resource, or the
//! raw expression text when neither applies. Resolution later replaces raw
//! expressions with literals where the value can be determined statically.

use std::fmt;

use crate::identifier::ResourceRef;

/// A fully known scalar value.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    String(String),
    Number(f64),
    Bool(bool),
}

impl Literal {
    /// Interpret the literal as a resource count.
    ///
    /// Numbers (and numeric strings) map to their integral value, booleans map
    /// to `1`/`0`. Returns `None` for anything that is not a valid count.
    ///
    /// # Examples
    ///
    /// ```
    /// use infragram_core::value::Literal;
    ///
    /// assert_eq!(Literal::Number(0.0).as_count(), Some(0));
    /// assert_eq!(Literal::Bool(true).as_count(), Some(1));
    /// assert_eq!(Literal::String("2".into()).as_count(), Some(2));
    /// assert_eq!(Literal::String("two".into()).as_count(), None);
    /// ```
    pub fn as_count(&self) -> Option<u64> {
        let number = match self {
            Literal::Number(n) => *n,
            Literal::Bool(b) => return Some(u64::from(*b)),
            Literal::String(s) => s.trim().parse::<f64>().ok()?,
        };

        if number.is_finite() && number >= 0.0 && number.fract() == 0.0 {
            Some(number as u64)
        } else {
            None
        }
    }

    /// The literal as it would be written in source text.
    ///
    /// Strings are quoted, with quotes, backslashes, control characters and
    /// template introducers (`${`, `%{`) escaped so the text parses back to
    /// the same literal.
    pub fn to_source(&self) -> String {
        match self {
            Literal::String(s) => {
                let mut out = String::with_capacity(s.len() + 2);
                out.push('"');
                let mut chars = s.chars().peekable();
                while let Some(c) = chars.next() {
                    match c {
                        '"' => out.push_str("\\\""),
                        '\\' => out.push_str("\\\\"),
                        '\n' => out.push_str("\\n"),
                        '\r' => out.push_str("\\r"),
                        '\t' => out.push_str("\\t"),
                        '$' | '%' if chars.peek() == Some(&'{') => {
                            out.push(c);
                            out.push(c);
                        }
                        c => out.push(c),
                    }
                }
                out.push('"');
                out
            }
            other => other.to_string(),
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::String(s) => write!(f, "{s}"),
            Literal::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => {
                write!(f, "{}", *n as i64)
            }
            Literal::Number(n) => write!(f, "{n}"),
            Literal::Bool(b) => write!(f, "{b}"),
        }
    }
}

/// The normalized value of a single attribute.
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    /// A string, number or boolean literal.
    Literal(Literal),
    /// A direct reference to another resource (`aws_iam_role.lambda.arn`).
    Reference(ResourceRef),
    /// Any other expression, kept verbatim (trimmed).
    ///
    /// Nested blocks, lists, maps, function calls, templates and references
    /// to locals or variables all land here until resolution.
    RawExpression(String),
}

impl AttributeValue {
    /// Returns the literal if this value is one.
    pub fn as_literal(&self) -> Option<&Literal> {
        match self {
            AttributeValue::Literal(literal) => Some(literal),
            _ => None,
        }
    }

    /// Returns the literal string if this value is a string literal.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttributeValue::Literal(Literal::String(s)) => Some(s),
            _ => None,
        }
    }

    /// Returns the reference if this value is one.
    pub fn as_reference(&self) -> Option<&ResourceRef> {
        match self {
            AttributeValue::Reference(reference) => Some(reference),
            _ => None,
        }
    }

    /// The value rendered back to source-like text.
    ///
    /// This is the text that reference scanning runs over, so references
    /// embedded in raw expressions stay visible.
    pub fn to_source(&self) -> String {
        match self {
            AttributeValue::Literal(literal) => literal.to_source(),
            AttributeValue::Reference(reference) => reference.to_string(),
            AttributeValue::RawExpression(text) => text.clone(),
        }
    }
}

impl From<Literal> for AttributeValue {
    fn from(literal: Literal) -> Self {
        AttributeValue::Literal(literal)
    }
}
