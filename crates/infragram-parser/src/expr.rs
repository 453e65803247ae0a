//! The resolvable expression subset.
//!
//! Only a closed grammar is understood:
//!
//! ```text
//! expression := equality ( "?" expression ":" expression )?
//! equality   := primary ( ( "==" | "!=" ) primary )*
//! primary    := "(" expression ")" | template | number | "true" | "false"
//!             | ( "local" | "var" ) "." identifier
//! template   := '"' ( text | escape | "${" expression "}" )* '"'
//! ```
//!
//! Text outside this grammar (function calls, arithmetic, collections,
//! references to resources or data sources, `%{ }` directives) does not
//! parse. Callers treat such values as unresolved, so a resource whose
//! presence depends on one is classified `Dynamic` instead of guessed.

use std::{
    collections::{BTreeMap, BTreeSet},
    fmt,
};

use infragram_core::value::Literal;
use winnow::{
    Parser as _,
    ascii::digit1,
    combinator::{alt, cut_err, delimited, fail, not, opt, peek, preceded, repeat, terminated},
    error::ModalResult,
    token::{one_of, take_while},
};

/// One piece of a string template.
#[derive(Debug, Clone, PartialEq)]
pub enum TemplatePart {
    Text(String),
    Interpolation(Expr),
}

/// A parsed expression from the resolvable subset.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Literal),
    /// A qualified name such as `local.env` or `var.region`.
    Variable(String),
    /// A string with at least one interpolation.
    Template(Vec<TemplatePart>),
    Equal(Box<Expr>, Box<Expr>),
    NotEqual(Box<Expr>, Box<Expr>),
    Conditional {
        test: Box<Expr>,
        then: Box<Expr>,
        otherwise: Box<Expr>,
    },
}

/// Result of evaluating an [`Expr`] against known values.
#[derive(Debug, Clone, PartialEq)]
pub enum Evaluation {
    Known(Literal),
    /// The value cannot be determined statically.
    ///
    /// Holds the names that were missing. The set is empty when every name
    /// was known but the expression still left the subset, e.g. a ternary
    /// whose test is not a boolean.
    Unresolved(BTreeSet<String>),
}

impl Evaluation {
    pub fn known(&self) -> Option<&Literal> {
        match self {
            Evaluation::Known(literal) => Some(literal),
            Evaluation::Unresolved(_) => None,
        }
    }

    fn merge(self, other: Evaluation) -> BTreeSet<String> {
        let mut names = BTreeSet::new();
        for evaluation in [self, other] {
            if let Evaluation::Unresolved(missing) = evaluation {
                names.extend(missing);
            }
        }
        names
    }
}

/// Parse `text` as an expression of the resolvable subset.
///
/// Returns `None` when the text is outside the subset.
///
/// # Examples
///
/// ```
/// use infragram_parser::expr::{self, Expr};
///
/// assert!(expr::parse(r#"var.env == "prod" ? 1 : 0"#).is_some());
/// assert!(expr::parse("length(var.subnets)").is_none());
/// ```
pub fn parse(text: &str) -> Option<Expr> {
    delimited(whitespace, expression, whitespace).parse(text).ok()
}

fn is_identifier_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-'
}

fn whitespace(input: &mut &str) -> ModalResult<()> {
    take_while(0.., |c: char| c.is_ascii_whitespace())
        .void()
        .parse_next(input)
}

fn expression(input: &mut &str) -> ModalResult<Expr> {
    let test = equality.parse_next(input)?;
    let branches = opt((
        delimited(whitespace, '?', whitespace),
        expression,
        delimited(whitespace, ':', whitespace),
        expression,
    ))
    .parse_next(input)?;

    Ok(match branches {
        Some((_, then, _, otherwise)) => Expr::Conditional {
            test: Box::new(test),
            then: Box::new(then),
            otherwise: Box::new(otherwise),
        },
        None => test,
    })
}

fn equality(input: &mut &str) -> ModalResult<Expr> {
    let first = primary.parse_next(input)?;
    let rest: Vec<(&str, Expr)> = repeat(
        0..,
        (delimited(whitespace, alt(("==", "!=")), whitespace), primary),
    )
    .parse_next(input)?;

    Ok(rest.into_iter().fold(first, |lhs, (op, rhs)| {
        if op == "==" {
            Expr::Equal(Box::new(lhs), Box::new(rhs))
        } else {
            Expr::NotEqual(Box::new(lhs), Box::new(rhs))
        }
    }))
}

fn primary(input: &mut &str) -> ModalResult<Expr> {
    alt((
        delimited(('(', whitespace), expression, (whitespace, ')')),
        template,
        number.map(|n| Expr::Literal(Literal::Number(n))),
        boolean.map(|b| Expr::Literal(Literal::Bool(b))),
        variable,
    ))
    .parse_next(input)
}

fn number(input: &mut &str) -> ModalResult<f64> {
    terminated(
        (opt('-'), digit1, opt(('.', digit1))).take(),
        peek(not(one_of(is_identifier_char))),
    )
    .try_map(str::parse::<f64>)
    .parse_next(input)
}

fn boolean(input: &mut &str) -> ModalResult<bool> {
    terminated(
        alt(("true".value(true), "false".value(false))),
        peek(not(one_of(is_identifier_char))),
    )
    .parse_next(input)
}

fn variable(input: &mut &str) -> ModalResult<Expr> {
    terminated(
        (
            alt(("local", "var")),
            '.',
            take_while(1.., is_identifier_char).verify(|s: &str| {
                s.starts_with(|c: char| c.is_ascii_alphabetic() || c == '_')
            }),
        )
            .take(),
        peek(not(one_of(['.', '[', '(']))),
    )
    .map(|name: &str| Expr::Variable(name.to_string()))
    .parse_next(input)
}

fn template(input: &mut &str) -> ModalResult<Expr> {
    let parts: Vec<TemplatePart> =
        delimited('"', repeat(0.., template_part), '"').parse_next(input)?;

    let mut merged: Vec<TemplatePart> = Vec::with_capacity(parts.len());
    for part in parts {
        match (merged.last_mut(), part) {
            (Some(TemplatePart::Text(acc)), TemplatePart::Text(text)) => acc.push_str(&text),
            (_, part) => merged.push(part),
        }
    }

    let all_text = merged.iter().all(|p| matches!(p, TemplatePart::Text(_)));
    Ok(if all_text {
        let text = merged
            .into_iter()
            .map(|p| match p {
                TemplatePart::Text(text) => text,
                TemplatePart::Interpolation(_) => String::new(),
            })
            .collect();
        Expr::Literal(Literal::String(text))
    } else {
        Expr::Template(merged)
    })
}

fn template_part(input: &mut &str) -> ModalResult<TemplatePart> {
    alt((
        "$${".value(TemplatePart::Text("${".to_string())),
        "%%{".value(TemplatePart::Text("%{".to_string())),
        preceded(
            "${",
            cut_err(terminated(
                delimited(whitespace, expression, whitespace),
                '}',
            )),
        )
        .map(TemplatePart::Interpolation),
        // Template directives are outside the subset.
        preceded("%{", cut_err(fail)),
        preceded(
            '\\',
            cut_err(one_of(['n', 't', 'r', '"', '\\'])),
        )
        .map(|c| {
            TemplatePart::Text(
                match c {
                    'n' => '\n',
                    't' => '\t',
                    'r' => '\r',
                    other => other,
                }
                .to_string(),
            )
        }),
        take_while(1.., |c: char| !matches!(c, '"' | '\\' | '\n' | '$' | '%'))
            .map(|s: &str| TemplatePart::Text(s.to_string())),
        one_of(['$', '%']).map(|c: char| TemplatePart::Text(c.to_string())),
    ))
    .parse_next(input)
}

impl Expr {
    /// Evaluate against `values`, keyed by qualified name (`local.x`).
    pub fn evaluate(&self, values: &BTreeMap<String, Literal>) -> Evaluation {
        match self {
            Expr::Literal(literal) => Evaluation::Known(literal.clone()),
            Expr::Variable(name) => match values.get(name) {
                Some(literal) => Evaluation::Known(literal.clone()),
                None => Evaluation::Unresolved(BTreeSet::from([name.clone()])),
            },
            Expr::Template(parts) => {
                let mut text = String::new();
                let mut missing = BTreeSet::new();
                for part in parts {
                    match part {
                        TemplatePart::Text(s) => text.push_str(s),
                        TemplatePart::Interpolation(expr) => match expr.evaluate(values) {
                            Evaluation::Known(literal) => text.push_str(&literal.to_string()),
                            Evaluation::Unresolved(names) => missing.extend(names),
                        },
                    }
                }
                if missing.is_empty() {
                    Evaluation::Known(Literal::String(text))
                } else {
                    Evaluation::Unresolved(missing)
                }
            }
            Expr::Equal(lhs, rhs) | Expr::NotEqual(lhs, rhs) => {
                let negate = matches!(self, Expr::NotEqual(..));
                match (lhs.evaluate(values), rhs.evaluate(values)) {
                    (Evaluation::Known(a), Evaluation::Known(b)) => {
                        Evaluation::Known(Literal::Bool((a == b) != negate))
                    }
                    (a, b) => Evaluation::Unresolved(a.merge(b)),
                }
            }
            Expr::Conditional {
                test,
                then,
                otherwise,
            } => match test.evaluate(values) {
                Evaluation::Known(Literal::Bool(true)) => then.evaluate(values),
                Evaluation::Known(Literal::Bool(false)) => otherwise.evaluate(values),
                Evaluation::Known(_) => Evaluation::Unresolved(BTreeSet::new()),
                Evaluation::Unresolved(missing) => {
                    // Both branches agreeing makes the test irrelevant.
                    match (then.evaluate(values), otherwise.evaluate(values)) {
                        (Evaluation::Known(a), Evaluation::Known(b)) if a == b => {
                            Evaluation::Known(a)
                        }
                        (a, b) => {
                            let mut names = missing;
                            names.extend(a.merge(b));
                            Evaluation::Unresolved(names)
                        }
                    }
                }
            },
        }
    }

    /// Every qualified name the expression mentions.
    pub fn variables(&self) -> BTreeSet<String> {
        let mut names = BTreeSet::new();
        self.collect_variables(&mut names);
        names
    }

    fn collect_variables(&self, names: &mut BTreeSet<String>) {
        match self {
            Expr::Literal(_) => {}
            Expr::Variable(name) => {
                names.insert(name.clone());
            }
            Expr::Template(parts) => {
                for part in parts {
                    if let TemplatePart::Interpolation(expr) = part {
                        expr.collect_variables(names);
                    }
                }
            }
            Expr::Equal(lhs, rhs) | Expr::NotEqual(lhs, rhs) => {
                lhs.collect_variables(names);
                rhs.collect_variables(names);
            }
            Expr::Conditional {
                test,
                then,
                otherwise,
            } => {
                test.collect_variables(names);
                then.collect_variables(names);
                otherwise.collect_variables(names);
            }
        }
    }

    /// Short human-readable form of the condition an expression depends on.
    ///
    /// For a ternary this is its test; qualifiers are dropped, so
    /// `var.enable_bastion ? 1 : 0` reads `enable_bastion`.
    pub fn condition_label(&self) -> String {
        let test = match self {
            Expr::Conditional { test, .. } => test.as_ref(),
            other => other,
        };
        test.to_string()
            .replace("local.", "")
            .replace("var.", "")
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Literal(literal) => write!(f, "{}", literal.to_source()),
            Expr::Variable(name) => write!(f, "{name}"),
            Expr::Template(parts) => {
                write!(f, "\"")?;
                for part in parts {
                    match part {
                        TemplatePart::Text(text) => {
                            let quoted = Literal::String(text.clone()).to_source();
                            write!(f, "{}", &quoted[1..quoted.len() - 1])?;
                        }
                        TemplatePart::Interpolation(expr) => write!(f, "${{{expr}}}")?,
                    }
                }
                write!(f, "\"")
            }
            Expr::Equal(lhs, rhs) => write!(f, "{lhs} == {rhs}"),
            Expr::NotEqual(lhs, rhs) => write!(f, "{lhs} != {rhs}"),
            Expr::Conditional {
                test,
                then,
                otherwise,
            } => write!(f, "{test} ? {then} : {otherwise}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn values(pairs: &[(&str, Literal)]) -> BTreeMap<String, Literal> {
        pairs
            .iter()
            .map(|(name, literal)| (name.to_string(), literal.clone()))
            .collect()
    }

    #[test]
    fn test_parses_literals() {
        assert_eq!(parse("42"), Some(Expr::Literal(Literal::Number(42.0))));
        assert_eq!(parse("-1.5"), Some(Expr::Literal(Literal::Number(-1.5))));
        assert_eq!(parse("true"), Some(Expr::Literal(Literal::Bool(true))));
        assert_eq!(
            parse(r#""t3.micro""#),
            Some(Expr::Literal(Literal::String("t3.micro".to_string())))
        );
    }

    #[test]
    fn test_rejects_expressions_outside_the_subset() {
        for text in [
            "length(var.subnets)",
            "var.a + 1",
            "var.a && var.b",
            "[1, 2]",
            "{}",
            "aws_instance.web.id",
            "var.list[0]",
            "local.map.key",
            r#""%{ if var.x }y%{ endif }""#,
            r#""${upper(var.name)}""#,
            "truex",
        ] {
            assert_eq!(parse(text), None, "{text}");
        }
    }

    #[test]
    fn test_ternary_over_variable() {
        let expr = parse(r#"var.environment == "prod" ? 1 : 0"#).unwrap();
        assert_eq!(expr.variables(), BTreeSet::from(["var.environment".to_string()]));

        let prod = values(&[("var.environment", Literal::String("prod".into()))]);
        assert_eq!(expr.evaluate(&prod), Evaluation::Known(Literal::Number(1.0)));

        let dev = values(&[("var.environment", Literal::String("dev".into()))]);
        assert_eq!(expr.evaluate(&dev), Evaluation::Known(Literal::Number(0.0)));

        assert_eq!(
            expr.evaluate(&BTreeMap::new()),
            Evaluation::Unresolved(BTreeSet::from(["var.environment".to_string()]))
        );
    }

    #[test]
    fn test_equality_is_strict_across_types() {
        let expr = parse(r#"local.count == "1""#).unwrap();
        let env = values(&[("local.count", Literal::Number(1.0))]);
        assert_eq!(expr.evaluate(&env), Evaluation::Known(Literal::Bool(false)));
    }

    #[test]
    fn test_non_boolean_test_is_unresolved() {
        let expr = parse(r#""yes" ? 1 : 0"#).unwrap();
        assert_eq!(expr.evaluate(&BTreeMap::new()), Evaluation::Unresolved(BTreeSet::new()));
    }

    #[test]
    fn test_template_interpolation() {
        let expr = parse(r#""${local.prefix}-allocator""#).unwrap();
        let env = values(&[("local.prefix", Literal::String("arena".into()))]);
        assert_eq!(
            expr.evaluate(&env),
            Evaluation::Known(Literal::String("arena-allocator".into()))
        );
        assert_eq!(expr.to_string(), r#""${local.prefix}-allocator""#);
    }

    #[test]
    fn test_escaped_template_introducer_is_text() {
        assert_eq!(
            parse(r#""$${literal}""#),
            Some(Expr::Literal(Literal::String("${literal}".into())))
        );
    }

    #[test]
    fn test_condition_label() {
        let expr = parse("var.enable_bastion ? 1 : 0").unwrap();
        assert_eq!(expr.condition_label(), "enable_bastion");

        let expr = parse(r#"(local.env != "dev") ? 1 : 0"#).unwrap();
        assert_eq!(expr.condition_label(), r#"env != "dev""#);
    }

    fn literal_strategy() -> impl Strategy<Value = Literal> {
        prop_oneof![
            any::<bool>().prop_map(Literal::Bool),
            (-1000i32..1000).prop_map(|n| Literal::Number(f64::from(n))),
            "[ -~]{0,12}".prop_map(Literal::String),
        ]
    }

    proptest! {
        #[test]
        fn prop_literal_source_parses_back(literal in literal_strategy()) {
            let parsed = parse(&literal.to_source());
            prop_assert_eq!(parsed, Some(Expr::Literal(literal)));
        }

        #[test]
        fn prop_display_parses_back_to_same_expression(
            test in literal_strategy(),
            then in literal_strategy(),
            otherwise in literal_strategy(),
        ) {
            let expr = Expr::Conditional {
                test: Box::new(Expr::Equal(
                    Box::new(Expr::Variable("var.x".into())),
                    Box::new(Expr::Literal(test)),
                )),
                then: Box::new(Expr::Literal(then)),
                otherwise: Box::new(Expr::Literal(otherwise)),
            };
            prop_assert_eq!(parse(&expr.to_string()), Some(expr));
        }
    }
}
