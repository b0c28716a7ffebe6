//! Filter expressions for the `-f` command
//!
//! A filter is made of `field="value"` equality predicates joined by ` AND `
//! and ` OR `, with one level of parentheses. Operators do not have
//! conventional precedence: at each level the operator that occurs first in
//! the text splits the expression, the left side is a predicate (or the
//! preceding group) and the right side is parsed again the same way. So
//! `a AND b OR c` means `a AND (b OR c)` and `a OR b AND c` means
//! `a OR (b AND c)`.
//!
//! A group ends at the first `)` after its `(`, so groups cannot nest.
//! Operator and parenthesis scanning skips text inside double quotes.

use crate::core::errors::{Result, StoreError};
use crate::core::record::Record;

const OR: &str = " OR ";
const AND: &str = " AND ";

/// A compiled filter expression
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    /// `field="value"`: exact string equality
    Equals { field: String, value: String },
    And(Box<Filter>, Box<Filter>),
    Or(Box<Filter>, Box<Filter>),
}

impl Filter {
    /// Compile a filter expression
    pub fn parse(expression: &str) -> Result<Filter> {
        if expression.trim().is_empty() {
            return Err(StoreError::MalformedFilter("empty filter expression".to_string()));
        }
        parse_chain(expression)
    }

    /// Evaluate the filter against a record
    pub fn evaluate(&self, record: &Record) -> Result<bool> {
        match self {
            Filter::Equals { field, value } => Ok(record.get_field(field)? == value),
            Filter::And(lhs, rhs) => Ok(lhs.evaluate(record)? && rhs.evaluate(record)?),
            Filter::Or(lhs, rhs) => Ok(lhs.evaluate(record)? || rhs.evaluate(record)?),
        }
    }

    /// Every field referenced by the filter, left to right
    pub fn fields(&self) -> Vec<&str> {
        match self {
            Filter::Equals { field, .. } => vec![field.as_str()],
            Filter::And(lhs, rhs) | Filter::Or(lhs, rhs) => {
                let mut fields = lhs.fields();
                fields.extend(rhs.fields());
                fields
            },
        }
    }
}

/// Parse `expression` and evaluate it against `record`
pub fn evaluate(record: &Record, expression: &str) -> Result<bool> {
    Filter::parse(expression)?.evaluate(record)
}

fn parse_chain(expression: &str) -> Result<Filter> {
    let expression = expression.trim_start();

    let (group, rest) = if let Some(body) = expression.strip_prefix('(') {
        let close = find_unquoted(body, ")").ok_or_else(|| {
            StoreError::MalformedFilter(format!("unbalanced parenthesis in '{}'", expression))
        })?;
        (Some(parse_chain(&body[..close])?), &body[close + 1..])
    } else {
        (None, expression)
    };

    let operator = next_operator(rest);
    let (lhs_text, tail) = match operator {
        Some((position, token)) => (&rest[..position], Some((token, &rest[position + token.len()..]))),
        None => (rest, None),
    };

    let lhs = match group {
        Some(group) if lhs_text.trim().is_empty() => group,
        Some(_) => {
            return Err(StoreError::MalformedFilter(format!(
                "unexpected '{}' after parenthesised group",
                lhs_text.trim()
            )))
        },
        None => parse_predicate(lhs_text)?,
    };

    match tail {
        Some((OR, rhs)) => Ok(Filter::Or(Box::new(lhs), Box::new(parse_chain(rhs)?))),
        Some((_, rhs)) => Ok(Filter::And(Box::new(lhs), Box::new(parse_chain(rhs)?))),
        None => Ok(lhs),
    }
}

/// Parse a single `field="value"` predicate
fn parse_predicate(text: &str) -> Result<Filter> {
    let (field, value) = text.split_once('=').ok_or_else(|| {
        StoreError::MalformedFilter(format!("expected field=\"value\", got '{}'", text.trim()))
    })?;

    let field = field.trim();
    if field.is_empty() {
        return Err(StoreError::MalformedFilter(format!("missing field name in '{}'", text.trim())));
    }

    let value = value.trim();
    let literal = value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .filter(|v| !v.contains('"'))
        .ok_or_else(|| {
            StoreError::MalformedFilter(format!("value for {} must be one double-quoted literal, got {}", field, value))
        })?;

    Ok(Filter::Equals {
        field: field.to_string(),
        value: literal.to_string(),
    })
}

/// The earliest ` OR ` or ` AND ` outside quotes
fn next_operator(text: &str) -> Option<(usize, &'static str)> {
    match (find_unquoted(text, OR), find_unquoted(text, AND)) {
        (Some(or), Some(and)) if and < or => Some((and, AND)),
        (Some(or), _) => Some((or, OR)),
        (None, Some(and)) => Some((and, AND)),
        (None, None) => None,
    }
}

/// Byte offset of the first `pattern` that is not inside double quotes
fn find_unquoted(text: &str, pattern: &str) -> Option<usize> {
    let mut quoted = false;
    for (i, c) in text.char_indices() {
        if c == '"' {
            quoted = !quoted;
        } else if !quoted && text[i..].starts_with(pattern) {
            return Some(i);
        }
    }
    None
}
