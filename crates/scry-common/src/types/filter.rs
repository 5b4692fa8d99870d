//! Filter expression tokens
//!
//! A filter expression arrives over the wire as one JSON array mixing the
//! connective strings `"and"` / `"or"` with condition triples
//! `[field, operator, literal]`. The untagged representation lets such an
//! array deserialize directly; anything with no structural role lands in
//! `Other` and is skipped by the evaluator.

use super::record::Value;
use serde::{Deserialize, Serialize};

/// One token of a filter expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Token {
    /// `"and"` / `"or"`; any other bare string is ignored.
    Connective(String),
    /// `[field, operator, literal]`, extra elements ignored.
    Condition(Vec<Value>),
    /// Unrecognized token shape, skipped silently.
    Other(serde_json::Value),
}

impl Token {
    /// Condition shorthand, mainly for tests and host-side callers.
    pub fn cond(field: &str, op: &str, literal: impl Into<Value>) -> Self {
        Token::Condition(vec![field.into(), op.into(), literal.into()])
    }

    pub fn and() -> Self {
        Token::Connective("and".to_string())
    }

    pub fn or() -> Self {
        Token::Connective("or".to_string())
    }
}
