//! Declarative record filter engine
//!
//! Every listing operation funnels its raw collection through [`apply`]
//! before anything is returned to a controller. An expression is a flat
//! token sequence: conditions chain with implicit AND, an `"or"` connective
//! closes the current AND-chain and starts a fresh one over the *original*
//! input, and the result is the insertion-ordered, deduplicated union of all
//! chain survivors.
//!
//! The engine is total: malformed conditions and unknown operators degrade
//! to "admit everything" with a `warn!` diagnostic, never to an error. It is
//! also pure - inputs are never mutated, so concurrent calls need no
//! coordination.
//!
//! Coercion policy (literals usually arrive as strings over the wire):
//! operands that are numeric, or strings that parse fully as numbers,
//! compare by magnitude in f64 - the number model of the transport.
//! Booleans coerce to 0/1. Everything else compares by canonical string
//! representation in code-point order. `Absent` is never numeric, orders
//! below every present value, and equals only `Absent`.

use scry_common::{Record, Token, Value};
use std::cmp::Ordering;
use std::collections::HashSet;
use tracing::warn;

/// Relational and substring operators usable in a condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
    Contains,
    NotContains,
}

impl Op {
    /// Resolve a wire operator tag.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "=" => Some(Op::Eq),
            "!=" => Some(Op::Ne),
            "<" => Some(Op::Lt),
            ">" => Some(Op::Gt),
            "<=" => Some(Op::Le),
            ">=" => Some(Op::Ge),
            ":" => Some(Op::Contains),
            "!:" => Some(Op::NotContains),
            _ => None,
        }
    }

    /// Evaluate the operator over a field value and a literal.
    pub fn eval(&self, a: &Value, b: &Value) -> bool {
        match self {
            Op::Eq => coerced_eq(a, b),
            Op::Ne => !coerced_eq(a, b),
            Op::Lt => compare(a, b) == Ordering::Less,
            Op::Gt => compare(a, b) == Ordering::Greater,
            Op::Le => compare(a, b) != Ordering::Greater,
            Op::Ge => compare(a, b) != Ordering::Less,
            Op::Contains => contains(a, b),
            Op::NotContains => !contains(a, b),
        }
    }
}

/// Numeric view of a value, if it has one.
fn as_number(v: &Value) -> Option<f64> {
    match v {
        Value::Bool(b) => Some(*b as u8 as f64),
        Value::Int(i) => Some(*i as f64),
        Value::UInt(u) => Some(*u as f64),
        Value::Float(x) => Some(*x),
        Value::Str(s) => s.trim().parse().ok(),
        Value::Absent => None,
    }
}

/// Coercive equality: numeric when both sides have a numeric view, string
/// representation otherwise. `Absent` equals only `Absent`.
fn coerced_eq(a: &Value, b: &Value) -> bool {
    if a.is_absent() || b.is_absent() {
        return a.is_absent() && b.is_absent();
    }
    match (as_number(a), as_number(b)) {
        (Some(x), Some(y)) => x == y,
        _ => a.to_string() == b.to_string(),
    }
}

/// Total ordering: `Absent` first, then numeric magnitude when both sides
/// have a numeric view, then code-point order of the string representations.
fn compare(a: &Value, b: &Value) -> Ordering {
    match (a.is_absent(), b.is_absent()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        (false, false) => match (as_number(a), as_number(b)) {
            // NaN never comes out of a record; treat it as equal if it does
            (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
            _ => a.to_string().cmp(&b.to_string()),
        },
    }
}

/// Case-insensitive substring test over string representations.
fn contains(a: &Value, b: &Value) -> bool {
    a.to_string()
        .to_lowercase()
        .contains(&b.to_string().to_lowercase())
}

/// A parsed condition triple.
struct Condition<'a> {
    field: &'a str,
    op: Op,
    literal: &'a Value,
}

impl<'a> Condition<'a> {
    /// Validate a condition token. Extra elements beyond the triple are
    /// ignored; anything else is a reportable malformation.
    fn parse(parts: &'a [Value]) -> Result<Self, &'static str> {
        if parts.len() < 3 {
            return Err("expected [field, operator, literal]");
        }
        let field = match &parts[0] {
            Value::Str(s) => s.as_str(),
            _ => return Err("field name is not a string"),
        };
        let op = match &parts[1] {
            Value::Str(tag) => Op::from_tag(tag).ok_or("unknown operator")?,
            _ => return Err("operator tag is not a string"),
        };
        Ok(Condition {
            field,
            op,
            literal: &parts[2],
        })
    }

    fn matches(&self, record: &Record) -> bool {
        self.op.eval(record.get(self.field), self.literal)
    }
}

/// Move the surviving AND-chain into the accumulator, first-seen order,
/// skipping records already admitted by an earlier chain.
fn flush(block: &[usize], seen: &mut HashSet<usize>, out: &mut Vec<usize>) {
    for &idx in block {
        if seen.insert(idx) {
            out.push(idx);
        }
    }
}

/// Apply a filter expression to a collection of records.
///
/// An absent or empty expression returns a fresh copy of the input. The
/// output order is chain evaluation order and each input record appears at
/// most once, however many OR branches admit it. Deduplication is by input
/// position (identity), not value equality.
pub fn apply(records: &[Record], filter: Option<&[Token]>) -> Vec<Record> {
    let tokens = match filter {
        Some(tokens) if !tokens.is_empty() => tokens,
        _ => return records.to_vec(),
    };

    let full: Vec<usize> = (0..records.len()).collect();
    let mut and_block = full.clone();
    let mut seen: HashSet<usize> = HashSet::with_capacity(records.len());
    let mut out: Vec<usize> = Vec::new();

    for token in tokens {
        match token {
            Token::Connective(word) if word == "or" => {
                flush(&and_block, &mut seen, &mut out);
                // OR branches are independent filters over the whole input
                and_block = full.clone();
            }
            // Explicit "and" is a no-op marker; other bare strings have no
            // structural role
            Token::Connective(_) => {}
            Token::Condition(parts) => match Condition::parse(parts) {
                Ok(cond) => and_block.retain(|&idx| cond.matches(&records[idx])),
                Err(reason) => {
                    warn!(
                        target: "scry_core::filter",
                        reason,
                        condition = ?parts,
                        "Ignoring condition"
                    );
                }
            },
            Token::Other(_) => {}
        }
    }

    flush(&and_block, &mut seen, &mut out);
    out.into_iter().map(|idx| records[idx].clone()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sized(values: &[u64]) -> Vec<Record> {
        values
            .iter()
            .map(|&size| Record::new().field("size", size))
            .collect()
    }

    #[test]
    fn test_no_filter_identity() {
        let records = sized(&[10, 20, 5]);
        assert_eq!(apply(&records, None), records);
        assert_eq!(apply(&records, Some(&[])), records);
    }

    #[test]
    fn test_all_true_condition_is_pass_through() {
        let records = sized(&[10, 20, 5]);
        let expr = vec![Token::cond("size", ">=", 0)];
        assert_eq!(apply(&records, Some(&expr)), records);
    }

    #[test]
    fn test_numeric_ordering() {
        let records = sized(&[10, 20, 5]);
        let expr = vec![Token::cond("size", ">", 8)];
        assert_eq!(apply(&records, Some(&expr)), sized(&[10, 20]));
    }

    #[test]
    fn test_string_literal_coerces_to_number() {
        let records = sized(&[10, 20, 5]);
        let expr = vec![Token::cond("size", "=", "10")];
        assert_eq!(apply(&records, Some(&expr)), sized(&[10]));

        // Lexicographically "5" > "40" but numerically it is smaller
        let expr = vec![Token::cond("size", "<", "40")];
        assert_eq!(apply(&records, Some(&expr)), sized(&[10, 20, 5]));
    }

    #[test]
    fn test_implicit_and_between_conditions() {
        let records = sized(&[10, 20, 5]);
        let expr = vec![Token::cond("size", ">", 8), Token::cond("size", "<", 15)];
        assert_eq!(apply(&records, Some(&expr)), sized(&[10]));
    }

    #[test]
    fn test_explicit_and_is_noop() {
        let records = sized(&[10, 20, 5]);
        let with_and = vec![
            Token::cond("size", ">", 8),
            Token::and(),
            Token::cond("size", "<", 15),
        ];
        let without = vec![Token::cond("size", ">", 8), Token::cond("size", "<", 15)];
        assert_eq!(
            apply(&records, Some(&with_and)),
            apply(&records, Some(&without))
        );
    }

    #[test]
    fn test_and_conjunction_equals_sequential_filtering() {
        let records = sized(&[10, 20, 5, 12]);
        let both = vec![Token::cond("size", ">", 8), Token::cond("size", "<", 15)];
        let first = vec![Token::cond("size", ">", 8)];
        let second = vec![Token::cond("size", "<", 15)];

        let sequential = apply(&apply(&records, Some(&first)), Some(&second));
        assert_eq!(apply(&records, Some(&both)), sequential);
    }

    #[test]
    fn test_or_branches_are_independent() {
        // A narrowing-then-or bug would evaluate the second branch over the
        // first branch's survivors instead of the full input.
        let records = sized(&[10, 20, 5]);
        let expr = vec![
            Token::cond("size", ">", 15),
            Token::or(),
            Token::cond("size", "<", 8),
        ];
        assert_eq!(apply(&records, Some(&expr)), sized(&[20, 5]));
    }

    #[test]
    fn test_or_union_matches_branch_union() {
        let records = sized(&[10, 20, 5, 30]);
        let cond_a = Token::cond("size", ">", 15);
        let cond_b = Token::cond("size", "<", 12);
        let expr = vec![cond_a.clone(), Token::or(), cond_b.clone()];

        let a = apply(&records, Some(&[cond_a]));
        let b = apply(&records, Some(&[cond_b]));
        let mut union = a.clone();
        for rec in b {
            if !union.contains(&rec) {
                union.push(rec);
            }
        }
        assert_eq!(apply(&records, Some(&expr)), union);
    }

    #[test]
    fn test_or_deduplicates_shared_survivors() {
        let records = vec![
            Record::new().field("x", 1).field("y", 2),
            Record::new().field("x", 9).field("y", 9),
        ];
        // Both branches admit the first record
        let expr = vec![
            Token::cond("x", "=", 1),
            Token::or(),
            Token::cond("y", "=", 2),
        ];
        let result = apply(&records, Some(&expr));
        assert_eq!(result, vec![records[0].clone()]);
    }

    #[test]
    fn test_dedup_is_by_identity_not_value() {
        // Two distinct records with equal values both survive
        let records = sized(&[10, 10]);
        let expr = vec![
            Token::cond("size", "=", 10),
            Token::or(),
            Token::cond("size", "=", 10),
        ];
        assert_eq!(apply(&records, Some(&expr)).len(), 2);
    }

    #[test]
    fn test_output_order_is_branch_order() {
        let records = sized(&[10, 20, 5]);
        // Second branch admits an earlier input record than the first branch
        let expr = vec![
            Token::cond("size", "=", 5),
            Token::or(),
            Token::cond("size", "=", 10),
        ];
        assert_eq!(apply(&records, Some(&expr)), sized(&[5, 10]));
    }

    #[test]
    fn test_substring_is_case_insensitive() {
        let records = vec![
            Record::new().field("name", "libFoo.so"),
            Record::new().field("name", "libbar.so"),
        ];
        let expr = vec![Token::cond("name", ":", "foo")];
        assert_eq!(apply(&records, Some(&expr)), vec![records[0].clone()]);

        let expr = vec![Token::cond("name", "!:", "foo")];
        assert_eq!(apply(&records, Some(&expr)), vec![records[1].clone()]);
    }

    #[test]
    fn test_contains_over_numeric_field() {
        let records = sized(&[1024, 2048]);
        let expr = vec![Token::cond("size", ":", "102")];
        assert_eq!(apply(&records, Some(&expr)), sized(&[1024]));
    }

    #[test]
    fn test_unknown_operator_admits_everything() {
        let records = sized(&[10, 20, 5]);
        let expr = vec![Token::cond("name", "??", "x")];
        assert_eq!(apply(&records, Some(&expr)), records);
    }

    #[test]
    fn test_short_condition_admits_everything() {
        let records = sized(&[10, 20]);
        let expr = vec![Token::Condition(vec![
            Value::Str("size".into()),
            Value::Str("=".into()),
        ])];
        assert_eq!(apply(&records, Some(&expr)), records);
    }

    #[test]
    fn test_non_string_field_name_admits_everything() {
        let records = sized(&[10, 20]);
        let expr = vec![Token::Condition(vec![
            Value::Int(1),
            Value::Str("=".into()),
            Value::Int(1),
        ])];
        assert_eq!(apply(&records, Some(&expr)), records);
    }

    #[test]
    fn test_extra_condition_elements_are_ignored() {
        let records = sized(&[10, 20]);
        let expr = vec![Token::Condition(vec![
            Value::Str("size".into()),
            Value::Str("=".into()),
            Value::Int(10),
            Value::Str("junk".into()),
        ])];
        assert_eq!(apply(&records, Some(&expr)), sized(&[10]));
    }

    #[test]
    fn test_unrecognized_tokens_are_skipped() {
        let records = sized(&[10, 20, 5]);
        let expr = vec![
            Token::Other(serde_json::json!(42)),
            Token::cond("size", ">", 8),
            Token::Connective("xor".to_string()),
        ];
        assert_eq!(apply(&records, Some(&expr)), sized(&[10, 20]));
    }

    #[test]
    fn test_trailing_or_flushes_full_input() {
        // An OR with no following condition leaves a fresh unreduced block
        let records = sized(&[10, 20, 5]);
        let expr = vec![Token::cond("size", ">", 15), Token::or()];
        assert_eq!(apply(&records, Some(&expr)), sized(&[20, 10, 5]));
    }

    #[test]
    fn test_absent_field_sorts_below_and_never_equals_present() {
        let records = vec![
            Record::new().field("size", 10).field("name", "a"),
            Record::new().field("name", "b"),
        ];
        let expr = vec![Token::cond("size", "<", 0)];
        assert_eq!(apply(&records, Some(&expr)), vec![records[1].clone()]);

        let expr = vec![Token::cond("size", "=", 10)];
        assert_eq!(apply(&records, Some(&expr)), vec![records[0].clone()]);

        // Absent does not even equal the empty string
        let expr = vec![Token::cond("size", "=", "")];
        assert!(apply(&records, Some(&expr)).is_empty());
    }

    #[test]
    fn test_boolean_coerces_to_numeric() {
        let records = vec![
            Record::new().field("exported", true),
            Record::new().field("exported", false),
        ];
        let expr = vec![Token::cond("exported", "=", 1)];
        assert_eq!(apply(&records, Some(&expr)), vec![records[0].clone()]);
    }

    #[test]
    fn test_lexicographic_fallback_for_non_numeric_strings() {
        let records = vec![
            Record::new().field("name", "alpha"),
            Record::new().field("name", "zeta"),
        ];
        let expr = vec![Token::cond("name", "<", "m")];
        assert_eq!(apply(&records, Some(&expr)), vec![records[0].clone()]);
    }

    #[test]
    fn test_op_from_tag() {
        assert_eq!(Op::from_tag("="), Some(Op::Eq));
        assert_eq!(Op::from_tag("!="), Some(Op::Ne));
        assert_eq!(Op::from_tag("<="), Some(Op::Le));
        assert_eq!(Op::from_tag(">="), Some(Op::Ge));
        assert_eq!(Op::from_tag(":"), Some(Op::Contains));
        assert_eq!(Op::from_tag("!:"), Some(Op::NotContains));
        assert_eq!(Op::from_tag("~"), None);
    }

    #[test]
    fn test_inputs_are_not_mutated() {
        let records = sized(&[10, 20, 5]);
        let snapshot = records.clone();
        let expr = vec![
            Token::cond("size", ">", 8),
            Token::or(),
            Token::cond("size", "<", 8),
        ];
        let _ = apply(&records, Some(&expr));
        assert_eq!(records, snapshot);
    }
}
