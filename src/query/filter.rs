//! Predicate filtering for selector queries
//!
//! No type coercion: a string never equals a number, and ordering
//! comparisons only apply between two numbers or two strings.
//! A missing field matches nothing except `$exists: false`.

use std::cmp::Ordering;

use serde_json::Value;

use super::selector::{FilterOp, Predicate};

/// Resolves a dotted path inside a document.
pub fn lookup<'a>(document: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(document, |current, segment| current.get(segment))
}

/// Evaluates predicates against documents
pub struct PredicateFilter;

impl PredicateFilter {
    /// Checks if a document matches all predicates (AND semantics)
    pub fn matches(document: &Value, predicates: &[Predicate]) -> bool {
        predicates
            .iter()
            .all(|pred| Self::matches_predicate(document, pred))
    }

    fn matches_predicate(document: &Value, predicate: &Predicate) -> bool {
        let field_value = lookup(document, &predicate.field);

        if let FilterOp::Exists(expected) = predicate.op {
            return field_value.is_some() == expected;
        }

        let actual = match field_value {
            Some(v) => v,
            None => return false,
        };

        match &predicate.op {
            FilterOp::Eq(expected) => Self::equals(actual, expected),
            FilterOp::Ne(expected) => !Self::equals(actual, expected),
            FilterOp::In(candidates) => candidates.iter().any(|c| Self::equals(actual, c)),
            FilterOp::Gt(bound) => Self::compare(actual, bound) == Some(Ordering::Greater),
            FilterOp::Gte(bound) => matches!(
                Self::compare(actual, bound),
                Some(Ordering::Greater | Ordering::Equal)
            ),
            FilterOp::Lt(bound) => Self::compare(actual, bound) == Some(Ordering::Less),
            FilterOp::Lte(bound) => matches!(
                Self::compare(actual, bound),
                Some(Ordering::Less | Ordering::Equal)
            ),
            FilterOp::Exists(_) => false,
        }
    }

    /// Numbers compare by value, so `500` equals `500.0`; everything else
    /// uses JSON equality.
    fn equals(actual: &Value, expected: &Value) -> bool {
        match (actual, expected) {
            (Value::Number(_), Value::Number(_)) => Self::compare(actual, expected) == Some(Ordering::Equal),
            _ => actual == expected,
        }
    }

    /// Orders two numbers or two strings; anything else is incomparable.
    fn compare(actual: &Value, bound: &Value) -> Option<Ordering> {
        match (actual, bound) {
            (Value::Number(a), Value::Number(b)) => {
                if let (Some(ai), Some(bi)) = (a.as_i64(), b.as_i64()) {
                    return Some(ai.cmp(&bi));
                }
                a.as_f64()?.partial_cmp(&b.as_f64()?)
            }
            (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }
}
