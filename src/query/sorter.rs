//! Result sorting for selector queries
//!
//! Multi-key, deterministic: after every sort key, ties break by
//! ledger key ascending.

use std::cmp::Ordering;

use serde_json::Value;

use super::engine::QueryMatch;
use super::filter::lookup;
use super::selector::{SortDirection, SortSpec};

/// Sorts query matches
pub struct ResultSorter;

impl ResultSorter {
    pub fn sort(matches: &mut [QueryMatch], specs: &[SortSpec]) {
        matches.sort_by(|a, b| {
            for spec in specs {
                let ordering = Self::compare_values(
                    lookup(&a.value, &spec.field),
                    lookup(&b.value, &spec.field),
                );
                let ordering = match spec.direction {
                    SortDirection::Asc => ordering,
                    SortDirection::Desc => ordering.reverse(),
                };
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
            a.key.cmp(&b.key)
        });
    }

    /// Compares two JSON values for sorting.
    ///
    /// Ordering rules:
    /// - missing < null < bool < number < string < array < object
    /// - For same types, natural ordering
    fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
        match (a, b) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Less,
            (Some(_), None) => Ordering::Greater,
            (Some(a_val), Some(b_val)) => {
                let type_order = |v: &Value| -> u8 {
                    match v {
                        Value::Null => 0,
                        Value::Bool(_) => 1,
                        Value::Number(_) => 2,
                        Value::String(_) => 3,
                        Value::Array(_) => 4,
                        Value::Object(_) => 5,
                    }
                };

                let a_type = type_order(a_val);
                let b_type = type_order(b_val);
                if a_type != b_type {
                    return a_type.cmp(&b_type);
                }

                match (a_val, b_val) {
                    (Value::Bool(a_b), Value::Bool(b_b)) => a_b.cmp(b_b),
                    (Value::Number(a_n), Value::Number(b_n)) => {
                        let a_f = a_n.as_f64().unwrap_or(0.0);
                        let b_f = b_n.as_f64().unwrap_or(0.0);
                        a_f.partial_cmp(&b_f).unwrap_or(Ordering::Equal)
                    }
                    (Value::String(a_s), Value::String(b_s)) => a_s.cmp(b_s),
                    // Arrays and objects are not compared
                    _ => Ordering::Equal,
                }
            }
        }
    }
}
