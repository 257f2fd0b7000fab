//! Query execution over one partition
//!
//! Execution is a full scan over the ordered key index. Values that are not
//! JSON never match. Without a sort, matches stream lazily in key order;
//! with a sort, matches are collected, sorted, then yielded.

use serde_json::Value;

use super::errors::QueryResult;
use super::filter::PredicateFilter;
use super::selector::{Predicate, Selector};
use super::sorter::ResultSorter;
use crate::storage::{Partition, RangeIter, StateStore};

/// One live value that satisfied the selector
#[derive(Debug, Clone, PartialEq)]
pub struct QueryMatch {
    pub key: String,
    pub value: Value,
    pub version: u64,
}

/// Executes selectors against the state store
pub struct QueryEngine;

impl QueryEngine {
    /// Runs a selector over every live value in a partition.
    ///
    /// An empty result is not an error.
    pub fn execute<'a>(
        store: &'a StateStore,
        partition: &Partition,
        selector: &Selector,
    ) -> QueryResult<QueryResults<'a>> {
        let scan = Scan {
            source: store.scan(partition)?,
            predicates: selector.predicates.clone(),
        };

        let state = if selector.sort.is_empty() {
            ResultsState::Streaming(scan)
        } else {
            let mut matches = scan.collect::<QueryResult<Vec<_>>>()?;
            ResultSorter::sort(&mut matches, &selector.sort);
            ResultsState::Buffered(matches.into_iter())
        };

        Ok(QueryResults {
            state,
            remaining: selector.limit,
        })
    }
}

/// Filtering pass over a range scan.
struct Scan<'a> {
    source: RangeIter<'a>,
    predicates: Vec<Predicate>,
}

impl Iterator for Scan<'_> {
    type Item = QueryResult<QueryMatch>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let (key, versioned) = match self.source.next()? {
                Ok(item) => item,
                Err(e) => return Some(Err(e.into())),
            };

            let value: Value = match serde_json::from_slice(&versioned.value) {
                Ok(value) => value,
                Err(_) => continue,
            };

            if PredicateFilter::matches(&value, &self.predicates) {
                return Some(Ok(QueryMatch {
                    key,
                    value,
                    version: versioned.version,
                }));
            }
        }
    }
}

enum ResultsState<'a> {
    Streaming(Scan<'a>),
    Buffered(std::vec::IntoIter<QueryMatch>),
}

/// Lazy, finite, non-restartable query result sequence.
///
/// Holds the scan's reader handle until dropped.
pub struct QueryResults<'a> {
    state: ResultsState<'a>,
    remaining: Option<usize>,
}

impl Iterator for QueryResults<'_> {
    type Item = QueryResult<QueryMatch>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == Some(0) {
            return None;
        }

        let item = match &mut self.state {
            ResultsState::Streaming(scan) => scan.next()?,
            ResultsState::Buffered(buffer) => Ok(buffer.next()?),
        };

        if let Some(remaining) = self.remaining.as_mut() {
            *remaining -= 1;
        }
        if item.is_err() {
            self.remaining = Some(0);
        }
        Some(item)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{FilterOp, SortSpec};
    use crate::storage::{MemoryMedium, UnitOfWork};
    use chrono::Utc;
    use serde_json::json;

    fn seeded() -> (StateStore, Partition) {
        let mut store = StateStore::open(Box::new(MemoryMedium::new())).unwrap();
        let batch = Partition::public("batch");

        let mut unit = UnitOfWork::new();
        for (key, location, quantity) in [
            ("B3", "Kuttanad", 300),
            ("B1", "Kuttanad", 100),
            ("B2", "Palakkad", 200),
            ("B4", "Kuttanad", 50),
        ] {
            let value = json!({"batchID": key, "location": location, "quantity": quantity});
            unit.put(&batch, key, serde_json::to_vec(&value).unwrap());
        }
        unit.put(&batch, "raw", b"not json".to_vec());
        store.commit(unit, "tx-seed", Utc::now()).unwrap();
        (store, batch)
    }

    fn keys(results: QueryResults<'_>) -> Vec<String> {
        results.map(|m| m.unwrap().key).collect()
    }

    #[test]
    fn test_unsorted_results_in_key_order() {
        let (store, batch) = seeded();
        let selector = Selector::all().filter_eq("location", "Kuttanad");
        let results = QueryEngine::execute(&store, &batch, &selector).unwrap();
        assert_eq!(keys(results), vec!["B1", "B3", "B4"]);
    }

    #[test]
    fn test_sorted_results() {
        let (store, batch) = seeded();
        let selector = Selector::all().with_sort(SortSpec::desc("quantity"));
        let results = QueryEngine::execute(&store, &batch, &selector).unwrap();
        assert_eq!(keys(results), vec!["B3", "B2", "B1", "B4"]);
    }

    #[test]
    fn test_limit_applies_after_sort() {
        let (store, batch) = seeded();
        let selector = Selector::all()
            .with_predicate(Predicate::new("quantity", FilterOp::Gte(json!(100))))
            .with_sort(SortSpec::asc("quantity"))
            .with_limit(2);
        let results = QueryEngine::execute(&store, &batch, &selector).unwrap();
        assert_eq!(keys(results), vec!["B1", "B2"]);
    }

    #[test]
    fn test_non_json_values_never_match() {
        let (store, batch) = seeded();
        let results = QueryEngine::execute(&store, &batch, &Selector::all()).unwrap();
        assert!(!keys(results).contains(&"raw".to_string()));
    }

    #[test]
    fn test_no_match_is_empty_not_error() {
        let (store, batch) = seeded();
        let selector = Selector::all().filter_eq("location", "Nowhere");
        assert_eq!(QueryEngine::execute(&store, &batch, &selector).unwrap().count(), 0);

        let empty = Partition::public("vehicle");
        assert_eq!(QueryEngine::execute(&store, &empty, &Selector::all()).unwrap().count(), 0);
    }

    #[test]
    fn test_every_result_satisfies_selector() {
        let (store, batch) = seeded();
        let selector = Selector::parse(r#"{"selector":{"quantity":{"$lt":250},"location":{"$ne":"Palakkad"}}}"#).unwrap();
        for item in QueryEngine::execute(&store, &batch, &selector).unwrap() {
            let m = item.unwrap();
            assert!(PredicateFilter::matches(&m.value, &selector.predicates));
        }
    }
}
