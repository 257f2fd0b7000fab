//! Selector query engine
//!
//! Declarative filter/sort expressions evaluated over the current values
//! of one partition. Read-only.

mod engine;
mod errors;
mod filter;
mod selector;
mod sorter;

pub use engine::{QueryEngine, QueryMatch, QueryResults};
pub use errors::{QueryError, QueryResult};
pub use filter::{lookup, PredicateFilter};
pub use selector::{FilterOp, Predicate, Selector, SortDirection, SortSpec};
pub use sorter::ResultSorter;
