//! Keyspace partitions
//!
//! Every key lives in exactly one partition: the public world state of a
//! namespace, or one restricted collection inside that namespace. The
//! encoded form (`vehicle` or `vehicle$CollectionOrder`) is what the frame
//! log persists.

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;

const COLLECTION_SEPARATOR: char = '$';

/// Returns true if `name` may be used as a namespace or collection name.
///
/// Names start with an alphanumeric character and contain only
/// alphanumerics, `_`, `.` and `-`.
pub fn is_valid_name(name: &str) -> bool {
    static NAME: OnceLock<Option<Regex>> = OnceLock::new();
    NAME.get_or_init(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9_.\-]*$").ok())
        .as_ref()
        .map_or(false, |re| re.is_match(name))
}

/// A public namespace or one of its restricted collections.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Partition {
    namespace: String,
    collection: Option<String>,
}

impl Partition {
    /// The public world state of a namespace
    pub fn public(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            collection: None,
        }
    }

    /// A restricted collection inside a namespace
    pub fn collection(namespace: impl Into<String>, collection: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            collection: Some(collection.into()),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn is_restricted(&self) -> bool {
        self.collection.is_some()
    }

    /// Encoded form persisted in commit frames
    pub fn encode(&self) -> String {
        match &self.collection {
            Some(collection) => format!("{}{}{}", self.namespace, COLLECTION_SEPARATOR, collection),
            None => self.namespace.clone(),
        }
    }

    /// Inverse of [`Partition::encode`]
    pub fn decode(encoded: &str) -> Self {
        match encoded.split_once(COLLECTION_SEPARATOR) {
            Some((namespace, collection)) => Self::collection(namespace, collection),
            None => Self::public(encoded),
        }
    }
}

impl fmt::Display for Partition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.encode())
    }
}
