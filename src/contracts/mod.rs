//! Asset lifecycle contracts
//!
//! Each contract names a namespace and dispatches function names to
//! handlers over a [`TxContext`]. Handlers authorize first, then check
//! existence, then read and buffer writes.

mod batch;
mod order;
mod vehicle;

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ledger::{LedgerError, LedgerResult, TxContext};
use crate::query::QueryMatch;
use crate::storage::{HistoryIter, Versioned};

pub use batch::{BatchStatus, PrivateDetails, RiceBatch, RiceContract};
pub use order::{Order, OrderContract};
pub(crate) use order::ORDER_ASSET_TYPE;
pub use vehicle::{Car, CarContract, VehicleStatus};

/// Namespace shared by the vehicle and order contracts
pub const VEHICLE_NAMESPACE: &str = "vehicle";
/// Namespace of the batch contract
pub const BATCH_NAMESPACE: &str = "batch";
/// Restricted collection holding dealer orders
pub const ORDER_COLLECTION: &str = "CollectionOrder";
/// Restricted collection holding batch pricing details
pub const BATCH_PRIVATE_COLLECTION: &str = "ricePrivateData";

/// A named set of operations over one namespace
pub trait Contract: Send + Sync {
    fn name(&self) -> &'static str;

    fn namespace(&self) -> &'static str;

    /// Function names accepted by [`Contract::invoke`]
    fn functions(&self) -> &'static [&'static str];

    fn invoke(&self, ctx: &mut TxContext<'_>, function: &str, args: &[String]) -> LedgerResult<Value>;
}

/// Contracts by name
pub struct ContractRegistry {
    contracts: BTreeMap<&'static str, Box<dyn Contract>>,
}

impl ContractRegistry {
    pub fn empty() -> Self {
        Self {
            contracts: BTreeMap::new(),
        }
    }

    pub fn register(mut self, contract: impl Contract + 'static) -> Self {
        self.contracts.insert(contract.name(), Box::new(contract));
        self
    }

    pub fn get(&self, name: &str) -> LedgerResult<&dyn Contract> {
        self.contracts
            .get(name)
            .map(|c| c.as_ref())
            .ok_or_else(|| LedgerError::invalid_argument(format!("unknown contract: {}", name)))
    }
}

impl Default for ContractRegistry {
    /// Vehicle, order and batch contracts.
    fn default() -> Self {
        Self::empty()
            .register(CarContract)
            .register(OrderContract)
            .register(RiceContract)
    }
}

/// Checks the argument count and borrows the arguments as `&str`.
pub(crate) fn expect_args<'s, const N: usize>(function: &str, args: &'s [String]) -> LedgerResult<[&'s str; N]> {
    let borrowed: Vec<&str> = args.iter().map(String::as_str).collect();
    borrowed.try_into().map_err(|got: Vec<&str>| {
        LedgerError::invalid_argument(format!(
            "{} expects {} argument(s), got {}",
            function,
            N,
            got.len()
        ))
    })
}

pub(crate) fn unknown_function(contract: &str, function: &str) -> LedgerError {
    LedgerError::invalid_argument(format!("{} has no function {}", contract, function))
}

pub(crate) fn to_payload<T: Serialize>(value: &T) -> LedgerResult<Value> {
    serde_json::to_value(value).map_err(|e| LedgerError::invalid_argument(format!("cannot encode result: {}", e)))
}

/// Semantic check applied to a decoded value, given its ledger key
pub(crate) type Validator<T> = fn(T, &str) -> LedgerResult<T>;

/// Decodes and validates query matches, failing on the first malformed value.
pub(crate) fn decode_matches<T, I>(what: &str, matches: I, validate: Validator<T>) -> LedgerResult<Vec<T>>
where
    T: DeserializeOwned,
    I: Iterator<Item = crate::query::QueryResult<QueryMatch>>,
{
    matches
        .map(|item| {
            let m = item?;
            let value = serde_json::from_value(m.value).map_err(|e| LedgerError::malformed(what, &m.key, e))?;
            validate(value, &m.key)
        })
        .collect()
}

/// Decodes and validates a range scan, failing on the first malformed value.
pub(crate) fn decode_range<T, I>(what: &str, entries: I, validate: Validator<T>) -> LedgerResult<Vec<T>>
where
    T: DeserializeOwned,
    I: Iterator<Item = crate::storage::StoreResult<(String, Versioned)>>,
{
    entries
        .map(|item| {
            let (key, versioned) = item?;
            validate(crate::ledger::decode(what, &key, &versioned.value)?, &key)
        })
        .collect()
}

/// One entry of a key's history as returned to callers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryRecord<T> {
    /// Value snapshot, `null` for a delete
    pub record: Option<T>,
    pub tx_id: String,
    /// RFC 1123, e.g. `Mon, 01 Jan 2024 00:00:00 GMT`
    pub timestamp: String,
    pub is_delete: bool,
}

pub fn format_rfc1123(ts: DateTime<Utc>) -> String {
    ts.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

/// Drains a history iterator into caller-facing records.
pub(crate) fn collect_history<T: DeserializeOwned>(
    what: &str,
    history: HistoryIter<'_>,
    validate: Validator<T>,
) -> LedgerResult<Vec<HistoryRecord<T>>> {
    history
        .map(|item| {
            let entry = item?;
            let record = entry
                .value
                .as_deref()
                .map(|bytes| validate(crate::ledger::decode(what, &entry.key, bytes)?, &entry.key))
                .transpose()?;
            Ok(HistoryRecord {
                is_delete: record.is_none(),
                record,
                tx_id: entry.tx_id,
                timestamp: format_rfc1123(entry.timestamp),
            })
        })
        .collect()
}

/// UTF-8 transient input, required
pub(crate) fn transient_str(ctx: &TxContext<'_>, key: &str) -> LedgerResult<String> {
    let bytes = ctx
        .transient(key)
        .ok_or_else(|| LedgerError::invalid_argument(format!("{} key not found in transient map", key)))?;
    String::from_utf8(bytes.to_vec())
        .map_err(|_| LedgerError::invalid_argument(format!("transient value {} is not UTF-8", key)))
}
