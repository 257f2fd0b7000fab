//! Per-operation transaction context
//!
//! Everything a contract may do goes through `TxContext`: reads see the
//! committed state at operation start, writes are buffered in the unit of
//! work, and restricted collections are gated before any access.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::errors::{LedgerError, LedgerResult};
use crate::access::{AccessGate, Action, AssetKind, Credential};
use crate::query::{QueryEngine, QueryResults, Selector};
use crate::storage::{HistoryIter, Partition, RangeIter, StateStore, UnitOfWork};

/// Execution context handed to a contract for one operation
pub struct TxContext<'a> {
    store: &'a StateStore,
    gate: &'a dyn AccessGate,
    credential: &'a Credential,
    namespace: &'a str,
    tx_id: &'a str,
    timestamp: DateTime<Utc>,
    transient: &'a BTreeMap<String, Vec<u8>>,
    unit: UnitOfWork,
}

impl<'a> TxContext<'a> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        store: &'a StateStore,
        gate: &'a dyn AccessGate,
        credential: &'a Credential,
        namespace: &'a str,
        tx_id: &'a str,
        timestamp: DateTime<Utc>,
        transient: &'a BTreeMap<String, Vec<u8>>,
    ) -> Self {
        Self {
            store,
            gate,
            credential,
            namespace,
            tx_id,
            timestamp,
            transient,
            unit: UnitOfWork::new(),
        }
    }

    pub fn credential(&self) -> &Credential {
        self.credential
    }

    pub fn tx_id(&self) -> &str {
        self.tx_id
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Transient input by name. Never written anywhere by the context itself.
    pub fn transient(&self, key: &str) -> Option<&[u8]> {
        self.transient.get(key).map(Vec::as_slice)
    }

    /// Buffered writes so far
    pub fn unit(&self) -> &UnitOfWork {
        &self.unit
    }

    pub fn into_unit(self) -> UnitOfWork {
        self.unit
    }

    /// Policy check for the caller. Run before any existence check.
    pub fn require(&self, asset: AssetKind, action: Action) -> LedgerResult<()> {
        Ok(self.gate.require(self.credential, asset, action)?)
    }

    fn public(&self) -> Partition {
        Partition::public(self.namespace)
    }

    fn restricted(&self, collection: &str) -> LedgerResult<Partition> {
        self.gate.require_collection(self.credential, collection)?;
        Ok(Partition::collection(self.namespace, collection))
    }

    // ---- Public state ----

    /// Committed value of a key; records the observed version.
    pub fn get_state(&mut self, key: &str) -> LedgerResult<Option<Vec<u8>>> {
        let partition = self.public();
        self.read(&partition, key)
    }

    pub fn put_state(&mut self, key: &str, value: Vec<u8>) -> LedgerResult<()> {
        check_key(key)?;
        let partition = self.public();
        self.unit.put(&partition, key, value);
        Ok(())
    }

    pub fn del_state(&mut self, key: &str) -> LedgerResult<()> {
        check_key(key)?;
        let partition = self.public();
        self.unit.delete(&partition, key);
        Ok(())
    }

    pub fn state_exists(&mut self, key: &str) -> LedgerResult<bool> {
        Ok(self.get_state(key)?.is_some())
    }

    /// Live keys in `[start, end)`; an empty `end` is unbounded.
    pub fn state_by_range(&self, start: &str, end: &str) -> LedgerResult<RangeIter<'a>> {
        Ok(self.store.range(&self.public(), start, end)?)
    }

    /// Oldest-first history of a key, tombstones included.
    pub fn history_for_key(&self, key: &str) -> LedgerResult<HistoryIter<'a>> {
        check_key(key)?;
        Ok(self.store.history(&self.public(), key)?)
    }

    pub fn query(&self, selector: &Selector) -> LedgerResult<QueryResults<'a>> {
        Ok(QueryEngine::execute(self.store, &self.public(), selector)?)
    }

    // ---- Restricted collections ----

    pub fn get_private(&mut self, collection: &str, key: &str) -> LedgerResult<Option<Vec<u8>>> {
        let partition = self.restricted(collection)?;
        self.read(&partition, key)
    }

    pub fn put_private(&mut self, collection: &str, key: &str, value: Vec<u8>) -> LedgerResult<()> {
        let partition = self.restricted(collection)?;
        check_key(key)?;
        self.unit.put(&partition, key, value);
        Ok(())
    }

    pub fn del_private(&mut self, collection: &str, key: &str) -> LedgerResult<()> {
        let partition = self.restricted(collection)?;
        check_key(key)?;
        self.unit.delete(&partition, key);
        Ok(())
    }

    pub fn private_by_range(&self, collection: &str, start: &str, end: &str) -> LedgerResult<RangeIter<'a>> {
        let partition = self.restricted(collection)?;
        Ok(self.store.range(&partition, start, end)?)
    }

    pub fn private_query(&self, collection: &str, selector: &Selector) -> LedgerResult<QueryResults<'a>> {
        let partition = self.restricted(collection)?;
        Ok(QueryEngine::execute(self.store, &partition, selector)?)
    }

    fn read(&mut self, partition: &Partition, key: &str) -> LedgerResult<Option<Vec<u8>>> {
        check_key(key)?;
        let value = self.store.get(partition, key)?;
        self.unit.record_read(partition, key, self.store.version_of(partition, key));
        Ok(value.map(|v| v.value))
    }

    // ---- Typed helpers ----

    /// Reads and decodes a public value; decode failure is `MalformedData`.
    pub fn get_json<T: DeserializeOwned>(&mut self, what: &str, key: &str) -> LedgerResult<Option<T>> {
        self.get_state(key)?
            .map(|bytes| decode(what, key, &bytes))
            .transpose()
    }

    pub fn put_json<T: Serialize>(&mut self, key: &str, value: &T) -> LedgerResult<()> {
        let bytes = encode(key, value)?;
        self.put_state(key, bytes)
    }

    pub fn get_private_json<T: DeserializeOwned>(
        &mut self,
        collection: &str,
        what: &str,
        key: &str,
    ) -> LedgerResult<Option<T>> {
        self.get_private(collection, key)?
            .map(|bytes| decode(what, key, &bytes))
            .transpose()
    }

    pub fn put_private_json<T: Serialize>(&mut self, collection: &str, key: &str, value: &T) -> LedgerResult<()> {
        let bytes = encode(key, value)?;
        self.put_private(collection, key, bytes)
    }
}

fn check_key(key: &str) -> LedgerResult<()> {
    if key.is_empty() {
        return Err(LedgerError::invalid_argument("key must not be empty"));
    }
    Ok(())
}

/// Decodes a stored value, mapping any failure to `MalformedData`.
pub fn decode<T: DeserializeOwned>(what: &str, key: &str, bytes: &[u8]) -> LedgerResult<T> {
    serde_json::from_slice(bytes).map_err(|e| LedgerError::malformed(what, key, e))
}

fn encode<T: Serialize>(key: &str, value: &T) -> LedgerResult<Vec<u8>> {
    serde_json::to_vec(value)
        .map_err(|e| LedgerError::invalid_argument(format!("cannot encode value for {}: {}", key, e)))
}
