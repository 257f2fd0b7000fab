//! Read-set / write-set for one operation
//!
//! Contract code never writes to the store directly. Reads record the
//! version they observed; writes are buffered here and the whole unit is
//! committed as a single frame by [`super::StateStore::commit`].

use std::collections::BTreeMap;

use super::partition::Partition;
use super::record::WriteEntry;

/// Buffered mutation for one key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PendingWrite {
    Put(Vec<u8>),
    Delete,
}

/// Read set and write set of one operation.
#[derive(Debug, Clone, Default)]
pub struct UnitOfWork {
    reads: BTreeMap<(Partition, String), Option<u64>>,
    writes: BTreeMap<(Partition, String), PendingWrite>,
    order: Vec<(Partition, String)>,
}

impl UnitOfWork {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the version observed for a key. Only the first observation counts.
    pub fn record_read(&mut self, partition: &Partition, key: &str, version: Option<u64>) {
        self.reads
            .entry((partition.clone(), key.to_string()))
            .or_insert(version);
    }

    /// Buffers a value write. A later write to the same key replaces it.
    pub fn put(&mut self, partition: &Partition, key: &str, value: Vec<u8>) {
        self.stage(partition, key, PendingWrite::Put(value));
    }

    /// Buffers a tombstone.
    pub fn delete(&mut self, partition: &Partition, key: &str) {
        self.stage(partition, key, PendingWrite::Delete);
    }

    fn stage(&mut self, partition: &Partition, key: &str, write: PendingWrite) {
        let slot = (partition.clone(), key.to_string());
        if self.writes.insert(slot.clone(), write).is_none() {
            self.order.push(slot);
        }
    }

    /// Observed versions, keyed by partition and key.
    pub fn reads(&self) -> impl Iterator<Item = (&Partition, &str, Option<u64>)> {
        self.reads.iter().map(|((p, k), v)| (p, k.as_str(), *v))
    }

    pub fn is_read_only(&self) -> bool {
        self.writes.is_empty()
    }

    pub fn write_count(&self) -> usize {
        self.writes.len()
    }

    /// Frame entries in first-write order.
    pub fn into_entries(mut self) -> Vec<WriteEntry> {
        let mut entries = Vec::with_capacity(self.order.len());
        for slot in self.order {
            if let Some(write) = self.writes.remove(&slot) {
                let (partition, key) = slot;
                entries.push(match write {
                    PendingWrite::Put(value) => WriteEntry::put(partition.encode(), key, value),
                    PendingWrite::Delete => WriteEntry::tombstone(partition.encode(), key),
                });
            }
        }
        entries
    }
}
