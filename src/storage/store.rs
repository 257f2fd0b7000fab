//! Versioned key-value state store
//!
//! The store keeps an in-memory index of key -> (version, frame offset) per
//! partition. Values themselves are read back from the medium on demand,
//! with checksum validation, so a read fails with
//! `LEDGER_STORE_UNAVAILABLE` whenever the medium cannot be reached.
//!
//! The index is rebuilt at open by replaying every frame in order.
//! Frame sequences must be contiguous starting at 1.

use std::collections::{btree_map, BTreeMap, HashMap};
use std::ops::Bound;

use chrono::{DateTime, Utc};

use super::errors::{StoreError, StoreResult};
use super::history::HistoryIter;
use super::medium::Medium;
use super::partition::Partition;
use super::reader::FrameReader;
use super::record::CommitFrame;
use super::unit_of_work::UnitOfWork;

/// Index entry for one key.
#[derive(Debug, Clone)]
struct KeySlot {
    /// Sequence of the last frame that wrote the key
    version: u64,
    /// Offset of that frame
    offset: u64,
    is_tombstone: bool,
    /// Offsets of every frame that wrote the key, oldest first
    history: Vec<u64>,
}

/// A live value together with the sequence of the frame that wrote it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Versioned {
    pub value: Vec<u8>,
    pub version: u64,
}

/// Outcome of a successful commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommitReceipt {
    /// Sequence assigned to the frame, `None` for read-only units
    pub sequence: Option<u64>,
    pub writes: usize,
}

/// The versioned state store.
pub struct StateStore {
    medium: Box<dyn Medium>,
    partitions: HashMap<Partition, BTreeMap<String, KeySlot>>,
    next_sequence: u64,
}

impl StateStore {
    /// Opens the store, rebuilding the index from the medium.
    ///
    /// # Errors
    ///
    /// - `LEDGER_STORE_UNAVAILABLE` if the medium cannot be read
    /// - `LEDGER_DATA_CORRUPTION` on checksum failure or a sequence gap
    pub fn open(medium: Box<dyn Medium>) -> StoreResult<Self> {
        let mut store = Self {
            medium,
            partitions: HashMap::new(),
            next_sequence: 1,
        };

        let mut reader = FrameReader::open(store.medium.as_ref())?;
        loop {
            let offset = reader.current_offset();
            match reader.read_next()? {
                Some(frame) => {
                    if frame.sequence != store.next_sequence {
                        return Err(StoreError::corruption_at_offset(
                            offset,
                            format!(
                                "frame sequence {} does not follow {}",
                                frame.sequence,
                                store.next_sequence - 1
                            ),
                        ));
                    }
                    store.index_frame(&frame, offset);
                }
                None => break,
            }
        }

        Ok(store)
    }

    fn index_frame(&mut self, frame: &CommitFrame, offset: u64) {
        for write in &frame.writes {
            let slot = self
                .partitions
                .entry(Partition::decode(&write.partition))
                .or_default()
                .entry(write.key.clone())
                .or_insert_with(|| KeySlot {
                    version: 0,
                    offset,
                    is_tombstone: true,
                    history: Vec::new(),
                });
            slot.version = frame.sequence;
            slot.offset = offset;
            slot.is_tombstone = write.is_tombstone;
            slot.history.push(offset);
        }
        self.next_sequence = frame.sequence + 1;
    }

    fn slot(&self, partition: &Partition, key: &str) -> Option<&KeySlot> {
        self.partitions.get(partition)?.get(key)
    }

    /// Location of the medium, for logs.
    pub fn describe(&self) -> String {
        self.medium.describe()
    }

    /// Sequence of the last committed frame (0 for an empty store).
    pub fn last_sequence(&self) -> u64 {
        self.next_sequence - 1
    }

    /// Version of the last write to a key, including tombstones.
    pub fn version_of(&self, partition: &Partition, key: &str) -> Option<u64> {
        self.slot(partition, key).map(|slot| slot.version)
    }

    /// Returns the latest live value for a key.
    ///
    /// Tombstoned and never-written keys read as `None`.
    pub fn get(&self, partition: &Partition, key: &str) -> StoreResult<Option<Versioned>> {
        let mut reader = FrameReader::open(self.medium.as_ref())?;

        let slot = match self.slot(partition, key) {
            Some(slot) if !slot.is_tombstone => slot,
            _ => return Ok(None),
        };

        read_value(&mut reader, &partition.encode(), key, slot).map(Some)
    }

    /// Live keys in `[start, end)` ordered by key. An empty `end` is unbounded.
    pub fn range(&self, partition: &Partition, start: &str, end: &str) -> StoreResult<RangeIter<'_>> {
        let upper = if end.is_empty() {
            Bound::Unbounded
        } else {
            Bound::Excluded(end)
        };
        self.range_bounds(partition, Bound::Included(start), upper)
    }

    /// Every live key in a partition, ordered by key.
    pub fn scan(&self, partition: &Partition) -> StoreResult<RangeIter<'_>> {
        self.range_bounds(partition, Bound::Unbounded, Bound::Unbounded)
    }

    fn range_bounds(
        &self,
        partition: &Partition,
        lower: Bound<&str>,
        upper: Bound<&str>,
    ) -> StoreResult<RangeIter<'_>> {
        let reader = FrameReader::open(self.medium.as_ref())?;

        let inverted = match (lower, upper) {
            (Bound::Included(s), Bound::Excluded(e)) => s > e,
            _ => false,
        };

        let keys = match self.partitions.get(partition) {
            Some(map) if !inverted => Some(map.range::<str, _>((lower, upper))),
            _ => None,
        };

        Ok(RangeIter {
            reader,
            partition: partition.encode(),
            keys,
        })
    }

    /// Lazy, oldest-first history of a key, tombstones included.
    pub fn history(&self, partition: &Partition, key: &str) -> StoreResult<HistoryIter<'_>> {
        let reader = FrameReader::open(self.medium.as_ref())?;
        Ok(match self.slot(partition, key) {
            Some(slot) => HistoryIter::new(reader, partition.encode(), key.to_string(), &slot.history),
            None => HistoryIter::empty(key.to_string()),
        })
    }

    /// Commits a unit of work as one frame.
    ///
    /// Every observed version in the read set must still be current.
    /// Read-only units are validated but write nothing.
    pub fn commit(
        &mut self,
        unit: UnitOfWork,
        tx_id: &str,
        timestamp: DateTime<Utc>,
    ) -> StoreResult<CommitReceipt> {
        for (partition, key, observed) in unit.reads() {
            let current = self.version_of(partition, key);
            if current != observed {
                return Err(StoreError::version_conflict(&partition.encode(), key, observed, current));
            }
        }

        if unit.is_read_only() {
            return Ok(CommitReceipt {
                sequence: None,
                writes: 0,
            });
        }

        let frame = CommitFrame::new(self.next_sequence, tx_id, timestamp, unit.into_entries());
        let offset = self.medium.append(&frame.serialize())?;
        self.index_frame(&frame, offset);

        Ok(CommitReceipt {
            sequence: Some(frame.sequence),
            writes: frame.writes.len(),
        })
    }
}

fn read_value(reader: &mut FrameReader, partition: &str, key: &str, slot: &KeySlot) -> StoreResult<Versioned> {
    let frame = reader.read_at(slot.offset)?;
    match frame.entry_for(partition, key) {
        Some(write) if !write.is_tombstone => Ok(Versioned {
            value: write.value.clone(),
            version: slot.version,
        }),
        _ => Err(StoreError::corruption_at_offset(
            slot.offset,
            format!("frame {} has no live write for {}", frame.sequence, key),
        )),
    }
}

/// Lazy ordered scan over live keys.
///
/// Owns a reader handle on the medium, released on drop.
pub struct RangeIter<'a> {
    reader: FrameReader,
    partition: String,
    keys: Option<btree_map::Range<'a, String, KeySlot>>,
}

impl Iterator for RangeIter<'_> {
    type Item = StoreResult<(String, Versioned)>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let (key, slot) = self.keys.as_mut()?.next()?;
            if slot.is_tombstone {
                continue;
            }
            let item = read_value(&mut self.reader, &self.partition, key, slot);
            if item.is_err() {
                self.keys = None;
            }
            return Some(item.map(|versioned| (key.clone(), versioned)));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::medium::MemoryMedium;
    use super::*;

    fn open_memory() -> (StateStore, MemoryMedium) {
        let medium = MemoryMedium::new();
        let store = StateStore::open(Box::new(medium.clone())).unwrap();
        (store, medium)
    }

    fn put(store: &mut StateStore, partition: &Partition, key: &str, value: &str) -> u64 {
        let mut unit = UnitOfWork::new();
        unit.put(partition, key, value.as_bytes().to_vec());
        store
            .commit(unit, &format!("tx-{}", key), Utc::now())
            .unwrap()
            .sequence
            .unwrap()
    }

    fn delete(store: &mut StateStore, partition: &Partition, key: &str) {
        let mut unit = UnitOfWork::new();
        unit.delete(partition, key);
        store.commit(unit, "tx-del", Utc::now()).unwrap();
    }

    #[test]
    fn test_get_after_put_and_delete() {
        let (mut store, _) = open_memory();
        let public = Partition::public("vehicle");

        put(&mut store, &public, "V1", "red");
        assert_eq!(store.get(&public, "V1").unwrap().unwrap().value, b"red");

        put(&mut store, &public, "V1", "blue");
        assert_eq!(store.get(&public, "V1").unwrap().unwrap().value, b"blue");

        delete(&mut store, &public, "V1");
        assert!(store.get(&public, "V1").unwrap().is_none());
        assert_eq!(store.version_of(&public, "V1"), Some(3));
    }

    #[test]
    fn test_versions_advance_per_commit() {
        let (mut store, _) = open_memory();
        let public = Partition::public("batch");
        assert_eq!(put(&mut store, &public, "B1", "a"), 1);
        assert_eq!(put(&mut store, &public, "B2", "b"), 2);
        assert_eq!(store.last_sequence(), 2);
        assert_eq!(store.get(&public, "B1").unwrap().unwrap().version, 1);
    }

    #[test]
    fn test_partitions_are_isolated() {
        let (mut store, _) = open_memory();
        let public = Partition::public("vehicle");
        let orders = Partition::collection("vehicle", "CollectionOrder");

        put(&mut store, &orders, "O1", "order");
        assert!(store.get(&public, "O1").unwrap().is_none());
        assert_eq!(store.scan(&public).unwrap().count(), 0);
        assert_eq!(store.scan(&orders).unwrap().count(), 1);
    }

    #[test]
    fn test_range_half_open_and_ordered() {
        let (mut store, _) = open_memory();
        let public = Partition::public("vehicle");
        for key in ["V3", "V1", "V2", "V4"] {
            put(&mut store, &public, key, key);
        }
        delete(&mut store, &public, "V2");

        let keys: Vec<String> = store
            .range(&public, "V1", "V4")
            .unwrap()
            .map(|item| item.unwrap().0)
            .collect();
        assert_eq!(keys, vec!["V1", "V3"]);

        let all: Vec<String> = store
            .range(&public, "", "")
            .unwrap()
            .map(|item| item.unwrap().0)
            .collect();
        assert_eq!(all, vec!["V1", "V3", "V4"]);
    }

    #[test]
    fn test_inverted_range_is_empty() {
        let (mut store, _) = open_memory();
        let public = Partition::public("vehicle");
        put(&mut store, &public, "V1", "x");
        assert_eq!(store.range(&public, "V9", "V1").unwrap().count(), 0);
    }

    #[test]
    fn test_history_includes_tombstones_in_order() {
        let (mut store, _) = open_memory();
        let public = Partition::public("vehicle");
        put(&mut store, &public, "V1", "first");
        put(&mut store, &public, "V1", "second");
        delete(&mut store, &public, "V1");

        let entries: Vec<_> = store
            .history(&public, "V1")
            .unwrap()
            .collect::<StoreResult<_>>()
            .unwrap();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].value.as_deref(), Some(&b"first"[..]));
        assert_eq!(entries[1].value.as_deref(), Some(&b"second"[..]));
        assert!(entries[2].is_delete());
        assert!(entries.windows(2).all(|w| w[0].sequence < w[1].sequence));
    }

    #[test]
    fn test_history_of_unknown_key_is_empty() {
        let (store, _) = open_memory();
        assert_eq!(store.history(&Partition::public("vehicle"), "nope").unwrap().count(), 0);
    }

    #[test]
    fn test_reopen_rebuilds_index() {
        let (mut store, medium) = open_memory();
        let public = Partition::public("batch");
        put(&mut store, &public, "B1", "one");
        put(&mut store, &public, "B2", "two");
        delete(&mut store, &public, "B1");
        drop(store);

        let reopened = StateStore::open(Box::new(medium)).unwrap();
        assert!(reopened.get(&public, "B1").unwrap().is_none());
        assert_eq!(reopened.get(&public, "B2").unwrap().unwrap().value, b"two");
        assert_eq!(reopened.last_sequence(), 3);
        assert_eq!(reopened.history(&public, "B1").unwrap().count(), 2);
    }

    #[test]
    fn test_unavailable_medium_fails_reads_and_commits() {
        let (mut store, medium) = open_memory();
        let public = Partition::public("vehicle");
        put(&mut store, &public, "V1", "x");

        medium.set_available(false);
        assert!(store.get(&public, "V1").is_err());
        assert!(store.range(&public, "", "").is_err());

        let mut unit = UnitOfWork::new();
        unit.put(&public, "V2", b"y".to_vec());
        let err = store.commit(unit, "tx", Utc::now()).unwrap_err();
        assert_eq!(err.code(), super::super::errors::StoreErrorCode::StoreUnavailable);

        medium.set_available(true);
        assert!(store.get(&public, "V2").unwrap().is_none());
        assert_eq!(store.last_sequence(), 1);
    }

    #[test]
    fn test_stale_read_set_rejected() {
        let (mut store, _) = open_memory();
        let public = Partition::public("vehicle");
        put(&mut store, &public, "V1", "x");

        let mut stale = UnitOfWork::new();
        stale.record_read(&public, "V1", Some(1));
        stale.put(&public, "V1", b"stale".to_vec());

        put(&mut store, &public, "V1", "fresh");

        let err = store.commit(stale, "tx-stale", Utc::now()).unwrap_err();
        assert_eq!(err.code(), super::super::errors::StoreErrorCode::VersionConflict);
        assert_eq!(store.get(&public, "V1").unwrap().unwrap().value, b"fresh");
    }

    #[test]
    fn test_read_only_commit_writes_nothing() {
        let (mut store, medium) = open_memory();
        let receipt = store.commit(UnitOfWork::new(), "tx", Utc::now()).unwrap();
        assert_eq!(receipt.sequence, None);
        assert!(medium.is_empty());
    }

    #[test]
    fn test_multi_key_unit_is_one_frame() {
        let (mut store, _) = open_memory();
        let public = Partition::public("vehicle");
        let orders = Partition::collection("vehicle", "CollectionOrder");
        put(&mut store, &orders, "O1", "order");

        let mut unit = UnitOfWork::new();
        unit.delete(&orders, "O1");
        unit.put(&public, "V1", b"assigned".to_vec());
        let receipt = store.commit(unit, "tx-match", Utc::now()).unwrap();

        assert_eq!(receipt.sequence, Some(2));
        assert_eq!(receipt.writes, 2);
        assert_eq!(store.version_of(&orders, "O1"), Some(2));
        assert_eq!(store.version_of(&public, "V1"), Some(2));
    }
}
