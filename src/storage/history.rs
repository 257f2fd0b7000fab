//! Per-key history, read back from the persisted frame log
//!
//! History is a by-product of the commit path: every frame that touches a
//! key is one history entry. Nothing else appends to it.

use chrono::{DateTime, Utc};

use super::errors::{StoreError, StoreResult};
use super::reader::FrameReader;

/// One committed mutation of a key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    pub key: String,
    /// Value snapshot, or `None` for a tombstone
    pub value: Option<Vec<u8>>,
    pub tx_id: String,
    pub timestamp: DateTime<Utc>,
    /// Commit sequence of the frame
    pub sequence: u64,
}

impl HistoryEntry {
    pub fn is_delete(&self) -> bool {
        self.value.is_none()
    }
}

/// Lazy, oldest-first history of one key.
///
/// Owns a reader handle on the medium which is released on drop, whether
/// the iterator was exhausted, abandoned early, or stopped on an error.
pub struct HistoryIter<'a> {
    reader: Option<FrameReader>,
    partition: String,
    key: String,
    offsets: std::slice::Iter<'a, u64>,
}

impl<'a> HistoryIter<'a> {
    pub(crate) fn new(reader: FrameReader, partition: String, key: String, offsets: &'a [u64]) -> Self {
        Self {
            reader: Some(reader),
            partition,
            key,
            offsets: offsets.iter(),
        }
    }

    pub(crate) fn empty(key: String) -> Self {
        Self {
            reader: None,
            partition: String::new(),
            key,
            offsets: [].iter(),
        }
    }

    fn read_entry(&mut self, offset: u64) -> StoreResult<HistoryEntry> {
        let reader = self
            .reader
            .as_mut()
            .ok_or_else(|| StoreError::unavailable("history reader already released"))?;
        let frame = reader.read_at(offset)?;
        let write = frame.entry_for(&self.partition, &self.key).ok_or_else(|| {
            StoreError::corruption_at_offset(
                offset,
                format!("frame {} has no write for {}", frame.sequence, self.key),
            )
        })?;

        Ok(HistoryEntry {
            key: self.key.clone(),
            value: if write.is_tombstone {
                None
            } else {
                Some(write.value.clone())
            },
            tx_id: frame.tx_id.clone(),
            timestamp: frame.timestamp(),
            sequence: frame.sequence,
        })
    }
}

impl Iterator for HistoryIter<'_> {
    type Item = StoreResult<HistoryEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        let offset = *self.offsets.next()?;
        let entry = self.read_entry(offset);
        if entry.is_err() {
            // Stop after the first failure and release the handle.
            self.reader = None;
            self.offsets = [].iter();
        }
        Some(entry)
    }
}
