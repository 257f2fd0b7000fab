//! Commit frame format
//!
//! One frame holds every write of one committed operation, so a frame is
//! the unit of atomicity: it is either fully present with a valid checksum
//! or the operation never happened.
//!
//! ```text
//! +------------------+
//! | Frame Length     | (u32 LE)
//! +------------------+
//! | Sequence         | (u64 LE)
//! +------------------+
//! | Timestamp (ms)   | (i64 LE)
//! +------------------+
//! | Tx ID            | (length-prefixed string)
//! +------------------+
//! | Entry Count      | (u32 LE)
//! +------------------+
//! | Entries          | partition, key (strings), tombstone (u8), value (bytes)
//! +------------------+
//! | Checksum         | (u32 LE)
//! +------------------+
//! ```
//!
//! Checksum covers all bytes except the checksum itself.

use std::io::{self, Read};

use chrono::{DateTime, TimeZone, Utc};

/// Length + sequence + timestamp + tx id prefix + entry count + checksum
pub(crate) const MIN_FRAME_SIZE: usize = 4 + 8 + 8 + 4 + 4 + 4;

/// A single key mutation inside a commit frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteEntry {
    /// Encoded partition (see [`super::Partition::encode`])
    pub partition: String,
    /// Key within the partition
    pub key: String,
    /// Whether this write deletes the key
    pub is_tombstone: bool,
    /// Value bytes (empty for tombstones)
    pub value: Vec<u8>,
}

impl WriteEntry {
    /// A live value write
    pub fn put(partition: impl Into<String>, key: impl Into<String>, value: Vec<u8>) -> Self {
        Self {
            partition: partition.into(),
            key: key.into(),
            is_tombstone: false,
            value,
        }
    }

    /// A tombstone write
    pub fn tombstone(partition: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            partition: partition.into(),
            key: key.into(),
            is_tombstone: true,
            value: Vec::new(),
        }
    }
}

/// All writes of one committed operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitFrame {
    /// Commit sequence, strictly increasing by one per frame
    pub sequence: u64,
    /// Writer transaction id
    pub tx_id: String,
    /// Commit timestamp in milliseconds since the Unix epoch
    pub timestamp_millis: i64,
    /// Writes in application order
    pub writes: Vec<WriteEntry>,
}

impl CommitFrame {
    pub fn new(sequence: u64, tx_id: impl Into<String>, timestamp: DateTime<Utc>, writes: Vec<WriteEntry>) -> Self {
        Self {
            sequence,
            tx_id: tx_id.into(),
            timestamp_millis: timestamp.timestamp_millis(),
            writes,
        }
    }

    /// Commit timestamp as a UTC datetime
    pub fn timestamp(&self) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(self.timestamp_millis)
            .single()
            .unwrap_or_default()
    }

    /// Finds the write for a key in this frame, if any.
    pub fn entry_for(&self, partition: &str, key: &str) -> Option<&WriteEntry> {
        self.writes
            .iter()
            .rev()
            .find(|w| w.partition == partition && w.key == key)
    }

    fn serialize_body(&self) -> Vec<u8> {
        let mut buf = Vec::new();

        buf.extend_from_slice(&self.sequence.to_le_bytes());
        buf.extend_from_slice(&self.timestamp_millis.to_le_bytes());
        write_bytes(&mut buf, self.tx_id.as_bytes());

        buf.extend_from_slice(&(self.writes.len() as u32).to_le_bytes());
        for write in &self.writes {
            write_bytes(&mut buf, write.partition.as_bytes());
            write_bytes(&mut buf, write.key.as_bytes());
            buf.push(if write.is_tombstone { 1 } else { 0 });
            write_bytes(&mut buf, &write.value);
        }

        buf
    }

    /// Serialize the complete frame: length, body, checksum.
    pub fn serialize(&self) -> Vec<u8> {
        let body = self.serialize_body();
        let frame_length = (4 + body.len() + 4) as u32;

        let mut frame = Vec::with_capacity(frame_length as usize);
        frame.extend_from_slice(&frame_length.to_le_bytes());
        frame.extend_from_slice(&body);
        let checksum = super::checksum::compute_checksum(&frame);
        frame.extend_from_slice(&checksum.to_le_bytes());

        frame
    }

    /// Deserialize a frame from bytes, verifying the checksum.
    ///
    /// Returns the frame and the number of bytes consumed.
    pub fn deserialize(data: &[u8]) -> io::Result<(Self, usize)> {
        if data.len() < MIN_FRAME_SIZE {
            return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "Frame too short"));
        }

        let frame_length = u32::from_le_bytes([data[0], data[1], data[2], data[3]]) as usize;

        if frame_length < MIN_FRAME_SIZE {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("Invalid frame length: {}", frame_length),
            ));
        }

        if data.len() < frame_length {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!(
                    "Frame truncated: expected {} bytes, got {}",
                    frame_length,
                    data.len()
                ),
            ));
        }

        let checksum_offset = frame_length - 4;
        let stored_checksum = u32::from_le_bytes([
            data[checksum_offset],
            data[checksum_offset + 1],
            data[checksum_offset + 2],
            data[checksum_offset + 3],
        ]);
        let computed_checksum = super::checksum::compute_checksum(&data[..checksum_offset]);

        if computed_checksum != stored_checksum {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!(
                    "Checksum mismatch: computed {:08x}, stored {:08x}",
                    computed_checksum, stored_checksum
                ),
            ));
        }

        let mut cursor = io::Cursor::new(&data[4..checksum_offset]);

        let sequence = u64::from_le_bytes(read_array(&mut cursor)?);
        let timestamp_millis = i64::from_le_bytes(read_array(&mut cursor)?);
        let tx_id = read_string(&mut cursor)?;

        let count = u32::from_le_bytes(read_array(&mut cursor)?) as usize;
        let mut writes = Vec::with_capacity(count.min(1024));
        for _ in 0..count {
            let partition = read_string(&mut cursor)?;
            let key = read_string(&mut cursor)?;
            let [tombstone] = read_array::<1>(&mut cursor)?;
            let value = read_bytes(&mut cursor)?;
            writes.push(WriteEntry {
                partition,
                key,
                is_tombstone: tombstone != 0,
                value,
            });
        }

        Ok((
            Self {
                sequence,
                tx_id,
                timestamp_millis,
                writes,
            },
            frame_length,
        ))
    }
}

fn write_bytes(buf: &mut Vec<u8>, bytes: &[u8]) {
    buf.extend_from_slice(&(bytes.len() as u32).to_le_bytes());
    buf.extend_from_slice(bytes);
}

fn read_array<const N: usize>(reader: &mut impl Read) -> io::Result<[u8; N]> {
    let mut buf = [0u8; N];
    reader.read_exact(&mut buf)?;
    Ok(buf)
}

fn read_bytes(reader: &mut impl Read) -> io::Result<Vec<u8>> {
    let len = u32::from_le_bytes(read_array(reader)?) as usize;
    let mut buf = vec![0u8; len];
    reader.read_exact(&mut buf)?;
    Ok(buf)
}

fn read_string(reader: &mut impl Read) -> io::Result<String> {
    String::from_utf8(read_bytes(reader)?)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, format!("Invalid UTF-8: {}", e)))
}
