//! Frame reader with strict corruption detection
//!
//! - Every read validates the frame checksum
//! - Any checksum failure aborts the read
//! - During store open, any failure aborts recovery

use std::io::{Read, Seek, SeekFrom};

use super::errors::{StoreError, StoreResult};
use super::medium::{Medium, ReadSeek};
use super::record::{CommitFrame, MIN_FRAME_SIZE};

/// Sequential and positional reader over a snapshot of the frame log.
///
/// Owns its handle on the medium; the handle is released when the reader
/// is dropped.
pub struct FrameReader {
    reader: Box<dyn ReadSeek>,
    current_offset: u64,
    end_offset: u64,
}

impl FrameReader {
    /// Opens a reader positioned at the start of the log.
    pub fn open(medium: &dyn Medium) -> StoreResult<Self> {
        let (reader, end_offset) = medium.open_reader()?;
        Ok(Self {
            reader,
            current_offset: 0,
            end_offset,
        })
    }

    /// Returns the current read offset.
    pub fn current_offset(&self) -> u64 {
        self.current_offset
    }

    /// Reads the next frame.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(frame))` if a frame was read
    /// - `Ok(None)` at end of log
    /// - `Err(LEDGER_DATA_CORRUPTION)` on checksum or framing failure
    pub fn read_next(&mut self) -> StoreResult<Option<CommitFrame>> {
        if self.current_offset >= self.end_offset {
            return Ok(None);
        }

        let remaining = self.end_offset - self.current_offset;
        if remaining < MIN_FRAME_SIZE as u64 {
            return Err(StoreError::corruption_at_offset(
                self.current_offset,
                format!(
                    "Truncated log: {} bytes remaining, minimum frame size is {}",
                    remaining, MIN_FRAME_SIZE
                ),
            ));
        }

        let mut len_buf = [0u8; 4];
        self.reader.read_exact(&mut len_buf).map_err(|e| {
            StoreError::corruption_at_offset(
                self.current_offset,
                format!("Failed to read frame length: {}", e),
            )
        })?;
        let frame_length = u32::from_le_bytes(len_buf) as u64;

        if frame_length < MIN_FRAME_SIZE as u64 {
            return Err(StoreError::corruption_at_offset(
                self.current_offset,
                format!("Invalid frame length: {}", frame_length),
            ));
        }

        if frame_length > remaining {
            return Err(StoreError::corruption_at_offset(
                self.current_offset,
                format!(
                    "Frame length {} exceeds remaining log size {}",
                    frame_length, remaining
                ),
            ));
        }

        let mut frame_buf = vec![0u8; frame_length as usize];
        frame_buf[0..4].copy_from_slice(&len_buf);
        self.reader.read_exact(&mut frame_buf[4..]).map_err(|e| {
            StoreError::corruption_at_offset(
                self.current_offset,
                format!("Failed to read frame body: {}", e),
            )
        })?;

        let (frame, consumed) = CommitFrame::deserialize(&frame_buf)
            .map_err(|e| StoreError::corruption_at_offset(self.current_offset, e.to_string()))?;

        self.current_offset += consumed as u64;
        Ok(Some(frame))
    }

    /// Seeks to a frame boundary.
    pub fn seek_to(&mut self, offset: u64) -> StoreResult<()> {
        self.reader
            .seek(SeekFrom::Start(offset))
            .map_err(|e| StoreError::read_failed(format!("Failed to seek to offset {}", offset), e))?;
        self.current_offset = offset;
        Ok(())
    }

    /// Reads the frame starting at `offset`.
    pub fn read_at(&mut self, offset: u64) -> StoreResult<CommitFrame> {
        self.seek_to(offset)?;
        match self.read_next()? {
            Some(frame) => Ok(frame),
            None => Err(StoreError::corruption_at_offset(offset, "No frame at specified offset")),
        }
    }
}
