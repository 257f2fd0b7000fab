//! Durable media backing the frame log
//!
//! A medium is an append-only byte log. `FileMedium` is the production
//! medium (`<data_dir>/ledger/state.dat`, fsync on every append);
//! `MemoryMedium` keeps bytes in memory and exposes hooks to simulate an
//! unreachable medium, a failed append or a corrupted byte.

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufReader, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use super::errors::{StoreError, StoreResult};

/// Readable, seekable handle over a snapshot of the medium.
pub trait ReadSeek: Read + Seek + Send {}

impl<T: Read + Seek + Send> ReadSeek for T {}

/// An append-only byte log.
pub trait Medium: Send {
    /// Human-readable location, used in error messages and logs
    fn describe(&self) -> String;

    /// Appends `bytes` durably and returns the offset they were written at.
    ///
    /// Either all bytes become durable or none do.
    fn append(&mut self, bytes: &[u8]) -> StoreResult<u64>;

    /// Opens a fresh reader. Returns the reader and the log length at open time.
    fn open_reader(&self) -> StoreResult<(Box<dyn ReadSeek>, u64)>;
}

/// File-backed medium with fsync enforcement.
///
/// If a torn tail cannot be truncated away, the medium refuses every later
/// append: the file no longer ends where the index thinks it does.
pub struct FileMedium {
    path: PathBuf,
    file: File,
    len: u64,
    poisoned: Option<String>,
}

impl FileMedium {
    /// Opens or creates `<data_dir>/ledger/state.dat`.
    pub fn open(data_dir: &Path) -> StoreResult<Self> {
        let ledger_dir = data_dir.join("ledger");
        if !ledger_dir.exists() {
            fs::create_dir_all(&ledger_dir).map_err(|e| {
                StoreError::unavailable_io(
                    format!("Failed to create ledger directory: {}", ledger_dir.display()),
                    e,
                )
            })?;
        }

        let path = ledger_dir.join("state.dat");
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&path)
            .map_err(|e| {
                StoreError::unavailable_io(format!("Failed to open frame log: {}", path.display()), e)
            })?;

        let len = file
            .metadata()
            .map_err(|e| StoreError::unavailable_io("Failed to read frame log metadata", e))?
            .len();

        Ok(Self {
            path,
            file,
            len,
            poisoned: None,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Medium for FileMedium {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    fn append(&mut self, bytes: &[u8]) -> StoreResult<u64> {
        if let Some(reason) = &self.poisoned {
            return Err(StoreError::write_failed(
                format!("Frame log {} no longer accepts appends", self.path.display()),
                io::Error::new(io::ErrorKind::Other, reason.clone()),
            ));
        }

        let offset = self.len;

        let written = self
            .file
            .write_all(bytes)
            .and_then(|_| self.file.sync_all());

        if let Err(e) = written {
            // Drop any torn tail so the next append starts on a frame boundary.
            if let Err(truncate) = self.file.set_len(offset) {
                self.poisoned = Some(format!("torn tail at offset {} was not truncated: {}", offset, truncate));
            }
            return Err(StoreError::write_failed(
                format!("Failed to append frame at offset {}", offset),
                e,
            ));
        }

        self.len += bytes.len() as u64;
        Ok(offset)
    }

    fn open_reader(&self) -> StoreResult<(Box<dyn ReadSeek>, u64)> {
        let file = File::open(&self.path).map_err(|e| {
            StoreError::unavailable_io(format!("Failed to open frame log: {}", self.path.display()), e)
        })?;
        Ok((Box::new(BufReader::new(file)), self.len))
    }
}

/// In-memory medium. Clones share the same bytes and failure switches.
#[derive(Debug, Clone, Default)]
pub struct MemoryMedium {
    bytes: Arc<Mutex<Vec<u8>>>,
    offline: Arc<AtomicBool>,
    reject_append: Arc<AtomicBool>,
}

impl MemoryMedium {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulates the medium becoming unreachable (or reachable again).
    pub fn set_available(&self, available: bool) {
        self.offline.store(!available, Ordering::SeqCst);
    }

    /// Makes the next append fail with `LEDGER_STORE_WRITE_FAILED`.
    /// Reads are unaffected.
    pub fn fail_next_append(&self) {
        self.reject_append.store(true, Ordering::SeqCst);
    }

    /// Number of bytes currently in the log.
    pub fn len(&self) -> usize {
        self.bytes.lock().map(|b| b.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Flips every bit of the byte at `offset`, if it exists.
    pub fn corrupt_byte(&self, offset: usize) {
        if let Ok(mut bytes) = self.bytes.lock() {
            if let Some(byte) = bytes.get_mut(offset) {
                *byte ^= 0xFF;
            }
        }
    }

    fn guard(&self) -> StoreResult<MutexGuard<'_, Vec<u8>>> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(StoreError::unavailable("memory medium is offline"));
        }
        self.bytes
            .lock()
            .map_err(|_| StoreError::unavailable("memory medium lock poisoned"))
    }
}

impl Medium for MemoryMedium {
    fn describe(&self) -> String {
        "memory".to_string()
    }

    fn append(&mut self, bytes: &[u8]) -> StoreResult<u64> {
        let mut log = self.guard()?;
        if self.reject_append.swap(false, Ordering::SeqCst) {
            return Err(StoreError::write_failed(
                "memory medium rejected the append",
                io::Error::new(io::ErrorKind::Other, "append failure requested"),
            ));
        }
        let offset = log.len() as u64;
        log.extend_from_slice(bytes);
        Ok(offset)
    }

    fn open_reader(&self) -> StoreResult<(Box<dyn ReadSeek>, u64)> {
        let len = self.guard()?.len() as u64;
        let cursor = SharedCursor {
            bytes: Arc::clone(&self.bytes),
            position: 0,
            len,
        };
        Ok((Box::new(cursor), len))
    }
}

/// Cursor over the shared buffer, bounded to the log length at open time.
struct SharedCursor {
    bytes: Arc<Mutex<Vec<u8>>>,
    position: u64,
    len: u64,
}

impl Read for SharedCursor {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let bytes = self
            .bytes
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "memory medium lock poisoned"))?;
        let end = self.len.min(bytes.len() as u64) as usize;
        let start = self.position as usize;
        if start >= end {
            return Ok(0);
        }

        let n = (end - start).min(buf.len());
        buf[..n].copy_from_slice(&bytes[start..start + n]);
        self.position += n as u64;
        Ok(n)
    }
}

impl Seek for SharedCursor {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let target = match pos {
            SeekFrom::Start(offset) => Some(offset),
            SeekFrom::End(delta) => self.len.checked_add_signed(delta),
            SeekFrom::Current(delta) => self.position.checked_add_signed(delta),
        };
        let target = target
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "seek before start of memory medium"))?;
        self.position = target;
        Ok(target)
    }
}
