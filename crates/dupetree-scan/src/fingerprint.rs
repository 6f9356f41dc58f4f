//! Streaming MD5 fingerprinting with cooperative cancellation.

use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use md5::{Digest, Md5};
use tracing::debug;

use dupetree_core::{ContentHash, Fingerprinter, ScanError, DEFAULT_CHUNK_SIZE};

/// Shared flag that asks long-running reads to stop.
///
/// Cloning shares the flag. The inner `Arc<AtomicBool>` can be handed to a
/// signal handler directly.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    /// The underlying flag, for registration with a signal handler.
    pub fn as_atomic(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.0)
    }
}

/// Hashes files on disk, one bounded chunk at a time.
///
/// The read buffer is allocated on first use and reused for every file.
#[derive(Debug)]
pub struct DiskFingerprinter {
    chunk_size: usize,
    buffer: Vec<u8>,
    cancel: CancelFlag,
    files_hashed: u64,
    bytes_read: u64,
}

impl DiskFingerprinter {
    pub fn new(chunk_size: usize) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
            buffer: Vec::new(),
            cancel: CancelFlag::new(),
            files_hashed: 0,
            bytes_read: 0,
        }
    }

    /// Use `cancel` instead of a private flag.
    pub fn with_cancel(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancel_flag(&self) -> &CancelFlag {
        &self.cancel
    }

    /// Number of files fully hashed so far.
    pub fn files_hashed(&self) -> u64 {
        self.files_hashed
    }

    /// Bytes fed to the hasher so far, interrupted reads included.
    pub fn bytes_read(&self) -> u64 {
        self.bytes_read
    }

    /// Hash the file at `path`.
    ///
    /// Returns [`ScanError::Interrupted`] if cancellation is requested before
    /// the last chunk; the partial digest is dropped.
    pub fn hash_file(&mut self, path: &Path) -> Result<ContentHash, ScanError> {
        let file = File::open(path).map_err(|e| ScanError::io(path, e))?;
        let hash = self.hash_reader(file, path)?;
        self.files_hashed += 1;
        Ok(hash)
    }

    fn hash_reader(&mut self, mut reader: impl Read, path: &Path) -> Result<ContentHash, ScanError> {
        if self.buffer.len() != self.chunk_size {
            self.buffer.resize(self.chunk_size, 0);
        }

        let mut hasher = Md5::new();
        loop {
            if self.cancel.is_cancelled() {
                debug!(path = %path.display(), "hash interrupted");
                return Err(ScanError::Interrupted);
            }
            match reader.read(&mut self.buffer) {
                Ok(0) => break,
                Ok(n) => {
                    hasher.update(&self.buffer[..n]);
                    self.bytes_read += n as u64;
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(ScanError::io(path, e)),
            }
        }
        Ok(ContentHash::from_digest(hasher))
    }
}

impl Default for DiskFingerprinter {
    fn default() -> Self {
        Self::new(DEFAULT_CHUNK_SIZE)
    }
}

impl Fingerprinter for DiskFingerprinter {
    fn fingerprint(&mut self, path: &Path) -> Result<ContentHash, ScanError> {
        self.hash_file(path)
    }
}
