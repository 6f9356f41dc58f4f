//! Scan progress reporting.

use std::path::PathBuf;
use std::time::{Duration, Instant};

/// Progress information during a walk or a record scan.
#[derive(Debug, Clone, Default)]
pub struct ScanProgress {
    /// Number of regular files seen so far.
    pub files_scanned: u64,
    /// Number of directories seen so far.
    pub dirs_scanned: u64,
    /// Total size of the files seen so far.
    pub bytes_scanned: u64,
    /// Files whose content was read and hashed.
    pub files_hashed: u64,
    /// Files whose hash was reused from a previous run.
    pub files_reused: u64,
    /// Most recent path.
    pub current_path: PathBuf,
    /// Number of errors encountered.
    pub errors_count: u64,
    /// Time elapsed since the scan started.
    pub elapsed: Duration,
}

impl ScanProgress {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scan rate in files per second.
    pub fn files_per_second(&self) -> f64 {
        if self.elapsed.as_secs_f64() > 0.0 {
            self.files_scanned as f64 / self.elapsed.as_secs_f64()
        } else {
            0.0
        }
    }
}

/// Running counters with a start time, snapshotted into [`ScanProgress`].
#[derive(Debug)]
pub(crate) struct ProgressTracker {
    start_time: Instant,
    current: ScanProgress,
}

impl ProgressTracker {
    /// Send a snapshot every this many files.
    pub const INTERVAL: u64 = 1000;

    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            current: ScanProgress::new(),
        }
    }

    /// Count a file; returns true when a snapshot is due.
    pub fn record_file(&mut self, path: PathBuf, size: u64) -> bool {
        self.current.files_scanned += 1;
        self.current.bytes_scanned += size;
        self.current.current_path = path;
        self.current.files_scanned % Self::INTERVAL == 1
    }

    pub fn record_dir(&mut self) {
        self.current.dirs_scanned += 1;
    }

    pub fn record_hashed(&mut self) {
        self.current.files_hashed += 1;
    }

    pub fn record_reused(&mut self) {
        self.current.files_reused += 1;
    }

    pub fn record_error(&mut self) {
        self.current.errors_count += 1;
    }

    pub fn snapshot(&self) -> ScanProgress {
        ScanProgress {
            elapsed: self.start_time.elapsed(),
            ..self.current.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_due_on_first_file_then_every_interval() {
        let mut tracker = ProgressTracker::new();
        assert!(tracker.record_file(PathBuf::from("/a"), 10));
        for _ in 1..ProgressTracker::INTERVAL {
            assert!(!tracker.record_file(PathBuf::from("/b"), 0));
        }
        assert!(tracker.record_file(PathBuf::from("/c"), 0));

        let snap = tracker.snapshot();
        assert_eq!(snap.files_scanned, ProgressTracker::INTERVAL + 1);
        assert_eq!(snap.bytes_scanned, 10);
        assert_eq!(snap.current_path, PathBuf::from("/c"));
    }
}
