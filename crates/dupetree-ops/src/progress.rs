//! Progress reporting types for copy runs.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::OperationError;

/// Progress information for an ongoing copy.
///
/// Sent once per file, so it carries counters only; the errors themselves
/// arrive with [`OperationComplete`].
#[derive(Debug, Clone)]
pub struct OperationProgress {
    /// Number of files copied so far.
    pub files_completed: usize,
    /// Total number of files in the plan.
    pub files_total: usize,
    /// Number of directories created so far.
    pub dirs_created: usize,
    /// Number of bytes copied so far.
    pub bytes_processed: u64,
    /// The file currently being processed.
    pub current_file: Option<PathBuf>,
    /// Number of failed steps so far.
    pub errors: usize,
}

impl OperationProgress {
    pub fn new(files_total: usize) -> Self {
        Self {
            files_completed: 0,
            files_total,
            dirs_created: 0,
            bytes_processed: 0,
            current_file: None,
            errors: 0,
        }
    }

    /// Get the progress as a percentage (0.0 to 100.0).
    pub fn percentage(&self) -> f64 {
        if self.files_total > 0 {
            (self.files_completed as f64 / self.files_total as f64) * 100.0
        } else {
            0.0
        }
    }

    pub fn has_errors(&self) -> bool {
        self.errors > 0
    }

    pub fn set_current_file(&mut self, path: Option<PathBuf>) {
        self.current_file = path;
    }

    /// Increment the completed count and add bytes.
    pub fn complete_file(&mut self, bytes: u64) {
        self.files_completed += 1;
        self.bytes_processed += bytes;
    }
}

/// Result of a finished copy run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OperationComplete {
    /// Files copied.
    pub succeeded: usize,
    /// Files that could not be copied.
    pub failed: usize,
    /// Files left alone because their destination existed.
    pub skipped: usize,
    /// Directories created.
    pub dirs_created: usize,
    /// Total bytes copied.
    pub bytes_processed: u64,
    /// Whether a conflict or a cancellation stopped the run early.
    pub aborted: bool,
    pub errors: Vec<OperationError>,
    /// Problems that did not fail a file, such as lost timestamps.
    pub warnings: Vec<OperationError>,
}

impl OperationComplete {
    /// Check if the run was fully successful.
    pub fn is_success(&self) -> bool {
        self.failed == 0 && !self.aborted
    }

    /// Record a failed step.
    pub fn add_error(&mut self, error: OperationError) {
        self.errors.push(error);
    }

    /// Get a human-readable summary of the run.
    pub fn summary(&self) -> String {
        let mut summary = format!(
            "Copied {} files, created {} directories",
            self.succeeded, self.dirs_created
        );
        if self.skipped > 0 {
            summary.push_str(&format!(", {} skipped", self.skipped));
        }
        if self.failed > 0 {
            summary.push_str(&format!(", {} failed", self.failed));
        }
        if self.aborted {
            summary.push_str(" (aborted)");
        }
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percentage() {
        let mut progress = OperationProgress::new(4);
        assert_eq!(progress.percentage(), 0.0);
        progress.complete_file(10);
        assert_eq!(progress.percentage(), 25.0);
        assert_eq!(OperationProgress::new(0).percentage(), 0.0);
    }

    #[test]
    fn test_summary() {
        let complete = OperationComplete {
            succeeded: 3,
            skipped: 1,
            dirs_created: 2,
            ..Default::default()
        };
        assert!(complete.is_success());
        assert_eq!(
            complete.summary(),
            "Copied 3 files, created 2 directories, 1 skipped"
        );
    }
}
