//! Error types for scanning, tree building and record parsing.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur during scanning and fingerprinting.
#[derive(Debug, Error)]
pub enum ScanError {
    /// Permission denied for a path.
    #[error("Permission denied: {path}")]
    PermissionDenied { path: PathBuf },

    /// Path not found.
    #[error("Path not found: {path}")]
    NotFound { path: PathBuf },

    /// Generic I/O error.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Operation was interrupted.
    #[error("Operation interrupted")]
    Interrupted,

    /// A fingerprint was requested for a path with no recorded hash.
    #[error("No recorded fingerprint for {path}")]
    Unrecorded { path: PathBuf },

    /// Invalid configuration.
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    /// Root path is not a directory.
    #[error("Root path is not a directory: {path}")]
    NotADirectory { path: PathBuf },
}

impl ScanError {
    /// Create an I/O error with path context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        match source.kind() {
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied { path },
            std::io::ErrorKind::NotFound => Self::NotFound { path },
            std::io::ErrorKind::Interrupted => Self::Interrupted,
            _ => Self::Io { path, source },
        }
    }

    /// Whether the error only concerns a single entry and the scan may go on.
    pub fn is_skippable(&self) -> bool {
        !matches!(self, Self::Interrupted | Self::InvalidConfig { .. })
    }
}

/// Kind of scan warning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WarningKind {
    /// Permission was denied.
    PermissionDenied,
    /// Error reading file/directory.
    ReadError,
    /// Error reading metadata.
    MetadataError,
    /// Symbolic link, never followed.
    Symlink,
    /// Block/char device, FIFO or socket.
    SpecialFile,
}

/// Non-fatal warning encountered during scan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanWarning {
    /// Path where the warning occurred.
    pub path: PathBuf,
    /// Human-readable message.
    pub message: String,
    /// Kind of warning.
    pub kind: WarningKind,
}

impl ScanWarning {
    /// Create a new scan warning.
    pub fn new(path: impl Into<PathBuf>, message: impl Into<String>, kind: WarningKind) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
            kind,
        }
    }

    /// Create a read error warning.
    pub fn read_error(path: impl Into<PathBuf>, error: &dyn std::fmt::Display) -> Self {
        let path = path.into();
        Self {
            message: format!("Read error: {error}"),
            path,
            kind: WarningKind::ReadError,
        }
    }

    /// Create a warning from a skippable scan error.
    pub fn from_error(path: impl Into<PathBuf>, error: &ScanError) -> Self {
        let kind = match error {
            ScanError::PermissionDenied { .. } => WarningKind::PermissionDenied,
            _ => WarningKind::ReadError,
        };
        Self::new(path, error.to_string(), kind)
    }
}

/// A hash string that is not exactly 32 hex characters.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HashParseError {
    #[error("expected 32 hex characters, found {0}")]
    Length(usize),

    #[error("invalid hex character {0:?}")]
    InvalidChar(char),
}

/// Structural faults while assembling a tree.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TreeError {
    /// The path does not descend from the tree root.
    #[error("{path} is not under root {root}")]
    PathMismatch { path: PathBuf, root: PathBuf },

    /// A file was already attached at this path.
    #[error("duplicate entry for {path}")]
    DuplicatePath { path: PathBuf },

    /// The record carried a malformed hash.
    #[error("invalid hash for {path}: {source}")]
    InvalidHash {
        path: PathBuf,
        #[source]
        source: HashParseError,
    },
}

/// What is wrong with a single record line.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecordErrorKind {
    #[error("expected 3 fields separated by two spaces, found {0}")]
    FieldCount(usize),

    #[error(transparent)]
    Hash(#[from] HashParseError),

    #[error("invalid size {0:?}")]
    Size(String),

    #[error("unknown encoding tag {0:?}")]
    EncodingTag(String),

    #[error("path is not valid base64: {0}")]
    Base64(String),

    #[error("line is not valid UTF-8")]
    NotUtf8,
}

/// A malformed line, with its 1-based line number.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("line {line}: {kind} ({content:?})")]
pub struct LineError {
    pub line: usize,
    pub kind: RecordErrorKind,
    pub content: String,
}

/// Errors reading a record file.
#[derive(Debug, Error)]
pub enum RecordError {
    #[error("I/O error reading records: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed record on {0}")]
    Malformed(#[from] LineError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_error_io() {
        let err = ScanError::io(
            "/test/path",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        assert!(matches!(err, ScanError::PermissionDenied { .. }));
        assert!(err.is_skippable());
    }

    #[test]
    fn test_interrupted_not_skippable() {
        let err = ScanError::io(
            "/test/path",
            std::io::Error::new(std::io::ErrorKind::Interrupted, "ctrl-c"),
        );
        assert!(matches!(err, ScanError::Interrupted));
        assert!(!err.is_skippable());
    }

    #[test]
    fn test_warning_from_error() {
        let err = ScanError::PermissionDenied {
            path: PathBuf::from("/x"),
        };
        let warning = ScanWarning::from_error("/x", &err);
        assert_eq!(warning.kind, WarningKind::PermissionDenied);
        assert!(warning.message.contains("Permission denied"));
    }

    #[test]
    fn test_line_error_display() {
        let err = LineError {
            line: 7,
            kind: RecordErrorKind::FieldCount(2),
            content: "abc  def".into(),
        };
        assert!(err.to_string().starts_with("line 7:"));
    }
}
