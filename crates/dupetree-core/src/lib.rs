//! Core types for dupetree.
//!
//! This crate provides the data structures shared by every other dupetree
//! crate: content hashes, the arena-backed directory tree, the line-oriented
//! fingerprint record format, and the in-memory fingerprint store.
//!
//! Nothing in here walks the live filesystem. Trees are either assembled by
//! `dupetree-scan` or replayed from persisted records with [`replay`].

mod config;
mod error;
mod node;
pub mod record;
mod replay;
mod store;
mod tree;

pub use config::{ScanConfig, ScanConfigBuilder, DEFAULT_CHUNK_SIZE};
pub use error::{
    HashParseError, LineError, RecordError, RecordErrorKind, ScanError, ScanWarning, TreeError,
    WarningKind,
};
pub use node::{ContentHash, DirId, DirNode, DuplicateSetId, FileId, FileNode};
pub use record::{
    HashRecord, ParseMode, PathEncoding, Record, RecordBatch, RecordWriter, SizeRecord,
};
pub use replay::{replay, ReplayOutcome, ReplayRecord, ReplayRejection};
pub use store::{
    common_root, Fingerprinter, FingerprintStore, RelativeEntry, RelativeStore, StoreEntry,
};
pub use tree::{FileTree, TreeStats};
