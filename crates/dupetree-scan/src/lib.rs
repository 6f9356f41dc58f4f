//! File system walking and content fingerprinting for dupetree.
//!
//! # Overview
//!
//! `dupetree-scan` is everything in dupetree that touches a live directory:
//!
//! - [`JwalkScanner`] walks a directory into a [`FileTree`] with sizes only
//! - [`DiskFingerprinter`] hashes file content in bounded chunks and stops
//!   between chunks when its [`CancelFlag`] is raised
//! - [`RecordScanner`] keeps hash and size record files in step with a
//!   directory, reusing hashes from an earlier run when sizes still match
//!
//! # Example
//!
//! ```rust,no_run
//! use dupetree_scan::{JwalkScanner, ScanConfig};
//!
//! let config = ScanConfig::new("/path/to/scan");
//! let tree = JwalkScanner::new().scan(&config).unwrap();
//!
//! println!("Total size: {} bytes", tree.stats.total_size);
//! println!("Total files: {}", tree.stats.total_files);
//! ```
//!
//! # Record files
//!
//! ```rust,no_run
//! use dupetree_scan::{RecordPaths, RecordScanOptions, RecordScanner, ScanConfig};
//! use std::path::Path;
//!
//! let paths = RecordPaths::for_directory(Path::new("/data")).unwrap();
//! let summary = RecordScanner::new(ScanConfig::new("/data"), RecordScanOptions::default())
//!     .run(&paths)
//!     .unwrap();
//! println!("hashed {} files, reused {}", summary.hashed, summary.reused);
//! ```

mod fingerprint;
mod progress;
mod records;
mod scanner;

pub use fingerprint::{CancelFlag, DiskFingerprinter};
pub use progress::ScanProgress;
pub use records::{
    load_records, load_store, LoadedStore, RecordPaths, RecordScanOptions, RecordScanSummary,
    RecordScanner,
};
pub use scanner::JwalkScanner;

// Re-export core types for convenience
pub use dupetree_core::{FileTree, ScanConfig, ScanError, ScanWarning, TreeStats, WarningKind};
