//! Analysis algorithms for dupetree.
//!
//! This crate works on trees and stores that already exist in memory; it
//! never walks a directory itself.
//!
//! - **Duplicate index** - group files by size, then by content hash
//! - **Subtree analysis** - find the topmost directories whose entire
//!   content also exists elsewhere
//! - **Set difference** - compare a reference inventory against a test
//!   inventory by hash or by relative path
//!
//! # Duplicates
//!
//! ```rust,ignore
//! use dupetree_analyze::DuplicateFinder;
//! use dupetree_scan::{DiskFingerprinter, JwalkScanner, ScanConfig};
//!
//! let mut tree = JwalkScanner::new().scan(&ScanConfig::new("/path/to/scan")).unwrap();
//! let report = DuplicateFinder::new()
//!     .find_duplicates(&mut tree, &mut DiskFingerprinter::default())
//!     .unwrap();
//!
//! for dir in &report.directories {
//!     println!("{} entirely duplicated ({} bytes)", dir.path.display(), dir.total_size);
//! }
//! ```
//!
//! # Differences
//!
//! ```rust,ignore
//! use dupetree_analyze::{compare, CompareMode, CompareRoots};
//!
//! let report = compare(&reference, &test, CompareMode::ByPath, &CompareRoots::default());
//! println!("{} missing, {} changed", report.missing.len(), report.changed.len());
//! ```

mod difference;
mod duplicates;
mod index;
mod subtree;

pub use difference::{
    compare, missing_by_hash, missing_by_path, ChangedEntry, CompareMode, CompareRoots,
    DifferenceReport, MissingEntry,
};
pub use duplicates::{
    DuplicateConfig, DuplicateConfigBuilder, DuplicateFinder, DuplicateGroup, DuplicateReport,
};
pub use index::{DuplicateIndex, DuplicateSet};
pub use subtree::{DuplicatedDirectory, SubtreeAnalyzer};

// Re-export core types
pub use dupetree_core::{ContentHash, FileTree, Fingerprinter};
