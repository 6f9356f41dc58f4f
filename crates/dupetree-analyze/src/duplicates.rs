//! Duplicate file and directory report.
//!
//! Two phases, each only as expensive as it needs to be:
//! 1. Group files by size (no I/O)
//! 2. Hash only the files that share a size, and group by hash
//!
//! The resulting [`DuplicateIndex`] then feeds the [`SubtreeAnalyzer`],
//! which finds the topmost directories whose whole content exists elsewhere.

use std::path::PathBuf;

use derive_builder::Builder;
use serde::{Deserialize, Serialize};

use dupetree_core::{ContentHash, FileTree, Fingerprinter, ScanError};

use crate::index::DuplicateIndex;
use crate::subtree::{DuplicatedDirectory, SubtreeAnalyzer};

/// Configuration for duplicate detection.
#[derive(Debug, Clone, Builder, Serialize, Deserialize)]
#[builder(setter(into))]
pub struct DuplicateConfig {
    /// Smallest group or directory size to report.
    ///
    /// Every file still takes part in directory analysis, so a small copy
    /// never makes its directory look unique.
    #[builder(default = "0")]
    #[serde(default)]
    pub min_size: u64,

    /// Maximum number of groups to report (0 = unlimited).
    ///
    /// Only the report is truncated; directory analysis always sees every set.
    #[builder(default = "0")]
    #[serde(default)]
    pub max_groups: usize,
}

impl Default for DuplicateConfig {
    fn default() -> Self {
        Self {
            min_size: 0,
            max_groups: 0,
        }
    }
}

impl DuplicateConfig {
    /// Create a new config builder.
    pub fn builder() -> DuplicateConfigBuilder {
        DuplicateConfigBuilder::default()
    }
}

/// A group of duplicate files sharing the same content.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DuplicateGroup {
    /// Content hash shared by all files in this group.
    pub hash: ContentHash,

    /// Size of each file in bytes, if known.
    pub size: Option<u64>,

    /// Paths to all duplicate files.
    pub paths: Vec<PathBuf>,

    /// Wasted space: size * (count - 1).
    pub wasted_bytes: u64,
}

impl DuplicateGroup {
    /// Get the number of duplicate files.
    pub fn count(&self) -> usize {
        self.paths.len()
    }

    /// Check if keeping one file, how many could be deleted.
    pub fn deletable_count(&self) -> usize {
        self.paths.len().saturating_sub(1)
    }
}

/// Results from duplicate analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DuplicateReport {
    /// Groups ordered by (size, hash), largest first.
    pub groups: Vec<DuplicateGroup>,

    /// Topmost entirely duplicated directories, largest first.
    pub directories: Vec<DuplicatedDirectory>,

    /// Total size of all duplicate files.
    pub total_duplicate_size: u64,

    /// Total wasted space (could be reclaimed).
    pub total_wasted_space: u64,

    /// Number of files analyzed.
    pub files_analyzed: u64,

    /// Number of files that have duplicates.
    pub files_with_duplicates: u64,

    /// Number of duplicate groups at or above `min_size`, before any
    /// `max_groups` cut.
    pub group_count: usize,

    /// Files skipped because they could not be read.
    pub unreadable_files: usize,
}

impl DuplicateReport {
    /// Check if any duplicates were found.
    pub fn has_duplicates(&self) -> bool {
        !self.groups.is_empty()
    }

    /// Get total number of duplicate files across the reported groups.
    pub fn total_duplicate_files(&self) -> usize {
        self.groups.iter().map(|g| g.paths.len()).sum()
    }
}

/// Duplicate file and directory finder.
pub struct DuplicateFinder {
    config: DuplicateConfig,
}

impl DuplicateFinder {
    /// Create a new duplicate finder with default config.
    pub fn new() -> Self {
        Self {
            config: DuplicateConfig::default(),
        }
    }

    /// Create a new duplicate finder with custom config.
    pub fn with_config(config: DuplicateConfig) -> Self {
        Self { config }
    }

    /// Index `tree`, analyze its directories and summarize both.
    ///
    /// `fingerprinter` is asked only for files without a cached hash.
    pub fn find_duplicates(
        &self,
        tree: &mut FileTree,
        fingerprinter: &mut dyn Fingerprinter,
    ) -> Result<DuplicateReport, ScanError> {
        let index = DuplicateIndex::build(tree, fingerprinter)?;
        let min_size = self.config.min_size;
        let directories: Vec<DuplicatedDirectory> = SubtreeAnalyzer::new(tree, &index)
            .topmost()
            .into_iter()
            .filter(|dir| dir.total_size >= min_size)
            .collect();

        let mut groups: Vec<DuplicateGroup> = index
            .sets()
            .iter()
            .filter(|set| set.size.is_none_or(|size| size >= min_size))
            .map(|set| {
                let paths: Vec<PathBuf> = set
                    .files
                    .iter()
                    .map(|&id| tree.file(id).path.clone())
                    .collect();
                let wasted_bytes = set.size.unwrap_or(0) * (paths.len() as u64 - 1);
                DuplicateGroup {
                    hash: set.hash,
                    size: set.size,
                    paths,
                    wasted_bytes,
                }
            })
            .collect();

        let group_count = groups.len();
        if self.config.max_groups > 0 && groups.len() > self.config.max_groups {
            groups.truncate(self.config.max_groups);
        }

        let total_duplicate_size: u64 = groups
            .iter()
            .map(|g| g.size.unwrap_or(0) * g.paths.len() as u64)
            .sum();
        let total_wasted_space: u64 = groups.iter().map(|g| g.wasted_bytes).sum();

        Ok(DuplicateReport {
            groups,
            directories,
            total_duplicate_size,
            total_wasted_space,
            files_analyzed: index.files_considered(),
            files_with_duplicates: index.duplicated_file_count() as u64,
            group_count,
            unreadable_files: index.unreadable().len(),
        })
    }
}

impl Default for DuplicateFinder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dupetree_core::FingerprintStore;

    fn h(n: u8) -> Option<ContentHash> {
        Some(ContentHash::new([n; 16]))
    }

    fn sample() -> FileTree {
        let mut tree = FileTree::new("/r");
        let root = tree.root();
        for (name, size, hash) in [("a", 10, 1), ("b", 10, 1), ("c", 10, 1), ("d", 4, 2), ("e", 4, 2)] {
            tree.add_file(root, name, Some(size), h(hash)).unwrap();
        }
        tree
    }

    #[test]
    fn test_report_totals() {
        let mut tree = sample();
        let report = DuplicateFinder::new()
            .find_duplicates(&mut tree, &mut FingerprintStore::new())
            .unwrap();

        assert!(report.has_duplicates());
        assert_eq!(report.group_count, 2);
        assert_eq!(report.groups[0].size, Some(10));
        assert_eq!(report.groups[0].deletable_count(), 2);
        assert_eq!(report.total_wasted_space, 20 + 4);
        assert_eq!(report.total_duplicate_size, 30 + 8);
        assert_eq!(report.files_with_duplicates, 5);
        // all copies live in the root itself
        assert!(report.directories.is_empty());
    }

    #[test]
    fn test_max_groups_truncates_report_only() {
        let mut tree = sample();
        let config = DuplicateConfig::builder().max_groups(1usize).build().unwrap();
        let report = DuplicateFinder::with_config(config)
            .find_duplicates(&mut tree, &mut FingerprintStore::new())
            .unwrap();

        assert_eq!(report.groups.len(), 1);
        assert_eq!(report.group_count, 2);
        assert_eq!(report.total_duplicate_files(), 3);
    }

    #[test]
    fn test_min_size_filters_report_only() {
        let mut tree = FileTree::new("/r");
        let root = tree.root();
        let a = tree.add_directory(root, "a");
        let b = tree.add_directory(root, "b");
        for dir in [a, b] {
            tree.add_file(dir, "big", Some(100), h(1)).unwrap();
            tree.add_file(dir, "empty", Some(0), h(2)).unwrap();
        }

        let config = DuplicateConfig::builder().min_size(1u64).build().unwrap();
        let report = DuplicateFinder::with_config(config)
            .find_duplicates(&mut tree, &mut FingerprintStore::new())
            .unwrap();

        assert_eq!(report.group_count, 1);
        assert_eq!(report.groups[0].size, Some(100));
        assert_eq!(report.files_with_duplicates, 4);
        // the empty copies still count toward both directories
        assert_eq!(report.directories.len(), 2);

        let config = DuplicateConfig::builder().min_size(101u64).build().unwrap();
        let report = DuplicateFinder::with_config(config)
            .find_duplicates(&mut tree, &mut FingerprintStore::new())
            .unwrap();
        assert!(report.groups.is_empty());
        assert!(report.directories.is_empty());
    }
}
