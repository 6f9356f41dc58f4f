//! Set difference between a reference inventory and a test inventory.
//!
//! Works on fingerprint stores alone, no tree is needed. Three questions
//! can be asked:
//!
//! - [`CompareMode::ByHash`]: which reference content exists nowhere in the
//!   test inventory, whatever its path
//! - [`CompareMode::ByPath`]: which relative paths are absent from test,
//!   and which are present but hold different content
//! - [`CompareMode::FilenamesOnly`]: which relative paths are absent,
//!   ignoring content

use std::collections::HashSet;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use dupetree_core::record::encode_base64_path;
use dupetree_core::{ContentHash, FingerprintStore, RelativeStore};

/// What makes a reference entry count as present in test.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompareMode {
    /// Its hash appears anywhere in test.
    #[default]
    ByHash,
    /// Its relative path appears in test with the same hash.
    ByPath,
    /// Its relative path appears in test.
    FilenamesOnly,
}

/// A reference entry with no counterpart in test.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissingEntry {
    /// Relative path in path modes, absolute path in hash mode.
    pub key: PathBuf,
    /// Where the entry lives in the reference inventory.
    pub absolute: PathBuf,
    pub hash: ContentHash,
}

/// A relative path present on both sides with different content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangedEntry {
    pub relative: PathBuf,
    pub reference: PathBuf,
    pub test: PathBuf,
    pub reference_hash: ContentHash,
    pub test_hash: ContentHash,
}

/// Outcome of one comparison.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DifferenceReport {
    pub mode: CompareMode,
    /// Roots the relative paths were taken against, in path modes.
    pub reference_root: Option<PathBuf>,
    pub test_root: Option<PathBuf>,
    /// Missing entries, in reference order.
    pub missing: Vec<MissingEntry>,
    /// Hash mismatches, in reference order. Never also listed as missing.
    pub changed: Vec<ChangedEntry>,
    /// Distinct missing hashes, in first-seen order.
    pub missing_hashes: Vec<ContentHash>,
    /// Reference entries that took part in the comparison.
    pub reference_entries: usize,
    /// Entries left out because they were not under their root.
    pub reference_outside_root: usize,
    pub test_outside_root: usize,
}

impl DifferenceReport {
    /// True when nothing is missing and nothing changed.
    pub fn is_clean(&self) -> bool {
        self.missing.is_empty() && self.changed.is_empty()
    }

    /// Write the absolute path of every missing entry, one base64 field per
    /// line. This is the input format of a copy run.
    pub fn write_missing_list(&self, mut out: impl Write) -> io::Result<usize> {
        for entry in &self.missing {
            writeln!(out, "{}", encode_base64_path(&entry.absolute))?;
        }
        out.flush()?;
        Ok(self.missing.len())
    }

    /// Write every distinct missing hash, one per line.
    pub fn write_missing_hashes(&self, mut out: impl Write) -> io::Result<usize> {
        for hash in &self.missing_hashes {
            writeln!(out, "{hash}")?;
        }
        out.flush()?;
        Ok(self.missing_hashes.len())
    }
}

/// Roots for a path comparison. `None` means the common root of the
/// store's recorded parent directories.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompareRoots {
    pub reference: Option<PathBuf>,
    pub test: Option<PathBuf>,
}

/// Compare `reference` against `test` under `mode`.
pub fn compare(
    reference: &FingerprintStore,
    test: &FingerprintStore,
    mode: CompareMode,
    roots: &CompareRoots,
) -> DifferenceReport {
    match mode {
        CompareMode::ByHash => missing_by_hash(reference, test),
        CompareMode::ByPath | CompareMode::FilenamesOnly => {
            let reference_root = resolve_root(reference, roots.reference.as_deref());
            let test_root = resolve_root(test, roots.test.as_deref());
            debug!(
                reference = %reference_root.display(),
                test = %test_root.display(),
                "comparing relative paths"
            );
            let mut report = missing_by_path(
                &reference.relative_to(&reference_root),
                &test.relative_to(&test_root),
                mode == CompareMode::FilenamesOnly,
            );
            report.reference_root = Some(reference_root);
            report.test_root = Some(test_root);
            report
        }
    }
}

fn resolve_root(store: &FingerprintStore, explicit: Option<&Path>) -> PathBuf {
    explicit
        .map(Path::to_path_buf)
        .or_else(|| store.common_root())
        .unwrap_or_default()
}

/// Reference entries whose hash appears nowhere in `test`.
pub fn missing_by_hash(reference: &FingerprintStore, test: &FingerprintStore) -> DifferenceReport {
    let present = test.hashes();
    let mut seen = HashSet::new();
    let mut report = DifferenceReport {
        mode: CompareMode::ByHash,
        reference_entries: reference.len(),
        ..Default::default()
    };

    for (path, entry) in reference.iter() {
        if present.contains(&entry.hash) {
            continue;
        }
        if seen.insert(entry.hash) {
            report.missing_hashes.push(entry.hash);
        }
        report.missing.push(MissingEntry {
            key: path.clone(),
            absolute: path.clone(),
            hash: entry.hash,
        });
    }

    info!(
        missing = report.missing.len(),
        unique = report.missing_hashes.len(),
        "compared by hash"
    );
    report
}

/// Reference entries whose relative path is absent from `test`, plus, when
/// hashes matter, paths whose hash differs.
pub fn missing_by_path(
    reference: &RelativeStore,
    test: &RelativeStore,
    filenames_only: bool,
) -> DifferenceReport {
    let mut report = DifferenceReport {
        mode: if filenames_only {
            CompareMode::FilenamesOnly
        } else {
            CompareMode::ByPath
        },
        reference_entries: reference.len(),
        reference_outside_root: reference.outside_root,
        test_outside_root: test.outside_root,
        ..Default::default()
    };
    let mut seen = HashSet::new();

    for (relative, entry) in reference.iter() {
        match test.get(relative) {
            Some(other) if filenames_only || other.hash == entry.hash => {}
            Some(other) => report.changed.push(ChangedEntry {
                relative: relative.clone(),
                reference: entry.absolute.clone(),
                test: other.absolute.clone(),
                reference_hash: entry.hash,
                test_hash: other.hash,
            }),
            None => {
                if seen.insert(entry.hash) {
                    report.missing_hashes.push(entry.hash);
                }
                report.missing.push(MissingEntry {
                    key: relative.clone(),
                    absolute: entry.absolute.clone(),
                    hash: entry.hash,
                });
            }
        }
    }

    info!(
        missing = report.missing.len(),
        changed = report.changed.len(),
        "compared by path"
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use dupetree_core::HashRecord;

    fn h(n: u8) -> ContentHash {
        ContentHash::new([n; 16])
    }

    fn store(entries: &[(&str, u8)]) -> FingerprintStore {
        FingerprintStore::from_records(
            entries.iter().map(|(p, n)| HashRecord::new(h(*n), *p)),
            Vec::new(),
        )
    }

    #[test]
    fn test_by_hash_ignores_location() {
        let reference = store(&[("/ref/a", 1), ("/ref/b", 2), ("/ref/c", 2)]);
        let test = store(&[("/test/elsewhere/z", 1)]);

        let report = compare(&reference, &test, CompareMode::ByHash, &CompareRoots::default());
        assert_eq!(report.missing.len(), 2);
        assert_eq!(report.missing_hashes, vec![h(2)]);
        assert_eq!(report.missing[0].absolute, PathBuf::from("/ref/b"));
    }

    #[test]
    fn test_by_path_auto_roots() {
        let reference = store(&[("/ref/x/1", 1), ("/ref/y/2", 2)]);
        let test = store(&[("/backup/x/1", 1), ("/backup/y/3", 3)]);

        let report = compare(&reference, &test, CompareMode::ByPath, &CompareRoots::default());
        assert_eq!(report.reference_root, Some(PathBuf::from("/ref")));
        assert_eq!(report.test_root, Some(PathBuf::from("/backup")));
        assert_eq!(report.missing.len(), 1);
        assert_eq!(report.missing[0].key, PathBuf::from("y/2"));
        assert_eq!(report.missing[0].absolute, PathBuf::from("/ref/y/2"));
    }

    #[test]
    fn test_filenames_only_ignores_hash() {
        let reference = store(&[("/ref/a/x", 1)]);
        let test = store(&[("/t/a/x", 3)]);

        let report = compare(
            &reference,
            &test,
            CompareMode::FilenamesOnly,
            &CompareRoots::default(),
        );
        assert!(report.is_clean());
    }

    #[test]
    fn test_explicit_roots_count_outsiders() {
        let reference = store(&[("/ref/keep/a", 1), ("/other/b", 2)]);
        let test = store(&[("/t/keep/a", 1)]);
        let roots = CompareRoots {
            reference: Some(PathBuf::from("/ref")),
            test: Some(PathBuf::from("/t")),
        };

        let report = compare(&reference, &test, CompareMode::ByPath, &roots);
        assert!(report.is_clean());
        assert_eq!(report.reference_outside_root, 1);
        assert_eq!(report.reference_entries, 1);
    }

    #[test]
    fn test_missing_list_is_base64() {
        let reference = store(&[("/ref/a", 1)]);
        let report = missing_by_hash(&reference, &FingerprintStore::new());

        let mut out = Vec::new();
        assert_eq!(report.write_missing_list(&mut out).unwrap(), 1);
        assert_eq!(String::from_utf8(out).unwrap(), "L3JlZi9h\n");

        let mut hashes = Vec::new();
        report.write_missing_hashes(&mut hashes).unwrap();
        assert_eq!(String::from_utf8(hashes).unwrap(), format!("{}\n", h(1)));
    }
}
