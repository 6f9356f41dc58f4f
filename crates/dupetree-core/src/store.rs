//! In-memory fingerprint store.

use std::collections::{HashMap, HashSet};
use std::path::{Component, Path, PathBuf};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{ScanError, TreeError};
use crate::node::ContentHash;
use crate::record::{HashRecord, ParseMode, PathEncoding, SizeRecord};
use crate::replay::{replay, ReplayOutcome, ReplayRecord};

/// Source of content hashes for files whose hash is not cached yet.
pub trait Fingerprinter {
    /// Produce the content hash of the file at `path`.
    fn fingerprint(&mut self, path: &Path) -> Result<ContentHash, ScanError>;
}

/// What is known about one path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreEntry {
    pub hash: ContentHash,
    pub size: Option<u64>,
    pub encoding: PathEncoding,
}

/// Mapping from absolute path to (hash, size), in first-seen order.
///
/// Inserting a path again replaces its entry in place, so a record file
/// that accumulated several lines for one path resolves to the last line.
#[derive(Debug, Clone, Default)]
pub struct FingerprintStore {
    entries: IndexMap<PathBuf, StoreEntry>,
}

impl FingerprintStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Join hash records with size records on path.
    ///
    /// Size records without a matching hash record are ignored.
    pub fn from_records(
        hashes: impl IntoIterator<Item = HashRecord>,
        sizes: impl IntoIterator<Item = SizeRecord>,
    ) -> Self {
        let sizes: HashMap<PathBuf, u64> = sizes.into_iter().map(|r| (r.path, r.size)).collect();

        let mut store = Self::new();
        for record in hashes {
            let size = sizes.get(&record.path).copied();
            store.insert(
                record.path,
                StoreEntry {
                    hash: record.hash,
                    size,
                    encoding: record.encoding,
                },
            );
        }
        store
    }

    /// Insert or replace the entry for `path`.
    pub fn insert(&mut self, path: impl Into<PathBuf>, entry: StoreEntry) -> Option<StoreEntry> {
        self.entries.insert(path.into(), entry)
    }

    pub fn get(&self, path: &Path) -> Option<&StoreEntry> {
        self.entries.get(path)
    }

    pub fn remove(&mut self, path: &Path) -> Option<StoreEntry> {
        self.entries.shift_remove(path)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&PathBuf, &StoreEntry)> {
        self.entries.iter()
    }

    /// Every distinct hash in the store.
    pub fn hashes(&self) -> HashSet<ContentHash> {
        self.entries.values().map(|e| e.hash).collect()
    }

    /// Longest common directory of every recorded file.
    pub fn common_root(&self) -> Option<PathBuf> {
        common_root(self.entries.keys().filter_map(|p| p.parent()))
    }

    /// Re-key the store by path relative to `root`.
    ///
    /// Entries outside `root` are left out and counted.
    pub fn relative_to(&self, root: &Path) -> RelativeStore {
        let mut relative = RelativeStore {
            root: root.to_path_buf(),
            entries: IndexMap::new(),
            outside_root: 0,
        };

        for (path, entry) in &self.entries {
            match path.strip_prefix(root) {
                Ok(rel) if !rel.as_os_str().is_empty() => {
                    relative.entries.insert(
                        rel.to_path_buf(),
                        RelativeEntry {
                            absolute: path.clone(),
                            hash: entry.hash,
                        },
                    );
                }
                _ => relative.outside_root += 1,
            }
        }
        relative
    }

    /// Entries as replay input, in store order.
    pub fn replay_records(&self) -> impl Iterator<Item = ReplayRecord> + '_ {
        self.entries.iter().map(|(path, entry)| ReplayRecord {
            path: path.clone(),
            hash: entry.hash.to_hex(),
            size: entry.size,
        })
    }

    /// Replay the store into a tree rooted at `root`.
    pub fn to_tree(&self, root: &Path, mode: ParseMode) -> Result<ReplayOutcome, TreeError> {
        replay(root, self.replay_records(), mode)
    }
}

impl Fingerprinter for FingerprintStore {
    fn fingerprint(&mut self, path: &Path) -> Result<ContentHash, ScanError> {
        self.get(path)
            .map(|entry| entry.hash)
            .ok_or_else(|| ScanError::Unrecorded {
                path: path.to_path_buf(),
            })
    }
}

/// Longest common prefix, component-wise, of a set of paths.
pub fn common_root<'a>(paths: impl IntoIterator<Item = &'a Path>) -> Option<PathBuf> {
    let mut paths = paths.into_iter();
    let mut common: Vec<Component<'a>> = paths.next()?.components().collect();

    for path in paths {
        let shared = common
            .iter()
            .zip(path.components())
            .take_while(|(a, b)| **a == *b)
            .count();
        common.truncate(shared);
    }
    Some(common.iter().collect())
}

/// A store entry addressed by relative path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelativeEntry {
    pub absolute: PathBuf,
    pub hash: ContentHash,
}

/// Fingerprints keyed by path relative to a root.
#[derive(Debug, Clone)]
pub struct RelativeStore {
    pub root: PathBuf,
    entries: IndexMap<PathBuf, RelativeEntry>,
    /// Entries skipped because they were not under `root`.
    pub outside_root: usize,
}

impl RelativeStore {
    pub fn get(&self, relative: &Path) -> Option<&RelativeEntry> {
        self.entries.get(relative)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&PathBuf, &RelativeEntry)> {
        self.entries.iter()
    }

    pub fn hashes(&self) -> HashSet<ContentHash> {
        self.entries.values().map(|e| e.hash).collect()
    }
}
