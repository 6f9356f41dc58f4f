//! Rebuild a directory tree from flat fingerprint records.
//!
//! Records arrive in any order. For each one the file's directory chain is
//! located or created under the root, then a file leaf is attached with its
//! hash and size already populated, so no file content is ever read.

use std::path::PathBuf;

use tracing::{debug, warn};

use crate::error::TreeError;
use crate::node::ContentHash;
use crate::record::ParseMode;
use crate::tree::FileTree;

/// One (path, hash, size) tuple to replay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplayRecord {
    pub path: PathBuf,
    /// Hash as recorded, 32 hex characters when well formed.
    pub hash: String,
    pub size: Option<u64>,
}

/// A record that was skipped, with its 1-based position in the input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplayRejection {
    pub index: usize,
    pub error: TreeError,
}

/// Result of a replay: the tree plus every skipped record.
#[derive(Debug, Clone)]
pub struct ReplayOutcome {
    pub tree: FileTree,
    pub rejected: Vec<ReplayRejection>,
}

impl ReplayOutcome {
    pub fn rejected_count(&self) -> usize {
        self.rejected.len()
    }
}

/// Build a tree rooted at `root` from `records`.
///
/// Malformed hashes and repeated paths are always skipped and collected.
/// A path outside `root` aborts the replay in [`ParseMode::Strict`] and is
/// skipped in [`ParseMode::Relaxed`].
pub fn replay(
    root: impl Into<PathBuf>,
    records: impl IntoIterator<Item = ReplayRecord>,
    mode: ParseMode,
) -> Result<ReplayOutcome, TreeError> {
    let mut tree = FileTree::new(root);
    let mut rejected = Vec::new();

    for (position, record) in records.into_iter().enumerate() {
        let index = position + 1;

        let hash = match ContentHash::from_hex(record.hash.trim()) {
            Ok(hash) => hash,
            Err(source) => {
                debug!(index, path = %record.path.display(), "rejecting record with bad hash");
                rejected.push(ReplayRejection {
                    index,
                    error: TreeError::InvalidHash {
                        path: record.path,
                        source,
                    },
                });
                continue;
            }
        };

        match tree.insert_file(&record.path, record.size, Some(hash)) {
            Ok(_) => {
                let depth = record
                    .path
                    .strip_prefix(tree.root_path())
                    .map(|rel| rel.components().count() as u32)
                    .unwrap_or(0);
                tree.stats.record_file(record.size, depth);
            }
            Err(error @ TreeError::PathMismatch { .. }) if mode == ParseMode::Strict => {
                return Err(error);
            }
            Err(error) => {
                warn!(index, "skipping record: {error}");
                rejected.push(ReplayRejection { index, error });
            }
        }
    }

    tree.stats.total_dirs = tree.dir_count().saturating_sub(1) as u64;
    Ok(ReplayOutcome { tree, rejected })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn record(path: &str, hash: &str, size: u64) -> ReplayRecord {
        ReplayRecord {
            path: PathBuf::from(path),
            hash: hash.to_string(),
            size: Some(size),
        }
    }

    const H1: &str = "00000000000000000000000000000001";

    #[test]
    fn test_replay_builds_intermediate_dirs() {
        let outcome = replay(
            "/r",
            vec![record("/r/a/b/c.txt", H1, 5), record("/r/a/d.txt", H1, 5)],
            ParseMode::Strict,
        )
        .unwrap();
        let tree = outcome.tree;

        assert_eq!(tree.file_count(), 2);
        assert_eq!(tree.dir_count(), 3);
        assert_eq!(tree.stats.total_dirs, 2);
        let b = tree.find_dir(Path::new("/r/a/b")).unwrap();
        let a = tree.find_dir(Path::new("/r/a")).unwrap();
        assert_eq!(tree.dir(b).parent, Some(a));
        assert_eq!(tree.dir(a).parent, Some(tree.root()));
    }

    #[test]
    fn test_replay_prepopulates_hash() {
        let outcome = replay("/r", vec![record("/r/x", H1, 1)], ParseMode::Strict).unwrap();
        let file = outcome.tree.files().next().unwrap();
        assert_eq!(file.hash().unwrap().to_hex(), H1);
    }

    #[test]
    fn test_bad_hash_rejected_without_abort() {
        let outcome = replay(
            "/r",
            vec![record("/r/x", "nothex", 1), record("/r/y", H1, 1)],
            ParseMode::Strict,
        )
        .unwrap();
        assert_eq!(outcome.tree.file_count(), 1);
        assert_eq!(outcome.rejected_count(), 1);
        assert_eq!(outcome.rejected[0].index, 1);
        assert!(matches!(
            outcome.rejected[0].error,
            TreeError::InvalidHash { .. }
        ));
    }

    #[test]
    fn test_path_mismatch_strict_fails() {
        let result = replay("/r", vec![record("/elsewhere/x", H1, 1)], ParseMode::Strict);
        assert!(matches!(result, Err(TreeError::PathMismatch { .. })));
    }

    #[test]
    fn test_path_mismatch_relaxed_skips() {
        let outcome = replay(
            "/r",
            vec![record("/elsewhere/x", H1, 1), record("/r/x", H1, 1)],
            ParseMode::Relaxed,
        )
        .unwrap();
        assert_eq!(outcome.tree.file_count(), 1);
        assert_eq!(outcome.rejected_count(), 1);
    }

    #[test]
    fn test_parent_components_do_not_escape_root() {
        let result = replay(
            "/r",
            vec![record("/r/a/../../etc/passwd", H1, 1)],
            ParseMode::Strict,
        );
        assert!(matches!(result, Err(TreeError::PathMismatch { .. })));

        let outcome = replay(
            "/r",
            vec![record("/r/a/../../etc/passwd", H1, 1), record("/r/a/x", H1, 1)],
            ParseMode::Relaxed,
        )
        .unwrap();
        assert_eq!(outcome.rejected_count(), 1);
        assert_eq!(outcome.rejected[0].index, 1);
        let paths: Vec<_> = outcome.tree.files().map(|f| f.path.clone()).collect();
        assert_eq!(paths, vec![PathBuf::from("/r/a/x")]);
        assert!(outcome.tree.find_dir(Path::new("/r/a/etc")).is_none());
    }
}
