//! Live directory walk into a [`FileTree`].

use std::collections::HashMap;
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};

use globset::GlobSet;
use jwalk::{DirEntry, Parallelism, WalkDir};
use tokio::sync::broadcast;
use tracing::{debug, info};

use dupetree_core::{DirId, FileTree, ScanConfig, ScanError, ScanWarning, TreeStats, WarningKind};

use crate::fingerprint::CancelFlag;
use crate::progress::{ProgressTracker, ScanProgress};

/// Decides which directory entries a walk never yields.
#[derive(Debug, Clone)]
pub(crate) struct EntryFilter {
    include_hidden: bool,
    hidden_marker: char,
    ignore: GlobSet,
}

impl EntryFilter {
    pub fn from_config(config: &ScanConfig) -> Result<Self, ScanError> {
        Ok(Self {
            include_hidden: config.include_hidden,
            hidden_marker: config.hidden_marker,
            ignore: config.ignore_matcher()?,
        })
    }

    pub fn skips(&self, name: &OsStr) -> bool {
        let name = name.to_string_lossy();
        (!self.include_hidden && name.starts_with(self.hidden_marker)) || self.ignore.is_match(&*name)
    }
}

/// Resolve the configured root to an absolute directory path.
///
/// Symlinks in the root path are kept as written so recorded paths match
/// what the user typed.
pub(crate) fn resolve_root(config: &ScanConfig) -> Result<PathBuf, ScanError> {
    let root = std::path::absolute(&config.root).map_err(|e| ScanError::io(&config.root, e))?;
    let metadata = std::fs::metadata(&root).map_err(|e| ScanError::io(&root, e))?;
    if !metadata.is_dir() {
        return Err(ScanError::NotADirectory { path: root });
    }
    Ok(root)
}

/// Sorted, single-threaded walk that never follows symlinks.
///
/// Filtered entries are removed while each directory is read, so a skipped
/// directory is never descended into.
pub(crate) fn walker(root: &Path, config: &ScanConfig, filter: EntryFilter) -> WalkDir {
    WalkDir::new(root)
        .parallelism(Parallelism::Serial)
        .sort(true)
        .skip_hidden(false)
        .follow_links(false)
        .min_depth(0)
        .max_depth(config.max_depth.map(|d| d as usize).unwrap_or(usize::MAX))
        .process_read_dir(move |_depth, _path, _state, children| {
            children.retain(|child| match child {
                Ok(entry) => !filter.skips(&entry.file_name),
                Err(_) => true,
            });
        })
}

/// Builds a [`FileTree`] from the live filesystem.
///
/// Files get their size only; content hashes are computed later, on demand.
pub struct JwalkScanner {
    progress_tx: broadcast::Sender<ScanProgress>,
    cancel: CancelFlag,
}

impl JwalkScanner {
    pub fn new() -> Self {
        let (progress_tx, _) = broadcast::channel(100);
        Self {
            progress_tx,
            cancel: CancelFlag::new(),
        }
    }

    /// Stop walking when `cancel` is raised.
    pub fn with_cancel(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    /// Subscribe to scan progress updates.
    pub fn subscribe(&self) -> broadcast::Receiver<ScanProgress> {
        self.progress_tx.subscribe()
    }

    /// Walk `config.root` and build its tree.
    ///
    /// Symlinks, special files and unreadable entries are counted and
    /// recorded as warnings; only a bad root or configuration fails, or
    /// [`ScanError::Interrupted`] once the cancel flag is raised.
    pub fn scan(&self, config: &ScanConfig) -> Result<FileTree, ScanError> {
        let root_path = resolve_root(config)?;
        let filter = EntryFilter::from_config(config)?;

        let mut stats = TreeStats::new();
        let mut warnings = Vec::new();
        let mut entries =
            self.collect_entries(config, &root_path, filter, &mut stats, &mut warnings)?;

        let mut tree = FileTree::new(root_path.clone());
        let root = tree.root();
        build_node(&mut tree, root, &root_path, &mut entries, &mut warnings);

        tree.stats = stats;
        tree.warnings = warnings;
        info!(
            root = %root_path.display(),
            files = tree.stats.total_files,
            dirs = tree.stats.total_dirs,
            warnings = tree.warnings.len(),
            "scan complete"
        );
        Ok(tree)
    }

    /// Walk once, grouping entries by their parent directory.
    fn collect_entries(
        &self,
        config: &ScanConfig,
        root_path: &Path,
        filter: EntryFilter,
        stats: &mut TreeStats,
        warnings: &mut Vec<ScanWarning>,
    ) -> Result<HashMap<PathBuf, Vec<EntryInfo>>, ScanError> {
        let mut entries_by_parent: HashMap<PathBuf, Vec<EntryInfo>> = HashMap::new();
        let mut tracker = ProgressTracker::new();

        for entry_result in walker(root_path, config, filter) {
            if self.cancel.is_cancelled() {
                info!(root = %root_path.display(), "walk interrupted");
                return Err(ScanError::Interrupted);
            }
            let entry = match entry_result {
                Ok(entry) => entry,
                Err(err) => {
                    let path = err.path().map(Path::to_path_buf).unwrap_or_default();
                    debug!(path = %path.display(), "walk error: {err}");
                    warnings.push(ScanWarning::read_error(path, &err));
                    tracker.record_error();
                    continue;
                }
            };
            if entry.depth() == 0 {
                continue;
            }

            let Some(info) = classify(&entry, stats, warnings) else {
                continue;
            };
            if info.is_dir {
                tracker.record_dir();
            } else if tracker.record_file(info.path.clone(), info.size.unwrap_or(0)) {
                let _ = self.progress_tx.send(tracker.snapshot());
            }

            if let Some(parent) = info.path.parent() {
                entries_by_parent
                    .entry(parent.to_path_buf())
                    .or_default()
                    .push(info);
            }
        }

        Ok(entries_by_parent)
    }
}

impl Default for JwalkScanner {
    fn default() -> Self {
        Self::new()
    }
}

/// Sort one walk entry into directory, file, or skipped.
fn classify(
    entry: &DirEntry<((), ())>,
    stats: &mut TreeStats,
    warnings: &mut Vec<ScanWarning>,
) -> Option<EntryInfo> {
    let path = entry.path();
    let file_type = entry.file_type();
    let depth = entry.depth() as u32;

    if file_type.is_symlink() {
        debug!(path = %path.display(), "skipping symlink");
        stats.record_symlink();
        return None;
    }
    if file_type.is_dir() {
        stats.record_dir(depth);
        return Some(EntryInfo {
            name: entry.file_name.clone(),
            path,
            size: None,
            is_dir: true,
        });
    }
    if !file_type.is_file() {
        debug!(path = %path.display(), "skipping special file");
        stats.record_special();
        return None;
    }

    match entry.metadata() {
        Ok(metadata) => {
            stats.record_file(Some(metadata.len()), depth);
            Some(EntryInfo {
                name: entry.file_name.clone(),
                path,
                size: Some(metadata.len()),
                is_dir: false,
            })
        }
        Err(err) => {
            warnings.push(ScanWarning::new(
                &path,
                err.to_string(),
                WarningKind::MetadataError,
            ));
            None
        }
    }
}

/// Attach the collected children of `path` under `dir`, depth first.
fn build_node(
    tree: &mut FileTree,
    dir: DirId,
    path: &Path,
    entries_by_parent: &mut HashMap<PathBuf, Vec<EntryInfo>>,
    warnings: &mut Vec<ScanWarning>,
) {
    let children = entries_by_parent.remove(path).unwrap_or_default();

    for child in children {
        if child.is_dir {
            let sub = tree.add_directory(dir, &child.name);
            build_node(tree, sub, &child.path, entries_by_parent, warnings);
        } else if let Err(err) = tree.add_file(dir, &child.name, child.size, None) {
            warnings.push(ScanWarning::read_error(&child.path, &err));
        }
    }
}

/// Temporary struct for collecting entry information.
struct EntryInfo {
    name: OsString,
    path: PathBuf,
    size: Option<u64>,
    is_dir: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn create_test_tree() -> TempDir {
        let temp = TempDir::new().unwrap();
        let root = temp.path();

        fs::create_dir(root.join("dir1")).unwrap();
        fs::create_dir(root.join("dir2")).unwrap();
        fs::create_dir(root.join("dir1/subdir")).unwrap();
        fs::create_dir(root.join(".hidden")).unwrap();

        fs::write(root.join("file1.txt"), "hello").unwrap();
        fs::write(root.join("dir1/file2.txt"), "world world world").unwrap();
        fs::write(root.join("dir1/subdir/file3.txt"), "test").unwrap();
        fs::write(root.join("dir2/file4.txt"), "another file here").unwrap();
        fs::write(root.join(".hidden/secret.txt"), "hidden").unwrap();

        temp
    }

    #[test]
    fn test_basic_scan() {
        let temp = create_test_tree();
        let config = ScanConfig::new(temp.path());

        let tree = JwalkScanner::new().scan(&config).unwrap();

        assert_eq!(tree.stats.total_files, 5);
        assert_eq!(tree.stats.total_dirs, 4);
        assert_eq!(tree.file_count(), 5);
        assert_eq!(tree.dir_count(), 5);
        // sizes known, hashes deferred
        assert!(tree.files().all(|f| f.size.is_some() && f.hash().is_none()));
    }

    #[test]
    fn test_parent_links() {
        let temp = create_test_tree();
        let tree = JwalkScanner::new()
            .scan(&ScanConfig::new(temp.path()))
            .unwrap();

        let root = tree.root_path().to_path_buf();
        let subdir = tree.find_dir(&root.join("dir1/subdir")).unwrap();
        let dir1 = tree.find_dir(&root.join("dir1")).unwrap();
        assert_eq!(tree.dir(subdir).parent, Some(dir1));

        let file3 = tree.find_file(&root.join("dir1/subdir/file3.txt")).unwrap();
        assert_eq!(tree.file(file3).parent, subdir);
        assert_eq!(tree.file(file3).size, Some(4));
    }

    #[test]
    fn test_hidden_entries_skipped() {
        let temp = create_test_tree();
        let config = ScanConfig::builder()
            .root(temp.path())
            .include_hidden(false)
            .build()
            .unwrap();

        let tree = JwalkScanner::new().scan(&config).unwrap();

        assert_eq!(tree.file_count(), 4);
        assert!(tree.find_dir(&tree.root_path().join(".hidden")).is_none());
    }

    #[test]
    fn test_ignore_patterns() {
        let temp = create_test_tree();
        let config = ScanConfig::builder()
            .root(temp.path())
            .ignore_patterns(vec!["dir2".to_string()])
            .build()
            .unwrap();

        let tree = JwalkScanner::new().scan(&config).unwrap();

        assert!(tree.find_dir(&tree.root_path().join("dir2")).is_none());
        assert_eq!(tree.file_count(), 4);
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinks_counted_not_followed() {
        let temp = create_test_tree();
        std::os::unix::fs::symlink(temp.path().join("dir1"), temp.path().join("link")).unwrap();

        let tree = JwalkScanner::new()
            .scan(&ScanConfig::new(temp.path()))
            .unwrap();

        assert_eq!(tree.stats.total_symlinks, 1);
        assert_eq!(tree.file_count(), 5);
    }

    #[test]
    fn test_raised_cancel_flag_interrupts_walk() {
        let temp = create_test_tree();
        let cancel = CancelFlag::new();
        cancel.cancel();

        let result = JwalkScanner::new()
            .with_cancel(cancel)
            .scan(&ScanConfig::new(temp.path()));
        assert!(matches!(result, Err(ScanError::Interrupted)));
    }

    #[test]
    fn test_root_must_be_directory() {
        let temp = create_test_tree();
        let result = JwalkScanner::new().scan(&ScanConfig::new(temp.path().join("file1.txt")));
        assert!(matches!(result, Err(ScanError::NotADirectory { .. })));
    }
}
