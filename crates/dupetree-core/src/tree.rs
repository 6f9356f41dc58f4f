//! Arena-backed directory tree and statistics.
//!
//! Directories and files live in two flat vectors and refer to each other by
//! [`DirId`] / [`FileId`]. Children are owned through their parent's id
//! lists; the parent link is a plain index, so the structure stays a strict
//! forest without reference cycles.

use std::collections::{HashMap, HashSet};
use std::ffi::OsStr;
use std::path::{Component, Path, PathBuf};

use compact_str::CompactString;
use serde::{Deserialize, Serialize};

use crate::error::{ScanWarning, TreeError};
use crate::node::{ContentHash, DirId, DirNode, DuplicateSetId, FileId, FileNode};

/// Summary statistics for a tree.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TreeStats {
    /// Total size in bytes of files with a known size.
    pub total_size: u64,
    /// Total number of files.
    pub total_files: u64,
    /// Total number of directories, root excluded.
    pub total_dirs: u64,
    /// Symbolic links seen and skipped.
    pub total_symlinks: u64,
    /// Devices, FIFOs and sockets seen and skipped.
    pub total_special: u64,
    /// Maximum depth reached.
    pub max_depth: u32,
}

impl TreeStats {
    /// Create new empty stats.
    pub fn new() -> Self {
        Self::default()
    }

    /// Update stats with a file entry.
    pub fn record_file(&mut self, size: Option<u64>, depth: u32) {
        self.total_files += 1;
        self.total_size += size.unwrap_or(0);
        self.max_depth = self.max_depth.max(depth);
    }

    /// Record a directory.
    pub fn record_dir(&mut self, depth: u32) {
        self.total_dirs += 1;
        self.max_depth = self.max_depth.max(depth);
    }

    /// Record a symlink.
    pub fn record_symlink(&mut self) {
        self.total_symlinks += 1;
    }

    /// Record a device, FIFO or socket.
    pub fn record_special(&mut self) {
        self.total_special += 1;
    }
}

/// A directory tree annotated with per-file sizes and content hashes.
#[derive(Debug, Clone)]
pub struct FileTree {
    root_path: PathBuf,
    dirs: Vec<DirNode>,
    files: Vec<FileNode>,
    dir_index: HashMap<PathBuf, DirId>,
    file_index: HashMap<PathBuf, FileId>,

    /// Summary statistics.
    pub stats: TreeStats,

    /// Warnings encountered while building the tree.
    pub warnings: Vec<ScanWarning>,
}

impl FileTree {
    /// Create a tree holding only its root directory.
    pub fn new(root_path: impl Into<PathBuf>) -> Self {
        let root_path = root_path.into();
        let name = root_path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| root_path.to_string_lossy().to_string());

        let root = DirNode::new(DirId(0), name, root_path.clone(), None);
        let mut dir_index = HashMap::new();
        dir_index.insert(root_path.clone(), DirId(0));

        Self {
            root_path,
            dirs: vec![root],
            files: Vec::new(),
            dir_index,
            file_index: HashMap::new(),
            stats: TreeStats::new(),
            warnings: Vec::new(),
        }
    }

    /// The root directory id.
    pub fn root(&self) -> DirId {
        DirId(0)
    }

    /// The root path this tree describes.
    pub fn root_path(&self) -> &Path {
        &self.root_path
    }

    /// Look up a directory node.
    pub fn dir(&self, id: DirId) -> &DirNode {
        &self.dirs[id.0]
    }

    /// Look up a file node.
    pub fn file(&self, id: FileId) -> &FileNode {
        &self.files[id.0]
    }

    /// All directories in creation order, root first.
    pub fn dirs(&self) -> impl Iterator<Item = &DirNode> {
        self.dirs.iter()
    }

    /// All files in creation order.
    pub fn files(&self) -> impl Iterator<Item = &FileNode> {
        self.files.iter()
    }

    pub fn dir_count(&self) -> usize {
        self.dirs.len()
    }

    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    /// Find a directory by absolute path.
    pub fn find_dir(&self, path: &Path) -> Option<DirId> {
        self.dir_index.get(path).copied()
    }

    /// Find a file by absolute path.
    pub fn find_file(&self, path: &Path) -> Option<FileId> {
        self.file_index.get(path).copied()
    }

    /// Attach a subdirectory, or return the existing one with that name.
    pub fn add_directory(&mut self, parent: DirId, name: impl AsRef<OsStr>) -> DirId {
        let name = name.as_ref();
        let path = self.dirs[parent.0].path.join(name);
        if let Some(&existing) = self.dir_index.get(&path) {
            return existing;
        }

        let id = DirId(self.dirs.len());
        self.dirs
            .push(DirNode::new(id, display_name(name), path.clone(), Some(parent)));
        self.dirs[parent.0].subdirs.push(id);
        self.dir_index.insert(path, id);
        id
    }

    /// Attach a file leaf. A hash, when given, is cached and never recomputed.
    pub fn add_file(
        &mut self,
        parent: DirId,
        name: impl AsRef<OsStr>,
        size: Option<u64>,
        hash: Option<ContentHash>,
    ) -> Result<FileId, TreeError> {
        let name = name.as_ref();
        let path = self.dirs[parent.0].path.join(name);
        if self.file_index.contains_key(&path) {
            return Err(TreeError::DuplicatePath { path });
        }

        let id = FileId(self.files.len());
        self.files.push(FileNode::new(
            id,
            display_name(name),
            path.clone(),
            size,
            parent,
            hash,
        ));
        self.dirs[parent.0].files.push(id);
        self.file_index.insert(path, id);
        Ok(id)
    }

    /// Locate the directory at `path`, creating every missing ancestor.
    ///
    /// Each created directory is attached to its parent, so the result is
    /// still a single-rooted forest. Fails with [`TreeError::PathMismatch`]
    /// when `path` does not descend from the root.
    pub fn ensure_directory(&mut self, path: &Path) -> Result<DirId, TreeError> {
        if let Some(&id) = self.dir_index.get(path) {
            return Ok(id);
        }

        let mismatch = || TreeError::PathMismatch {
            path: path.to_path_buf(),
            root: self.root_path.clone(),
        };
        let relative = path.strip_prefix(&self.root_path).map_err(|_| mismatch())?;

        // `..` or a second root would escape the tree
        let mut names = Vec::new();
        for component in relative.components() {
            match component {
                Component::Normal(name) => names.push(name.to_os_string()),
                Component::CurDir => {}
                _ => return Err(mismatch()),
            }
        }

        let mut current = self.root();
        for name in names {
            current = self.add_directory(current, name);
        }
        Ok(current)
    }

    /// Attach a file at an absolute path, creating intermediate directories.
    pub fn insert_file(
        &mut self,
        path: &Path,
        size: Option<u64>,
        hash: Option<ContentHash>,
    ) -> Result<FileId, TreeError> {
        let mismatch = || TreeError::PathMismatch {
            path: path.to_path_buf(),
            root: self.root_path.clone(),
        };
        let (Some(parent_path), Some(name)) = (path.parent(), path.file_name()) else {
            return Err(mismatch());
        };
        if !path.starts_with(&self.root_path) || path == self.root_path {
            return Err(mismatch());
        }

        let parent = self.ensure_directory(parent_path)?;
        self.add_file(parent, name, size, hash)
    }

    /// Files in `dir` and all of its subdirectories, directory files first.
    pub fn files_recursive(&self, dir: DirId) -> FilesRecursive<'_> {
        FilesRecursive {
            tree: self,
            stack: vec![dir],
            current: Vec::new().into_iter(),
        }
    }

    /// Every ancestor of `dir`, nearest first. The directory itself is excluded.
    pub fn ancestors(&self, dir: DirId) -> impl Iterator<Item = DirId> + '_ {
        std::iter::successors(self.dirs[dir.0].parent, |id| self.dirs[id.0].parent)
    }

    /// Whether `file` lives in `dir` or anywhere below it.
    pub fn contains_file(&self, dir: DirId, file: FileId) -> bool {
        let parent = self.files[file.0].parent;
        parent == dir || self.ancestors(parent).any(|a| a == dir)
    }

    /// Recursive (known size sum, file count) of a directory.
    pub fn subtree_totals(&self, dir: DirId) -> (u64, u64) {
        self.files_recursive(dir)
            .fold((0, 0), |(size, count), id| {
                (size + self.files[id.0].size.unwrap_or(0), count + 1)
            })
    }

    /// Every hash reachable in this subtree, memoized per directory.
    ///
    /// Files whose hash has not been computed yet contribute nothing.
    pub fn contained_hashes(&self, dir: DirId) -> &HashSet<ContentHash> {
        let node = &self.dirs[dir.0];
        node.contained_hashes.get_or_init(|| {
            let mut hashes: HashSet<ContentHash> = node
                .files
                .iter()
                .filter_map(|id| self.files[id.0].hash())
                .collect();
            for &sub in &node.subdirs {
                hashes.extend(self.contained_hashes(sub).iter().copied());
            }
            hashes
        })
    }

    /// Point a file at its duplicate set.
    pub fn set_duplicates(&mut self, file: FileId, set: Option<DuplicateSetId>) {
        self.files[file.0].duplicates = set;
    }

    /// Drop duplicate links and every memoized directory value.
    pub fn reset_analysis(&mut self) {
        for file in &mut self.files {
            file.duplicates = None;
        }
        for dir in &mut self.dirs {
            dir.reset_memos();
        }
    }

    /// Check if there were any warnings while building.
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}

fn display_name(name: &OsStr) -> CompactString {
    CompactString::new(name.to_string_lossy())
}

/// Depth-first iterator over the files of a subtree.
pub struct FilesRecursive<'a> {
    tree: &'a FileTree,
    stack: Vec<DirId>,
    current: std::vec::IntoIter<FileId>,
}

impl Iterator for FilesRecursive<'_> {
    type Item = FileId;

    fn next(&mut self) -> Option<FileId> {
        loop {
            if let Some(id) = self.current.next() {
                return Some(id);
            }
            let dir = self.tree.dir(self.stack.pop()?);
            self.current = dir.files.clone().into_iter();
            self.stack.extend(dir.subdirs.iter().rev());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_tree() -> FileTree {
        let mut tree = FileTree::new("/data");
        let root = tree.root();
        let a = tree.add_directory(root, "a");
        let b = tree.add_directory(a, "b");
        tree.add_file(root, "top.txt", Some(1), None).unwrap();
        tree.add_file(a, "mid.txt", Some(10), None).unwrap();
        tree.add_file(b, "deep.txt", Some(100), None).unwrap();
        tree
    }

    #[test]
    fn test_tree_stats_default() {
        let stats = TreeStats::default();
        assert_eq!(stats.total_size, 0);
        assert_eq!(stats.total_files, 0);
        assert_eq!(stats.total_dirs, 0);
    }

    #[test]
    fn test_tree_stats_record_file() {
        let mut stats = TreeStats::new();
        stats.record_file(Some(1024), 2);
        stats.record_file(None, 1);

        assert_eq!(stats.total_files, 2);
        assert_eq!(stats.total_size, 1024);
        assert_eq!(stats.max_depth, 2);
    }

    #[test]
    fn test_add_directory_is_idempotent() {
        let mut tree = FileTree::new("/data");
        let first = tree.add_directory(tree.root(), "x");
        let second = tree.add_directory(tree.root(), "x");
        assert_eq!(first, second);
        assert_eq!(tree.dir(tree.root()).subdirs.len(), 1);
    }

    #[test]
    fn test_duplicate_file_rejected() {
        let mut tree = FileTree::new("/data");
        let root = tree.root();
        tree.add_file(root, "f", Some(1), None).unwrap();
        assert!(matches!(
            tree.add_file(root, "f", Some(1), None),
            Err(TreeError::DuplicatePath { .. })
        ));
    }

    #[test]
    fn test_ensure_directory_creates_ancestors() {
        let mut tree = FileTree::new("/data");
        let deep = tree.ensure_directory(Path::new("/data/x/y/z")).unwrap();

        assert_eq!(tree.dir(deep).path, PathBuf::from("/data/x/y/z"));
        let names: Vec<_> = tree
            .ancestors(deep)
            .map(|id| tree.dir(id).name.to_string())
            .collect();
        assert_eq!(names, vec!["y", "x", "data"]);
    }

    #[test]
    fn test_ensure_directory_rejects_foreign_path() {
        let mut tree = FileTree::new("/data");
        let err = tree.ensure_directory(Path::new("/other/x")).unwrap_err();
        assert!(matches!(err, TreeError::PathMismatch { .. }));
    }

    #[test]
    fn test_insert_file_rejects_root_itself() {
        let mut tree = FileTree::new("/data");
        assert!(tree.insert_file(Path::new("/data"), Some(1), None).is_err());
    }

    #[test]
    fn test_files_recursive_order() {
        let tree = sample_tree();
        let names: Vec<_> = tree
            .files_recursive(tree.root())
            .map(|id| tree.file(id).name.to_string())
            .collect();
        assert_eq!(names, vec!["top.txt", "mid.txt", "deep.txt"]);
    }

    #[test]
    fn test_contains_file_and_totals() {
        let tree = sample_tree();
        let a = tree.find_dir(Path::new("/data/a")).unwrap();
        let top = tree.find_file(Path::new("/data/top.txt")).unwrap();
        let deep = tree.find_file(Path::new("/data/a/b/deep.txt")).unwrap();

        assert!(tree.contains_file(a, deep));
        assert!(!tree.contains_file(a, top));
        assert!(tree.contains_file(tree.root(), top));
        assert_eq!(tree.subtree_totals(a), (110, 2));
    }

    #[test]
    fn test_contained_hashes_skip_unhashed() {
        let mut tree = FileTree::new("/data");
        let root = tree.root();
        let sub = tree.add_directory(root, "sub");
        let h1 = ContentHash::of(b"one");
        tree.add_file(root, "a", Some(3), Some(h1)).unwrap();
        tree.add_file(sub, "b", Some(3), None).unwrap();

        let hashes = tree.contained_hashes(root);
        assert_eq!(hashes.len(), 1);
        assert!(hashes.contains(&h1));
        assert!(tree.contained_hashes(sub).is_empty());
    }
}
