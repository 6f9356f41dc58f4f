//! Entirely duplicated directories.
//!
//! A directory is entirely duplicated when every file anywhere below it has
//! a copy somewhere outside of it. The verdict is computed recursively:
//!
//! - a direct file with no duplicates makes the directory unique
//! - a direct file whose copies all sit in this same directory, or all
//!   somewhere inside this subtree, makes the directory unique too, since
//!   nothing outside holds that content
//! - otherwise the directory is entirely duplicated iff each subdirectory is
//!
//! A directory with no files and no subdirectories is entirely duplicated:
//! it holds no content that could be lost. It is only ever reported as part
//! of a candidate parent, because candidates must contain a duplicated file.
//!
//! Verdicts are memoized on the directory nodes and stay valid until the
//! next [`DuplicateIndex::build`](crate::DuplicateIndex::build).

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::debug;

use dupetree_core::{DirId, FileTree};

use crate::index::DuplicateIndex;

/// A topmost entirely duplicated directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuplicatedDirectory {
    pub dir: DirId,
    pub path: PathBuf,
    /// Sum of the known file sizes below the directory.
    pub total_size: u64,
    /// Number of files below the directory.
    pub file_count: u64,
}

/// Decides and reports entirely duplicated directories.
pub struct SubtreeAnalyzer<'a> {
    tree: &'a FileTree,
    index: &'a DuplicateIndex,
}

impl<'a> SubtreeAnalyzer<'a> {
    /// `index` must have been built over `tree`.
    pub fn new(tree: &'a FileTree, index: &'a DuplicateIndex) -> Self {
        Self { tree, index }
    }

    /// Whether every file under `dir` has a copy outside of `dir`.
    pub fn is_entirely_duplicated(&self, dir: DirId) -> bool {
        let node = self.tree.dir(dir);
        if let Some(verdict) = node.entirely_duplicated() {
            return verdict;
        }
        let verdict = self.compute(dir);
        node.memoize_entirely_duplicated(verdict)
    }

    fn compute(&self, dir: DirId) -> bool {
        let node = self.tree.dir(dir);

        for &file in &node.files {
            let Some(set) = self.tree.file(file).duplicates else {
                return false;
            };
            let members = &self.index.set(set).files;

            if members.iter().all(|&m| self.tree.file(m).parent == dir) {
                return false;
            }
            if members.iter().all(|&m| self.tree.contains_file(dir, m)) {
                return false;
            }
        }

        node.subdirs
            .iter()
            .all(|&sub| self.is_entirely_duplicated(sub))
    }

    /// Entirely duplicated directories whose parent is not, largest first.
    ///
    /// Only directories holding a duplicated file are examined. Ordered by
    /// total size, then file count (for trees without sizes), then path.
    pub fn topmost(&self) -> Vec<DuplicatedDirectory> {
        let mut found: Vec<DuplicatedDirectory> = self
            .index
            .candidate_dirs()
            .filter(|&dir| self.is_topmost(dir))
            .map(|dir| {
                let (total_size, file_count) = self.tree.subtree_totals(dir);
                DuplicatedDirectory {
                    dir,
                    path: self.tree.dir(dir).path.clone(),
                    total_size,
                    file_count,
                }
            })
            .collect();

        found.sort_by(|a, b| {
            b.total_size
                .cmp(&a.total_size)
                .then(b.file_count.cmp(&a.file_count))
                .then_with(|| a.path.cmp(&b.path))
        });
        debug!(directories = found.len(), "topmost duplicated directories");
        found
    }

    fn is_topmost(&self, dir: DirId) -> bool {
        self.is_entirely_duplicated(dir)
            && self
                .tree
                .dir(dir)
                .parent
                .is_none_or(|parent| !self.is_entirely_duplicated(parent))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dupetree_core::{ContentHash, FingerprintStore};
    use std::path::Path;

    fn h(n: u8) -> Option<ContentHash> {
        Some(ContentHash::new([n; 16]))
    }

    fn index(tree: &mut FileTree) -> DuplicateIndex {
        DuplicateIndex::build(tree, &mut FingerprintStore::new()).unwrap()
    }

    #[test]
    fn test_copies_only_in_same_dir_are_not_redundant() {
        let mut tree = FileTree::new("/r");
        let a = tree.add_directory(tree.root(), "a");
        tree.add_file(a, "f1", Some(1), h(1)).unwrap();
        tree.add_file(a, "f2", Some(1), h(1)).unwrap();

        let index = index(&mut tree);
        let analyzer = SubtreeAnalyzer::new(&tree, &index);
        assert!(!analyzer.is_entirely_duplicated(a));
        assert!(analyzer.topmost().is_empty());
    }

    #[test]
    fn test_copies_only_deeper_in_subtree_are_not_redundant() {
        let mut tree = FileTree::new("/r");
        let a = tree.add_directory(tree.root(), "a");
        let inner = tree.add_directory(a, "inner");
        tree.add_file(a, "f", Some(1), h(1)).unwrap();
        tree.add_file(inner, "f", Some(1), h(1)).unwrap();

        let index = index(&mut tree);
        let analyzer = SubtreeAnalyzer::new(&tree, &index);
        assert!(!analyzer.is_entirely_duplicated(a));
        // inner's only file has its copy outside inner
        assert!(analyzer.is_entirely_duplicated(inner));
    }

    #[test]
    fn test_verdict_memoized_on_node() {
        let mut tree = FileTree::new("/r");
        let a = tree.add_directory(tree.root(), "a");
        let b = tree.add_directory(tree.root(), "b");
        tree.add_file(a, "f", Some(1), h(1)).unwrap();
        tree.add_file(b, "f", Some(1), h(1)).unwrap();

        let index = index(&mut tree);
        assert_eq!(tree.dir(a).entirely_duplicated(), None);
        SubtreeAnalyzer::new(&tree, &index).is_entirely_duplicated(a);
        assert_eq!(tree.dir(a).entirely_duplicated(), Some(true));

        // a rebuild clears the memo
        let _ = DuplicateIndex::build(&mut tree, &mut FingerprintStore::new());
        assert_eq!(tree.dir(a).entirely_duplicated(), None);
    }

    #[test]
    fn test_topmost_sorted_by_size() {
        let mut tree = FileTree::new("/r");
        let root = tree.root();
        let small = tree.add_directory(root, "small");
        let large = tree.add_directory(root, "large");
        tree.add_file(root, "unique", Some(1), h(9)).unwrap();
        tree.add_file(root, "s", Some(2), h(1)).unwrap();
        tree.add_file(root, "l", Some(50), h(2)).unwrap();
        tree.add_file(small, "s", Some(2), h(1)).unwrap();
        tree.add_file(large, "l", Some(50), h(2)).unwrap();

        let index = index(&mut tree);
        let found = SubtreeAnalyzer::new(&tree, &index).topmost();
        let paths: Vec<_> = found.iter().map(|d| d.path.clone()).collect();
        assert_eq!(
            paths,
            vec![Path::new("/r/large").to_path_buf(), Path::new("/r/small").to_path_buf()]
        );
        assert_eq!(found[0].total_size, 50);
        assert_eq!(found[1].file_count, 1);
    }

    #[test]
    fn test_sizeless_dirs_sorted_by_file_count() {
        let mut tree = FileTree::new("/r");
        let root = tree.root();
        let one = tree.add_directory(root, "one");
        let two = tree.add_directory(root, "two");
        tree.add_file(root, "u", None, h(9)).unwrap();
        for (dir, name, hash) in [(one, "a", 1), (two, "a", 1), (two, "b", 2), (root, "b", 2)] {
            tree.add_file(dir, name, None, h(hash)).unwrap();
        }
        // one/a also matches two/a, root/b matches two/b
        let index = index(&mut tree);
        let found = SubtreeAnalyzer::new(&tree, &index).topmost();
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].path, Path::new("/r/two"));
        assert_eq!(found[0].file_count, 2);
        assert_eq!(found[0].total_size, 0);
    }
}
