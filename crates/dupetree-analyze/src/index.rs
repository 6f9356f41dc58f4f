//! Size-then-hash grouping of every file in a tree.

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use dupetree_core::{
    ContentHash, DirId, DuplicateSetId, FileId, FileTree, Fingerprinter, ScanError, ScanWarning,
};

/// Files sharing one content hash. Always at least two members.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuplicateSet {
    pub id: DuplicateSetId,
    pub hash: ContentHash,
    /// Size of the content, `None` when no member has a known size.
    pub size: Option<u64>,
    /// Members in tree order.
    pub files: Vec<FileId>,
}

/// Every duplicate set of a tree plus the directories that hold a member.
///
/// Built once over a frozen tree. Building again resets every duplicate
/// link and directory verdict first.
#[derive(Debug, Clone, Default)]
pub struct DuplicateIndex {
    sets: Vec<DuplicateSet>,
    candidates: BTreeSet<DirId>,
    files_considered: u64,
    unreadable: Vec<ScanWarning>,
}

impl DuplicateIndex {
    /// Group the files of `tree` and link every duplicated file to its set.
    ///
    /// Files with a cached hash are grouped by that hash directly. The rest
    /// are hashed with `fingerprinter` only when another file could share
    /// their content: same size, or a size that is not known on either side.
    /// Files that cannot be read are skipped and listed in
    /// [`unreadable`](Self::unreadable). Cancellation is returned as
    /// [`ScanError::Interrupted`].
    pub fn build(
        tree: &mut FileTree,
        fingerprinter: &mut dyn Fingerprinter,
    ) -> Result<Self, ScanError> {
        tree.reset_analysis();

        let mut index = Self::default();

        let mut by_size: HashMap<Option<u64>, usize> = HashMap::new();
        for file in tree.files() {
            index.files_considered += 1;
            *by_size.entry(file.size).or_default() += 1;
        }
        let total = index.files_considered;
        let unknown_sizes = by_size.get(&None).copied().unwrap_or(0);
        let may_share = |size: Option<u64>| match size {
            Some(size) => by_size.get(&Some(size)).copied().unwrap_or(0) >= 2 || unknown_sizes > 0,
            None => total >= 2,
        };

        let mut by_hash: HashMap<ContentHash, Vec<FileId>> = HashMap::new();
        let mut hashed = 0u64;
        for file in tree.files() {
            if let Some(hash) = file.hash() {
                by_hash.entry(hash).or_default().push(file.id);
                continue;
            }
            if !may_share(file.size) {
                continue;
            }

            hashed += 1;
            match file.hash_or_compute(|| fingerprinter.fingerprint(&file.path)) {
                Ok(hash) => by_hash.entry(hash).or_default().push(file.id),
                Err(err) if err.is_skippable() => {
                    warn!(path = %file.path.display(), "skipping unreadable file: {err}");
                    index.unreadable.push(ScanWarning::from_error(&file.path, &err));
                }
                Err(err) => return Err(err),
            }
        }
        debug!(hashed, size_buckets = by_size.len(), "hashed files sharing a size");
        drop(by_size);

        let mut groups: Vec<(Option<u64>, ContentHash, Vec<FileId>)> = by_hash
            .drain()
            .filter(|(_, files)| files.len() >= 2)
            .map(|(hash, mut files)| {
                files.sort_unstable();
                let size = files.iter().find_map(|&id| tree.file(id).size);
                (size, hash, files)
            })
            .collect();
        drop(by_hash);
        groups.sort_unstable_by(|a, b| (b.0, b.1).cmp(&(a.0, a.1)));

        for (position, (size, hash, files)) in groups.into_iter().enumerate() {
            let id = DuplicateSetId(position);
            for &file in &files {
                tree.set_duplicates(file, Some(id));
                index.mark_ancestors(tree, file);
            }
            index.sets.push(DuplicateSet {
                id,
                hash,
                size,
                files,
            });
        }

        info!(
            considered = index.files_considered,
            sets = index.sets.len(),
            candidates = index.candidates.len(),
            unreadable = index.unreadable.len(),
            "duplicate index built"
        );
        Ok(index)
    }

    /// Record the parent of `file` and every ancestor above it.
    fn mark_ancestors(&mut self, tree: &FileTree, file: FileId) {
        let parent = tree.file(file).parent;
        assert!(
            parent.0 < tree.dir_count(),
            "found orphaned file {}",
            tree.file(file).path.display()
        );

        // an already-marked directory has all of its ancestors marked
        if !self.candidates.insert(parent) {
            return;
        }
        for ancestor in tree.ancestors(parent) {
            if !self.candidates.insert(ancestor) {
                break;
            }
        }
    }

    /// Duplicate sets ordered by (size, hash), largest first.
    pub fn sets(&self) -> &[DuplicateSet] {
        &self.sets
    }

    pub fn set(&self, id: DuplicateSetId) -> &DuplicateSet {
        &self.sets[id.0]
    }

    pub fn len(&self) -> usize {
        self.sets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }

    /// Directories with at least one duplicated file somewhere below them.
    pub fn candidate_dirs(&self) -> impl Iterator<Item = DirId> + '_ {
        self.candidates.iter().copied()
    }

    pub fn is_candidate(&self, dir: DirId) -> bool {
        self.candidates.contains(&dir)
    }

    /// Files looked at while building.
    pub fn files_considered(&self) -> u64 {
        self.files_considered
    }

    /// Total number of files that belong to some duplicate set.
    pub fn duplicated_file_count(&self) -> usize {
        self.sets.iter().map(|s| s.files.len()).sum()
    }

    /// Files skipped because their content could not be read.
    pub fn unreadable(&self) -> &[ScanWarning] {
        &self.unreadable
    }
}
