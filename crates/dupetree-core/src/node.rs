//! File and directory node types.

use std::cell::OnceCell;
use std::collections::HashSet;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use compact_str::CompactString;
use md5::{Digest, Md5};
use serde::{Deserialize, Serialize};

use crate::error::HashParseError;

/// Index of a directory within a [`FileTree`](crate::FileTree).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DirId(pub usize);

/// Index of a file within a [`FileTree`](crate::FileTree).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FileId(pub usize);

/// Index of a duplicate set produced by the duplicate index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DuplicateSetId(pub usize);

/// MD5 content fingerprint. Used to identify identical files, not for integrity.
///
/// Ordering is numeric on the 128-bit value, which is also the lexicographic
/// order of the hex rendering.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct ContentHash(pub [u8; 16]);

impl ContentHash {
    /// Length of the hex rendering.
    pub const HEX_LEN: usize = 32;

    /// Create a new ContentHash from raw bytes.
    pub fn new(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    /// Hash an in-memory buffer.
    pub fn of(data: &[u8]) -> Self {
        Self::from_digest(Md5::new_with_prefix(data))
    }

    /// Finish a streaming MD5 accumulator.
    pub fn from_digest(hasher: Md5) -> Self {
        let digest = hasher.finalize();
        let mut bytes = [0u8; 16];
        bytes.copy_from_slice(&digest);
        Self(bytes)
    }

    /// Get the hash as a hex string.
    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{b:02x}")).collect()
    }

    /// Parse exactly 32 hex characters (either case).
    pub fn from_hex(s: &str) -> Result<Self, HashParseError> {
        if s.len() != Self::HEX_LEN {
            return Err(HashParseError::Length(s.chars().count()));
        }

        let mut bytes = [0u8; 16];
        for (slot, pair) in bytes.iter_mut().zip(s.as_bytes().chunks_exact(2)) {
            *slot = (hex_value(pair[0])? << 4) | hex_value(pair[1])?;
        }
        Ok(Self(bytes))
    }
}

fn hex_value(c: u8) -> Result<u8, HashParseError> {
    match c {
        b'0'..=b'9' => Ok(c - b'0'),
        b'a'..=b'f' => Ok(c - b'a' + 10),
        b'A'..=b'F' => Ok(c - b'A' + 10),
        _ => Err(HashParseError::InvalidChar(char::from(c))),
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentHash({})", self.to_hex())
    }
}

impl FromStr for ContentHash {
    type Err = HashParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl From<ContentHash> for String {
    fn from(hash: ContentHash) -> Self {
        hash.to_hex()
    }
}

impl TryFrom<String> for ContentHash {
    type Error = HashParseError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::from_hex(&s)
    }
}

/// A file leaf. Owned by exactly one directory.
#[derive(Debug, Clone)]
pub struct FileNode {
    /// Position in the tree arena.
    pub id: FileId,

    /// File name (not full path).
    pub name: CompactString,

    /// Absolute path, the file's identity.
    pub path: PathBuf,

    /// Size in bytes, `None` when replayed without a size record.
    pub size: Option<u64>,

    /// Owning directory.
    pub parent: DirId,

    /// Set by the duplicate index; `None` means unique (or not yet indexed).
    pub duplicates: Option<DuplicateSetId>,

    hash: OnceCell<ContentHash>,
}

impl FileNode {
    pub(crate) fn new(
        id: FileId,
        name: impl Into<CompactString>,
        path: PathBuf,
        size: Option<u64>,
        parent: DirId,
        hash: Option<ContentHash>,
    ) -> Self {
        let cell = OnceCell::new();
        if let Some(hash) = hash {
            let _ = cell.set(hash);
        }
        Self {
            id,
            name: name.into(),
            path,
            size,
            parent,
            duplicates: None,
            hash: cell,
        }
    }

    /// The cached content hash, if it has been computed or replayed.
    pub fn hash(&self) -> Option<ContentHash> {
        self.hash.get().copied()
    }

    /// Return the cached hash, computing it with `compute` on first use.
    ///
    /// A failed computation caches nothing, so a later call may retry.
    pub fn hash_or_compute<E>(
        &self,
        compute: impl FnOnce() -> Result<ContentHash, E>,
    ) -> Result<ContentHash, E> {
        if let Some(hash) = self.hash.get() {
            return Ok(*hash);
        }
        let hash = compute()?;
        Ok(*self.hash.get_or_init(|| hash))
    }

    /// Check if the file shares its content with at least one other file.
    pub fn is_duplicated(&self) -> bool {
        self.duplicates.is_some()
    }
}

/// A directory. Exclusively owns its direct files and subdirectories.
#[derive(Debug, Clone)]
pub struct DirNode {
    /// Position in the tree arena.
    pub id: DirId,

    /// Directory name (full path for the root).
    pub name: CompactString,

    /// Absolute path, the directory's identity.
    pub path: PathBuf,

    /// Parent back-reference, `None` only for the root.
    pub parent: Option<DirId>,

    /// Direct files, in insertion order.
    pub files: Vec<FileId>,

    /// Direct subdirectories, in insertion order.
    pub subdirs: Vec<DirId>,

    pub(crate) contained_hashes: OnceCell<HashSet<ContentHash>>,
    entirely_duplicated: OnceCell<bool>,
}

impl DirNode {
    pub(crate) fn new(
        id: DirId,
        name: impl Into<CompactString>,
        path: PathBuf,
        parent: Option<DirId>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            path,
            parent,
            files: Vec::new(),
            subdirs: Vec::new(),
            contained_hashes: OnceCell::new(),
            entirely_duplicated: OnceCell::new(),
        }
    }

    /// Check if the directory has no files and no subdirectories.
    pub fn is_empty(&self) -> bool {
        self.files.is_empty() && self.subdirs.is_empty()
    }

    /// The memoized entirely-duplicated verdict, if already decided.
    pub fn entirely_duplicated(&self) -> Option<bool> {
        self.entirely_duplicated.get().copied()
    }

    /// Memoize the entirely-duplicated verdict.
    ///
    /// The first verdict wins; it is only cleared by
    /// [`FileTree::reset_analysis`](crate::FileTree::reset_analysis).
    pub fn memoize_entirely_duplicated(&self, verdict: bool) -> bool {
        *self.entirely_duplicated.get_or_init(|| verdict)
    }

    pub(crate) fn reset_memos(&mut self) {
        self.contained_hashes = OnceCell::new();
        self.entirely_duplicated = OnceCell::new();
    }
}
