//! Destination conflicts and how to resolve them.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// A copy whose destination is already taken.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conflict {
    /// The file being copied.
    pub source: PathBuf,
    /// The destination that already exists.
    pub destination: PathBuf,
    pub kind: ConflictKind,
}

impl Conflict {
    pub fn new(source: PathBuf, destination: PathBuf, kind: ConflictKind) -> Self {
        Self {
            source,
            destination,
            kind,
        }
    }

    /// Classify whatever sits at `destination`, if anything.
    pub fn detect(source: &Path, destination: &Path) -> Option<Self> {
        let metadata = std::fs::symlink_metadata(destination).ok()?;
        let kind = if metadata.is_dir() {
            ConflictKind::DirectoryExists
        } else {
            ConflictKind::FileExists
        };
        Some(Self::new(
            source.to_path_buf(),
            destination.to_path_buf(),
            kind,
        ))
    }
}

/// The kind of conflict encountered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConflictKind {
    /// A file already exists at the destination.
    FileExists,
    /// A directory sits where the file should go.
    DirectoryExists,
}

impl std::fmt::Display for ConflictKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::FileExists => write!(f, "File already exists"),
            Self::DirectoryExists => write!(f, "Directory already exists"),
        }
    }
}

/// How to resolve a conflict. Applies to every conflict of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ConflictResolution {
    /// Leave the existing file alone.
    #[default]
    Skip,
    /// Replace the existing file.
    Overwrite,
    /// Copy next to it under a free name (e.g., "file (1).txt").
    AutoRename,
    /// Stop the run at the first conflict.
    Abort,
}

/// First free sibling name of `path`.
///
/// For "file.txt", tries "file (1).txt", "file (2).txt", etc. Works on raw
/// names so non UTF-8 file names keep their bytes.
pub fn auto_rename_path(path: &Path) -> PathBuf {
    let parent = path.parent().unwrap_or(Path::new(""));
    let stem = path.file_stem().unwrap_or_default();
    let extension = path.extension();

    let mut n: u64 = 1;
    loop {
        let mut name = OsString::from(stem);
        name.push(format!(" ({n})"));
        if let Some(ext) = extension {
            name.push(".");
            name.push(ext);
        }

        let candidate = parent.join(name);
        if std::fs::symlink_metadata(&candidate).is_err() {
            return candidate;
        }
        n += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_auto_rename_path() {
        let renamed = auto_rename_path(Path::new("/nonexistent/dir/test.txt"));
        assert_eq!(renamed, Path::new("/nonexistent/dir/test (1).txt"));
    }

    #[test]
    fn test_auto_rename_no_extension() {
        let renamed = auto_rename_path(Path::new("/nonexistent/dir/testfile"));
        assert_eq!(renamed, Path::new("/nonexistent/dir/testfile (1)"));
    }

    #[test]
    fn test_auto_rename_skips_taken_names() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("a.bin");
        std::fs::write(&path, "x").unwrap();
        std::fs::write(temp.path().join("a (1).bin"), "x").unwrap();

        assert_eq!(auto_rename_path(&path), temp.path().join("a (2).bin"));
    }

    #[test]
    fn test_detect() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("f");
        std::fs::write(&file, "x").unwrap();

        let conflict = Conflict::detect(Path::new("/src/f"), &file).unwrap();
        assert_eq!(conflict.kind, ConflictKind::FileExists);
        let conflict = Conflict::detect(Path::new("/src/d"), temp.path()).unwrap();
        assert_eq!(conflict.kind, ConflictKind::DirectoryExists);
        assert!(Conflict::detect(Path::new("/src/g"), &temp.path().join("g")).is_none());
    }
}
