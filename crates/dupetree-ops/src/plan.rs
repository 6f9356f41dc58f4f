//! Missing lists and the copy plan built from them.
//!
//! A missing list holds one base64 encoded absolute path per line, as written
//! by the set-difference reports. Each path is re-rooted from the source tree
//! under the destination tree, and the plan records every directory that has
//! to be created first, once.

use std::collections::HashSet;
use std::fmt;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Component, Path, PathBuf};

use tracing::debug;

use dupetree_core::record::{decode_base64_path, display_lossy};

use crate::OperationError;

/// Decoded paths of a missing list, with the lines that could not be decoded.
#[derive(Debug, Clone, Default)]
pub struct MissingList {
    /// (1-based line number, path) in file order.
    pub entries: Vec<(usize, PathBuf)>,
    pub errors: Vec<OperationError>,
    /// Lines read, blank ones included.
    pub lines: usize,
}

/// Read a missing list. Undecodable lines are collected, not fatal.
pub fn read_missing_list(reader: impl BufRead) -> io::Result<MissingList> {
    let mut list = MissingList::default();

    for (index, line) in reader.split(b'\n').enumerate() {
        let line_no = index + 1;
        let mut bytes = line?;
        list.lines = line_no;
        if bytes.last() == Some(&b'\r') {
            bytes.pop();
        }
        if bytes.is_empty() {
            continue;
        }

        let decoded = std::str::from_utf8(&bytes)
            .map_err(|_| "line is not valid UTF-8".to_string())
            .and_then(|field| decode_base64_path(field.trim()).map_err(|e| e.to_string()));
        match decoded {
            Ok(path) => list.entries.push((line_no, path)),
            Err(message) => list.errors.push(OperationError::BadLine {
                line: line_no,
                message,
            }),
        }
    }

    Ok(list)
}

/// Open and read a missing list file.
pub fn load_missing_list(path: &Path) -> io::Result<MissingList> {
    read_missing_list(BufReader::new(File::open(path)?))
}

/// One filesystem step of a copy run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CopyStep {
    MakeDir(PathBuf),
    Copy {
        source: PathBuf,
        destination: PathBuf,
    },
}

impl fmt::Display for CopyStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MakeDir(dir) => write!(f, "MKDIR {}", display_lossy(dir)),
            Self::Copy {
                source,
                destination,
            } => write!(
                f,
                "COPY {} -> {}",
                display_lossy(source),
                display_lossy(destination)
            ),
        }
    }
}

/// Ordered steps that copy a set of files from one root to another.
#[derive(Debug, Clone)]
pub struct CopyPlan {
    source_root: PathBuf,
    destination_root: PathBuf,
    steps: Vec<CopyStep>,
    rejected: Vec<OperationError>,
    known_dirs: HashSet<PathBuf>,
    files: usize,
}

impl CopyPlan {
    pub fn new(source_root: impl Into<PathBuf>, destination_root: impl Into<PathBuf>) -> Self {
        Self {
            source_root: source_root.into(),
            destination_root: destination_root.into(),
            steps: Vec::new(),
            rejected: Vec::new(),
            known_dirs: HashSet::new(),
            files: 0,
        }
    }

    /// Plan every entry of `list`. Its decoding errors become rejections.
    pub fn from_missing_list(
        source_root: impl Into<PathBuf>,
        destination_root: impl Into<PathBuf>,
        list: MissingList,
    ) -> Self {
        let mut plan = Self::new(source_root, destination_root);
        plan.rejected = list.errors;
        for (line, path) in &list.entries {
            plan.add(*line, path);
        }
        plan
    }

    /// Plan the copy of `path`, found on `line` of the input.
    ///
    /// Returns false and records a rejection when `path` is not strictly
    /// below the source root.
    pub fn add(&mut self, line: usize, path: &Path) -> bool {
        let Some(relative) = self.relative(path) else {
            debug!(line, path = %display_lossy(path), "rejected path outside source root");
            self.rejected.push(OperationError::OutsideSource {
                line,
                path: path.to_path_buf(),
                root: self.source_root.clone(),
            });
            return false;
        };

        let destination = self.destination_root.join(relative);
        if let Some(parent) = destination.parent() {
            self.ensure_dir(parent);
        }
        self.steps.push(CopyStep::Copy {
            source: path.to_path_buf(),
            destination,
        });
        self.files += 1;
        true
    }

    fn relative<'p>(&self, path: &'p Path) -> Option<&'p Path> {
        let relative = path.strip_prefix(&self.source_root).ok()?;
        let normal = relative.components().next().is_some()
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
        normal.then_some(relative)
    }

    /// Emit a MakeDir for every missing directory up to `dir`, outermost first.
    fn ensure_dir(&mut self, dir: &Path) {
        let mut missing = Vec::new();
        let mut current = Some(dir);
        while let Some(d) = current {
            if d.as_os_str().is_empty() || self.known_dirs.contains(d) {
                break;
            }
            if d.is_dir() {
                self.known_dirs.insert(d.to_path_buf());
                break;
            }
            missing.push(d.to_path_buf());
            current = d.parent();
        }

        for d in missing.into_iter().rev() {
            self.known_dirs.insert(d.clone());
            self.steps.push(CopyStep::MakeDir(d));
        }
    }

    pub fn source_root(&self) -> &Path {
        &self.source_root
    }

    pub fn destination_root(&self) -> &Path {
        &self.destination_root
    }

    pub fn steps(&self) -> &[CopyStep] {
        &self.steps
    }

    pub fn into_steps(self) -> Vec<CopyStep> {
        self.steps
    }

    /// Lines that were not planned.
    pub fn rejected(&self) -> &[OperationError] {
        &self.rejected
    }

    /// Number of files to copy.
    pub fn file_count(&self) -> usize {
        self.files
    }

    /// Number of directories to create.
    pub fn dir_count(&self) -> usize {
        self.steps.len() - self.files
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}
