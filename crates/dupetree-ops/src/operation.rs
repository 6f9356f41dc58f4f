//! Copy operation error types.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A problem with one missing-list line or one copy step.
///
/// None of these stop a copy run on their own; they are collected and
/// reported with the completion.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum OperationError {
    /// The line could not be decoded into a path.
    #[error("line {line}: {message}")]
    BadLine { line: usize, message: String },

    /// The decoded path does not live under the source root.
    #[error("line {line}: {} is not under {}", path.display(), root.display())]
    OutsideSource {
        line: usize,
        path: PathBuf,
        root: PathBuf,
    },

    /// A filesystem step failed.
    #[error("{}: {message}", path.display())]
    Failed { path: PathBuf, message: String },

    /// The file was copied but its timestamps were not carried over.
    #[error("{}: timestamps not preserved: {message}", path.display())]
    Timestamps { path: PathBuf, message: String },
}

impl OperationError {
    /// A failed filesystem step.
    pub fn failed(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Failed {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Line number in the missing list, when the error came from one.
    pub fn line(&self) -> Option<usize> {
        match self {
            Self::BadLine { line, .. } | Self::OutsideSource { line, .. } => Some(*line),
            Self::Failed { .. } | Self::Timestamps { .. } => None,
        }
    }
}
