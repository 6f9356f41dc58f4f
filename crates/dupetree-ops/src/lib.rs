//! Copy operations for dupetree.
//!
//! Turns a missing list (one base64 path per line, as written by the
//! set-difference reports) into a [`CopyPlan`] and runs it on a tokio task,
//! reporting progress over a channel.

mod conflict;
mod copy;
mod operation;
mod plan;
mod progress;

pub use conflict::{auto_rename_path, Conflict, ConflictKind, ConflictResolution};
pub use copy::{start_copy, CopyOptions, CopyResult};
pub use operation::OperationError;
pub use plan::{load_missing_list, read_missing_list, CopyPlan, CopyStep, MissingList};
pub use progress::{OperationComplete, OperationProgress};

/// Default channel buffer size for operation progress updates.
pub const OPERATION_CHANNEL_SIZE: usize = 100;
