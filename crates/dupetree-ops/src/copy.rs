//! Async copy of a [`CopyPlan`] with progress reporting.

use std::fs::{self, File, FileTimes};
use std::io;
use std::path::Path;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::conflict::{auto_rename_path, Conflict, ConflictKind, ConflictResolution};
use crate::plan::{CopyPlan, CopyStep};
use crate::progress::{OperationComplete, OperationProgress};
use crate::{OperationError, OPERATION_CHANNEL_SIZE};

/// Result sent through the channel during a copy run.
#[derive(Debug)]
pub enum CopyResult {
    /// Progress update.
    Progress(OperationProgress),
    /// A destination was taken; it is resolved per [`CopyOptions`].
    Conflict(Conflict),
    /// The run finished.
    Complete(OperationComplete),
}

/// Options for copy runs.
#[derive(Debug, Clone)]
pub struct CopyOptions {
    /// How to handle destinations that already exist.
    pub conflict_resolution: ConflictResolution,
    /// Whether to carry modification and access times over.
    pub preserve_timestamps: bool,
}

impl Default for CopyOptions {
    fn default() -> Self {
        Self {
            conflict_resolution: ConflictResolution::Skip,
            preserve_timestamps: true,
        }
    }
}

/// Start copying `plan` on a tokio task.
///
/// Returns a receiver for progress updates and the final result. Once
/// `cancel` fires, the step in flight finishes and the run completes with
/// `aborted` set. Dropping the receiver stops the run after the current
/// step.
pub fn start_copy(
    plan: CopyPlan,
    options: CopyOptions,
    cancel: CancellationToken,
) -> mpsc::Receiver<CopyResult> {
    let (tx, rx) = mpsc::channel(OPERATION_CHANNEL_SIZE);

    tokio::spawn(async move {
        copy_impl(plan, options, tx, cancel).await;
    });

    rx
}

async fn copy_impl(
    plan: CopyPlan,
    options: CopyOptions,
    tx: mpsc::Sender<CopyResult>,
    cancel: CancellationToken,
) {
    let mut progress = OperationProgress::new(plan.file_count());
    let mut complete = OperationComplete::default();

    for step in plan.into_steps() {
        if cancel.is_cancelled() {
            info!("copy cancelled");
            complete.aborted = true;
            break;
        }

        match step {
            CopyStep::MakeDir(dir) => {
                let target = dir.clone();
                match blocking(move || fs::create_dir_all(&target)).await {
                    Ok(()) => progress.dirs_created += 1,
                    Err(message) => {
                        warn!(dir = %dir.display(), "failed to create directory: {message}");
                        progress.errors += 1;
                        complete.add_error(OperationError::failed(dir, message));
                    }
                }
            }
            CopyStep::Copy {
                source,
                mut destination,
            } => {
                if let Some(conflict) = Conflict::detect(&source, &destination) {
                    let kind = conflict.kind;
                    if tx.send(CopyResult::Conflict(conflict)).await.is_err() {
                        debug!("copy receiver dropped");
                        return;
                    }
                    match options.conflict_resolution {
                        ConflictResolution::Skip => {
                            complete.skipped += 1;
                            continue;
                        }
                        ConflictResolution::Abort => {
                            complete.aborted = true;
                            break;
                        }
                        ConflictResolution::AutoRename => {
                            destination = auto_rename_path(&destination);
                        }
                        ConflictResolution::Overwrite if kind == ConflictKind::DirectoryExists => {
                            progress.errors += 1;
                            complete.add_error(OperationError::failed(
                                &destination,
                                "refusing to overwrite a directory",
                            ));
                            complete.failed += 1;
                            continue;
                        }
                        ConflictResolution::Overwrite => {}
                    }
                }

                progress.set_current_file(Some(source.clone()));
                if tx.send(CopyResult::Progress(progress.clone())).await.is_err() {
                    debug!("copy receiver dropped");
                    return;
                }

                let preserve = options.preserve_timestamps;
                let (from, to) = (source.clone(), destination.clone());
                match blocking(move || copy_file(&from, &to, preserve)).await {
                    Ok(copied) => {
                        progress.complete_file(copied.bytes);
                        complete.succeeded += 1;
                        if let Some(message) = copied.timestamp_error {
                            warn!(path = %destination.display(), "timestamps not preserved: {message}");
                            complete.warnings.push(OperationError::Timestamps {
                                path: destination,
                                message,
                            });
                        }
                    }
                    Err(message) => {
                        warn!(path = %source.display(), "copy failed: {message}");
                        progress.errors += 1;
                        complete.add_error(OperationError::failed(source, message));
                        complete.failed += 1;
                    }
                }
            }
        }
    }

    complete.dirs_created = progress.dirs_created;
    complete.bytes_processed = progress.bytes_processed;
    info!(
        copied = complete.succeeded,
        failed = complete.failed,
        skipped = complete.skipped,
        aborted = complete.aborted,
        "copy finished"
    );
    let _ = tx.send(CopyResult::Complete(complete)).await;
}

/// Run a filesystem call on the blocking pool.
async fn blocking<T, F>(f: F) -> Result<T, String>
where
    F: FnOnce() -> io::Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| format!("Task failed: {e}"))?
        .map_err(|e| e.to_string())
}

struct Copied {
    bytes: u64,
    timestamp_error: Option<String>,
}

/// Copy one file, then carry its timestamps over when asked.
///
/// Only the copy itself can fail; a timestamp failure is returned alongside
/// the byte count.
fn copy_file(source: &Path, destination: &Path, preserve_timestamps: bool) -> io::Result<Copied> {
    let bytes = fs::copy(source, destination)?;
    let timestamp_error = if preserve_timestamps {
        copy_times(source, destination).err().map(|e| e.to_string())
    } else {
        None
    };
    Ok(Copied {
        bytes,
        timestamp_error,
    })
}

fn copy_times(source: &Path, destination: &Path) -> io::Result<()> {
    let metadata = fs::metadata(source)?;
    let mut times = FileTimes::new().set_modified(metadata.modified()?);
    if let Ok(accessed) = metadata.accessed() {
        times = times.set_accessed(accessed);
    }
    File::options()
        .write(true)
        .open(destination)?
        .set_times(times)
}
