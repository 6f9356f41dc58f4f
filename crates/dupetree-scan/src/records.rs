//! Hash and size record files, kept in step with a live directory.
//!
//! A record scan walks a directory and writes one size record and one hash
//! record per regular file. When output files from an earlier run exist,
//! their records are read first: a file whose size still matches its
//! recorded size keeps its recorded hash and is not read again. Without
//! `rewrite`, outputs are appended to and only changed records are added;
//! since later lines win when a record file is loaded, the newest line for a
//! path is always the one that counts.

use std::fs::{File, OpenOptions};
use std::io::{BufReader, LineWriter};
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use dupetree_core::{
    ContentHash, FingerprintStore, HashRecord, LineError, ParseMode, Record, RecordBatch,
    RecordError, RecordWriter, ScanConfig, ScanError, SizeRecord,
};

use crate::fingerprint::{CancelFlag, DiskFingerprinter};
use crate::progress::{ProgressTracker, ScanProgress};
use crate::scanner::{resolve_root, walker, EntryFilter};

/// Read every record of one kind from a file.
pub fn load_records<T: Record>(path: &Path, mode: ParseMode) -> Result<RecordBatch<T>, RecordError> {
    let file = File::open(path)?;
    dupetree_core::record::read_records(BufReader::new(file), mode)
}

/// A fingerprint store read from a hashes file and an optional sizes file.
#[derive(Debug)]
pub struct LoadedStore {
    pub store: FingerprintStore,
    /// Malformed lines skipped in relaxed mode, hashes file first.
    pub errors: Vec<LineError>,
}

/// Load a hashes file, and a sizes file when given, into a store.
pub fn load_store(
    hashes: &Path,
    sizes: Option<&Path>,
    mode: ParseMode,
) -> Result<LoadedStore, RecordError> {
    let hash_batch = load_records::<HashRecord>(hashes, mode)?;
    let size_batch = match sizes {
        Some(path) => load_records::<SizeRecord>(path, mode)?,
        None => RecordBatch {
            records: Vec::new(),
            errors: Vec::new(),
            lines: 0,
        },
    };

    let mut errors = hash_batch.errors;
    errors.extend(size_batch.errors);
    Ok(LoadedStore {
        store: FingerprintStore::from_records(hash_batch.records, size_batch.records),
        errors,
    })
}

/// Where a record scan writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordPaths {
    pub hashes: PathBuf,
    pub sizes: PathBuf,
}

impl RecordPaths {
    /// `<dirname>_files_hashes.txt` and `<dirname>_files_sizes.txt` in the
    /// current directory.
    pub fn for_directory(dir: &Path) -> Result<Self, ScanError> {
        let absolute = std::path::absolute(dir).map_err(|e| ScanError::io(dir, e))?;
        let name = absolute
            .file_name()
            .ok_or_else(|| ScanError::InvalidConfig {
                message: format!("{} has no directory name", absolute.display()),
            })?
            .to_string_lossy();

        Ok(Self {
            hashes: PathBuf::from(format!("{name}_files_hashes.txt")),
            sizes: PathBuf::from(format!("{name}_files_sizes.txt")),
        })
    }
}

/// Record scan behavior switches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecordScanOptions {
    /// Truncate the outputs and write every record, instead of appending
    /// changes only.
    pub rewrite: bool,
    /// Reuse every known hash without checking sizes. The sizes file is
    /// not read and is written from scratch.
    pub trust_all_hashes: bool,
}

/// Counts reported at the end of a record scan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordScanSummary {
    /// Files recorded by this run. Unreadable files count as errors only.
    pub files: u64,
    pub symlinks: u64,
    pub special: u64,
    pub errors: u64,
    pub total_bytes: u64,
    /// Files whose content was read.
    pub hashed: u64,
    /// Files whose recorded hash was kept.
    pub reused: u64,
    pub hashes_written: u64,
    pub sizes_written: u64,
    /// Known records re-emitted with the `preserved` tag.
    pub preserved: u64,
    pub interrupted: bool,
}

/// Walks a directory and keeps hash and size record files up to date.
pub struct RecordScanner {
    config: ScanConfig,
    options: RecordScanOptions,
    fingerprinter: DiskFingerprinter,
    progress_tx: broadcast::Sender<ScanProgress>,
}

impl RecordScanner {
    pub fn new(config: ScanConfig, options: RecordScanOptions) -> Self {
        let fingerprinter = DiskFingerprinter::new(config.chunk_size);
        let (progress_tx, _) = broadcast::channel(100);
        Self {
            config,
            options,
            fingerprinter,
            progress_tx,
        }
    }

    /// Stop hashing and walking when `cancel` is raised.
    pub fn with_cancel(mut self, cancel: CancelFlag) -> Self {
        self.fingerprinter = self.fingerprinter.with_cancel(cancel);
        self
    }

    /// Subscribe to progress updates.
    pub fn subscribe(&self) -> broadcast::Receiver<ScanProgress> {
        self.progress_tx.subscribe()
    }

    /// Run the scan, writing to `paths`.
    ///
    /// Cancellation is not an error: the summary comes back with
    /// `interrupted` set, and every record written so far is complete.
    pub fn run(&mut self, paths: &RecordPaths) -> Result<RecordScanSummary, ScanError> {
        let root = resolve_root(&self.config)?;
        let filter = EntryFilter::from_config(&self.config)?;

        let mut known = KnownRecords::load(paths, self.options)?;
        let mut hashes = open_output(&paths.hashes, !self.options.rewrite && !known.hashes.is_empty())?;
        let mut sizes = open_output(&paths.sizes, !self.options.rewrite && !known.sizes.is_empty())?;

        let mut summary = RecordScanSummary::default();
        let mut tracker = ProgressTracker::new();
        let cancel = self.fingerprinter.cancel_flag().clone();

        for entry_result in walker(&root, &self.config, filter) {
            if cancel.is_cancelled() {
                summary.interrupted = true;
                break;
            }

            let entry = match entry_result {
                Ok(entry) => entry,
                Err(err) => {
                    warn!("{err}");
                    summary.errors += 1;
                    tracker.record_error();
                    continue;
                }
            };

            let file_type = entry.file_type();
            if file_type.is_symlink() {
                summary.symlinks += 1;
                continue;
            }
            if file_type.is_dir() {
                tracker.record_dir();
                continue;
            }
            if !file_type.is_file() {
                summary.special += 1;
                continue;
            }

            let path = entry.path();
            let size = match entry.metadata() {
                Ok(metadata) => metadata.len(),
                Err(err) => {
                    warn!(path = %path.display(), "{err}");
                    summary.errors += 1;
                    tracker.record_error();
                    continue;
                }
            };

            match self.reconcile(&path, size, &mut known) {
                Ok(outcome) => {
                    summary.files += 1;
                    summary.total_bytes += size;
                    if outcome.reused {
                        summary.reused += 1;
                        tracker.record_reused();
                    } else {
                        summary.hashed += 1;
                        tracker.record_hashed();
                    }
                    if outcome.write_size {
                        sizes
                            .append(&SizeRecord::new(size, path.clone()))
                            .map_err(|e| ScanError::io(&paths.sizes, e))?;
                        summary.sizes_written += 1;
                    }
                    if outcome.write_hash {
                        hashes
                            .append(&HashRecord::new(outcome.hash, path.clone()))
                            .map_err(|e| ScanError::io(&paths.hashes, e))?;
                        summary.hashes_written += 1;
                    }
                }
                Err(ScanError::Interrupted) => {
                    info!(path = %path.display(), "stopped while hashing");
                    summary.interrupted = true;
                    break;
                }
                Err(err) => {
                    warn!("{err}");
                    summary.errors += 1;
                    tracker.record_error();
                }
            }

            if tracker.record_file(path, size) {
                let _ = self.progress_tx.send(tracker.snapshot());
            }
        }

        if summary.interrupted && self.options.rewrite {
            summary.preserved = known
                .preserve(&mut hashes, &mut sizes)
                .map_err(|e| ScanError::io(&paths.hashes, e))?;
        }

        hashes.flush().map_err(|e| ScanError::io(&paths.hashes, e))?;
        sizes.flush().map_err(|e| ScanError::io(&paths.sizes, e))?;

        info!(
            files = summary.files,
            hashed = summary.hashed,
            reused = summary.reused,
            errors = summary.errors,
            interrupted = summary.interrupted,
            "record scan complete"
        );
        Ok(summary)
    }

    /// Decide what to record for one file, hashing it if needed.
    ///
    /// Known entries for the path are consumed only once a hash is settled,
    /// so a failed or interrupted file keeps its previous records.
    fn reconcile(
        &mut self,
        path: &Path,
        size: u64,
        known: &mut KnownRecords,
    ) -> Result<Reconciled, ScanError> {
        let known_size = known.sizes.get(path).copied();
        let size_matches = known_size == Some(size);
        let refresh = !self.options.trust_all_hashes && !size_matches;

        let (hash, reused) = match known.hashes.get(path) {
            Some(&hash) if !refresh => (hash, true),
            _ => (self.fingerprinter.hash_file(path)?, false),
        };
        known.sizes.shift_remove(path);
        known.hashes.shift_remove(path);

        Ok(Reconciled {
            hash,
            reused,
            write_size: self.options.rewrite || !size_matches,
            write_hash: self.options.rewrite || !reused,
        })
    }
}

struct Reconciled {
    hash: ContentHash,
    reused: bool,
    write_size: bool,
    write_hash: bool,
}

/// Records from a previous run that have not been revisited yet.
#[derive(Debug, Default)]
struct KnownRecords {
    hashes: IndexMap<PathBuf, ContentHash>,
    sizes: IndexMap<PathBuf, u64>,
}

impl KnownRecords {
    fn load(paths: &RecordPaths, options: RecordScanOptions) -> Result<Self, ScanError> {
        let mut known = Self::default();

        if paths.hashes.exists() {
            let batch = load_records::<HashRecord>(&paths.hashes, ParseMode::Relaxed)
                .map_err(|e| record_error(&paths.hashes, e))?;
            debug!(records = batch.records.len(), skipped = batch.error_count(), "read existing hashes");
            known.hashes = batch.records.into_iter().map(|r| (r.path, r.hash)).collect();
        }
        if paths.sizes.exists() && !options.trust_all_hashes {
            let batch = load_records::<SizeRecord>(&paths.sizes, ParseMode::Relaxed)
                .map_err(|e| record_error(&paths.sizes, e))?;
            debug!(records = batch.records.len(), skipped = batch.error_count(), "read existing sizes");
            known.sizes = batch.records.into_iter().map(|r| (r.path, r.size)).collect();
        }
        Ok(known)
    }

    /// Re-emit every remaining record with the `preserved` tag.
    fn preserve(
        &mut self,
        hashes: &mut RecordWriter<LineWriter<File>>,
        sizes: &mut RecordWriter<LineWriter<File>>,
    ) -> std::io::Result<u64> {
        let mut count = 0;
        for (path, size) in self.sizes.drain(..) {
            sizes.append(&SizeRecord::preserved(size, path))?;
            count += 1;
        }
        for (path, hash) in self.hashes.drain(..) {
            hashes.append(&HashRecord::preserved(hash, path))?;
            count += 1;
        }
        Ok(count)
    }
}

fn record_error(path: &Path, error: RecordError) -> ScanError {
    match error {
        RecordError::Io(source) => ScanError::io(path, source),
        RecordError::Malformed(line) => ScanError::InvalidConfig {
            message: format!("{}: {line}", path.display()),
        },
    }
}

fn open_output(path: &Path, append: bool) -> Result<RecordWriter<LineWriter<File>>, ScanError> {
    let file = OpenOptions::new()
        .create(true)
        .write(true)
        .append(append)
        .truncate(!append)
        .open(path)
        .map_err(|e| ScanError::io(path, e))?;
    debug!(path = %path.display(), append, "opened record output");
    Ok(RecordWriter::new(LineWriter::new(file)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    struct Fixture {
        _temp: TempDir,
        data: PathBuf,
        paths: RecordPaths,
    }

    fn fixture() -> Fixture {
        let temp = TempDir::new().unwrap();
        let data = temp.path().join("data");
        fs::create_dir_all(data.join("sub")).unwrap();
        fs::write(data.join("a.txt"), "alpha").unwrap();
        fs::write(data.join("sub/b.txt"), "beta").unwrap();
        let paths = RecordPaths {
            hashes: temp.path().join("hashes.txt"),
            sizes: temp.path().join("sizes.txt"),
        };
        Fixture {
            _temp: temp,
            data,
            paths,
        }
    }

    fn scan(fx: &Fixture, options: RecordScanOptions) -> RecordScanSummary {
        RecordScanner::new(ScanConfig::new(&fx.data), options)
            .run(&fx.paths)
            .unwrap()
    }

    fn lines(path: &Path) -> usize {
        fs::read_to_string(path).unwrap().lines().count()
    }

    #[test]
    fn test_first_scan_hashes_everything() {
        let fx = fixture();
        let summary = scan(&fx, RecordScanOptions::default());

        assert_eq!(summary.files, 2);
        assert_eq!(summary.hashed, 2);
        assert_eq!(summary.reused, 0);
        assert_eq!(summary.total_bytes, 9);
        assert_eq!(lines(&fx.paths.hashes), 2);
        assert_eq!(lines(&fx.paths.sizes), 2);

        let store = load_store(&fx.paths.hashes, Some(&fx.paths.sizes), ParseMode::Strict)
            .unwrap()
            .store;
        let a = store.get(&fx.data.join("a.txt")).unwrap();
        assert_eq!(a.hash, ContentHash::of(b"alpha"));
        assert_eq!(a.size, Some(5));
    }

    #[test]
    fn test_second_scan_reuses_and_appends_nothing() {
        let fx = fixture();
        scan(&fx, RecordScanOptions::default());
        let summary = scan(&fx, RecordScanOptions::default());

        assert_eq!(summary.reused, 2);
        assert_eq!(summary.hashed, 0);
        assert_eq!(summary.hashes_written, 0);
        assert_eq!(lines(&fx.paths.hashes), 2);
    }

    #[test]
    fn test_changed_size_is_rehashed_and_appended() {
        let fx = fixture();
        scan(&fx, RecordScanOptions::default());
        fs::write(fx.data.join("a.txt"), "alpha, longer").unwrap();

        let summary = scan(&fx, RecordScanOptions::default());
        assert_eq!(summary.hashed, 1);
        assert_eq!(summary.reused, 1);
        assert_eq!(lines(&fx.paths.hashes), 3);

        // the appended line supersedes the old one
        let store = load_store(&fx.paths.hashes, None, ParseMode::Strict).unwrap().store;
        assert_eq!(
            store.get(&fx.data.join("a.txt")).unwrap().hash,
            ContentHash::of(b"alpha, longer")
        );
    }

    #[test]
    fn test_same_size_edit_keeps_old_hash() {
        let fx = fixture();
        scan(&fx, RecordScanOptions::default());
        fs::write(fx.data.join("a.txt"), "ALPHA").unwrap();

        let summary = scan(&fx, RecordScanOptions::default());
        assert_eq!(summary.reused, 2);
    }

    #[test]
    fn test_rewrite_truncates() {
        let fx = fixture();
        scan(&fx, RecordScanOptions::default());
        fs::remove_file(fx.data.join("sub/b.txt")).unwrap();

        let summary = scan(
            &fx,
            RecordScanOptions {
                rewrite: true,
                trust_all_hashes: false,
            },
        );
        assert_eq!(summary.reused, 1);
        assert_eq!(summary.hashes_written, 1);
        assert_eq!(lines(&fx.paths.hashes), 1);
    }

    #[test]
    fn test_interrupted_rewrite_preserves_known_records() {
        let fx = fixture();
        scan(&fx, RecordScanOptions::default());

        let cancel = CancelFlag::new();
        cancel.cancel();
        let summary = RecordScanner::new(
            ScanConfig::new(&fx.data),
            RecordScanOptions {
                rewrite: true,
                trust_all_hashes: false,
            },
        )
        .with_cancel(cancel)
        .run(&fx.paths)
        .unwrap();

        assert!(summary.interrupted);
        assert_eq!(summary.preserved, 4);
        let text = fs::read_to_string(&fx.paths.hashes).unwrap();
        assert_eq!(text.lines().count(), 2);
        assert!(text.lines().all(|l| l.contains("  preserved  ")));

        // preserved records still load
        let store = load_store(&fx.paths.hashes, Some(&fx.paths.sizes), ParseMode::Strict)
            .unwrap()
            .store;
        assert_eq!(store.len(), 2);
    }

    #[cfg(unix)]
    #[test]
    fn test_unreadable_file_counted_as_error_only() {
        use std::os::unix::fs::PermissionsExt;

        let fx = fixture();
        let locked = fx.data.join("sub/b.txt");
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();
        if File::open(&locked).is_ok() {
            // running with privileges that ignore file modes
            return;
        }

        let summary = scan(&fx, RecordScanOptions::default());
        assert_eq!(summary.files, 1);
        assert_eq!(summary.errors, 1);
        assert_eq!(summary.hashes_written, 1);
    }

    #[test]
    fn test_default_output_names() {
        let paths = RecordPaths::for_directory(Path::new("/mnt/photos")).unwrap();
        assert_eq!(paths.hashes, PathBuf::from("photos_files_hashes.txt"));
        assert_eq!(paths.sizes, PathBuf::from("photos_files_sizes.txt"));
    }
}
