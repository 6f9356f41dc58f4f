//! dupetree - inventory a file tree, find duplicates, diff inventories.
//!
//! Usage:
//!   dupetree hash DIR                     Write hash and size records for DIR
//!   dupetree dupes [PATH]                 Duplicate files and directories
//!   dupetree missing -r REF -t TEST       Reference content absent from test
//!   dupetree compare -r REF -t TEST       Relative-path comparison
//!   dupetree copy LIST -s SRC -d DEST     Copy the files of a missing list
//!   dupetree --help                       Show help

use std::fs::File;
use std::io::{BufWriter, IsTerminal};
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use color_eyre::eyre::{eyre, Context, Result};
use signal_hook::consts::SIGINT;
use tokio::sync::broadcast::error::RecvError;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use dupetree_analyze::{
    compare, missing_by_hash, CompareMode, CompareRoots, DifferenceReport, DuplicateConfig,
    DuplicateFinder, DuplicateReport, Fingerprinter,
};
use dupetree_core::record::display_lossy;
use dupetree_core::{LineError, ParseMode, ScanError};
use dupetree_ops::{
    load_missing_list, start_copy, ConflictResolution, CopyOptions, CopyPlan, CopyResult,
    OperationComplete,
};
use dupetree_scan::{
    load_store, CancelFlag, DiskFingerprinter, FileTree, JwalkScanner, LoadedStore, RecordPaths,
    RecordScanOptions, RecordScanSummary, RecordScanner, ScanConfig,
};

#[derive(Parser)]
#[command(
    name = "dupetree",
    version,
    about = "Inventory a file tree, find duplicated files and directories, diff inventories",
    long_about = "dupetree fingerprints file content and answers two questions: what is \
                  duplicated (down to whole directories whose content all exists elsewhere), \
                  and what one inventory holds that another lacks.\n\n\
                  Inventories are plain record files written by `dupetree hash`."
)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug). RUST_LOG overrides.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Write hash and size records for a directory
    Hash {
        /// Directory to inventory
        dir: PathBuf,

        /// Hashes output (default: <dirname>_files_hashes.txt)
        #[arg(long)]
        hashes_file: Option<PathBuf>,

        /// Sizes output (default: <dirname>_files_sizes.txt)
        #[arg(long)]
        sizes_file: Option<PathBuf>,

        /// Truncate the outputs and write every record
        #[arg(long)]
        rewrite: bool,

        /// Reuse every known hash without comparing sizes
        #[arg(long)]
        trust_all_hashes: bool,

        /// Glob pattern of entry names to skip (repeatable)
        #[arg(short, long = "ignore")]
        ignore: Vec<String>,
    },

    /// Find duplicate files and entirely duplicated directories
    Dupes {
        /// Directory to scan (ignored with --hashes)
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Use a hashes record file instead of scanning
        #[arg(long)]
        hashes: Option<PathBuf>,

        /// Sizes record file matching --hashes
        #[arg(long, requires = "hashes")]
        sizes: Option<PathBuf>,

        /// Root of the recorded tree (default: common root of the records)
        #[arg(long, requires = "hashes")]
        root: Option<PathBuf>,

        /// Smallest group or directory size to report (e.g., "1KB", "1MB")
        #[arg(short, long, default_value = "0")]
        min_size: String,

        /// Maximum number of duplicate groups to show (0 = all)
        #[arg(short = 'n', long, default_value = "0")]
        top: usize,

        #[command(flatten)]
        records: RecordArgs,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// List reference files whose content appears nowhere in test
    Missing {
        /// Reference hashes record file
        #[arg(short, long)]
        reference: PathBuf,

        /// Test hashes record file
        #[arg(short, long)]
        test: PathBuf,

        /// Write missing paths, one base64 field per line
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Write missing hashes, one per line
        #[arg(long)]
        hashes_output: Option<PathBuf>,

        #[command(flatten)]
        records: RecordArgs,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Compare two inventories by relative path
    Compare {
        /// Reference hashes record file
        #[arg(short, long)]
        reference: PathBuf,

        /// Test hashes record file
        #[arg(short, long)]
        test: PathBuf,

        /// Root of the reference paths (default: common root)
        #[arg(long)]
        reference_path: Option<PathBuf>,

        /// Root of the test paths (default: common root)
        #[arg(long)]
        test_path: Option<PathBuf>,

        /// Presence of the relative path is enough, hashes are ignored
        #[arg(long)]
        filenames_only: bool,

        /// Write missing paths, one base64 field per line
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        records: RecordArgs,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Copy the files named in a missing list
    Copy {
        /// Missing list, one base64 path per line
        list: PathBuf,

        /// Root the listed paths live under
        #[arg(short, long)]
        source: PathBuf,

        /// Root to recreate them under
        #[arg(short, long)]
        dest: PathBuf,

        /// Print the MKDIR and COPY steps without touching anything
        #[arg(long)]
        dry_run: bool,

        /// What to do when a destination file exists
        #[arg(long, default_value = "skip")]
        on_conflict: OnConflict,

        /// Do not carry modification times over
        #[arg(long)]
        no_preserve_timestamps: bool,
    },
}

/// How record files are read.
#[derive(clap::Args)]
struct RecordArgs {
    /// Skip malformed record lines instead of failing
    #[arg(long)]
    relaxed: bool,

    /// Do not print each skipped line
    #[arg(long)]
    silent_errors: bool,
}

impl RecordArgs {
    fn mode(&self) -> ParseMode {
        if self.relaxed {
            ParseMode::Relaxed
        } else {
            ParseMode::Strict
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum, Default)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OnConflict {
    Skip,
    Overwrite,
    Rename,
    Abort,
}

impl From<OnConflict> for ConflictResolution {
    fn from(choice: OnConflict) -> Self {
        match choice {
            OnConflict::Skip => Self::Skip,
            OnConflict::Overwrite => Self::Overwrite,
            OnConflict::Rename => Self::AutoRename,
            OnConflict::Abort => Self::Abort,
        }
    }
}

fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Command::Hash {
            dir,
            hashes_file,
            sizes_file,
            rewrite,
            trust_all_hashes,
            ignore,
        } => {
            let options = RecordScanOptions {
                rewrite,
                trust_all_hashes,
            };
            run_hash(&dir, hashes_file, sizes_file, options, ignore)?;
        }
        Command::Dupes {
            path,
            hashes,
            sizes,
            root,
            min_size,
            top,
            records,
            format,
        } => {
            let source = match hashes {
                Some(hashes) => TreeSource::Records { hashes, sizes, root },
                None => TreeSource::Live(path),
            };
            run_dupes(source, &min_size, top, &records, format)?;
        }
        Command::Missing {
            reference,
            test,
            output,
            hashes_output,
            records,
            format,
        } => {
            run_missing(&reference, &test, output, hashes_output, &records, format)?;
        }
        Command::Compare {
            reference,
            test,
            reference_path,
            test_path,
            filenames_only,
            output,
            records,
            format,
        } => {
            let roots = CompareRoots {
                reference: reference_path,
                test: test_path,
            };
            let mode = if filenames_only {
                CompareMode::FilenamesOnly
            } else {
                CompareMode::ByPath
            };
            run_compare(&reference, &test, &roots, mode, output, &records, format)?;
        }
        Command::Copy {
            list,
            source,
            dest,
            dry_run,
            on_conflict,
            no_preserve_timestamps,
        } => {
            let options = CopyOptions {
                conflict_resolution: on_conflict.into(),
                preserve_timestamps: !no_preserve_timestamps,
            };
            run_copy(&list, source, dest, dry_run, options)?;
        }
    }

    Ok(())
}

/// Log to stderr, `warn` by default, raised by each `-v`.
fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Raise the returned flag on the first SIGINT; a second one exits.
///
/// Installed only by runs that poll the flag between steps.
fn install_interrupt_handler() -> CancelFlag {
    let cancel = CancelFlag::new();
    let flag = cancel.as_atomic();
    // registered first, so it sees the flag as the previous signal left it
    let registered = signal_hook::flag::register_conditional_shutdown(SIGINT, 130, flag.clone())
        .and_then(|_| signal_hook::flag::register(SIGINT, flag));
    if let Err(e) = registered {
        warn!("failed to register SIGINT handler: {e}");
    }
    cancel
}

fn exit_interrupted(message: &str) -> ! {
    eprintln!("{message}");
    std::process::exit(130);
}

/// Write or refresh the record files of a directory.
fn run_hash(
    dir: &Path,
    hashes_file: Option<PathBuf>,
    sizes_file: Option<PathBuf>,
    options: RecordScanOptions,
    ignore: Vec<String>,
) -> Result<()> {
    let defaults = RecordPaths::for_directory(dir).context("Invalid directory")?;
    let paths = RecordPaths {
        hashes: hashes_file.unwrap_or(defaults.hashes),
        sizes: sizes_file.unwrap_or(defaults.sizes),
    };

    let config = ScanConfig::builder()
        .root(dir)
        .ignore_patterns(ignore)
        .build()
        .context("Invalid scan configuration")?;

    eprintln!(
        "Hashing {} into {} and {}...",
        display_lossy(dir),
        display_lossy(&paths.hashes),
        display_lossy(&paths.sizes)
    );

    let cancel = install_interrupt_handler();
    let mut scanner = RecordScanner::new(config, options).with_cancel(cancel);
    let printer = std::io::stderr().is_terminal().then(|| {
        let mut progress = scanner.subscribe();
        std::thread::spawn(move || loop {
            match progress.blocking_recv() {
                Ok(p) => eprint!(
                    "\r {} files, {} hashed, {} reused, {}   ",
                    p.files_scanned,
                    p.files_hashed,
                    p.files_reused,
                    format_size(p.bytes_scanned)
                ),
                Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => break,
            }
        })
    });

    let result = scanner.run(&paths);
    drop(scanner);
    if let Some(printer) = printer {
        let _ = printer.join();
        eprintln!();
    }
    let summary = result.context("Record scan failed")?;

    print_hash_summary(&summary);
    if summary.interrupted {
        exit_interrupted("Interrupted; every record written is complete.");
    }
    Ok(())
}

fn print_hash_summary(summary: &RecordScanSummary) {
    println!();
    println!("{}", "─".repeat(60));
    println!(
        " {} files, {}",
        summary.files,
        format_size(summary.total_bytes)
    );
    println!(
        " {} hashed, {} reused from earlier records",
        summary.hashed, summary.reused
    );
    println!(
        " {} hash records and {} size records written",
        summary.hashes_written, summary.sizes_written
    );
    if summary.preserved > 0 {
        println!(" {} earlier records preserved", summary.preserved);
    }
    println!(
        " Skipped: {} symlinks, {} special files, {} errors",
        summary.symlinks, summary.special, summary.errors
    );
    println!("{}", "─".repeat(60));
}

/// Where the tree for duplicate detection comes from.
enum TreeSource {
    Live(PathBuf),
    Records {
        hashes: PathBuf,
        sizes: Option<PathBuf>,
        root: Option<PathBuf>,
    },
}

/// Run duplicate detection.
fn run_dupes(
    source: TreeSource,
    min_size: &str,
    top_n: usize,
    records: &RecordArgs,
    format: OutputFormat,
) -> Result<()> {
    let min_bytes = parse_size(min_size)?;

    let (mut tree, mut fingerprinter): (FileTree, Box<dyn Fingerprinter>) = match source {
        TreeSource::Live(path) => {
            eprintln!("Scanning {}...", display_lossy(&path));
            let config = ScanConfig::builder()
                .root(path)
                .include_hidden(false)
                .build()
                .context("Invalid scan configuration")?;
            let cancel = install_interrupt_handler();
            let tree = match JwalkScanner::new().with_cancel(cancel.clone()).scan(&config) {
                Err(ScanError::Interrupted) => exit_interrupted("Interrupted."),
                result => result.context("Scan failed")?,
            };
            if tree.has_warnings() {
                eprintln!("{} warning(s) during scan", tree.warnings.len());
            }
            let fingerprinter = DiskFingerprinter::new(config.chunk_size).with_cancel(cancel);
            (tree, Box::new(fingerprinter))
        }
        TreeSource::Records {
            hashes,
            sizes,
            root,
        } => {
            let loaded = load_inventory(&hashes, sizes.as_deref(), records)?;
            let root = root
                .or_else(|| loaded.store.common_root())
                .ok_or_else(|| eyre!("Records share no common root; pass --root"))?;
            let outcome = loaded
                .store
                .to_tree(&root, records.mode())
                .with_context(|| format!("Records do not fit under {}", display_lossy(&root)))?;
            if outcome.rejected_count() > 0 {
                warn!(skipped = outcome.rejected_count(), "records skipped during replay");
                eprintln!("{} record(s) skipped during replay", outcome.rejected_count());
            }
            (outcome.tree, Box::new(loaded.store))
        }
    };

    eprintln!("Finding duplicates (min size: {})...", format_size(min_bytes));

    let dup_config = DuplicateConfig::builder()
        .min_size(min_bytes)
        .max_groups(top_n)
        .build()
        .context("Invalid duplicate configuration")?;

    let report = match DuplicateFinder::with_config(dup_config)
        .find_duplicates(&mut tree, fingerprinter.as_mut())
    {
        Err(ScanError::Interrupted) => exit_interrupted("Interrupted."),
        result => result.context("Duplicate search failed")?,
    };

    match format {
        OutputFormat::Text => print_duplicates(&report),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
    }

    Ok(())
}

fn print_duplicates(report: &DuplicateReport) {
    println!();
    println!("{}", "─".repeat(70));
    println!(" Duplicate File Report");
    println!("{}", "─".repeat(70));
    println!();

    if report.groups.is_empty() {
        println!(" No duplicate files found.");
        return;
    }

    println!(
        " Found {} duplicate groups ({} files)",
        report.group_count, report.files_with_duplicates
    );
    println!(
        " Total wasted space: {}",
        format_size(report.total_wasted_space)
    );
    if report.unreadable_files > 0 {
        println!(" {} unreadable file(s) skipped", report.unreadable_files);
    }
    println!();

    for (i, group) in report.groups.iter().enumerate() {
        let size = group
            .size
            .map_or_else(|| "unknown size".to_string(), format_size);
        println!(
            " Group {} ({} files, {} each, {} wasted) {}",
            i + 1,
            group.count(),
            size,
            format_size(group.wasted_bytes),
            group.hash
        );
        for path in &group.paths {
            println!("   {}", display_lossy(path));
        }
        println!();
    }

    if report.directories.is_empty() {
        println!(" No entirely duplicated directories.");
        return;
    }

    println!(" Entirely duplicated directories:");
    for dir in &report.directories {
        println!(
            "   {} ({}, {} files)",
            display_lossy(&dir.path),
            format_size(dir.total_size),
            dir.file_count
        );
    }
}

/// List reference content absent from test.
fn run_missing(
    reference: &Path,
    test: &Path,
    output: Option<PathBuf>,
    hashes_output: Option<PathBuf>,
    records: &RecordArgs,
    format: OutputFormat,
) -> Result<()> {
    let reference_store = load_inventory(reference, None, records)?.store;
    let test_store = load_inventory(test, None, records)?.store;

    let report = missing_by_hash(&reference_store, &test_store);

    if let Some(path) = output {
        let written = report.write_missing_list(create_output(&path)?)?;
        info!(written, path = %path.display(), "missing list written");
    }
    if let Some(path) = hashes_output {
        let written = report.write_missing_hashes(create_output(&path)?)?;
        info!(written, path = %path.display(), "missing hashes written");
    }

    match format {
        OutputFormat::Text => {
            for entry in &report.missing {
                println!("{}", display_lossy(&entry.absolute));
            }
            eprintln!(
                "{} of {} reference files missing from test ({} distinct contents)",
                report.missing.len(),
                report.reference_entries,
                report.missing_hashes.len()
            );
        }
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
    }

    Ok(())
}

/// Compare two inventories by relative path.
fn run_compare(
    reference: &Path,
    test: &Path,
    roots: &CompareRoots,
    mode: CompareMode,
    output: Option<PathBuf>,
    records: &RecordArgs,
    format: OutputFormat,
) -> Result<()> {
    let reference_store = load_inventory(reference, None, records)?.store;
    let test_store = load_inventory(test, None, records)?.store;

    let report = compare(&reference_store, &test_store, mode, roots);

    if let Some(path) = output {
        let written = report.write_missing_list(create_output(&path)?)?;
        info!(written, path = %path.display(), "missing list written");
    }

    match format {
        OutputFormat::Text => print_comparison(&report),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
    }

    Ok(())
}

fn print_comparison(report: &DifferenceReport) {
    let root = |r: &Option<PathBuf>| r.as_deref().map(display_lossy).unwrap_or_default();
    eprintln!(
        "Comparing {} against {}",
        root(&report.reference_root),
        root(&report.test_root)
    );

    for entry in &report.missing {
        println!("MISSING  {}", display_lossy(&entry.key));
    }
    for entry in &report.changed {
        println!(
            "CHANGED  {}  {} -> {}",
            display_lossy(&entry.relative),
            entry.reference_hash,
            entry.test_hash
        );
    }

    if report.reference_outside_root + report.test_outside_root > 0 {
        eprintln!(
            "Skipped {} reference and {} test entries outside their root",
            report.reference_outside_root, report.test_outside_root
        );
    }
    if report.is_clean() {
        eprintln!("All {} reference files present in test", report.reference_entries);
    } else {
        eprintln!(
            "{} missing, {} changed, out of {} reference files",
            report.missing.len(),
            report.changed.len(),
            report.reference_entries
        );
    }
}

/// Copy the files of a missing list under a new root.
fn run_copy(
    list: &Path,
    source: PathBuf,
    dest: PathBuf,
    dry_run: bool,
    options: CopyOptions,
) -> Result<()> {
    let missing = load_missing_list(list)
        .with_context(|| format!("Failed to read {}", display_lossy(list)))?;
    let plan = CopyPlan::from_missing_list(source, dest, missing);

    for rejected in plan.rejected() {
        eprintln!("warning: {rejected}");
    }

    if dry_run {
        for step in plan.steps() {
            println!("{step}");
        }
        return Ok(());
    }

    eprintln!(
        "Copying {} files into {}...",
        plan.file_count(),
        display_lossy(plan.destination_root())
    );

    let cancel = install_interrupt_handler();
    let runtime = tokio::runtime::Runtime::new().context("Failed to start async runtime")?;
    let complete = runtime
        .block_on(watch_copy(plan, options, cancel.clone()))
        .ok_or_else(|| eyre!("Copy task ended without a result"))?;

    for warning in &complete.warnings {
        eprintln!("warning: {warning}");
    }
    for error in &complete.errors {
        eprintln!("error: {error}");
    }
    println!(
        "{} ({})",
        complete.summary(),
        format_size(complete.bytes_processed)
    );
    if cancel.is_cancelled() {
        exit_interrupted("Interrupted; the file in progress was finished.");
    }
    if complete.is_success() {
        Ok(())
    } else {
        Err(eyre!("Copy finished with errors"))
    }
}

/// Drive a copy run to completion.
///
/// A raised `cancel` flag stops the run after the step in flight; the
/// completion still arrives. `None` only if the copy task died.
async fn watch_copy(
    plan: CopyPlan,
    options: CopyOptions,
    cancel: CancelFlag,
) -> Option<OperationComplete> {
    let token = CancellationToken::new();
    let mut rx = start_copy(plan, options, token.clone());
    let mut ticker = tokio::time::interval(Duration::from_millis(200));

    loop {
        tokio::select! {
            result = rx.recv() => match result? {
                CopyResult::Progress(progress) => {
                    if let Some(file) = &progress.current_file {
                        info!(
                            done = progress.files_completed,
                            total = progress.files_total,
                            "copying {}",
                            display_lossy(file)
                        );
                    }
                }
                CopyResult::Conflict(conflict) => {
                    eprintln!(
                        "conflict: {} ({})",
                        display_lossy(&conflict.destination),
                        conflict.kind
                    );
                }
                CopyResult::Complete(complete) => return Some(complete),
            },
            _ = ticker.tick(), if !token.is_cancelled() => {
                if cancel.is_cancelled() {
                    info!("stopping copy after the current file");
                    token.cancel();
                }
            }
        }
    }
}

/// Load one record inventory, reporting skipped lines.
fn load_inventory(hashes: &Path, sizes: Option<&Path>, records: &RecordArgs) -> Result<LoadedStore> {
    let loaded = load_store(hashes, sizes, records.mode())
        .with_context(|| format!("Failed to load {}", display_lossy(hashes)))?;
    report_line_errors(hashes, &loaded.errors, records.silent_errors);
    Ok(loaded)
}

fn report_line_errors(file: &Path, errors: &[LineError], silent: bool) {
    if errors.is_empty() {
        return;
    }
    if !silent {
        for error in errors {
            eprintln!("{}: {error}", display_lossy(file));
        }
    }
    eprintln!(
        "{}: skipped {} malformed line(s)",
        display_lossy(file),
        errors.len()
    );
}

fn create_output(path: &Path) -> Result<BufWriter<File>> {
    let file = File::create(path)
        .with_context(|| format!("Failed to create {}", display_lossy(path)))?;
    Ok(BufWriter::new(file))
}

/// Format size in human-readable form.
fn format_size(bytes: u64) -> String {
    humansize::format_size(bytes, humansize::BINARY)
}

/// Parse a size string (e.g., "1KB", "10MB", "1GB").
fn parse_size(s: &str) -> Result<u64> {
    let s = s.trim().to_uppercase();
    let digits = s.trim_end_matches(|c: char| c.is_ascii_alphabetic());

    let multiplier: u64 = match &s[digits.len()..] {
        "" | "B" => 1,
        "K" | "KB" => 1024,
        "M" | "MB" => 1024 * 1024,
        "G" | "GB" => 1024 * 1024 * 1024,
        "T" | "TB" => 1024 * 1024 * 1024 * 1024,
        unit => return Err(eyre!("Unknown size unit {unit:?} in {s:?}")),
    };
    let num: f64 = digits
        .trim()
        .parse()
        .with_context(|| format!("Invalid size {s:?}"))?;

    Ok((num * multiplier as f64) as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_size() {
        assert_eq!(parse_size("0").unwrap(), 0);
        assert_eq!(parse_size("512").unwrap(), 512);
        assert_eq!(parse_size("1KB").unwrap(), 1024);
        assert_eq!(parse_size("1.5k").unwrap(), 1536);
        assert_eq!(parse_size("2 MB").unwrap(), 2 * 1024 * 1024);
        assert!(parse_size("12parsecs").is_err());
        assert!(parse_size("KB").is_err());
    }

    #[test]
    fn test_cli_parses() {
        use clap::CommandFactory;
        Cli::command().debug_assert();

        let cli = Cli::parse_from([
            "dupetree", "-vv", "copy", "list.txt", "-s", "/a", "-d", "/b", "--on-conflict",
            "rename",
        ]);
        assert_eq!(cli.verbose, 2);
        assert!(matches!(
            cli.command,
            Command::Copy {
                on_conflict: OnConflict::Rename,
                ..
            }
        ));
    }
}
