use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use setimexif_rs::{ApplyConfig, FileProcessor, OffsetPolicy, ProcessResult};

#[derive(Parser)]
#[command(name = "setimexif")]
#[command(version)]
#[command(about = "Set JPEG file modification times from the EXIF capture timestamp")]
#[command(long_about = "Reads DateTimeOriginal and OffsetTimeOriginal from the EXIF block of each JPEG
and sets the file's modification time to that instant, so sort-by-date views
show when a photo was taken rather than when it was copied.

Directories are scanned for .jpg/.jpeg files; use --recursive to descend.")]
struct Cli {
    /// Files or directories to process
    #[arg(required = true)]
    paths: Vec<PathBuf>,

    /// Descend into subdirectories
    #[arg(short, long)]
    recursive: bool,

    /// Treat photos without OffsetTimeOriginal as taken in UTC
    #[arg(long, conflicts_with = "assume_offset")]
    assume_utc: bool,

    /// Offset (+HH:MM / -HH:MM) for photos without OffsetTimeOriginal
    #[arg(long, value_name = "OFFSET", allow_hyphen_values = true)]
    assume_offset: Option<String>,

    /// Ignore SubSecTimeOriginal and set whole seconds only
    #[arg(long)]
    no_subsec: bool,

    /// Also set the access time
    #[arg(long)]
    set_atime: bool,

    /// Show the times that would be set without changing any file
    #[arg(short = 'n', long)]
    dry_run: bool,

    /// Number of parallel workers (default: CPU count)
    #[arg(short, long)]
    workers: Option<usize>,

    /// Increase verbosity (-v=INFO, -vv=DEBUG, -vvv=TRACE)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose);

    info!("Starting setimexif");

    let config = build_config(&cli)?;
    let files = collect_files(&cli.paths, cli.recursive);
    if files.is_empty() {
        anyhow::bail!("No JPEG files found");
    }

    let processor = FileProcessor::new(config, cli.workers);
    let results = processor.process_files(&files);

    let errors = print_summary(&results, cli.dry_run);
    if errors > 0 {
        anyhow::bail!("{} of {} files failed", errors, results.len());
    }
    Ok(())
}

fn setup_logging(verbosity: u8) {
    let level = match verbosity {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    env_logger::Builder::from_default_env()
        .filter_level(level)
        .init();
}

fn build_config(cli: &Cli) -> Result<ApplyConfig> {
    let offset_policy = match (&cli.assume_offset, cli.assume_utc) {
        (Some(offset), _) => OffsetPolicy::assume(offset)
            .with_context(|| format!("Invalid --assume-offset value: {}", offset))?,
        (None, true) => OffsetPolicy::AssumeUtc,
        (None, false) => OffsetPolicy::Reject,
    };

    Ok(ApplyConfig {
        offset_policy,
        use_subsec: !cli.no_subsec,
        set_atime: cli.set_atime,
        dry_run: cli.dry_run,
    })
}

fn is_jpeg(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| matches!(ext.to_lowercase().as_str(), "jpg" | "jpeg"))
        .unwrap_or(false)
}

/// Expand directories into their JPEG files. Explicit file paths are kept
/// as given, so a missing file still shows up as an error in the summary.
fn collect_files(paths: &[PathBuf], recursive: bool) -> Vec<PathBuf> {
    let mut files = Vec::new();

    for path in paths {
        if !path.is_dir() {
            files.push(path.clone());
            continue;
        }

        info!("Scanning directory: {} (recursive: {})", path.display(), recursive);
        let walkdir = if recursive {
            WalkDir::new(path)
        } else {
            WalkDir::new(path).max_depth(1)
        };
        files.extend(
            walkdir
                .into_iter()
                .filter_map(|e| e.ok())
                .filter(|e| e.file_type().is_file() && is_jpeg(e.path()))
                .map(|e| e.into_path()),
        );
    }

    files.sort();
    files.dedup();
    files
}

fn print_summary(results: &[ProcessResult], dry_run: bool) -> usize {
    let errors: Vec<_> = results.iter().filter(|r| !r.success()).collect();

    if dry_run {
        for result in results {
            if let Some(instant) = result.instant {
                println!("{} -> {}", result.file_path.display(), instant.to_rfc3339());
            }
        }
    }

    println!("\nProcessing complete!");
    println!("Files processed: {}", results.len());
    println!("Times {}: {}", if dry_run { "computed" } else { "set" }, results.len() - errors.len());
    println!("Errors: {}", errors.len());

    if !errors.is_empty() {
        println!("\nErrors:");
        for result in &errors {
            if let Some(error) = &result.error {
                println!("  {} [{}]: {}", result.file_path.display(), error.kind(), error);
            }
        }
    }

    errors.len()
}
