/**
 * File operations module: applying EXIF capture times as file mtimes
 */

use chrono::{DateTime, Utc};
use filetime::FileTime;
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, info, warn};
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::path::{Path, PathBuf};

use crate::config::ApplyConfig;
use crate::error::{ExifTimeError, Result};
use crate::exif::{extract_time_tags, read_image, RawTimeStrings};
use crate::timestamp::{to_absolute_instant, with_subsec};

/// The "set file mtime" primitive, injected so the pipeline can run without real files
pub trait MtimeSetter {
    fn set_mtime(&self, path: &Path, instant: DateTime<Utc>) -> std::io::Result<()>;
}

/// Sets times on the real filesystem through `filetime`
#[derive(Debug, Clone, Copy, Default)]
pub struct FileTimeSetter {
    pub set_atime: bool,
}

impl MtimeSetter for FileTimeSetter {
    fn set_mtime(&self, path: &Path, instant: DateTime<Utc>) -> std::io::Result<()> {
        let file_time = FileTime::from_unix_time(instant.timestamp(), instant.timestamp_subsec_nanos());
        if self.set_atime {
            filetime::set_file_times(path, file_time, file_time)
        } else {
            filetime::set_file_mtime(path, file_time)
        }
    }
}

/// Reads the capture time of a JPEG and applies it as the file's mtime
pub struct MtimeApplier<S: MtimeSetter = FileTimeSetter> {
    config: ApplyConfig,
    setter: S,
}

impl MtimeApplier<FileTimeSetter> {
    pub fn new(config: ApplyConfig) -> Self {
        let setter = FileTimeSetter { set_atime: config.set_atime };
        Self { config, setter }
    }
}

impl Default for MtimeApplier<FileTimeSetter> {
    fn default() -> Self {
        Self::new(ApplyConfig::default())
    }
}

impl<S: MtimeSetter> MtimeApplier<S> {
    pub fn with_setter(config: ApplyConfig, setter: S) -> Self {
        Self { config, setter }
    }

    pub fn config(&self) -> &ApplyConfig {
        &self.config
    }

    pub fn setter(&self) -> &S {
        &self.setter
    }

    /// Convert extracted tag strings into the instant to apply
    pub fn instant_from_raw(&self, raw: &RawTimeStrings) -> Result<DateTime<Utc>> {
        let offset = self.config.offset_policy.resolve(raw.offset.as_deref())?;
        let instant = to_absolute_instant(&raw.date_time, offset)?;

        match raw.subsec.as_deref() {
            Some(subsec) if self.config.use_subsec => with_subsec(instant, subsec),
            _ => Ok(instant),
        }
    }

    /// The instant a file would get, without touching it
    pub fn target_instant(&self, file_path: &Path) -> Result<DateTime<Utc>> {
        let image = read_image(file_path)?;
        self.instant_from_raw(&extract_time_tags(&image)?)
    }

    /// Run the pipeline over bytes already in memory, then set the mtime of `file_path`
    pub fn apply_exif_time(&self, file_path: &Path, image: &[u8]) -> Result<DateTime<Utc>> {
        let raw = extract_time_tags(image)?;
        let instant = self.instant_from_raw(&raw)?;
        debug!("{}: {:?} -> {}", file_path.display(), raw, instant);

        if self.config.dry_run {
            info!("[dry-run] {} -> {}", file_path.display(), instant.to_rfc3339());
            return Ok(instant);
        }

        self.setter
            .set_mtime(file_path, instant)
            .map_err(|e| ExifTimeError::io(file_path, e))?;
        info!("Set mtime of {} to {}", file_path.display(), instant.to_rfc3339());
        Ok(instant)
    }

    /// Read a file, extract its capture time and set its mtime to it
    pub fn apply_exif_time_to_file(&self, file_path: &Path) -> Result<DateTime<Utc>> {
        let image = read_image(file_path)?;
        self.apply_exif_time(file_path, &image)
    }
}

#[derive(Debug)]
pub struct ProcessResult {
    pub file_path: PathBuf,
    pub instant: Option<DateTime<Utc>>,
    pub error: Option<ExifTimeError>,
}

impl ProcessResult {
    pub fn success(&self) -> bool {
        self.error.is_none()
    }
}

/// Applies capture times to many files in parallel
pub struct FileProcessor {
    applier: MtimeApplier,
    pool: Option<ThreadPool>,
    show_progress: bool,
}

impl FileProcessor {
    pub fn new(config: ApplyConfig, workers: Option<usize>) -> Self {
        let threads = workers.unwrap_or_else(num_cpus::get).max(1);
        info!("Using thread pool with {} threads (CPUs: {})", threads, num_cpus::get());

        let pool = ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("setimexif-worker-{}", i))
            .build()
            .map_err(|e| warn!("Failed to configure rayon thread pool, using default: {}", e))
            .ok();

        Self {
            applier: MtimeApplier::new(config),
            pool,
            show_progress: true,
        }
    }

    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    pub fn applier(&self) -> &MtimeApplier {
        &self.applier
    }

    /// Process every file; a failure on one file never stops the others.
    /// Results come back in input order.
    pub fn process_files(&self, files: &[PathBuf]) -> Vec<ProcessResult> {
        info!("Processing {} files", files.len());

        let pb = if self.show_progress {
            ProgressBar::new(files.len() as u64)
        } else {
            ProgressBar::hidden()
        };
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({per_sec:.1} files/s) ETA: {eta} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );
        pb.set_message("Setting modification times");

        let run = || {
            files
                .par_iter()
                .map(|file_path| {
                    let result = self.process_single_file(file_path);
                    pb.inc(1);
                    result
                })
                .collect::<Vec<_>>()
        };
        let results = match &self.pool {
            Some(pool) => pool.install(run),
            None => run(),
        };

        pb.finish_with_message("Done");
        results
    }

    fn process_single_file(&self, file_path: &Path) -> ProcessResult {
        match self.applier.apply_exif_time_to_file(file_path) {
            Ok(instant) => ProcessResult {
                file_path: file_path.to_path_buf(),
                instant: Some(instant),
                error: None,
            },
            Err(e) => {
                warn!("{} ({}): {}", file_path.display(), e.kind(), e);
                ProcessResult {
                    file_path: file_path.to_path_buf(),
                    instant: None,
                    error: Some(e),
                }
            }
        }
    }
}
