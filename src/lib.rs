//! Set JPEG file modification times from the EXIF capture timestamp.
//!
//! Pipeline: file bytes -> [`extract_time_tags`] -> [`to_absolute_instant`]
//! -> [`MtimeSetter::set_mtime`].

pub mod config;
pub mod error;
pub mod exif;
pub mod file_ops;
pub mod timestamp;

#[cfg(test)]
mod test_utils;

pub use config::{ApplyConfig, OffsetPolicy};
pub use error::{ExifTimeError, Result};
pub use exif::{extract_time_tags, read_exif_time_tags, RawTimeStrings};
pub use file_ops::{FileProcessor, FileTimeSetter, MtimeApplier, MtimeSetter, ProcessResult};
pub use timestamp::{to_absolute_instant, with_subsec};
