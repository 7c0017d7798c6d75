/**
 * Error types for EXIF time extraction and mtime application
 */

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for setimexif operations
pub type Result<T> = std::result::Result<T, ExifTimeError>;

#[derive(Error, Debug)]
pub enum ExifTimeError {
    /// No well-formed EXIF segment with a usable capture date-time
    #[error("No EXIF data: {reason}")]
    NoExifData { reason: String },

    /// A date-time or offset string failed strict validation
    #[error("Invalid timestamp '{value}': {reason}")]
    InvalidTimestamp { value: String, reason: String },

    /// Filesystem failure, passed through from the platform
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ExifTimeError {
    pub(crate) fn no_exif(reason: impl Into<String>) -> Self {
        ExifTimeError::NoExifData { reason: reason.into() }
    }

    pub(crate) fn invalid(value: &str, reason: impl Into<String>) -> Self {
        ExifTimeError::InvalidTimestamp {
            value: value.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ExifTimeError::Io { path: path.into(), source }
    }

    pub fn is_no_exif_data(&self) -> bool {
        matches!(self, ExifTimeError::NoExifData { .. })
    }

    pub fn is_invalid_timestamp(&self) -> bool {
        matches!(self, ExifTimeError::InvalidTimestamp { .. })
    }

    pub fn is_io(&self) -> bool {
        matches!(self, ExifTimeError::Io { .. })
    }

    /// Short name of the error kind, used in CLI reports
    pub fn kind(&self) -> &'static str {
        match self {
            ExifTimeError::NoExifData { .. } => "NoExifDataError",
            ExifTimeError::InvalidTimestamp { .. } => "InvalidTimestampError",
            ExifTimeError::Io { .. } => "IoError",
        }
    }
}
