/**
 * Settings for applying EXIF capture times to files
 */

use crate::error::{ExifTimeError, Result};
use crate::timestamp::parse_utc_offset;

/// What to do when DateTimeOriginal is present but OffsetTimeOriginal is not
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum OffsetPolicy {
    /// Fail with `NoExifData`. Callers cannot tell this apart from a file
    /// with no EXIF block except through the error reason, which names
    /// OffsetTimeOriginal.
    #[default]
    Reject,
    /// Treat the capture time as UTC
    AssumeUtc,
    /// Use a fixed `±HH:MM` offset
    Assume(String),
}

impl OffsetPolicy {
    /// Build an `Assume` policy, validating the offset up front
    pub fn assume(offset: &str) -> Result<Self> {
        parse_utc_offset(offset)?;
        Ok(OffsetPolicy::Assume(offset.to_string()))
    }

    /// Pick the offset string to convert with
    pub fn resolve<'a>(&'a self, extracted: Option<&'a str>) -> Result<&'a str> {
        match (extracted, self) {
            (Some(offset), _) => Ok(offset),
            (None, OffsetPolicy::Reject) => Err(ExifTimeError::no_exif(
                "OffsetTimeOriginal tag not found",
            )),
            (None, OffsetPolicy::AssumeUtc) => Ok("+00:00"),
            (None, OffsetPolicy::Assume(offset)) => Ok(offset.as_str()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ApplyConfig {
    pub offset_policy: OffsetPolicy,
    /// Add SubSecTimeOriginal to the instant when present
    pub use_subsec: bool,
    /// Also set the access time
    pub set_atime: bool,
    /// Compute the target instant without touching the file
    pub dry_run: bool,
}

impl Default for ApplyConfig {
    fn default() -> Self {
        Self {
            offset_policy: OffsetPolicy::default(),
            use_subsec: true,
            set_atime: false,
            dry_run: false,
        }
    }
}
