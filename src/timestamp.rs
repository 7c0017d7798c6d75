/**
 * Strict conversion of EXIF time strings into absolute instants
 *
 * Accepted grammars, nothing else:
 *   date-time  YYYY:MM:DD HH:MM:SS
 *   offset     +HH:MM / -HH:MM  (hour 00-23, minute 00-59)
 */

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Timelike, Utc};
use regex::{Captures, Regex};
use std::sync::OnceLock;

use crate::error::{ExifTimeError, Result};

// ASCII digit classes: `\d` would also accept non-ASCII Unicode digits
static RE_EXIF_DATETIME: OnceLock<Regex> = OnceLock::new();
static RE_UTC_OFFSET: OnceLock<Regex> = OnceLock::new();
static RE_SUBSEC: OnceLock<Regex> = OnceLock::new();

fn exif_datetime_regex() -> &'static Regex {
    RE_EXIF_DATETIME.get_or_init(|| {
        Regex::new(r"^([0-9]{4}):([0-9]{2}):([0-9]{2}) ([0-9]{2}):([0-9]{2}):([0-9]{2})$").unwrap()
    })
}

fn utc_offset_regex() -> &'static Regex {
    RE_UTC_OFFSET.get_or_init(|| Regex::new(r"^([+-])([0-9]{2}):([0-9]{2})$").unwrap())
}

fn subsec_regex() -> &'static Regex {
    RE_SUBSEC.get_or_init(|| Regex::new(r"^[0-9]+$").unwrap())
}

/// Numeric value of capture group `index`
fn group<T: std::str::FromStr>(caps: &Captures, index: usize, value: &str) -> Result<T> {
    caps.get(index)
        .and_then(|m| m.as_str().parse::<T>().ok())
        .ok_or_else(|| ExifTimeError::invalid(value, "non-numeric field"))
}

/// Parse `YYYY:MM:DD HH:MM:SS` into a naive local date-time
pub fn parse_exif_datetime(date_time: &str) -> Result<NaiveDateTime> {
    let caps = exif_datetime_regex()
        .captures(date_time)
        .ok_or_else(|| ExifTimeError::invalid(date_time, "expected format YYYY:MM:DD HH:MM:SS"))?;

    let year: i32 = group(&caps, 1, date_time)?;
    let month: u32 = group(&caps, 2, date_time)?;
    let day: u32 = group(&caps, 3, date_time)?;
    let hour: u32 = group(&caps, 4, date_time)?;
    let minute: u32 = group(&caps, 5, date_time)?;
    let second: u32 = group(&caps, 6, date_time)?;

    let date = NaiveDate::from_ymd_opt(year, month, day)
        .ok_or_else(|| ExifTimeError::invalid(date_time, "no such calendar date"))?;
    let time = NaiveTime::from_hms_opt(hour, minute, second)
        .ok_or_else(|| ExifTimeError::invalid(date_time, "time of day out of range"))?;

    Ok(date.and_time(time))
}

/// Parse `±HH:MM` into a fixed UTC offset
pub fn parse_utc_offset(offset: &str) -> Result<FixedOffset> {
    let caps = utc_offset_regex()
        .captures(offset)
        .ok_or_else(|| ExifTimeError::invalid(offset, "expected format +HH:MM or -HH:MM"))?;

    let sign = if &caps[1] == "-" { -1 } else { 1 };
    let hours: i32 = group(&caps, 2, offset)?;
    let minutes: i32 = group(&caps, 3, offset)?;
    if hours > 23 || minutes > 59 {
        return Err(ExifTimeError::invalid(offset, "offset out of range"));
    }

    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
        .ok_or_else(|| ExifTimeError::invalid(offset, "offset out of range"))
}

/// Combine a capture date-time and its UTC offset into an absolute instant.
///
/// The naive local time minus the offset gives the UTC instant, so
/// `2025:01:09 12:10:37` at `+01:00` is epoch second 1736421037.
pub fn to_absolute_instant(date_time: &str, offset: &str) -> Result<DateTime<Utc>> {
    let naive = parse_exif_datetime(date_time)?;
    let offset = parse_utc_offset(offset)?;

    let local = offset
        .from_local_datetime(&naive)
        .single()
        .ok_or_else(|| ExifTimeError::invalid(date_time, "not representable at this offset"))?;

    Ok(local.with_timezone(&Utc))
}

/// Add a SubSecTime fraction (decimal digits after the second) to an instant.
///
/// Only the first nine digits are significant. A blank value leaves the
/// instant unchanged.
pub fn with_subsec(instant: DateTime<Utc>, subsec: &str) -> Result<DateTime<Utc>> {
    let subsec = subsec.trim();
    if subsec.is_empty() {
        return Ok(instant);
    }
    if !subsec_regex().is_match(subsec) {
        return Err(ExifTimeError::invalid(subsec, "sub-second value must be decimal digits"));
    }

    let padded = format!("{:0<9}", &subsec[..subsec.len().min(9)]);
    let nanos: u32 = padded
        .parse()
        .map_err(|_| ExifTimeError::invalid(subsec, "sub-second value out of range"))?;

    instant
        .with_nanosecond(nanos)
        .ok_or_else(|| ExifTimeError::invalid(subsec, "sub-second value out of range"))
}
