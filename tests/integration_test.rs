//! End-to-end tests on the fixture images in tests/data.
//!
//! Fixtures are copied into a temporary directory first, since applying a
//! time mutates the file.

use filetime::FileTime;
use std::fs;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use setimexif_rs::{
    read_exif_time_tags, to_absolute_instant, ApplyConfig, ExifTimeError, FileProcessor, MtimeApplier,
};

const TEST_DATA_FILE: &str = "20250109_121037.jpg";
const TEST_DATA_NO_EXIF_FILE: &str = "no-exif-data.jpg";
const TEST_DATA_TIME_SECONDS: i64 = 1_736_421_037; // Thu Jan 09 2025 11:10:37 GMT+0000
const TEST_DATA_TIME_STRING: &str = "2025:01:09 12:10:37";
const TEST_DATA_TIME_OFFSET: &str = "+01:00";

fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/data").join(name)
}

/// Copy a fixture into `dir` and reset its mtime to the epoch
fn staged_copy(dir: &TempDir, name: &str) -> PathBuf {
    let target = dir.path().join(name);
    fs::copy(fixture(name), &target).unwrap();
    filetime::set_file_mtime(&target, FileTime::from_unix_time(0, 0)).unwrap();
    assert_eq!(mtime_seconds(&target), 0);
    target
}

fn mtime_seconds(path: &Path) -> i64 {
    FileTime::from_last_modification_time(&fs::metadata(path).unwrap()).unix_seconds()
}

#[test]
fn test_read_exif_time_tags() {
    let raw = read_exif_time_tags(&fixture(TEST_DATA_FILE)).unwrap();
    assert_eq!(raw.date_time, TEST_DATA_TIME_STRING);
    assert_eq!(raw.offset.as_deref(), Some(TEST_DATA_TIME_OFFSET));
    assert_eq!(raw.subsec, None);
}

#[test]
fn test_read_exif_time_tags_no_exif_data_error() {
    let err = read_exif_time_tags(&fixture(TEST_DATA_NO_EXIF_FILE)).unwrap_err();
    assert!(err.is_no_exif_data(), "{:?}", err);

    let dir = TempDir::new().unwrap();
    let empty = dir.path().join("file_without_exif.jpg");
    fs::write(&empty, b"").unwrap();
    let err = read_exif_time_tags(&empty).unwrap_err();
    assert!(matches!(err, ExifTimeError::NoExifData { .. }));
}

#[test]
fn test_read_exif_time_tags_missing_file() {
    let dir = TempDir::new().unwrap();
    let err = read_exif_time_tags(&dir.path().join("missing.jpg")).unwrap_err();
    assert!(err.is_io());
}

#[test]
fn test_datetime_from_exif_datetime() {
    let instant = to_absolute_instant(TEST_DATA_TIME_STRING, TEST_DATA_TIME_OFFSET).unwrap();
    assert_eq!(instant.timestamp(), TEST_DATA_TIME_SECONDS);
}

#[test]
fn test_datetime_from_exif_datetime_invalid() {
    let err = to_absolute_instant("01.01.2000 12:34:56", "+00:00").unwrap_err();
    assert!(matches!(err, ExifTimeError::InvalidTimestamp { .. }));
}

#[test]
fn test_set_utime() {
    let dir = TempDir::new().unwrap();
    let path = staged_copy(&dir, TEST_DATA_FILE);

    let instant = MtimeApplier::default().apply_exif_time_to_file(&path).unwrap();
    assert_eq!(instant.timestamp(), TEST_DATA_TIME_SECONDS);

    let mtime = FileTime::from_last_modification_time(&fs::metadata(&path).unwrap());
    assert_eq!(mtime.unix_seconds(), TEST_DATA_TIME_SECONDS);
    assert_eq!(mtime.nanoseconds(), 0);
}

#[test]
fn test_set_utime_twice_is_idempotent() {
    let dir = TempDir::new().unwrap();
    let path = staged_copy(&dir, TEST_DATA_FILE);
    let applier = MtimeApplier::default();

    let first = applier.apply_exif_time_to_file(&path).unwrap();
    let second = applier.apply_exif_time_to_file(&path).unwrap();
    assert_eq!(first, second);
    assert_eq!(mtime_seconds(&path), TEST_DATA_TIME_SECONDS);
}

#[test]
fn test_set_utime_with_atime() {
    let dir = TempDir::new().unwrap();
    let path = staged_copy(&dir, TEST_DATA_FILE);
    let config = ApplyConfig {
        set_atime: true,
        ..Default::default()
    };

    MtimeApplier::new(config).apply_exif_time_to_file(&path).unwrap();
    let atime = FileTime::from_last_access_time(&fs::metadata(&path).unwrap());
    assert_eq!(atime.unix_seconds(), TEST_DATA_TIME_SECONDS);
}

#[test]
fn test_dry_run_leaves_mtime() {
    let dir = TempDir::new().unwrap();
    let path = staged_copy(&dir, TEST_DATA_FILE);
    let config = ApplyConfig {
        dry_run: true,
        ..Default::default()
    };

    let applier = MtimeApplier::new(config);
    assert_eq!(applier.target_instant(&path).unwrap().timestamp(), TEST_DATA_TIME_SECONDS);
    assert_eq!(applier.apply_exif_time_to_file(&path).unwrap().timestamp(), TEST_DATA_TIME_SECONDS);
    assert_eq!(mtime_seconds(&path), 0);
}

#[test]
fn test_no_exif_file_is_not_modified() {
    let dir = TempDir::new().unwrap();
    let path = staged_copy(&dir, TEST_DATA_NO_EXIF_FILE);

    let err = MtimeApplier::default().apply_exif_time_to_file(&path).unwrap_err();
    assert!(err.is_no_exif_data());
    assert_eq!(mtime_seconds(&path), 0);
}

#[test]
fn test_batch_processing_reports_per_file() {
    let dir = TempDir::new().unwrap();
    let good = staged_copy(&dir, TEST_DATA_FILE);
    let bad = staged_copy(&dir, TEST_DATA_NO_EXIF_FILE);
    let missing = dir.path().join("missing.jpg");

    let processor = FileProcessor::new(ApplyConfig::default(), Some(2)).with_progress(false);
    let results = processor.process_files(&[good.clone(), bad.clone(), missing.clone()]);

    assert_eq!(results.len(), 3);
    assert_eq!(results[0].file_path, good);
    assert!(results[0].success());
    assert_eq!(results[0].instant.map(|i| i.timestamp()), Some(TEST_DATA_TIME_SECONDS));

    assert_eq!(results[1].file_path, bad);
    assert!(results[1].error.as_ref().is_some_and(|e| e.is_no_exif_data()));

    assert_eq!(results[2].file_path, missing);
    assert!(results[2].error.as_ref().is_some_and(|e| e.is_io()));

    assert_eq!(mtime_seconds(&good), TEST_DATA_TIME_SECONDS);
    assert_eq!(mtime_seconds(&bad), 0);
}

#[test]
fn test_matches_kamadak_exif() {
    let file = fs::File::open(fixture(TEST_DATA_FILE)).unwrap();
    let exif = exif::Reader::new()
        .read_from_container(&mut BufReader::new(file))
        .unwrap();
    let field = exif
        .get_field(exif::Tag::DateTimeOriginal, exif::In::PRIMARY)
        .expect("DateTimeOriginal present");

    let expected = match &field.value {
        exif::Value::Ascii(values) => values[0].split(|&b| b == 0).next().unwrap().to_vec(),
        other => panic!("unexpected value {:?}", other),
    };

    let raw = read_exif_time_tags(&fixture(TEST_DATA_FILE)).unwrap();
    assert_eq!(raw.date_time.as_bytes(), expected.as_slice());
}
