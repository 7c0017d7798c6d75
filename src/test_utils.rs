//! Builders for synthetic JPEG/EXIF byte streams used by unit tests.

use crate::exif::{ByteOrder, TAG_EXIF_IFD_POINTER};

#[derive(Debug, Clone, Copy)]
pub enum TestEntry {
    /// ASCII tag; a NUL terminator is appended
    Ascii(u16, &'static str),
    Short(u16, u16),
    Long(u16, u32),
}

fn put_u16(data: &mut Vec<u8>, value: u16, order: ByteOrder) {
    match order {
        ByteOrder::LittleEndian => data.extend_from_slice(&value.to_le_bytes()),
        ByteOrder::BigEndian => data.extend_from_slice(&value.to_be_bytes()),
    }
}

fn put_u32(data: &mut Vec<u8>, value: u32, order: ByteOrder) {
    match order {
        ByteOrder::LittleEndian => data.extend_from_slice(&value.to_le_bytes()),
        ByteOrder::BigEndian => data.extend_from_slice(&value.to_be_bytes()),
    }
}

fn ifd_size(entries: usize) -> usize {
    2 + entries * 12 + 4
}

fn write_ifd(
    data: &mut Vec<u8>,
    entries: &[TestEntry],
    order: ByteOrder,
    values: &mut Vec<u8>,
    values_start: usize,
) {
    put_u16(data, entries.len() as u16, order);
    for entry in entries {
        match *entry {
            TestEntry::Ascii(tag, text) => {
                let mut bytes = text.as_bytes().to_vec();
                bytes.push(0);
                put_u16(data, tag, order);
                put_u16(data, 2, order);
                put_u32(data, bytes.len() as u32, order);
                if bytes.len() <= 4 {
                    bytes.resize(4, 0);
                    data.extend_from_slice(&bytes);
                } else {
                    put_u32(data, (values_start + values.len()) as u32, order);
                    values.extend_from_slice(&bytes);
                }
            }
            TestEntry::Short(tag, value) => {
                put_u16(data, tag, order);
                put_u16(data, 3, order);
                put_u32(data, 1, order);
                put_u16(data, value, order);
                data.extend_from_slice(&[0, 0]);
            }
            TestEntry::Long(tag, value) => {
                put_u16(data, tag, order);
                put_u16(data, 4, order);
                put_u32(data, 1, order);
                put_u32(data, value, order);
            }
        }
    }
    put_u32(data, 0, order);
}

/// Build a TIFF block with a 0th IFD and, when `exif` is non-empty, an EXIF
/// sub-IFD linked from the 0th IFD through tag 0x8769.
pub fn build_tiff(order: ByteOrder, ifd0: &[TestEntry], exif: &[TestEntry]) -> Vec<u8> {
    let ifd0_offset = 8usize;
    let mut ifd0_entries = ifd0.to_vec();
    let exif_offset = ifd0_offset + ifd_size(ifd0_entries.len() + usize::from(!exif.is_empty()));
    if !exif.is_empty() {
        ifd0_entries.push(TestEntry::Long(TAG_EXIF_IFD_POINTER, exif_offset as u32));
    }
    let exif_size = if exif.is_empty() { 0 } else { ifd_size(exif.len()) };
    let values_start = exif_offset + exif_size;

    let mut data = Vec::new();
    data.extend_from_slice(match order {
        ByteOrder::LittleEndian => b"II",
        ByteOrder::BigEndian => b"MM",
    });
    put_u16(&mut data, 0x002A, order);
    put_u32(&mut data, ifd0_offset as u32, order);

    let mut values = Vec::new();
    write_ifd(&mut data, &ifd0_entries, order, &mut values, values_start);
    if !exif.is_empty() {
        write_ifd(&mut data, exif, order, &mut values, values_start);
    }
    assert_eq!(data.len(), values_start);
    data.extend_from_slice(&values);
    data
}

fn segment(marker: u8, payload: &[u8]) -> Vec<u8> {
    let mut data = vec![0xFF, marker];
    data.extend_from_slice(&((payload.len() + 2) as u16).to_be_bytes());
    data.extend_from_slice(payload);
    data
}

/// SOI followed by a single APP1 segment with the given payload
pub fn jpeg_with_app1(payload: &[u8]) -> Vec<u8> {
    let mut data = vec![0xFF, 0xD8];
    data.extend_from_slice(&segment(0xE1, payload));
    data
}

/// SOI, JFIF APP0, EXIF APP1, a stub scan and EOI
pub fn jpeg_with_exif(tiff: &[u8]) -> Vec<u8> {
    let mut data = vec![0xFF, 0xD8];
    data.extend_from_slice(&segment(0xE0, b"JFIF\0\x01\x01\0\0\x01\0\x01\0\0"));
    let mut payload = b"Exif\0\0".to_vec();
    payload.extend_from_slice(tiff);
    data.extend_from_slice(&segment(0xE1, &payload));
    data.extend_from_slice(&segment(0xDA, &[1, 1, 0, 0, 0x3F, 0]));
    data.extend_from_slice(&[0x12, 0x34, 0xFF, 0xD9]);
    data
}
