/**
 * EXIF time tag extraction for JPEG files
 *
 * Navigation order:
 * 1. JPEG marker segments after SOI, until an APP1 segment carrying "Exif\0\0"
 * 2. TIFF header (byte order, magic 0x002A, 0th IFD offset)
 * 3. 0th IFD, then the EXIF sub-IFD referenced by tag 0x8769
 *
 * All offsets inside the TIFF block are relative to the TIFF header start.
 */

use log::{debug, trace};
use std::fs;
use std::path::Path;

use crate::error::{ExifTimeError, Result};

/// JPEG marker codes (second byte after 0xFF)
const SOI: u16 = 0xFFD8;
const MARKER_SOI: u8 = 0xD8;
const MARKER_EOI: u8 = 0xD9;
const MARKER_SOS: u8 = 0xDA;
const MARKER_APP1: u8 = 0xE1;
const MARKER_TEM: u8 = 0x01;

const EXIF_IDENTIFIER: &[u8; 6] = b"Exif\0\0";
const TIFF_MAGIC: u16 = 0x002A;
const IFD_ENTRY_SIZE: usize = 12;

/// Tag identifiers
pub const TAG_EXIF_IFD_POINTER: u16 = 0x8769;
pub const TAG_DATE_TIME_ORIGINAL: u16 = 0x9003;
pub const TAG_OFFSET_TIME_ORIGINAL: u16 = 0x9011;
pub const TAG_SUBSEC_TIME_ORIGINAL: u16 = 0x9291;

/// Field type codes
const TYPE_ASCII: u16 = 2;
const TYPE_LONG: u16 = 4;
const TYPE_IFD: u16 = 13;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteOrder {
    LittleEndian,
    BigEndian,
}

/// Raw strings of the capture time tags, NUL terminator stripped
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawTimeStrings {
    /// DateTimeOriginal, `YYYY:MM:DD HH:MM:SS`
    pub date_time: String,
    /// OffsetTimeOriginal, `±HH:MM`; `None` when the tag is absent or blank
    pub offset: Option<String>,
    /// SubSecTimeOriginal digits; `None` when the tag is absent or blank
    pub subsec: Option<String>,
}

/// One 12-byte IFD entry. `value` holds the raw value/offset field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IfdEntry {
    pub tag: u16,
    pub field_type: u16,
    pub count: u32,
    pub value: [u8; 4],
}

impl IfdEntry {
    /// Offset of a sub-IFD if this entry is a single LONG/IFD pointer
    fn pointer(&self, order: ByteOrder) -> Option<usize> {
        if self.count != 1 || !matches!(self.field_type, TYPE_LONG | TYPE_IFD) {
            return None;
        }
        Some(decode_u32(self.value, order) as usize)
    }
}

fn decode_u32(bytes: [u8; 4], order: ByteOrder) -> u32 {
    match order {
        ByteOrder::LittleEndian => u32::from_le_bytes(bytes),
        ByteOrder::BigEndian => u32::from_be_bytes(bytes),
    }
}

/// Bounds-checked reader over a byte buffer
struct Cursor<'a> {
    data: &'a [u8],
    pos: usize,
    order: ByteOrder,
}

impl<'a> Cursor<'a> {
    fn new(data: &'a [u8], order: ByteOrder) -> Self {
        Self { data, pos: 0, order }
    }

    fn at(data: &'a [u8], pos: usize, order: ByteOrder) -> Result<Self> {
        if pos > data.len() {
            return Err(ExifTimeError::no_exif(format!(
                "offset {} lies outside the {}-byte block",
                pos,
                data.len()
            )));
        }
        Ok(Self { data, pos, order })
    }

    fn is_at_end(&self) -> bool {
        self.pos >= self.data.len()
    }

    fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.pos)
    }

    fn read_bytes(&mut self, len: usize) -> Result<&'a [u8]> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|&end| end <= self.data.len())
            .ok_or_else(|| {
                ExifTimeError::no_exif(format!(
                    "read of {} bytes at offset {} overruns the {}-byte block",
                    len,
                    self.pos,
                    self.data.len()
                ))
            })?;
        let bytes = &self.data[self.pos..end];
        self.pos = end;
        Ok(bytes)
    }

    fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read_bytes(N)?);
        Ok(out)
    }

    fn read_u8(&mut self) -> Result<u8> {
        Ok(self.read_array::<1>()?[0])
    }

    fn peek_u8(&self) -> Option<u8> {
        self.data.get(self.pos).copied()
    }

    fn read_u16(&mut self) -> Result<u16> {
        let bytes = self.read_array::<2>()?;
        Ok(match self.order {
            ByteOrder::LittleEndian => u16::from_le_bytes(bytes),
            ByteOrder::BigEndian => u16::from_be_bytes(bytes),
        })
    }

    fn read_u32(&mut self) -> Result<u32> {
        Ok(decode_u32(self.read_array::<4>()?, self.order))
    }
}

/// Locate the TIFF block of the first EXIF APP1 segment.
///
/// Scanning stops at SOS or EOI, since entropy-coded data follows.
pub fn find_exif_segment(image: &[u8]) -> Result<&[u8]> {
    let mut cursor = Cursor::new(image, ByteOrder::BigEndian);

    if cursor.remaining() < 2 || cursor.read_u16()? != SOI {
        return Err(ExifTimeError::no_exif("missing JPEG start-of-image marker"));
    }

    loop {
        if cursor.is_at_end() {
            return Err(ExifTimeError::no_exif("end of input before an EXIF segment"));
        }

        let lead = cursor.read_u8()?;
        if lead != 0xFF {
            return Err(ExifTimeError::no_exif(format!(
                "expected marker at offset {}, found 0x{:02X}",
                cursor.pos - 1,
                lead
            )));
        }
        // Fill bytes may pad the gap between segments
        while cursor.peek_u8() == Some(0xFF) {
            cursor.pos += 1;
        }
        let marker = cursor.read_u8()?;
        trace!("JPEG marker 0xFF{:02X} at offset {}", marker, cursor.pos - 2);

        match marker {
            MARKER_SOS | MARKER_EOI => {
                return Err(ExifTimeError::no_exif(
                    "reached image data without an EXIF segment",
                ));
            }
            MARKER_SOI | MARKER_TEM | 0xD0..=0xD7 => continue,
            _ => {}
        }

        let length = cursor.read_u16()? as usize;
        if length < 2 {
            return Err(ExifTimeError::no_exif(format!(
                "segment 0xFF{:02X} declares invalid length {}",
                marker, length
            )));
        }
        let payload = cursor.read_bytes(length - 2)?;

        if marker == MARKER_APP1 && payload.starts_with(EXIF_IDENTIFIER) {
            debug!("EXIF APP1 segment found, {} payload bytes", payload.len());
            return Ok(&payload[EXIF_IDENTIFIER.len()..]);
        }
    }
}

/// Read the TIFF header: byte order, magic and the 0th IFD offset
fn read_tiff_header(tiff: &[u8]) -> Result<(ByteOrder, usize)> {
    let mut cursor = Cursor::new(tiff, ByteOrder::BigEndian);
    cursor.order = match &cursor.read_array::<2>()? {
        b"II" => ByteOrder::LittleEndian,
        b"MM" => ByteOrder::BigEndian,
        other => {
            return Err(ExifTimeError::no_exif(format!(
                "unknown TIFF byte-order mark {:02X?}",
                other
            )))
        }
    };

    let magic = cursor.read_u16()?;
    if magic != TIFF_MAGIC {
        return Err(ExifTimeError::no_exif(format!(
            "bad TIFF magic 0x{:04X}",
            magic
        )));
    }

    let ifd0_offset = cursor.read_u32()? as usize;
    Ok((cursor.order, ifd0_offset))
}

/// Read all entries of the IFD at `offset`
pub fn read_ifd(tiff: &[u8], offset: usize, order: ByteOrder) -> Result<Vec<IfdEntry>> {
    let mut cursor = Cursor::at(tiff, offset, order)?;
    let count = cursor.read_u16()? as usize;

    if count * IFD_ENTRY_SIZE > cursor.remaining() {
        return Err(ExifTimeError::no_exif(format!(
            "IFD at offset {} declares {} entries, overrunning the segment",
            offset, count
        )));
    }

    let mut entries = Vec::with_capacity(count);
    for _ in 0..count {
        entries.push(IfdEntry {
            tag: cursor.read_u16()?,
            field_type: cursor.read_u16()?,
            count: cursor.read_u32()?,
            value: cursor.read_array::<4>()?,
        });
    }
    Ok(entries)
}

/// Tag identifiers are not guaranteed sorted, so this scans.
pub fn find_entry(entries: &[IfdEntry], tag: u16) -> Option<&IfdEntry> {
    entries.iter().find(|entry| entry.tag == tag)
}

/// Decode an ASCII entry, truncated at the first NUL.
///
/// Entries of any other type count as absent.
fn read_ascii(tiff: &[u8], entry: &IfdEntry, order: ByteOrder) -> Result<Option<String>> {
    if entry.field_type != TYPE_ASCII {
        debug!(
            "tag 0x{:04X} has type {}, expected ASCII",
            entry.tag, entry.field_type
        );
        return Ok(None);
    }

    let len = entry.count as usize;
    let bytes = if len <= entry.value.len() {
        &entry.value[..len]
    } else {
        let offset = decode_u32(entry.value, order) as usize;
        Cursor::at(tiff, offset, order)?.read_bytes(len)?
    };

    let text = bytes.split(|&b| b == 0).next().unwrap_or_default();
    Ok(Some(String::from_utf8_lossy(text).into_owned()))
}

/// The directories searched for time tags: the 0th IFD, then the EXIF sub-IFD
struct TagDirectories<'a> {
    tiff: &'a [u8],
    order: ByteOrder,
    ifd0: Vec<IfdEntry>,
    exif_ifd: Vec<IfdEntry>,
}

impl<'a> TagDirectories<'a> {
    fn load(tiff: &'a [u8]) -> Result<Self> {
        let (order, ifd0_offset) = read_tiff_header(tiff)?;
        debug!("TIFF header: {:?}, 0th IFD at {}", order, ifd0_offset);

        let ifd0 = read_ifd(tiff, ifd0_offset, order)?;
        let exif_ifd = match find_entry(&ifd0, TAG_EXIF_IFD_POINTER).and_then(|e| e.pointer(order)) {
            Some(offset) => {
                debug!("EXIF sub-IFD at {}", offset);
                read_ifd(tiff, offset, order)?
            }
            None => Vec::new(),
        };

        Ok(Self { tiff, order, ifd0, exif_ifd })
    }

    fn lookup(&self, tag: u16) -> Option<&IfdEntry> {
        find_entry(&self.ifd0, tag).or_else(|| find_entry(&self.exif_ifd, tag))
    }

    fn ascii(&self, tag: u16) -> Result<Option<String>> {
        match self.lookup(tag) {
            Some(entry) => read_ascii(self.tiff, entry, self.order),
            None => Ok(None),
        }
    }

    /// Like `ascii`, but blank values (all spaces, as EXIF uses for "unknown") are absent.
    /// Anything else is returned verbatim, padding included.
    fn non_blank_ascii(&self, tag: u16) -> Result<Option<String>> {
        Ok(self.ascii(tag)?.filter(|s| !s.trim().is_empty()))
    }
}

/// Extract capture date-time, UTC offset and sub-second strings from JPEG bytes
pub fn extract_time_tags(image: &[u8]) -> Result<RawTimeStrings> {
    let tiff = find_exif_segment(image)?;
    let dirs = TagDirectories::load(tiff)?;

    let date_time = dirs
        .ascii(TAG_DATE_TIME_ORIGINAL)?
        .ok_or_else(|| ExifTimeError::no_exif("DateTimeOriginal tag not found"))?;
    if date_time.trim().is_empty() {
        return Err(ExifTimeError::no_exif("DateTimeOriginal tag is blank"));
    }

    let offset = dirs.non_blank_ascii(TAG_OFFSET_TIME_ORIGINAL)?;
    let subsec = dirs
        .non_blank_ascii(TAG_SUBSEC_TIME_ORIGINAL)?
        .map(|s| s.trim().to_string());
    debug!(
        "DateTimeOriginal={:?} OffsetTimeOriginal={:?} SubSecTimeOriginal={:?}",
        date_time, offset, subsec
    );

    Ok(RawTimeStrings { date_time, offset, subsec })
}

/// Read a whole image file.
///
/// The APP1 segment may follow any number of APP0/APP2 segments (ICC
/// profiles, thumbnails), so no fixed prefix is guaranteed to hold it.
pub(crate) fn read_image(file_path: &Path) -> Result<Vec<u8>> {
    fs::read(file_path).map_err(|e| ExifTimeError::io(file_path, e))
}

/// Read a file and extract its time tags
pub fn read_exif_time_tags(file_path: &Path) -> Result<RawTimeStrings> {
    debug!("Reading EXIF time tags from: {}", file_path.display());
    extract_time_tags(&read_image(file_path)?)
}
