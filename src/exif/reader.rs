//! EXIF reader.
//!
//! Finds the TIFF-structured EXIF block inside a container and walks its
//! directories into a [`MetadataDictionary`].
//!
//! Container lookup (first match wins):
//! - JPEG: APP1 segment starting with `Exif\0\0`
//! - TIFF: the whole file is the block
//! - PNG: `eXIf` chunk
//! - WebP: `EXIF` chunk in the RIFF container
//! - a bare `Exif\0\0` payload (what [`writer::serialize`](super::writer::serialize) emits)
//!
//! Directory walk: IFD0 → Exif IFD (→ Interop IFD) and GPS IFD via pointer
//! tags, IFD0's next link → IFD1 and its JPEG thumbnail. IFD0 must parse;
//! a broken sub-directory is skipped with a debug log, since real cameras
//! ship plenty of dangling interop and maker-note offsets.

use super::MetadataError;
use super::dictionary::{Ifd, MetadataDictionary, TagValue};
use super::jpeg::{EXIF_HEADER, SegmentWalker};
use super::tags;
use std::collections::HashSet;

const PNG_SIGNATURE: &[u8] = b"\x89PNG\r\n\x1a\n";

/// Read the EXIF dictionary from any supported container.
///
/// `Ok(None)` means the container carries no EXIF block (or is not a
/// container we know). Errors mean a block exists but cannot be parsed.
pub fn read_metadata(data: &[u8]) -> Result<Option<MetadataDictionary>, MetadataError> {
    match find_exif_block(data)? {
        Some(block) => parse_tiff(block).map(Some),
        None => Ok(None),
    }
}

/// Locate the raw TIFF block (starting at the byte-order mark).
pub fn find_exif_block(data: &[u8]) -> Result<Option<&[u8]>, MetadataError> {
    if data.starts_with(&[0xFF, 0xD8]) {
        find_in_jpeg(data)
    } else if is_tiff(data) {
        Ok(Some(data))
    } else if data.starts_with(PNG_SIGNATURE) {
        Ok(find_in_png(data))
    } else if data.starts_with(b"RIFF") && data.get(8..12) == Some(b"WEBP") {
        Ok(find_in_webp(data))
    } else if let Some(block) = data.strip_prefix(EXIF_HEADER) {
        Ok(Some(block))
    } else {
        Ok(None)
    }
}

fn is_tiff(data: &[u8]) -> bool {
    data.starts_with(b"II*\0") || data.starts_with(b"MM\0*")
}

fn find_in_jpeg(data: &[u8]) -> Result<Option<&[u8]>, MetadataError> {
    let mut walker = SegmentWalker::new(data)?;
    while let Some(segment) = walker.next_segment()? {
        if segment.is_exif() {
            return Ok(Some(&segment.payload()[EXIF_HEADER.len()..]));
        }
    }
    Ok(None)
}

/// PNG chunks: length (BE u32), type, data, CRC.
fn find_in_png(data: &[u8]) -> Option<&[u8]> {
    let mut pos = PNG_SIGNATURE.len();
    while pos + 8 <= data.len() {
        let length = u32::from_be_bytes([data[pos], data[pos + 1], data[pos + 2], data[pos + 3]]);
        let kind = &data[pos + 4..pos + 8];
        let start = pos + 8;
        let end = start.checked_add(length as usize)?;
        let chunk = data.get(start..end)?;
        match kind {
            b"eXIf" => return Some(chunk),
            b"IEND" => return None,
            _ => {}
        }
        pos = end + 4;
    }
    None
}

/// RIFF chunks: fourcc, size (LE u32), data padded to even length.
fn find_in_webp(data: &[u8]) -> Option<&[u8]> {
    let mut pos = 12;
    while pos + 8 <= data.len() {
        let fourcc = &data[pos..pos + 4];
        let size = u32::from_le_bytes([data[pos + 4], data[pos + 5], data[pos + 6], data[pos + 7]]);
        let start = pos + 8;
        let end = start.checked_add(size as usize)?;
        let chunk = data.get(start..end)?;
        if fourcc == b"EXIF" {
            // Some writers keep the JPEG-style identifier in front of the TIFF header
            return Some(chunk.strip_prefix(EXIF_HEADER).unwrap_or(chunk));
        }
        pos = end + (size as usize % 2);
    }
    None
}

// ---------------------------------------------------------------------------
// TIFF structure
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ByteOrder {
    Little,
    Big,
}

impl ByteOrder {
    fn u16(self, b: [u8; 2]) -> u16 {
        match self {
            ByteOrder::Little => u16::from_le_bytes(b),
            ByteOrder::Big => u16::from_be_bytes(b),
        }
    }

    fn u32(self, b: [u8; 4]) -> u32 {
        match self {
            ByteOrder::Little => u32::from_le_bytes(b),
            ByteOrder::Big => u32::from_be_bytes(b),
        }
    }

    fn u64(self, b: [u8; 8]) -> u64 {
        match self {
            ByteOrder::Little => u64::from_le_bytes(b),
            ByteOrder::Big => u64::from_be_bytes(b),
        }
    }
}

/// Size in bytes of one value of a TIFF field type.
fn type_size(typ: u16) -> Option<usize> {
    match typ {
        1 | 2 | 6 | 7 => Some(1), // BYTE, ASCII, SBYTE, UNDEFINED
        3 | 8 => Some(2),         // SHORT, SSHORT
        4 | 9 | 11 | 13 => Some(4), // LONG, SLONG, FLOAT, IFD
        5 | 10 | 12 => Some(8),   // RATIONAL, SRATIONAL, DOUBLE
        _ => None,
    }
}

struct RawEntry<'a> {
    tag: u16,
    typ: u16,
    value: &'a [u8],
}

struct Tiff<'a> {
    data: &'a [u8],
    order: ByteOrder,
}

impl<'a> Tiff<'a> {
    fn bytes(&self, offset: usize, len: usize) -> Result<&'a [u8], MetadataError> {
        offset
            .checked_add(len)
            .and_then(|end| self.data.get(offset..end))
            .ok_or(MetadataError::OutOfBounds { offset, len })
    }

    fn u16_at(&self, offset: usize) -> Result<u16, MetadataError> {
        let b = self.bytes(offset, 2)?;
        Ok(self.order.u16([b[0], b[1]]))
    }

    fn u32_at(&self, offset: usize) -> Result<u32, MetadataError> {
        let b = self.bytes(offset, 4)?;
        Ok(self.order.u32([b[0], b[1], b[2], b[3]]))
    }

    /// Read one directory. Returns its entries and the next-IFD offset.
    fn read_ifd(
        &self,
        offset: usize,
        visited: &mut HashSet<usize>,
    ) -> Result<(Vec<RawEntry<'a>>, usize), MetadataError> {
        if !visited.insert(offset) {
            return Err(MetadataError::Malformed(format!(
                "directory at offset {offset} is linked twice"
            )));
        }

        let count = usize::from(self.u16_at(offset)?);
        let entries_start = offset + 2;
        // Fail early on a count that cannot fit, before allocating for it
        self.bytes(entries_start, count * 12)?;

        let mut entries = Vec::with_capacity(count);
        for i in 0..count {
            let at = entries_start + i * 12;
            let tag = self.u16_at(at)?;
            let typ = self.u16_at(at + 2)?;
            let value_count = self.u32_at(at + 4)? as usize;

            let Some(size) = type_size(typ) else {
                log::debug!("skipping tag {tag:#06x}: unknown field type {typ}");
                continue;
            };
            let Some(byte_len) = value_count.checked_mul(size) else {
                log::debug!("skipping tag {tag:#06x}: count {value_count} overflows");
                continue;
            };
            let value = if byte_len <= 4 {
                self.bytes(at + 8, byte_len)
            } else {
                self.u32_at(at + 8)
                    .and_then(|value_offset| self.bytes(value_offset as usize, byte_len))
            };
            match value {
                Ok(value) => entries.push(RawEntry { tag, typ, value }),
                Err(e) => log::debug!("skipping tag {tag:#06x}: {e}"),
            }
        }

        // Some writers end the block right after the last entry
        let next = self.u32_at(entries_start + count * 12).unwrap_or(0) as usize;
        Ok((entries, next))
    }

    fn decode(&self, entry: &RawEntry<'_>) -> Option<TagValue> {
        let order = self.order;
        let raw = entry.value;
        let value = match entry.typ {
            1 => TagValue::Byte(raw.to_vec()),
            2 => TagValue::Ascii(raw.to_vec()),
            3 => TagValue::Short(raw.chunks_exact(2).map(|c| order.u16([c[0], c[1]])).collect()),
            4 | 13 => TagValue::Long(
                raw.chunks_exact(4)
                    .map(|c| order.u32([c[0], c[1], c[2], c[3]]))
                    .collect(),
            ),
            5 => TagValue::Rational(
                raw.chunks_exact(8)
                    .map(|c| {
                        (
                            order.u32([c[0], c[1], c[2], c[3]]),
                            order.u32([c[4], c[5], c[6], c[7]]),
                        )
                    })
                    .collect(),
            ),
            6 => TagValue::SByte(raw.iter().map(|&b| b as i8).collect()),
            7 => TagValue::Undefined(raw.to_vec()),
            8 => TagValue::SShort(
                raw.chunks_exact(2)
                    .map(|c| order.u16([c[0], c[1]]) as i16)
                    .collect(),
            ),
            9 => TagValue::SLong(
                raw.chunks_exact(4)
                    .map(|c| order.u32([c[0], c[1], c[2], c[3]]) as i32)
                    .collect(),
            ),
            10 => TagValue::SRational(
                raw.chunks_exact(8)
                    .map(|c| {
                        (
                            order.u32([c[0], c[1], c[2], c[3]]) as i32,
                            order.u32([c[4], c[5], c[6], c[7]]) as i32,
                        )
                    })
                    .collect(),
            ),
            11 => TagValue::Float(
                raw.chunks_exact(4)
                    .map(|c| f32::from_bits(order.u32([c[0], c[1], c[2], c[3]])))
                    .collect(),
            ),
            12 => TagValue::Double(
                raw.chunks_exact(8)
                    .map(|c| {
                        f64::from_bits(order.u64([c[0], c[1], c[2], c[3], c[4], c[5], c[6], c[7]]))
                    })
                    .collect(),
            ),
            _ => return None,
        };
        Some(value)
    }
}

/// Positions recorded from structural tags while absorbing a directory.
#[derive(Debug, Default)]
struct Links {
    exif: Option<usize>,
    gps: Option<usize>,
    interop: Option<usize>,
    thumbnail_offset: Option<usize>,
    thumbnail_length: Option<usize>,
}

/// Copy a directory's entries into `dict`, pulling structural tags aside.
fn absorb(tiff: &Tiff<'_>, ifd: Ifd, entries: &[RawEntry<'_>], dict: &mut MetadataDictionary) -> Links {
    let mut links = Links::default();
    for entry in entries {
        let Some(value) = tiff.decode(entry) else {
            continue;
        };
        if !tags::is_structural(ifd, entry.tag) {
            dict.insert(ifd, entry.tag, value);
            continue;
        }
        let position = value.as_u32().map(|v| v as usize);
        match (ifd, entry.tag) {
            (Ifd::Primary, tags::EXIF_IFD_POINTER) => links.exif = position,
            (Ifd::Primary, tags::GPS_IFD_POINTER) => links.gps = position,
            (Ifd::Exif, tags::INTEROP_IFD_POINTER) => links.interop = position,
            (Ifd::Thumbnail, tags::JPEG_INTERCHANGE_FORMAT) => links.thumbnail_offset = position,
            (Ifd::Thumbnail, tags::JPEG_INTERCHANGE_FORMAT_LENGTH) => {
                links.thumbnail_length = position
            }
            _ => {}
        }
    }
    links
}

/// Read and absorb a linked directory; failures only lose that directory.
fn absorb_linked(
    tiff: &Tiff<'_>,
    ifd: Ifd,
    offset: usize,
    visited: &mut HashSet<usize>,
    dict: &mut MetadataDictionary,
) -> Links {
    match tiff.read_ifd(offset, visited) {
        Ok((entries, _)) => absorb(tiff, ifd, &entries, dict),
        Err(e) => {
            log::debug!("skipping {ifd} directory at offset {offset}: {e}");
            Links::default()
        }
    }
}

/// Parse a TIFF-structured EXIF block.
pub fn parse_tiff(block: &[u8]) -> Result<MetadataDictionary, MetadataError> {
    let order = match block.get(..2) {
        Some(b"II") => ByteOrder::Little,
        Some(b"MM") => ByteOrder::Big,
        _ => return Err(MetadataError::BadHeader),
    };
    let tiff = Tiff { data: block, order };
    if tiff.u16_at(2)? != 42 {
        return Err(MetadataError::BadHeader);
    }

    let mut dict = MetadataDictionary::new();
    let mut visited = HashSet::new();

    let ifd0_offset = tiff.u32_at(4)? as usize;
    let (entries, next) = tiff.read_ifd(ifd0_offset, &mut visited)?;
    let primary = absorb(&tiff, Ifd::Primary, &entries, &mut dict);

    if let Some(offset) = primary.exif {
        let exif = absorb_linked(&tiff, Ifd::Exif, offset, &mut visited, &mut dict);
        if let Some(offset) = exif.interop {
            absorb_linked(&tiff, Ifd::Interop, offset, &mut visited, &mut dict);
        }
    }
    if let Some(offset) = primary.gps {
        absorb_linked(&tiff, Ifd::Gps, offset, &mut visited, &mut dict);
    }
    if next != 0 {
        let first = absorb_linked(&tiff, Ifd::Thumbnail, next, &mut visited, &mut dict);
        if let (Some(offset), Some(length)) = (first.thumbnail_offset, first.thumbnail_length) {
            match tiff.bytes(offset, length) {
                Ok(thumb) => dict.set_thumbnail(thumb.to_vec()),
                Err(e) => log::debug!("dropping thumbnail: {e}"),
            }
        }
    }

    Ok(dict)
}
