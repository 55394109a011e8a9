//! EXIF writer.
//!
//! Serializes a [`MetadataDictionary`] into an APP1 payload and splices it
//! into an encoded JPEG.
//!
//! ## Block layout
//!
//! Always big-endian (`MM`), IFD0 at offset 8, then in order:
//!
//! | Part | Present when |
//! |---|---|
//! | IFD0 | always |
//! | Exif IFD | Exif or Interop tags exist |
//! | GPS IFD | GPS tags exist |
//! | Interop IFD | Interop tags exist |
//! | IFD1 | thumbnail tags or thumbnail bytes exist |
//! | thumbnail JPEG | thumbnail bytes exist |
//!
//! Each directory is followed by its out-of-line values, padded to even
//! offsets. Pointer tags are regenerated from this layout.

use super::MetadataError;
use super::dictionary::{Ifd, MetadataDictionary, TagValue};
use super::jpeg::{APP0, APP1, EXIF_HEADER, SOI, SegmentWalker};
use super::tags;

/// Largest payload an APP1 segment can hold (length field covers itself).
pub const MAX_SEGMENT_PAYLOAD: usize = u16::MAX as usize - 2;

const LONG: u16 = 4;

struct Entry {
    tag: u16,
    typ: u16,
    count: u32,
    data: Vec<u8>,
}

impl Entry {
    fn long(tag: u16, value: u32) -> Self {
        Entry {
            tag,
            typ: LONG,
            count: 1,
            data: value.to_be_bytes().to_vec(),
        }
    }

    fn out_of_line_len(&self) -> usize {
        if self.data.len() > 4 {
            padded(self.data.len())
        } else {
            0
        }
    }
}

fn padded(len: usize) -> usize {
    len + len % 2
}

fn encode_value(value: &TagValue) -> Vec<u8> {
    let mut out = Vec::new();
    match value {
        TagValue::Byte(v) | TagValue::Ascii(v) | TagValue::Undefined(v) => out.extend(v),
        TagValue::SByte(v) => out.extend(v.iter().map(|&b| b as u8)),
        TagValue::Short(v) => v.iter().for_each(|x| out.extend(x.to_be_bytes())),
        TagValue::SShort(v) => v.iter().for_each(|x| out.extend(x.to_be_bytes())),
        TagValue::Long(v) => v.iter().for_each(|x| out.extend(x.to_be_bytes())),
        TagValue::SLong(v) => v.iter().for_each(|x| out.extend(x.to_be_bytes())),
        TagValue::Rational(v) => v.iter().for_each(|(n, d)| {
            out.extend(n.to_be_bytes());
            out.extend(d.to_be_bytes());
        }),
        TagValue::SRational(v) => v.iter().for_each(|(n, d)| {
            out.extend(n.to_be_bytes());
            out.extend(d.to_be_bytes());
        }),
        TagValue::Float(v) => v.iter().for_each(|x| out.extend(x.to_bits().to_be_bytes())),
        TagValue::Double(v) => v.iter().for_each(|x| out.extend(x.to_bits().to_be_bytes())),
    }
    out
}

fn entries_for(dict: &MetadataDictionary, ifd: Ifd) -> Result<Vec<Entry>, MetadataError> {
    dict.tags(ifd)
        .filter(|(tag, _)| !tags::is_structural(ifd, *tag))
        .map(|(tag, value)| {
            let count = u32::try_from(value.count()).map_err(|_| {
                MetadataError::Malformed(format!("{ifd} tag {tag:#06x} has too many values"))
            })?;
            Ok(Entry {
                tag,
                typ: value.type_code(),
                count,
                data: encode_value(value),
            })
        })
        .collect()
}

fn ifd_len(entries: &[Entry]) -> usize {
    2 + entries.len() * 12 + 4 + entries.iter().map(Entry::out_of_line_len).sum::<usize>()
}

fn set_long(entries: &mut [Entry], tag: u16, value: usize) {
    if let Some(entry) = entries.iter_mut().find(|e| e.tag == tag) {
        entry.data = (value as u32).to_be_bytes().to_vec();
    }
}

/// Append one directory at TIFF offset `at` followed by its value area.
fn write_ifd(tiff: &mut Vec<u8>, entries: &[Entry], at: usize, next: usize) {
    debug_assert_eq!(tiff.len(), at);
    tiff.extend((entries.len() as u16).to_be_bytes());

    let mut value_at = at + 2 + entries.len() * 12 + 4;
    let mut values = Vec::new();
    for entry in entries {
        tiff.extend(entry.tag.to_be_bytes());
        tiff.extend(entry.typ.to_be_bytes());
        tiff.extend(entry.count.to_be_bytes());
        if entry.data.len() <= 4 {
            tiff.extend(&entry.data);
            tiff.extend(std::iter::repeat_n(0u8, 4 - entry.data.len()));
        } else {
            tiff.extend((value_at as u32).to_be_bytes());
            values.extend(&entry.data);
            if entry.data.len() % 2 == 1 {
                values.push(0);
            }
            value_at += entry.out_of_line_len();
        }
    }
    tiff.extend((next as u32).to_be_bytes());
    tiff.extend(values);
}

/// Serialize `dict` into an APP1 payload: `Exif\0\0` followed by the TIFF block.
pub fn serialize(dict: &MetadataDictionary) -> Result<Vec<u8>, MetadataError> {
    let has_interop = dict.has_ifd(Ifd::Interop);
    let has_exif = dict.has_ifd(Ifd::Exif) || has_interop;
    let has_gps = dict.has_ifd(Ifd::Gps);
    let thumbnail = dict.thumbnail();
    let has_first = dict.has_ifd(Ifd::Thumbnail) || thumbnail.is_some();

    let mut primary = entries_for(dict, Ifd::Primary)?;
    if has_exif {
        primary.push(Entry::long(tags::EXIF_IFD_POINTER, 0));
    }
    if has_gps {
        primary.push(Entry::long(tags::GPS_IFD_POINTER, 0));
    }
    let mut exif = entries_for(dict, Ifd::Exif)?;
    if has_interop {
        exif.push(Entry::long(tags::INTEROP_IFD_POINTER, 0));
    }
    let gps = entries_for(dict, Ifd::Gps)?;
    let interop = entries_for(dict, Ifd::Interop)?;
    let mut first = entries_for(dict, Ifd::Thumbnail)?;
    if let Some(thumb) = thumbnail {
        first.push(Entry::long(tags::JPEG_INTERCHANGE_FORMAT, 0));
        first.push(Entry::long(tags::JPEG_INTERCHANGE_FORMAT_LENGTH, thumb.len() as u32));
    }

    for entries in [&mut primary, &mut exif, &mut first] {
        entries.sort_by_key(|e| e.tag);
    }
    for entries in [&primary, &exif, &gps, &interop, &first] {
        if entries.len() > usize::from(u16::MAX) {
            return Err(MetadataError::Malformed(format!(
                "{} entries do not fit one directory",
                entries.len()
            )));
        }
    }

    // First pass: positions
    let mut cursor = 8;
    let mut place = |len: usize| {
        let at = cursor;
        cursor += len;
        at
    };
    let primary_at = place(ifd_len(&primary));
    let exif_at = has_exif.then(|| place(ifd_len(&exif)));
    let gps_at = has_gps.then(|| place(ifd_len(&gps)));
    let interop_at = has_interop.then(|| place(ifd_len(&interop)));
    let first_at = has_first.then(|| place(ifd_len(&first)));
    let thumb_at = thumbnail.map(|t| place(t.len()));
    let total = cursor;

    if total > u32::MAX as usize {
        return Err(MetadataError::SegmentTooLarge(total));
    }

    if let Some(at) = exif_at {
        set_long(&mut primary, tags::EXIF_IFD_POINTER, at);
    }
    if let Some(at) = gps_at {
        set_long(&mut primary, tags::GPS_IFD_POINTER, at);
    }
    if let Some(at) = interop_at {
        set_long(&mut exif, tags::INTEROP_IFD_POINTER, at);
    }
    if let Some(at) = thumb_at {
        set_long(&mut first, tags::JPEG_INTERCHANGE_FORMAT, at);
    }

    // Second pass: bytes
    let mut tiff = Vec::with_capacity(total);
    tiff.extend(b"MM\0\x2A");
    tiff.extend(8u32.to_be_bytes());
    write_ifd(&mut tiff, &primary, primary_at, first_at.unwrap_or(0));
    if let Some(at) = exif_at {
        write_ifd(&mut tiff, &exif, at, 0);
    }
    if let Some(at) = gps_at {
        write_ifd(&mut tiff, &gps, at, 0);
    }
    if let Some(at) = interop_at {
        write_ifd(&mut tiff, &interop, at, 0);
    }
    if let Some(at) = first_at {
        write_ifd(&mut tiff, &first, at, 0);
    }
    if let Some(thumb) = thumbnail {
        tiff.extend(thumb);
    }
    debug_assert_eq!(tiff.len(), total);

    let mut payload = Vec::with_capacity(EXIF_HEADER.len() + tiff.len());
    payload.extend(EXIF_HEADER);
    payload.extend(tiff);
    Ok(payload)
}

/// Place `payload` as the only EXIF APP1 segment of `jpeg`.
///
/// The new segment goes right after any leading APP0 (JFIF) segments.
/// Existing EXIF segments are dropped; every other segment and the scan
/// data are kept byte for byte.
pub fn inject_into_jpeg(jpeg: &[u8], payload: &[u8]) -> Result<Vec<u8>, MetadataError> {
    if payload.len() > MAX_SEGMENT_PAYLOAD {
        return Err(MetadataError::SegmentTooLarge(payload.len()));
    }

    let mut walker = SegmentWalker::new(jpeg)?;
    let mut leading = Vec::new();
    let mut rest = Vec::new();
    while let Some(segment) = walker.next_segment()? {
        if segment.is_exif() {
            continue;
        }
        if segment.marker == APP0 && rest.is_empty() {
            leading.push(segment.raw);
        } else {
            rest.push(segment.raw);
        }
    }
    let scan = &jpeg[walker.position()..];

    let mut out = Vec::with_capacity(jpeg.len() + payload.len() + 4);
    out.extend([0xFF, SOI]);
    for raw in leading {
        out.extend(raw);
    }
    out.extend([0xFF, APP1]);
    out.extend(((payload.len() + 2) as u16).to_be_bytes());
    out.extend(payload);
    for raw in rest {
        out.extend(raw);
    }
    out.extend(scan);
    Ok(out)
}
