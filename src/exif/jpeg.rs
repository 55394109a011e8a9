//! JPEG marker segment walking.
//!
//! A JPEG stream is `SOI`, a run of marker segments (`FF xx` + big-endian
//! length + payload), then `SOS` and entropy-coded scan data. Metadata lives
//! in the header run; nothing after `SOS` is ever inspected or rewritten.

use super::MetadataError;

pub(crate) const SOI: u8 = 0xD8;
pub(crate) const EOI: u8 = 0xD9;
pub(crate) const SOS: u8 = 0xDA;
pub(crate) const APP0: u8 = 0xE0;
pub(crate) const APP1: u8 = 0xE1;

/// Identifier that opens an EXIF APP1 payload.
pub(crate) const EXIF_HEADER: &[u8] = b"Exif\0\0";

/// One header segment, borrowed from the stream it came from.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Segment<'a> {
    pub marker: u8,
    /// Marker, length and payload exactly as they appear in the stream.
    pub raw: &'a [u8],
}

impl<'a> Segment<'a> {
    pub fn payload(&self) -> &'a [u8] {
        self.raw.get(4..).unwrap_or(&[])
    }

    pub fn is_exif(&self) -> bool {
        self.marker == APP1 && self.payload().starts_with(EXIF_HEADER)
    }
}

/// Walks header segments from just after `SOI` up to `SOS`/`EOI`.
pub(crate) struct SegmentWalker<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> SegmentWalker<'a> {
    pub fn new(data: &'a [u8]) -> Result<Self, MetadataError> {
        if !data.starts_with(&[0xFF, SOI]) {
            return Err(MetadataError::NotJpeg);
        }
        Ok(Self { data, pos: 2 })
    }

    /// Offset where the walk stopped: the `SOS`/`EOI` marker, or the end of
    /// the data when neither was found.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Next header segment, or `None` once the scan (or end of image) starts.
    pub fn next_segment(&mut self) -> Result<Option<Segment<'a>>, MetadataError> {
        let data = self.data;
        loop {
            if self.pos >= data.len() {
                return Ok(None);
            }
            if data[self.pos] != 0xFF {
                return Err(MetadataError::Malformed(format!(
                    "expected a marker at offset {}",
                    self.pos
                )));
            }
            let Some(&marker) = data.get(self.pos + 1) else {
                return Err(MetadataError::Truncated);
            };

            match marker {
                // Fill byte before the real marker
                0xFF => {
                    self.pos += 1;
                    continue;
                }
                SOS | EOI => return Ok(None),
                // Standalone markers carry no length field
                0x01 | 0xD0..=0xD7 | SOI => {
                    let raw = &data[self.pos..self.pos + 2];
                    self.pos += 2;
                    return Ok(Some(Segment { marker, raw }));
                }
                _ => {}
            }

            let Some(len_bytes) = data.get(self.pos + 2..self.pos + 4) else {
                return Err(MetadataError::Truncated);
            };
            let length = usize::from(u16::from_be_bytes([len_bytes[0], len_bytes[1]]));
            if length < 2 {
                return Err(MetadataError::Malformed(format!(
                    "segment {marker:#04x} at offset {} has length {length}",
                    self.pos
                )));
            }
            let end = self.pos + 2 + length;
            let Some(raw) = data.get(self.pos..end) else {
                return Err(MetadataError::Truncated);
            };
            self.pos = end;
            return Ok(Some(Segment { marker, raw }));
        }
    }
}
