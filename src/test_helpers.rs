//! Shared test utilities for the longstitch test suite.
//!
//! Fixture images are generated in memory rather than read from disk, so
//! every test states the exact pixels and metadata it starts from.
//!
//! # Usage
//!
//! ```rust,ignore
//! use crate::test_helpers::*;
//!
//! let jpeg = solid_jpeg(64, 32, [255, 0, 0]);
//! let payload = crate::exif::writer::serialize(&sample_dictionary()).unwrap();
//! let tagged = jpeg_with_app1(&jpeg, &payload);
//! ```

use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder};

use crate::exif::{Ifd, MetadataDictionary, TagValue, tags};

// =========================================================================
// Images
// =========================================================================

/// A `width`×`height` JPEG filled with one RGB color.
pub fn solid_jpeg(width: u32, height: u32, rgb: [u8; 3]) -> Vec<u8> {
    let pixels: Vec<u8> = rgb
        .iter()
        .copied()
        .cycle()
        .take((width * height * 3) as usize)
        .collect();
    let mut out = Vec::new();
    JpegEncoder::new_with_quality(&mut out, 95)
        .write_image(&pixels, width, height, ExtendedColorType::Rgb8)
        .unwrap();
    out
}

/// A `width`×`height` PNG filled with one RGBA color.
pub fn solid_png_rgba(width: u32, height: u32, rgba: [u8; 4]) -> Vec<u8> {
    let pixels: Vec<u8> = rgba
        .iter()
        .copied()
        .cycle()
        .take((width * height * 4) as usize)
        .collect();
    let mut out = Vec::new();
    PngEncoder::new(&mut out)
        .write_image(&pixels, width, height, ExtendedColorType::Rgba8)
        .unwrap();
    out
}

/// Insert an APP1 segment carrying `payload` right after SOI.
pub fn jpeg_with_app1(jpeg: &[u8], payload: &[u8]) -> Vec<u8> {
    assert_eq!(&jpeg[..2], &[0xFF, 0xD8], "not a JPEG");
    let len = u16::try_from(payload.len() + 2).expect("payload too large for APP1");
    let mut out = Vec::with_capacity(jpeg.len() + payload.len() + 4);
    out.extend_from_slice(&jpeg[..2]);
    out.extend_from_slice(&[0xFF, 0xE1]);
    out.extend_from_slice(&len.to_be_bytes());
    out.extend_from_slice(payload);
    out.extend_from_slice(&jpeg[2..]);
    out
}

// =========================================================================
// Metadata
// =========================================================================

/// A dictionary spanning 0th, Exif, GPS and Interop, no thumbnail.
///
/// Only non-structural tags, so it survives a write/read cycle unchanged.
pub fn sample_dictionary() -> MetadataDictionary {
    let mut dict = MetadataDictionary::new();
    dict.insert(Ifd::Primary, tags::MAKE, TagValue::ascii("Canon"));
    dict.insert(Ifd::Primary, tags::MODEL, TagValue::ascii("Canon EOS R5"));
    dict.insert(Ifd::Primary, tags::ORIENTATION, TagValue::Short(vec![1]));
    dict.insert(Ifd::Primary, tags::X_RESOLUTION, TagValue::Rational(vec![(72, 1)]));
    dict.insert(Ifd::Primary, tags::Y_RESOLUTION, TagValue::Rational(vec![(72, 1)]));
    dict.insert(Ifd::Primary, tags::RESOLUTION_UNIT, TagValue::Short(vec![2]));

    dict.insert(Ifd::Exif, tags::EXPOSURE_TIME, TagValue::Rational(vec![(1, 250)]));
    dict.insert(Ifd::Exif, tags::ISO_SPEED_RATINGS, TagValue::Short(vec![400]));
    dict.insert(Ifd::Exif, tags::EXIF_VERSION, TagValue::Undefined(b"0232".to_vec()));
    dict.insert(
        Ifd::Exif,
        tags::DATE_TIME_ORIGINAL,
        TagValue::ascii("2024:05:01 10:15:30"),
    );
    dict.insert(Ifd::Exif, tags::PIXEL_X_DIMENSION, TagValue::Long(vec![6000]));

    dict.insert(Ifd::Gps, tags::GPS_VERSION_ID, TagValue::Byte(vec![2, 3, 0, 0]));
    dict.insert(Ifd::Gps, tags::GPS_LATITUDE_REF, TagValue::ascii("N"));
    dict.insert(
        Ifd::Gps,
        tags::GPS_LATITUDE,
        TagValue::Rational(vec![(52, 1), (22, 1), (1234, 100)]),
    );
    dict.insert(Ifd::Gps, tags::GPS_ALTITUDE, TagValue::Rational(vec![(35, 1)]));

    dict.insert(Ifd::Interop, tags::INTEROP_INDEX, TagValue::ascii("R98"));
    dict
}

// =========================================================================
// TIFF block builder
// =========================================================================

/// Bytes reserved per IFD, so offsets are known before an IFD is built.
const IFD_SLOT: usize = 512;
const FIRST_IFD: usize = 8;

/// Hand-assembles TIFF blocks in either byte order.
///
/// IFD `n` lives at `8 + n * 512`; its out-of-line values follow its entry
/// table inside the same slot. Entry values are taken as already encoded in
/// the builder's byte order. Every IFD has a zero next-IFD link.
pub struct TiffBuilder {
    little: bool,
    ifds: Vec<Vec<u8>>,
}

impl TiffBuilder {
    pub fn little() -> Self {
        Self {
            little: true,
            ifds: Vec::new(),
        }
    }

    pub fn big() -> Self {
        Self {
            little: false,
            ifds: Vec::new(),
        }
    }

    fn u16_bytes(&self, v: u16) -> [u8; 2] {
        if self.little {
            v.to_le_bytes()
        } else {
            v.to_be_bytes()
        }
    }

    fn u32_bytes(&self, v: u32) -> [u8; 4] {
        if self.little {
            v.to_le_bytes()
        } else {
            v.to_be_bytes()
        }
    }

    fn slot_offset(index: usize) -> usize {
        FIRST_IFD + index * IFD_SLOT
    }

    /// Encoded offset of IFD `index`, for use as a pointer tag value.
    pub fn pointer_slot(&self, index: usize) -> Vec<u8> {
        self.u32_bytes(Self::slot_offset(index) as u32).to_vec()
    }

    /// Append an IFD of `(tag, type, count, value bytes)` entries.
    pub fn ifd(&mut self, entries: &[(u16, u16, u32, Vec<u8>)]) {
        let start = Self::slot_offset(self.ifds.len());
        let table_len = 2 + entries.len() * 12 + 4;
        let mut table = Vec::with_capacity(table_len);
        let mut data = Vec::new();

        table.extend(self.u16_bytes(entries.len() as u16));
        for (tag, typ, count, value) in entries {
            table.extend(self.u16_bytes(*tag));
            table.extend(self.u16_bytes(*typ));
            table.extend(self.u32_bytes(*count));
            if value.len() <= 4 {
                let mut inline = value.clone();
                inline.resize(4, 0);
                table.extend(inline);
            } else {
                let offset = start + table_len + data.len();
                table.extend(self.u32_bytes(offset as u32));
                data.extend(value);
                if data.len() % 2 == 1 {
                    data.push(0);
                }
            }
        }
        table.extend(self.u32_bytes(0));
        table.extend(data);
        assert!(table.len() <= IFD_SLOT, "IFD overflows its slot");
        self.ifds.push(table);
    }

    pub fn finish(self) -> Vec<u8> {
        let mut out = if self.little {
            b"II*\0".to_vec()
        } else {
            b"MM\0*".to_vec()
        };
        out.extend(self.u32_bytes(FIRST_IFD as u32));
        let last = self.ifds.len().saturating_sub(1);
        for (i, ifd) in self.ifds.iter().enumerate() {
            out.extend(ifd);
            if i < last {
                out.resize(Self::slot_offset(i + 1), 0);
            }
        }
        out
    }
}
