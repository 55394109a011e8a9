//! EXIF metadata: reading, writing, and carrying it from a source image to
//! the stitched output.
//!
//! ## Modules
//!
//! - `dictionary`: [`MetadataDictionary`], the parsed form (IFD → tag → value)
//! - `tags`: tag ids, display names, and which tags are structural
//! - `reader`: container lookup (JPEG, TIFF, PNG, WebP) and IFD walking
//! - `writer`: TIFF serialization and JPEG APP1 injection
//!
//! ## Transplant
//!
//! [`transplant`] parses the first source image, serializes what it found,
//! and injects it into the freshly encoded JPEG. It never fails the run:
//! anything that goes wrong is logged and reported as
//! [`MetadataOutcome::Degraded`], and the output is still delivered, just
//! without metadata.

pub mod dictionary;
pub(crate) mod jpeg;
pub mod reader;
pub mod tags;
pub mod writer;

pub use dictionary::{Ifd, MetadataDictionary, TagValue};

use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MetadataError {
    #[error("not a TIFF header")]
    BadHeader,
    #[error("read of {len} bytes at offset {offset} runs past the end of the EXIF block")]
    OutOfBounds { offset: usize, len: usize },
    #[error("malformed EXIF data: {0}")]
    Malformed(String),
    #[error("not a JPEG stream")]
    NotJpeg,
    #[error("JPEG stream ends inside a marker segment")]
    Truncated,
    #[error("EXIF segment of {0} bytes does not fit an APP1 segment")]
    SegmentTooLarge(usize),
}

/// Seam between the pipeline and the metadata format.
pub trait MetadataCodec: Sync {
    /// Read metadata from a source image. `Ok(None)` when it has none.
    fn parse(&self, source: &[u8]) -> Result<Option<MetadataDictionary>, MetadataError>;

    /// Binary segment form of `dict`, ready for [`inject`](Self::inject).
    fn serialize(&self, dict: &MetadataDictionary) -> Result<Vec<u8>, MetadataError>;

    /// Copy of `encoded` carrying `segment` as its metadata.
    fn inject(&self, encoded: &[u8], segment: &[u8]) -> Result<Vec<u8>, MetadataError>;
}

/// EXIF in JPEG APP1, read from any container the reader knows.
#[derive(Debug, Default, Clone, Copy)]
pub struct ExifCodec;

impl MetadataCodec for ExifCodec {
    fn parse(&self, source: &[u8]) -> Result<Option<MetadataDictionary>, MetadataError> {
        reader::read_metadata(source)
    }

    fn serialize(&self, dict: &MetadataDictionary) -> Result<Vec<u8>, MetadataError> {
        writer::serialize(dict)
    }

    fn inject(&self, encoded: &[u8], segment: &[u8]) -> Result<Vec<u8>, MetadataError> {
        writer::inject_into_jpeg(encoded, segment)
    }
}

/// What happened to the source metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum MetadataOutcome {
    /// Metadata was written into the output.
    Transplanted {
        tags: usize,
        /// The embedded thumbnail was left out to fit the segment limit.
        thumbnail_dropped: bool,
    },
    /// The source had nothing to carry over.
    Absent,
    /// Metadata existed (or could not be read) and was not carried over.
    Degraded { reason: String },
}

impl MetadataOutcome {
    /// One-line note for the user, when there is something to say.
    pub fn notice(&self) -> Option<String> {
        match self {
            MetadataOutcome::Transplanted {
                thumbnail_dropped: true,
                ..
            } => Some("EXIF thumbnail dropped to fit the output segment".to_string()),
            MetadataOutcome::Transplanted { .. } | MetadataOutcome::Absent => None,
            MetadataOutcome::Degraded { reason } => {
                Some(format!("output written without metadata: {reason}"))
            }
        }
    }
}

/// Carry the metadata of `source` into `encoded`.
///
/// Returns the bytes to deliver (with metadata when it could be attached,
/// the untouched `encoded` bytes otherwise) and what happened.
/// `keep_thumbnail = false` strips the embedded thumbnail up front.
pub fn transplant<C: MetadataCodec + ?Sized>(
    codec: &C,
    encoded: Vec<u8>,
    source: &[u8],
    keep_thumbnail: bool,
) -> (Vec<u8>, MetadataOutcome) {
    match try_transplant(codec, &encoded, source, keep_thumbnail) {
        Ok(Some(result)) => result,
        Ok(None) => (encoded, MetadataOutcome::Absent),
        Err(e) => {
            log::warn!("metadata not carried over: {e}");
            (
                encoded,
                MetadataOutcome::Degraded {
                    reason: e.to_string(),
                },
            )
        }
    }
}

fn try_transplant<C: MetadataCodec + ?Sized>(
    codec: &C,
    encoded: &[u8],
    source: &[u8],
    keep_thumbnail: bool,
) -> Result<Option<(Vec<u8>, MetadataOutcome)>, MetadataError> {
    let Some(mut dict) = codec.parse(source)? else {
        return Ok(None);
    };
    if !keep_thumbnail {
        dict.strip_thumbnail();
    }
    if dict.is_empty() {
        return Ok(None);
    }

    let segment = codec.serialize(&dict)?;
    let (bytes, thumbnail_dropped) = match codec.inject(encoded, &segment) {
        Ok(bytes) => (bytes, false),
        Err(MetadataError::SegmentTooLarge(size)) if dict.thumbnail().is_some() => {
            log::warn!("EXIF segment is {size} bytes; retrying without the embedded thumbnail");
            dict.strip_thumbnail();
            if dict.is_empty() {
                return Ok(None);
            }
            let segment = codec.serialize(&dict)?;
            (codec.inject(encoded, &segment)?, true)
        }
        Err(e) => return Err(e),
    };

    log::debug!("transplanted {} EXIF tags", dict.tag_count());
    Ok(Some((
        bytes,
        MetadataOutcome::Transplanted {
            tags: dict.tag_count(),
            thumbnail_dropped,
        },
    )))
}
