//! In-memory form of an EXIF block: five IFDs of typed tag values plus the
//! optional embedded thumbnail.

use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

/// The image file directories an EXIF block can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Ifd {
    /// Main image directory.
    #[serde(rename = "0th")]
    Primary,
    #[serde(rename = "Exif")]
    Exif,
    #[serde(rename = "GPS")]
    Gps,
    #[serde(rename = "Interop")]
    Interop,
    /// Thumbnail directory.
    #[serde(rename = "1st")]
    Thumbnail,
}

impl Ifd {
    pub const ALL: [Ifd; 5] = [
        Ifd::Primary,
        Ifd::Exif,
        Ifd::Gps,
        Ifd::Interop,
        Ifd::Thumbnail,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Ifd::Primary => "0th",
            Ifd::Exif => "Exif",
            Ifd::Gps => "GPS",
            Ifd::Interop => "Interop",
            Ifd::Thumbnail => "1st",
        }
    }
}

impl fmt::Display for Ifd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A tag value, one variant per TIFF field type.
///
/// `Ascii` keeps the raw bytes exactly as stored, including the trailing
/// NUL when the writer of the source put one there.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum TagValue {
    Byte(Vec<u8>),
    #[serde(serialize_with = "ascii_lossy")]
    Ascii(Vec<u8>),
    Short(Vec<u16>),
    Long(Vec<u32>),
    Rational(Vec<(u32, u32)>),
    SByte(Vec<i8>),
    Undefined(Vec<u8>),
    SShort(Vec<i16>),
    SLong(Vec<i32>),
    SRational(Vec<(i32, i32)>),
    Float(Vec<f32>),
    Double(Vec<f64>),
}

#[allow(clippy::ptr_arg)]
fn ascii_lossy<S: Serializer>(raw: &Vec<u8>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&String::from_utf8_lossy(trim_nul(raw)))
}

fn trim_nul(raw: &[u8]) -> &[u8] {
    let end = raw.iter().rposition(|&b| b != 0).map_or(0, |i| i + 1);
    &raw[..end]
}

impl TagValue {
    /// NUL-terminated ASCII value.
    pub fn ascii(text: &str) -> Self {
        let mut raw = text.as_bytes().to_vec();
        raw.push(0);
        TagValue::Ascii(raw)
    }

    /// TIFF field type code.
    pub fn type_code(&self) -> u16 {
        match self {
            TagValue::Byte(_) => 1,
            TagValue::Ascii(_) => 2,
            TagValue::Short(_) => 3,
            TagValue::Long(_) => 4,
            TagValue::Rational(_) => 5,
            TagValue::SByte(_) => 6,
            TagValue::Undefined(_) => 7,
            TagValue::SShort(_) => 8,
            TagValue::SLong(_) => 9,
            TagValue::SRational(_) => 10,
            TagValue::Float(_) => 11,
            TagValue::Double(_) => 12,
        }
    }

    /// Number of values, which is what a TIFF entry stores as its count.
    pub fn count(&self) -> usize {
        match self {
            TagValue::Byte(v) | TagValue::Ascii(v) | TagValue::Undefined(v) => v.len(),
            TagValue::Short(v) => v.len(),
            TagValue::Long(v) => v.len(),
            TagValue::Rational(v) => v.len(),
            TagValue::SByte(v) => v.len(),
            TagValue::SShort(v) => v.len(),
            TagValue::SLong(v) => v.len(),
            TagValue::SRational(v) => v.len(),
            TagValue::Float(v) => v.len(),
            TagValue::Double(v) => v.len(),
        }
    }

    /// Text of an `Ascii` value with trailing NULs removed.
    pub fn as_ascii(&self) -> Option<&str> {
        match self {
            TagValue::Ascii(raw) => std::str::from_utf8(trim_nul(raw)).ok(),
            _ => None,
        }
    }

    /// First value of an unsigned integer field.
    pub fn as_u32(&self) -> Option<u32> {
        match self {
            TagValue::Byte(v) => v.first().map(|&x| u32::from(x)),
            TagValue::Short(v) => v.first().map(|&x| u32::from(x)),
            TagValue::Long(v) => v.first().copied(),
            _ => None,
        }
    }
}

impl fmt::Display for TagValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn list<T: fmt::Display>(f: &mut fmt::Formatter<'_>, values: &[T]) -> fmt::Result {
            for (i, v) in values.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{v}")?;
            }
            Ok(())
        }

        match self {
            TagValue::Ascii(raw) => write!(f, "\"{}\"", String::from_utf8_lossy(trim_nul(raw))),
            TagValue::Byte(v) | TagValue::Undefined(v) if v.len() > 16 => {
                write!(f, "<{} bytes>", v.len())
            }
            TagValue::Byte(v) | TagValue::Undefined(v) => list(f, v),
            TagValue::Short(v) => list(f, v),
            TagValue::Long(v) => list(f, v),
            TagValue::SByte(v) => list(f, v),
            TagValue::SShort(v) => list(f, v),
            TagValue::SLong(v) => list(f, v),
            TagValue::Float(v) => list(f, v),
            TagValue::Double(v) => list(f, v),
            TagValue::Rational(v) => {
                let parts: Vec<String> = v.iter().map(|(n, d)| format!("{n}/{d}")).collect();
                f.write_str(&parts.join(", "))
            }
            TagValue::SRational(v) => {
                let parts: Vec<String> = v.iter().map(|(n, d)| format!("{n}/{d}")).collect();
                f.write_str(&parts.join(", "))
            }
        }
    }
}

/// Every tag of an EXIF block, grouped by IFD.
///
/// Structural tags (sub-IFD pointers, thumbnail offset/length, strip and
/// tile offsets) are never stored here: they describe byte positions in a
/// particular file and are regenerated by the writer.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MetadataDictionary {
    ifds: BTreeMap<Ifd, BTreeMap<u16, TagValue>>,
    #[serde(skip_serializing_if = "Option::is_none", serialize_with = "thumbnail_len")]
    thumbnail: Option<Vec<u8>>,
}

fn thumbnail_len<S: Serializer>(thumb: &Option<Vec<u8>>, serializer: S) -> Result<S::Ok, S::Error> {
    match thumb {
        Some(bytes) => serializer.serialize_some(&bytes.len()),
        None => serializer.serialize_none(),
    }
}

impl MetadataDictionary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a tag. Returns the previous value.
    pub fn insert(&mut self, ifd: Ifd, tag: u16, value: TagValue) -> Option<TagValue> {
        self.ifds.entry(ifd).or_default().insert(tag, value)
    }

    pub fn get(&self, ifd: Ifd, tag: u16) -> Option<&TagValue> {
        self.ifds.get(&ifd).and_then(|tags| tags.get(&tag))
    }


    /// Tags of one IFD in ascending tag order. Empty when the IFD is absent.
    pub fn tags(&self, ifd: Ifd) -> impl Iterator<Item = (u16, &TagValue)> + '_ {
        self.ifds
            .get(&ifd)
            .into_iter()
            .flat_map(|tags| tags.iter().map(|(&tag, value)| (tag, value)))
    }

    pub fn has_ifd(&self, ifd: Ifd) -> bool {
        self.ifds.get(&ifd).is_some_and(|tags| !tags.is_empty())
    }

    pub fn tag_count(&self) -> usize {
        self.ifds.values().map(BTreeMap::len).sum()
    }

    /// True when there is nothing worth writing: no tags and no thumbnail.
    pub fn is_empty(&self) -> bool {
        self.tag_count() == 0 && self.thumbnail.is_none()
    }

    /// Embedded JPEG thumbnail referenced by the `1st` IFD.
    pub fn thumbnail(&self) -> Option<&[u8]> {
        self.thumbnail.as_deref()
    }

    pub fn set_thumbnail(&mut self, bytes: Vec<u8>) {
        self.thumbnail = Some(bytes);
    }

    /// Drop the `1st` IFD together with its thumbnail image.
    pub fn strip_thumbnail(&mut self) {
        self.thumbnail = None;
        self.ifds.remove(&Ifd::Thumbnail);
    }
}
