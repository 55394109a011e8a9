//! Tag ids and display names.
//!
//! Only the tags the crate refers to by name, plus the common ones worth
//! naming in `inspect` output. Unknown tags are still carried verbatim.

use super::dictionary::Ifd;

// 0th / 1st
pub const IMAGE_WIDTH: u16 = 0x0100;
pub const IMAGE_LENGTH: u16 = 0x0101;
pub const COMPRESSION: u16 = 0x0103;
pub const IMAGE_DESCRIPTION: u16 = 0x010E;
pub const MAKE: u16 = 0x010F;
pub const MODEL: u16 = 0x0110;
pub const STRIP_OFFSETS: u16 = 0x0111;
pub const ORIENTATION: u16 = 0x0112;
pub const ROWS_PER_STRIP: u16 = 0x0116;
pub const STRIP_BYTE_COUNTS: u16 = 0x0117;
pub const X_RESOLUTION: u16 = 0x011A;
pub const Y_RESOLUTION: u16 = 0x011B;
pub const FREE_OFFSETS: u16 = 0x0120;
pub const FREE_BYTE_COUNTS: u16 = 0x0121;
pub const RESOLUTION_UNIT: u16 = 0x0128;
pub const SOFTWARE: u16 = 0x0131;
pub const DATE_TIME: u16 = 0x0132;
pub const ARTIST: u16 = 0x013B;
pub const TILE_OFFSETS: u16 = 0x0144;
pub const TILE_BYTE_COUNTS: u16 = 0x0145;
pub const SUB_IFDS: u16 = 0x014A;
pub const JPEG_INTERCHANGE_FORMAT: u16 = 0x0201;
pub const JPEG_INTERCHANGE_FORMAT_LENGTH: u16 = 0x0202;
pub const Y_CB_CR_POSITIONING: u16 = 0x0213;
pub const COPYRIGHT: u16 = 0x8298;
pub const EXIF_IFD_POINTER: u16 = 0x8769;
pub const GPS_IFD_POINTER: u16 = 0x8825;

// Exif
pub const EXPOSURE_TIME: u16 = 0x829A;
pub const F_NUMBER: u16 = 0x829D;
pub const ISO_SPEED_RATINGS: u16 = 0x8827;
pub const EXIF_VERSION: u16 = 0x9000;
pub const DATE_TIME_ORIGINAL: u16 = 0x9003;
pub const DATE_TIME_DIGITIZED: u16 = 0x9004;
pub const OFFSET_TIME_ORIGINAL: u16 = 0x9011;
pub const FOCAL_LENGTH: u16 = 0x920A;
pub const MAKER_NOTE: u16 = 0x927C;
pub const USER_COMMENT: u16 = 0x9286;
pub const COLOR_SPACE: u16 = 0xA001;
pub const PIXEL_X_DIMENSION: u16 = 0xA002;
pub const PIXEL_Y_DIMENSION: u16 = 0xA003;
pub const INTEROP_IFD_POINTER: u16 = 0xA005;
pub const LENS_MODEL: u16 = 0xA434;

// GPS
pub const GPS_VERSION_ID: u16 = 0x0000;
pub const GPS_LATITUDE_REF: u16 = 0x0001;
pub const GPS_LATITUDE: u16 = 0x0002;
pub const GPS_LONGITUDE_REF: u16 = 0x0003;
pub const GPS_LONGITUDE: u16 = 0x0004;
pub const GPS_ALTITUDE_REF: u16 = 0x0005;
pub const GPS_ALTITUDE: u16 = 0x0006;
pub const GPS_TIME_STAMP: u16 = 0x0007;
pub const GPS_DATE_STAMP: u16 = 0x001D;

// Interop
pub const INTEROP_INDEX: u16 = 0x0001;
pub const INTEROP_VERSION: u16 = 0x0002;

/// Tags that encode file positions or sub-directory links.
///
/// They are meaningless once copied into another file, so the reader drops
/// them and the writer regenerates the ones it needs.
pub fn is_structural(ifd: Ifd, tag: u16) -> bool {
    match ifd {
        Ifd::Primary | Ifd::Thumbnail => matches!(
            tag,
            STRIP_OFFSETS
                | STRIP_BYTE_COUNTS
                | FREE_OFFSETS
                | FREE_BYTE_COUNTS
                | TILE_OFFSETS
                | TILE_BYTE_COUNTS
                | SUB_IFDS
                | JPEG_INTERCHANGE_FORMAT
                | JPEG_INTERCHANGE_FORMAT_LENGTH
                | EXIF_IFD_POINTER
                | GPS_IFD_POINTER
        ),
        Ifd::Exif => tag == INTEROP_IFD_POINTER,
        Ifd::Gps | Ifd::Interop => false,
    }
}

/// Human-readable name of a tag, if known.
pub fn tag_name(ifd: Ifd, tag: u16) -> Option<&'static str> {
    let name = match ifd {
        Ifd::Primary | Ifd::Thumbnail => match tag {
            IMAGE_WIDTH => "ImageWidth",
            IMAGE_LENGTH => "ImageLength",
            COMPRESSION => "Compression",
            IMAGE_DESCRIPTION => "ImageDescription",
            MAKE => "Make",
            MODEL => "Model",
            ORIENTATION => "Orientation",
            ROWS_PER_STRIP => "RowsPerStrip",
            X_RESOLUTION => "XResolution",
            Y_RESOLUTION => "YResolution",
            RESOLUTION_UNIT => "ResolutionUnit",
            SOFTWARE => "Software",
            DATE_TIME => "DateTime",
            ARTIST => "Artist",
            Y_CB_CR_POSITIONING => "YCbCrPositioning",
            COPYRIGHT => "Copyright",
            _ => return None,
        },
        Ifd::Exif => match tag {
            EXPOSURE_TIME => "ExposureTime",
            F_NUMBER => "FNumber",
            ISO_SPEED_RATINGS => "ISOSpeedRatings",
            EXIF_VERSION => "ExifVersion",
            DATE_TIME_ORIGINAL => "DateTimeOriginal",
            DATE_TIME_DIGITIZED => "DateTimeDigitized",
            OFFSET_TIME_ORIGINAL => "OffsetTimeOriginal",
            FOCAL_LENGTH => "FocalLength",
            MAKER_NOTE => "MakerNote",
            USER_COMMENT => "UserComment",
            COLOR_SPACE => "ColorSpace",
            PIXEL_X_DIMENSION => "PixelXDimension",
            PIXEL_Y_DIMENSION => "PixelYDimension",
            LENS_MODEL => "LensModel",
            _ => return None,
        },
        Ifd::Gps => match tag {
            GPS_VERSION_ID => "GPSVersionID",
            GPS_LATITUDE_REF => "GPSLatitudeRef",
            GPS_LATITUDE => "GPSLatitude",
            GPS_LONGITUDE_REF => "GPSLongitudeRef",
            GPS_LONGITUDE => "GPSLongitude",
            GPS_ALTITUDE_REF => "GPSAltitudeRef",
            GPS_ALTITUDE => "GPSAltitude",
            GPS_TIME_STAMP => "GPSTimeStamp",
            GPS_DATE_STAMP => "GPSDateStamp",
            _ => return None,
        },
        Ifd::Interop => match tag {
            INTEROP_INDEX => "InteroperabilityIndex",
            INTEROP_VERSION => "InteroperabilityVersion",
            _ => return None,
        },
    };
    Some(name)
}
