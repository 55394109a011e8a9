//! Parameter types for raster operations.
//!
//! These structs describe *what* to draw, not *how*. They are the interface
//! between the high-level [`operations`](super::operations) module (which
//! walks a layout plan) and the [`backend`](super::backend) (which does the
//! pixel work), so a mock backend can record them verbatim.
//!
//! ## Types
//!
//! - [`Quality`]: Lossy encoding quality (1–100). Clamped on construction.
//! - [`Color`]: Straight RGBA fill color.
//! - [`ResampleFilter`]: Interpolation used when scaling a source to the target width.
//! - [`DrawParams`]: Destination rectangle + filter for one draw call.

use serde::{Deserialize, Serialize};

/// Quality setting for lossy image encoding (1-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quality(pub u32);

impl Quality {
    /// The only quality the stitch pipeline encodes at.
    pub const MAX: Quality = Quality(100);

    pub fn new(value: u32) -> Self {
        Self(value.clamp(1, 100))
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

/// 8-bit RGBA color, non-premultiplied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const WHITE: Color = Color::opaque(255, 255, 255);

    pub const fn opaque(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub fn to_array(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

/// Resampling filter applied when a source is scaled to the target width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResampleFilter {
    Nearest,
    Triangle,
    CatmullRom,
    Gaussian,
    #[default]
    Lanczos3,
}

/// One scaled draw into the composite surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrawParams {
    pub x: u32,
    pub y: u32,
    /// Destination size; the source is stretched to exactly this.
    pub width: u32,
    pub height: u32,
    pub filter: ResampleFilter,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quality_clamps_to_valid_range() {
        assert_eq!(Quality::new(0).value(), 1);
        assert_eq!(Quality::new(50).value(), 50);
        assert_eq!(Quality::new(150).value(), 100);
    }

    #[test]
    fn quality_max_is_100() {
        assert_eq!(Quality::MAX.value(), 100);
    }

    #[test]
    fn white_is_opaque() {
        assert_eq!(Color::WHITE.to_array(), [255, 255, 255, 255]);
    }

    #[test]
    fn filter_parses_lowercase_names() {
        #[derive(Deserialize)]
        struct Wrapper {
            filter: ResampleFilter,
        }
        let w: Wrapper = toml::from_str("filter = \"catmullrom\"").unwrap();
        assert_eq!(w.filter, ResampleFilter::CatmullRom);
        assert_eq!(ResampleFilter::default(), ResampleFilter::Lanczos3);
    }
}
