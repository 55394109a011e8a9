//! Pure Rust raster backend on top of the `image` crate.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Decode (JPEG, PNG, TIFF, WebP, GIF, BMP) | `image::load_from_memory` |
//! | Surface | `image::RgbaImage`, filled opaque |
//! | Scale | `image::imageops::resize` with the configured filter |
//! | Draw | `image::imageops::overlay` (alpha blend over the fill) |
//! | Encode → JPEG | `image::codecs::jpeg::JpegEncoder` |

use super::backend::{BackendError, Decoded, Dimensions, ImageBackend, RasterSurface};
use super::params::{Color, DrawParams, Quality, ResampleFilter};
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{
    DynamicImage, ExtendedColorType, GenericImageView, ImageEncoder, ImageFormat, Rgba, RgbaImage,
};
use std::sync::LazyLock;

/// Largest edge a baseline JPEG can describe.
pub const MAX_JPEG_DIMENSION: u32 = u16::MAX as u32;

/// Ceiling on the RGBA surface size (1 GiB).
pub const MAX_SURFACE_BYTES: u64 = 1 << 30;

const INPUT_CANDIDATES: &[(&str, ImageFormat)] = &[
    ("jpg", ImageFormat::Jpeg),
    ("jpeg", ImageFormat::Jpeg),
    ("png", ImageFormat::Png),
    ("tif", ImageFormat::Tiff),
    ("tiff", ImageFormat::Tiff),
    ("webp", ImageFormat::WebP),
    ("gif", ImageFormat::Gif),
    ("bmp", ImageFormat::Bmp),
];

static SUPPORTED_EXTENSIONS: LazyLock<Vec<&'static str>> = LazyLock::new(|| {
    INPUT_CANDIDATES
        .iter()
        .filter(|(_, fmt)| fmt.reading_enabled())
        .map(|(ext, _)| *ext)
        .collect()
});

/// Returns the set of image file extensions that have working decoders compiled in.
pub fn supported_input_extensions() -> &'static [&'static str] {
    &SUPPORTED_EXTENSIONS
}

impl From<ResampleFilter> for FilterType {
    fn from(filter: ResampleFilter) -> Self {
        match filter {
            ResampleFilter::Nearest => FilterType::Nearest,
            ResampleFilter::Triangle => FilterType::Triangle,
            ResampleFilter::CatmullRom => FilterType::CatmullRom,
            ResampleFilter::Gaussian => FilterType::Gaussian,
            ResampleFilter::Lanczos3 => FilterType::Lanczos3,
        }
    }
}

/// Backend built on the `image` crate.
///
/// See the [module docs](self) for the crate-to-operation mapping.
pub struct RustBackend;

impl RustBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new()
    }
}

/// In-memory RGBA composite.
pub struct RustSurface {
    canvas: RgbaImage,
}

impl RustSurface {
    /// Read-only access to the composed pixels.
    pub fn canvas(&self) -> &RgbaImage {
        &self.canvas
    }
}

impl ImageBackend for RustBackend {
    type Raster = DynamicImage;
    type Surface = RustSurface;

    fn decode(&self, bytes: &[u8]) -> Result<Decoded<DynamicImage>, BackendError> {
        let image =
            image::load_from_memory(bytes).map_err(|e| BackendError::Decode(e.to_string()))?;
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return Err(BackendError::Decode(format!(
                "image has no pixels ({width}x{height})"
            )));
        }
        Ok(Decoded {
            raster: image,
            dimensions: Dimensions { width, height },
        })
    }

    fn allocate(&self, width: u32, height: u32) -> Result<RustSurface, BackendError> {
        if width == 0 || height == 0 {
            return Err(BackendError::Surface(format!(
                "{width}x{height} surface has no pixels"
            )));
        }
        if width > MAX_JPEG_DIMENSION || height > MAX_JPEG_DIMENSION {
            return Err(BackendError::Surface(format!(
                "{width}x{height} exceeds the {MAX_JPEG_DIMENSION}px JPEG limit"
            )));
        }
        let bytes = u64::from(width) * u64::from(height) * 4;
        if bytes > MAX_SURFACE_BYTES {
            return Err(BackendError::Surface(format!(
                "{width}x{height} needs {bytes} bytes, limit is {MAX_SURFACE_BYTES}"
            )));
        }
        Ok(RustSurface {
            canvas: RgbaImage::new(width, height),
        })
    }
}

impl RasterSurface for RustSurface {
    type Raster = DynamicImage;

    fn dimensions(&self) -> Dimensions {
        let (width, height) = self.canvas.dimensions();
        Dimensions { width, height }
    }

    fn fill(&mut self, color: Color) {
        let pixel = Rgba(color.to_array());
        for p in self.canvas.pixels_mut() {
            *p = pixel;
        }
    }

    fn draw_scaled(
        &mut self,
        source: &DynamicImage,
        params: &DrawParams,
    ) -> Result<(), BackendError> {
        let (canvas_w, canvas_h) = self.canvas.dimensions();
        let fits = u64::from(params.x) + u64::from(params.width) <= u64::from(canvas_w)
            && u64::from(params.y) + u64::from(params.height) <= u64::from(canvas_h);
        if !fits {
            return Err(BackendError::Draw(format!(
                "{}x{} at ({}, {}) falls outside the {canvas_w}x{canvas_h} surface",
                params.width, params.height, params.x, params.y
            )));
        }
        if params.width == 0 || params.height == 0 {
            return Ok(());
        }

        let rgba = source.to_rgba8();
        let scaled = if rgba.dimensions() == (params.width, params.height) {
            rgba
        } else {
            image::imageops::resize(&rgba, params.width, params.height, params.filter.into())
        };
        image::imageops::overlay(
            &mut self.canvas,
            &scaled,
            i64::from(params.x),
            i64::from(params.y),
        );
        Ok(())
    }

    fn encode(&self, quality: Quality) -> Result<Vec<u8>, BackendError> {
        // The fill is opaque, so dropping alpha loses nothing.
        let rgb = DynamicImage::ImageRgba8(self.canvas.clone()).into_rgb8();
        let mut bytes = Vec::new();
        JpegEncoder::new_with_quality(&mut bytes, quality.value() as u8)
            .write_image(
                rgb.as_raw(),
                rgb.width(),
                rgb.height(),
                ExtendedColorType::Rgb8,
            )
            .map_err(|e| BackendError::Encode(e.to_string()))?;
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{solid_jpeg, solid_png_rgba};

    #[test]
    fn supported_extensions_match_decodable_formats() {
        let exts = supported_input_extensions();
        for expected in &["jpg", "jpeg", "png", "tif", "tiff", "webp"] {
            assert!(
                exts.contains(expected),
                "expected {expected} in supported extensions"
            );
        }
    }

    #[test]
    fn decode_synthetic_jpeg() {
        let backend = RustBackend::new();
        let decoded = backend.decode(&solid_jpeg(200, 150, [10, 20, 30])).unwrap();
        assert_eq!(
            decoded.dimensions,
            Dimensions {
                width: 200,
                height: 150
            }
        );
    }

    #[test]
    fn decode_rejects_garbage() {
        let backend = RustBackend::new();
        let err = backend.decode(b"definitely not an image").unwrap_err();
        assert!(matches!(err, BackendError::Decode(_)));
    }

    #[test]
    fn decode_rejects_truncated_jpeg() {
        let backend = RustBackend::new();
        let jpeg = solid_jpeg(64, 64, [200, 0, 0]);
        assert!(backend.decode(&jpeg[..100]).is_err());
    }

    #[test]
    fn allocate_rejects_oversized_surfaces() {
        let backend = RustBackend::new();
        assert!(matches!(
            backend.allocate(100, MAX_JPEG_DIMENSION + 1),
            Err(BackendError::Surface(_))
        ));
        assert!(matches!(
            backend.allocate(0, 10),
            Err(BackendError::Surface(_))
        ));
        assert!(matches!(
            backend.allocate(60_000, 60_000),
            Err(BackendError::Surface(_))
        ));
    }

    #[test]
    fn fill_then_draw_keeps_band_layout() {
        let backend = RustBackend::new();
        let red = backend.decode(&solid_png_rgba(10, 10, [255, 0, 0, 255])).unwrap();
        let mut surface = backend.allocate(10, 30).unwrap();
        surface.fill(Color::WHITE);
        surface
            .draw_scaled(
                &red.raster,
                &DrawParams {
                    x: 0,
                    y: 10,
                    width: 10,
                    height: 10,
                    filter: ResampleFilter::Nearest,
                },
            )
            .unwrap();

        let pixels = surface.canvas();
        assert_eq!(pixels.get_pixel(5, 5).0, [255, 255, 255, 255]);
        assert_eq!(pixels.get_pixel(5, 15).0, [255, 0, 0, 255]);
        assert_eq!(pixels.get_pixel(5, 25).0, [255, 255, 255, 255]);
    }

    #[test]
    fn transparent_pixels_show_white_fill() {
        let backend = RustBackend::new();
        let clear = backend.decode(&solid_png_rgba(4, 4, [0, 0, 0, 0])).unwrap();
        let mut surface = backend.allocate(8, 8).unwrap();
        surface.fill(Color::WHITE);
        surface
            .draw_scaled(
                &clear.raster,
                &DrawParams {
                    x: 0,
                    y: 0,
                    width: 8,
                    height: 8,
                    filter: ResampleFilter::Triangle,
                },
            )
            .unwrap();
        assert!(
            surface
                .canvas()
                .pixels()
                .all(|p| p.0 == [255, 255, 255, 255])
        );
    }

    #[test]
    fn draw_outside_surface_errors() {
        let backend = RustBackend::new();
        let src = backend.decode(&solid_jpeg(4, 4, [0, 0, 0])).unwrap();
        let mut surface = backend.allocate(4, 4).unwrap();
        let result = surface.draw_scaled(
            &src.raster,
            &DrawParams {
                x: 0,
                y: 2,
                width: 4,
                height: 4,
                filter: ResampleFilter::Nearest,
            },
        );
        assert!(matches!(result, Err(BackendError::Draw(_))));
    }

    #[test]
    fn encode_produces_decodable_jpeg() {
        let backend = RustBackend::new();
        let mut surface = backend.allocate(40, 20).unwrap();
        surface.fill(Color::WHITE);
        let bytes = surface.encode(Quality::MAX).unwrap();

        assert_eq!(&bytes[..2], &[0xFF, 0xD8]);
        let decoded = backend.decode(&bytes).unwrap();
        assert_eq!(
            decoded.dimensions,
            Dimensions {
                width: 40,
                height: 20
            }
        );
    }
}
