//! Raster backend traits and shared types.
//!
//! The pipeline never touches pixels directly. It talks to two traits:
//!
//! - [`ImageBackend`] decodes source bytes into rasters and allocates the
//!   composite surface.
//! - [`RasterSurface`] is that surface: fill it, draw scaled rasters into it,
//!   encode it.
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend), built on the `image`
//! crate. Tests swap in the recording [`tests::MockBackend`].

use super::params::{Color, DrawParams, Quality};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("Decode failed: {0}")]
    Decode(String),
    #[error("Surface allocation failed: {0}")]
    Surface(String),
    #[error("Draw failed: {0}")]
    Draw(String),
    #[error("Encode failed: {0}")]
    Encode(String),
}

/// Natural size of a raster in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

/// A decoded source together with its natural size.
#[derive(Debug)]
pub struct Decoded<R> {
    pub raster: R,
    pub dimensions: Dimensions,
}

/// A drawable, encodable 2D surface owned by a single stitch run.
pub trait RasterSurface {
    type Raster;

    fn dimensions(&self) -> Dimensions;

    /// Paint every pixel with `color`, replacing whatever was there.
    fn fill(&mut self, color: Color);

    /// Stretch `source` to the destination rectangle and blend it over the
    /// current contents.
    fn draw_scaled(
        &mut self,
        source: &Self::Raster,
        params: &DrawParams,
    ) -> Result<(), BackendError>;

    /// Serialize the surface as baseline JPEG.
    fn encode(&self, quality: Quality) -> Result<Vec<u8>, BackendError>;
}

/// Trait for raster backends.
///
/// `Sync` because decoding fans out across rayon workers; `Raster: Send`
/// for the same reason.
pub trait ImageBackend: Sync {
    type Raster: Send;
    type Surface: RasterSurface<Raster = Self::Raster>;

    /// Decode an encoded image. Must reject empty (zero-sized) rasters.
    fn decode(&self, bytes: &[u8]) -> Result<Decoded<Self::Raster>, BackendError>;

    /// Allocate a surface of exactly `width × height` pixels.
    fn allocate(&self, width: u32, height: u32) -> Result<Self::Surface, BackendError>;
}
