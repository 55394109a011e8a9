//! Image processing: pure Rust, no system libraries.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Decode** | `image::load_from_memory` |
//! | **Scale + draw** | `imageops::resize` + `imageops::overlay` |
//! | **Encode → JPEG** | `JpegEncoder` at quality 100 |
//!
//! The module is split into:
//! - **Calculations**: the layout planner, pure dimension math (unit testable)
//! - **Parameters**: data structures describing draw operations
//! - **Backend**: [`ImageBackend`] / [`RasterSurface`] traits + [`RustBackend`]
//! - **Operations**: loading and compositing, combining calculations + backend

pub mod backend;
mod calculations;
pub mod operations;
mod params;
pub mod rust_backend;

pub use backend::{BackendError, Dimensions, ImageBackend, RasterSurface};
pub use calculations::{DrawPlanEntry, LayoutError, LayoutPlan, plan_layout};
pub use operations::{LoadError, SourceImage, compose, load_sources, plan_sources};
pub use params::{Color, DrawParams, Quality, ResampleFilter};
pub use rust_backend::{RustBackend, supported_input_extensions};
