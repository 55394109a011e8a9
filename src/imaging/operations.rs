//! High-level image operations.
//!
//! These functions combine the layout math with backend execution: load
//! every source (in parallel), then compose the planned bands onto one
//! white surface.

use super::backend::{BackendError, Dimensions, ImageBackend, RasterSurface};
use super::calculations::{LayoutError, LayoutPlan, plan_layout};
use super::params::{Color, DrawParams, ResampleFilter};
use crate::export::{ExportError, ResourceHandle, ResourceKind, ResourceStore, ScopedResource};
use crate::types::SourceFile;
use rayon::prelude::*;
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("no scratch handle for image {index} ({name}): {source}")]
    Resource {
        index: usize,
        name: String,
        source: ExportError,
    },
    #[error("image {index} ({name}): {source}")]
    Decode {
        index: usize,
        name: String,
        source: BackendError,
    },
}

/// A decoded input image.
///
/// Holds its scratch resource for as long as it lives; the handle is
/// released when the image (or the guard taken from
/// [`into_scratch`](Self::into_scratch)) is dropped.
pub struct SourceImage<'s, R, S: ResourceStore + ?Sized> {
    pub index: usize,
    pub name: String,
    pub raster: R,
    pub dimensions: Dimensions,
    scratch: ScopedResource<'s, S>,
}

impl<'s, R, S: ResourceStore + ?Sized> SourceImage<'s, R, S> {
    pub fn scratch_handle(&self) -> &ResourceHandle {
        self.scratch.handle()
    }

    /// Drop the raster, keeping only the scratch guard.
    pub fn into_scratch(self) -> ScopedResource<'s, S> {
        self.scratch
    }
}

/// Media type sniffed from the leading bytes, for the scratch resource.
fn media_type_of(bytes: &[u8]) -> &'static str {
    image::guess_format(bytes)
        .map(|format| format.to_mime_type())
        .unwrap_or("application/octet-stream")
}

/// Decode every file concurrently, in input order.
///
/// Fails fast: the first error is returned and every image decoded so far
/// is dropped, releasing its scratch handle.
pub fn load_sources<'s, B, S>(
    backend: &B,
    store: &'s S,
    files: &[SourceFile],
) -> Result<Vec<SourceImage<'s, B::Raster, S>>, LoadError>
where
    B: ImageBackend,
    S: ResourceStore + ?Sized,
{
    files
        .par_iter()
        .enumerate()
        .map(|(index, file)| load_one(backend, store, index, file))
        .collect()
}

fn load_one<'s, B, S>(
    backend: &B,
    store: &'s S,
    index: usize,
    file: &SourceFile,
) -> Result<SourceImage<'s, B::Raster, S>, LoadError>
where
    B: ImageBackend,
    S: ResourceStore + ?Sized,
{
    let scratch = ScopedResource::acquire(
        store,
        Arc::clone(&file.bytes),
        ResourceKind::Scratch,
        media_type_of(&file.bytes),
    )
    .map_err(|source| LoadError::Resource {
        index,
        name: file.name.clone(),
        source,
    })?;

    let decoded = backend
        .decode(&file.bytes)
        .map_err(|source| LoadError::Decode {
            index,
            name: file.name.clone(),
            source,
        })?;

    let source = SourceImage {
        index,
        name: file.name.clone(),
        raster: decoded.raster,
        dimensions: decoded.dimensions,
        scratch,
    };
    log::debug!(
        "decoded [{index}] {} ({}x{}) as {}",
        source.name,
        source.dimensions.width,
        source.dimensions.height,
        source.scratch_handle()
    );
    Ok(source)
}

/// Plan the stack for loaded images, in their order.
pub fn plan_sources<R, S: ResourceStore + ?Sized>(
    sources: &[SourceImage<'_, R, S>],
) -> Result<LayoutPlan, LayoutError> {
    let dimensions: Vec<(u32, u32)> = sources
        .iter()
        .map(|s| (s.dimensions.width, s.dimensions.height))
        .collect();
    plan_layout(&dimensions)
}

/// Allocate the canvas, fill it white, and draw every entry at `x = 0`
/// in plan order (so the first image ends up on top).
///
/// Entries whose pixel band rounds to zero rows are skipped.
pub fn compose<B, S>(
    backend: &B,
    plan: &LayoutPlan,
    sources: &[SourceImage<'_, B::Raster, S>],
    filter: ResampleFilter,
) -> Result<B::Surface, BackendError>
where
    B: ImageBackend,
    S: ResourceStore + ?Sized,
{
    let (width, height) = plan.canvas_size();
    let mut surface = backend.allocate(width, height)?;
    surface.fill(Color::WHITE);

    for entry in &plan.entries {
        let source = sources.get(entry.index).ok_or_else(|| {
            BackendError::Draw(format!("plan refers to missing image {}", entry.index))
        })?;
        let (y, band_height) = entry.pixel_band(height);
        if band_height == 0 {
            log::debug!("image {} scales to zero rows, skipped", entry.index);
            continue;
        }
        surface.draw_scaled(
            &source.raster,
            &DrawParams {
                x: 0,
                y,
                width,
                height: band_height,
                filter,
            },
        )?;
    }

    Ok(surface)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::MemoryStore;
    use crate::imaging::backend::tests::{MockBackend, RecordedOp, mock_source};

    fn files(specs: &[(&str, u32, u32)]) -> Vec<SourceFile> {
        specs
            .iter()
            .map(|&(tag, w, h)| SourceFile::new(format!("{tag}.jpg"), mock_source(tag, w, h)))
            .collect()
    }

    #[test]
    fn load_keeps_input_order_and_holds_scratch() {
        let backend = MockBackend::new();
        let store = MemoryStore::new();
        let inputs = files(&[("c", 10, 10), ("a", 20, 5), ("b", 5, 5)]);

        let sources = load_sources(&backend, &store, &inputs).unwrap();
        let names: Vec<&str> = sources.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["c.jpg", "a.jpg", "b.jpg"]);
        assert_eq!(sources[1].dimensions, Dimensions { width: 20, height: 5 });
        assert_eq!(store.live(ResourceKind::Scratch), 3);
        assert_ne!(sources[0].scratch_handle(), sources[1].scratch_handle());

        drop(sources);
        assert_eq!(store.live(ResourceKind::Scratch), 0);
    }

    #[test]
    fn load_fails_fast_and_releases_everything() {
        let backend = MockBackend::new();
        let store = MemoryStore::new();
        let mut inputs = files(&[("a", 10, 10), ("b", 10, 10)]);
        inputs.insert(1, SourceFile::new("broken.jpg", b"garbage".to_vec()));

        let err = load_sources(&backend, &store, &inputs).err().unwrap();
        assert!(matches!(err, LoadError::Decode { index: 1, ref name, .. } if name == "broken.jpg"));
        assert_eq!(store.live(ResourceKind::Scratch), 0);
    }

    #[test]
    fn compose_fills_white_then_draws_bands_in_order() {
        let backend = MockBackend::new();
        let store = MemoryStore::new();
        let sources =
            load_sources(&backend, &store, &files(&[("top", 100, 50), ("bottom", 200, 50)]))
                .unwrap();
        let plan = plan_sources(&sources).unwrap();

        compose(&backend, &plan, &sources, ResampleFilter::Lanczos3).unwrap();

        let ops: Vec<RecordedOp> = backend
            .get_operations()
            .into_iter()
            .filter(|op| !matches!(op, RecordedOp::Decode(_)))
            .collect();
        assert_eq!(ops[0], RecordedOp::Allocate { width: 100, height: 75 });
        assert_eq!(ops[1], RecordedOp::Fill(Color::WHITE));
        assert!(matches!(
            &ops[2],
            RecordedOp::Draw { tag, params } if tag == "top" && params.y == 0 && params.height == 50
        ));
        assert!(matches!(
            &ops[3],
            RecordedOp::Draw { tag, params } if tag == "bottom" && params.y == 50 && params.height == 25 && params.width == 100
        ));
    }

    #[test]
    fn compose_skips_zero_row_bands() {
        let backend = MockBackend::new();
        let store = MemoryStore::new();
        // 1000 wide then 1 px tall at 4000 wide: 0.25 rows
        let sources =
            load_sources(&backend, &store, &files(&[("wide", 1000, 10), ("sliver", 4000, 1)]))
                .unwrap();
        let plan = plan_sources(&sources).unwrap();

        compose(&backend, &plan, &sources, ResampleFilter::Nearest).unwrap();
        assert_eq!(backend.draw_order(), vec!["wide"]);
    }

    #[test]
    fn compose_propagates_allocation_failure() {
        let backend = MockBackend {
            fail_allocate: true,
            ..MockBackend::new()
        };
        let store = MemoryStore::new();
        let sources = load_sources(&backend, &store, &files(&[("a", 10, 10)])).unwrap();
        let plan = plan_sources(&sources).unwrap();
        assert!(matches!(
            compose(&backend, &plan, &sources, ResampleFilter::Nearest),
            Err(BackendError::Surface(_))
        ));
    }
}
