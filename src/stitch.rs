//! The stitch pipeline.
//!
//! One call to [`stitch`] (or [`stitch_with`]) is one independent run:
//!
//! ```text
//! Idle → Loading → Planning → Compositing → Encoding → MetadataTransplant → Exporting → Done
//!           └──────────┴───────────┴────────────┴─────────────────────────────┴──→ Failed
//! ```
//!
//! - **Loading** decodes every input on the rayon pool and publishes a
//!   scratch resource per image. The first failure aborts the run.
//! - **Planning** fixes the target width to the first image's width and
//!   stacks scaled heights.
//! - **Compositing** draws every image in input order onto a white surface.
//! - **Encoding** produces a JPEG at maximum quality.
//! - **MetadataTransplant** copies the first image's EXIF into the output.
//!   It degrades instead of failing, so `Failed` is never entered from here.
//! - **Exporting** publishes the bytes and releases the scratch resources.
//!
//! Resources (scratch handles, the surface) are owned values, so every exit
//! path releases them on drop.

use crate::config::StitchConfig;
use crate::exif::{ExifCodec, MetadataCodec, MetadataOutcome, transplant};
use crate::export::{ExportError, ResourceHandle, ResourceStore, export};
use crate::imaging::{
    BackendError, ImageBackend, LayoutError, LoadError, Quality, RasterSurface, ResampleFilter,
    RustBackend, SourceImage, compose, load_sources, plan_sources,
};
use crate::types::SourceFile;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Stage {
    Idle,
    Loading,
    Planning,
    Compositing,
    Encoding,
    MetadataTransplant,
    Exporting,
    Done,
    Failed,
}

impl Stage {
    /// Whether `self → next` is a legal transition.
    pub fn can_advance_to(self, next: Stage) -> bool {
        use Stage::*;
        matches!(
            (self, next),
            (Idle, Loading)
                | (Loading, Planning)
                | (Planning, Compositing)
                | (Compositing, Encoding)
                | (Encoding, MetadataTransplant)
                | (MetadataTransplant, Exporting)
                | (Exporting, Done)
                | (Loading | Planning | Compositing | Encoding | Exporting, Failed)
        )
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Idle => "idle",
            Stage::Loading => "loading",
            Stage::Planning => "planning",
            Stage::Compositing => "compositing",
            Stage::Encoding => "encoding",
            Stage::MetadataTransplant => "metadata transplant",
            Stage::Exporting => "exporting",
            Stage::Done => "done",
            Stage::Failed => "failed",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug)]
pub enum StitchError {
    #[error("no images to stitch")]
    EmptyInput,
    #[error("cannot decode image {index} ({name}): {reason}")]
    Decode {
        index: usize,
        name: String,
        reason: String,
    },
    #[error("cannot hold source image: {0}")]
    Resource(ExportError),
    #[error("invalid layout: {0}")]
    Layout(LayoutError),
    #[error("composite surface: {0}")]
    Surface(BackendError),
    #[error("encoding: {0}")]
    Encode(BackendError),
    #[error("export: {0}")]
    Export(ExportError),
}

impl StitchError {
    /// The stage the run was in when it failed.
    pub fn failed_stage(&self) -> Stage {
        match self {
            StitchError::Decode { .. } | StitchError::Resource(_) => Stage::Loading,
            StitchError::EmptyInput | StitchError::Layout(_) => Stage::Planning,
            StitchError::Surface(_) => Stage::Compositing,
            StitchError::Encode(_) => Stage::Encoding,
            StitchError::Export(_) => Stage::Exporting,
        }
    }
}

impl From<LoadError> for StitchError {
    fn from(err: LoadError) -> Self {
        match err {
            LoadError::Decode {
                index,
                name,
                source,
            } => StitchError::Decode {
                index,
                name,
                reason: source.to_string(),
            },
            LoadError::Resource { source, .. } => StitchError::Resource(source),
        }
    }
}

impl From<LayoutError> for StitchError {
    fn from(err: LayoutError) -> Self {
        match err {
            LayoutError::Empty => StitchError::EmptyInput,
            other => StitchError::Layout(other),
        }
    }
}

/// Knobs that do not change what a stitch means.
///
/// Target width, output format and quality are fixed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StitchOptions {
    pub filter: ResampleFilter,
    /// Carry the source's embedded EXIF thumbnail when it fits.
    pub keep_thumbnail: bool,
}

impl StitchOptions {
    pub fn from_config(config: &StitchConfig) -> Self {
        Self {
            filter: config.scaling.filter,
            keep_thumbnail: config.metadata.keep_thumbnail,
        }
    }
}

impl Default for StitchOptions {
    fn default() -> Self {
        Self::from_config(&StitchConfig::default())
    }
}

/// A finished stitch. The caller owns `handle` and releases it when done.
#[derive(Debug, Clone)]
pub struct StitchResult {
    pub bytes: Arc<[u8]>,
    pub handle: ResourceHandle,
    pub width: u32,
    pub height: u32,
    pub metadata: MetadataOutcome,
}

/// Stage tracker for one run.
struct Run {
    stage: Stage,
}

impl Run {
    fn new() -> Self {
        Self { stage: Stage::Idle }
    }

    fn advance(&mut self, next: Stage) {
        debug_assert!(
            self.stage.can_advance_to(next),
            "illegal transition {} -> {next}",
            self.stage
        );
        log::debug!("stitch: {} -> {next}", self.stage);
        self.stage = next;
    }
}

/// Stitch with the `image` backend and EXIF codec.
pub fn stitch<S: ResourceStore + ?Sized>(
    files: &[SourceFile],
    store: &S,
    options: &StitchOptions,
) -> Result<StitchResult, StitchError> {
    stitch_with(&RustBackend::new(), &ExifCodec, store, files, options)
}

/// Stitch with explicit collaborators.
pub fn stitch_with<B, C, S>(
    backend: &B,
    codec: &C,
    store: &S,
    files: &[SourceFile],
    options: &StitchOptions,
) -> Result<StitchResult, StitchError>
where
    B: ImageBackend,
    C: MetadataCodec + ?Sized,
    S: ResourceStore + ?Sized,
{
    let mut run = Run::new();
    let result = run_pipeline(&mut run, backend, codec, store, files, options);
    match &result {
        Ok(_) => run.advance(Stage::Done),
        Err(e) => {
            log::debug!("stitch failed in {}: {e}", run.stage);
            run.advance(Stage::Failed);
        }
    }
    result
}

fn run_pipeline<B, C, S>(
    run: &mut Run,
    backend: &B,
    codec: &C,
    store: &S,
    files: &[SourceFile],
    options: &StitchOptions,
) -> Result<StitchResult, StitchError>
where
    B: ImageBackend,
    C: MetadataCodec + ?Sized,
    S: ResourceStore + ?Sized,
{
    run.advance(Stage::Loading);
    let sources = load_sources(backend, store, files)?;

    run.advance(Stage::Planning);
    let plan = plan_sources(&sources)?;
    let (width, height) = plan.canvas_size();

    run.advance(Stage::Compositing);
    let surface =
        compose(backend, &plan, &sources, options.filter).map_err(StitchError::Surface)?;
    // Rasters are done; the scratch handles live on until export
    let scratch: Vec<_> = sources.into_iter().map(SourceImage::into_scratch).collect();

    run.advance(Stage::Encoding);
    let encoded = surface
        .encode(Quality::MAX)
        .map_err(StitchError::Encode)?;
    drop(surface);

    run.advance(Stage::MetadataTransplant);
    let first = files.first().map(|f| &f.bytes[..]).unwrap_or(&[]);
    let (bytes, metadata) = transplant(codec, encoded, first, options.keep_thumbnail);
    if let Some(notice) = metadata.notice() {
        log::debug!("{notice}");
    }

    run.advance(Stage::Exporting);
    let bytes: Arc<[u8]> = bytes.into();
    let exported =
        export(store, Arc::clone(&bytes), width, height, scratch).map_err(StitchError::Export)?;

    log::info!(
        "stitched {} images into {width}x{height} ({} bytes) at {}",
        files.len(),
        bytes.len(),
        exported.handle
    );
    Ok(StitchResult {
        bytes,
        handle: exported.handle,
        width: exported.width,
        height: exported.height,
        metadata,
    })
}
