//! Pure layout math for vertical stitching.
//!
//! All functions here are pure and testable without any I/O or images.
//!
//! The first image fixes the target width. Every other image is scaled by
//! `target_width / natural_width`, keeping its aspect ratio, and stacked
//! below the previous one. Heights stay fractional through the whole plan;
//! only the canvas height and the per-entry pixel bands are rounded.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LayoutError {
    #[error("nothing to lay out")]
    Empty,
    #[error("image {index} has zero width")]
    ZeroWidth { index: usize },
}

/// Placement of one source image on the canvas.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawPlanEntry {
    /// Position of the source in the input sequence.
    pub index: usize,
    pub natural_width: u32,
    pub natural_height: u32,
    pub scale_factor: f64,
    pub scaled_height: f64,
    /// Sum of the scaled heights of every earlier entry.
    pub y_offset: f64,
}

impl DrawPlanEntry {
    /// Integer pixel band `(y, height)` this entry covers on a canvas of
    /// `canvas_height` rows.
    ///
    /// Both edges are rounded independently, so the bands of consecutive
    /// entries meet exactly and together cover the whole canvas.
    pub fn pixel_band(&self, canvas_height: u32) -> (u32, u32) {
        let top = (self.y_offset.round() as u32).min(canvas_height);
        let bottom = ((self.y_offset + self.scaled_height).round() as u32).min(canvas_height);
        (top, bottom.saturating_sub(top))
    }
}

/// Full layout of a stitch: canvas width plus one entry per source.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutPlan {
    pub target_width: u32,
    pub entries: Vec<DrawPlanEntry>,
    /// Unrounded sum of all scaled heights.
    pub total_height: f64,
}

impl LayoutPlan {
    pub fn canvas_height(&self) -> u32 {
        self.total_height.round() as u32
    }

    /// Canvas size as `(width, height)`.
    pub fn canvas_size(&self) -> (u32, u32) {
        (self.target_width, self.canvas_height())
    }
}

/// Plan a vertical stack from natural `(width, height)` pairs in input order.
///
/// # Examples
/// ```
/// # use longstitch::imaging::plan_layout;
/// let plan = plan_layout(&[(100, 50), (200, 50)]).unwrap();
/// assert_eq!(plan.target_width, 100);
/// assert_eq!(plan.entries[1].scale_factor, 0.5);
/// assert_eq!(plan.canvas_size(), (100, 75));
/// ```
pub fn plan_layout(dimensions: &[(u32, u32)]) -> Result<LayoutPlan, LayoutError> {
    let &(target_width, _) = dimensions.first().ok_or(LayoutError::Empty)?;

    let mut entries = Vec::with_capacity(dimensions.len());
    let mut y_offset = 0.0_f64;

    for (index, &(natural_width, natural_height)) in dimensions.iter().enumerate() {
        if natural_width == 0 {
            return Err(LayoutError::ZeroWidth { index });
        }
        let scale_factor = f64::from(target_width) / f64::from(natural_width);
        let scaled_height = f64::from(natural_height) * scale_factor;

        entries.push(DrawPlanEntry {
            index,
            natural_width,
            natural_height,
            scale_factor,
            scaled_height,
            y_offset,
        });
        y_offset += scaled_height;
    }

    Ok(LayoutPlan {
        target_width,
        entries,
        total_height: y_offset,
    })
}
