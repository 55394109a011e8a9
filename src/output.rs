//! CLI output formatting.
//!
//! # Output Format
//!
//! ## Stitch
//!
//! ```text
//! Inputs
//! 001 cover.jpg
//! 002 page-2.png
//!
//! Output
//!     stitched/stitch-3f2a9c0d1e4b5a6f.jpg
//!     1080x4620, 1.4 MiB
//!     Metadata: 38 EXIF tags from cover.jpg
//! ```
//!
//! ## Inspect
//!
//! ```text
//! 0th (2 tags)
//!     0x010F Make: "Canon"
//!     0x0112 Orientation: 1
//! Exif (1 tag)
//!     0x8827 ISOSpeedRatings: 400
//! Thumbnail: 5123 bytes
//! ```
//!
//! # Architecture
//!
//! Each command has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure: no I/O, no side effects.

use crate::exif::{Ifd, MetadataDictionary, MetadataOutcome, tags};
use crate::live::LiveCaptureResponse;
use crate::stitch::StitchResult;
use crate::types::SourceFile;

// ============================================================================
// Shared helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// Human-readable byte size (binary units, one decimal).
fn format_size(bytes: usize) -> String {
    const UNITS: [&str; 3] = ["KiB", "MiB", "GiB"];
    if bytes < 1024 {
        return format!("{bytes} B");
    }
    let mut value = bytes as f64 / 1024.0;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{value:.1} {}", UNITS[unit])
}

fn plural(n: usize, word: &str) -> String {
    if n == 1 {
        format!("{n} {word}")
    } else {
        format!("{n} {word}s")
    }
}

// ============================================================================
// Stitch
// ============================================================================

fn metadata_line(outcome: &MetadataOutcome, first: Option<&SourceFile>) -> String {
    let source = first.map(|f| f.name.as_str()).unwrap_or("first image");
    match outcome {
        MetadataOutcome::Transplanted {
            tags,
            thumbnail_dropped,
        } => {
            let mut line = format!("Metadata: {} from {source}", plural(*tags, "EXIF tag"));
            if *thumbnail_dropped {
                line.push_str(" (thumbnail dropped)");
            }
            line
        }
        MetadataOutcome::Absent => format!("Metadata: none in {source}"),
        MetadataOutcome::Degraded { reason } => format!("Metadata: not carried over ({reason})"),
    }
}

/// Format the result of a stitch run.
pub fn format_stitch_summary(inputs: &[SourceFile], result: &StitchResult) -> Vec<String> {
    let mut lines = vec!["Inputs".to_string()];
    for (i, input) in inputs.iter().enumerate() {
        lines.push(format!("{} {}", format_index(i + 1), input.name));
    }
    lines.push(String::new());
    lines.push("Output".to_string());
    lines.push(format!("{}{}", indent(1), result.handle));
    lines.push(format!(
        "{}{}x{}, {}",
        indent(1),
        result.width,
        result.height,
        format_size(result.bytes.len())
    ));
    lines.push(format!(
        "{}{}",
        indent(1),
        metadata_line(&result.metadata, inputs.first())
    ));
    lines
}

pub fn print_stitch_summary(inputs: &[SourceFile], result: &StitchResult) {
    for line in format_stitch_summary(inputs, result) {
        println!("{}", line);
    }
}

// ============================================================================
// Inspect
// ============================================================================

/// Format a metadata dictionary as an IFD → tag tree.
pub fn format_metadata(dict: &MetadataDictionary) -> Vec<String> {
    let mut lines = Vec::new();
    for ifd in Ifd::ALL {
        let entries: Vec<_> = dict.tags(ifd).collect();
        if entries.is_empty() {
            continue;
        }
        lines.push(format!("{ifd} ({})", plural(entries.len(), "tag")));
        for (tag, value) in entries {
            let name = tags::tag_name(ifd, tag).unwrap_or("(unknown)");
            lines.push(format!("{}{tag:#06X} {name}: {value}", indent(1)));
        }
    }
    if let Some(thumb) = dict.thumbnail() {
        lines.push(format!("Thumbnail: {} bytes", thumb.len()));
    }
    if lines.is_empty() {
        lines.push("No EXIF tags".to_string());
    }
    lines
}

pub fn print_metadata(dict: &MetadataDictionary) {
    for line in format_metadata(dict) {
        println!("{}", line);
    }
}

// ============================================================================
// Live capture
// ============================================================================

pub fn format_live_response(response: &LiveCaptureResponse) -> Vec<String> {
    vec![
        format!("Live capture: {}", response.status),
        format!("{}Still: {}", indent(1), response.jpg_url),
        format!("{}Motion: {}", indent(1), response.mov_url),
        format!("{}{}x{}", indent(1), response.width, response.height),
    ]
}

pub fn print_live_response(response: &LiveCaptureResponse) {
    for line in format_live_response(response) {
        println!("{}", line);
    }
}
