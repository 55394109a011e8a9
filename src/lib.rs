//! # Longstitch
//!
//! Stitches an ordered list of images into one tall JPEG. The first image
//! sets the output width; every image below it is scaled proportionally to
//! that width and drawn onto a white canvas. The result is encoded at
//! maximum quality and carries the EXIF metadata of the first image.
//!
//! # Architecture: One Pass, Named Stages
//!
//! A stitch request moves through a fixed sequence of stages, each with a
//! single failure mode:
//!
//! ```text
//! Loading → Planning → Compositing → Encoding → MetadataTransplant → Exporting
//!   bytes     layout     canvas        JPEG        EXIF from image 1    handle
//! ```
//!
//! Failures before encoding abort the request. Metadata problems never do:
//! the output is delivered without EXIF and the outcome says why.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`stitch`] | The pipeline: stages, error taxonomy, `stitch` / `stitch_with` entry points |
//! | [`imaging`] | Layout math, pixel backend trait, `image`-crate backend, parallel loading |
//! | [`exif`] | EXIF read/serialize/inject and the metadata transplant |
//! | [`export`] | Resource stores: scoped scratch handles, published output |
//! | [`inputs`] | CLI path expansion with natural filename ordering |
//! | [`live`] | Multipart client for the remote live-capture service |
//! | [`config`] | `longstitch.toml` loading, merging over stock defaults, validation |
//! | [`types`] | Shared input type (`SourceFile`) |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## First Image Sets the Width
//!
//! No image is ever cropped and the first image is never resampled. Later
//! images scale up or down to match it. Heights stay fractional through
//! planning; only the canvas height and each band's edges are rounded, so
//! bands tile exactly with no gaps or overlap.
//!
//! ## Pixel Backend Behind a Trait
//!
//! [`imaging::ImageBackend`] isolates decode, canvas allocation, scaled
//! drawing and encoding. The pipeline is tested against a recording mock;
//! the `image` crate backend is tested on real pixels.
//!
//! ## Metadata as a Value, Not a Side Effect
//!
//! EXIF is parsed into a [`exif::MetadataDictionary`], re-serialized with
//! fresh offsets and injected as a single APP1 segment. Orientation and
//! pixel-dimension tags are copied as they are. A source whose metadata cannot
//! be read, or whose block does not fit in one segment, yields a clean JPEG
//! and a [`exif::MetadataOutcome::Degraded`] note instead of an error.
//!
//! ## Scratch Resources Are Scoped
//!
//! Every loaded input is published to the [`export::ResourceStore`] as
//! scratch and held by a guard that releases it on drop, so early failures
//! leave nothing behind and successful runs release scratch only after the
//! output is published.

pub mod config;
pub mod exif;
pub mod export;
pub mod imaging;
pub mod inputs;
pub mod live;
pub mod output;
pub mod stitch;
pub mod types;

#[cfg(test)]
pub(crate) mod test_helpers;
