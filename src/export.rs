//! Resource handles and the exporter.
//!
//! Loading publishes every source into a [`ResourceStore`] as a `Scratch`
//! resource (the analogue of a per-image object URL) and holds it through a
//! [`ScopedResource`] guard. The exporter publishes the final JPEG as an
//! `Output` resource, then drops the scratch guards as its last step. Guards
//! release on drop, so an aborted run leaks nothing either.
//!
//! ## Stores
//!
//! | Store | Output handle | Scratch handles |
//! |---|---|---|
//! | [`MemoryStore`] | `blob:longstitch/<n>` | same store |
//! | [`DirectoryStore`] | `<dir>/stitch-<sha256 prefix>[-<n>].jpg` | in-memory |
//!
//! Output files are never overwritten. Every publish claims a fresh file, so
//! each handle owns its file and releasing one never touches another. A
//! second publish of identical bytes gets a `-1`, `-2`, ... suffix.

use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use thiserror::Error;

/// Media type of everything the pipeline exports.
pub const JPEG_MEDIA_TYPE: &str = "image/jpeg";

const BLOB_PREFIX: &str = "blob:longstitch/";

/// Length of the hex digest prefix used in output file names.
const NAME_HASH_LEN: usize = 16;

/// Numbered suffixes tried before a publish gives up.
const MAX_NAME_ATTEMPTS: u32 = 1000;

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("store rejected {kind} resource: {reason}")]
    Rejected { kind: ResourceKind, reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    /// Per-image handle held while a source is loaded.
    Scratch,
    /// The stitched result, owned by the caller.
    Output,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceKind::Scratch => f.write_str("scratch"),
            ResourceKind::Output => f.write_str("output"),
        }
    }
}

/// Locator of a published resource: a blob URL or a file path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct ResourceHandle(String);

impl ResourceHandle {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResourceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Somewhere bytes can be published and later released.
///
/// `Sync` because scratch resources are acquired from rayon workers.
pub trait ResourceStore: Sync {
    fn publish(
        &self,
        bytes: Arc<[u8]>,
        kind: ResourceKind,
        media_type: &str,
    ) -> Result<ResourceHandle, ExportError>;

    /// Release a handle. Unknown or already released handles are ignored.
    fn release(&self, handle: &ResourceHandle);
}

/// A published resource that is released when the guard drops.
pub struct ScopedResource<'s, S: ResourceStore + ?Sized> {
    store: &'s S,
    handle: ResourceHandle,
}

impl<'s, S: ResourceStore + ?Sized> ScopedResource<'s, S> {
    pub fn acquire(
        store: &'s S,
        bytes: Arc<[u8]>,
        kind: ResourceKind,
        media_type: &str,
    ) -> Result<Self, ExportError> {
        let handle = store.publish(bytes, kind, media_type)?;
        Ok(Self { store, handle })
    }

    pub fn handle(&self) -> &ResourceHandle {
        &self.handle
    }
}

impl<S: ResourceStore + ?Sized> Drop for ScopedResource<'_, S> {
    fn drop(&mut self) {
        self.store.release(&self.handle);
    }
}

impl<S: ResourceStore + ?Sized> fmt::Debug for ScopedResource<'_, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ScopedResource").field(&self.handle).finish()
    }
}

// ============================================================================
// MemoryStore
// ============================================================================

#[derive(Debug, Clone)]
struct StoredResource {
    bytes: Arc<[u8]>,
    kind: ResourceKind,
}

/// Keeps published bytes in memory behind `blob:` handles.
#[derive(Debug, Default)]
pub struct MemoryStore {
    next_id: AtomicU64,
    resources: Mutex<HashMap<ResourceHandle, StoredResource>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bytes behind a live handle.
    pub fn get(&self, handle: &ResourceHandle) -> Option<Arc<[u8]>> {
        self.lock().get(handle).map(|r| Arc::clone(&r.bytes))
    }

    /// Number of unreleased handles of `kind`.
    pub fn live(&self, kind: ResourceKind) -> usize {
        self.lock().values().filter(|r| r.kind == kind).count()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<ResourceHandle, StoredResource>> {
        self.resources.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl ResourceStore for MemoryStore {
    fn publish(
        &self,
        bytes: Arc<[u8]>,
        kind: ResourceKind,
        _media_type: &str,
    ) -> Result<ResourceHandle, ExportError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let handle = ResourceHandle(format!("{BLOB_PREFIX}{id}"));
        self.lock()
            .insert(handle.clone(), StoredResource { bytes, kind });
        Ok(handle)
    }

    fn release(&self, handle: &ResourceHandle) {
        self.lock().remove(handle);
    }
}

// ============================================================================
// DirectoryStore
// ============================================================================

/// Writes output resources as files in a directory.
#[derive(Debug)]
pub struct DirectoryStore {
    dir: PathBuf,
    scratch: MemoryStore,
}

impl DirectoryStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            scratch: MemoryStore::new(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Scratch handles still held.
    pub fn live_scratch(&self) -> usize {
        self.scratch.live(ResourceKind::Scratch)
    }
}

/// `stitch-<first 16 hex digits of SHA-256>.<ext>` for attempt 0,
/// `stitch-<digest>-<attempt>.<ext>` after that.
pub fn output_file_name(bytes: &[u8], media_type: &str, attempt: u32) -> String {
    let digest = format!("{:x}", Sha256::digest(bytes));
    numbered_name(&digest[..NAME_HASH_LEN], extension_for(media_type), attempt)
}

fn extension_for(media_type: &str) -> &'static str {
    match media_type {
        JPEG_MEDIA_TYPE => "jpg",
        "image/png" => "png",
        _ => "bin",
    }
}

fn numbered_name(stem: &str, extension: &str, attempt: u32) -> String {
    if attempt == 0 {
        format!("stitch-{stem}.{extension}")
    } else {
        format!("stitch-{stem}-{attempt}.{extension}")
    }
}

impl ResourceStore for DirectoryStore {
    fn publish(
        &self,
        bytes: Arc<[u8]>,
        kind: ResourceKind,
        media_type: &str,
    ) -> Result<ResourceHandle, ExportError> {
        if kind == ResourceKind::Scratch {
            return self.scratch.publish(bytes, kind, media_type);
        }
        fs::create_dir_all(&self.dir)?;
        let digest = format!("{:x}", Sha256::digest(&bytes));
        let stem = &digest[..NAME_HASH_LEN];
        let extension = extension_for(media_type);

        for attempt in 0..MAX_NAME_ATTEMPTS {
            let path = self.dir.join(numbered_name(stem, extension, attempt));
            // create_new makes claiming the name atomic across concurrent runs
            let mut file = match fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
            {
                Ok(file) => file,
                Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(e.into()),
            };
            if let Err(e) = file.write_all(&bytes) {
                drop(file);
                let _ = fs::remove_file(&path);
                return Err(e.into());
            }
            return Ok(ResourceHandle(path.display().to_string()));
        }
        Err(ExportError::Rejected {
            kind,
            reason: format!(
                "no free file name for stitch-{stem} in {} after {MAX_NAME_ATTEMPTS} attempts",
                self.dir.display()
            ),
        })
    }

    /// Scratch handles are dropped from memory; output handles delete
    /// their file.
    fn release(&self, handle: &ResourceHandle) {
        if handle.as_str().starts_with(BLOB_PREFIX) {
            self.scratch.release(handle);
        } else if let Err(e) = fs::remove_file(handle.as_str()) {
            log::debug!("release of {handle} failed: {e}");
        }
    }
}

// ============================================================================
// Exporter
// ============================================================================

/// The published result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exported {
    pub handle: ResourceHandle,
    pub width: u32,
    pub height: u32,
}

/// Publish the final bytes, then release the per-image scratch handles.
///
/// Scratch handles are released whether or not the publish succeeded.
pub fn export<S: ResourceStore + ?Sized>(
    store: &S,
    bytes: Arc<[u8]>,
    width: u32,
    height: u32,
    scratch: Vec<ScopedResource<'_, S>>,
) -> Result<Exported, ExportError> {
    let published = store.publish(bytes, ResourceKind::Output, JPEG_MEDIA_TYPE);

    let released = scratch.len();
    drop(scratch);
    log::debug!("released {released} scratch handles");

    Ok(Exported {
        handle: published?,
        width,
        height,
    })
}
