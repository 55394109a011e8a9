//! Shared types passed between input collection, the pipeline and the CLI.

use std::sync::Arc;

/// One input image: a display name and its encoded bytes.
///
/// The bytes are shared, not copied, when a scratch resource is published
/// for them.
#[derive(Debug, Clone)]
pub struct SourceFile {
    /// File name (or any label) used in errors and logs.
    pub name: String,
    pub bytes: Arc<[u8]>,
}

impl SourceFile {
    pub fn new(name: impl Into<String>, bytes: impl Into<Arc<[u8]>>) -> Self {
        Self {
            name: name.into(),
            bytes: bytes.into(),
        }
    }
}
