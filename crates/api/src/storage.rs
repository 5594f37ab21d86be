//! Blob Store: where uploaded drawings live.
//!
//! The engine only ever sees the returned reference string; file contents
//! are opaque to it. Reads go through the same store so callers never touch
//! the filesystem directly.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use uuid::Uuid;

/// Longest extension kept from an uploaded file name.
const MAX_EXTENSION_LENGTH: usize = 10;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Storage I/O failed: {0}")]
    Io(#[from] std::io::Error),
}

#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Persist `bytes` under a fresh name and return its reference.
    ///
    /// The extension of `original_name` is kept; the rest is discarded.
    async fn put(&self, original_name: &str, bytes: &[u8]) -> Result<String, StorageError>;

    /// Read back the blob behind `image_ref`. `None` when the reference does
    /// not name a blob held by this store.
    async fn get(&self, image_ref: &str) -> Result<Option<Vec<u8>>, StorageError>;
}

/// Stores blobs as flat files under a root directory.
#[derive(Debug, Clone)]
pub struct LocalBlobStore {
    root: PathBuf,
}

impl LocalBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Map a reference back to a file directly under the root.
    ///
    /// References pointing anywhere else (other directories, `..`, hidden
    /// files) resolve to nothing.
    fn resolve(&self, image_ref: &str) -> Option<PathBuf> {
        let path = Path::new(image_ref);
        let name = path.file_name()?.to_str()?;
        if name.starts_with('.') || path.parent() != Some(self.root.as_path()) {
            return None;
        }
        Some(self.root.join(name))
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn put(&self, original_name: &str, bytes: &[u8]) -> Result<String, StorageError> {
        tokio::fs::create_dir_all(&self.root).await?;

        let name = format!("{}{}", Uuid::new_v4(), extension_of(original_name));
        let path = self.root.join(&name);
        tokio::fs::write(&path, bytes).await?;

        tracing::debug!(path = %path.display(), size = bytes.len(), "Blob stored");
        Ok(path.to_string_lossy().into_owned())
    }

    async fn get(&self, image_ref: &str) -> Result<Option<Vec<u8>>, StorageError> {
        let Some(path) = self.resolve(image_ref) else {
            tracing::debug!(image_ref, "Reference outside the blob root");
            return Ok(None);
        };
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

/// Content type served for a stored drawing, from its extension.
pub fn content_type_of(image_ref: &str) -> &'static str {
    match extension_of(image_ref).as_str() {
        ".png" => "image/png",
        ".jpg" | ".jpeg" => "image/jpeg",
        ".gif" => "image/gif",
        ".webp" => "image/webp",
        ".bmp" => "image/bmp",
        _ => "application/octet-stream",
    }
}

/// `.png` for `house.PNG`; empty when there is no usable extension.
fn extension_of(original_name: &str) -> String {
    Path::new(original_name)
        .extension()
        .and_then(|e| e.to_str())
        .filter(|e| {
            !e.is_empty()
                && e.len() <= MAX_EXTENSION_LENGTH
                && e.chars().all(|c| c.is_ascii_alphanumeric())
        })
        .map(|e| format!(".{}", e.to_ascii_lowercase()))
        .unwrap_or_default()
}
