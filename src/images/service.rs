//! Image service used by the HTTP handlers and the CLI.
//!
//! Thin layer over [`ImageStore`] that owns it behind an `Arc` so it can be
//! shared across request handlers, and applies the gallery ordering.

use std::sync::Arc;

use imgshelf_common::{Result, StoredImage};
use tokio::fs::File;
use tokio::io::AsyncRead;

use super::gallery;
use super::storage::ImageStore;

/// Shared handle to the image store.
#[derive(Clone)]
pub struct ImageService {
    store: Arc<ImageStore>,
}

impl ImageService {
    /// Create a new `ImageService`.
    ///
    /// # Arguments
    ///
    /// * `store` - The filesystem image store backend
    pub fn new(store: ImageStore) -> Self {
        Self {
            store: Arc::new(store),
        }
    }

    /// The underlying store.
    pub fn store(&self) -> &ImageStore {
        &self.store
    }

    /// Save an upload. See [`ImageStore::save`].
    pub async fn upload<R>(
        &self,
        raw_name: &str,
        reader: R,
        declared_size: Option<u64>,
    ) -> Result<StoredImage>
    where
        R: AsyncRead + Unpin,
    {
        self.store.save(raw_name, reader, declared_size).await
    }

    /// All images in gallery order (newest first).
    pub async fn gallery(&self) -> Result<Vec<StoredImage>> {
        gallery::listing(&self.store).await
    }

    /// Open an image for streaming.
    pub async fn open(&self, filename: &str) -> Result<(File, StoredImage)> {
        self.store.fetch(filename).await
    }

    /// Delete an image.
    pub async fn remove(&self, filename: &str) -> Result<()> {
        self.store.delete(filename).await
    }
}
