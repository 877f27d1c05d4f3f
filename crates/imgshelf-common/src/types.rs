//! The record describing a stored image.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Metadata for one file in the store.
///
/// Computed from filesystem attributes on every request and never persisted.
/// `filename` is the only identifier an image has.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredImage {
    /// Sanitized base name, unique within the store.
    pub filename: String,
    /// Size of the file on disk.
    pub size_bytes: u64,
    /// Creation time, or modification time where creation time is unavailable.
    pub upload_time: DateTime<Utc>,
    /// MIME type inferred from the extension.
    pub mime_type: String,
}
