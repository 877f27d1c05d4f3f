//! Build [`StoredImage`] records from filesystem attributes.
//!
//! Only `stat`-level information is used; file content is never read.

use std::fs::Metadata;
use std::path::Path;

use chrono::{DateTime, Utc};
use imgshelf_common::paths::{mime_for_name, UNKNOWN_MIME};
use imgshelf_common::{Error, Result, StoredImage};

/// Describe a file given its name and already-fetched metadata.
///
/// The upload time is the creation time where the platform reports one and
/// the modification time otherwise. A file with neither gets the Unix epoch.
pub fn describe(filename: &str, meta: &Metadata) -> StoredImage {
    let timestamp = meta
        .created()
        .or_else(|_| meta.modified())
        .map(DateTime::<Utc>::from)
        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH);

    StoredImage {
        filename: filename.to_string(),
        size_bytes: meta.len(),
        upload_time: timestamp,
        mime_type: mime_for_name(filename).unwrap_or(UNKNOWN_MIME).to_string(),
    }
}

/// Stat `path` (without following symlinks) and describe it.
///
/// The record's filename is the final component of `path`.
pub async fn describe_path(path: &Path) -> Result<StoredImage> {
    let filename = path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or(Error::InvalidName)?;

    let meta = tokio::fs::symlink_metadata(path).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            Error::not_found(filename)
        } else {
            Error::from(e)
        }
    })?;

    Ok(describe(filename, &meta))
}
