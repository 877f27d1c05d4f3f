//! Filesystem-backed image store.
//!
//! The storage directory is the only index: every listing is a fresh scan and
//! a filename is the only identifier an image has. Uploads are streamed into a
//! hidden temporary file and published under their final name with a
//! no-clobber link, so a partially written file is never visible and two
//! concurrent uploads can never overwrite each other.

use std::collections::HashSet;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant, SystemTime};

use imgshelf_common::paths::{sanitize_filename, AllowList};
use imgshelf_common::{Error, Result, StoredImage};
use tempfile::TempPath;
use tokio::fs::{self, File, OpenOptions};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::metadata::{describe, describe_path};
use super::naming::resolve_conflict;
use crate::config::StorageConfig;

/// How many times a save re-resolves its name after losing a publish race.
pub const MAX_PUBLISH_ATTEMPTS: usize = 16;

const TEMP_PREFIX: &str = ".upload-";
const TEMP_SUFFIX: &str = ".part";

/// Image store rooted at a single directory.
///
/// Holds nothing but its configuration; cloning is cheap and every clone
/// operates on the same directory.
#[derive(Debug, Clone)]
pub struct ImageStore {
    dir: PathBuf,
    allow: AllowList,
    max_upload_bytes: u64,
}

impl ImageStore {
    /// Open the store, creating the directory if it does not exist.
    ///
    /// Fails with [`Error::Storage`] if the path exists but is not a
    /// directory or cannot be created.
    pub fn new(config: StorageConfig) -> Result<Self> {
        let allow = config.allow_list();
        let dir = config.dir;

        match std::fs::metadata(&dir) {
            Ok(meta) if !meta.is_dir() => {
                return Err(Error::storage(format!(
                    "storage path {} is not a directory",
                    dir.display()
                )));
            }
            Ok(_) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {
                std::fs::create_dir_all(&dir)?;
                info!(dir = %dir.display(), "Created storage directory");
            }
            Err(e) => return Err(e.into()),
        }

        Ok(Self {
            dir,
            allow,
            max_upload_bytes: config.max_upload_bytes,
        })
    }

    /// The storage directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Largest accepted payload in bytes.
    pub fn max_upload_bytes(&self) -> u64 {
        self.max_upload_bytes
    }

    /// Store the content of `reader` under a name derived from `raw_name`.
    ///
    /// # Arguments
    ///
    /// * `raw_name` - Client-supplied filename; sanitized before use
    /// * `reader` - Source of the file content, read to EOF
    /// * `declared_size` - Size announced by the client, if any, checked
    ///   before anything is read
    ///
    /// # Returns
    ///
    /// Metadata for the stored file. Its `filename` may differ from the
    /// sanitized name when that name was already taken.
    ///
    /// # Errors
    ///
    /// * [`Error::PayloadTooLarge`] - declared or streamed size exceeds the limit
    /// * [`Error::InvalidName`] - nothing usable is left after sanitizing
    /// * [`Error::UnsupportedType`] - the extension is not allow-listed
    /// * [`Error::Storage`] - any filesystem failure
    ///
    /// If the returned future is dropped before completion the temporary
    /// file is removed and nothing is published.
    pub async fn save<R>(
        &self,
        raw_name: &str,
        reader: R,
        declared_size: Option<u64>,
    ) -> Result<StoredImage>
    where
        R: AsyncRead + Unpin,
    {
        let started = Instant::now();

        if declared_size.is_some_and(|size| size > self.max_upload_bytes) {
            return Err(Error::PayloadTooLarge {
                limit: self.max_upload_bytes,
            });
        }

        let base_name = self.accept_name(raw_name)?;
        let (temp, size_bytes) = self.stream_to_temp(reader).await?;
        let image = self.publish(temp, &base_name).await?;

        info!(
            filename = %image.filename,
            size_bytes,
            duration_ms = started.elapsed().as_millis() as u64,
            "Stored image"
        );
        Ok(image)
    }

    /// Describe every allow-listed regular file in the directory.
    ///
    /// The order is unspecified; see [`super::gallery::listing`] for the
    /// gallery order.
    pub async fn list(&self) -> Result<Vec<StoredImage>> {
        let mut entries = fs::read_dir(&self.dir).await?;
        let mut images = Vec::new();

        while let Some(entry) = entries.next_entry().await? {
            let Ok(name) = entry.file_name().into_string() else {
                continue;
            };
            if name.starts_with('.') || !self.allow.is_allowed(&name) {
                continue;
            }

            // Entries can disappear between the scan and the stat.
            let meta = match entry.metadata().await {
                Ok(meta) => meta,
                Err(e) if e.kind() == ErrorKind::NotFound => continue,
                Err(e) => return Err(e.into()),
            };
            if !meta.file_type().is_file() {
                continue;
            }

            images.push(describe(&name, &meta));
        }

        Ok(images)
    }

    /// Open a stored image for reading.
    ///
    /// Returns the open file together with its metadata. Names that sanitize
    /// to nothing, are not allow-listed, do not exist or are not regular
    /// files all yield [`Error::NotFound`].
    pub async fn fetch(&self, filename: &str) -> Result<(File, StoredImage)> {
        let (path, image) = self.locate(filename).await?;

        let file = File::open(&path)
            .await
            .map_err(|e| not_found_or_storage(e, filename))?;

        Ok((file, image))
    }

    /// Remove a stored image.
    ///
    /// Returns [`Error::NotFound`] when there is no such image, including
    /// when a concurrent delete removed it first.
    pub async fn delete(&self, filename: &str) -> Result<()> {
        let (path, image) = self.locate(filename).await?;

        fs::remove_file(&path)
            .await
            .map_err(|e| not_found_or_storage(e, filename))?;

        info!(filename = %image.filename, "Deleted image");
        Ok(())
    }

    /// Remove temporary upload files older than `max_age`.
    ///
    /// Cancelled uploads clean up after themselves; this only matters for
    /// files left behind by a crashed process. Returns the number removed.
    pub async fn purge_stale_uploads(&self, max_age: Duration) -> Result<usize> {
        let mut entries = fs::read_dir(&self.dir).await?;
        let now = SystemTime::now();
        let mut removed = 0;

        while let Some(entry) = entries.next_entry().await? {
            let Ok(name) = entry.file_name().into_string() else {
                continue;
            };
            if !is_temp_name(&name) {
                continue;
            }

            let Ok(meta) = entry.metadata().await else {
                continue;
            };
            let age = meta
                .modified()
                .ok()
                .and_then(|modified| now.duration_since(modified).ok())
                .unwrap_or_default();
            if !meta.is_file() || age < max_age {
                continue;
            }

            match fs::remove_file(entry.path()).await {
                Ok(()) => removed += 1,
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => warn!(file = %name, error = %e, "Failed to remove stale upload"),
            }
        }

        if removed > 0 {
            info!(removed, "Purged stale temporary uploads");
        }
        Ok(removed)
    }

    fn accept_name(&self, raw_name: &str) -> Result<String> {
        let name = sanitize_filename(raw_name);
        if name.is_empty() {
            return Err(Error::InvalidName);
        }
        if !self.allow.is_allowed(&name) {
            return Err(Error::UnsupportedType(name));
        }
        Ok(name)
    }

    /// Resolve `filename` to an existing regular file inside the directory.
    async fn locate(&self, filename: &str) -> Result<(PathBuf, StoredImage)> {
        let name = sanitize_filename(filename);
        if name.is_empty() || !self.allow.is_allowed(&name) {
            return Err(Error::not_found(filename));
        }

        let path = self.dir.join(&name);
        let meta = fs::symlink_metadata(&path)
            .await
            .map_err(|e| not_found_or_storage(e, filename))?;
        if !meta.file_type().is_file() {
            return Err(Error::not_found(filename));
        }

        Ok((path, describe(&name, &meta)))
    }

    /// Copy `reader` into a fresh hidden file, enforcing the size limit.
    ///
    /// The returned [`TempPath`] deletes the file when dropped.
    async fn stream_to_temp<R>(&self, mut reader: R) -> Result<(TempPath, u64)>
    where
        R: AsyncRead + Unpin,
    {
        let path = self
            .dir
            .join(format!("{TEMP_PREFIX}{}{TEMP_SUFFIX}", Uuid::new_v4()));
        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await?;
        let temp = TempPath::from_path(path);

        // Read one byte past the limit so an oversized payload is detectable.
        let mut limited = (&mut reader).take(self.max_upload_bytes.saturating_add(1));
        let written = tokio::io::copy(&mut limited, &mut file).await?;
        if written > self.max_upload_bytes {
            debug!(limit = self.max_upload_bytes, "Upload exceeded size limit");
            return Err(Error::PayloadTooLarge {
                limit: self.max_upload_bytes,
            });
        }

        file.flush().await?;
        file.sync_all().await?;
        drop(file);

        Ok((temp, written))
    }

    /// Move the temporary file to a free name without ever replacing an
    /// existing file.
    async fn publish(&self, mut temp: TempPath, base_name: &str) -> Result<StoredImage> {
        for attempt in 1..=MAX_PUBLISH_ATTEMPTS {
            let existing = self.existing_names().await?;
            let target_name = resolve_conflict(base_name, &existing);
            let target = self.dir.join(&target_name);

            let outcome = tokio::task::spawn_blocking({
                let target = target.clone();
                move || temp.persist_noclobber(target)
            })
            .await
            .map_err(|e| Error::storage(format!("publish task failed: {e}")))?;

            match outcome {
                Ok(()) => {
                    if target_name != base_name {
                        debug!(
                            requested = %base_name,
                            filename = %target_name,
                            "Renamed upload to avoid a conflict"
                        );
                    }
                    return describe_path(&target).await;
                }
                Err(err) if err.error.kind() == ErrorKind::AlreadyExists => {
                    debug!(filename = %target_name, attempt, "Publish target taken, retrying");
                    temp = err.path;
                }
                Err(err) => return Err(err.error.into()),
            }
        }

        warn!(requested = %base_name, "Gave up finding a free filename");
        Err(Error::storage(format!(
            "no free filename for {base_name} after {MAX_PUBLISH_ATTEMPTS} attempts"
        )))
    }

    /// Every name currently in the directory, hidden and disallowed included.
    async fn existing_names(&self) -> Result<HashSet<String>> {
        let mut entries = fs::read_dir(&self.dir).await?;
        let mut names = HashSet::new();
        while let Some(entry) = entries.next_entry().await? {
            if let Ok(name) = entry.file_name().into_string() {
                names.insert(name);
            }
        }
        Ok(names)
    }
}

fn is_temp_name(name: &str) -> bool {
    name.starts_with(TEMP_PREFIX) && name.ends_with(TEMP_SUFFIX)
}

fn not_found_or_storage(err: std::io::Error, filename: &str) -> Error {
    if err.kind() == ErrorKind::NotFound {
        Error::not_found(filename)
    } else {
        Error::from(err)
    }
}
