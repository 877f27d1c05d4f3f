use imgshelf_common::paths::{AllowList, DEFAULT_IMAGE_EXTENSIONS};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Directory whose `index.html` replaces the built-in gallery page
    #[serde(default)]
    pub static_dir: Option<PathBuf>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    5000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            static_dir: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    /// Directory holding the images (`~` is expanded on load)
    #[serde(default = "default_storage_dir")]
    pub dir: PathBuf,

    /// Accepted file extensions, compared case-insensitively
    #[serde(default = "default_allowed_extensions")]
    pub allowed_extensions: Vec<String>,

    /// Largest accepted upload in bytes (default: 50 MiB)
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: u64,
}

fn default_storage_dir() -> PathBuf {
    PathBuf::from("./gallery_images")
}

fn default_allowed_extensions() -> Vec<String> {
    DEFAULT_IMAGE_EXTENSIONS.iter().map(|s| s.to_string()).collect()
}

fn default_max_upload_bytes() -> u64 {
    50 * 1024 * 1024
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            dir: default_storage_dir(),
            allowed_extensions: default_allowed_extensions(),
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

impl StorageConfig {
    /// Storage config rooted at `dir` with default limits.
    pub fn with_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            ..Self::default()
        }
    }

    pub fn allow_list(&self) -> AllowList {
        AllowList::new(&self.allowed_extensions)
    }
}
