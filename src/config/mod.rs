mod types;

pub use types::*;

use anyhow::{Context, Result};
use imgshelf_common::paths::normalize_extension;
use std::path::{Path, PathBuf};

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let mut config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    prepare_storage(&mut config.storage);

    validate_config(&config)?;

    Ok(config)
}

/// Load config from default locations or return default config
pub fn load_config_or_default(custom_path: Option<&Path>) -> Result<Config> {
    if let Some(path) = custom_path {
        return load_config(path);
    }

    let default_paths = [
        "./imgshelf.toml",
        "./config.toml",
        "~/.config/imgshelf/config.toml",
        "/etc/imgshelf/config.toml",
    ];

    for path_str in default_paths {
        let path = shellexpand::tilde(path_str);
        let path = Path::new(path.as_ref());
        if path.exists() {
            return load_config(path);
        }
    }

    let mut config = Config::default();
    prepare_storage(&mut config.storage);
    Ok(config)
}

/// Expand `~` in the storage directory and normalize the extension list.
pub fn prepare_storage(storage: &mut StorageConfig) {
    storage.dir = expand_path(&storage.dir);
    storage.allowed_extensions = storage
        .allowed_extensions
        .iter()
        .map(|ext| normalize_extension(ext))
        .collect();
}

fn expand_path(path: &Path) -> PathBuf {
    let raw = path.to_string_lossy();
    PathBuf::from(shellexpand::tilde(raw.as_ref()).as_ref())
}

/// Validate configuration
pub fn validate_config(config: &Config) -> Result<()> {
    if config.server.port == 0 {
        anyhow::bail!("Server port cannot be 0");
    }

    if config.storage.max_upload_bytes == 0 {
        anyhow::bail!("storage.max_upload_bytes must be greater than 0");
    }

    if config.storage.allowed_extensions.is_empty() {
        anyhow::bail!("storage.allowed_extensions cannot be empty");
    }

    for ext in &config.storage.allowed_extensions {
        let normalized = normalize_extension(ext);
        if normalized.is_empty() || !normalized.chars().all(|c| c.is_ascii_alphanumeric()) {
            anyhow::bail!(
                "Invalid extension '{}' in storage.allowed_extensions (expected e.g. \"png\")",
                ext
            );
        }
    }

    Ok(())
}
