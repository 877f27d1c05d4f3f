mod cli;

use imgshelf::{
    config::{self, Config},
    images::{ImageService, ImageStore},
    server,
};

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use std::path::{Path, PathBuf};

fn open_service(config: &Config) -> Result<ImageService> {
    let store = ImageStore::new(config.storage.clone()).with_context(|| {
        format!(
            "Failed to open image store at {}",
            config.storage.dir.display()
        )
    })?;
    Ok(ImageService::new(store))
}

async fn start_server(
    host: Option<String>,
    port: Option<u16>,
    storage_dir: Option<PathBuf>,
    config_path: Option<&Path>,
) -> Result<()> {
    let mut config = config::load_config_or_default(config_path)?;

    // CLI flags win over the config file
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }
    if let Some(dir) = storage_dir {
        config.storage.dir = dir;
        config::prepare_storage(&mut config.storage);
    }
    config::validate_config(&config)?;

    tracing::info!("Starting imgshelf server");
    tracing::info!("Storing images in {}", config.storage.dir.display());

    let images = open_service(&config)?;
    server::start_server(config, images).await
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "imgshelf=trace,imgshelf_common=debug,tower_http=debug".to_string()
        } else {
            "imgshelf=info,tower_http=info".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Start {
            host,
            port,
            storage_dir,
        } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(start_server(host, port, storage_dir, cli.config.as_deref()))
        }
        Commands::List { json } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(list_images(cli.config.as_deref(), json))
        }
        Commands::Import { files } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(import_files(cli.config.as_deref(), &files))
        }
        Commands::Remove { filename } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(remove_image(cli.config.as_deref(), &filename))
        }
        Commands::Validate {
            config: config_path,
        } => {
            let path = config_path.or(cli.config);
            validate_config(path.as_deref())
        }
        Commands::Version => {
            println!("imgshelf {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

async fn list_images(config_path: Option<&Path>, json: bool) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;
    let images = open_service(&config)?
        .gallery()
        .await
        .context("Failed to list images")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&images)?);
        return Ok(());
    }

    if images.is_empty() {
        println!("No images in {}", config.storage.dir.display());
        return Ok(());
    }

    for image in &images {
        println!(
            "{:<40} {:>12} {}  {}",
            image.filename,
            image.size_bytes,
            image.upload_time.to_rfc3339(),
            image.mime_type
        );
    }
    println!("\n{} image(s)", images.len());

    Ok(())
}

async fn import_files(config_path: Option<&Path>, files: &[PathBuf]) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;
    let service = open_service(&config)?;
    let mut failed = 0;

    for path in files {
        match import_one(&service, path).await {
            Ok(stored) => println!("{} -> {}", path.display(), stored),
            Err(e) => {
                failed += 1;
                eprintln!("✗ {}: {:#}", path.display(), e);
            }
        }
    }

    if failed > 0 {
        anyhow::bail!("{} of {} file(s) failed to import", failed, files.len());
    }
    Ok(())
}

async fn import_one(service: &ImageService, path: &Path) -> Result<String> {
    let raw_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .with_context(|| format!("Not a file path: {:?}", path))?;

    let file = tokio::fs::File::open(path)
        .await
        .with_context(|| format!("Failed to open {:?}", path))?;
    let size = file.metadata().await?.len();

    let stored = service.upload(&raw_name, file, Some(size)).await?;
    Ok(stored.filename)
}

async fn remove_image(config_path: Option<&Path>, filename: &str) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;
    open_service(&config)?
        .remove(filename)
        .await
        .with_context(|| format!("Failed to remove {}", filename))?;

    println!("Deleted {}", filename);
    Ok(())
}

fn validate_config(path: Option<&Path>) -> Result<()> {
    let config = match path {
        Some(p) => {
            println!("Validating config: {:?}", p);
            let config = config::load_config(p)?;
            println!("✓ Configuration is valid");
            config
        }
        None => {
            println!("No config file specified, using defaults");
            Config::default()
        }
    };

    println!("  Server: {}:{}", config.server.host, config.server.port);
    println!("  Storage: {}", config.storage.dir.display());
    println!(
        "  Allowed extensions: {}",
        config.storage.allowed_extensions.join(", ")
    );
    println!("  Max upload: {} bytes", config.storage.max_upload_bytes);

    Ok(())
}
