use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "imgshelf")]
#[command(author, version, about = "Filesystem-backed image gallery")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the gallery web server
    Start {
        /// Host to bind to (overrides config)
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on (overrides config)
        #[arg(short, long)]
        port: Option<u16>,

        /// Directory holding the images (overrides config)
        #[arg(long)]
        storage_dir: Option<PathBuf>,
    },

    /// List stored images, newest first
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Copy local image files into the store
    Import {
        /// Files to import
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Delete a stored image
    Remove {
        /// Name of the stored image
        filename: String,
    },

    /// Validate configuration file
    Validate {
        /// Config file to validate (uses default if not specified)
        config: Option<PathBuf>,
    },

    /// Display version information
    Version,
}
