//! Shared test harness for integration tests.
//!
//! Provides [`TestHarness`] which opens a store with default settings in a
//! temporary directory and wraps it in an [`AppContext`]. The
//! [`TestHarness::with_server`] constructor starts Axum on a random port for
//! HTTP-level testing.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::path::Path;

use axum::Router;
use imgshelf::config::{Config, StorageConfig};
use imgshelf::images::{ImageService, ImageStore};
use imgshelf::server::{create_router, AppContext};
use tempfile::TempDir;

/// Test harness wrapping an [`AppContext`] backed by a temporary directory.
pub struct TestHarness {
    pub ctx: AppContext,
    /// Kept alive for the lifetime of the harness.
    pub dir: TempDir,
}

impl TestHarness {
    /// Create a new harness with default storage settings.
    pub fn new() -> Self {
        Self::with_storage(|_| {})
    }

    /// Create a new harness, letting the caller adjust the storage config.
    pub fn with_storage(adjust: impl FnOnce(&mut StorageConfig)) -> Self {
        let dir = tempfile::tempdir().expect("failed to create temp dir");

        let mut config = Config::default();
        config.storage.dir = dir.path().to_path_buf();
        adjust(&mut config.storage);

        let store = ImageStore::new(config.storage).expect("failed to open store");
        let ctx = AppContext::new(ImageService::new(store));

        Self { ctx, dir }
    }

    /// Router for in-process requests via `tower::ServiceExt::oneshot`.
    pub fn router(&self) -> Router {
        create_router(self.ctx.clone(), None)
    }

    /// Start an Axum server on a random port and return the harness together
    /// with the bound socket address.
    pub async fn with_server() -> (Self, SocketAddr) {
        Self::serve(Self::new()).await
    }

    /// Start a server with an upload limit of `max_upload_bytes`.
    pub async fn with_server_limit(max_upload_bytes: u64) -> (Self, SocketAddr) {
        Self::serve(Self::with_storage(|s| s.max_upload_bytes = max_upload_bytes)).await
    }

    async fn serve(harness: Self) -> (Self, SocketAddr) {
        let app = harness.router();

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind random port");
        let addr = listener.local_addr().expect("failed to get local addr");

        tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });

        (harness, addr)
    }

    /// The storage directory.
    pub fn storage_dir(&self) -> &Path {
        self.dir.path()
    }

    /// Write a file straight into the storage directory.
    pub fn put_file(&self, name: &str, contents: &[u8]) {
        std::fs::write(self.dir.path().join(name), contents).expect("failed to write file");
    }
}

/// Multipart form with a single `file` part.
pub fn file_form(filename: &str, contents: &[u8]) -> reqwest::multipart::Form {
    let part = reqwest::multipart::Part::bytes(contents.to_vec()).file_name(filename.to_string());
    reqwest::multipart::Form::new().part("file", part)
}

/// Upload `contents` as `filename` and return the response.
pub async fn upload(addr: SocketAddr, filename: &str, contents: &[u8]) -> reqwest::Response {
    reqwest::Client::new()
        .post(format!("http://{addr}/api/upload"))
        .multipart(file_form(filename, contents))
        .send()
        .await
        .expect("upload request failed")
}
