use crate::config::Config;
use crate::images::ImageService;
use anyhow::{Context, Result};
use axum::{
    http::{header, Method},
    middleware,
    response::IntoResponse,
    routing::get,
    Router,
};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::{
    cors::{Any, CorsLayer},
    services::{ServeDir, ServeFile},
    trace::TraceLayer,
};

pub mod error;
pub mod request_id;
pub mod routes_images;

pub use error::AppError;

/// Temporary uploads older than this are removed at startup.
const STALE_UPLOAD_AGE: Duration = Duration::from_secs(60 * 60);

/// Shared application context
#[derive(Clone)]
pub struct AppContext {
    pub images: ImageService,
}

impl AppContext {
    pub fn new(images: ImageService) -> Self {
        Self { images }
    }
}

/// Create the Axum router with all routes
pub fn create_router(ctx: AppContext, static_dir: Option<PathBuf>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE]);

    let mut app = Router::new()
        .route("/health", get(health_check))
        .merge(routes_images::image_routes());

    // A static directory replaces the built-in page; index.html is served for `/`.
    match static_dir.filter(|dir| dir.exists()) {
        Some(dir) => {
            tracing::info!("Serving static files from {:?}", dir);
            let index_path = dir.join("index.html");
            app = app.fallback_service(
                ServeDir::new(&dir)
                    .append_index_html_on_directories(true)
                    .not_found_service(ServeFile::new(index_path)),
            );
        }
        None => {
            app = app.route("/", get(routes_images::index_page));
        }
    }

    app.layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(request_id::request_id_middleware))
        .with_state(ctx)
}

async fn health_check() -> impl IntoResponse {
    "ok"
}

/// Start the HTTP server
pub async fn start_server(config: Config, images: ImageService) -> Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid server address")?;

    if let Err(e) = images.store().purge_stale_uploads(STALE_UPLOAD_AGE).await {
        tracing::warn!("Failed to purge stale uploads: {}", e);
    }

    let app = create_router(AppContext::new(images), config.server.static_dir);

    tracing::info!("Starting server on {}", addr);

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => {}
            Err(e) => {
                tracing::error!("Failed to install Ctrl+C handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
