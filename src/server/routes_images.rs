//! Gallery routes: upload, list, serve and delete images.

use std::io;

use axum::{
    body::Body,
    extract::{multipart::MultipartError, DefaultBodyLimit, Multipart, Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use futures::TryStreamExt;
use imgshelf_common::paths::UNKNOWN_MIME;
use imgshelf_common::{Error, StoredImage};
use serde_json::{json, Value};
use tokio_util::io::{ReaderStream, StreamReader};

use super::error::AppError;
use super::AppContext;

/// Allowance for multipart boundaries and part headers on top of the file
/// size limit when checking `Content-Length`.
pub const MULTIPART_OVERHEAD: u64 = 64 * 1024;

const INDEX_HTML: &str = include_str!("index.html");

/// Create image-related routes.
pub fn image_routes() -> Router<AppContext> {
    Router::new()
        .route(
            "/api/upload",
            // The store enforces the configured limit while streaming.
            post(upload_image).layer(DefaultBodyLimit::disable()),
        )
        .route("/api/images", get(list_images))
        .route("/api/delete/{filename}", delete(delete_image))
        .route("/images/{filename}", get(serve_image))
}

/// Built-in gallery page.
pub async fn index_page() -> Html<&'static str> {
    Html(INDEX_HTML)
}

/// Accept a multipart upload with a `file` part.
///
/// Returns 201 with the stored filename, which may carry a `_N` suffix if
/// the name was already taken.
async fn upload_image(
    State(ctx): State<AppContext>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Result<Response, AppError> {
    let limit = ctx.images.store().max_upload_bytes();
    if let Some(len) = content_length(&headers) {
        if len > limit.saturating_add(MULTIPART_OVERHEAD) {
            return Err(Error::PayloadTooLarge { limit }.into());
        }
    }

    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some("file") {
            continue;
        }

        let raw_name = field.file_name().unwrap_or_default().to_string();
        if raw_name.is_empty() {
            return Err(AppError::bad_request("No selected file"));
        }

        let reader = StreamReader::new(field.map_err(io::Error::other));
        tokio::pin!(reader);
        let image = match ctx.images.upload(&raw_name, reader, None).await {
            Ok(image) => image,
            Err(Error::Storage { source }) => return Err(stream_failure(source)),
            Err(e) => return Err(e.into()),
        };

        return Ok((
            StatusCode::CREATED,
            Json(json!({
                "message": "File uploaded successfully",
                "filename": image.filename,
            })),
        )
            .into_response());
    }

    Err(AppError::bad_request("No file part"))
}

/// Split a failed upload read into client and server faults.
///
/// A broken multipart body reaches the store as an `io::Error` wrapping the
/// `MultipartError`; that is the client's fault, not a storage failure.
fn stream_failure(source: io::Error) -> AppError {
    if !source.get_ref().is_some_and(|e| e.is::<MultipartError>()) {
        return Error::Storage { source }.into();
    }
    match source.into_inner().map(|e| e.downcast::<MultipartError>()) {
        Some(Ok(err)) => AppError::from(*err),
        _ => AppError::bad_request("Malformed upload body"),
    }
}

/// List all images, newest first.
async fn list_images(State(ctx): State<AppContext>) -> Result<Json<Vec<StoredImage>>, AppError> {
    Ok(Json(ctx.images.gallery().await?))
}

/// Stream an image with its inferred content type.
///
/// Failures are plain text rather than JSON since this URL is used directly
/// in `<img>` tags.
async fn serve_image(State(ctx): State<AppContext>, Path(filename): Path<String>) -> Response {
    let (file, image) = match ctx.images.open(&filename).await {
        Ok(found) => found,
        Err(Error::NotFound(_)) => {
            return (StatusCode::NOT_FOUND, "Image not found").into_response();
        }
        Err(e) => {
            tracing::error!(filename = %filename, error = %e, "Failed to open image");
            return (StatusCode::INTERNAL_SERVER_ERROR, "Error retrieving image").into_response();
        }
    };

    let content_type = if image.mime_type == UNKNOWN_MIME {
        "application/octet-stream".to_string()
    } else {
        image.mime_type
    };

    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, content_type),
            (header::CONTENT_LENGTH, image.size_bytes.to_string()),
            (header::CACHE_CONTROL, "no-cache".to_string()),
        ],
        Body::from_stream(ReaderStream::new(file)),
    )
        .into_response()
}

/// Delete an image by filename.
async fn delete_image(
    State(ctx): State<AppContext>,
    Path(filename): Path<String>,
) -> Result<Json<Value>, AppError> {
    ctx.images.remove(&filename).await?;
    Ok(Json(json!({ "message": "Image deleted successfully" })))
}

fn content_length(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(header::CONTENT_LENGTH)?
        .to_str()
        .ok()?
        .parse()
        .ok()
}
