//! Multipart upload endpoints, one per media class.
//!
//! Each endpoint accepts a single `file` field and hands the bytes to the
//! configured [`BlobStore`], returning the public URL and host id.

use axum::{
    extract::{Extension, Multipart},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde_json::json;
use std::sync::Arc;
use tracing::error;

use super::{json_error, server_error};
use crate::media::{BlobStore, MediaKind};

async fn store_upload(
    blobs: Arc<dyn BlobStore>,
    mut multipart: Multipart,
    folder: &str,
    kind: MediaKind,
) -> impl IntoResponse {
    let mut file: Option<(String, Vec<u8>)> = None;

    loop {
        match multipart.next_field().await {
            Ok(Some(field)) => {
                if field.name() != Some("file") {
                    continue;
                }
                let file_name = field
                    .file_name()
                    .map_or_else(|| "upload".to_string(), ToString::to_string);
                match field.bytes().await {
                    Ok(bytes) => {
                        file = Some((file_name, bytes.to_vec()));
                        break;
                    }
                    Err(err) => {
                        error!("failed to read upload field: {err}");
                        return (
                            StatusCode::BAD_REQUEST,
                            json_error("validation", "Could not read file field"),
                        )
                            .into_response();
                    }
                }
            }
            Ok(None) => break,
            Err(err) => {
                error!("malformed multipart request: {err}");
                return (
                    StatusCode::BAD_REQUEST,
                    json_error("validation", "Malformed multipart request"),
                )
                    .into_response();
            }
        }
    }

    let Some((file_name, bytes)) = file else {
        return (
            StatusCode::BAD_REQUEST,
            json_error("validation", "No file provided"),
        )
            .into_response();
    };

    match blobs.store(bytes, &file_name, folder, kind).await {
        Ok(blob) => (
            StatusCode::OK,
            Json(json!({ "url": blob.url, "public_id": blob.public_id })),
        )
            .into_response(),
        Err(err) => {
            error!("blob upload failed: {err}");
            server_error().into_response()
        }
    }
}

/// Cover images and author photos.
#[utoipa::path(
    post,
    path = "/upload/image",
    responses(
        (status = 200, description = "Stored image URL and id"),
        (status = 400, description = "No file provided")
    ),
    tag = "uploads"
)]
pub async fn image(blobs: Extension<Arc<dyn BlobStore>>, multipart: Multipart) -> impl IntoResponse {
    store_upload(blobs.0, multipart, "ebook_images", MediaKind::Image).await
}

/// E-book files (PDF, EPUB, and the rest of the file-type choices).
#[utoipa::path(
    post,
    path = "/upload/pdf",
    responses(
        (status = 200, description = "Stored file URL and id"),
        (status = 400, description = "No file provided")
    ),
    tag = "uploads"
)]
pub async fn pdf(blobs: Extension<Arc<dyn BlobStore>>, multipart: Multipart) -> impl IntoResponse {
    store_upload(blobs.0, multipart, "ebooks", MediaKind::Raw).await
}

/// Plain-text content, stored raw so it downloads unmodified.
#[utoipa::path(
    post,
    path = "/upload/text",
    responses(
        (status = 200, description = "Stored file URL and id"),
        (status = 400, description = "No file provided")
    ),
    tag = "uploads"
)]
pub async fn text(blobs: Extension<Arc<dyn BlobStore>>, multipart: Multipart) -> impl IntoResponse {
    store_upload(blobs.0, multipart, "ebook_texts", MediaKind::Raw).await
}
