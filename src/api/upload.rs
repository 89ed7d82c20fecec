//! Image upload storage on the local filesystem.
//!
//! Files land under `{UPLOAD_DIR}/images/{user_id}/{YYYY}/{MM}/{DD}/` and
//! are served back via the static `/uploads` route. Catalogs and items only
//! ever store the returned URL string.

use axum::{
    extract::{Multipart, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::Deserialize;
use serde_json::json;
use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::auth::Claims;
use crate::config::Config;

const ALLOWED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp"];

pub async fn upload_file(
    State(config): State<Config>,
    claims: Claims,
    mut multipart: Multipart,
) -> impl IntoResponse {
    let user_id = claims.user_id();

    while let Some(field) = multipart.next_field().await.unwrap_or(None) {
        if field.name() != Some("file") {
            continue;
        }

        let file_name = field.file_name().unwrap_or_default().to_string();
        let extension = Path::new(&file_name)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase());

        let extension = match extension {
            Some(ext) if ALLOWED_EXTENSIONS.contains(&ext.as_str()) => ext,
            _ => {
                return (
                    StatusCode::BAD_REQUEST,
                    Json(json!({
                        "error": format!(
                            "unsupported file type, allowed: {}",
                            ALLOWED_EXTENSIONS.join(", ")
                        )
                    })),
                )
                    .into_response()
            }
        };

        let data = match field.bytes().await {
            Ok(data) => data,
            Err(e) => {
                return (
                    StatusCode::BAD_REQUEST,
                    Json(json!({ "error": e.to_string() })),
                )
                    .into_response()
            }
        };

        let date_prefix = chrono::Utc::now().format("%Y/%m/%d").to_string();
        let filename = format!("{}.{}", Uuid::new_v4(), extension);

        let dir: PathBuf = PathBuf::from(&config.upload_dir)
            .join("images")
            .join(user_id)
            .join(&date_prefix);

        if let Err(e) = tokio::fs::create_dir_all(&dir).await {
            tracing::error!("failed to create upload directory: {}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "failed to store file" })),
            )
                .into_response();
        }

        if let Err(e) = tokio::fs::write(dir.join(&filename), &data).await {
            tracing::error!("failed to write upload: {}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "failed to store file" })),
            )
                .into_response();
        }

        let file_url = format!("/uploads/images/{}/{}/{}", user_id, date_prefix, filename);
        return (StatusCode::CREATED, Json(json!({ "file_url": file_url }))).into_response();
    }

    (
        StatusCode::BAD_REQUEST,
        Json(json!({ "error": "no file uploaded" })),
    )
        .into_response()
}

#[derive(Deserialize)]
pub struct DeleteFileQuery {
    pub file_url: String,
}

/// Delete an uploaded file. Only URLs inside the caller's own namespace may
/// be removed.
pub async fn delete_file(
    State(config): State<Config>,
    claims: Claims,
    Query(query): Query<DeleteFileQuery>,
) -> impl IntoResponse {
    let namespace = format!("/uploads/images/{}/", claims.user_id());

    if !query.file_url.starts_with(&namespace) || query.file_url.contains("..") {
        return (
            StatusCode::FORBIDDEN,
            Json(json!({ "error": "file does not belong to caller" })),
        )
            .into_response();
    }

    let relative = query
        .file_url
        .strip_prefix("/uploads/")
        .unwrap_or(&query.file_url);
    let path = PathBuf::from(&config.upload_dir).join(relative);

    match tokio::fs::remove_file(&path).await {
        Ok(()) => (StatusCode::OK, Json(json!({ "message": "file deleted" }))).into_response(),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "file not found" })),
        )
            .into_response(),
        Err(e) => {
            tracing::error!("failed to delete upload: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "failed to delete file" })),
            )
                .into_response()
        }
    }
}
