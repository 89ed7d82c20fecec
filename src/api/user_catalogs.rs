use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use sea_orm::DatabaseConnection;
use serde::Deserialize;
use serde_json::json;

use crate::auth::Claims;
use crate::services::{catalog_service, save_service};

use super::catalogs::CatalogDto;
use super::error_response;

/// Every catalog the caller owns - created originals and saved copies -
/// newest first, each with its provenance (null for originals) and the
/// caller's completion stats.
pub async fn my_catalogs(
    State(db): State<DatabaseConnection>,
    claims: Claims,
) -> impl IntoResponse {
    match save_service::list_owned(&db, claims.user_id()).await {
        Ok(owned) => {
            let dtos: Vec<CatalogDto> = owned
                .into_iter()
                .map(|entry| {
                    let mut dto = CatalogDto::from_parts(entry.catalog, entry.stats);
                    dto.original_catalog_id = entry.original_catalog_id;
                    dto
                })
                .collect();
            (StatusCode::OK, Json(dtos)).into_response()
        }
        Err(e) => error_response(e),
    }
}

#[derive(Deserialize)]
pub struct SaveCatalogRequest {
    pub catalog_id: String,
}

/// Copy another user's catalog into the caller's collection.
pub async fn save_catalog(
    State(db): State<DatabaseConnection>,
    claims: Claims,
    Json(request): Json<SaveCatalogRequest>,
) -> impl IntoResponse {
    match save_service::save_catalog(&db, claims.user_id(), &request.catalog_id).await {
        Ok(outcome) => (
            StatusCode::CREATED,
            Json(json!({
                "message": "catalog saved",
                "copied_catalog_id": outcome.copied_catalog_id,
                "original_catalog_id": outcome.original_catalog_id,
            })),
        )
            .into_response(),
        Err(e) => error_response(e),
    }
}

/// Remove a saved copy. The path parameter is the copy's id, not the
/// original's.
pub async fn unsave_catalog(
    State(db): State<DatabaseConnection>,
    claims: Claims,
    Path(copied_catalog_id): Path<String>,
) -> impl IntoResponse {
    match save_service::unsave_catalog(&db, claims.user_id(), &copied_catalog_id).await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({ "message": "catalog removed" })),
        )
            .into_response(),
        Err(e) => error_response(e),
    }
}

pub async fn check_saved(
    State(db): State<DatabaseConnection>,
    claims: Claims,
    Path(original_catalog_id): Path<String>,
) -> impl IntoResponse {
    match save_service::is_saved(&db, claims.user_id(), &original_catalog_id).await {
        Ok(link) => (
            StatusCode::OK,
            Json(json!({
                "original_catalog_id": original_catalog_id,
                "is_saved": link.is_some(),
                "copied_catalog_id": link.and_then(|l| l.copied_catalog_id),
            })),
        )
            .into_response(),
        Err(e) => error_response(e),
    }
}

pub async fn check_ownership(
    State(db): State<DatabaseConnection>,
    claims: Claims,
    Path(catalog_id): Path<String>,
) -> impl IntoResponse {
    let is_owned = match catalog_service::get_catalog(&db, &catalog_id).await {
        Ok(catalog) => catalog.owner_id == claims.user_id(),
        Err(crate::services::ServiceError::NotFound) => false,
        Err(e) => return error_response(e),
    };

    (
        StatusCode::OK,
        Json(json!({
            "catalog_id": catalog_id,
            "is_owned": is_owned,
        })),
    )
        .into_response()
}
