use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashMap;

use crate::auth::{Claims, OptionalClaims};
use crate::db::AppState;
use crate::models::catalog;
use crate::services::stats::CatalogStats;
use crate::services::{catalog_service, save_service, stats};
use crate::user_directory;

use super::error_response;

#[derive(Serialize)]
pub struct CatalogDto {
    pub catalog_id: String,
    pub owner_id: String,
    pub title: String,
    pub description: String,
    pub category: String,
    pub tags: Vec<String>,
    pub visibility: String,
    pub thumbnail_url: Option<String>,
    pub created_at: String,
    pub updated_at: String,
    // Calculated fields
    pub item_count: i64,
    pub owned_count: i64,
    pub completion_rate: f64,
    pub original_catalog_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub creator_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_saved: Option<bool>,
}

impl CatalogDto {
    pub fn from_parts(model: catalog::Model, stats: CatalogStats) -> Self {
        let tags = model.tag_list();
        Self {
            catalog_id: model.id,
            owner_id: model.owner_id,
            title: model.title,
            description: model.description,
            category: model.category,
            tags,
            visibility: model.visibility,
            thumbnail_url: model.thumbnail_url,
            created_at: model.created_at,
            updated_at: model.updated_at,
            item_count: stats.item_count,
            owned_count: stats.owned_count,
            completion_rate: stats.completion_rate,
            original_catalog_id: None,
            creator_name: None,
            is_saved: None,
        }
    }
}

#[derive(Deserialize)]
pub struct CatalogFilter {
    pub category: Option<String>,
    pub visibility: Option<String>,
}

/// The caller's catalogs, with the caller's own completion stats.
pub async fn list_catalogs(
    State(db): State<DatabaseConnection>,
    claims: Claims,
    Query(filter): Query<CatalogFilter>,
) -> impl IntoResponse {
    let user_id = claims.user_id();

    let catalogs = match catalog_service::list_catalogs(
        &db,
        user_id,
        filter.category.as_deref(),
        filter.visibility.as_deref(),
    )
    .await
    {
        Ok(catalogs) => catalogs,
        Err(e) => return error_response(e),
    };

    let mut dtos = Vec::with_capacity(catalogs.len());
    for model in catalogs {
        match stats::catalog_stats(&db, &model.id, Some(user_id)).await {
            Ok(stats) => dtos.push(CatalogDto::from_parts(model, stats)),
            Err(e) => return error_response(e),
        }
    }

    (StatusCode::OK, Json(dtos)).into_response()
}

#[derive(Deserialize)]
pub struct PublicCatalogFilter {
    pub category: Option<String>,
}

/// Public catalogs for the explore view, newest first. Stats are computed
/// against the creator's ownership rows (visitors have none for an unsaved
/// catalog), and each entry carries the creator's display name and, for an
/// authenticated caller, whether they already saved it.
pub async fn list_public_catalogs(
    State(state): State<AppState>,
    viewer: OptionalClaims,
    Query(filter): Query<PublicCatalogFilter>,
) -> impl IntoResponse {
    let db = &state.conn;

    let catalogs = match catalog_service::list_public_catalogs(
        db,
        filter.category.as_deref(),
        viewer.user_id(),
    )
    .await
    {
        Ok(catalogs) => catalogs,
        Err(e) => return error_response(e),
    };

    let base_url = state.config.user_api_url.as_deref();
    let mut name_cache: HashMap<String, String> = HashMap::new();

    let mut dtos = Vec::with_capacity(catalogs.len());
    for model in catalogs {
        let stats = match stats::catalog_stats(db, &model.id, Some(&model.owner_id)).await {
            Ok(stats) => stats,
            Err(e) => return error_response(e),
        };

        let creator_name = match name_cache.get(&model.owner_id) {
            Some(name) => name.clone(),
            None => {
                let name =
                    user_directory::display_name_or_fallback(base_url, &model.owner_id).await;
                name_cache.insert(model.owner_id.clone(), name.clone());
                name
            }
        };

        let is_saved = match viewer.user_id() {
            Some(user_id) => match save_service::is_saved(db, user_id, &model.id).await {
                Ok(link) => Some(link.is_some()),
                Err(e) => return error_response(e),
            },
            None => None,
        };

        let mut dto = CatalogDto::from_parts(model, stats);
        dto.creator_name = Some(creator_name);
        dto.is_saved = is_saved;
        dtos.push(dto);
    }

    (StatusCode::OK, Json(dtos)).into_response()
}

/// Catalog detail. Public catalogs are visible to anyone; private ones only
/// to their owner. Stats are personalized to the viewer; an anonymous
/// viewer owns nothing.
pub async fn get_catalog(
    State(db): State<DatabaseConnection>,
    viewer: OptionalClaims,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let model = match catalog_service::fetch_catalog_for_read(&db, &id, viewer.user_id()).await {
        Ok(model) => model,
        Err(e) => return error_response(e),
    };

    match stats::catalog_stats(&db, &model.id, viewer.user_id()).await {
        Ok(stats) => (StatusCode::OK, Json(CatalogDto::from_parts(model, stats))).into_response(),
        Err(e) => return error_response(e),
    }
}

pub async fn create_catalog(
    State(db): State<DatabaseConnection>,
    claims: Claims,
    Json(draft): Json<catalog_service::CatalogDraft>,
) -> impl IntoResponse {
    match catalog_service::create_catalog(&db, claims.user_id(), draft).await {
        Ok(model) => {
            let dto = CatalogDto::from_parts(model, CatalogStats::empty());
            (StatusCode::CREATED, Json(dto)).into_response()
        }
        Err(e) => error_response(e),
    }
}

pub async fn update_catalog(
    State(db): State<DatabaseConnection>,
    claims: Claims,
    Path(id): Path<String>,
    Json(patch): Json<catalog_service::CatalogPatch>,
) -> impl IntoResponse {
    let user_id = claims.user_id();

    let model = match catalog_service::update_catalog(&db, user_id, &id, patch).await {
        Ok(model) => model,
        Err(e) => return error_response(e),
    };

    match stats::catalog_stats(&db, &model.id, Some(user_id)).await {
        Ok(stats) => (StatusCode::OK, Json(CatalogDto::from_parts(model, stats))).into_response(),
        Err(e) => error_response(e),
    }
}

pub async fn delete_catalog(
    State(db): State<DatabaseConnection>,
    claims: Claims,
    Path(id): Path<String>,
) -> impl IntoResponse {
    match catalog_service::delete_catalog(&db, claims.user_id(), &id).await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({ "message": "catalog deleted" })),
        )
            .into_response(),
        Err(e) => error_response(e),
    }
}
