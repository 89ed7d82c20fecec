use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use sea_orm::DatabaseConnection;
use serde::Serialize;
use serde_json::json;
use std::collections::HashMap;

use crate::auth::{Claims, OptionalClaims};
use crate::models::item;
use crate::services::{catalog_service, item_service};

use super::error_response;

#[derive(Serialize)]
pub struct ItemDto {
    pub item_id: String,
    pub catalog_id: String,
    pub name: String,
    pub description: String,
    pub image_url: Option<String>,
    pub owned: bool,
    pub user_fields: HashMap<String, String>,
    pub created_at: String,
    pub updated_at: String,
}

impl ItemDto {
    pub fn from_parts(model: item::Model, owned: bool) -> Self {
        let user_fields = model.field_map();
        Self {
            item_id: model.id,
            catalog_id: model.catalog_id,
            name: model.name,
            description: model.description,
            image_url: model.image_url,
            owned,
            user_fields,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

/// Items of a catalog, each decorated with the viewer's ownership flag.
/// Anonymous viewers of a public catalog see everything as not owned.
pub async fn list_catalog_items(
    State(db): State<DatabaseConnection>,
    viewer: OptionalClaims,
    Path(catalog_id): Path<String>,
) -> impl IntoResponse {
    if let Err(e) =
        catalog_service::fetch_catalog_for_read(&db, &catalog_id, viewer.user_id()).await
    {
        return error_response(e);
    }

    let items = match item_service::list_items(&db, &catalog_id).await {
        Ok(items) => items,
        Err(e) => return error_response(e),
    };

    let owned = match viewer.user_id() {
        Some(user_id) => {
            let ids: Vec<String> = items.iter().map(|i| i.id.clone()).collect();
            match item_service::owned_map(&db, user_id, &ids).await {
                Ok(map) => map,
                Err(e) => return error_response(e),
            }
        }
        None => HashMap::new(),
    };

    let dtos: Vec<ItemDto> = items
        .into_iter()
        .map(|model| {
            let flag = owned.get(&model.id).copied().unwrap_or(false);
            ItemDto::from_parts(model, flag)
        })
        .collect();

    (StatusCode::OK, Json(dtos)).into_response()
}

pub async fn get_item(
    State(db): State<DatabaseConnection>,
    viewer: OptionalClaims,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let model = match item_service::get_item(&db, &id).await {
        Ok(model) => model,
        Err(e) => return error_response(e),
    };

    if let Err(e) =
        catalog_service::fetch_catalog_for_read(&db, &model.catalog_id, viewer.user_id()).await
    {
        return error_response(e);
    }

    let owned = match viewer.user_id() {
        Some(user_id) => match item_service::status_for(&db, user_id, &model.id).await {
            Ok(flag) => flag,
            Err(e) => return error_response(e),
        },
        None => false,
    };

    (StatusCode::OK, Json(ItemDto::from_parts(model, owned))).into_response()
}

pub async fn create_item(
    State(db): State<DatabaseConnection>,
    claims: Claims,
    Json(draft): Json<item_service::ItemDraft>,
) -> impl IntoResponse {
    match item_service::create_item(&db, claims.user_id(), draft).await {
        // The creator's status row was just seeded not-owned.
        Ok(model) => (StatusCode::CREATED, Json(ItemDto::from_parts(model, false))).into_response(),
        Err(e) => error_response(e),
    }
}

pub async fn update_item(
    State(db): State<DatabaseConnection>,
    claims: Claims,
    Path(id): Path<String>,
    Json(patch): Json<item_service::ItemPatch>,
) -> impl IntoResponse {
    let user_id = claims.user_id();

    let model = match item_service::update_item(&db, user_id, &id, patch).await {
        Ok(model) => model,
        Err(e) => return error_response(e),
    };

    match item_service::status_for(&db, user_id, &model.id).await {
        Ok(owned) => (StatusCode::OK, Json(ItemDto::from_parts(model, owned))).into_response(),
        Err(e) => error_response(e),
    }
}

/// Flip the caller's ownership flag for an item and return the item with
/// the new state.
pub async fn toggle_owned(
    State(db): State<DatabaseConnection>,
    claims: Claims,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let user_id = claims.user_id();

    let status = match item_service::toggle_owned(&db, user_id, &id).await {
        Ok(status) => status,
        Err(e) => return error_response(e),
    };

    match item_service::get_item(&db, &id).await {
        Ok(model) => {
            (StatusCode::OK, Json(ItemDto::from_parts(model, status.owned))).into_response()
        }
        Err(e) => error_response(e),
    }
}

pub async fn delete_item(
    State(db): State<DatabaseConnection>,
    claims: Claims,
    Path(id): Path<String>,
) -> impl IntoResponse {
    match item_service::delete_item(&db, claims.user_id(), &id).await {
        Ok(()) => (StatusCode::OK, Json(json!({ "message": "item deleted" }))).into_response(),
        Err(e) => error_response(e),
    }
}
