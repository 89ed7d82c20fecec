use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
};
use sea_orm::DatabaseConnection;
use serde_json::json;

use crate::auth::Claims;
use crate::services::catalog_service;

use super::error_response;

/// Delete every trace of the caller: owned catalogs (cascaded), saved
/// links, and ownership rows on other users' items. Invoked on account
/// deletion by the identity service.
pub async fn delete_me(State(db): State<DatabaseConnection>, claims: Claims) -> impl IntoResponse {
    match catalog_service::delete_user_data(&db, claims.user_id()).await {
        Ok(deleted) => (
            StatusCode::OK,
            Json(json!({
                "message": "user data deleted",
                "deleted": deleted,
            })),
        )
            .into_response(),
        Err(e) => error_response(e),
    }
}
