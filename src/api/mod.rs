pub mod catalogs;
pub mod health;
pub mod items;
pub mod upload;
pub mod user_catalogs;
pub mod users;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{delete, get, patch, post},
    Router,
};
use serde_json::json;

use crate::db::AppState;
use crate::services::ServiceError;

pub fn api_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health::health_check))
        // Catalogs
        .route(
            "/catalogs",
            get(catalogs::list_catalogs).post(catalogs::create_catalog),
        )
        .route("/catalogs/public", get(catalogs::list_public_catalogs))
        .route(
            "/catalogs/:id",
            get(catalogs::get_catalog)
                .put(catalogs::update_catalog)
                .delete(catalogs::delete_catalog),
        )
        // Items
        .route("/items", post(items::create_item))
        .route("/items/catalog/:catalog_id", get(items::list_catalog_items))
        .route(
            "/items/:id",
            get(items::get_item)
                .put(items::update_item)
                .delete(items::delete_item),
        )
        .route("/items/:id/toggle-owned", patch(items::toggle_owned))
        // Saved catalogs
        .route("/user-catalogs/my-catalogs", get(user_catalogs::my_catalogs))
        .route("/user-catalogs/save-catalog", post(user_catalogs::save_catalog))
        .route(
            "/user-catalogs/unsave-catalog/:id",
            delete(user_catalogs::unsave_catalog),
        )
        .route(
            "/user-catalogs/check-saved/:original_id",
            get(user_catalogs::check_saved),
        )
        .route(
            "/user-catalogs/check-ownership/:id",
            get(user_catalogs::check_ownership),
        )
        // Account data
        .route("/users/me", delete(users::delete_me))
        // Image upload
        .route(
            "/upload/file",
            post(upload::upload_file).delete(upload::delete_file),
        )
        .with_state(state)
}

/// Map a service failure to a distinguishable status + error body, so
/// clients can branch on the kind (e.g. "already saved" vs a generic
/// failure banner).
pub(crate) fn error_response(err: ServiceError) -> Response {
    let status = match &err {
        ServiceError::NotFound => StatusCode::NOT_FOUND,
        ServiceError::Forbidden => StatusCode::FORBIDDEN,
        ServiceError::Unauthenticated => StatusCode::UNAUTHORIZED,
        ServiceError::InvalidOperation(_) => StatusCode::BAD_REQUEST,
        ServiceError::Conflict(_) => StatusCode::CONFLICT,
        ServiceError::Database(msg) => {
            tracing::error!("storage failure: {}", msg);
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };

    (status, Json(json!({ "error": err.to_string() }))).into_response()
}
