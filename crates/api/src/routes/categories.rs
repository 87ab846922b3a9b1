//! Category routes, relative to `/img/{tenant_id}`.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
};
use pictor_core::image::CategoryInput;
use serde_json::json;

use crate::{AppState, error::ApiError};

/// Creates the category routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/category", post(create_category))
        .route(
            "/category/{category_id}",
            put(update_category).delete(delete_category),
        )
        .route("/categories", get(list_categories))
}

/// POST `/img/{tenant_id}/category`
async fn create_category(
    State(state): State<AppState>,
    Path(tenant_id): Path<i64>,
    Json(payload): Json<CategoryInput>,
) -> Result<impl IntoResponse, ApiError> {
    let category = state.images.create_category(tenant_id, payload).await?;
    Ok((StatusCode::CREATED, Json(category)))
}

/// PUT `/img/{tenant_id}/category/{category_id}`
async fn update_category(
    State(state): State<AppState>,
    Path((tenant_id, category_id)): Path<(i64, i64)>,
    Json(payload): Json<CategoryInput>,
) -> Result<impl IntoResponse, ApiError> {
    let category = state
        .images
        .update_category(tenant_id, category_id, payload)
        .await?;
    Ok(Json(category))
}

/// DELETE `/img/{tenant_id}/category/{category_id}`
async fn delete_category(
    State(state): State<AppState>,
    Path((tenant_id, category_id)): Path<(i64, i64)>,
) -> Result<StatusCode, ApiError> {
    state.images.delete_category(tenant_id, category_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET `/img/{tenant_id}/categories`
async fn list_categories(
    State(state): State<AppState>,
    Path(tenant_id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let categories = state.images.list_categories(tenant_id).await?;
    Ok(Json(json!({ "categories": categories })))
}
