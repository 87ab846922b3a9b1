//! Per-tenant R2 configuration routes.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::put,
};
use pictor_core::image::{MaskedR2Config, R2ConfigInput};

use crate::{AppState, error::ApiError};

/// Creates the R2 config routes, relative to `/img/{tenant_id}`.
pub fn routes() -> Router<AppState> {
    Router::new().route("/configure_r2", put(set_r2_config).get(get_r2_config))
}

/// PUT `/img/{tenant_id}/configure_r2`
///
/// An empty or missing `secret_access_key` keeps the stored secret.
async fn set_r2_config(
    State(state): State<AppState>,
    Path(tenant_id): Path<i64>,
    Json(payload): Json<R2ConfigInput>,
) -> Result<StatusCode, ApiError> {
    state.images.set_r2_config(tenant_id, payload).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET `/img/{tenant_id}/configure_r2`
async fn get_r2_config(
    State(state): State<AppState>,
    Path(tenant_id): Path<i64>,
) -> Result<Json<MaskedR2Config>, ApiError> {
    let config = state.images.get_r2_config(tenant_id).await?;
    Ok(Json(config.into()))
}
