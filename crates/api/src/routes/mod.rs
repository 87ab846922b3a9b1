//! API route definitions.

use axum::Router;

use crate::AppState;

pub mod categories;
pub mod health;
pub mod images;
pub mod r2_config;

/// Creates the API router with all routes.
///
/// Tenant isolation is carried by the `{tenant_id}` path segment; callers are
/// authenticated and authorized upstream of this router.
pub fn api_routes() -> Router<AppState> {
    let tenant_routes = Router::new()
        .merge(images::routes())
        .merge(categories::routes())
        .merge(r2_config::routes());

    Router::new()
        .merge(health::routes())
        .nest("/img/{tenant_id}", tenant_routes)
}
