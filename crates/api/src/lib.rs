//! HTTP API layer with Axum routes.
//!
//! This crate provides:
//! - REST routes for images, the recycle bin, categories and R2 config
//! - Mapping of domain errors to JSON error responses
//! - The health endpoint

pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use pictor_core::image::ImageService;
use pictor_core::storage::R2ClientFactory;
use pictor_db::ImageRepository;
use pictor_queue::RedisDeleteQueue;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use error::ApiError;

/// Image service wired to Postgres, Redis and Cloudflare R2.
pub type ImageLibrary = ImageService<ImageRepository, RedisDeleteQueue, R2ClientFactory>;

/// Multipart framing allowance on top of the image size limit.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// Image library service.
    pub images: Arc<ImageLibrary>,
}

impl AppState {
    /// Wraps the image service.
    #[must_use]
    pub fn new(images: Arc<ImageLibrary>) -> Self {
        Self { images }
    }
}

/// Creates the main application router.
///
/// Request bodies are capped slightly above `max_upload_bytes` so that the
/// service reports oversize images itself.
pub fn create_router(state: AppState, max_upload_bytes: usize) -> Router {
    Router::new()
        .nest("/api/v1", routes::api_routes())
        .layer(DefaultBodyLimit::max(
            max_upload_bytes.saturating_add(MULTIPART_OVERHEAD),
        ))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
