//! Image library and recycle-bin routes.

use axum::{
    Json, Router,
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post},
};
use bytes::Bytes;
use pictor_core::image::{ImageQuery, UploadImageInput};
use pictor_shared::types::PageRequest;
use serde::Deserialize;

use crate::{AppState, error::ApiError};

/// Creates the image routes, relative to `/img/{tenant_id}`.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_images))
        .route("/upload", post(upload_image))
        .route("/{image_id}", delete(delete_image))
        .route(
            "/recycle/{image_id}",
            delete(clear_recycled).put(restore_recycled),
        )
}

// ============================================================================
// Request Types
// ============================================================================

/// Query for `DELETE /{image_id}`.
#[derive(Debug, Default, Deserialize)]
pub struct DeleteParams {
    /// Skip the recycle bin.
    #[serde(default)]
    pub hard: bool,
}

/// Query for `GET /`.
#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    /// Page number, from 1.
    pub page: Option<u32>,
    /// Items per page.
    pub page_size: Option<u32>,
    /// Substring of the description.
    pub keyword: Option<String>,
    /// List the recycle bin.
    #[serde(default)]
    pub deleted: bool,
    /// Restrict to one category.
    pub category_id: Option<i64>,
}

impl ListParams {
    fn into_query(self, tenant_id: i64) -> ImageQuery {
        let defaults = PageRequest::default();
        ImageQuery {
            tenant_id,
            category_id: self.category_id,
            keyword: self.keyword,
            deleted: self.deleted,
            page: PageRequest::new(
                self.page.unwrap_or(defaults.page),
                self.page_size.unwrap_or(defaults.page_size),
            ),
        }
    }
}

/// Reads the upload form: `object` (file), `path`, `description`,
/// `category_id`. Blank text fields count as absent.
async fn read_upload_form(
    tenant_id: i64,
    mut multipart: Multipart,
) -> Result<UploadImageInput, ApiError> {
    let mut data: Option<Bytes> = None;
    let mut path = None;
    let mut description = None;
    let mut category_id = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("invalid multipart body: {e}")))?
    {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };
        let read_err = |e: axum::extract::multipart::MultipartError| {
            ApiError::bad_request(format!("invalid field '{name}': {e}"))
        };

        match name.as_str() {
            "object" => data = Some(field.bytes().await.map_err(read_err)?),
            "path" => path = non_blank(field.text().await.map_err(read_err)?),
            "description" => description = non_blank(field.text().await.map_err(read_err)?),
            "category_id" => {
                if let Some(raw) = non_blank(field.text().await.map_err(read_err)?) {
                    category_id = Some(raw.parse::<i64>().map_err(|_| {
                        ApiError::bad_request(format!("category_id '{raw}' is not an integer"))
                    })?);
                }
            }
            _ => {}
        }
    }

    let data = data.ok_or_else(|| ApiError::bad_request("missing form field 'object'"))?;
    Ok(UploadImageInput {
        tenant_id,
        path,
        description,
        category_id,
        data,
    })
}

fn non_blank(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

// ============================================================================
// Route Handlers
// ============================================================================

/// POST `/img/{tenant_id}/upload`
async fn upload_image(
    State(state): State<AppState>,
    Path(tenant_id): Path<i64>,
    multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let input = read_upload_form(tenant_id, multipart).await?;
    let view = state.images.upload(input).await?;
    Ok((StatusCode::CREATED, Json(view)))
}

/// DELETE `/img/{tenant_id}/{image_id}?hard=`
async fn delete_image(
    State(state): State<AppState>,
    Path((tenant_id, image_id)): Path<(i64, i64)>,
    Query(params): Query<DeleteParams>,
) -> Result<StatusCode, ApiError> {
    state.images.delete(tenant_id, image_id, params.hard).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET `/img/{tenant_id}/`
async fn list_images(
    State(state): State<AppState>,
    Path(tenant_id): Path<i64>,
    Query(params): Query<ListParams>,
) -> Result<impl IntoResponse, ApiError> {
    let page = state.images.list(params.into_query(tenant_id)).await?;
    Ok(Json(page))
}

/// DELETE `/img/{tenant_id}/recycle/{image_id}`
async fn clear_recycled(
    State(state): State<AppState>,
    Path((tenant_id, image_id)): Path<(i64, i64)>,
) -> Result<StatusCode, ApiError> {
    state.images.clear_recycle_bin(tenant_id, image_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// PUT `/img/{tenant_id}/recycle/{image_id}`
async fn restore_recycled(
    State(state): State<AppState>,
    Path((tenant_id, image_id)): Path<(i64, i64)>,
) -> Result<impl IntoResponse, ApiError> {
    let view = state.images.restore_from_recycle_bin(tenant_id, image_id).await?;
    Ok(Json(view))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_list_params_defaults() {
        let query = ListParams::default().into_query(42);

        assert_eq!(query.tenant_id, 42);
        assert_eq!(query.page, PageRequest::default());
        assert!(!query.deleted);
        assert_eq!(query.category_id, None);
        assert_eq!(query.keyword, None);
    }

    #[test]
    fn test_list_params_carry_filters() {
        let params = ListParams {
            page: Some(3),
            page_size: Some(5),
            keyword: Some("Cat".into()),
            deleted: true,
            category_id: Some(9),
        };
        let query = params.into_query(7);

        assert_eq!(query.page, PageRequest::new(3, 5));
        assert_eq!(query.keyword.as_deref(), Some("Cat"));
        assert!(query.deleted);
        assert_eq!(query.category_id, Some(9));
    }

    #[rstest]
    #[case("", None)]
    #[case("   ", None)]
    #[case(" a.jpg ", Some("a.jpg"))]
    fn test_non_blank(#[case] raw: &str, #[case] expected: Option<&str>) {
        assert_eq!(non_blank(raw.to_string()).as_deref(), expected);
    }
}
