//! Error responses.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use pictor_core::image::ImageError;
use pictor_shared::AppError;
use serde_json::json;
use tracing::{error, warn};

/// Handler error rendered as `{"error": CODE, "message": text}`.
#[derive(Debug)]
pub struct ApiError(pub AppError);

impl ApiError {
    /// Client error for malformed input the service never saw.
    #[must_use]
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self(AppError::Validation(msg.into()))
    }
}

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        Self(err)
    }
}

impl From<ImageError> for ApiError {
    fn from(err: ImageError) -> Self {
        Self(err.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        if status.is_server_error() {
            error!(error = %self.0, "Request failed");
        } else {
            warn!(error = %self.0, "Request rejected");
        }

        (
            status,
            Json(json!({
                "error": self.0.error_code(),
                "message": self.0.public_message(),
            })),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;
    use rstest::rstest;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("body")
            .to_bytes();
        serde_json::from_slice(&bytes).expect("json")
    }

    #[rstest]
    #[case(ImageError::image_not_found(1, 2), StatusCode::NOT_FOUND, "NOT_FOUND")]
    #[case(ImageError::path_exists("a.jpg"), StatusCode::CONFLICT, "ALREADY_EXISTS")]
    #[case(ImageError::illegal("no"), StatusCode::UNPROCESSABLE_ENTITY, "ILLEGAL_OPERATION")]
    #[case(ImageError::validation("bad"), StatusCode::BAD_REQUEST, "VALIDATION_ERROR")]
    #[case(ImageError::compression("decode"), StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR")]
    #[tokio::test]
    async fn test_image_error_status(
        #[case] err: ImageError,
        #[case] status: StatusCode,
        #[case] code: &str,
    ) {
        let response = ApiError::from(err).into_response();
        assert_eq!(response.status(), status);

        let body = body_json(response).await;
        assert_eq!(body["error"], code);
    }

    #[tokio::test]
    async fn test_internal_detail_is_not_leaked() {
        let response = ApiError::from(ImageError::repository("connection refused at 10.0.0.5"))
            .into_response();

        let body = body_json(response).await;
        assert_eq!(body["message"], "An internal error occurred");
    }

    #[tokio::test]
    async fn test_bad_request_keeps_message() {
        let response = ApiError::bad_request("missing field 'object'").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = body_json(response).await;
        assert_eq!(body["message"], "missing field 'object'");
    }
}
