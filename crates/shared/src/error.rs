//! Application-wide error types.

use thiserror::Error;

/// Result type alias using `AppError`.
pub type AppResult<T> = Result<T, AppError>;

/// Application error types.
#[derive(Debug, Error)]
pub enum AppError {
    /// Access denied.
    #[error("Access denied: {0}")]
    Forbidden(String),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Resource already exists (path or title collision).
    #[error("Already exists: {0}")]
    AlreadyExists(String),

    /// Operation not allowed in the resource's current state.
    #[error("Illegal operation: {0}")]
    IllegalOperation(String),

    /// Validation error.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::Forbidden(_) => 403,
            Self::NotFound(_) => 404,
            Self::AlreadyExists(_) => 409,
            Self::IllegalOperation(_) => 422,
            Self::Validation(_) => 400,
            Self::Internal(_) => 500,
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::Forbidden(_) => "FORBIDDEN",
            Self::NotFound(_) => "NOT_FOUND",
            Self::AlreadyExists(_) => "ALREADY_EXISTS",
            Self::IllegalOperation(_) => "ILLEGAL_OPERATION",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Message safe to return to clients.
    ///
    /// Internal errors carry infrastructure detail and are replaced by a
    /// generic message.
    #[must_use]
    pub fn public_message(&self) -> String {
        match self {
            Self::Internal(_) => "An internal error occurred".to_string(),
            Self::Forbidden(msg)
            | Self::NotFound(msg)
            | Self::AlreadyExists(msg)
            | Self::IllegalOperation(msg)
            | Self::Validation(msg) => msg.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(AppError::Forbidden(String::new()), 403, "FORBIDDEN")]
    #[case(AppError::NotFound(String::new()), 404, "NOT_FOUND")]
    #[case(AppError::AlreadyExists(String::new()), 409, "ALREADY_EXISTS")]
    #[case(AppError::IllegalOperation(String::new()), 422, "ILLEGAL_OPERATION")]
    #[case(AppError::Validation(String::new()), 400, "VALIDATION_ERROR")]
    #[case(AppError::Internal(String::new()), 500, "INTERNAL_ERROR")]
    fn test_status_and_code(#[case] err: AppError, #[case] status: u16, #[case] code: &str) {
        assert_eq!(err.status_code(), status);
        assert_eq!(err.error_code(), code);
    }

    #[test]
    fn test_error_display() {
        assert_eq!(
            AppError::NotFound("image 7".into()).to_string(),
            "Not found: image 7"
        );
        assert_eq!(
            AppError::AlreadyExists("path a.png".into()).to_string(),
            "Already exists: path a.png"
        );
        assert_eq!(
            AppError::IllegalOperation("msg".into()).to_string(),
            "Illegal operation: msg"
        );
    }

    #[test]
    fn test_internal_message_is_hidden() {
        let err = AppError::Internal("s3 endpoint refused connection".into());
        assert_eq!(err.public_message(), "An internal error occurred");

        let err = AppError::Validation("page_size must be in [5, 50]".into());
        assert_eq!(err.public_message(), "page_size must be in [5, 50]");
    }
}
