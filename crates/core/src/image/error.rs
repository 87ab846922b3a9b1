//! Image library error types.

use pictor_shared::AppError;
use thiserror::Error;

use crate::crypto::CryptoError;
use crate::storage::StorageError;

/// Image library errors.
#[derive(Debug, Error)]
pub enum ImageError {
    /// Image, category or R2 config absent.
    #[error("{0} not found")]
    NotFound(String),

    /// Path or category title collision.
    #[error("{0} already exists")]
    AlreadyExists(String),

    /// Operation not allowed in the current state.
    #[error("illegal operation: {0}")]
    IllegalOperation(String),

    /// Invalid input.
    #[error("validation failed: {0}")]
    Validation(String),

    /// Object-store failure.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// Secret encryption or decryption failure.
    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),

    /// JPEG recompression failure.
    #[error("compression failed: {0}")]
    Compression(String),

    /// Metadata repository failure.
    #[error("repository error: {0}")]
    Repository(String),

    /// Delete queue failure.
    #[error("delete queue error: {0}")]
    Queue(String),
}

impl ImageError {
    /// Image row absent for the tenant.
    #[must_use]
    pub fn image_not_found(tenant_id: i64, image_id: i64) -> Self {
        Self::NotFound(format!("image {image_id} of tenant {tenant_id}"))
    }

    /// Category row absent for the tenant.
    #[must_use]
    pub fn category_not_found(tenant_id: i64, category_id: i64) -> Self {
        Self::NotFound(format!("category {category_id} of tenant {tenant_id}"))
    }

    /// Tenant has no R2 configuration.
    #[must_use]
    pub fn config_not_found(tenant_id: i64) -> Self {
        Self::NotFound(format!("R2 config of tenant {tenant_id}"))
    }

    /// Path already taken by a live or recycled image.
    #[must_use]
    pub fn path_exists(path: &str) -> Self {
        Self::AlreadyExists(format!("image path '{path}'"))
    }

    /// Category title already taken.
    #[must_use]
    pub fn title_exists(title: &str) -> Self {
        Self::AlreadyExists(format!("category title '{title}'"))
    }

    /// Create an illegal operation error.
    #[must_use]
    pub fn illegal(msg: impl Into<String>) -> Self {
        Self::IllegalOperation(msg.into())
    }

    /// Create a validation error.
    #[must_use]
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a compression error.
    #[must_use]
    pub fn compression(msg: impl Into<String>) -> Self {
        Self::Compression(msg.into())
    }

    /// Create a repository error.
    #[must_use]
    pub fn repository(msg: impl Into<String>) -> Self {
        Self::Repository(msg.into())
    }

    /// Create a queue error.
    #[must_use]
    pub fn queue(msg: impl Into<String>) -> Self {
        Self::Queue(msg.into())
    }
}

impl From<ImageError> for AppError {
    fn from(err: ImageError) -> Self {
        match err {
            ImageError::NotFound(_) => Self::NotFound(err.to_string()),
            ImageError::AlreadyExists(_) => Self::AlreadyExists(err.to_string()),
            ImageError::IllegalOperation(msg) => Self::IllegalOperation(msg),
            ImageError::Validation(msg) => Self::Validation(msg),
            ImageError::Storage(e @ (StorageError::NotConfigured { .. } | StorageError::NotFound { .. })) => {
                Self::NotFound(e.to_string())
            }
            ImageError::Storage(_)
            | ImageError::Crypto(_)
            | ImageError::Compression(_)
            | ImageError::Repository(_)
            | ImageError::Queue(_) => Self::Internal(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(ImageError::image_not_found(42, 7), 404)]
    #[case(ImageError::path_exists("a.png"), 409)]
    #[case(ImageError::illegal("image is in the recycle bin"), 422)]
    #[case(ImageError::validation("page_size must be between 5 and 50"), 400)]
    #[case(ImageError::Storage(StorageError::NotConfigured { tenant_id: 42 }), 404)]
    #[case(ImageError::Storage(StorageError::operation("timeout")), 500)]
    #[case(ImageError::Crypto(CryptoError::Decrypt("tag mismatch".into())), 500)]
    #[case(ImageError::compression("unsupported format"), 500)]
    #[case(ImageError::queue("connection refused"), 500)]
    fn test_maps_to_app_error_status(#[case] err: ImageError, #[case] status: u16) {
        assert_eq!(AppError::from(err).status_code(), status);
    }

    #[test]
    fn test_messages_carry_context() {
        assert_eq!(
            ImageError::image_not_found(42, 7).to_string(),
            "image 7 of tenant 42 not found"
        );
        assert_eq!(
            ImageError::path_exists("hero/a.png").to_string(),
            "image path 'hero/a.png' already exists"
        );
    }
}
