//! Storage error types.

use thiserror::Error;

/// Storage operation errors.
#[derive(Debug, Clone, Error)]
pub enum StorageError {
    /// Tenant has no object-store configuration.
    #[error("R2 storage is not configured for tenant {tenant_id}")]
    NotConfigured {
        /// Tenant without a config row.
        tenant_id: i64,
    },

    /// Object not found in storage.
    #[error("object not found: {key}")]
    NotFound {
        /// Object key that was not found.
        key: String,
    },

    /// Presign operation not supported by provider.
    #[error("presign operation not supported by storage provider")]
    PresignNotSupported,

    /// Credentials could not be loaded or decrypted.
    #[error("storage credentials error: {0}")]
    Credentials(String),

    /// Storage provider configuration error.
    #[error("storage configuration error: {0}")]
    Configuration(String),

    /// OpenDAL operation error.
    #[error("storage operation failed: {0}")]
    Operation(String),
}

impl StorageError {
    /// Create a credentials error.
    #[must_use]
    pub fn credentials(msg: impl Into<String>) -> Self {
        Self::Credentials(msg.into())
    }

    /// Create a configuration error.
    #[must_use]
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Create an operation error.
    #[must_use]
    pub fn operation(msg: impl Into<String>) -> Self {
        Self::Operation(msg.into())
    }

    /// Attaches the bucket and key an operation was working on.
    #[must_use]
    pub fn context(self, action: &str, bucket: &str, key: &str) -> Self {
        match self {
            Self::NotFound { .. } => Self::NotFound {
                key: format!("{bucket}/{key}"),
            },
            Self::Operation(msg) => Self::Operation(format!("{action} {bucket}/{key}: {msg}")),
            other => other,
        }
    }
}

impl From<opendal::Error> for StorageError {
    fn from(err: opendal::Error) -> Self {
        match err.kind() {
            opendal::ErrorKind::NotFound => Self::NotFound {
                key: err.to_string(),
            },
            opendal::ErrorKind::Unsupported => Self::PresignNotSupported,
            _ => Self::Operation(err.to_string()),
        }
    }
}
