//! Per-tenant bundle of bucket operators.

use std::fmt;
use std::time::Duration;

use opendal::Operator;

use super::error::StorageError;

/// Content type of every stored object; uploads are recompressed to JPEG.
pub const OBJECT_CONTENT_TYPE: &str = "image/jpeg";

/// Decrypted, fully-constructed object-store clients for one tenant.
///
/// Holds one operator per bucket. Each operator both executes requests and
/// signs URLs, so the public and presign clients are the same value.
#[derive(Clone)]
pub struct Bundle {
    public: Operator,
    tombstones: Operator,
    public_bucket: String,
    delete_bucket: String,
    public_url_prefix: String,
}

impl fmt::Debug for Bundle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bundle")
            .field("public_bucket", &self.public_bucket)
            .field("delete_bucket", &self.delete_bucket)
            .field("public_url_prefix", &self.public_url_prefix)
            .finish_non_exhaustive()
    }
}

impl Bundle {
    /// Creates a bundle from already-built operators.
    #[must_use]
    pub fn new(
        public: Operator,
        tombstones: Operator,
        public_bucket: impl Into<String>,
        delete_bucket: impl Into<String>,
        public_url_prefix: impl Into<String>,
    ) -> Self {
        Self {
            public,
            tombstones,
            public_bucket: public_bucket.into(),
            delete_bucket: delete_bucket.into(),
            public_url_prefix: public_url_prefix.into(),
        }
    }

    /// Name of the bucket serving live images.
    #[must_use]
    pub fn public_bucket(&self) -> &str {
        &self.public_bucket
    }

    /// Name of the private bucket holding tombstones.
    #[must_use]
    pub fn delete_bucket(&self) -> &str {
        &self.delete_bucket
    }

    /// Public URL prefix for live images.
    #[must_use]
    pub fn public_url_prefix(&self) -> &str {
        &self.public_url_prefix
    }

    /// Writes a live object.
    pub async fn put_public(&self, path: &str, data: Vec<u8>) -> Result<(), StorageError> {
        self.public
            .write_with(path, data)
            .content_type(OBJECT_CONTENT_TYPE)
            .await
            .map(|_| ())
            .map_err(|e| StorageError::from(e).context("put", &self.public_bucket, path))
    }

    /// Copies `publicBucket/path` to `deleteBucket/path`.
    pub async fn copy_to_tombstone(&self, path: &str) -> Result<(), StorageError> {
        copy_between(
            (&self.public, &self.public_bucket),
            (&self.tombstones, &self.delete_bucket),
            path,
        )
        .await
    }

    /// Copies `deleteBucket/path` back to `publicBucket/path`.
    pub async fn copy_to_public(&self, path: &str) -> Result<(), StorageError> {
        copy_between(
            (&self.tombstones, &self.delete_bucket),
            (&self.public, &self.public_bucket),
            path,
        )
        .await
    }

    /// Deletes a live object. Deleting a missing object succeeds.
    pub async fn delete_public(&self, path: &str) -> Result<(), StorageError> {
        self.public
            .delete(path)
            .await
            .map_err(|e| StorageError::from(e).context("delete", &self.public_bucket, path))
    }

    /// Deletes a tombstone. Deleting a missing object succeeds.
    pub async fn delete_tombstone(&self, path: &str) -> Result<(), StorageError> {
        self.tombstones
            .delete(path)
            .await
            .map_err(|e| StorageError::from(e).context("delete", &self.delete_bucket, path))
    }

    /// Signs a short-lived GET against the delete bucket.
    pub async fn presign_tombstone(&self, path: &str, ttl: Duration) -> Result<String, StorageError> {
        let presigned = self
            .tombstones
            .presign_read(path, ttl)
            .await
            .map_err(StorageError::from)?;
        Ok(presigned.uri().to_string())
    }

    /// Checks whether a live object exists.
    pub async fn public_exists(&self, path: &str) -> Result<bool, StorageError> {
        self.public.exists(path).await.map_err(StorageError::from)
    }

    /// Checks whether a tombstone exists.
    pub async fn tombstone_exists(&self, path: &str) -> Result<bool, StorageError> {
        self.tombstones.exists(path).await.map_err(StorageError::from)
    }
}

/// OpenDAL copies only within one bucket, so cross-bucket copies stream
/// through memory.
async fn copy_between(
    (from, from_bucket): (&Operator, &str),
    (to, to_bucket): (&Operator, &str),
    path: &str,
) -> Result<(), StorageError> {
    let data = from
        .read(path)
        .await
        .map_err(|e| StorageError::from(e).context("read", from_bucket, path))?;

    to.write_with(path, data)
        .content_type(OBJECT_CONTENT_TYPE)
        .await
        .map(|_| ())
        .map_err(|e| StorageError::from(e).context("write", to_bucket, path))
}

/// Joins a URL prefix and an object key, percent-encoding each key segment.
#[must_use]
pub fn public_url(prefix: &str, path: &str) -> String {
    let encoded = path
        .split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/");
    format!("{}/{encoded}", prefix.trim_end_matches('/'))
}
