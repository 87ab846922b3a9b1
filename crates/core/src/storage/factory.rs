//! Construction of per-tenant bundles from decrypted credentials.

use std::collections::HashMap;
use std::fmt;
use std::sync::Mutex;

use opendal::{Operator, services};

use super::bundle::Bundle;
use super::error::StorageError;

/// Region string R2 expects from S3 clients.
pub const R2_REGION: &str = "auto";

/// Decrypted credentials for one tenant.
#[derive(Clone)]
pub struct R2Credentials {
    /// Cloudflare account ID.
    pub account_id: String,
    /// Access key ID.
    pub access_key_id: String,
    /// Plaintext secret access key.
    pub secret_access_key: String,
    /// Bucket serving live images.
    pub public_bucket: String,
    /// Bucket holding tombstones.
    pub delete_bucket: String,
    /// Public URL prefix for live images.
    pub public_url_prefix: String,
}

impl fmt::Debug for R2Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("R2Credentials")
            .field("account_id", &self.account_id)
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .field("public_bucket", &self.public_bucket)
            .field("delete_bucket", &self.delete_bucket)
            .field("public_url_prefix", &self.public_url_prefix)
            .finish()
    }
}

impl R2Credentials {
    /// S3-compatible endpoint for the account.
    #[must_use]
    pub fn endpoint(&self) -> String {
        format!("https://{}.r2.cloudflarestorage.com", self.account_id)
    }
}

/// Builds a [`Bundle`] from decrypted credentials.
pub trait ClientFactory: Send + Sync + 'static {
    /// Builds both bucket operators for a tenant.
    fn build(&self, credentials: &R2Credentials) -> Result<Bundle, StorageError>;
}

/// Cloudflare R2 over the S3 protocol, path-style addressing.
#[derive(Debug, Clone, Copy, Default)]
pub struct R2ClientFactory;

impl R2ClientFactory {
    fn operator(credentials: &R2Credentials, bucket: &str) -> Result<Operator, StorageError> {
        let builder = services::S3::default()
            .root("/")
            .endpoint(&credentials.endpoint())
            .region(R2_REGION)
            .bucket(bucket)
            .access_key_id(&credentials.access_key_id)
            .secret_access_key(&credentials.secret_access_key)
            .disable_config_load()
            .disable_ec2_metadata();

        Ok(Operator::new(builder)
            .map_err(|e| StorageError::configuration(e.to_string()))?
            .finish())
    }
}

impl ClientFactory for R2ClientFactory {
    fn build(&self, credentials: &R2Credentials) -> Result<Bundle, StorageError> {
        Ok(Bundle::new(
            Self::operator(credentials, &credentials.public_bucket)?,
            Self::operator(credentials, &credentials.delete_bucket)?,
            &credentials.public_bucket,
            &credentials.delete_bucket,
            &credentials.public_url_prefix,
        ))
    }
}

/// In-process buckets for local development and tests.
///
/// Buckets are keyed by name and survive bundle rebuilds, so invalidating a
/// tenant's cached bundle does not lose objects. Every build records the
/// access key it was given.
#[derive(Debug, Default)]
pub struct MemoryClientFactory {
    buckets: Mutex<HashMap<String, Operator>>,
    access_keys: Mutex<Vec<String>>,
}

impl MemoryClientFactory {
    /// Creates an empty factory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the operator for a bucket, creating it on first use.
    pub fn bucket(&self, name: &str) -> Result<Operator, StorageError> {
        let mut buckets = self
            .buckets
            .lock()
            .map_err(|_| StorageError::configuration("bucket registry poisoned"))?;

        if let Some(op) = buckets.get(name) {
            return Ok(op.clone());
        }

        let op = Operator::new(services::Memory::default())
            .map_err(|e| StorageError::configuration(e.to_string()))?
            .finish();
        buckets.insert(name.to_string(), op.clone());
        Ok(op)
    }

    /// Access key IDs seen by [`ClientFactory::build`], in call order.
    #[must_use]
    pub fn access_keys(&self) -> Vec<String> {
        self.access_keys
            .lock()
            .map(|keys| keys.clone())
            .unwrap_or_default()
    }
}

impl ClientFactory for MemoryClientFactory {
    fn build(&self, credentials: &R2Credentials) -> Result<Bundle, StorageError> {
        if let Ok(mut keys) = self.access_keys.lock() {
            keys.push(credentials.access_key_id.clone());
        }

        Ok(Bundle::new(
            self.bucket(&credentials.public_bucket)?,
            self.bucket(&credentials.delete_bucket)?,
            &credentials.public_bucket,
            &credentials.delete_bucket,
            &credentials.public_url_prefix,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn credentials() -> R2Credentials {
        R2Credentials {
            account_id: "acc123".to_string(),
            access_key_id: "AKIA1".to_string(),
            secret_access_key: "shh".to_string(),
            public_bucket: "public".to_string(),
            delete_bucket: "trash".to_string(),
            public_url_prefix: "https://cdn.example.com".to_string(),
        }
    }

    #[test]
    fn test_endpoint_template() {
        assert_eq!(
            credentials().endpoint(),
            "https://acc123.r2.cloudflarestorage.com"
        );
    }

    #[test]
    fn test_debug_redacts_secret() {
        let rendered = format!("{:?}", credentials());
        assert!(!rendered.contains("shh"));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn test_r2_factory_builds_bundle() {
        let bundle = R2ClientFactory.build(&credentials()).expect("should build");
        assert_eq!(bundle.public_bucket(), "public");
        assert_eq!(bundle.delete_bucket(), "trash");
    }

    #[tokio::test]
    async fn test_memory_buckets_survive_rebuild() {
        let factory = MemoryClientFactory::new();
        let first = factory.build(&credentials()).expect("build");
        first.put_public("a.jpg", vec![1]).await.expect("put");

        let mut rotated = credentials();
        rotated.access_key_id = "AKIA2".to_string();
        let second = factory.build(&rotated).expect("rebuild");

        assert!(second.public_exists("a.jpg").await.expect("stat"));
        assert_eq!(factory.access_keys(), vec!["AKIA1", "AKIA2"]);
    }
}
