//! Delayed purge queue seam.

use std::fmt;
use std::future::Future;
use std::str::FromStr;
use std::time::Duration;

use tokio::sync::mpsc;

use super::error::ImageError;

/// Prefix shared by every delete key.
pub const DELETE_KEY_PREFIX: &str = "img:delete:";

/// Time a recycled image waits before automatic purge (7 days).
pub const DELETE_KEY_TTL: Duration = Duration::from_secs(604_800);

/// Queue entry for one recycled image, rendered as
/// `img:delete:<tenant_id>:<image_id>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeleteKey {
    /// Owning tenant.
    pub tenant_id: i64,
    /// Recycled image.
    pub image_id: i64,
}

impl DeleteKey {
    /// Creates a key.
    #[must_use]
    pub const fn new(tenant_id: i64, image_id: i64) -> Self {
        Self {
            tenant_id,
            image_id,
        }
    }
}

impl fmt::Display for DeleteKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{DELETE_KEY_PREFIX}{}:{}", self.tenant_id, self.image_id)
    }
}

impl FromStr for DeleteKey {
    type Err = ImageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ImageError::queue(format!("malformed delete key '{s}'"));

        let rest = s.strip_prefix(DELETE_KEY_PREFIX).ok_or_else(invalid)?;
        let (tenant, image) = rest.split_once(':').ok_or_else(invalid)?;
        Ok(Self {
            tenant_id: tenant.parse().map_err(|_| invalid())?,
            image_id: image.parse().map_err(|_| invalid())?,
        })
    }
}

/// Keyed delayed-action channel backing automatic recycle-bin purges.
pub trait DeleteQueue: Send + Sync + 'static {
    /// Set the key with [`DELETE_KEY_TTL`].
    fn enqueue(&self, key: DeleteKey) -> impl Future<Output = Result<(), ImageError>> + Send;

    /// Remove the key. Removing an absent key succeeds.
    fn dequeue(&self, key: DeleteKey) -> impl Future<Output = Result<(), ImageError>> + Send;

    /// Stream of keys whose TTL elapsed.
    ///
    /// Delivery is at least once. The stream ends when the backing
    /// subscription is lost or the receiver is dropped.
    fn subscribe(
        &self,
    ) -> impl Future<Output = Result<mpsc::Receiver<DeleteKey>, ImageError>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rstest::rstest;

    #[test]
    fn test_key_shape() {
        assert_eq!(DeleteKey::new(42, 7).to_string(), "img:delete:42:7");
    }

    #[rstest]
    #[case("img:delete:42")]
    #[case("img:delete:42:")]
    #[case("img:delete:x:7")]
    #[case("img:delete:42:7:9")]
    #[case("session:42:7")]
    #[case("")]
    fn test_rejects_malformed_keys(#[case] raw: &str) {
        assert!(raw.parse::<DeleteKey>().is_err());
    }

    proptest! {
        #[test]
        fn test_parse_inverts_display(tenant_id in any::<i64>(), image_id in any::<i64>()) {
            let key = DeleteKey::new(tenant_id, image_id);
            prop_assert_eq!(key.to_string().parse::<DeleteKey>().ok(), Some(key));
        }
    }
}
