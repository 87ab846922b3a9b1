//! Per-image mutation locks.

use std::hash::{DefaultHasher, Hash, Hasher};

use tokio::sync::{Mutex, MutexGuard};

/// Number of lock shards.
pub const LOCK_SHARDS: usize = 256;

/// Fixed-size lock table keyed by hash of `(tenant_id, image_id)`.
///
/// Mutations of one image are totally ordered. Distinct images may share a
/// shard and then serialize too; the table never grows.
#[derive(Debug)]
pub struct ImageLocks {
    shards: Box<[Mutex<()>]>,
}

impl ImageLocks {
    /// Creates a table of [`LOCK_SHARDS`] locks.
    #[must_use]
    pub fn new() -> Self {
        Self {
            shards: (0..LOCK_SHARDS).map(|_| Mutex::new(())).collect(),
        }
    }

    /// Waits for exclusive access to one image.
    pub async fn lock(&self, tenant_id: i64, image_id: i64) -> MutexGuard<'_, ()> {
        self.shards[Self::shard(tenant_id, image_id)].lock().await
    }

    fn shard(tenant_id: i64, image_id: i64) -> usize {
        let mut hasher = DefaultHasher::new();
        (tenant_id, image_id).hash(&mut hasher);
        // Truncation is fine, only the low bits select the shard.
        #[allow(clippy::cast_possible_truncation)]
        let hash = hasher.finish() as usize;
        hash % LOCK_SHARDS
    }
}

impl Default for ImageLocks {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[test]
    fn test_shard_is_stable_and_in_range() {
        for image_id in 0..1_000 {
            let shard = ImageLocks::shard(42, image_id);
            assert!(shard < LOCK_SHARDS);
            assert_eq!(shard, ImageLocks::shard(42, image_id));
        }
    }

    #[tokio::test]
    async fn test_same_image_is_serialized() {
        let locks = Arc::new(ImageLocks::new());
        let inside = Arc::new(AtomicUsize::new(0));
        let max_inside = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let locks = Arc::clone(&locks);
            let inside = Arc::clone(&inside);
            let max_inside = Arc::clone(&max_inside);
            handles.push(tokio::spawn(async move {
                let _guard = locks.lock(42, 7).await;
                let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
                max_inside.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(5)).await;
                inside.fetch_sub(1, Ordering::SeqCst);
            }));
        }
        for handle in handles {
            handle.await.expect("join");
        }

        assert_eq!(max_inside.load(Ordering::SeqCst), 1);
    }
}
