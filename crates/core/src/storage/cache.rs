//! Per-tenant client bundle cache using Moka.
//!
//! Bundles are loaded lazily, at most once concurrently per tenant, and
//! expire after an idle period that every successful access extends.
//!
//! Every tenant carries a generation that [`ClientCache::invalidate`] bumps.
//! A bundle remembers the generation current when its load started, so a
//! load that was already in flight during an invalidation is discarded on
//! its first hit instead of being served.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use moka::future::Cache;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::bundle::Bundle;
use super::error::StorageError;

/// Sliding time-to-live for a cached bundle (1 hour).
pub const DEFAULT_BUNDLE_TTL: Duration = Duration::from_secs(3600);

/// Period of the background eviction sweep (10 minutes).
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(600);

#[derive(Clone)]
struct CachedBundle {
    generation: u64,
    bundle: Arc<Bundle>,
}

/// Cache of tenant bundles.
///
/// Concurrent callers for the same tenant share one in-flight load and all
/// observe its result. Failed loads are not retained.
#[derive(Clone)]
pub struct ClientCache {
    cache: Cache<i64, CachedBundle>,
    generations: Arc<Mutex<HashMap<i64, u64>>>,
}

impl ClientCache {
    /// Creates a cache with the default 1 hour sliding TTL.
    #[must_use]
    pub fn new() -> Self {
        Self::with_ttl(DEFAULT_BUNDLE_TTL)
    }

    /// Creates a cache with a custom sliding TTL.
    #[must_use]
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            cache: Cache::builder().time_to_idle(ttl).build(),
            generations: Arc::default(),
        }
    }

    /// Returns the tenant's bundle, calling `load` if none is cached or the
    /// cached one predates the last invalidation.
    ///
    /// `load` must read the tenant's configuration when called, not before.
    pub async fn get_or_load<L, F>(&self, tenant_id: i64, load: L) -> Result<Arc<Bundle>, StorageError>
    where
        L: Fn() -> F,
        F: Future<Output = Result<Bundle, StorageError>>,
    {
        loop {
            let generation = self.generation(tenant_id);
            let cached = self
                .cache
                .try_get_with(tenant_id, async {
                    debug!(tenant_id, generation, "loading object-store bundle");
                    load().await.map(|bundle| CachedBundle {
                        generation,
                        bundle: Arc::new(bundle),
                    })
                })
                .await
                .map_err(|e| (*e).clone())?;

            if cached.generation >= self.generation(tenant_id) {
                return Ok(cached.bundle);
            }
            debug!(tenant_id, stale = cached.generation, "discarding bundle loaded before invalidation");
            self.cache.invalidate(&tenant_id).await;
        }
    }

    /// Drops the tenant's bundle, including one whose load is in flight.
    pub async fn invalidate(&self, tenant_id: i64) {
        {
            let mut generations = self.generations.lock().unwrap_or_else(PoisonError::into_inner);
            *generations.entry(tenant_id).or_default() += 1;
        }
        self.cache.invalidate(&tenant_id).await;
    }

    fn generation(&self, tenant_id: i64) -> u64 {
        self.generations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&tenant_id)
            .copied()
            .unwrap_or_default()
    }

    /// Evicts expired bundles now.
    pub async fn sweep(&self) {
        self.cache.run_pending_tasks().await;
    }

    /// Returns the number of cached bundles.
    #[must_use]
    pub fn entry_count(&self) -> u64 {
        self.cache.entry_count()
    }

    /// Spawns the periodic eviction sweep until `shutdown` is cancelled.
    pub fn spawn_sweeper(&self, interval: Duration, shutdown: CancellationToken) -> JoinHandle<()> {
        let cache = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await;
            loop {
                tokio::select! {
                    () = shutdown.cancelled() => break,
                    _ = ticker.tick() => {
                        cache.sweep().await;
                        debug!(entries = cache.entry_count(), "client cache swept");
                    }
                }
            }
        })
    }
}

impl Default for ClientCache {
    fn default() -> Self {
        Self::new()
    }
}
