//! [`DeleteQueue`] over Redis key expiry.

use std::pin::pin;

use deadpool_redis::{Pool, PoolConfig, Runtime};
use futures::StreamExt;
use pictor_core::image::{DELETE_KEY_PREFIX, DELETE_KEY_TTL, DeleteKey, DeleteQueue, ImageError};
use pictor_shared::config::RedisConfig;
use redis::AsyncCommands;
use redis::aio::PubSub;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::error::QueueError;

/// Buffered expiry events between the subscriber task and the consumer.
const EVENT_BUFFER: usize = 256;

/// Keyspace event class for expired keys.
const EXPIRED_EVENTS: &str = "Ex";

/// Channel Redis publishes expired key names on for database `db`.
#[must_use]
pub fn expired_channel(db: u8) -> String {
    format!("__keyevent@{db}__:expired")
}

/// Delete queue backed by Redis TTLs and expired-key notifications.
#[derive(Clone)]
pub struct RedisDeleteQueue {
    pool: Pool,
    client: redis::Client,
    db: u8,
}

impl RedisDeleteQueue {
    /// Build the pool and pub/sub client without touching the network.
    ///
    /// # Errors
    ///
    /// Returns an error if the Redis URL is invalid.
    pub fn new(config: &RedisConfig) -> Result<Self, QueueError> {
        let url = config.url();

        let mut cfg = deadpool_redis::Config::from_url(url.clone());
        cfg.pool = Some(PoolConfig::new(config.pool_size));
        let pool = cfg
            .create_pool(Some(Runtime::Tokio1))
            .map_err(|e| QueueError::pool(e.to_string()))?;
        let client = redis::Client::open(url)?;

        Ok(Self {
            pool,
            client,
            db: config.db,
        })
    }

    /// Connect using the application Redis settings.
    ///
    /// Verifies the pool can hand out a connection and asks the server to
    /// emit expired-key events. Servers that reject `CONFIG SET` (managed
    /// Redis) must be configured with `notify-keyspace-events Ex` out of band.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid or Redis is unreachable.
    pub async fn connect(config: &RedisConfig) -> Result<Self, QueueError> {
        let queue = Self::new(config)?;
        queue.enable_expiry_events().await?;

        info!(host = %config.host, port = config.port, db = config.db, "Delete queue connected");
        Ok(queue)
    }

    async fn enable_expiry_events(&self) -> Result<(), QueueError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|e| QueueError::pool(e.to_string()))?;

        let result: redis::RedisResult<()> = redis::cmd("CONFIG")
            .arg("SET")
            .arg("notify-keyspace-events")
            .arg(EXPIRED_EVENTS)
            .query_async(&mut conn)
            .await;
        if let Err(e) = result {
            warn!(error = %e, "Could not enable expired-key notifications; relying on server config");
        }
        Ok(())
    }

    async fn conn(&self) -> Result<deadpool_redis::Connection, ImageError> {
        self.pool
            .get()
            .await
            .map_err(|e| ImageError::queue(format!("redis pool: {e}")))
    }
}

impl DeleteQueue for RedisDeleteQueue {
    async fn enqueue(&self, key: DeleteKey) -> Result<(), ImageError> {
        let mut conn = self.conn().await?;
        conn.set_ex::<_, _, ()>(key.to_string(), 1, DELETE_KEY_TTL.as_secs())
            .await
            .map_err(|e| ImageError::queue(format!("enqueue {key}: {e}")))?;
        debug!(%key, "Delete key set");
        Ok(())
    }

    async fn dequeue(&self, key: DeleteKey) -> Result<(), ImageError> {
        let mut conn = self.conn().await?;
        conn.del::<_, ()>(key.to_string())
            .await
            .map_err(|e| ImageError::queue(format!("dequeue {key}: {e}")))?;
        debug!(%key, "Delete key removed");
        Ok(())
    }

    async fn subscribe(&self) -> Result<mpsc::Receiver<DeleteKey>, ImageError> {
        let channel = expired_channel(self.db);
        let mut pubsub = self
            .client
            .get_async_pubsub()
            .await
            .map_err(|e| ImageError::queue(format!("pubsub connect: {e}")))?;
        pubsub
            .psubscribe(&channel)
            .await
            .map_err(|e| ImageError::queue(format!("psubscribe {channel}: {e}")))?;

        info!(%channel, "Subscribed to expired keys");

        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        tokio::spawn(forward_expired(pubsub, tx));
        Ok(rx)
    }
}

/// Pumps expired key names into `tx` until the subscription drops or the
/// receiver goes away.
async fn forward_expired(pubsub: PubSub, tx: mpsc::Sender<DeleteKey>) {
    let mut messages = pin!(pubsub.into_on_message());

    loop {
        tokio::select! {
            () = tx.closed() => break,
            msg = messages.next() => {
                let Some(msg) = msg else {
                    warn!("Expired-key subscription closed");
                    break;
                };
                let raw: String = match msg.get_payload() {
                    Ok(raw) => raw,
                    Err(e) => {
                        warn!(error = %e, "Unreadable expiry payload");
                        continue;
                    }
                };
                let Some(key) = parse_expired(&raw) else {
                    continue;
                };
                if tx.send(key).await.is_err() {
                    break;
                }
            }
        }
    }

    debug!("Expiry forwarder stopped");
}

/// Maps an expired key name to a delete key.
///
/// Keys outside the delete namespace belong to other users of the database
/// and are ignored silently; malformed keys inside it are logged.
fn parse_expired(raw: &str) -> Option<DeleteKey> {
    if !raw.starts_with(DELETE_KEY_PREFIX) {
        return None;
    }
    match raw.parse() {
        Ok(key) => Some(key),
        Err(e) => {
            warn!(key = raw, error = %e, "Ignoring malformed delete key");
            None
        }
    }
}
