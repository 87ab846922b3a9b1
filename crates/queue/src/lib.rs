//! Redis-backed delete queue.
//!
//! Recycled images are scheduled for purge by setting
//! `img:delete:<tenant_id>:<image_id>` with a 7 day TTL. Redis publishes the
//! key on `__keyevent@<db>__:expired` when it expires, which requires
//! `notify-keyspace-events` to include `Ex`.
//!
//! Commands go through a deadpool-redis pool; the expiry subscription holds
//! its own pub/sub connection.

mod error;
mod redis_queue;

pub use error::QueueError;
pub use redis_queue::{RedisDeleteQueue, expired_channel};
