//! Tenant-scoped object storage using Apache OpenDAL.
//!
//! Each tenant brings its own Cloudflare R2 credentials. A [`Bundle`] holds
//! the operators for the tenant's public bucket (live images) and delete
//! bucket (tombstones); [`ClientCache`] keeps bundles warm per tenant.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │ ClientCache  tenant_id -> Arc<Bundle>  (1h sliding, 10m sweep)│
//! ├──────────────────────────────────────────────────────────────┤
//! │ ClientFactory::build(R2Credentials) -> Bundle                 │
//! │   R2ClientFactory      https://<account>.r2.cloudflarestorage │
//! │   MemoryClientFactory  in-process buckets                     │
//! ├──────────────────────────────────────────────────────────────┤
//! │ Bundle: put / copy across buckets / delete / presign_read     │
//! └──────────────────────────────────────────────────────────────┘
//! ```

mod bundle;
mod cache;
mod error;
mod factory;

pub use bundle::{Bundle, OBJECT_CONTENT_TYPE, public_url};
pub use cache::{ClientCache, DEFAULT_BUNDLE_TTL, DEFAULT_SWEEP_INTERVAL};
pub use error::StorageError;
pub use factory::{ClientFactory, MemoryClientFactory, R2ClientFactory, R2Credentials, R2_REGION};
