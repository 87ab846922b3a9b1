//! Tenant-scoped image library with recycle-bin semantics.
//!
//! This module provides business logic for images including:
//! - Upload with JPEG recompression into the tenant's public bucket
//! - Soft delete into the delete bucket, restore and purge
//! - Automatic purge of recycled images when their delete key expires
//! - Categories whose prefix namespaces object keys
//! - Per-tenant R2 configuration with the secret encrypted at rest

mod compress;
mod error;
mod locks;
mod media;
mod queue;
mod repository;
mod service;
mod types;


pub use compress::{JPEG_QUALITY, recompress_jpeg};
pub use error::ImageError;
pub use locks::{ImageLocks, LOCK_SHARDS};
pub use media::{
    MAX_DESCRIPTION_LEN, MAX_PATH_LEN, MediaType, generate_name, sniff, validate_description,
    validate_path, validate_size,
};
pub use queue::{DELETE_KEY_PREFIX, DELETE_KEY_TTL, DeleteKey, DeleteQueue};
pub use repository::ImageRepository;
pub use service::{DEFAULT_MAX_UPLOAD_BYTES, ImageService, PRESIGN_TTL, PurgeOutcome};
pub use types::{
    Category, CategoryInput, Image, ImageQuery, ImageState, ImageView, MAX_CATEGORIES,
    MAX_KEYWORD_LEN, MAX_PREFIX_LEN, MAX_TITLE_LEN, MaskedR2Config, NewImage, R2ConfigInput,
    R2ConfigUpsert, SECRET_MASK, TenantR2Config, UploadImageInput,
};
