//! Image library orchestration.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::StreamExt;
use pictor_shared::types::PageResponse;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::compress::recompress_jpeg;
use super::error::ImageError;
use super::locks::ImageLocks;
use super::media::{generate_name, sniff, validate_description, validate_path, validate_size};
use super::queue::{DeleteKey, DeleteQueue};
use super::repository::ImageRepository;
use super::types::{
    Category, CategoryInput, Image, ImageQuery, ImageView, MAX_CATEGORIES, NewImage,
    R2ConfigInput, R2ConfigUpsert, TenantR2Config, UploadImageInput,
};
use crate::crypto::SecretCipher;
use crate::storage::{Bundle, ClientCache, ClientFactory, R2Credentials, StorageError};

/// Lifetime of recycle-bin preview URLs.
pub const PRESIGN_TTL: Duration = Duration::from_secs(60);

/// Default upload size limit (10 MiB).
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Concurrent presign requests per listed page.
const PRESIGN_CONCURRENCY: usize = 8;

/// Delay before resubscribing after the delete queue stream ends.
const RESUBSCRIBE_DELAY: Duration = Duration::from_secs(5);

/// Result of processing one expired delete key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PurgeOutcome {
    /// Tombstone and row removed.
    Purged,
    /// No row left; an earlier delivery or a manual purge handled it.
    Missing,
    /// Image was restored after the key was set; left untouched.
    StillLive,
}

/// Image library service.
///
/// Mutations of one image (delete, restore, recycle-bin purge) are
/// serialized through a per-image lock. Uploads, listings and category
/// operations are not.
pub struct ImageService<R, Q, F> {
    repo: Arc<R>,
    queue: Arc<Q>,
    factory: Arc<F>,
    cipher: Arc<SecretCipher>,
    clients: ClientCache,
    locks: ImageLocks,
    max_upload_bytes: usize,
}

impl<R, Q, F> ImageService<R, Q, F>
where
    R: ImageRepository,
    Q: DeleteQueue,
    F: ClientFactory,
{
    /// Create a new image service.
    #[must_use]
    pub fn new(repo: Arc<R>, queue: Arc<Q>, factory: Arc<F>, cipher: Arc<SecretCipher>) -> Self {
        Self {
            repo,
            queue,
            factory,
            cipher,
            clients: ClientCache::new(),
            locks: ImageLocks::new(),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }

    /// Overrides the upload size limit.
    #[must_use]
    pub fn with_max_upload_bytes(mut self, max_upload_bytes: usize) -> Self {
        self.max_upload_bytes = max_upload_bytes;
        self
    }

    /// Spawns the periodic client cache sweep.
    pub fn spawn_cache_sweeper(&self, interval: Duration, shutdown: CancellationToken) -> JoinHandle<()> {
        self.clients.spawn_sweeper(interval, shutdown)
    }

    /// Upload an image.
    ///
    /// The body is recompressed to JPEG, the row is inserted, then the object
    /// is written to the public bucket. If the object cannot be written the
    /// row is removed again.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The body is empty, too large or not a supported image
    /// - The path or description is invalid
    /// - The category does not exist
    /// - The path is taken by a live or recycled image
    /// - Recompression, the repository or the object store fails
    pub async fn upload(&self, input: UploadImageInput) -> Result<ImageView, ImageError> {
        let tenant_id = input.tenant_id;

        validate_size(input.data.len(), self.max_upload_bytes)?;
        let media = sniff(&input.data)?;
        if let Some(path) = &input.path {
            validate_path(path)?;
        }
        let description = input.description.filter(|d| !d.trim().is_empty());
        if let Some(description) = &description {
            validate_description(description)?;
        }

        let data = input.data;
        let compressed = tokio::task::spawn_blocking(move || recompress_jpeg(&data))
            .await
            .map_err(|e| ImageError::compression(e.to_string()))??;

        let name = input
            .path
            .unwrap_or_else(|| generate_name(Utc::now(), media));
        let effective_path = match input.category_id {
            Some(category_id) => {
                let category = self
                    .repo
                    .find_category_by_id(tenant_id, category_id)
                    .await?
                    .ok_or_else(|| ImageError::category_not_found(tenant_id, category_id))?;
                format!("{}/{name}", category.prefix)
            }
            None => name.clone(),
        };

        if self.repo.exist_by_path(tenant_id, &effective_path).await? {
            return Err(ImageError::path_exists(&effective_path));
        }

        let image = self
            .repo
            .create(
                NewImage {
                    tenant_id,
                    path: name,
                    description,
                },
                input.category_id,
            )
            .await?;

        let bundle = match self.bundle(tenant_id).await {
            Ok(bundle) => bundle,
            Err(e) => {
                self.rollback_upload(&image).await;
                return Err(e);
            }
        };
        if let Err(e) = bundle.put_public(&image.path, compressed).await {
            self.rollback_upload(&image).await;
            return Err(e.into());
        }

        info!(
            tenant_id,
            image_id = image.id,
            path = %image.path,
            bucket = bundle.public_bucket(),
            "image uploaded"
        );
        Ok(ImageView::live(image, bundle.public_url_prefix()))
    }

    async fn rollback_upload(&self, image: &Image) {
        if let Err(e) = self.repo.delete(image.tenant_id, image.id, true).await {
            error!(
                tenant_id = image.tenant_id,
                image_id = image.id,
                path = %image.path,
                error = %e,
                "failed to roll back image row after upload failure"
            );
        }
    }

    /// Delete a live image.
    ///
    /// A hard delete removes the object and the row. A soft delete moves the
    /// object to the delete bucket, marks the row and schedules the purge.
    ///
    /// # Errors
    ///
    /// Returns an error if the image does not exist, is already in the
    /// recycle bin, or the object store or repository fails.
    pub async fn delete(&self, tenant_id: i64, image_id: i64, hard: bool) -> Result<(), ImageError> {
        let _guard = self.locks.lock(tenant_id, image_id).await;

        let image = self.find_image(tenant_id, image_id).await?;
        if image.is_deleted() {
            return Err(ImageError::illegal("image is already in the recycle bin"));
        }
        let bundle = self.bundle(tenant_id).await?;

        if hard {
            bundle.delete_public(&image.path).await?;
            self.repo.delete(tenant_id, image_id, true).await?;
            info!(tenant_id, image_id, path = %image.path, "image deleted");
            return Ok(());
        }

        bundle.copy_to_tombstone(&image.path).await?;
        bundle.delete_public(&image.path).await?;
        self.repo.delete(tenant_id, image_id, false).await?;

        if let Err(e) = self.queue.enqueue(DeleteKey::new(tenant_id, image_id)).await {
            warn!(tenant_id, image_id, error = %e, "failed to schedule recycle-bin purge");
        }
        info!(
            tenant_id,
            image_id,
            path = %image.path,
            bucket = bundle.delete_bucket(),
            "image moved to recycle bin"
        );
        Ok(())
    }

    /// Permanently remove an image from the recycle bin.
    ///
    /// # Errors
    ///
    /// Returns an error if the image does not exist, is not in the recycle
    /// bin, or the object store or repository fails.
    pub async fn clear_recycle_bin(&self, tenant_id: i64, image_id: i64) -> Result<(), ImageError> {
        let _guard = self.locks.lock(tenant_id, image_id).await;

        let image = self.find_image(tenant_id, image_id).await?;
        if !image.is_deleted() {
            return Err(ImageError::illegal("image is not in the recycle bin"));
        }
        let bundle = self.bundle(tenant_id).await?;

        bundle.delete_tombstone(&image.path).await?;
        self.repo.delete(tenant_id, image_id, true).await?;
        self.dequeue(DeleteKey::new(tenant_id, image_id)).await;

        info!(tenant_id, image_id, path = %image.path, "image purged from recycle bin");
        Ok(())
    }

    /// Move an image from the recycle bin back to the public bucket.
    ///
    /// # Errors
    ///
    /// Returns an error if the image does not exist, is not in the recycle
    /// bin, or the object store or repository fails.
    pub async fn restore_from_recycle_bin(
        &self,
        tenant_id: i64,
        image_id: i64,
    ) -> Result<ImageView, ImageError> {
        let _guard = self.locks.lock(tenant_id, image_id).await;

        let image = self.find_image(tenant_id, image_id).await?;
        if !image.is_deleted() {
            return Err(ImageError::illegal("image is not in the recycle bin"));
        }
        let bundle = self.bundle(tenant_id).await?;

        bundle.copy_to_public(&image.path).await?;
        bundle.delete_tombstone(&image.path).await?;
        let restored = self.repo.restore(tenant_id, image_id).await?;
        self.dequeue(DeleteKey::new(tenant_id, image_id)).await;

        info!(tenant_id, image_id, path = %restored.path, "image restored");
        Ok(ImageView::live(restored, bundle.public_url_prefix()))
    }

    /// List live images, or the recycle bin with signed preview URLs.
    ///
    /// # Errors
    ///
    /// Returns an error if the query is invalid, the tenant has no R2 config
    /// or the repository fails. Individual presign failures are not errors.
    pub async fn list(&self, query: ImageQuery) -> Result<PageResponse<ImageView>, ImageError> {
        query.validate()?;

        let page = self.repo.list(&query).await?;
        if page.items.is_empty() {
            return Ok(PageResponse::new(Vec::new(), page.total));
        }
        let bundle = self.bundle(query.tenant_id).await?;

        if !query.deleted {
            return Ok(page.map(|image| ImageView::live(image, bundle.public_url_prefix())));
        }

        let total = page.total;
        let bundle = &bundle;
        let items = futures::stream::iter(page.items)
            .map(|image| async move {
                let signed = match bundle.presign_tombstone(&image.path, PRESIGN_TTL).await {
                    Ok(url) => Some(url),
                    Err(e) => {
                        warn!(
                            tenant_id = image.tenant_id,
                            image_id = image.id,
                            error = %e,
                            "failed to presign recycle-bin preview"
                        );
                        None
                    }
                };
                ImageView::recycled(image, signed)
            })
            .buffered(PRESIGN_CONCURRENCY)
            .collect::<Vec<_>>()
            .await;

        Ok(PageResponse::new(items, total))
    }

    /// Create a category.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is invalid, the title is taken or the
    /// tenant already has the maximum number of categories.
    pub async fn create_category(
        &self,
        tenant_id: i64,
        input: CategoryInput,
    ) -> Result<Category, ImageError> {
        let input = normalize_category(input);
        input.validate()?;

        if self.repo.category_exist_by_title(tenant_id, &input.title).await? {
            return Err(ImageError::title_exists(&input.title));
        }
        if self.repo.count_categories(tenant_id).await? >= MAX_CATEGORIES {
            return Err(ImageError::validation(format!(
                "a tenant can hold at most {MAX_CATEGORIES} categories"
            )));
        }

        let category = self.repo.create_category(tenant_id, input).await?;
        info!(tenant_id, category_id = category.id, prefix = %category.prefix, "category created");
        Ok(category)
    }

    /// Update a category's title and prefix.
    ///
    /// # Errors
    ///
    /// Returns an error if the category does not exist, the title belongs
    /// to another category, or the prefix changes while any live or
    /// recycled image references the category.
    pub async fn update_category(
        &self,
        tenant_id: i64,
        category_id: i64,
        input: CategoryInput,
    ) -> Result<Category, ImageError> {
        let input = normalize_category(input);
        input.validate()?;

        let current = self
            .repo
            .find_category_by_id(tenant_id, category_id)
            .await?
            .ok_or_else(|| ImageError::category_not_found(tenant_id, category_id))?;

        if let Some(other) = self.repo.find_category_by_title(tenant_id, &input.title).await?
            && other.id != category_id
        {
            return Err(ImageError::title_exists(&input.title));
        }
        if current.prefix != input.prefix
            && self.repo.is_category_referenced(tenant_id, category_id).await?
        {
            return Err(ImageError::illegal(
                "category prefix cannot change while images reference it",
            ));
        }

        self.repo.update_category(tenant_id, category_id, input).await
    }

    /// Delete an unreferenced category.
    ///
    /// # Errors
    ///
    /// Returns an error if the category does not exist or any live or
    /// recycled image references it.
    pub async fn delete_category(&self, tenant_id: i64, category_id: i64) -> Result<(), ImageError> {
        if !self.repo.category_exist_by_id(tenant_id, category_id).await? {
            return Err(ImageError::category_not_found(tenant_id, category_id));
        }
        if self.repo.is_category_referenced(tenant_id, category_id).await? {
            return Err(ImageError::illegal(
                "category cannot be deleted while images reference it",
            ));
        }
        self.repo.delete_category(tenant_id, category_id).await?;
        info!(tenant_id, category_id, "category deleted");
        Ok(())
    }

    /// List the tenant's categories.
    ///
    /// # Errors
    ///
    /// Returns an error if the repository fails.
    pub async fn list_categories(&self, tenant_id: i64) -> Result<Vec<Category>, ImageError> {
        self.repo.list_categories(tenant_id).await
    }

    /// Upsert the tenant's R2 config and drop its cached clients.
    ///
    /// An empty secret keeps the stored one, which requires an existing
    /// config.
    ///
    /// # Errors
    ///
    /// Returns an error if a field is missing, the first config has no
    /// secret, encryption fails or the repository fails.
    pub async fn set_r2_config(&self, tenant_id: i64, input: R2ConfigInput) -> Result<(), ImageError> {
        input.validate()?;

        let encrypted_secret = match input.secret() {
            Some(secret) => Some(self.cipher.encrypt(secret)?),
            None => {
                if !self.repo.r2_config_exists(tenant_id).await? {
                    return Err(ImageError::validation(
                        "secret_access_key is required for the first R2 configuration",
                    ));
                }
                None
            }
        };

        self.repo
            .set_r2_config(R2ConfigUpsert {
                tenant_id,
                account_id: input.account_id,
                access_key_id: input.access_key_id,
                encrypted_secret,
                public_bucket: input.public_bucket,
                public_url_prefix: input.public_url_prefix,
                delete_bucket: input.delete_bucket,
            })
            .await?;

        self.clients.invalidate(tenant_id).await;
        info!(tenant_id, "R2 config updated");
        Ok(())
    }

    /// The persisted R2 config, secret still encrypted.
    ///
    /// # Errors
    ///
    /// Returns an error if the tenant has no config or the repository fails.
    pub async fn get_r2_config(&self, tenant_id: i64) -> Result<TenantR2Config, ImageError> {
        self.repo
            .get_r2_config(tenant_id)
            .await?
            .ok_or_else(|| ImageError::config_not_found(tenant_id))
    }

    /// Purge one recycled image whose delete key expired.
    ///
    /// Safe to repeat: a second delivery finds no row.
    ///
    /// # Errors
    ///
    /// Returns an error if the repository or object store fails.
    pub async fn purge_expired(&self, key: DeleteKey) -> Result<PurgeOutcome, ImageError> {
        let DeleteKey {
            tenant_id,
            image_id,
        } = key;
        let _guard = self.locks.lock(tenant_id, image_id).await;

        let Some(image) = self.repo.find_by_id(tenant_id, image_id, true).await? else {
            return Ok(PurgeOutcome::Missing);
        };
        if !image.is_deleted() {
            return Ok(PurgeOutcome::StillLive);
        }
        let bundle = self.bundle(tenant_id).await?;

        // Object first, so a tombstone never outlives its row.
        bundle.delete_tombstone(&image.path).await?;
        match self.repo.delete(tenant_id, image_id, true).await {
            Ok(()) => Ok(PurgeOutcome::Purged),
            Err(ImageError::NotFound(_)) => Ok(PurgeOutcome::Missing),
            Err(e) => Err(e),
        }
    }

    /// Consume expired delete keys until `shutdown` is cancelled.
    ///
    /// Per-key failures are logged and the loop continues. A lost
    /// subscription is re-established after a short delay.
    pub async fn listen_delete_queue(&self, shutdown: CancellationToken) {
        info!("delete queue consumer started");
        while !shutdown.is_cancelled() {
            match self.queue.subscribe().await {
                Ok(mut keys) => loop {
                    tokio::select! {
                        () = shutdown.cancelled() => break,
                        key = keys.recv() => {
                            let Some(key) = key else {
                                warn!("delete queue subscription closed");
                                break;
                            };
                            self.handle_expired(key).await;
                        }
                    }
                },
                Err(e) => error!(error = %e, "failed to subscribe to delete queue"),
            }

            tokio::select! {
                () = shutdown.cancelled() => {}
                () = tokio::time::sleep(RESUBSCRIBE_DELAY) => {}
            }
        }
        info!("delete queue consumer stopped");
    }

    async fn handle_expired(&self, key: DeleteKey) {
        let DeleteKey {
            tenant_id,
            image_id,
        } = key;
        match self.purge_expired(key).await {
            Ok(PurgeOutcome::Purged) => info!(tenant_id, image_id, "expired image purged"),
            Ok(PurgeOutcome::Missing) => {
                debug!(tenant_id, image_id, "expired image already gone");
            }
            Ok(PurgeOutcome::StillLive) => {
                warn!(tenant_id, image_id, "expired key for a live image, skipped");
            }
            Err(e) => error!(tenant_id, image_id, error = %e, "failed to purge expired image"),
        }
    }

    async fn find_image(&self, tenant_id: i64, image_id: i64) -> Result<Image, ImageError> {
        self.repo
            .find_by_id(tenant_id, image_id, true)
            .await?
            .ok_or_else(|| ImageError::image_not_found(tenant_id, image_id))
    }

    async fn dequeue(&self, key: DeleteKey) {
        if let Err(e) = self.queue.dequeue(key).await {
            warn!(
                tenant_id = key.tenant_id,
                image_id = key.image_id,
                error = %e,
                "failed to cancel recycle-bin purge"
            );
        }
    }

    /// Loads the tenant's bundle through the cache.
    async fn bundle(&self, tenant_id: i64) -> Result<Arc<Bundle>, ImageError> {
        Ok(self
            .clients
            .get_or_load(tenant_id, || self.load_bundle(tenant_id))
            .await?)
    }

    async fn load_bundle(&self, tenant_id: i64) -> Result<Bundle, StorageError> {
        let config = self
            .repo
            .get_r2_config(tenant_id)
            .await
            .map_err(|e| StorageError::credentials(e.to_string()))?
            .ok_or(StorageError::NotConfigured { tenant_id })?;
        let secret_access_key = self
            .cipher
            .decrypt(&config.secret_access_key)
            .map_err(|e| StorageError::credentials(e.to_string()))?;

        self.factory.build(&R2Credentials {
            account_id: config.account_id,
            access_key_id: config.access_key_id,
            secret_access_key,
            public_bucket: config.public_bucket,
            delete_bucket: config.delete_bucket,
            public_url_prefix: config.public_url_prefix,
        })
    }
}

fn normalize_category(input: CategoryInput) -> CategoryInput {
    CategoryInput {
        title: input.title.trim().to_string(),
        prefix: input.prefix,
    }
}
