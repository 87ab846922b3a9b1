//! Persistence seam for images, categories and R2 configs.

use std::future::Future;

use pictor_shared::types::PageResponse;

use super::error::ImageError;
use super::types::{
    Category, CategoryInput, Image, ImageQuery, NewImage, R2ConfigUpsert, TenantR2Config,
};

/// Repository trait for image library persistence.
///
/// This trait is implemented by the db crate to provide actual database operations.
/// Every operation is scoped by tenant.
pub trait ImageRepository: Send + Sync + 'static {
    /// Find an image by ID. Recycled rows are eligible only with `include_deleted`.
    fn find_by_id(
        &self,
        tenant_id: i64,
        image_id: i64,
        include_deleted: bool,
    ) -> impl Future<Output = Result<Option<Image>, ImageError>> + Send;

    /// Check whether a live or recycled image holds `path`.
    fn exist_by_path(
        &self,
        tenant_id: i64,
        path: &str,
    ) -> impl Future<Output = Result<bool, ImageError>> + Send;

    /// Insert an image. With a category, the stored path becomes
    /// `<prefix>/<path>`; a missing category fails with not found.
    fn create(
        &self,
        image: NewImage,
        category_id: Option<i64>,
    ) -> impl Future<Output = Result<Image, ImageError>> + Send;

    /// Remove the row (`hard`) or mark it soft-deleted. Soft deletion only
    /// matches live rows. Fails with not found when nothing matches.
    fn delete(
        &self,
        tenant_id: i64,
        image_id: i64,
        hard: bool,
    ) -> impl Future<Output = Result<(), ImageError>> + Send;

    /// Clear `deleted_at` and refresh `updated_at`.
    fn restore(
        &self,
        tenant_id: i64,
        image_id: i64,
    ) -> impl Future<Output = Result<Image, ImageError>> + Send;

    /// List a page ordered by `updated_at DESC, id DESC`.
    fn list(
        &self,
        query: &ImageQuery,
    ) -> impl Future<Output = Result<PageResponse<Image>, ImageError>> + Send;

    /// Insert a category.
    fn create_category(
        &self,
        tenant_id: i64,
        input: CategoryInput,
    ) -> impl Future<Output = Result<Category, ImageError>> + Send;

    /// Overwrite a category's title and prefix.
    fn update_category(
        &self,
        tenant_id: i64,
        category_id: i64,
        input: CategoryInput,
    ) -> impl Future<Output = Result<Category, ImageError>> + Send;

    /// Delete a category. Fails with not found when nothing matches.
    fn delete_category(
        &self,
        tenant_id: i64,
        category_id: i64,
    ) -> impl Future<Output = Result<(), ImageError>> + Send;

    /// List all categories of a tenant.
    fn list_categories(
        &self,
        tenant_id: i64,
    ) -> impl Future<Output = Result<Vec<Category>, ImageError>> + Send;

    /// Find a category by ID.
    fn find_category_by_id(
        &self,
        tenant_id: i64,
        category_id: i64,
    ) -> impl Future<Output = Result<Option<Category>, ImageError>> + Send;

    /// Find a category by title.
    fn find_category_by_title(
        &self,
        tenant_id: i64,
        title: &str,
    ) -> impl Future<Output = Result<Option<Category>, ImageError>> + Send;

    /// Check whether a title is taken.
    fn category_exist_by_title(
        &self,
        tenant_id: i64,
        title: &str,
    ) -> impl Future<Output = Result<bool, ImageError>> + Send;

    /// Check whether a category exists.
    fn category_exist_by_id(
        &self,
        tenant_id: i64,
        category_id: i64,
    ) -> impl Future<Output = Result<bool, ImageError>> + Send;

    /// Count the tenant's categories.
    fn count_categories(
        &self,
        tenant_id: i64,
    ) -> impl Future<Output = Result<u64, ImageError>> + Send;

    /// Check whether any live or recycled image references the category.
    fn is_category_referenced(
        &self,
        tenant_id: i64,
        category_id: i64,
    ) -> impl Future<Output = Result<bool, ImageError>> + Send;

    /// Load the tenant's R2 config.
    fn get_r2_config(
        &self,
        tenant_id: i64,
    ) -> impl Future<Output = Result<Option<TenantR2Config>, ImageError>> + Send;

    /// Upsert by tenant. A `None` secret is excluded from the update.
    fn set_r2_config(
        &self,
        config: R2ConfigUpsert,
    ) -> impl Future<Output = Result<(), ImageError>> + Send;

    /// Check whether the tenant has an R2 config.
    fn r2_config_exists(
        &self,
        tenant_id: i64,
    ) -> impl Future<Output = Result<bool, ImageError>> + Send;
}
