//! Image library types and data structures.

use std::fmt;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use pictor_shared::types::PageRequest;
use serde::{Deserialize, Serialize};

use super::error::ImageError;
use crate::storage::public_url;

/// Maximum number of categories per tenant.
pub const MAX_CATEGORIES: u64 = 10;
/// Maximum category title length in characters.
pub const MAX_TITLE_LEN: usize = 10;
/// Maximum category prefix length.
pub const MAX_PREFIX_LEN: usize = 20;
/// Maximum list keyword length in characters.
pub const MAX_KEYWORD_LEN: usize = 20;
/// Mask shown in place of the secret access key.
pub const SECRET_MASK: &str = "********";

/// Lifecycle state of a persisted image.
///
/// The transient purge state has no row and so is never observed here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageState {
    /// Object in the public bucket.
    Live,
    /// Object in the delete bucket, awaiting restore or purge.
    SoftDeleted,
}

/// Image metadata row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image {
    /// Image ID.
    pub id: i64,
    /// Owning tenant.
    pub tenant_id: i64,
    /// Object key, `<prefix>/<name>` when categorized.
    pub path: String,
    /// Optional description.
    pub description: Option<String>,
    /// Optional category.
    pub category_id: Option<i64>,
    /// Created timestamp.
    pub created_at: DateTime<Utc>,
    /// Updated timestamp.
    pub updated_at: DateTime<Utc>,
    /// Set iff the image is in the recycle bin.
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Image {
    /// Returns the lifecycle state derived from `deleted_at`.
    #[must_use]
    pub fn state(&self) -> ImageState {
        if self.deleted_at.is_some() {
            ImageState::SoftDeleted
        } else {
            ImageState::Live
        }
    }

    /// Returns true if the image is in the recycle bin.
    #[must_use]
    pub fn is_deleted(&self) -> bool {
        self.state() == ImageState::SoftDeleted
    }
}

/// Row to insert; the repository prepends the category prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewImage {
    /// Owning tenant.
    pub tenant_id: i64,
    /// Object name without the category prefix.
    pub path: String,
    /// Optional description.
    pub description: Option<String>,
}

/// Input for uploading an image.
#[derive(Debug, Clone)]
pub struct UploadImageInput {
    /// Owning tenant.
    pub tenant_id: i64,
    /// User-chosen file name; generated when absent.
    pub path: Option<String>,
    /// Optional description, at most 60 characters.
    pub description: Option<String>,
    /// Optional category.
    pub category_id: Option<i64>,
    /// Raw upload body.
    pub data: Bytes,
}

/// Filter for listing images.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageQuery {
    /// Tenant to list.
    pub tenant_id: i64,
    /// Restrict to a category.
    pub category_id: Option<i64>,
    /// Case-insensitive substring over the description.
    pub keyword: Option<String>,
    /// List the recycle bin instead of live images.
    pub deleted: bool,
    /// Page window.
    pub page: PageRequest,
}

impl ImageQuery {
    /// Validates paging and keyword length.
    ///
    /// # Errors
    ///
    /// Returns `ImageError::Validation` on the first violated bound.
    pub fn validate(&self) -> Result<(), ImageError> {
        self.page.validate().map_err(ImageError::validation)?;
        if let Some(keyword) = &self.keyword
            && keyword.chars().count() > MAX_KEYWORD_LEN
        {
            return Err(ImageError::validation(format!(
                "keyword must be at most {MAX_KEYWORD_LEN} characters"
            )));
        }
        Ok(())
    }

    /// Keyword with surrounding whitespace removed, `None` when empty.
    #[must_use]
    pub fn normalized_keyword(&self) -> Option<&str> {
        self.keyword
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
    }
}

/// Image as returned to callers.
///
/// Live images carry their public `url`. Recycled images carry no `url`,
/// and their `path` is replaced by a short-lived signed URL when one could
/// be produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageView {
    /// Image ID.
    pub id: i64,
    /// Object key, or a signed URL for recycled images.
    pub path: String,
    /// Public URL of a live image.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Optional description.
    pub description: Option<String>,
    /// Optional category.
    pub category_id: Option<i64>,
    /// Lifecycle state.
    pub state: ImageState,
    /// Created timestamp.
    pub created_at: DateTime<Utc>,
    /// Updated timestamp.
    pub updated_at: DateTime<Utc>,
    /// Soft-delete timestamp.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl ImageView {
    /// View of a live image under the tenant's public URL prefix.
    #[must_use]
    pub fn live(image: Image, public_url_prefix: &str) -> Self {
        let url = Some(public_url(public_url_prefix, &image.path));
        Self::build(image, url, None)
    }

    /// View of a recycled image, optionally with a signed preview URL.
    #[must_use]
    pub fn recycled(image: Image, signed_url: Option<String>) -> Self {
        Self::build(image, None, signed_url)
    }

    fn build(image: Image, url: Option<String>, signed_url: Option<String>) -> Self {
        let state = image.state();
        Self {
            id: image.id,
            path: signed_url.unwrap_or(image.path),
            url,
            description: image.description,
            category_id: image.category_id,
            state,
            created_at: image.created_at,
            updated_at: image.updated_at,
            deleted_at: image.deleted_at,
        }
    }
}

/// Image category; its prefix namespaces object keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Category {
    /// Category ID.
    pub id: i64,
    /// Owning tenant.
    pub tenant_id: i64,
    /// Title, unique per tenant.
    pub title: String,
    /// Key prefix slug.
    pub prefix: String,
    /// Created timestamp.
    pub created_at: DateTime<Utc>,
}

/// Body for creating or updating a category.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CategoryInput {
    /// Title, 1 to 10 characters.
    pub title: String,
    /// Prefix slug of `[A-Za-z0-9_-]`, 1 to 20 characters.
    pub prefix: String,
}

impl CategoryInput {
    /// Validates title and prefix.
    ///
    /// # Errors
    ///
    /// Returns `ImageError::Validation` describing the bad field.
    pub fn validate(&self) -> Result<(), ImageError> {
        let title_len = self.title.trim().chars().count();
        if title_len == 0 || title_len > MAX_TITLE_LEN {
            return Err(ImageError::validation(format!(
                "title must be 1 to {MAX_TITLE_LEN} characters"
            )));
        }
        if !is_slug(&self.prefix, MAX_PREFIX_LEN) {
            return Err(ImageError::validation(format!(
                "prefix must be 1 to {MAX_PREFIX_LEN} characters of [A-Za-z0-9_-]"
            )));
        }
        Ok(())
    }
}

fn is_slug(s: &str, max: usize) -> bool {
    !s.is_empty()
        && s.len() <= max
        && s.bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-')
}

/// Persisted R2 configuration; the secret is ciphertext.
#[derive(Clone, PartialEq, Eq)]
pub struct TenantR2Config {
    /// Owning tenant.
    pub tenant_id: i64,
    /// Cloudflare account ID.
    pub account_id: String,
    /// Access key ID.
    pub access_key_id: String,
    /// Encrypted secret access key.
    pub secret_access_key: String,
    /// Bucket serving live images.
    pub public_bucket: String,
    /// Public URL prefix for live images.
    pub public_url_prefix: String,
    /// Bucket holding tombstones.
    pub delete_bucket: String,
}

impl fmt::Debug for TenantR2Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TenantR2Config")
            .field("tenant_id", &self.tenant_id)
            .field("account_id", &self.account_id)
            .field("access_key_id", &self.access_key_id)
            .field("public_bucket", &self.public_bucket)
            .field("public_url_prefix", &self.public_url_prefix)
            .field("delete_bucket", &self.delete_bucket)
            .finish_non_exhaustive()
    }
}

/// Body of `PUT /configure_r2`.
#[derive(Clone, Deserialize)]
pub struct R2ConfigInput {
    /// Cloudflare account ID.
    pub account_id: String,
    /// Access key ID.
    pub access_key_id: String,
    /// Plaintext secret; empty or absent keeps the stored one.
    #[serde(default)]
    pub secret_access_key: Option<String>,
    /// Bucket serving live images.
    pub public_bucket: String,
    /// Public URL prefix for live images.
    pub public_url_prefix: String,
    /// Bucket holding tombstones.
    pub delete_bucket: String,
}

impl fmt::Debug for R2ConfigInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("R2ConfigInput")
            .field("account_id", &self.account_id)
            .field("access_key_id", &self.access_key_id)
            .field("public_bucket", &self.public_bucket)
            .field("public_url_prefix", &self.public_url_prefix)
            .field("delete_bucket", &self.delete_bucket)
            .finish_non_exhaustive()
    }
}

impl R2ConfigInput {
    /// Checks every non-secret field is present.
    ///
    /// # Errors
    ///
    /// Returns `ImageError::Validation` naming the first empty field.
    pub fn validate(&self) -> Result<(), ImageError> {
        let fields = [
            ("account_id", &self.account_id),
            ("access_key_id", &self.access_key_id),
            ("public_bucket", &self.public_bucket),
            ("public_url_prefix", &self.public_url_prefix),
            ("delete_bucket", &self.delete_bucket),
        ];
        for (name, value) in fields {
            if value.trim().is_empty() {
                return Err(ImageError::validation(format!("{name} is required")));
            }
        }
        Ok(())
    }

    /// Secret to store, `None` when the caller left it empty.
    #[must_use]
    pub fn secret(&self) -> Option<&str> {
        self.secret_access_key
            .as_deref()
            .filter(|s| !s.is_empty())
    }
}

/// Upsert handed to the repository.
///
/// `encrypted_secret: None` leaves the stored secret column untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct R2ConfigUpsert {
    /// Owning tenant.
    pub tenant_id: i64,
    /// Cloudflare account ID.
    pub account_id: String,
    /// Access key ID.
    pub access_key_id: String,
    /// Ciphertext of a new secret.
    pub encrypted_secret: Option<String>,
    /// Bucket serving live images.
    pub public_bucket: String,
    /// Public URL prefix for live images.
    pub public_url_prefix: String,
    /// Bucket holding tombstones.
    pub delete_bucket: String,
}

/// R2 configuration with the secret masked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MaskedR2Config {
    /// Owning tenant.
    pub tenant_id: i64,
    /// Cloudflare account ID.
    pub account_id: String,
    /// Access key ID.
    pub access_key_id: String,
    /// Always [`SECRET_MASK`].
    pub secret_access_key: &'static str,
    /// Bucket serving live images.
    pub public_bucket: String,
    /// Public URL prefix for live images.
    pub public_url_prefix: String,
    /// Bucket holding tombstones.
    pub delete_bucket: String,
}

impl From<TenantR2Config> for MaskedR2Config {
    fn from(config: TenantR2Config) -> Self {
        Self {
            tenant_id: config.tenant_id,
            account_id: config.account_id,
            access_key_id: config.access_key_id,
            secret_access_key: SECRET_MASK,
            public_bucket: config.public_bucket,
            public_url_prefix: config.public_url_prefix,
            delete_bucket: config.delete_bucket,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn image(deleted: bool) -> Image {
        let now = Utc::now();
        Image {
            id: 1,
            tenant_id: 42,
            path: "hero/my banner.jpg".to_string(),
            description: None,
            category_id: Some(7),
            created_at: now,
            updated_at: now,
            deleted_at: deleted.then_some(now),
        }
    }

    #[test]
    fn test_state_follows_deleted_at() {
        assert_eq!(image(false).state(), ImageState::Live);
        assert_eq!(image(true).state(), ImageState::SoftDeleted);
        assert!(image(true).is_deleted());
    }

    #[test]
    fn test_live_view_has_encoded_url() {
        let view = ImageView::live(image(false), "https://cdn.example.com");
        assert_eq!(view.path, "hero/my banner.jpg");
        assert_eq!(
            view.url.as_deref(),
            Some("https://cdn.example.com/hero/my%20banner.jpg")
        );
    }

    #[test]
    fn test_recycled_view_replaces_path_when_signed() {
        let signed = ImageView::recycled(image(true), Some("https://signed".to_string()));
        assert_eq!(signed.path, "https://signed");
        assert!(signed.url.is_none());

        let unsigned = ImageView::recycled(image(true), None);
        assert_eq!(unsigned.path, "hero/my banner.jpg");
    }

    #[rstest]
    #[case("Hero", "hero", true)]
    #[case("Ten chars!", "a_b-C9", true)]
    #[case("", "hero", false)]
    #[case("   ", "hero", false)]
    #[case("Eleven char", "hero", false)]
    #[case("Hero", "", false)]
    #[case("Hero", "with space", false)]
    #[case("Hero", "slash/", false)]
    #[case("Hero", "abcdefghijklmnopqrstu", false)]
    fn test_category_input_validation(
        #[case] title: &str,
        #[case] prefix: &str,
        #[case] valid: bool,
    ) {
        let input = CategoryInput {
            title: title.to_string(),
            prefix: prefix.to_string(),
        };
        assert_eq!(input.validate().is_ok(), valid);
    }

    #[rstest]
    #[case(1, 5, None, true)]
    #[case(1, 50, Some("cat"), true)]
    #[case(1, 4, None, false)]
    #[case(1, 51, None, false)]
    #[case(0, 20, None, false)]
    #[case(1, 20, Some("twenty-one characters"), false)]
    fn test_query_validation(
        #[case] page: u32,
        #[case] page_size: u32,
        #[case] keyword: Option<&str>,
        #[case] valid: bool,
    ) {
        let query = ImageQuery {
            tenant_id: 42,
            category_id: None,
            keyword: keyword.map(str::to_string),
            deleted: false,
            page: PageRequest::new(page, page_size),
        };
        assert_eq!(query.validate().is_ok(), valid);
    }

    #[test]
    fn test_r2_input_secret_and_required_fields() {
        let mut input = R2ConfigInput {
            account_id: "acc".to_string(),
            access_key_id: "AK".to_string(),
            secret_access_key: Some(String::new()),
            public_bucket: "public".to_string(),
            public_url_prefix: "https://cdn".to_string(),
            delete_bucket: "trash".to_string(),
        };
        assert!(input.validate().is_ok());
        assert_eq!(input.secret(), None);

        input.secret_access_key = Some("shh".to_string());
        assert_eq!(input.secret(), Some("shh"));
        assert!(!format!("{input:?}").contains("shh"));

        input.delete_bucket = " ".to_string();
        assert!(input.validate().is_err());
    }

    #[test]
    fn test_masked_config_hides_ciphertext() {
        let masked = MaskedR2Config::from(TenantR2Config {
            tenant_id: 42,
            account_id: "acc".to_string(),
            access_key_id: "AK".to_string(),
            secret_access_key: "ciphertext".to_string(),
            public_bucket: "public".to_string(),
            public_url_prefix: "https://cdn".to_string(),
            delete_bucket: "trash".to_string(),
        });
        assert_eq!(masked.secret_access_key, SECRET_MASK);
    }
}
