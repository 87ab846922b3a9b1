//! Image library repository for database operations.
//!
//! Implements images, categories and tenant R2 configs using SeaORM.

use chrono::Utc;
use sea_orm::sea_query::{Expr, Func, LikeExpr, OnConflict};
use sea_orm::{
    ActiveModelTrait, ActiveValue::NotSet, ColumnTrait, DatabaseConnection, DbErr, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, SqlErr,
    prelude::DateTimeWithTimeZone,
};
use tracing::debug;

use crate::entities::{image_categories, images, tenant_r2_configs};
use pictor_core::image::{
    Category, CategoryInput, Image, ImageError, ImageQuery, ImageRepository as ImageRepoTrait,
    NewImage, R2ConfigUpsert, TenantR2Config,
};
use pictor_shared::types::PageResponse;

/// Image library repository implementation.
#[derive(Debug, Clone)]
pub struct ImageRepository {
    db: DatabaseConnection,
}

impl ImageRepository {
    /// Create a new image repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    async fn find_category(
        &self,
        tenant_id: i64,
        category_id: i64,
    ) -> Result<Option<image_categories::Model>, ImageError> {
        image_categories::Entity::find_by_id(category_id)
            .filter(image_categories::Column::TenantId.eq(tenant_id))
            .one(&self.db)
            .await
            .map_err(repo_err)
    }
}

impl ImageRepoTrait for ImageRepository {
    async fn find_by_id(
        &self,
        tenant_id: i64,
        image_id: i64,
        include_deleted: bool,
    ) -> Result<Option<Image>, ImageError> {
        let mut select = images::Entity::find_by_id(image_id)
            .filter(images::Column::TenantId.eq(tenant_id));
        if !include_deleted {
            select = select.filter(images::Column::DeletedAt.is_null());
        }

        let model = select.one(&self.db).await.map_err(repo_err)?;
        Ok(model.map(to_image))
    }

    async fn exist_by_path(&self, tenant_id: i64, path: &str) -> Result<bool, ImageError> {
        // Recycled rows included: they keep their path slot.
        let count = images::Entity::find()
            .filter(images::Column::TenantId.eq(tenant_id))
            .filter(images::Column::Path.eq(path))
            .count(&self.db)
            .await
            .map_err(repo_err)?;

        Ok(count > 0)
    }

    async fn create(&self, image: NewImage, category_id: Option<i64>) -> Result<Image, ImageError> {
        let path = match category_id {
            Some(id) => {
                let category = self
                    .find_category(image.tenant_id, id)
                    .await?
                    .ok_or_else(|| ImageError::category_not_found(image.tenant_id, id))?;
                format!("{}/{}", category.prefix, image.path)
            }
            None => image.path,
        };

        let now: DateTimeWithTimeZone = Utc::now().into();
        let active_model = images::ActiveModel {
            id: NotSet,
            tenant_id: Set(image.tenant_id),
            path: Set(path.clone()),
            description: Set(image.description),
            category_id: Set(category_id),
            created_at: Set(now),
            updated_at: Set(now),
            deleted_at: Set(None),
        };

        let model = active_model.insert(&self.db).await.map_err(|e| {
            if is_unique_violation(&e) {
                ImageError::path_exists(&path)
            } else {
                repo_err(e)
            }
        })?;

        Ok(to_image(model))
    }

    async fn delete(&self, tenant_id: i64, image_id: i64, hard: bool) -> Result<(), ImageError> {
        let rows_affected = if hard {
            images::Entity::delete_many()
                .filter(images::Column::Id.eq(image_id))
                .filter(images::Column::TenantId.eq(tenant_id))
                .exec(&self.db)
                .await
                .map_err(repo_err)?
                .rows_affected
        } else {
            let now: DateTimeWithTimeZone = Utc::now().into();
            images::Entity::update_many()
                .col_expr(images::Column::DeletedAt, Expr::value(now))
                .filter(images::Column::Id.eq(image_id))
                .filter(images::Column::TenantId.eq(tenant_id))
                .filter(images::Column::DeletedAt.is_null())
                .exec(&self.db)
                .await
                .map_err(repo_err)?
                .rows_affected
        };

        if rows_affected == 0 {
            return Err(ImageError::image_not_found(tenant_id, image_id));
        }
        debug!(tenant_id, image_id, hard, "image row deleted");
        Ok(())
    }

    async fn restore(&self, tenant_id: i64, image_id: i64) -> Result<Image, ImageError> {
        let model = images::Entity::find_by_id(image_id)
            .filter(images::Column::TenantId.eq(tenant_id))
            .one(&self.db)
            .await
            .map_err(repo_err)?
            .ok_or_else(|| ImageError::image_not_found(tenant_id, image_id))?;

        let mut active_model: images::ActiveModel = model.into();
        active_model.deleted_at = Set(None);
        active_model.updated_at = Set(Utc::now().into());

        let model = active_model.update(&self.db).await.map_err(repo_err)?;
        Ok(to_image(model))
    }

    async fn list(&self, query: &ImageQuery) -> Result<PageResponse<Image>, ImageError> {
        let mut select = images::Entity::find().filter(images::Column::TenantId.eq(query.tenant_id));

        select = if query.deleted {
            select.filter(images::Column::DeletedAt.is_not_null())
        } else {
            select.filter(images::Column::DeletedAt.is_null())
        };
        if let Some(category_id) = query.category_id {
            select = select.filter(images::Column::CategoryId.eq(category_id));
        }
        if let Some(keyword) = query.normalized_keyword() {
            let pattern = format!("%{}%", escape_like(&keyword.to_lowercase()));
            select = select.filter(
                Expr::expr(Func::lower(Expr::col(images::Column::Description)))
                    .like(LikeExpr::new(pattern).escape('\\')),
            );
        }

        let total = select.clone().count(&self.db).await.map_err(repo_err)?;
        let models = select
            .order_by_desc(images::Column::UpdatedAt)
            .order_by_desc(images::Column::Id)
            .offset(query.page.offset())
            .limit(query.page.limit())
            .all(&self.db)
            .await
            .map_err(repo_err)?;

        Ok(PageResponse::new(
            models.into_iter().map(to_image).collect(),
            total,
        ))
    }

    async fn create_category(
        &self,
        tenant_id: i64,
        input: CategoryInput,
    ) -> Result<Category, ImageError> {
        let active_model = image_categories::ActiveModel {
            id: NotSet,
            tenant_id: Set(tenant_id),
            title: Set(input.title.clone()),
            prefix: Set(input.prefix),
            created_at: Set(Utc::now().into()),
        };

        let model = active_model.insert(&self.db).await.map_err(|e| {
            if is_unique_violation(&e) {
                ImageError::title_exists(&input.title)
            } else {
                repo_err(e)
            }
        })?;

        Ok(to_category(model))
    }

    async fn update_category(
        &self,
        tenant_id: i64,
        category_id: i64,
        input: CategoryInput,
    ) -> Result<Category, ImageError> {
        let model = self
            .find_category(tenant_id, category_id)
            .await?
            .ok_or_else(|| ImageError::category_not_found(tenant_id, category_id))?;

        let mut active_model: image_categories::ActiveModel = model.into();
        active_model.title = Set(input.title.clone());
        active_model.prefix = Set(input.prefix);

        let model = active_model.update(&self.db).await.map_err(|e| {
            if is_unique_violation(&e) {
                ImageError::title_exists(&input.title)
            } else {
                repo_err(e)
            }
        })?;

        Ok(to_category(model))
    }

    async fn delete_category(&self, tenant_id: i64, category_id: i64) -> Result<(), ImageError> {
        let result = image_categories::Entity::delete_many()
            .filter(image_categories::Column::Id.eq(category_id))
            .filter(image_categories::Column::TenantId.eq(tenant_id))
            .exec(&self.db)
            .await
            .map_err(|e| {
                if matches!(e.sql_err(), Some(SqlErr::ForeignKeyConstraintViolation(_))) {
                    ImageError::illegal("category cannot be deleted while images reference it")
                } else {
                    repo_err(e)
                }
            })?;

        if result.rows_affected == 0 {
            return Err(ImageError::category_not_found(tenant_id, category_id));
        }
        Ok(())
    }

    async fn list_categories(&self, tenant_id: i64) -> Result<Vec<Category>, ImageError> {
        let models = image_categories::Entity::find()
            .filter(image_categories::Column::TenantId.eq(tenant_id))
            .order_by_asc(image_categories::Column::Id)
            .all(&self.db)
            .await
            .map_err(repo_err)?;

        Ok(models.into_iter().map(to_category).collect())
    }

    async fn find_category_by_id(
        &self,
        tenant_id: i64,
        category_id: i64,
    ) -> Result<Option<Category>, ImageError> {
        Ok(self
            .find_category(tenant_id, category_id)
            .await?
            .map(to_category))
    }

    async fn find_category_by_title(
        &self,
        tenant_id: i64,
        title: &str,
    ) -> Result<Option<Category>, ImageError> {
        let model = image_categories::Entity::find()
            .filter(image_categories::Column::TenantId.eq(tenant_id))
            .filter(image_categories::Column::Title.eq(title))
            .one(&self.db)
            .await
            .map_err(repo_err)?;

        Ok(model.map(to_category))
    }

    async fn category_exist_by_title(&self, tenant_id: i64, title: &str) -> Result<bool, ImageError> {
        let count = image_categories::Entity::find()
            .filter(image_categories::Column::TenantId.eq(tenant_id))
            .filter(image_categories::Column::Title.eq(title))
            .count(&self.db)
            .await
            .map_err(repo_err)?;

        Ok(count > 0)
    }

    async fn category_exist_by_id(
        &self,
        tenant_id: i64,
        category_id: i64,
    ) -> Result<bool, ImageError> {
        let count = image_categories::Entity::find_by_id(category_id)
            .filter(image_categories::Column::TenantId.eq(tenant_id))
            .count(&self.db)
            .await
            .map_err(repo_err)?;

        Ok(count > 0)
    }

    async fn count_categories(&self, tenant_id: i64) -> Result<u64, ImageError> {
        image_categories::Entity::find()
            .filter(image_categories::Column::TenantId.eq(tenant_id))
            .count(&self.db)
            .await
            .map_err(repo_err)
    }

    async fn is_category_referenced(
        &self,
        tenant_id: i64,
        category_id: i64,
    ) -> Result<bool, ImageError> {
        let count = images::Entity::find()
            .filter(images::Column::TenantId.eq(tenant_id))
            .filter(images::Column::CategoryId.eq(category_id))
            .count(&self.db)
            .await
            .map_err(repo_err)?;

        Ok(count > 0)
    }

    async fn get_r2_config(&self, tenant_id: i64) -> Result<Option<TenantR2Config>, ImageError> {
        let model = tenant_r2_configs::Entity::find_by_id(tenant_id)
            .one(&self.db)
            .await
            .map_err(repo_err)?;

        Ok(model.map(to_r2_config))
    }

    async fn set_r2_config(&self, config: R2ConfigUpsert) -> Result<(), ImageError> {
        use tenant_r2_configs::Column;

        let now: DateTimeWithTimeZone = Utc::now().into();
        let mut update_columns = vec![
            Column::AccountId,
            Column::AccessKeyId,
            Column::PublicBucket,
            Column::PublicUrlPrefix,
            Column::DeleteBucket,
            Column::UpdatedAt,
        ];
        let secret = match config.encrypted_secret {
            Some(secret) => {
                update_columns.push(Column::SecretAccessKey);
                Set(secret)
            }
            None => NotSet,
        };

        let active_model = tenant_r2_configs::ActiveModel {
            tenant_id: Set(config.tenant_id),
            account_id: Set(config.account_id),
            access_key_id: Set(config.access_key_id),
            secret_access_key: secret,
            public_bucket: Set(config.public_bucket),
            public_url_prefix: Set(config.public_url_prefix),
            delete_bucket: Set(config.delete_bucket),
            created_at: Set(now),
            updated_at: Set(now),
        };

        tenant_r2_configs::Entity::insert(active_model)
            .on_conflict(
                OnConflict::column(Column::TenantId)
                    .update_columns(update_columns)
                    .to_owned(),
            )
            .exec(&self.db)
            .await
            .map_err(repo_err)?;

        Ok(())
    }

    async fn r2_config_exists(&self, tenant_id: i64) -> Result<bool, ImageError> {
        let count = tenant_r2_configs::Entity::find_by_id(tenant_id)
            .count(&self.db)
            .await
            .map_err(repo_err)?;

        Ok(count > 0)
    }
}

fn repo_err(e: DbErr) -> ImageError {
    ImageError::repository(e.to_string())
}

fn is_unique_violation(e: &DbErr) -> bool {
    matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

/// Escapes `LIKE` wildcards so the keyword matches literally.
fn escape_like(keyword: &str) -> String {
    let mut escaped = String::with_capacity(keyword.len());
    for c in keyword.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Convert database model to domain model.
fn to_image(model: images::Model) -> Image {
    Image {
        id: model.id,
        tenant_id: model.tenant_id,
        path: model.path,
        description: model.description,
        category_id: model.category_id,
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
        deleted_at: model.deleted_at.map(|t| t.with_timezone(&Utc)),
    }
}

fn to_category(model: image_categories::Model) -> Category {
    Category {
        id: model.id,
        tenant_id: model.tenant_id,
        title: model.title,
        prefix: model.prefix,
        created_at: model.created_at.with_timezone(&Utc),
    }
}

fn to_r2_config(model: tenant_r2_configs::Model) -> TenantR2Config {
    TenantR2Config {
        tenant_id: model.tenant_id,
        account_id: model.account_id,
        access_key_id: model.access_key_id,
        secret_access_key: model.secret_access_key,
        public_bucket: model.public_bucket,
        public_url_prefix: model.public_url_prefix,
        delete_bucket: model.delete_bucket,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("logo", "logo")]
    #[case("50%", "50\\%")]
    #[case("a_b", "a\\_b")]
    #[case("c:\\tmp", "c:\\\\tmp")]
    fn test_escape_like(#[case] raw: &str, #[case] escaped: &str) {
        assert_eq!(escape_like(raw), escaped);
    }
}
