//! Image library schema.
//!
//! Creates categories, images and per-tenant R2 configuration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(IMAGE_LIBRARY_SQL).await?;
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(
            "DROP TABLE IF EXISTS images CASCADE;
             DROP TABLE IF EXISTS image_categories CASCADE;
             DROP TABLE IF EXISTS tenant_r2_configs CASCADE;",
        )
        .await?;
        Ok(())
    }
}

const IMAGE_LIBRARY_SQL: &str = r"
-- Categories namespace object keys with their prefix
CREATE TABLE image_categories (
    id BIGSERIAL PRIMARY KEY,
    tenant_id BIGINT NOT NULL,
    title VARCHAR(10) NOT NULL,
    prefix VARCHAR(20) NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT uq_image_categories_title UNIQUE (tenant_id, title),
    CONSTRAINT chk_image_categories_prefix CHECK (prefix ~ '^[A-Za-z0-9_-]+$')
);

CREATE INDEX idx_image_categories_tenant ON image_categories(tenant_id);

-- Images, live and in the recycle bin (deleted_at set)
CREATE TABLE images (
    id BIGSERIAL PRIMARY KEY,
    tenant_id BIGINT NOT NULL,
    path VARCHAR(255) NOT NULL,
    description VARCHAR(60),
    category_id BIGINT REFERENCES image_categories(id) ON DELETE RESTRICT,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    deleted_at TIMESTAMPTZ,
    -- Recycled rows keep their path slot
    CONSTRAINT uq_images_path UNIQUE (tenant_id, path)
);

-- Listing live images
CREATE INDEX idx_images_live ON images(tenant_id, updated_at DESC, id DESC)
    WHERE deleted_at IS NULL;

-- Listing the recycle bin
CREATE INDEX idx_images_recycled ON images(tenant_id, updated_at DESC, id DESC)
    WHERE deleted_at IS NOT NULL;

-- Category reference checks
CREATE INDEX idx_images_category ON images(tenant_id, category_id);

-- Per-tenant object store credentials, secret encrypted
CREATE TABLE tenant_r2_configs (
    tenant_id BIGINT PRIMARY KEY,
    account_id VARCHAR(64) NOT NULL,
    access_key_id VARCHAR(128) NOT NULL,
    secret_access_key TEXT NOT NULL,
    public_bucket VARCHAR(63) NOT NULL,
    public_url_prefix VARCHAR(255) NOT NULL,
    delete_bucket VARCHAR(63) NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
);
";
