//! `SeaORM` Entity for tenant_r2_configs table.

use sea_orm::entity::prelude::*;

/// The secret column holds AES-256-GCM ciphertext, never plaintext.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "tenant_r2_configs")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub tenant_id: i64,
    pub account_id: String,
    pub access_key_id: String,
    pub secret_access_key: String,
    pub public_bucket: String,
    pub public_url_prefix: String,
    pub delete_bucket: String,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
