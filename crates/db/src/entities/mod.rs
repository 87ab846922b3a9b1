//! `SeaORM` entity definitions.

pub mod image_categories;
pub mod images;
pub mod tenant_r2_configs;
