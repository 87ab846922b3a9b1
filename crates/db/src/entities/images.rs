//! `SeaORM` Entity for images table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "images")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub tenant_id: i64,
    pub path: String,
    pub description: Option<String>,
    pub category_id: Option<i64>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
    pub deleted_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::image_categories::Entity",
        from = "Column::CategoryId",
        to = "super::image_categories::Column::Id",
        on_update = "NoAction",
        on_delete = "Restrict"
    )]
    ImageCategories,
}

impl Related<super::image_categories::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ImageCategories.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
