use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "items")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String, // UUID
    pub catalog_id: String,
    pub name: String,
    pub description: String,
    pub image_url: Option<String>,
    pub user_fields: String, // JSON object, arbitrary user-defined metadata
    pub created_at: String,
    pub updated_at: String,
}

impl Model {
    pub fn field_map(&self) -> HashMap<String, String> {
        serde_json::from_str(&self.user_fields).unwrap_or_default()
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::catalog::Entity",
        from = "Column::CatalogId",
        to = "super::catalog::Column::Id",
        on_update = "Cascade",
        on_delete = "Cascade"
    )]
    Catalog,
    #[sea_orm(has_many = "super::item_status::Entity")]
    ItemStatus,
}

impl Related<super::catalog::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Catalog.def()
    }
}

impl Related<super::item_status::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ItemStatus.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
