use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Provenance link: "user X's copy Y originated from catalog Z".
/// The (user_id, original_catalog_id) pair is unique at the storage layer,
/// which is what makes duplicate saves impossible under concurrency.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "saved_catalogs")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub user_id: String,
    pub original_catalog_id: String,
    pub copied_catalog_id: Option<String>,
    pub saved_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
