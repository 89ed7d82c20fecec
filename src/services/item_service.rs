//! Item store and per-user ownership state.

use sea_orm::*;
use serde::Deserialize;
use std::collections::HashMap;
use uuid::Uuid;

use crate::models::{item, item_status};

use super::{catalog_service, ServiceError};

#[derive(Debug, Deserialize)]
pub struct ItemDraft {
    pub catalog_id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub image_url: Option<String>,
    #[serde(default)]
    pub user_fields: HashMap<String, String>,
}

/// Partial update; fields left as `None` are untouched.
#[derive(Debug, Default, Deserialize)]
pub struct ItemPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub user_fields: Option<HashMap<String, String>>,
}

pub async fn get_item<C: ConnectionTrait>(
    db: &C,
    item_id: &str,
) -> Result<item::Model, ServiceError> {
    item::Entity::find_by_id(item_id)
        .one(db)
        .await?
        .ok_or(ServiceError::NotFound)
}

pub async fn list_items<C: ConnectionTrait>(
    db: &C,
    catalog_id: &str,
) -> Result<Vec<item::Model>, ServiceError> {
    let items = item::Entity::find()
        .filter(item::Column::CatalogId.eq(catalog_id))
        .all(db)
        .await?;
    Ok(items)
}

/// Look up the ownership row for (user, item), creating it with
/// `owned = false` when absent. Both item-creation seeding and the toggle go
/// through here so the default row is constructed in exactly one place.
pub async fn get_or_create_status<C: ConnectionTrait>(
    db: &C,
    user_id: &str,
    item_id: &str,
) -> Result<item_status::Model, ServiceError> {
    let existing = item_status::Entity::find_by_id((user_id.to_owned(), item_id.to_owned()))
        .one(db)
        .await?;

    if let Some(status) = existing {
        return Ok(status);
    }

    let now = chrono::Utc::now().to_rfc3339();
    let fresh = item_status::ActiveModel {
        user_id: Set(user_id.to_owned()),
        item_id: Set(item_id.to_owned()),
        owned: Set(false),
        created_at: Set(now.clone()),
        updated_at: Set(now),
    };

    match fresh.insert(db).await {
        Ok(status) => Ok(status),
        // A concurrent caller created the row between our lookup and insert.
        Err(e) if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
            item_status::Entity::find_by_id((user_id.to_owned(), item_id.to_owned()))
                .one(db)
                .await?
                .ok_or_else(|| ServiceError::Database(e.to_string()))
        }
        Err(e) => Err(e.into()),
    }
}

/// `owned` flag for one (user, item) pair; a missing row reads as false.
pub async fn status_for(
    db: &DatabaseConnection,
    user_id: &str,
    item_id: &str,
) -> Result<bool, ServiceError> {
    let status = item_status::Entity::find_by_id((user_id.to_owned(), item_id.to_owned()))
        .one(db)
        .await?;
    Ok(status.map(|s| s.owned).unwrap_or(false))
}

/// Ownership flags for a set of items as seen by one user, keyed by item id.
/// Items without a row are simply absent from the map.
pub async fn owned_map(
    db: &DatabaseConnection,
    user_id: &str,
    item_ids: &[String],
) -> Result<HashMap<String, bool>, ServiceError> {
    if item_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let statuses = item_status::Entity::find()
        .filter(item_status::Column::UserId.eq(user_id))
        .filter(item_status::Column::ItemId.is_in(item_ids.to_vec()))
        .all(db)
        .await?;

    Ok(statuses.into_iter().map(|s| (s.item_id, s.owned)).collect())
}

/// Create an item under a catalog the caller owns. The creator gets a
/// default not-owned status row in the same transaction.
pub async fn create_item(
    db: &DatabaseConnection,
    acting_user: &str,
    draft: ItemDraft,
) -> Result<item::Model, ServiceError> {
    let catalog = catalog_service::get_catalog(db, &draft.catalog_id).await?;

    if catalog.owner_id != acting_user {
        return Err(ServiceError::Forbidden);
    }

    let now = chrono::Utc::now().to_rfc3339();

    let txn = db.begin().await?;

    let new_item = item::ActiveModel {
        id: Set(Uuid::new_v4().to_string()),
        catalog_id: Set(draft.catalog_id),
        name: Set(draft.name),
        description: Set(draft.description),
        image_url: Set(draft.image_url),
        user_fields: Set(
            serde_json::to_string(&draft.user_fields).unwrap_or_else(|_| "{}".to_string())
        ),
        created_at: Set(now.clone()),
        updated_at: Set(now),
    };
    let created = new_item.insert(&txn).await?;

    get_or_create_status(&txn, acting_user, &created.id).await?;

    txn.commit().await?;

    Ok(created)
}

pub async fn update_item(
    db: &DatabaseConnection,
    acting_user: &str,
    item_id: &str,
    patch: ItemPatch,
) -> Result<item::Model, ServiceError> {
    let existing = get_item(db, item_id).await?;
    let catalog = catalog_service::get_catalog(db, &existing.catalog_id).await?;

    if catalog.owner_id != acting_user {
        return Err(ServiceError::Forbidden);
    }

    let mut active: item::ActiveModel = existing.into();
    if let Some(name) = patch.name {
        active.name = Set(name);
    }
    if let Some(description) = patch.description {
        active.description = Set(description);
    }
    if let Some(image_url) = patch.image_url {
        active.image_url = Set(Some(image_url));
    }
    if let Some(user_fields) = patch.user_fields {
        active.user_fields = Set(
            serde_json::to_string(&user_fields).unwrap_or_else(|_| "{}".to_string())
        );
    }
    active.updated_at = Set(chrono::Utc::now().to_rfc3339());

    Ok(active.update(db).await?)
}

/// Delete an item and every ownership row referencing it.
pub async fn delete_item(
    db: &DatabaseConnection,
    acting_user: &str,
    item_id: &str,
) -> Result<(), ServiceError> {
    let existing = get_item(db, item_id).await?;
    let catalog = catalog_service::get_catalog(db, &existing.catalog_id).await?;

    if catalog.owner_id != acting_user {
        return Err(ServiceError::Forbidden);
    }

    let txn = db.begin().await?;

    item_status::Entity::delete_many()
        .filter(item_status::Column::ItemId.eq(item_id))
        .exec(&txn)
        .await?;
    item::Entity::delete_by_id(item_id).exec(&txn).await?;

    txn.commit().await?;
    Ok(())
}

/// Flip the caller's ownership flag for an item. A missing row is created
/// first with `owned = false`, so the flip always starts from a defined
/// baseline: first toggle yields true, the next false, and so on.
pub async fn toggle_owned(
    db: &DatabaseConnection,
    user_id: &str,
    item_id: &str,
) -> Result<item_status::Model, ServiceError> {
    // The item must exist; any authenticated user may track ownership of
    // items in catalogs they can see.
    get_item(db, item_id).await?;

    let txn = db.begin().await?;

    let status = get_or_create_status(&txn, user_id, item_id).await?;
    let flipped = !status.owned;

    let mut active: item_status::ActiveModel = status.into();
    active.owned = Set(flipped);
    active.updated_at = Set(chrono::Utc::now().to_rfc3339());
    let updated = active.update(&txn).await?;

    txn.commit().await?;

    Ok(updated)
}
