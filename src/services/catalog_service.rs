//! Catalog store - CRUD with ownership-gated access and explicit cascade.

use sea_orm::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{catalog, item, item_status, saved_catalog};

use super::ServiceError;

pub const DEFAULT_CATEGORY: &str = "uncategorized";

/// Payload for catalog creation.
#[derive(Debug, Deserialize)]
pub struct CatalogDraft {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub category: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub visibility: Option<String>,
    pub thumbnail_url: Option<String>,
}

/// Partial update. A field left as `None` is untouched; only fields present
/// in the payload are applied.
#[derive(Debug, Default, Deserialize)]
pub struct CatalogPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub tags: Option<Vec<String>>,
    pub visibility: Option<String>,
    pub thumbnail_url: Option<String>,
}

fn validate_visibility(visibility: &str) -> Result<(), ServiceError> {
    match visibility {
        "public" | "private" => Ok(()),
        other => Err(ServiceError::InvalidOperation(format!(
            "invalid visibility '{}', expected 'public' or 'private'",
            other
        ))),
    }
}

pub async fn get_catalog<C: ConnectionTrait>(
    db: &C,
    catalog_id: &str,
) -> Result<catalog::Model, ServiceError> {
    catalog::Entity::find_by_id(catalog_id)
        .one(db)
        .await?
        .ok_or(ServiceError::NotFound)
}

/// Fetch a catalog for a read path: public catalogs are visible to anyone,
/// private ones only to their owner.
pub async fn fetch_catalog_for_read(
    db: &DatabaseConnection,
    catalog_id: &str,
    viewer: Option<&str>,
) -> Result<catalog::Model, ServiceError> {
    let catalog = get_catalog(db, catalog_id).await?;

    if !catalog.is_public() {
        match viewer {
            None => return Err(ServiceError::Unauthenticated),
            Some(user_id) if user_id != catalog.owner_id => {
                return Err(ServiceError::Forbidden)
            }
            Some(_) => {}
        }
    }

    Ok(catalog)
}

pub async fn list_catalogs(
    db: &DatabaseConnection,
    owner_id: &str,
    category: Option<&str>,
    visibility: Option<&str>,
) -> Result<Vec<catalog::Model>, ServiceError> {
    let mut condition = Condition::all().add(catalog::Column::OwnerId.eq(owner_id));

    if let Some(category) = category {
        condition = condition.add(catalog::Column::Category.eq(category));
    }
    if let Some(visibility) = visibility {
        condition = condition.add(catalog::Column::Visibility.eq(visibility));
    }

    let catalogs = catalog::Entity::find()
        .filter(condition)
        .order_by_desc(catalog::Column::CreatedAt)
        .all(db)
        .await?;

    Ok(catalogs)
}

/// Public catalogs, newest first, optionally excluding the caller's own.
pub async fn list_public_catalogs(
    db: &DatabaseConnection,
    category: Option<&str>,
    exclude_user: Option<&str>,
) -> Result<Vec<catalog::Model>, ServiceError> {
    let mut condition = Condition::all().add(catalog::Column::Visibility.eq("public"));

    if let Some(user_id) = exclude_user {
        condition = condition.add(catalog::Column::OwnerId.ne(user_id));
    }
    if let Some(category) = category {
        condition = condition.add(catalog::Column::Category.eq(category));
    }

    let catalogs = catalog::Entity::find()
        .filter(condition)
        .order_by_desc(catalog::Column::CreatedAt)
        .all(db)
        .await?;

    Ok(catalogs)
}

pub async fn create_catalog(
    db: &DatabaseConnection,
    owner_id: &str,
    draft: CatalogDraft,
) -> Result<catalog::Model, ServiceError> {
    let visibility = draft.visibility.unwrap_or_else(|| "public".to_string());
    validate_visibility(&visibility)?;

    let now = chrono::Utc::now().to_rfc3339();

    let new_catalog = catalog::ActiveModel {
        id: Set(Uuid::new_v4().to_string()),
        owner_id: Set(owner_id.to_owned()),
        title: Set(draft.title),
        description: Set(draft.description),
        category: Set(draft
            .category
            .unwrap_or_else(|| DEFAULT_CATEGORY.to_string())),
        tags: Set(serde_json::to_string(&draft.tags).unwrap_or_else(|_| "[]".to_string())),
        visibility: Set(visibility),
        thumbnail_url: Set(draft.thumbnail_url),
        created_at: Set(now.clone()),
        updated_at: Set(now),
    };

    Ok(new_catalog.insert(db).await?)
}

pub async fn update_catalog(
    db: &DatabaseConnection,
    acting_user: &str,
    catalog_id: &str,
    patch: CatalogPatch,
) -> Result<catalog::Model, ServiceError> {
    let existing = get_catalog(db, catalog_id).await?;

    if existing.owner_id != acting_user {
        return Err(ServiceError::Forbidden);
    }

    if let Some(visibility) = patch.visibility.as_deref() {
        validate_visibility(visibility)?;
    }

    let mut active: catalog::ActiveModel = existing.into();
    if let Some(title) = patch.title {
        active.title = Set(title);
    }
    if let Some(description) = patch.description {
        active.description = Set(description);
    }
    if let Some(category) = patch.category {
        active.category = Set(category);
    }
    if let Some(tags) = patch.tags {
        active.tags = Set(serde_json::to_string(&tags).unwrap_or_else(|_| "[]".to_string()));
    }
    if let Some(visibility) = patch.visibility {
        active.visibility = Set(visibility);
    }
    if let Some(thumbnail_url) = patch.thumbnail_url {
        active.thumbnail_url = Set(Some(thumbnail_url));
    }
    active.updated_at = Set(chrono::Utc::now().to_rfc3339());

    Ok(active.update(db).await?)
}

/// Rows removed by a cascade, per table.
#[derive(Debug, Default, Clone, Copy, Serialize)]
pub struct CascadeCounts {
    pub items: u64,
    pub item_statuses: u64,
    pub saved_catalogs: u64,
}

/// Delete a catalog together with its items, every ownership row referencing
/// those items, and any provenance link referencing the catalog (as copy or
/// as original). Deliberately a manual tree walk rather than relying on
/// storage-engine FK cascade configuration, so the invariant stays testable.
///
/// Runs on whatever connection it is given - callers wrap it in a
/// transaction together with their other writes.
pub async fn delete_catalog_cascade<C: ConnectionTrait>(
    db: &C,
    catalog_id: &str,
) -> Result<CascadeCounts, ServiceError> {
    let mut counts = CascadeCounts::default();

    let item_ids: Vec<String> = item::Entity::find()
        .filter(item::Column::CatalogId.eq(catalog_id))
        .all(db)
        .await?
        .into_iter()
        .map(|i| i.id)
        .collect();

    if !item_ids.is_empty() {
        counts.item_statuses = item_status::Entity::delete_many()
            .filter(item_status::Column::ItemId.is_in(item_ids.clone()))
            .exec(db)
            .await?
            .rows_affected;

        counts.items = item::Entity::delete_many()
            .filter(item::Column::Id.is_in(item_ids))
            .exec(db)
            .await?
            .rows_affected;
    }

    counts.saved_catalogs = saved_catalog::Entity::delete_many()
        .filter(
            Condition::any()
                .add(saved_catalog::Column::CopiedCatalogId.eq(catalog_id))
                .add(saved_catalog::Column::OriginalCatalogId.eq(catalog_id)),
        )
        .exec(db)
        .await?
        .rows_affected;

    catalog::Entity::delete_by_id(catalog_id).exec(db).await?;

    Ok(counts)
}

pub async fn delete_catalog(
    db: &DatabaseConnection,
    acting_user: &str,
    catalog_id: &str,
) -> Result<(), ServiceError> {
    let existing = get_catalog(db, catalog_id).await?;

    if existing.owner_id != acting_user {
        return Err(ServiceError::Forbidden);
    }

    let txn = db.begin().await?;
    delete_catalog_cascade(&txn, catalog_id).await?;
    txn.commit().await?;

    tracing::info!(catalog_id, "catalog deleted");
    Ok(())
}

#[derive(Debug, Default, Serialize)]
pub struct DeletedCounts {
    pub catalogs: u64,
    pub items: u64,
    pub item_statuses: u64,
    pub saved_catalogs: u64,
}

/// Remove every trace of a user: all catalogs they own (originals and
/// copies, cascaded), any leftover saved-catalog links, and any ownership
/// rows they hold on other users' items. One transaction for the whole walk.
pub async fn delete_user_data(
    db: &DatabaseConnection,
    user_id: &str,
) -> Result<DeletedCounts, ServiceError> {
    let txn = db.begin().await?;
    let mut deleted = DeletedCounts::default();

    let owned: Vec<catalog::Model> = catalog::Entity::find()
        .filter(catalog::Column::OwnerId.eq(user_id))
        .all(&txn)
        .await?;

    for catalog in owned {
        let counts = delete_catalog_cascade(&txn, &catalog.id).await?;
        deleted.catalogs += 1;
        deleted.items += counts.items;
        deleted.item_statuses += counts.item_statuses;
        deleted.saved_catalogs += counts.saved_catalogs;
    }

    // Links whose copies were already cascaded above are gone; this picks up
    // any remaining references, including transient ones with no copy id.
    deleted.saved_catalogs += saved_catalog::Entity::delete_many()
        .filter(saved_catalog::Column::UserId.eq(user_id))
        .exec(&txn)
        .await?
        .rows_affected;

    // Ownership rows the user holds on items in other users' catalogs.
    deleted.item_statuses += item_status::Entity::delete_many()
        .filter(item_status::Column::UserId.eq(user_id))
        .exec(&txn)
        .await?
        .rows_affected;

    txn.commit().await?;

    tracing::info!(
        user_id,
        catalogs = deleted.catalogs,
        items = deleted.items,
        "user data deleted"
    );
    Ok(deleted)
}
