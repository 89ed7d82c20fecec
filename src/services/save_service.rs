//! Save/unsave of another user's catalog.
//!
//! Saving copies the catalog and every item it holds (a snapshot - later
//! edits to the original do not propagate), seeds a not-owned status row for
//! the saver on each copied item, and records a provenance link from the
//! copy back to the original. The whole write runs in one transaction:
//! a failure anywhere leaves no partial catalog, items, or link behind.

use sea_orm::*;
use serde::Serialize;
use std::collections::HashMap;
use uuid::Uuid;

use crate::models::{catalog, item, saved_catalog};

use super::{catalog_service, item_service, stats, ServiceError};

#[derive(Debug, Serialize)]
pub struct SaveOutcome {
    pub copied_catalog_id: String,
    pub original_catalog_id: String,
}

/// A catalog owned by a user, decorated for listing: where it was copied
/// from (None for originals) and the owner's completion statistics.
#[derive(Debug)]
pub struct OwnedCatalog {
    pub catalog: catalog::Model,
    pub original_catalog_id: Option<String>,
    pub stats: stats::CatalogStats,
}

/// Copy `original_catalog_id` into `user_id`'s collection.
///
/// Preconditions, first failure wins: the original must exist, must not be
/// the caller's own, and must not have been saved by the caller before.
/// The copy is always private regardless of the original's visibility.
pub async fn save_catalog(
    db: &DatabaseConnection,
    user_id: &str,
    original_catalog_id: &str,
) -> Result<SaveOutcome, ServiceError> {
    let original = catalog_service::get_catalog(db, original_catalog_id).await?;

    if original.owner_id == user_id {
        return Err(ServiceError::InvalidOperation(
            "cannot save own catalog".to_string(),
        ));
    }

    if is_saved(db, user_id, original_catalog_id).await?.is_some() {
        return Err(ServiceError::Conflict("catalog already saved".to_string()));
    }

    let txn = db.begin().await?;

    let now = chrono::Utc::now().to_rfc3339();
    let copied_catalog_id = Uuid::new_v4().to_string();

    let copy = catalog::ActiveModel {
        id: Set(copied_catalog_id.clone()),
        owner_id: Set(user_id.to_owned()),
        title: Set(original.title.clone()),
        description: Set(original.description.clone()),
        category: Set(original.category.clone()),
        tags: Set(original.tags.clone()),
        visibility: Set("private".to_string()),
        thumbnail_url: Set(original.thumbnail_url.clone()),
        created_at: Set(now.clone()),
        updated_at: Set(now.clone()),
    };
    copy.insert(&txn).await?;

    // Snapshot of the original's items at save time, each with a fresh id
    // and a not-owned status row for the saver.
    let originals = item::Entity::find()
        .filter(item::Column::CatalogId.eq(original_catalog_id))
        .all(&txn)
        .await?;

    for source in &originals {
        let copied_item = item::ActiveModel {
            id: Set(Uuid::new_v4().to_string()),
            catalog_id: Set(copied_catalog_id.clone()),
            name: Set(source.name.clone()),
            description: Set(source.description.clone()),
            image_url: Set(source.image_url.clone()),
            user_fields: Set(source.user_fields.clone()),
            created_at: Set(now.clone()),
            updated_at: Set(now.clone()),
        };
        let created = copied_item.insert(&txn).await?;

        item_service::get_or_create_status(&txn, user_id, &created.id).await?;
    }

    let link = saved_catalog::ActiveModel {
        user_id: Set(user_id.to_owned()),
        original_catalog_id: Set(original_catalog_id.to_owned()),
        copied_catalog_id: Set(Some(copied_catalog_id.clone())),
        saved_at: Set(now),
        ..Default::default()
    };

    // The unique constraint on (user_id, original_catalog_id) is the
    // arbiter under concurrency: a racing save that slipped past the
    // precondition check loses here, and the transaction rolls back.
    if let Err(e) = link.insert(&txn).await {
        return Err(match e.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(_)) => {
                ServiceError::Conflict("catalog already saved".to_string())
            }
            _ => e.into(),
        });
    }

    txn.commit().await?;

    tracing::info!(
        user_id,
        original_catalog_id,
        copied_catalog_id = %copied_catalog_id,
        items = originals.len(),
        "catalog saved"
    );

    Ok(SaveOutcome {
        copied_catalog_id,
        original_catalog_id: original_catalog_id.to_owned(),
    })
}

/// Remove a saved copy: its items, the caller's ownership rows on them, the
/// catalog itself, and the provenance link if one exists.
///
/// Gated on catalog ownership rather than link existence, so a copy whose
/// link row went missing can still be removed.
pub async fn unsave_catalog(
    db: &DatabaseConnection,
    user_id: &str,
    copied_catalog_id: &str,
) -> Result<(), ServiceError> {
    let catalog = catalog_service::get_catalog(db, copied_catalog_id).await?;

    if catalog.owner_id != user_id {
        return Err(ServiceError::Forbidden);
    }

    let txn = db.begin().await?;
    catalog_service::delete_catalog_cascade(&txn, copied_catalog_id).await?;
    txn.commit().await?;

    tracing::info!(user_id, copied_catalog_id, "catalog unsaved");
    Ok(())
}

/// The caller's provenance link for an original catalog, if any.
pub async fn is_saved(
    db: &DatabaseConnection,
    user_id: &str,
    original_catalog_id: &str,
) -> Result<Option<saved_catalog::Model>, ServiceError> {
    let link = saved_catalog::Entity::find()
        .filter(saved_catalog::Column::UserId.eq(user_id))
        .filter(saved_catalog::Column::OriginalCatalogId.eq(original_catalog_id))
        .one(db)
        .await?;
    Ok(link)
}

/// All provenance links held by a user, keyed by copied catalog id.
pub async fn links_by_copy(
    db: &DatabaseConnection,
    user_id: &str,
) -> Result<HashMap<String, String>, ServiceError> {
    let links = saved_catalog::Entity::find()
        .filter(saved_catalog::Column::UserId.eq(user_id))
        .all(db)
        .await?;

    Ok(links
        .into_iter()
        .filter_map(|l| l.copied_catalog_id.map(|copy| (copy, l.original_catalog_id)))
        .collect())
}

/// Every catalog the user owns - created originals and saved copies alike -
/// newest first, with provenance and the user's own completion stats.
pub async fn list_owned(
    db: &DatabaseConnection,
    user_id: &str,
) -> Result<Vec<OwnedCatalog>, ServiceError> {
    let catalogs = catalog::Entity::find()
        .filter(catalog::Column::OwnerId.eq(user_id))
        .order_by_desc(catalog::Column::CreatedAt)
        .all(db)
        .await?;

    let links = links_by_copy(db, user_id).await?;

    let mut result = Vec::with_capacity(catalogs.len());
    for catalog in catalogs {
        let stats = stats::catalog_stats(db, &catalog.id, Some(user_id)).await?;
        let original_catalog_id = links.get(&catalog.id).cloned();
        result.push(OwnedCatalog {
            catalog,
            original_catalog_id,
            stats,
        });
    }

    Ok(result)
}
