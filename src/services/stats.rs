//! Completion statistics for a catalog as seen by one user.

use sea_orm::*;
use serde::Serialize;

use crate::models::{item, item_status};

use super::ServiceError;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CatalogStats {
    pub item_count: i64,
    pub owned_count: i64,
    pub completion_rate: f64,
}

impl CatalogStats {
    pub fn empty() -> Self {
        Self {
            item_count: 0,
            owned_count: 0,
            completion_rate: 0.0,
        }
    }
}

/// Compute item_count / owned_count / completion_rate for `catalog_id` from
/// the viewpoint of `viewing_user`. An anonymous viewer (`None`) owns
/// nothing. An unknown catalog id simply counts as "no items" - existence
/// checks belong to the caller.
///
/// For public catalog listings the caller passes the catalog owner's id
/// here, so visitors see the creator's collection progress rather than
/// their own (they have no ownership rows for an unsaved catalog).
pub async fn catalog_stats<C: ConnectionTrait>(
    db: &C,
    catalog_id: &str,
    viewing_user: Option<&str>,
) -> Result<CatalogStats, ServiceError> {
    let item_ids: Vec<String> = item::Entity::find()
        .filter(item::Column::CatalogId.eq(catalog_id))
        .all(db)
        .await?
        .into_iter()
        .map(|i| i.id)
        .collect();

    let item_count = item_ids.len() as i64;
    if item_count == 0 {
        return Ok(CatalogStats::empty());
    }

    let owned_count = match viewing_user {
        Some(user_id) => item_status::Entity::find()
            .filter(item_status::Column::UserId.eq(user_id))
            .filter(item_status::Column::ItemId.is_in(item_ids))
            .filter(item_status::Column::Owned.eq(true))
            .count(db)
            .await? as i64,
        None => 0,
    };

    let rate = owned_count as f64 / item_count as f64 * 100.0;

    Ok(CatalogStats {
        item_count,
        owned_count,
        completion_rate: (rate * 100.0).round() / 100.0,
    })
}
