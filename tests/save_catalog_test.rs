use std::collections::HashMap;
use std::time::Duration;

use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    Statement,
};

use curio::db;
use curio::models::{catalog, item, item_status, saved_catalog};
use curio::services::{catalog_service, item_service, save_service, stats, ServiceError};

// Helper to create a test database
async fn setup_test_db() -> DatabaseConnection {
    // In-memory SQLite for testing
    db::init_db("sqlite::memory:")
        .await
        .expect("Failed to init DB")
}

async fn create_test_catalog(
    db: &DatabaseConnection,
    owner: &str,
    title: &str,
    visibility: &str,
) -> String {
    let draft = catalog_service::CatalogDraft {
        title: title.to_string(),
        description: "test catalog".to_string(),
        category: None,
        tags: vec!["test".to_string()],
        visibility: Some(visibility.to_string()),
        thumbnail_url: None,
    };
    catalog_service::create_catalog(db, owner, draft)
        .await
        .expect("Failed to create catalog")
        .id
}

async fn create_test_item(
    db: &DatabaseConnection,
    owner: &str,
    catalog_id: &str,
    name: &str,
) -> String {
    let draft = item_service::ItemDraft {
        catalog_id: catalog_id.to_string(),
        name: name.to_string(),
        description: "test item".to_string(),
        image_url: None,
        user_fields: HashMap::new(),
    };
    item_service::create_item(db, owner, draft)
        .await
        .expect("Failed to create item")
        .id
}

#[tokio::test]
async fn test_save_copies_catalog_and_seeds_statuses() {
    let db = setup_test_db().await;

    // User A owns public catalog "Stamps" with two items, one owned.
    let original_id = create_test_catalog(&db, "user-a", "Stamps", "public").await;
    let item1 = create_test_item(&db, "user-a", &original_id, "Penny Black").await;
    let _item2 = create_test_item(&db, "user-a", &original_id, "Blue Mauritius").await;

    let toggled = item_service::toggle_owned(&db, "user-a", &item1)
        .await
        .expect("toggle failed");
    assert!(toggled.owned);

    // User B saves it.
    let outcome = save_service::save_catalog(&db, "user-b", &original_id)
        .await
        .expect("save failed");
    assert_eq!(outcome.original_catalog_id, original_id);
    assert_ne!(outcome.copied_catalog_id, original_id);

    // The copy is owned by B and forced private.
    let copy = catalog_service::get_catalog(&db, &outcome.copied_catalog_id)
        .await
        .expect("copy missing");
    assert_eq!(copy.owner_id, "user-b");
    assert_eq!(copy.visibility, "private");
    assert_eq!(copy.title, "Stamps");

    // Two copied items, each with a fresh id and a not-owned status for B.
    let copied_items = item_service::list_items(&db, &outcome.copied_catalog_id)
        .await
        .expect("list failed");
    assert_eq!(copied_items.len(), 2);
    assert!(copied_items.iter().all(|i| i.id != item1));

    let b_statuses = item_status::Entity::find()
        .filter(item_status::Column::UserId.eq("user-b"))
        .all(&db)
        .await
        .expect("status query failed");
    assert_eq!(b_statuses.len(), 2);
    assert!(b_statuses.iter().all(|s| !s.owned));

    // B starts at zero; A's progress on the original is untouched.
    let copy_stats = stats::catalog_stats(&db, &outcome.copied_catalog_id, Some("user-b"))
        .await
        .expect("stats failed");
    assert_eq!(copy_stats.item_count, 2);
    assert_eq!(copy_stats.owned_count, 0);
    assert_eq!(copy_stats.completion_rate, 0.0);

    let original_stats = stats::catalog_stats(&db, &original_id, Some("user-a"))
        .await
        .expect("stats failed");
    assert_eq!(original_stats.owned_count, 1);
    assert_eq!(original_stats.completion_rate, 50.0);
}

#[tokio::test]
async fn test_save_unknown_catalog_is_not_found() {
    let db = setup_test_db().await;

    let err = save_service::save_catalog(&db, "user-b", "no-such-catalog")
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::NotFound));
}

#[tokio::test]
async fn test_save_own_catalog_is_rejected() {
    let db = setup_test_db().await;

    let catalog_id = create_test_catalog(&db, "user-a", "Coins", "public").await;

    let err = save_service::save_catalog(&db, "user-a", &catalog_id)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::InvalidOperation(_)));

    // Nothing was created.
    let count = saved_catalog::Entity::find().count(&db).await.unwrap();
    assert_eq!(count, 0);
}

#[tokio::test]
async fn test_duplicate_save_is_conflict() {
    let db = setup_test_db().await;

    let original_id = create_test_catalog(&db, "user-a", "Vinyl", "public").await;
    create_test_item(&db, "user-a", &original_id, "Abbey Road").await;

    save_service::save_catalog(&db, "user-b", &original_id)
        .await
        .expect("first save failed");

    let err = save_service::save_catalog(&db, "user-b", &original_id)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Conflict(_)));

    // Still exactly one link and one copy.
    let links = saved_catalog::Entity::find()
        .filter(saved_catalog::Column::UserId.eq("user-b"))
        .count(&db)
        .await
        .unwrap();
    assert_eq!(links, 1);

    let copies = catalog::Entity::find()
        .filter(catalog::Column::OwnerId.eq("user-b"))
        .count(&db)
        .await
        .unwrap();
    assert_eq!(copies, 1);
}

#[tokio::test]
async fn test_concurrent_saves_only_one_succeeds() {
    // Named shared-cache database so both pooled connections see one store.
    let db = db::init_db("sqlite:file:save_race_test?mode=memory&cache=shared")
        .await
        .expect("Failed to init DB");

    let original_id = create_test_catalog(&db, "user-a", "Figurines", "public").await;
    create_test_item(&db, "user-a", &original_id, "Knight").await;
    create_test_item(&db, "user-a", &original_id, "Dragon").await;

    let db1 = db.clone();
    let db2 = db.clone();
    let id1 = original_id.clone();
    let id2 = original_id.clone();

    let (first, second) = tokio::join!(
        save_service::save_catalog(&db1, "user-b", &id1),
        save_service::save_catalog(&db2, "user-b", &id2),
    );

    let successes = [&first, &second].iter().filter(|r| r.is_ok()).count();
    assert_eq!(successes, 1, "exactly one concurrent save may win");

    // The loser left no partial state: one link, one copy, two copied items.
    let links = saved_catalog::Entity::find()
        .filter(saved_catalog::Column::UserId.eq("user-b"))
        .count(&db)
        .await
        .unwrap();
    assert_eq!(links, 1);

    let copies = catalog::Entity::find()
        .filter(catalog::Column::OwnerId.eq("user-b"))
        .all(&db)
        .await
        .unwrap();
    assert_eq!(copies.len(), 1);

    let copied_items = item::Entity::find()
        .filter(item::Column::CatalogId.eq(copies[0].id.clone()))
        .count(&db)
        .await
        .unwrap();
    assert_eq!(copied_items, 2);
}

#[tokio::test]
async fn test_save_rolls_back_on_mid_copy_failure() {
    let db = setup_test_db().await;

    let original_id = create_test_catalog(&db, "user-a", "Minerals", "public").await;
    create_test_item(&db, "user-a", &original_id, "Quartz").await;
    create_test_item(&db, "user-a", &original_id, "Poison Pill").await;

    // Installed after seeding so only the copy loop trips it: the second
    // item insert aborts mid-transaction, after the copied catalog and the
    // first copied item were already written.
    db.execute(Statement::from_string(
        db.get_database_backend(),
        r#"
        CREATE TRIGGER abort_poison_item_insert
        BEFORE INSERT ON items
        WHEN NEW.name = 'Poison Pill'
        BEGIN
            SELECT RAISE(ABORT, 'simulated storage failure');
        END
        "#
        .to_owned(),
    ))
    .await
    .expect("Failed to create trigger");

    let err = save_service::save_catalog(&db, "user-b", &original_id)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Database(_)));

    // Full rollback: no copied catalog, no copied items, no statuses for B,
    // no provenance link.
    let b_catalogs = catalog::Entity::find()
        .filter(catalog::Column::OwnerId.eq("user-b"))
        .count(&db)
        .await
        .unwrap();
    assert_eq!(b_catalogs, 0);

    let total_items = item::Entity::find().count(&db).await.unwrap();
    assert_eq!(total_items, 2);

    let b_statuses = item_status::Entity::find()
        .filter(item_status::Column::UserId.eq("user-b"))
        .count(&db)
        .await
        .unwrap();
    assert_eq!(b_statuses, 0);

    let links = saved_catalog::Entity::find().count(&db).await.unwrap();
    assert_eq!(links, 0);
}

#[tokio::test]
async fn test_copy_is_independent_of_original() {
    let db = setup_test_db().await;

    let original_id = create_test_catalog(&db, "user-a", "Posters", "public").await;
    let item_id = create_test_item(&db, "user-a", &original_id, "Original Name").await;

    let outcome = save_service::save_catalog(&db, "user-b", &original_id)
        .await
        .expect("save failed");

    // Rename the original item after the save.
    item_service::update_item(
        &db,
        "user-a",
        &item_id,
        item_service::ItemPatch {
            name: Some("Renamed".to_string()),
            ..Default::default()
        },
    )
    .await
    .expect("update failed");

    let copied_items = item_service::list_items(&db, &outcome.copied_catalog_id)
        .await
        .expect("list failed");
    assert_eq!(copied_items.len(), 1);
    assert_eq!(copied_items[0].name, "Original Name");
}

#[tokio::test]
async fn test_unsave_removes_copy_items_statuses_and_link() {
    let db = setup_test_db().await;

    let original_id = create_test_catalog(&db, "user-a", "Stamps", "public").await;
    create_test_item(&db, "user-a", &original_id, "One").await;
    create_test_item(&db, "user-a", &original_id, "Two").await;

    let outcome = save_service::save_catalog(&db, "user-b", &original_id)
        .await
        .expect("save failed");

    // B marks one copied item owned before removing the copy.
    let copied_items = item_service::list_items(&db, &outcome.copied_catalog_id)
        .await
        .unwrap();
    item_service::toggle_owned(&db, "user-b", &copied_items[0].id)
        .await
        .expect("toggle failed");

    save_service::unsave_catalog(&db, "user-b", &outcome.copied_catalog_id)
        .await
        .expect("unsave failed");

    let err = catalog_service::get_catalog(&db, &outcome.copied_catalog_id)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::NotFound));

    let leftover_items = item::Entity::find()
        .filter(item::Column::CatalogId.eq(outcome.copied_catalog_id.clone()))
        .count(&db)
        .await
        .unwrap();
    assert_eq!(leftover_items, 0);

    let b_statuses = item_status::Entity::find()
        .filter(item_status::Column::UserId.eq("user-b"))
        .count(&db)
        .await
        .unwrap();
    assert_eq!(b_statuses, 0);

    let link = save_service::is_saved(&db, "user-b", &original_id)
        .await
        .expect("is_saved failed");
    assert!(link.is_none());

    // The original survives untouched.
    let original_items = item_service::list_items(&db, &original_id).await.unwrap();
    assert_eq!(original_items.len(), 2);
}

#[tokio::test]
async fn test_unsave_requires_catalog_ownership() {
    let db = setup_test_db().await;

    let original_id = create_test_catalog(&db, "user-a", "Maps", "public").await;
    let outcome = save_service::save_catalog(&db, "user-b", &original_id)
        .await
        .expect("save failed");

    let err = save_service::unsave_catalog(&db, "user-c", &outcome.copied_catalog_id)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Forbidden));

    let err = save_service::unsave_catalog(&db, "user-b", "no-such-catalog")
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::NotFound));
}

#[tokio::test]
async fn test_unsave_works_even_without_link_row() {
    let db = setup_test_db().await;

    let original_id = create_test_catalog(&db, "user-a", "Badges", "public").await;
    let outcome = save_service::save_catalog(&db, "user-b", &original_id)
        .await
        .expect("save failed");

    // Simulate a copy whose provenance link was lost by prior storage
    // inconsistency. The ownership check still permits removal.
    saved_catalog::Entity::delete_many()
        .filter(saved_catalog::Column::UserId.eq("user-b"))
        .exec(&db)
        .await
        .expect("link delete failed");

    save_service::unsave_catalog(&db, "user-b", &outcome.copied_catalog_id)
        .await
        .expect("unsave should still succeed");

    let err = catalog_service::get_catalog(&db, &outcome.copied_catalog_id)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::NotFound));
}

#[tokio::test]
async fn test_is_saved_reports_link() {
    let db = setup_test_db().await;

    let original_id = create_test_catalog(&db, "user-a", "Cards", "public").await;

    let before = save_service::is_saved(&db, "user-b", &original_id)
        .await
        .unwrap();
    assert!(before.is_none());

    let outcome = save_service::save_catalog(&db, "user-b", &original_id)
        .await
        .unwrap();

    let after = save_service::is_saved(&db, "user-b", &original_id)
        .await
        .unwrap()
        .expect("link should exist");
    assert_eq!(
        after.copied_catalog_id.as_deref(),
        Some(outcome.copied_catalog_id.as_str())
    );
}

#[tokio::test]
async fn test_list_owned_orders_and_decorates() {
    let db = setup_test_db().await;

    let own_id = create_test_catalog(&db, "user-b", "My Pins", "public").await;
    tokio::time::sleep(Duration::from_millis(5)).await;

    let original_id = create_test_catalog(&db, "user-a", "Their Rocks", "public").await;
    create_test_item(&db, "user-a", &original_id, "Granite").await;
    tokio::time::sleep(Duration::from_millis(5)).await;

    let outcome = save_service::save_catalog(&db, "user-b", &original_id)
        .await
        .expect("save failed");

    let owned = save_service::list_owned(&db, "user-b")
        .await
        .expect("list_owned failed");
    assert_eq!(owned.len(), 2);

    // Most recently added first: the saved copy.
    assert_eq!(owned[0].catalog.id, outcome.copied_catalog_id);
    assert_eq!(
        owned[0].original_catalog_id.as_deref(),
        Some(original_id.as_str())
    );
    assert_eq!(owned[0].stats.item_count, 1);
    assert_eq!(owned[0].stats.owned_count, 0);

    assert_eq!(owned[1].catalog.id, own_id);
    assert!(owned[1].original_catalog_id.is_none());
}
