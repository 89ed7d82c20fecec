use axum::extract::FromRef;
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, DbErr, Statement};

use crate::config::Config;

#[derive(Clone)]
pub struct AppState {
    pub conn: DatabaseConnection,
    pub config: Config,
}

impl FromRef<AppState> for DatabaseConnection {
    fn from_ref(state: &AppState) -> Self {
        state.conn.clone()
    }
}

impl FromRef<AppState> for Config {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}

pub async fn init_db(database_url: &str) -> Result<DatabaseConnection, DbErr> {
    let db = Database::connect(database_url).await?;

    // Run migrations manually (simple SQL)
    run_migrations(&db).await?;

    Ok(db)
}

async fn run_migrations(db: &DatabaseConnection) -> Result<(), DbErr> {
    // Create catalogs table
    db.execute(Statement::from_string(
        db.get_database_backend(),
        r#"
        CREATE TABLE IF NOT EXISTS catalogs (
            id TEXT PRIMARY KEY,
            owner_id TEXT NOT NULL,
            title TEXT NOT NULL,
            description TEXT NOT NULL DEFAULT '',
            category TEXT NOT NULL DEFAULT 'uncategorized',
            tags TEXT NOT NULL DEFAULT '[]',
            visibility TEXT NOT NULL DEFAULT 'public',
            thumbnail_url TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_catalogs_owner_id ON catalogs(owner_id);
        CREATE INDEX IF NOT EXISTS idx_catalogs_visibility ON catalogs(visibility);
        "#
        .to_owned(),
    ))
    .await?;

    // Create items table
    db.execute(Statement::from_string(
        db.get_database_backend(),
        r#"
        CREATE TABLE IF NOT EXISTS items (
            id TEXT PRIMARY KEY,
            catalog_id TEXT NOT NULL,
            name TEXT NOT NULL,
            description TEXT NOT NULL DEFAULT '',
            image_url TEXT,
            user_fields TEXT NOT NULL DEFAULT '{}',
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            FOREIGN KEY (catalog_id) REFERENCES catalogs(id) ON DELETE CASCADE
        );
        CREATE INDEX IF NOT EXISTS idx_items_catalog_id ON items(catalog_id);
        "#
        .to_owned(),
    ))
    .await?;

    // Create item_statuses table (one row per user per item)
    db.execute(Statement::from_string(
        db.get_database_backend(),
        r#"
        CREATE TABLE IF NOT EXISTS item_statuses (
            user_id TEXT NOT NULL,
            item_id TEXT NOT NULL,
            owned INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            PRIMARY KEY (user_id, item_id),
            FOREIGN KEY (item_id) REFERENCES items(id) ON DELETE CASCADE
        );
        CREATE INDEX IF NOT EXISTS idx_item_statuses_item_id ON item_statuses(item_id);
        "#
        .to_owned(),
    ))
    .await?;

    // Create saved_catalogs table. The UNIQUE constraint is what stops two
    // concurrent saves of the same original from both succeeding.
    db.execute(Statement::from_string(
        db.get_database_backend(),
        r#"
        CREATE TABLE IF NOT EXISTS saved_catalogs (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id TEXT NOT NULL,
            original_catalog_id TEXT NOT NULL,
            copied_catalog_id TEXT,
            saved_at TEXT NOT NULL,
            UNIQUE (user_id, original_catalog_id)
        );
        CREATE INDEX IF NOT EXISTS idx_saved_catalogs_user_id ON saved_catalogs(user_id);
        CREATE INDEX IF NOT EXISTS idx_saved_catalogs_copied_id ON saved_catalogs(copied_catalog_id);
        "#
        .to_owned(),
    ))
    .await?;

    Ok(())
}
