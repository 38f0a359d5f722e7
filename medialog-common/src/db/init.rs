//! Database initialization
//!
//! Creates the database file on first run, applies connection pragmas and
//! idempotently creates every table. Safe to call on every startup.

use crate::Result;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use tracing::{info, warn};

/// Event bus size used when the `event_bus_capacity` setting is absent or invalid
pub const DEFAULT_EVENT_BUS_CAPACITY: usize = 100;

/// GUID of the built-in local user
pub const LOCAL_USER_GUID: &str = "00000000-0000-0000-0000-000000000001";

/// Initialize database connection and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(&db_url)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    // WAL allows concurrent readers with one writer
    sqlx::query("PRAGMA journal_mode = WAL")
        .execute(&pool)
        .await?;

    create_schema(&pool).await?;
    init_default_settings(&pool).await?;

    let timeout_ms: i64 = sqlx::query_scalar(
        "SELECT CAST(value AS INTEGER) FROM settings WHERE key = 'database_busy_timeout_ms'",
    )
    .fetch_optional(&pool)
    .await?
    .unwrap_or(5000);

    let pragma_sql = format!("PRAGMA busy_timeout = {}", timeout_ms);
    sqlx::query(&pragma_sql).execute(&pool).await?;

    info!("Database busy timeout set to {} ms", timeout_ms);

    Ok(pool)
}

/// Create every table and index (idempotent)
///
/// Split out of [`init_database`] so tests can build the schema on an
/// in-memory pool.
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    sqlx::query("PRAGMA foreign_keys = ON").execute(pool).await?;

    create_users_table(pool).await?;
    create_settings_table(pool).await?;
    create_categories_table(pool).await?;
    create_series_table(pool).await?;
    create_items_table(pool).await?;
    create_list_orders_table(pool).await?;

    Ok(())
}

async fn create_users_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            guid TEXT PRIMARY KEY,
            username TEXT NOT NULL UNIQUE,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Create the local user if it doesn't exist
    sqlx::query("INSERT OR IGNORE INTO users (guid, username) VALUES (?, 'local')")
        .bind(LOCAL_USER_GUID)
        .execute(pool)
        .await?;

    Ok(())
}

/// Create the settings table
///
/// Stores application configuration key-value pairs.
pub async fn create_settings_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS settings (
            key TEXT PRIMARY KEY,
            value TEXT,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_categories_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS categories (
            guid TEXT PRIMARY KEY,
            user_guid TEXT NOT NULL REFERENCES users(guid) ON DELETE CASCADE,
            name TEXT NOT NULL,
            created_at TEXT NOT NULL,
            UNIQUE (user_guid, name)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_series_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS series (
            guid TEXT PRIMARY KEY,
            user_guid TEXT NOT NULL REFERENCES users(guid) ON DELETE CASCADE,
            category_guid TEXT NOT NULL REFERENCES categories(guid) ON DELETE CASCADE,
            name TEXT NOT NULL,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_items_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS items (
            guid TEXT PRIMARY KEY,
            user_guid TEXT NOT NULL REFERENCES users(guid) ON DELETE CASCADE,
            title TEXT NOT NULL,
            category_guid TEXT NOT NULL REFERENCES categories(guid),
            series_guid TEXT REFERENCES series(guid) ON DELETE SET NULL,
            status TEXT NOT NULL DEFAULT 'planned'
                CHECK (status IN ('planned', 'in_progress', 'on_hold', 'completed')),
            rating REAL CHECK (rating IS NULL OR (rating >= 0 AND rating <= 5)),
            review_text TEXT,
            why_interested TEXT,
            availability_end TEXT,
            completed_at TEXT,
            thumbnail_url TEXT,
            tags TEXT NOT NULL DEFAULT '[]',
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_items_user_status ON items(user_guid, status)")
        .execute(pool)
        .await?;

    Ok(())
}

async fn create_list_orders_table(pool: &SqlitePool) -> Result<()> {
    // No foreign key on item_guid: rows are replaced wholesale by sync and an
    // item id unknown to the directory is simply never displayed.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS list_orders (
            user_guid TEXT NOT NULL REFERENCES users(guid) ON DELETE CASCADE,
            scope_kind TEXT NOT NULL CHECK (scope_kind IN ('global', 'category')),
            category_guid TEXT,
            item_guid TEXT NOT NULL,
            position INTEGER NOT NULL CHECK (position >= 1)
        )
        "#,
    )
    .execute(pool)
    .await?;

    // NULL category keys compare equal here so the global scope is one group
    sqlx::query(
        r#"
        CREATE UNIQUE INDEX IF NOT EXISTS idx_list_orders_item
        ON list_orders(user_guid, scope_kind, IFNULL(category_guid, ''), item_guid)
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE UNIQUE INDEX IF NOT EXISTS idx_list_orders_position
        ON list_orders(user_guid, scope_kind, IFNULL(category_guid, ''), position)
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Initialize or update default settings
///
/// Ensures all required settings exist with default values.
/// NULL values are reset to defaults.
async fn init_default_settings(pool: &SqlitePool) -> Result<()> {
    ensure_setting(pool, "database_busy_timeout_ms", "5000").await?;
    ensure_setting(pool, "default_categories", r#"["Movies","Anime","Games","Manga"]"#).await?;
    ensure_setting(
        pool,
        "event_bus_capacity",
        &DEFAULT_EVENT_BUS_CAPACITY.to_string(),
    )
    .await?;

    Ok(())
}

/// Ensure a setting exists with the specified default value
///
/// If the setting doesn't exist, it will be created with the default.
/// If the setting exists but has a NULL value, it will be reset to the default.
async fn ensure_setting(pool: &SqlitePool, key: &str, default_value: &str) -> Result<()> {
    let value: Option<Option<String>> =
        sqlx::query_scalar("SELECT value FROM settings WHERE key = ?")
            .bind(key)
            .fetch_optional(pool)
            .await?;

    match value {
        None => {
            // INSERT OR IGNORE handles concurrent initialization
            sqlx::query("INSERT OR IGNORE INTO settings (key, value) VALUES (?, ?)")
                .bind(key)
                .bind(default_value)
                .execute(pool)
                .await?;

            info!("Initialized setting '{}' with default value: {}", key, default_value);
        }
        Some(None) => {
            sqlx::query("UPDATE settings SET value = ? WHERE key = ?")
                .bind(default_value)
                .bind(key)
                .execute(pool)
                .await?;

            info!("Reset NULL setting '{}' to default value: {}", key, default_value);
        }
        Some(Some(_)) => {}
    }

    Ok(())
}

/// Read a setting value
pub async fn get_setting(pool: &SqlitePool, key: &str) -> Result<Option<String>> {
    let value: Option<Option<String>> =
        sqlx::query_scalar("SELECT value FROM settings WHERE key = ?")
            .bind(key)
            .fetch_optional(pool)
            .await?;

    Ok(value.flatten())
}

/// Capacity for the event bus from the `event_bus_capacity` setting
///
/// Missing, unparsable or zero values fall back to
/// [`DEFAULT_EVENT_BUS_CAPACITY`].
pub async fn event_bus_capacity(pool: &SqlitePool) -> Result<usize> {
    let value = get_setting(pool, "event_bus_capacity").await?;

    match value.as_deref().map(str::trim).map(str::parse::<usize>) {
        Some(Ok(capacity)) if capacity > 0 => Ok(capacity),
        None => Ok(DEFAULT_EVENT_BUS_CAPACITY),
        Some(_) => {
            warn!(
                "Invalid event_bus_capacity setting {:?}, using {}",
                value, DEFAULT_EVENT_BUS_CAPACITY
            );
            Ok(DEFAULT_EVENT_BUS_CAPACITY)
        }
    }
}
