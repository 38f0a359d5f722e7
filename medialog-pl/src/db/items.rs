//! Item, category and series directory
//!
//! Queries for the records shown on the priority board. Creating an item
//! also appends it to the end of the global scope and of its category scope.

use crate::db::orders::{insert_row, next_position};
use crate::error::{Error, Result};
use crate::order::{ItemKey, OrderRow, Scope};
use chrono::{DateTime, NaiveDate, Utc};
use medialog_common::db::{get_setting, CategoryRow, ItemRow, SeriesRow};
use medialog_common::events::ItemStatus;
use medialog_common::{time, uuid_utils};
use serde::{Deserialize, Serialize};
use sqlx::{Pool, Sqlite};
use std::collections::HashSet;
use tracing::{info, warn};
use uuid::Uuid;

/// Categories created for a new user when the settings table has none
pub const DEFAULT_CATEGORIES: [&str; 4] = ["Movies", "Anime", "Games", "Manga"];

const ITEM_COLUMNS: &str = "guid, user_guid, title, category_guid, series_guid, status, rating, \
     review_text, why_interested, availability_end, completed_at, thumbnail_url, tags, created_at, \
     updated_at";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: Uuid,
    pub name: String,
}

impl Category {
    fn from_db(row: CategoryRow) -> Result<Self> {
        Ok(Self {
            id: uuid_utils::parse(&row.guid)?,
            name: row.name,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Series {
    pub id: Uuid,
    pub category_id: Uuid,
    pub name: String,
}

impl Series {
    fn from_db(row: SeriesRow) -> Result<Self> {
        Ok(Self {
            id: uuid_utils::parse(&row.guid)?,
            category_id: uuid_utils::parse(&row.category_guid)?,
            name: row.name,
        })
    }
}

/// A tracked work (movie, game, book, ...) owned by one user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub category_id: Uuid,
    pub series_id: Option<Uuid>,
    pub status: ItemStatus,
    /// 0.0 - 5.0
    pub rating: Option<f64>,
    pub review_text: Option<String>,
    pub why_interested: Option<String>,
    /// Last day the work is available (streaming window, sale end)
    pub availability_end: Option<NaiveDate>,
    pub completed_at: Option<DateTime<Utc>>,
    /// Cover image shown next to the title
    pub thumbnail_url: Option<String>,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Item {
    fn from_db(row: ItemRow) -> Result<Self> {
        let status = ItemStatus::from_str(&row.status)
            .ok_or_else(|| Error::Internal(format!("Unknown status '{}' on item {}", row.status, row.guid)))?;

        let tags: Vec<String> = serde_json::from_str(&row.tags)
            .map_err(|e| Error::Internal(format!("Invalid tags on item {}: {}", row.guid, e)))?;

        let availability_end = match row.availability_end.as_deref() {
            None | Some("") => None,
            Some(date) => Some(NaiveDate::parse_from_str(date, "%Y-%m-%d").map_err(|e| {
                Error::Internal(format!("Invalid availability date on item {}: {}", row.guid, e))
            })?),
        };

        Ok(Self {
            id: uuid_utils::parse(&row.guid)?,
            user_id: uuid_utils::parse(&row.user_guid)?,
            title: row.title,
            category_id: uuid_utils::parse(&row.category_guid)?,
            series_id: uuid_utils::parse_optional(row.series_guid.as_deref())?,
            status,
            rating: row.rating,
            review_text: row.review_text,
            why_interested: row.why_interested,
            availability_end,
            completed_at: row.completed_at.as_deref().and_then(time::parse_db_string),
            thumbnail_url: row.thumbnail_url,
            tags,
            created_at: parse_timestamp(&row.created_at, &row.guid)?,
            updated_at: parse_timestamp(&row.updated_at, &row.guid)?,
        })
    }

    /// The fields ordering and grouping look at
    pub fn key(&self) -> ItemKey {
        ItemKey {
            id: self.id,
            category_id: self.category_id,
            series_id: self.series_id,
            created_at: self.created_at,
        }
    }
}

fn parse_timestamp(value: &str, guid: &str) -> Result<DateTime<Utc>> {
    time::parse_db_string(value)
        .ok_or_else(|| Error::Internal(format!("Invalid timestamp '{}' on item {}", value, guid)))
}

/// Fields supplied when creating or editing an item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewItem {
    pub title: String,
    pub category_id: Uuid,
    pub series_id: Option<Uuid>,
    pub status: ItemStatus,
    pub rating: Option<f64>,
    pub review_text: Option<String>,
    pub why_interested: Option<String>,
    pub availability_end: Option<NaiveDate>,
    /// http(s) URL; blank is stored as no thumbnail
    pub thumbnail_url: Option<String>,
    pub tags: Vec<String>,
}

impl NewItem {
    /// Trimmed thumbnail URL, None when blank
    fn thumbnail(&self) -> Option<&str> {
        self.thumbnail_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
    }

    /// A planned item with no optional fields set
    pub fn new(title: impl Into<String>, category_id: Uuid) -> Self {
        Self {
            title: title.into(),
            category_id,
            series_id: None,
            status: ItemStatus::Planned,
            rating: None,
            review_text: None,
            why_interested: None,
            availability_end: None,
            thumbnail_url: None,
            tags: Vec::new(),
        }
    }

    pub fn with_series(mut self, series_id: Uuid) -> Self {
        self.series_id = Some(series_id);
        self
    }

    pub fn with_status(mut self, status: ItemStatus) -> Self {
        self.status = status;
        self
    }
}

/// Register a user row so items and orders can reference it
pub async fn ensure_user(db: &Pool<Sqlite>, user_id: Uuid) -> Result<()> {
    sqlx::query("INSERT OR IGNORE INTO users (guid, username) VALUES (?, ?)")
        .bind(user_id.to_string())
        .bind(user_id.to_string())
        .execute(db)
        .await?;
    Ok(())
}

/// Create the default categories the user does not have yet
///
/// Names come from the `default_categories` setting when present.
/// Returns the number of categories created.
pub async fn ensure_default_categories(db: &Pool<Sqlite>, user_id: Uuid) -> Result<usize> {
    let names: Vec<String> = match get_setting(db, "default_categories").await? {
        Some(json) => serde_json::from_str(&json).unwrap_or_else(|e| {
            warn!("Ignoring malformed default_categories setting: {}", e);
            DEFAULT_CATEGORIES.iter().map(|s| s.to_string()).collect()
        }),
        None => DEFAULT_CATEGORIES.iter().map(|s| s.to_string()).collect(),
    };

    let existing: HashSet<String> = list_categories(db, user_id)
        .await?
        .into_iter()
        .map(|c| c.name)
        .collect();

    let mut created = 0;
    for name in names.iter().filter(|n| !existing.contains(*n)) {
        create_category(db, user_id, name).await?;
        created += 1;
    }

    if created > 0 {
        info!("Created {} default categories", created);
    }
    Ok(created)
}

pub async fn create_category(db: &Pool<Sqlite>, user_id: Uuid, name: &str) -> Result<Uuid> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(Error::Validation("Category name required".to_string()));
    }

    let id = uuid_utils::generate();
    sqlx::query("INSERT INTO categories (guid, user_guid, name, created_at) VALUES (?, ?, ?, ?)")
        .bind(id.to_string())
        .bind(user_id.to_string())
        .bind(trimmed)
        .bind(time::to_db_string(&time::now()))
        .execute(db)
        .await?;

    Ok(id)
}

pub async fn create_series(
    db: &Pool<Sqlite>,
    user_id: Uuid,
    name: &str,
    category_id: Uuid,
) -> Result<Uuid> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(Error::Validation("Series name required".to_string()));
    }
    ensure_category_exists(db, user_id, category_id).await?;

    let id = uuid_utils::generate();
    sqlx::query(
        "INSERT INTO series (guid, user_guid, category_guid, name, created_at) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(id.to_string())
    .bind(user_id.to_string())
    .bind(category_id.to_string())
    .bind(trimmed)
    .bind(time::to_db_string(&time::now()))
    .execute(db)
    .await?;

    Ok(id)
}

/// Categories of a user ordered by name
pub async fn list_categories(db: &Pool<Sqlite>, user_id: Uuid) -> Result<Vec<Category>> {
    let rows = sqlx::query_as::<_, CategoryRow>(
        "SELECT guid, user_guid, name FROM categories WHERE user_guid = ? ORDER BY name",
    )
    .bind(user_id.to_string())
    .fetch_all(db)
    .await?;

    rows.into_iter().map(Category::from_db).collect()
}

/// Series of a user ordered by name
pub async fn list_series(db: &Pool<Sqlite>, user_id: Uuid) -> Result<Vec<Series>> {
    let rows = sqlx::query_as::<_, SeriesRow>(
        "SELECT guid, user_guid, category_guid, name FROM series WHERE user_guid = ? ORDER BY name",
    )
    .bind(user_id.to_string())
    .fetch_all(db)
    .await?;

    rows.into_iter().map(Series::from_db).collect()
}

async fn ensure_category_exists(db: &Pool<Sqlite>, user_id: Uuid, category_id: Uuid) -> Result<()> {
    let exists: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM categories WHERE guid = ? AND user_guid = ?)",
    )
    .bind(category_id.to_string())
    .bind(user_id.to_string())
    .fetch_one(db)
    .await?;

    if exists {
        Ok(())
    } else {
        Err(Error::NotFound(format!("Category {}", category_id)))
    }
}

/// Reject an item before anything is written
///
/// A series must belong to the same category as the item.
async fn validate_item(db: &Pool<Sqlite>, user_id: Uuid, item: &NewItem) -> Result<()> {
    if item.title.trim().is_empty() {
        return Err(Error::Validation("Title required".to_string()));
    }

    if let Some(rating) = item.rating {
        if !(0.0..=5.0).contains(&rating) {
            return Err(Error::Validation(format!("Rating must be between 0 and 5, got {}", rating)));
        }
    }

    if let Some(url) = item.thumbnail() {
        if !is_web_url(url) {
            return Err(Error::Validation(format!("Thumbnail must be an http(s) URL, got '{}'", url)));
        }
    }

    ensure_category_exists(db, user_id, item.category_id).await?;

    if let Some(series_id) = item.series_id {
        let series_category: Option<String> = sqlx::query_scalar(
            "SELECT category_guid FROM series WHERE guid = ? AND user_guid = ?",
        )
        .bind(series_id.to_string())
        .bind(user_id.to_string())
        .fetch_optional(db)
        .await?;

        let Some(series_category) = series_category else {
            return Err(Error::NotFound(format!("Series {}", series_id)));
        };

        if uuid_utils::parse(&series_category)? != item.category_id {
            return Err(Error::Validation(
                "Selected series does not belong to the selected category".to_string(),
            ));
        }
    }

    Ok(())
}

fn is_web_url(url: &str) -> bool {
    let lower = url.to_ascii_lowercase();
    let rest = lower
        .strip_prefix("https://")
        .or_else(|| lower.strip_prefix("http://"));

    match rest {
        Some(rest) => {
            let host = rest.split(['/', '?', '#']).next().unwrap_or_default();
            !host.is_empty() && !url.chars().any(char::is_whitespace)
        }
        None => false,
    }
}

fn completed_at_for(status: ItemStatus) -> Option<String> {
    (status == ItemStatus::Completed).then(|| time::to_db_string(&time::now()))
}

/// Create an item and append it to the end of its two scopes
pub async fn create_item(db: &Pool<Sqlite>, user_id: Uuid, item: NewItem) -> Result<Uuid> {
    validate_item(db, user_id, &item).await?;

    let id = uuid_utils::generate();
    let now = time::to_db_string(&time::now());
    let tags = serde_json::to_string(&item.tags)
        .map_err(|e| Error::Internal(format!("Failed to encode tags: {}", e)))?;

    let mut tx = db.begin().await?;

    sqlx::query(&format!(
        "INSERT INTO items ({}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        ITEM_COLUMNS
    ))
    .bind(id.to_string())
    .bind(user_id.to_string())
    .bind(item.title.trim())
    .bind(item.category_id.to_string())
    .bind(item.series_id.map(|s| s.to_string()))
    .bind(item.status.as_str())
    .bind(item.rating)
    .bind(&item.review_text)
    .bind(&item.why_interested)
    .bind(item.availability_end.map(|d| d.format("%Y-%m-%d").to_string()))
    .bind(completed_at_for(item.status))
    .bind(item.thumbnail())
    .bind(&tags)
    .bind(&now)
    .bind(&now)
    .execute(&mut *tx)
    .await?;

    for scope in [Scope::Global, Scope::Category(item.category_id)] {
        let position = next_position(&mut *tx, user_id, scope).await?;
        insert_row(&mut *tx, &OrderRow::new(user_id, scope, id, position)).await?;
    }

    tx.commit().await?;

    info!("Created item {} in category {}", id, item.category_id);
    Ok(id)
}

/// Replace an item's editable fields
///
/// Order rows are left alone: after a category change the item is unranked
/// in its new category scope until that scope is next reordered.
pub async fn update_item(db: &Pool<Sqlite>, user_id: Uuid, item_id: Uuid, item: NewItem) -> Result<()> {
    validate_item(db, user_id, &item).await?;

    let tags = serde_json::to_string(&item.tags)
        .map_err(|e| Error::Internal(format!("Failed to encode tags: {}", e)))?;

    let result = sqlx::query(
        r#"
        UPDATE items
        SET title = ?, category_guid = ?, series_guid = ?, status = ?, rating = ?,
            review_text = ?, why_interested = ?, availability_end = ?, completed_at = ?,
            thumbnail_url = ?, tags = ?, updated_at = ?
        WHERE guid = ? AND user_guid = ?
        "#,
    )
    .bind(item.title.trim())
    .bind(item.category_id.to_string())
    .bind(item.series_id.map(|s| s.to_string()))
    .bind(item.status.as_str())
    .bind(item.rating)
    .bind(&item.review_text)
    .bind(&item.why_interested)
    .bind(item.availability_end.map(|d| d.format("%Y-%m-%d").to_string()))
    .bind(completed_at_for(item.status))
    .bind(item.thumbnail())
    .bind(&tags)
    .bind(time::to_db_string(&time::now()))
    .bind(item_id.to_string())
    .bind(user_id.to_string())
    .execute(db)
    .await?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!("Item {}", item_id)));
    }
    Ok(())
}

/// Set status; `completed_at` is stamped on completion and cleared otherwise
pub async fn update_status(
    db: &Pool<Sqlite>,
    user_id: Uuid,
    item_id: Uuid,
    status: ItemStatus,
) -> Result<()> {
    let result = sqlx::query(
        "UPDATE items SET status = ?, completed_at = ?, updated_at = ? WHERE guid = ? AND user_guid = ?",
    )
    .bind(status.as_str())
    .bind(completed_at_for(status))
    .bind(time::to_db_string(&time::now()))
    .bind(item_id.to_string())
    .bind(user_id.to_string())
    .execute(db)
    .await?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!("Item {}", item_id)));
    }

    info!("Item {} status set to {}", item_id, status);
    Ok(())
}

pub async fn get_item(db: &Pool<Sqlite>, user_id: Uuid, item_id: Uuid) -> Result<Item> {
    let row = sqlx::query_as::<_, ItemRow>(&format!(
        "SELECT {} FROM items WHERE guid = ? AND user_guid = ?",
        ITEM_COLUMNS
    ))
    .bind(item_id.to_string())
    .bind(user_id.to_string())
    .fetch_optional(db)
    .await?
    .ok_or_else(|| Error::NotFound(format!("Item {}", item_id)))?;

    Item::from_db(row)
}

/// Items of a user with any of the given statuses (all when empty), oldest
/// first
pub async fn list_items(
    db: &Pool<Sqlite>,
    user_id: Uuid,
    statuses: &[ItemStatus],
) -> Result<Vec<Item>> {
    let status_filter = if statuses.is_empty() {
        String::new()
    } else {
        format!(" AND status IN ({})", vec!["?"; statuses.len()].join(", "))
    };

    let sql = format!(
        "SELECT {} FROM items WHERE user_guid = ?{} ORDER BY created_at ASC",
        ITEM_COLUMNS, status_filter
    );

    let mut query = sqlx::query_as::<_, ItemRow>(&sql).bind(user_id.to_string());
    for status in statuses {
        query = query.bind(status.as_str());
    }

    let rows = query.fetch_all(db).await?;
    rows.into_iter().map(Item::from_db).collect()
}

/// Items shown on the priority board
pub async fn list_active_items(db: &Pool<Sqlite>, user_id: Uuid) -> Result<Vec<Item>> {
    list_items(db, user_id, &ItemStatus::ACTIVE).await
}

/// Completed items, most recently completed first
pub async fn list_completed_items(db: &Pool<Sqlite>, user_id: Uuid) -> Result<Vec<Item>> {
    let mut items = list_items(db, user_id, &[ItemStatus::Completed]).await?;
    items.sort_by(|a, b| b.completed_at.cmp(&a.completed_at));
    Ok(items)
}
