//! Database models
//!
//! Rows as stored: ids are text UUIDs and timestamps RFC 3339 text.
//! Typed conversions live with the queries that use them.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct CategoryRow {
    pub guid: String,
    pub user_guid: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct SeriesRow {
    pub guid: String,
    pub user_guid: String,
    pub category_guid: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ItemRow {
    pub guid: String,
    pub user_guid: String,
    pub title: String,
    pub category_guid: String,
    pub series_guid: Option<String>,
    pub status: String,
    pub rating: Option<f64>,
    pub review_text: Option<String>,
    pub why_interested: Option<String>,
    pub availability_end: Option<String>,
    pub completed_at: Option<String>,
    pub thumbnail_url: Option<String>,
    /// JSON array of tag strings
    pub tags: String,
    pub created_at: String,
    pub updated_at: String,
}

/// One stored position in a priority list
///
/// `scope_kind` is `"global"` or `"category"`; `category_guid` is NULL for
/// the global scope.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ListOrderRow {
    pub user_guid: String,
    pub scope_kind: String,
    pub category_guid: Option<String>,
    pub item_guid: String,
    pub position: i64,
}
