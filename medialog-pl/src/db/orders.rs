//! Order Store
//!
//! Durable mapping from (user, scope) to an ordered list of item ids. The
//! three operations here are the only durability boundary the ordering
//! engine uses.

use crate::error::Result;
use crate::order::{OrderRow, Scope};
use async_trait::async_trait;
use medialog_common::db::ListOrderRow;
use sqlx::{Pool, Sqlite};
use tracing::debug;
use uuid::Uuid;

/// Storage of priority list rows
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// All rows of every scope of one user
    async fn list_order_rows(&self, user_id: Uuid) -> Result<Vec<OrderRow>>;

    /// Delete every row of exactly one scope, returning the number removed
    ///
    /// The global scope matches only rows whose category key is absent.
    async fn delete_order_rows(&self, user_id: Uuid, scope: Scope) -> Result<u64>;

    /// Insert rows; a batch is written completely or not at all
    async fn insert_order_rows(&self, rows: &[OrderRow]) -> Result<()>;
}

/// Order Store backed by the `list_orders` table
#[derive(Debug, Clone)]
pub struct SqliteOrderStore {
    db: Pool<Sqlite>,
}

impl SqliteOrderStore {
    pub fn new(db: Pool<Sqlite>) -> Self {
        Self { db }
    }

    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.db
    }
}

#[async_trait]
impl OrderStore for SqliteOrderStore {
    async fn list_order_rows(&self, user_id: Uuid) -> Result<Vec<OrderRow>> {
        let rows = sqlx::query_as::<_, ListOrderRow>(
            r#"
            SELECT user_guid, scope_kind, category_guid, item_guid, position
            FROM list_orders
            WHERE user_guid = ?
            "#,
        )
        .bind(user_id.to_string())
        .fetch_all(&self.db)
        .await?;

        rows.into_iter().map(OrderRow::from_db).collect()
    }

    async fn delete_order_rows(&self, user_id: Uuid, scope: Scope) -> Result<u64> {
        let result = match scope {
            Scope::Global => {
                sqlx::query(
                    r#"
                    DELETE FROM list_orders
                    WHERE user_guid = ? AND scope_kind = 'global' AND category_guid IS NULL
                    "#,
                )
                .bind(user_id.to_string())
                .execute(&self.db)
                .await?
            }
            Scope::Category(category_id) => {
                sqlx::query(
                    r#"
                    DELETE FROM list_orders
                    WHERE user_guid = ? AND scope_kind = 'category' AND category_guid = ?
                    "#,
                )
                .bind(user_id.to_string())
                .bind(category_id.to_string())
                .execute(&self.db)
                .await?
            }
        };

        debug!("Deleted {} order rows for scope {}", result.rows_affected(), scope);
        Ok(result.rows_affected())
    }

    async fn insert_order_rows(&self, rows: &[OrderRow]) -> Result<()> {
        if rows.is_empty() {
            return Ok(());
        }

        let mut tx = self.db.begin().await?;
        for row in rows {
            insert_row(&mut *tx, row).await?;
        }
        tx.commit().await?;

        debug!("Inserted {} order rows", rows.len());
        Ok(())
    }
}

/// Insert a single row
pub(crate) async fn insert_row<'e, E>(db: E, row: &OrderRow) -> Result<()>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    sqlx::query(
        r#"
        INSERT INTO list_orders (user_guid, scope_kind, category_guid, item_guid, position)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(row.user_id.to_string())
    .bind(row.scope_kind.as_str())
    .bind(row.category_id.map(|id| id.to_string()))
    .bind(row.item_id.to_string())
    .bind(row.position)
    .execute(db)
    .await?;

    Ok(())
}

/// Next free position at the end of a scope (max + 1, or 1 when empty)
///
/// Accepts a pool or an open transaction.
pub async fn next_position<'e, E>(db: E, user_id: Uuid, scope: Scope) -> Result<i64>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    let max: Option<i64> = match scope {
        Scope::Global => {
            sqlx::query_scalar(
                r#"
                SELECT MAX(position) FROM list_orders
                WHERE user_guid = ? AND scope_kind = 'global' AND category_guid IS NULL
                "#,
            )
            .bind(user_id.to_string())
            .fetch_one(db)
            .await?
        }
        Scope::Category(category_id) => {
            sqlx::query_scalar(
                r#"
                SELECT MAX(position) FROM list_orders
                WHERE user_guid = ? AND scope_kind = 'category' AND category_guid = ?
                "#,
            )
            .bind(user_id.to_string())
            .bind(category_id.to_string())
            .fetch_one(db)
            .await?
        }
    };

    Ok(max.unwrap_or(0) + 1)
}
