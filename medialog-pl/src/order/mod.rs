//! Priority list ordering engine
//!
//! Pure, synchronous transforms from stored order rows and item records to
//! a presented order, its block grouping, and the new order produced by a
//! drag gesture. Nothing here touches storage; see [`crate::sync`] for that.

pub mod blocks;
pub mod maps;
pub mod reorder;

pub use blocks::{block_index, group_blocks, Block, BlockKey};
pub use maps::{compare_items, order_index, sort_by_order, OrderMaps, PositionMap, Rank};
pub use medialog_common::events::{Scope, ScopeKind};
pub use reorder::{array_move, compute_reorder, DragId, Reorder, SERIES_HANDLE_PREFIX};

use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use medialog_common::db::ListOrderRow;
use medialog_common::uuid_utils;
use uuid::Uuid;

/// The fields of an item that ordering and grouping depend on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemKey {
    pub id: Uuid,
    pub category_id: Uuid,
    pub series_id: Option<Uuid>,
    /// Tiebreaker between equal positions, oldest first
    pub created_at: DateTime<Utc>,
}

/// One stored position in a priority list scope
///
/// Carries the raw scope kind and category key rather than a [`Scope`] so
/// that malformed rows (category kind without a category key) survive
/// loading and can be skipped by [`OrderMaps::build`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderRow {
    pub user_id: Uuid,
    pub scope_kind: ScopeKind,
    pub category_id: Option<Uuid>,
    pub item_id: Uuid,
    /// 1-based position within the scope
    pub position: i64,
}

impl OrderRow {
    /// Build a well-formed row for a scope
    pub fn new(user_id: Uuid, scope: Scope, item_id: Uuid, position: i64) -> Self {
        Self {
            user_id,
            scope_kind: scope.kind(),
            category_id: scope.category_id(),
            item_id,
            position,
        }
    }

    /// Scope this row belongs to, or None for a category row without a key
    pub fn scope(&self) -> Option<Scope> {
        match (self.scope_kind, self.category_id) {
            (ScopeKind::Global, _) => Some(Scope::Global),
            (ScopeKind::Category, Some(id)) => Some(Scope::Category(id)),
            (ScopeKind::Category, None) => None,
        }
    }

    /// Convert a database row, parsing ids and scope kind
    pub fn from_db(row: ListOrderRow) -> Result<Self> {
        let scope_kind = ScopeKind::from_str(&row.scope_kind)
            .ok_or_else(|| Error::InvalidId(format!("Unknown scope kind: {}", row.scope_kind)))?;

        Ok(Self {
            user_id: uuid_utils::parse(&row.user_guid)?,
            scope_kind,
            category_id: uuid_utils::parse_optional(row.category_guid.as_deref())?,
            item_id: uuid_utils::parse(&row.item_guid)?,
            position: row.position,
        })
    }
}

/// Rows assigning dense 1-based positions to an ordered id list
pub fn dense_rows(user_id: Uuid, scope: Scope, ordered_ids: &[Uuid]) -> Vec<OrderRow> {
    ordered_ids
        .iter()
        .enumerate()
        .map(|(idx, item_id)| OrderRow::new(user_id, scope, *item_id, idx as i64 + 1))
        .collect()
}
