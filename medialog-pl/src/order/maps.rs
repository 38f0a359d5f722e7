//! Order maps: position lookup per scope, and the comparator built on it

use super::{ItemKey, OrderRow, Scope};
use std::cmp::Ordering;
use std::collections::HashMap;
use tracing::debug;
use uuid::Uuid;

/// Item id to stored position within one scope
pub type PositionMap = HashMap<Uuid, i64>;

/// Position lookups for every scope of one user
#[derive(Debug, Clone, Default)]
pub struct OrderMaps {
    pub global: PositionMap,
    pub categories: HashMap<Uuid, PositionMap>,
}

impl OrderMaps {
    /// Route every row to its scope's map in a single pass
    ///
    /// Category rows without a category key are skipped.
    pub fn build(rows: &[OrderRow]) -> Self {
        let mut maps = Self::default();
        let mut skipped = 0usize;

        for row in rows {
            match row.scope() {
                Some(Scope::Global) => {
                    maps.global.insert(row.item_id, row.position);
                }
                Some(Scope::Category(category_id)) => {
                    maps.categories
                        .entry(category_id)
                        .or_default()
                        .insert(row.item_id, row.position);
                }
                None => skipped += 1,
            }
        }

        if skipped > 0 {
            debug!("Skipped {} malformed order rows", skipped);
        }

        maps
    }

    /// Position map of a scope (None when the scope has no rows)
    pub fn positions(&self, scope: Scope) -> Option<&PositionMap> {
        match scope {
            Scope::Global => Some(&self.global),
            Scope::Category(id) => self.categories.get(&id),
        }
    }

    pub fn rank(&self, scope: Scope, item_id: Uuid) -> Rank {
        Rank::of(self.positions(scope), item_id)
    }
}

/// Effective position of an item within a scope
///
/// `Unranked` orders after every `Ranked` value, so items without a stored
/// row fall to the bottom of the list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Rank {
    Ranked(i64),
    Unranked,
}

impl Rank {
    pub fn of(positions: Option<&PositionMap>, item_id: Uuid) -> Self {
        positions
            .and_then(|map| map.get(&item_id))
            .map_or(Rank::Unranked, |position| Rank::Ranked(*position))
    }
}

/// Total order on items within a scope: rank, then creation time (oldest
/// first), then id
pub fn compare_items(a: &ItemKey, b: &ItemKey, positions: Option<&PositionMap>) -> Ordering {
    Rank::of(positions, a.id)
        .cmp(&Rank::of(positions, b.id))
        .then_with(|| a.created_at.cmp(&b.created_at))
        .then_with(|| a.id.cmp(&b.id))
}

/// Items sorted by their position in a scope
pub fn sort_by_order(items: &[ItemKey], positions: Option<&PositionMap>) -> Vec<ItemKey> {
    let mut sorted = items.to_vec();
    sorted.sort_by(|a, b| compare_items(a, b, positions));
    sorted
}

/// Position map from a flat order (index + 1 per id)
pub fn order_index(order: &[Uuid]) -> PositionMap {
    order
        .iter()
        .enumerate()
        .map(|(idx, id)| (*id, idx as i64 + 1))
        .collect()
}
