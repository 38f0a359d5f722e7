//! Priority board view model
//!
//! Holds the active items with a local order per scope, applies drag
//! gestures to the local order right away, and reconciles the result of
//! each sync once the queue reports back.

use crate::db::{items, OrderStore};
use crate::error::Result;
use crate::order::{
    compute_reorder, group_blocks, sort_by_order, Block, DragId, ItemKey, OrderMaps, OrderRow,
    Reorder, Scope,
};
use crate::sync::SyncOutcome;
use sqlx::{Pool, Sqlite};
use std::collections::{BTreeSet, HashMap};
use tracing::{debug, info, warn};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct PriorityBoard {
    items: HashMap<Uuid, ItemKey>,
    /// What the user currently sees, per scope
    local: HashMap<Scope, Vec<Uuid>>,
    /// Last order known to be stored, per scope
    confirmed: HashMap<Scope, Vec<Uuid>>,
    filter: Scope,
}

impl PriorityBoard {
    /// Build the board from active items and the user's stored order rows
    ///
    /// Every category with at least one item gets its own order, even when
    /// no rows were ever stored for it.
    pub fn new(items: Vec<ItemKey>, rows: &[OrderRow]) -> Self {
        let maps = OrderMaps::build(rows);
        let mut local = HashMap::new();

        let global: Vec<Uuid> = sort_by_order(&items, maps.positions(Scope::Global))
            .iter()
            .map(|item| item.id)
            .collect();
        local.insert(Scope::Global, global);

        let categories: BTreeSet<Uuid> = items.iter().map(|item| item.category_id).collect();
        for category_id in categories {
            let scope = Scope::Category(category_id);
            let members: Vec<ItemKey> = items
                .iter()
                .filter(|item| item.category_id == category_id)
                .cloned()
                .collect();
            let order = sort_by_order(&members, maps.positions(scope))
                .iter()
                .map(|item| item.id)
                .collect();
            local.insert(scope, order);
        }

        Self {
            items: items.into_iter().map(|item| (item.id, item)).collect(),
            confirmed: local.clone(),
            local,
            filter: Scope::Global,
        }
    }

    /// Load active items and stored rows for `user_id`
    pub async fn load<S>(db: &Pool<Sqlite>, store: &S, user_id: Uuid) -> Result<Self>
    where
        S: OrderStore + ?Sized,
    {
        let active = items::list_active_items(db, user_id).await?;
        let rows = store.list_order_rows(user_id).await?;
        info!("Loaded {} active items and {} order rows", active.len(), rows.len());

        Ok(Self::new(active.iter().map(items::Item::key).collect(), &rows))
    }

    pub fn filter(&self) -> Scope {
        self.filter
    }

    /// Switch the visible scope: global or one category
    pub fn set_filter(&mut self, scope: Scope) {
        self.filter = scope;
    }

    /// Local order of a scope; empty for a category with no active items
    pub fn order(&self, scope: Scope) -> &[Uuid] {
        self.local.get(&scope).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn confirmed_order(&self, scope: Scope) -> &[Uuid] {
        self.confirmed.get(&scope).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Local order of the filtered scope
    pub fn current_order(&self) -> &[Uuid] {
        self.order(self.filter)
    }

    /// Items of the filtered scope in presented order
    pub fn visible_items(&self) -> Vec<ItemKey> {
        self.current_order()
            .iter()
            .filter_map(|id| self.items.get(id))
            .cloned()
            .collect()
    }

    /// Blocks of the visible items; recomputed on every call
    pub fn blocks(&self) -> Vec<Block> {
        group_blocks(&self.visible_items())
    }

    /// Apply a drop to the filtered scope's local order
    ///
    /// Returns the scope and its new order for the caller to sync, or None
    /// when the drop changes nothing.
    pub fn apply_drag(&mut self, moved: &DragId, target: &DragId) -> Option<(Scope, Vec<Uuid>)> {
        let scope = self.filter;
        let blocks = self.blocks();

        match compute_reorder(self.current_order(), &blocks, moved, target) {
            Reorder::Unchanged => {
                debug!("Drop of {} onto {} leaves {} unchanged", moved, target, scope);
                None
            }
            Reorder::Moved(next) => {
                self.local.insert(scope, next.clone());
                Some((scope, next))
            }
        }
    }

    /// Fold a sync outcome back into the board
    ///
    /// A failed order is rolled back to the last confirmed order, unless a
    /// later gesture has already replaced it locally. Returns true when the
    /// local order was rolled back.
    pub fn reconcile(&mut self, scope: Scope, submitted: &[Uuid], outcome: &SyncOutcome) -> bool {
        match outcome {
            SyncOutcome::Persisted(order) => {
                self.confirmed.insert(scope, order.clone());
                false
            }
            SyncOutcome::Superseded => false,
            SyncOutcome::Failed(message) => {
                if self.order(scope) != submitted {
                    debug!("Sync of {} failed but a newer order is pending", scope);
                    return false;
                }
                warn!("Rolling back {} after failed sync: {}", scope, message);
                let confirmed = self.confirmed_order(scope).to_vec();
                self.local.insert(scope, confirmed);
                true
            }
        }
    }
}
