//! Persistence sync
//!
//! [`sync_scope`] replaces the stored rows of one scope with a new order.
//! [`SyncQueue`] runs those syncs one at a time per scope: while a sync is in
//! flight only the newest submitted order waits, and anything older is
//! reported as superseded without being written.

use crate::db::OrderStore;
use crate::error::{Error, Result};
use crate::order::{dense_rows, Scope};
use medialog_common::events::{EventBus, MedialogEvent};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::{oneshot, Mutex};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Make the stored rows of `scope` equal `order` with positions 1..N
///
/// Delete then insert, not one transaction: if the insert fails the scope is
/// left empty until the next successful sync. Running twice with the same
/// order leaves the same rows. Returns the number of rows written.
pub async fn sync_scope<S>(store: &S, user_id: Uuid, scope: Scope, order: &[Uuid]) -> Result<usize>
where
    S: OrderStore + ?Sized,
{
    let mut seen = HashSet::with_capacity(order.len());
    if let Some(dup) = order.iter().find(|id| !seen.insert(**id)) {
        return Err(Error::Validation(format!("Item {} appears twice in the new order", dup)));
    }

    let deleted = store.delete_order_rows(user_id, scope).await?;
    debug!("Cleared {} rows from {}", deleted, scope);

    let rows = dense_rows(user_id, scope, order);
    store.insert_order_rows(&rows).await.map_err(|e| {
        warn!("Scope {} left without rows after failed insert: {}", scope, e);
        e
    })?;

    info!("Synced {} items to {}", rows.len(), scope);
    Ok(rows.len())
}

/// Final state of one submitted order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Written; the scope now holds exactly this order
    Persisted(Vec<Uuid>),
    /// Replaced by a newer order before it was written
    Superseded,
    /// Human-readable reason; the scope may be empty or stale
    Failed(String),
}

/// Handle for one submitted order
#[derive(Debug)]
pub struct SyncTicket {
    scope: Scope,
    order: Vec<Uuid>,
    rx: oneshot::Receiver<SyncOutcome>,
}

impl SyncTicket {
    pub fn scope(&self) -> Scope {
        self.scope
    }

    /// The order that was submitted
    pub fn order(&self) -> &[Uuid] {
        &self.order
    }

    /// Wait for the queue to finish with this order
    pub async fn outcome(self) -> SyncOutcome {
        self.rx
            .await
            .unwrap_or_else(|_| SyncOutcome::Failed("Sync worker stopped before finishing".to_string()))
    }
}

struct PendingSync {
    order: Vec<Uuid>,
    reply: oneshot::Sender<SyncOutcome>,
}

/// A scope present in the map has a worker running; `pending` is the order
/// it will write next
#[derive(Default)]
struct ScopeSlot {
    pending: Option<PendingSync>,
}

struct QueueInner {
    store: Arc<dyn OrderStore>,
    user_id: Uuid,
    events: EventBus,
    slots: Mutex<HashMap<Scope, ScopeSlot>>,
}

/// Single-flight sync queue, one worker per busy scope
///
/// Cloning yields another handle to the same queue.
#[derive(Clone)]
pub struct SyncQueue {
    inner: Arc<QueueInner>,
}

impl SyncQueue {
    pub fn new(store: Arc<dyn OrderStore>, user_id: Uuid, events: EventBus) -> Self {
        Self {
            inner: Arc::new(QueueInner {
                store,
                user_id,
                events,
                slots: Mutex::new(HashMap::new()),
            }),
        }
    }

    pub fn user_id(&self) -> Uuid {
        self.inner.user_id
    }

    /// Queue `order` for `scope`
    ///
    /// Starts a worker if the scope is idle, otherwise parks the order as
    /// the scope's pending order, superseding any order already parked.
    pub async fn submit(&self, scope: Scope, order: Vec<Uuid>) -> SyncTicket {
        let (tx, rx) = oneshot::channel();
        let ticket = SyncTicket {
            scope,
            order: order.clone(),
            rx,
        };

        let mut slots = self.inner.slots.lock().await;
        match slots.get_mut(&scope) {
            Some(slot) => {
                let parked = slot.pending.replace(PendingSync { order, reply: tx });
                if let Some(stale) = parked {
                    debug!("Newer order for {} supersedes a pending one", scope);
                    let _ = stale.reply.send(SyncOutcome::Superseded);
                    self.inner.events.emit_lossy(MedialogEvent::OrderSyncSuperseded {
                        user_id: self.inner.user_id,
                        scope,
                        timestamp: chrono::Utc::now(),
                    });
                }
            }
            None => {
                slots.insert(scope, ScopeSlot::default());
                let inner = Arc::clone(&self.inner);
                tokio::spawn(run_worker(inner, scope, PendingSync { order, reply: tx }));
            }
        }

        ticket
    }

    /// Scopes with a sync in flight
    pub async fn busy_scopes(&self) -> Vec<Scope> {
        self.inner.slots.lock().await.keys().copied().collect()
    }
}

async fn run_worker(inner: Arc<QueueInner>, scope: Scope, first: PendingSync) {
    let mut next = Some(first);

    while let Some(job) = next.take() {
        let outcome = match sync_scope(inner.store.as_ref(), inner.user_id, scope, &job.order).await {
            Ok(count) => {
                inner.events.emit_lossy(MedialogEvent::OrderSynced {
                    user_id: inner.user_id,
                    scope,
                    item_count: count,
                    timestamp: chrono::Utc::now(),
                });
                SyncOutcome::Persisted(job.order)
            }
            Err(e) => {
                error!("Sync of {} failed: {}", scope, e);
                let message = e.user_message();
                inner.events.emit_lossy(MedialogEvent::OrderSyncFailed {
                    user_id: inner.user_id,
                    scope,
                    message: message.clone(),
                    timestamp: chrono::Utc::now(),
                });
                SyncOutcome::Failed(message)
            }
        };

        // Receiver may have been dropped; the write stands either way
        let _ = job.reply.send(outcome);

        let mut slots = inner.slots.lock().await;
        next = slots.get_mut(&scope).and_then(|slot| slot.pending.take());
        if next.is_none() {
            slots.remove(&scope);
        }
    }
}
