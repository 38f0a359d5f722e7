//! Persistence sync against a SQLite database on disk

use async_trait::async_trait;
use medialog_common::db::{init_database, LOCAL_USER_GUID};
use medialog_common::events::{EventBus, MedialogEvent};
use medialog_pl::db::{OrderStore, SqliteOrderStore};
use medialog_pl::order::{OrderRow, Scope};
use medialog_pl::{sync_scope, Error, Result, SyncOutcome, SyncQueue};
use sqlx::SqlitePool;
use std::sync::Arc;
use tempfile::TempDir;
use tokio::sync::Semaphore;
use uuid::Uuid;

async fn setup() -> (TempDir, SqlitePool, Uuid) {
    let dir = TempDir::new().unwrap();
    let pool = init_database(&dir.path().join("medialog.db")).await.unwrap();
    (dir, pool, Uuid::parse_str(LOCAL_USER_GUID).unwrap())
}

fn ids(n: usize) -> Vec<Uuid> {
    (0..n).map(|_| Uuid::new_v4()).collect()
}

/// Stored (item, position) pairs of one scope in position order
async fn stored(store: &SqliteOrderStore, user: Uuid, scope: Scope) -> Vec<(Uuid, i64)> {
    let mut rows: Vec<(Uuid, i64)> = store
        .list_order_rows(user)
        .await
        .unwrap()
        .into_iter()
        .filter(|r| r.scope() == Some(scope))
        .map(|r| (r.item_id, r.position))
        .collect();
    rows.sort_by_key(|(_, position)| *position);
    rows
}

#[tokio::test]
async fn test_sync_writes_dense_positions() {
    let (_dir, pool, user) = setup().await;
    let store = SqliteOrderStore::new(pool);
    let order = ids(4);

    // Sparse positions from an earlier state must not survive
    let stale: Vec<OrderRow> = order
        .iter()
        .enumerate()
        .map(|(i, id)| OrderRow::new(user, Scope::Global, *id, (i as i64 + 1) * 10))
        .collect();
    store.insert_order_rows(&stale).await.unwrap();

    let reversed: Vec<Uuid> = order.iter().rev().copied().collect();
    sync_scope(&store, user, Scope::Global, &reversed).await.unwrap();

    let expected: Vec<(Uuid, i64)> = reversed
        .iter()
        .enumerate()
        .map(|(i, id)| (*id, i as i64 + 1))
        .collect();
    assert_eq!(stored(&store, user, Scope::Global).await, expected);
}

#[tokio::test]
async fn test_sync_is_idempotent() {
    let (_dir, pool, user) = setup().await;
    let store = SqliteOrderStore::new(pool);
    let scope = Scope::Category(Uuid::new_v4());
    let order = ids(3);

    sync_scope(&store, user, scope, &order).await.unwrap();
    let first = stored(&store, user, scope).await;
    sync_scope(&store, user, scope, &order).await.unwrap();

    assert_eq!(stored(&store, user, scope).await, first);
}

#[tokio::test]
async fn test_category_sync_leaves_other_scopes_alone() {
    let (_dir, pool, user) = setup().await;
    let store = SqliteOrderStore::new(pool);
    let games = Scope::Category(Uuid::new_v4());
    let movies = Scope::Category(Uuid::new_v4());

    let global = ids(3);
    let movie_order = ids(2);
    sync_scope(&store, user, Scope::Global, &global).await.unwrap();
    sync_scope(&store, user, movies, &movie_order).await.unwrap();
    sync_scope(&store, user, games, &ids(2)).await.unwrap();

    let global_before = stored(&store, user, Scope::Global).await;
    let movies_before = stored(&store, user, movies).await;

    sync_scope(&store, user, games, &ids(5)).await.unwrap();

    assert_eq!(stored(&store, user, Scope::Global).await, global_before);
    assert_eq!(stored(&store, user, movies).await, movies_before);
    assert_eq!(stored(&store, user, games).await.len(), 5);
}

#[tokio::test]
async fn test_global_sync_leaves_category_rows() {
    let (_dir, pool, user) = setup().await;
    let store = SqliteOrderStore::new(pool);
    let category = Scope::Category(Uuid::new_v4());
    let shared = ids(2);

    sync_scope(&store, user, category, &shared).await.unwrap();
    sync_scope(&store, user, Scope::Global, &[]).await.unwrap();

    assert!(stored(&store, user, Scope::Global).await.is_empty());
    assert_eq!(stored(&store, user, category).await.len(), 2);
}

#[tokio::test]
async fn test_duplicate_order_rejected_without_mutation() {
    let (_dir, pool, user) = setup().await;
    let store = SqliteOrderStore::new(pool);
    let order = ids(2);
    sync_scope(&store, user, Scope::Global, &order).await.unwrap();

    let result = sync_scope(&store, user, Scope::Global, &[order[0], order[0]]).await;

    assert!(matches!(result, Err(Error::Validation(_))));
    assert_eq!(stored(&store, user, Scope::Global).await.len(), 2);
}

/// Wraps the SQLite store; every delete waits for a permit
struct GatedStore {
    inner: SqliteOrderStore,
    gate: Arc<Semaphore>,
}

#[async_trait]
impl OrderStore for GatedStore {
    async fn list_order_rows(&self, user_id: Uuid) -> Result<Vec<OrderRow>> {
        self.inner.list_order_rows(user_id).await
    }

    async fn delete_order_rows(&self, user_id: Uuid, scope: Scope) -> Result<u64> {
        let permit = self
            .gate
            .acquire()
            .await
            .map_err(|e| Error::Internal(e.to_string()))?;
        permit.forget();
        self.inner.delete_order_rows(user_id, scope).await
    }

    async fn insert_order_rows(&self, rows: &[OrderRow]) -> Result<()> {
        self.inner.insert_order_rows(rows).await
    }
}

#[tokio::test]
async fn test_queue_supersedes_pending_order() {
    let (_dir, pool, user) = setup().await;
    let gate = Arc::new(Semaphore::new(0));
    let store = Arc::new(GatedStore {
        inner: SqliteOrderStore::new(pool.clone()),
        gate: gate.clone(),
    });
    let bus = EventBus::new(16);
    let mut events = bus.subscribe();
    let queue = SyncQueue::new(store, user, bus);

    let first = ids(2);
    let second = ids(2);
    let third = ids(3);

    // First is in flight (blocked in delete); second parks, third replaces it
    let t1 = queue.submit(Scope::Global, first.clone()).await;
    let t2 = queue.submit(Scope::Global, second).await;
    let t3 = queue.submit(Scope::Global, third.clone()).await;

    assert_eq!(t2.outcome().await, SyncOutcome::Superseded);

    gate.add_permits(2);
    assert_eq!(t1.outcome().await, SyncOutcome::Persisted(first));
    assert_eq!(t3.outcome().await, SyncOutcome::Persisted(third.clone()));

    let plain = SqliteOrderStore::new(pool);
    let final_ids: Vec<Uuid> = stored(&plain, user, Scope::Global)
        .await
        .into_iter()
        .map(|(id, _)| id)
        .collect();
    assert_eq!(final_ids, third);

    let mut kinds = Vec::new();
    for _ in 0..3 {
        kinds.push(events.recv().await.unwrap().event_type());
    }
    assert_eq!(kinds, vec!["OrderSyncSuperseded", "OrderSynced", "OrderSynced"]);
}

#[tokio::test]
async fn test_queue_runs_scopes_independently() {
    let (_dir, pool, user) = setup().await;
    let gate = Arc::new(Semaphore::new(0));
    let store = Arc::new(GatedStore {
        inner: SqliteOrderStore::new(pool),
        gate: gate.clone(),
    });
    let queue = SyncQueue::new(store, user, EventBus::new(16));
    let category = Scope::Category(Uuid::new_v4());

    let global = queue.submit(Scope::Global, ids(1)).await;
    let per_category = queue.submit(category, ids(1)).await;

    let busy = queue.busy_scopes().await;
    assert_eq!(busy.len(), 2);
    assert!(busy.contains(&category));

    gate.add_permits(2);
    assert!(matches!(global.outcome().await, SyncOutcome::Persisted(_)));
    assert!(matches!(per_category.outcome().await, SyncOutcome::Persisted(_)));
}

#[tokio::test]
async fn test_synced_event_carries_scope_and_count() {
    let (_dir, pool, user) = setup().await;
    let bus = EventBus::new(16);
    let mut events = bus.subscribe();
    let queue = SyncQueue::new(Arc::new(SqliteOrderStore::new(pool)), user, bus);
    let scope = Scope::Category(Uuid::new_v4());

    queue.submit(scope, ids(3)).await.outcome().await;

    match events.recv().await.unwrap() {
        MedialogEvent::OrderSynced {
            user_id,
            scope: synced,
            item_count,
            ..
        } => {
            assert_eq!(user_id, user);
            assert_eq!(synced, scope);
            assert_eq!(item_count, 3);
        }
        other => panic!("unexpected event {:?}", other),
    }
}
