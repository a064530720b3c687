use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use dashmap::DashMap;
use futures::future::BoxFuture;
use thiserror::Error;
use tokio::sync::RwLock;

use crate::dao::{
    game_store::GameStore,
    models::{AiCatalogEntity, EventEntity, EventId},
    storage::{StorageError, StorageResult},
};

#[derive(Debug, Error)]
#[error("in-memory store rejected the write")]
struct RejectedWrite;

/// Process-local store used when no database is configured and by the test-suite.
#[derive(Clone, Default)]
pub struct MemoryGameStore {
    inner: Arc<MemoryInner>,
}

#[derive(Default)]
struct MemoryInner {
    events: DashMap<EventId, EventEntity>,
    catalog: RwLock<Option<AiCatalogEntity>>,
    fail_writes: AtomicBool,
}

impl MemoryGameStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent write fail, simulating a lost database connection.
    pub fn set_fail_writes(&self, fail: bool) {
        self.inner.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Read back the stored copy of an event.
    pub fn stored_event(&self, id: EventId) -> Option<EventEntity> {
        self.inner.events.get(&id).map(|entry| entry.value().clone())
    }

    fn check_writable(&self) -> StorageResult<()> {
        if self.inner.fail_writes.load(Ordering::SeqCst) {
            return Err(StorageError::unavailable("write rejected", RejectedWrite));
        }
        Ok(())
    }
}

impl GameStore for MemoryGameStore {
    fn save_event(&self, event: EventEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            store.check_writable()?;
            store.inner.events.insert(event.event.id, event);
            Ok(())
        })
    }

    fn delete_event(&self, id: EventId) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move {
            store.check_writable()?;
            Ok(store.inner.events.remove(&id).is_some())
        })
    }

    fn list_events(&self) -> BoxFuture<'static, StorageResult<Vec<EventEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let mut events: Vec<EventEntity> = store
                .inner
                .events
                .iter()
                .map(|entry| entry.value().clone())
                .collect();
            events.sort_by_key(|event| event.event.id);
            Ok(events)
        })
    }

    fn save_catalog(&self, catalog: AiCatalogEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            store.check_writable()?;
            *store.inner.catalog.write().await = Some(catalog);
            Ok(())
        })
    }

    fn load_catalog(&self) -> BoxFuture<'static, StorageResult<Option<AiCatalogEntity>>> {
        let store = self.clone();
        Box::pin(async move { Ok(store.inner.catalog.read().await.clone()) })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }
}
