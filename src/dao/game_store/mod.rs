pub mod memory;
#[cfg(feature = "mongo-store")]
pub mod mongodb;

use crate::dao::models::{AiCatalogEntity, EventEntity, EventId};
use crate::dao::storage::StorageResult;
use futures::future::BoxFuture;

/// Abstraction over the persistence layer for event aggregates and the AI question catalog.
///
/// Every write replaces the whole document so a committed aggregate is never partially applied.
pub trait GameStore: Send + Sync {
    fn save_event(&self, event: EventEntity) -> BoxFuture<'static, StorageResult<()>>;
    fn delete_event(&self, id: EventId) -> BoxFuture<'static, StorageResult<bool>>;
    fn list_events(&self) -> BoxFuture<'static, StorageResult<Vec<EventEntity>>>;
    fn save_catalog(&self, catalog: AiCatalogEntity) -> BoxFuture<'static, StorageResult<()>>;
    fn load_catalog(&self) -> BoxFuture<'static, StorageResult<Option<AiCatalogEntity>>>;
    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;
    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>>;
}
