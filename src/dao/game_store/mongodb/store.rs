use std::sync::Arc;

use futures::{TryStreamExt, future::BoxFuture};
use mongodb::{Collection, Database, bson::doc, options::IndexOptions};
use tokio::sync::RwLock;

use super::{
    config::MongoConfig,
    connection::establish_connection,
    error::{MongoDaoError, MongoResult},
    models::{CATALOG_DOCUMENT_ID, MongoCatalogDocument, MongoEventDocument},
};
use crate::dao::{
    game_store::GameStore,
    models::{AiCatalogEntity, EventEntity, EventId},
    storage::StorageResult,
};

const EVENT_COLLECTION_NAME: &str = "events";
const CATALOG_COLLECTION_NAME: &str = "ai_catalog";

/// MongoDB-backed store keeping one document per event plus one catalog document.
#[derive(Clone)]
pub struct MongoGameStore {
    inner: Arc<MongoInner>,
}

struct MongoInner {
    state: RwLock<MongoState>,
    config: MongoConfig,
}

struct MongoState {
    database: Database,
}

impl MongoInner {
    async fn ping(&self) -> MongoResult<()> {
        let database = {
            let guard = self.state.read().await;
            guard.database.clone()
        };

        database
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|source| MongoDaoError::HealthPing { source })?;
        Ok(())
    }

    async fn reconnect(&self) -> MongoResult<()> {
        let database =
            establish_connection(&self.config.options, &self.config.database_name).await?;
        self.state.write().await.database = database;
        Ok(())
    }
}

impl MongoGameStore {
    /// Establish a connection to MongoDB and ensure indexes are present.
    pub async fn connect(config: MongoConfig) -> MongoResult<Self> {
        let database = establish_connection(&config.options, &config.database_name).await?;

        let inner = Arc::new(MongoInner {
            state: RwLock::new(MongoState { database }),
            config,
        });

        let store = Self { inner };
        store.ensure_indexes().await?;
        Ok(store)
    }

    async fn ensure_indexes(&self) -> MongoResult<()> {
        let collection = self.events().await;
        let index = mongodb::IndexModel::builder()
            .keys(doc! {"event.login": 1})
            .options(
                IndexOptions::builder()
                    .name(Some("event_login_idx".to_owned()))
                    .build(),
            )
            .build();

        collection
            .create_index(index)
            .await
            .map_err(|source| MongoDaoError::EnsureIndex {
                collection: EVENT_COLLECTION_NAME,
                index: "event.login",
                source,
            })?;

        Ok(())
    }

    async fn events(&self) -> Collection<MongoEventDocument> {
        let guard = self.inner.state.read().await;
        guard
            .database
            .collection::<MongoEventDocument>(EVENT_COLLECTION_NAME)
    }

    async fn catalog(&self) -> Collection<MongoCatalogDocument> {
        let guard = self.inner.state.read().await;
        guard
            .database
            .collection::<MongoCatalogDocument>(CATALOG_COLLECTION_NAME)
    }

    async fn save_event(&self, event: EventEntity) -> MongoResult<()> {
        let id = event.event.id;
        let document: MongoEventDocument = event.into();
        self.events()
            .await
            .replace_one(doc! { "_id": i64::from(id) }, &document)
            .upsert(true)
            .await
            .map_err(|source| MongoDaoError::SaveEvent { id, source })?;
        Ok(())
    }

    async fn delete_event(&self, id: EventId) -> MongoResult<bool> {
        let result = self
            .events()
            .await
            .delete_one(doc! { "_id": i64::from(id) })
            .await
            .map_err(|source| MongoDaoError::DeleteEvent { id, source })?;
        Ok(result.deleted_count > 0)
    }

    async fn list_events(&self) -> MongoResult<Vec<EventEntity>> {
        let documents: Vec<MongoEventDocument> = self
            .events()
            .await
            .find(doc! {})
            .sort(doc! { "_id": 1 })
            .await
            .map_err(|source| MongoDaoError::ListEvents { source })?
            .try_collect()
            .await
            .map_err(|source| MongoDaoError::ListEvents { source })?;

        Ok(documents.into_iter().map(Into::into).collect())
    }

    async fn save_catalog(&self, catalog: AiCatalogEntity) -> MongoResult<()> {
        let document: MongoCatalogDocument = catalog.into();
        self.catalog()
            .await
            .replace_one(doc! { "_id": CATALOG_DOCUMENT_ID }, &document)
            .upsert(true)
            .await
            .map_err(|source| MongoDaoError::SaveCatalog { source })?;
        Ok(())
    }

    async fn load_catalog(&self) -> MongoResult<Option<AiCatalogEntity>> {
        let document = self
            .catalog()
            .await
            .find_one(doc! { "_id": CATALOG_DOCUMENT_ID })
            .await
            .map_err(|source| MongoDaoError::LoadCatalog { source })?;
        Ok(document.map(|doc| doc.body))
    }
}

impl GameStore for MongoGameStore {
    fn save_event(&self, event: EventEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.save_event(event).await.map_err(Into::into) })
    }

    fn delete_event(&self, id: EventId) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move { store.delete_event(id).await.map_err(Into::into) })
    }

    fn list_events(&self) -> BoxFuture<'static, StorageResult<Vec<EventEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.list_events().await.map_err(Into::into) })
    }

    fn save_catalog(&self, catalog: AiCatalogEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.save_catalog(catalog).await.map_err(Into::into) })
    }

    fn load_catalog(&self) -> BoxFuture<'static, StorageResult<Option<AiCatalogEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.load_catalog().await.map_err(Into::into) })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.ping().await.map_err(Into::into) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.reconnect().await.map_err(Into::into) })
    }
}
