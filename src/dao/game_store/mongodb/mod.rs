//! MongoDB backend: one document per event plus a single catalog document.

mod config;
mod connection;
mod error;
mod models;
pub mod store;

pub use config::MongoConfig;
pub use error::MongoDaoError;
pub use store::MongoGameStore;

use crate::dao::storage::{StorageError, StorageResult};

impl From<MongoDaoError> for StorageError {
    fn from(err: MongoDaoError) -> Self {
        StorageError::unavailable(err.to_string(), err)
    }
}

/// Parse `uri`, connect and wait for the database to answer.
pub async fn connect(uri: &str, db_name: Option<&str>) -> StorageResult<MongoGameStore> {
    let config = MongoConfig::from_uri(uri, db_name).await?;
    Ok(MongoGameStore::connect(config).await?)
}
