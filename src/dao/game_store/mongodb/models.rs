use serde::{Deserialize, Serialize};

use crate::dao::models::{AiCatalogEntity, EventEntity, EventId};

pub const CATALOG_DOCUMENT_ID: &str = "ai_catalog";

/// Event aggregate keyed by its numeric identifier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoEventDocument {
    #[serde(rename = "_id")]
    pub id: EventId,
    #[serde(flatten)]
    pub body: EventEntity,
}

impl From<EventEntity> for MongoEventDocument {
    fn from(value: EventEntity) -> Self {
        Self {
            id: value.event.id,
            body: value,
        }
    }
}

impl From<MongoEventDocument> for EventEntity {
    fn from(value: MongoEventDocument) -> Self {
        value.body
    }
}

/// Singleton document holding every AI category and question.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoCatalogDocument {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(flatten)]
    pub body: AiCatalogEntity,
}

impl From<AiCatalogEntity> for MongoCatalogDocument {
    fn from(value: AiCatalogEntity) -> Self {
        Self {
            id: CATALOG_DOCUMENT_ID.to_owned(),
            body: value,
        }
    }
}
