use std::error::Error;

use thiserror::Error;

/// Result alias for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Failure reported by a storage backend.
///
/// The state engine treats every backend failure as the store being unreachable:
/// the commit is refused and the supervisor decides whether to reconnect.
#[derive(Debug, Error)]
#[error("storage unavailable: {context}")]
pub struct StorageError {
    context: String,
    #[source]
    source: Box<dyn Error + Send + Sync>,
}

impl StorageError {
    pub fn unavailable(context: impl Into<String>, source: impl Error + Send + Sync + 'static) -> Self {
        Self {
            context: context.into(),
            source: Box::new(source),
        }
    }
}
