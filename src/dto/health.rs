use serde::Serialize;
use utoipa::ToSchema;

/// Body of `/healthcheck`.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// `ok`, or `degraded` while writes are refused.
    pub status: &'static str,
    /// Events currently loaded in memory.
    pub events: usize,
    /// Whether a storage backend is installed.
    pub storage_connected: bool,
}

impl HealthResponse {
    pub fn build(degraded: bool, events: usize, storage_connected: bool) -> Self {
        Self {
            status: if degraded { "degraded" } else { "ok" },
            events,
            storage_connected,
        }
    }
}
