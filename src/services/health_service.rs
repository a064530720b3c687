use tracing::warn;

use crate::{dto::health::HealthResponse, state::SharedState};

/// Report `ok` or `degraded`, logging storage connectivity issues.
pub async fn health_status(state: &SharedState) -> HealthResponse {
    let store = state.game_store().await;
    match &store {
        Some(store) => {
            if let Err(err) = store.health_check().await {
                warn!(error = %err, "storage health check failed");
            }
        }
        None => warn!("storage unavailable (degraded mode)"),
    }

    HealthResponse::build(
        state.is_degraded().await,
        state.event_ids().len(),
        store.is_some(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::tests::test_state;

    #[tokio::test]
    async fn status_follows_the_store() {
        let (state, _) = test_state().await;
        let healthy = health_status(&state).await;
        assert_eq!(healthy.status, "ok");
        assert_eq!(healthy.events, 1);
        assert!(healthy.storage_connected);

        state.clear_game_store().await;
        let degraded = health_status(&state).await;
        assert_eq!(degraded.status, "degraded");
        assert!(!degraded.storage_connected);
    }
}
