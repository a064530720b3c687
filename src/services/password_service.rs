//! Host management of the event password reveal.

use tracing::info;

use crate::{
    dao::models::{EventId, RevealMode},
    dto::state::PasswordStateView,
    error::ServiceError,
    services::broadcast,
    state::SharedState,
};

/// Replace the secret phrase; only allowed while no round is active.
pub async fn set_password(
    state: &SharedState,
    event_id: EventId,
    raw: &str,
) -> Result<PasswordStateView, ServiceError> {
    let view = state
        .with_event_mut(event_id, |event, ctx| {
            if event.game.phase().is_active() {
                return Err(ServiceError::InvalidState(
                    "password cannot be changed during an active game".into(),
                ));
            }
            event.game.password.set_secret(raw)?;
            broadcast::queue_password(event, ctx);
            Ok(PasswordStateView::build(event))
        })
        .await?;
    info!(event_id, length = view.password.chars().count(), "password changed");
    Ok(view)
}

pub async fn set_mode(
    state: &SharedState,
    event_id: EventId,
    mode: RevealMode,
) -> Result<PasswordStateView, ServiceError> {
    state
        .with_event_mut(event_id, |event, _ctx| {
            event.game.password.mode = mode;
            Ok(PasswordStateView::build(event))
        })
        .await
}

/// Reveal the given positions; out-of-range indices are ignored.
pub async fn reveal_manual(
    state: &SharedState,
    event_id: EventId,
    indices: &[usize],
) -> Result<PasswordStateView, ServiceError> {
    if indices.is_empty() {
        return Err(ServiceError::InvalidInput("no letters selected".into()));
    }
    state
        .with_event_mut(event_id, |event, ctx| {
            event.game.password.reveal_manual(indices);
            broadcast::queue_password(event, ctx);
            Ok(PasswordStateView::build(event))
        })
        .await
}

/// Hide every revealed letter again.
pub async fn hide_all(
    state: &SharedState,
    event_id: EventId,
) -> Result<PasswordStateView, ServiceError> {
    state
        .with_event_mut(event_id, |event, ctx| {
            event.game.password.hide_all();
            broadcast::queue_password(event, ctx);
            Ok(PasswordStateView::build(event))
        })
        .await
}

pub async fn password_state(
    state: &SharedState,
    event_id: EventId,
) -> Result<PasswordStateView, ServiceError> {
    state.read_event(event_id, PasswordStateView::build).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{services::game_service, state::tests::test_state};

    #[tokio::test]
    async fn manual_reveal_unions_and_ignores_out_of_range() {
        let (state, _) = test_state().await;
        set_password(&state, 1, "ab c").await.unwrap();
        reveal_manual(&state, 1, &[0]).await.unwrap();
        let view = reveal_manual(&state, 1, &[3, 42]).await.unwrap();
        assert_eq!(view.revealed_indices, vec![0, 3]);
        assert_eq!(view.displayed_password, "A_  C");

        assert!(matches!(
            reveal_manual(&state, 1, &[]).await,
            Err(ServiceError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn secret_is_locked_while_the_game_runs() {
        let (state, _) = test_state().await;
        game_service::start_game(&state, 1, None).await.unwrap();
        assert!(matches!(
            set_password(&state, 1, "other").await,
            Err(ServiceError::InvalidState(_))
        ));
        assert!(matches!(
            set_password(&state, 1, " ").await,
            Err(ServiceError::InvalidState(_))
        ));
    }

    #[tokio::test]
    async fn new_secret_hides_everything() {
        let (state, _) = test_state().await;
        reveal_manual(&state, 1, &[0, 1]).await.unwrap();
        let view = set_password(&state, 1, " new word ").await.unwrap();
        assert_eq!(view.password, "NEW WORD");
        assert!(view.revealed_indices.is_empty());
        assert!(matches!(
            set_password(&state, 1, "   ").await,
            Err(ServiceError::InvalidInput(_))
        ));
    }
}
