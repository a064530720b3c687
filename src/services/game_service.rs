//! Host game controls: round lifecycle, clock speed, bonus and languages.

use tracing::info;

use crate::{
    dao::models::EventId,
    dto::state::{GameStateView, LeaderboardEntry, leaderboard},
    error::ServiceError,
    services::broadcast,
    state::{SharedState, event::EventRuntime},
};

/// Highest bonus multiplier a host may set.
pub const MAX_BONUS_MULTIPLIER: u32 = 10;

fn verify_event_password(event: &EventRuntime, password: &str) -> Result<(), ServiceError> {
    if event.record.password != password {
        return Err(ServiceError::Forbidden("invalid event password".into()));
    }
    Ok(())
}

/// Start a new round, wiping every player and their history in the same commit.
pub async fn start_game(
    state: &SharedState,
    event_id: EventId,
    minutes: Option<u32>,
) -> Result<GameStateView, ServiceError> {
    let minutes = minutes.unwrap_or(state.config().rules.default_duration_minutes);
    let view = state
        .with_event_mut(event_id, |event, ctx| {
            event.clear_round();
            event.game.bonus_multiplier = 1;
            event.game.clock.start(ctx.now, minutes)?;
            broadcast::queue_full_refresh(event, ctx);
            Ok(GameStateView::build(event, ctx.now))
        })
        .await?;
    info!(event_id, minutes, "round started");
    Ok(view)
}

pub async fn pause_game(
    state: &SharedState,
    event_id: EventId,
) -> Result<GameStateView, ServiceError> {
    state
        .with_event_mut(event_id, |event, ctx| {
            event.game.clock.pause(ctx.now)?;
            broadcast::queue_game_state(event, ctx);
            Ok(GameStateView::build(event, ctx.now))
        })
        .await
}

pub async fn resume_game(
    state: &SharedState,
    event_id: EventId,
) -> Result<GameStateView, ServiceError> {
    state
        .with_event_mut(event_id, |event, ctx| {
            event.game.clock.resume(ctx.now)?;
            broadcast::queue_game_state(event, ctx);
            Ok(GameStateView::build(event, ctx.now))
        })
        .await
}

/// Change the clock speed; asking for the current speed resets it to 1.
pub async fn set_speed(
    state: &SharedState,
    event_id: EventId,
    speed: u32,
) -> Result<u32, ServiceError> {
    state
        .with_event_mut(event_id, |event, ctx| {
            let speed = event.game.clock.set_speed(speed)?;
            broadcast::queue_game_state(event, ctx);
            Ok(speed)
        })
        .await
}

pub async fn reset_speed(state: &SharedState, event_id: EventId) -> Result<u32, ServiceError> {
    state
        .with_event_mut(event_id, |event, ctx| {
            event.game.clock.reset_speed();
            broadcast::queue_game_state(event, ctx);
            Ok(event.game.clock.speed)
        })
        .await
}

pub async fn set_bonus(
    state: &SharedState,
    event_id: EventId,
    multiplier: u32,
) -> Result<u32, ServiceError> {
    if !(1..=MAX_BONUS_MULTIPLIER).contains(&multiplier) {
        return Err(ServiceError::InvalidInput(format!(
            "bonus multiplier must be between 1 and {MAX_BONUS_MULTIPLIER}"
        )));
    }
    state
        .with_event_mut(event_id, |event, ctx| {
            event.game.bonus_multiplier = multiplier;
            broadcast::queue_game_state(event, ctx);
            Ok(multiplier)
        })
        .await
}

/// Replace the remaining time of the active round.
pub async fn adjust_duration(
    state: &SharedState,
    event_id: EventId,
    minutes: u32,
    password: &str,
) -> Result<GameStateView, ServiceError> {
    state
        .with_event_mut(event_id, |event, ctx| {
            verify_event_password(event, password)?;
            event.game.clock.adjust_duration(ctx.now, minutes)?;
            broadcast::queue_game_state(event, ctx);
            Ok(GameStateView::build(event, ctx.now))
        })
        .await
}

pub async fn stop_game(
    state: &SharedState,
    event_id: EventId,
    password: &str,
) -> Result<GameStateView, ServiceError> {
    let view = state
        .with_event_mut(event_id, |event, ctx| {
            verify_event_password(event, password)?;
            event.game.clock.stop(ctx.now)?;
            broadcast::queue_game_state(event, ctx);
            Ok(GameStateView::build(event, ctx.now))
        })
        .await?;
    info!(event_id, "round stopped by host");
    Ok(view)
}

pub async fn set_languages(
    state: &SharedState,
    event_id: EventId,
    language_player: Option<String>,
    language_host: Option<String>,
) -> Result<GameStateView, ServiceError> {
    state
        .with_event_mut(event_id, |event, ctx| {
            if let Some(language) = language_player {
                event.game.language_player = language;
            }
            if let Some(language) = language_host {
                event.game.language_host = language;
            }
            broadcast::queue_game_state(event, ctx);
            Ok(GameStateView::build(event, ctx.now))
        })
        .await
}

/// Full state snapshot at the current instant.
pub async fn game_state(
    state: &SharedState,
    event_id: EventId,
) -> Result<GameStateView, ServiceError> {
    let now = time::OffsetDateTime::now_utc();
    state
        .read_event(event_id, |event| GameStateView::build(event, now))
        .await
}

pub async fn leaderboard_of(
    state: &SharedState,
    event_id: EventId,
) -> Result<Vec<LeaderboardEntry>, ServiceError> {
    state.read_event(event_id, leaderboard).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        dao::models::{QrColor, QuestionCategory},
        dto::{sse::names, state::GameStatus},
        state::{
            event::tests::{add_code, add_player, add_question},
            tests::test_state,
        },
    };

    #[tokio::test]
    async fn start_wipes_the_round_but_keeps_questions_and_codes() {
        let (state, _) = test_state().await;
        state
            .with_event_mut(1, |event, _| {
                let player = add_player(event, "Ala", 40);
                add_question(event, QuestionCategory::Company);
                add_code(event, "red1", QrColor::Red);
                event.qr_codes["red1"].claimed_by = Some(player);
                event.game.bonus_multiplier = 3;
                Ok(())
            })
            .await
            .unwrap();
        let mut receiver = state.hub().subscribe(1);

        let view = start_game(&state, 1, Some(10)).await.unwrap();

        assert_eq!(view.game_status, GameStatus::Active);
        assert_eq!(view.player_count, 0);
        assert_eq!(view.bonus_multiplier, 1);
        let (questions, claimed) = state
            .read_event(1, |e| (e.questions.len(), e.qr_codes["red1"].claimed_by))
            .await
            .unwrap();
        assert_eq!(questions, 1);
        assert_eq!(claimed, None);

        let first = receiver.recv().await.unwrap();
        assert_eq!(first.event.as_deref(), Some(names::GAME_STATE_UPDATE));
        let second = receiver.recv().await.unwrap();
        assert_eq!(second.data, "[]");
    }

    #[tokio::test]
    async fn failed_start_changes_nothing() {
        let (state, store) = test_state().await;
        state
            .with_event_mut(1, |event, _| {
                add_player(event, "Ala", 40);
                Ok(())
            })
            .await
            .unwrap();
        store.set_fail_writes(true);

        assert!(start_game(&state, 1, None).await.is_err());
        let (players, status) = state
            .read_event(1, |e| (e.players.len(), e.status_label()))
            .await
            .unwrap();
        assert_eq!(players, 1);
        assert_eq!(status, "preparation");
    }

    #[tokio::test]
    async fn stop_requires_the_event_password_and_an_active_game() {
        let (state, _) = test_state().await;
        assert!(matches!(
            stop_game(&state, 1, "password1").await,
            Err(ServiceError::InvalidState(_))
        ));
        start_game(&state, 1, None).await.unwrap();
        assert!(matches!(
            stop_game(&state, 1, "wrong").await,
            Err(ServiceError::Forbidden(_))
        ));
        let view = stop_game(&state, 1, "password1").await.unwrap();
        assert_eq!(view.game_status, GameStatus::Stopped);
    }

    #[tokio::test]
    async fn same_speed_twice_resets_to_normal() {
        let (state, _) = test_state().await;
        start_game(&state, 1, None).await.unwrap();
        assert_eq!(set_speed(&state, 1, 3).await.unwrap(), 3);
        assert_eq!(set_speed(&state, 1, 3).await.unwrap(), 1);
        set_speed(&state, 1, 5).await.unwrap();
        assert_eq!(reset_speed(&state, 1).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn bonus_is_bounded() {
        let (state, _) = test_state().await;
        assert!(matches!(
            set_bonus(&state, 1, 11).await,
            Err(ServiceError::InvalidInput(_))
        ));
        assert_eq!(set_bonus(&state, 1, 4).await.unwrap(), 4);
    }

    #[tokio::test]
    async fn adjusting_a_waiting_game_is_refused() {
        let (state, _) = test_state().await;
        assert!(matches!(
            adjust_duration(&state, 1, 10, "password1").await,
            Err(ServiceError::InvalidState(_))
        ));
    }
}
