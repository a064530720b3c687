//! Player actions: registration, QR scans, curated answers and minigames.

use tracing::{debug, info};
use uuid::Uuid;

use crate::{
    dao::models::{AnswerLetter, EventId, MinigameProgressEntity, MinigameTrack, PlayerEntity},
    dto::player::{AnswerResponse, MinigameCompleteResponse, RegisteredPlayer, ScanResponse},
    error::ServiceError,
    services::broadcast,
    state::{SharedState, redemption},
};

/// Register a new player under a name unique within the event.
pub async fn register(
    state: &SharedState,
    event_id: EventId,
    name: &str,
) -> Result<RegisteredPlayer, ServiceError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ServiceError::InvalidInput("player name must not be empty".into()));
    }
    let player = state
        .with_event_mut(event_id, |event, ctx| {
            if event.players.values().any(|p| p.name == name) {
                return Err(ServiceError::Conflict(format!(
                    "player name `{name}` is already taken"
                )));
            }
            let player = PlayerEntity {
                id: Uuid::new_v4(),
                name: name.to_owned(),
                score: 0,
                warnings: 0,
                revealed_letters: String::new(),
                minigame_progress: MinigameProgressEntity::default(),
                registered_at: ctx.now,
            };
            event.players.insert(player.id, player.clone());
            broadcast::queue_leaderboard(event, ctx);
            broadcast::queue_game_state(event, ctx);
            Ok(player)
        })
        .await?;
    info!(event_id, player_id = %player.id, "player registered");
    Ok(RegisteredPlayer::build(event_id, &player))
}

/// Redeem a scanned QR code.
pub async fn scan(
    state: &SharedState,
    event_id: EventId,
    player_id: Uuid,
    code: &str,
) -> Result<ScanResponse, ServiceError> {
    ensure_event(state, event_id)?;
    let rules = &state.config().rules;
    let code = code.trim();
    let outcome = state
        .with_event_mut(event_id, |event, ctx| {
            let outcome = redemption::scan(event, rules, player_id, code, ctx.now, ctx.rng)?;
            if outcome.claimed_code() {
                broadcast::queue_leaderboard(event, ctx);
            }
            Ok(outcome)
        })
        .await?;
    debug!(event_id, %player_id, code, ?outcome, "code scanned");
    Ok(outcome.into())
}

/// Answer a curated question served by a quiz code.
pub async fn answer(
    state: &SharedState,
    event_id: EventId,
    player_id: Uuid,
    question_id: Uuid,
    letter: &str,
) -> Result<AnswerResponse, ServiceError> {
    ensure_event(state, event_id)?;
    let letter = AnswerLetter::parse(letter)
        .ok_or_else(|| ServiceError::InvalidInput("answer must be A, B or C".into()))?;
    let outcome = state
        .with_event_mut(event_id, |event, ctx| {
            let outcome =
                redemption::answer(event, player_id, question_id, letter, ctx.now, ctx.rng)?;
            if outcome.revealed_index.is_some() {
                broadcast::queue_password(event, ctx);
            }
            broadcast::queue_leaderboard(event, ctx);
            broadcast::queue_game_state(event, ctx);
            Ok(outcome)
        })
        .await?;
    Ok(AnswerResponse {
        correct: outcome.correct,
        letter: outcome.letter_to_reveal,
        score: outcome.score,
    })
}

/// Report points scored in a minigame.
pub async fn complete_minigame(
    state: &SharedState,
    event_id: EventId,
    player_id: Uuid,
    track: MinigameTrack,
    points: i64,
) -> Result<MinigameCompleteResponse, ServiceError> {
    ensure_event(state, event_id)?;
    let points = u32::try_from(points)
        .map_err(|_| ServiceError::InvalidInput("points must be a non-negative number".into()))?;
    let rules = &state.config().rules;
    let (outcome, bonus) = state
        .with_event_mut(event_id, |event, ctx| {
            let outcome =
                redemption::complete_minigame(event, rules, player_id, track, points, ctx.rng)?;
            if outcome.completed {
                broadcast::queue_password(event, ctx);
                broadcast::queue_leaderboard(event, ctx);
            }
            Ok((outcome, event.game.bonus_multiplier))
        })
        .await?;
    if outcome.completed {
        info!(event_id, %player_id, ?track, "minigame completed");
    }
    Ok(MinigameCompleteResponse::build(&outcome, bonus))
}

/// A player holding an identity for an event that no longer exists must re-register.
fn ensure_event(state: &SharedState, event_id: EventId) -> Result<(), ServiceError> {
    if state.event_exists(event_id) {
        Ok(())
    } else {
        Err(ServiceError::StaleClient)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        dao::models::{QrColor, QuestionCategory},
        dto::sse::names,
        services::game_service,
        state::{
            event::tests::{add_code, add_question},
            tests::test_state,
        },
    };

    async fn running_game() -> (SharedState, crate::dao::game_store::memory::MemoryGameStore, Uuid)
    {
        let (state, store) = test_state().await;
        state
            .with_event_mut(1, |event, _| {
                add_question(event, QuestionCategory::Company);
                add_code(event, "white", QrColor::White);
                add_code(event, "red1", QrColor::Red);
                add_code(event, "trap1", QrColor::WhiteTrap);
                Ok(())
            })
            .await
            .unwrap();
        game_service::start_game(&state, 1, Some(30)).await.unwrap();
        let player = register(&state, 1, "Ala").await.unwrap();
        (state, store, player.id)
    }

    #[tokio::test]
    async fn duplicate_names_conflict() {
        let (state, _, _) = running_game().await;
        assert!(matches!(
            register(&state, 1, " Ala ").await,
            Err(ServiceError::Conflict(_))
        ));
        assert!(matches!(
            register(&state, 1, "  ").await,
            Err(ServiceError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn red_code_pays_once_and_pushes_the_leaderboard() {
        let (state, _, player) = running_game().await;
        let mut receiver = state.hub().subscribe(1);

        let response = scan(&state, 1, player, "red1").await.unwrap();
        assert!(matches!(response, ScanResponse::Info { score: Some(50), .. }));
        let pushed = receiver.recv().await.unwrap();
        assert_eq!(pushed.event.as_deref(), Some(names::LEADERBOARD_UPDATE));

        assert!(matches!(
            scan(&state, 1, player, "red1").await,
            Err(ServiceError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn failed_claim_commit_keeps_the_code_free() {
        let (state, store, player) = running_game().await;
        store.set_fail_writes(true);
        assert!(scan(&state, 1, player, "red1").await.is_err());
        store.set_fail_writes(false);

        let (claimed, score) = state
            .read_event(1, |e| (e.qr_codes["red1"].claimed_by, e.players[&player].score))
            .await
            .unwrap();
        assert_eq!(claimed, None);
        assert_eq!(score, 0);
    }

    #[tokio::test]
    async fn quiz_scan_then_cooldown() {
        let (state, _, player) = running_game().await;
        let response = scan(&state, 1, player, "white").await.unwrap();
        let ScanResponse::Question { question } = response else {
            panic!("expected a question");
        };
        let answered = answer(&state, 1, player, question.id, "b").await.unwrap();
        assert!(answered.correct);
        assert_eq!(answered.letter.as_deref(), Some("S"));
        assert_eq!(answered.score, 10);

        assert!(scan(&state, 1, player, "white").await.unwrap().is_wait());
        assert!(matches!(
            answer(&state, 1, player, question.id, "B").await,
            Err(ServiceError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn unknown_player_or_event_is_stale() {
        let (state, _, player) = running_game().await;
        assert!(matches!(
            scan(&state, 1, Uuid::new_v4(), "red1").await,
            Err(ServiceError::StaleClient)
        ));
        assert!(matches!(
            scan(&state, 9, player, "red1").await,
            Err(ServiceError::StaleClient)
        ));
    }

    #[tokio::test]
    async fn minigame_completion_reports_points_once() {
        let (state, _, player) = running_game().await;
        let partial = complete_minigame(&state, 1, player, MinigameTrack::Snake, 12)
            .await
            .unwrap();
        assert!(!partial.completed);
        assert_eq!(partial.points_earned, 0);

        let done = complete_minigame(&state, 1, player, MinigameTrack::Snake, 8)
            .await
            .unwrap();
        assert!(done.completed);
        assert_eq!(done.points_earned, 10);
        assert!(done.letter_revealed.is_some());

        assert!(matches!(
            complete_minigame(&state, 1, player, MinigameTrack::Snake, -1).await,
            Err(ServiceError::InvalidInput(_))
        ));
    }
}
