//! Host back-office: players, curated questions, minigames, announcements and QR codes.

use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    dao::models::{EventId, MinigameTrack, QrCodeEntity, QrColor},
    dto::{
        host::{
            GenerateQrCodesRequest, MinigameStatusResponse, MinigameToggleResponse, PlayerView,
            QrCodeListing, QuestionInput, QuestionView,
        },
        sse::{HostMessageEvent, ServerEvent, names},
    },
    error::ServiceError,
    services::{auth_service::HostContext, broadcast},
    state::SharedState,
};

/// Players ordered by score, registration order on ties.
pub async fn list_players(
    state: &SharedState,
    event_id: EventId,
) -> Result<Vec<PlayerView>, ServiceError> {
    state
        .read_event(event_id, |event| {
            event.leaderboard().into_iter().map(PlayerView::from).collect()
        })
        .await
}

pub async fn warn_player(
    state: &SharedState,
    event_id: EventId,
    player_id: Uuid,
) -> Result<PlayerView, ServiceError> {
    state
        .with_event_mut(event_id, |event, _ctx| {
            let player = event
                .players
                .get_mut(&player_id)
                .ok_or_else(|| ServiceError::NotFound(format!("player `{player_id}` not found")))?;
            player.warnings += 1;
            Ok(PlayerView::from(&*player))
        })
        .await
}

/// Remove a player, releasing their codes and dropping their photos and votes.
pub async fn delete_player(
    state: &SharedState,
    event_id: EventId,
    player_id: Uuid,
) -> Result<(), ServiceError> {
    let photo_files = state
        .with_event_mut(event_id, |event, ctx| {
            let files: Vec<String> = event
                .photos
                .values()
                .filter(|photo| photo.player_id == player_id)
                .map(|photo| photo.reference.clone())
                .collect();
            event
                .remove_player(player_id)
                .ok_or_else(|| ServiceError::NotFound(format!("player `{player_id}` not found")))?;
            broadcast::queue_leaderboard(event, ctx);
            broadcast::queue_game_state(event, ctx);
            if !files.is_empty() {
                broadcast::queue_photos(event, ctx);
            }
            Ok(files)
        })
        .await?;
    for file in &photo_files {
        state.files().delete(file).await;
    }
    info!(event_id, %player_id, photos = photo_files.len(), "player removed");
    Ok(())
}

pub async fn list_questions(
    state: &SharedState,
    event_id: EventId,
) -> Result<Vec<QuestionView>, ServiceError> {
    state
        .read_event(event_id, |event| {
            event.questions.values().map(QuestionView::from).collect()
        })
        .await
}

pub async fn create_question(
    state: &SharedState,
    event_id: EventId,
    input: QuestionInput,
) -> Result<QuestionView, ServiceError> {
    let question = input.into_entity();
    state
        .with_event_mut(event_id, |event, _ctx| {
            let view = QuestionView::from(&question);
            event.questions.insert(question.id, question);
            Ok(view)
        })
        .await
}

pub async fn update_question(
    state: &SharedState,
    event_id: EventId,
    question_id: Uuid,
    input: QuestionInput,
) -> Result<QuestionView, ServiceError> {
    state
        .with_event_mut(event_id, |event, _ctx| {
            let question = event
                .questions
                .get_mut(&question_id)
                .ok_or_else(|| question_not_found(question_id))?;
            input.apply(question);
            Ok(QuestionView::from(&*question))
        })
        .await
}

pub async fn delete_question(
    state: &SharedState,
    event_id: EventId,
    question_id: Uuid,
) -> Result<(), ServiceError> {
    state
        .with_event_mut(event_id, |event, _ctx| {
            event
                .questions
                .shift_remove(&question_id)
                .map(|_| ())
                .ok_or_else(|| question_not_found(question_id))
        })
        .await
}

fn question_not_found(question_id: Uuid) -> ServiceError {
    ServiceError::NotFound(format!("question `{question_id}` not found"))
}

pub async fn minigame_status(
    state: &SharedState,
    event_id: EventId,
) -> Result<MinigameStatusResponse, ServiceError> {
    state
        .read_event(event_id, MinigameStatusResponse::build)
        .await
}

/// Enable a disabled track or disable an enabled one.
pub async fn toggle_minigame(
    state: &SharedState,
    event_id: EventId,
    track: MinigameTrack,
) -> Result<MinigameToggleResponse, ServiceError> {
    state
        .with_event_mut(event_id, |event, _ctx| {
            let disabled = &mut event.game.disabled_minigames;
            if !disabled.remove(&track) {
                disabled.insert(track);
            }
            Ok(MinigameToggleResponse {
                game_type: track,
                enabled: event.game.minigame_enabled(track),
            })
        })
        .await
}

/// Push an announcement to every screen of the event; nothing is stored.
pub async fn send_message(
    state: &SharedState,
    event_id: EventId,
    message: &str,
) -> Result<(), ServiceError> {
    if !state.event_exists(event_id) {
        return Err(ServiceError::NotFound(format!("event {event_id} does not exist")));
    }
    let payload = HostMessageEvent {
        message: message.trim().to_owned(),
    };
    match ServerEvent::json(Some(names::HOST_MESSAGE.to_owned()), &payload) {
        Ok(event) => state.hub().publish(event_id, event),
        Err(err) => warn!(event_id, error = %err, "failed to encode host message"),
    }
    Ok(())
}

fn require_superhost(host: &HostContext) -> Result<(), ServiceError> {
    if host.superhost {
        Ok(())
    } else {
        Err(ServiceError::Forbidden(
            "QR code management requires a superhost".into(),
        ))
    }
}

/// Every code of the host's event with its claimant, plus per-color counts.
pub async fn list_qr_codes(
    state: &SharedState,
    host: &HostContext,
) -> Result<QrCodeListing, ServiceError> {
    require_superhost(host)?;
    state
        .read_event(host.event_id, QrCodeListing::build)
        .await
}

pub async fn generate_own_qr_codes(
    state: &SharedState,
    host: &HostContext,
    counts: &GenerateQrCodesRequest,
) -> Result<QrCodeListing, ServiceError> {
    require_superhost(host)?;
    generate_qr_codes(state, host.event_id, counts).await
}

/// Replace every code of the event with a fresh set.
///
/// The fixed `white` and `yellow` quiz codes are always present; one-shot
/// codes are numbered from 1 per color.
pub async fn generate_qr_codes(
    state: &SharedState,
    event_id: EventId,
    counts: &GenerateQrCodesRequest,
) -> Result<QrCodeListing, ServiceError> {
    let listing = state
        .with_event_mut(event_id, |event, _ctx| {
            if event.game.phase().is_active() {
                return Err(ServiceError::Forbidden(
                    "QR codes cannot be regenerated during an active game".into(),
                ));
            }
            event.qr_codes.clear();
            for code in qr_code_set(counts) {
                event.qr_codes.insert(code.code.clone(), code);
            }
            Ok(QrCodeListing::build(event))
        })
        .await?;
    info!(event_id, total = listing.codes.len(), "QR codes regenerated");
    Ok(listing)
}

fn qr_code_set(counts: &GenerateQrCodesRequest) -> Vec<QrCodeEntity> {
    let fixed = [("white".to_owned(), QrColor::White), ("yellow".to_owned(), QrColor::Yellow)];
    let numbered = [
        ("red", QrColor::Red, counts.red),
        ("trap", QrColor::WhiteTrap, counts.white_trap),
        ("green", QrColor::Green, counts.green),
        ("pink", QrColor::Pink, counts.pink),
    ]
    .into_iter()
    .flat_map(|(prefix, color, count)| (1..=count).map(move |i| (format!("{prefix}{i}"), color)));

    fixed
        .into_iter()
        .chain(numbered)
        .map(|(code, color)| QrCodeEntity {
            code,
            color,
            claimed_by: None,
        })
        .collect()
}

/// Bare code identifiers, for printing.
pub async fn qr_code_identifiers(
    state: &SharedState,
    event_id: EventId,
) -> Result<Vec<String>, ServiceError> {
    state
        .read_event(event_id, |event| event.qr_codes.keys().cloned().collect())
        .await
}
