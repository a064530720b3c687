//! Standard snapshots queued on a mutation's outbox.

use time::OffsetDateTime;
use tokio::sync::broadcast::Receiver;
use tracing::warn;

use crate::{
    dao::models::EventId,
    dto::{
        sse::{GameOverEvent, PasswordUpdateEvent, ServerEvent, names},
        state::{GameStateView, leaderboard, photo_gallery},
    },
    error::ServiceError,
    state::{MutationContext, SharedState, event::EventRuntime},
};

pub fn queue_game_state(event: &EventRuntime, ctx: &mut MutationContext<'_>) {
    let view = GameStateView::build(event, ctx.now);
    ctx.publish(names::GAME_STATE_UPDATE, &view);
}

pub fn queue_leaderboard(event: &EventRuntime, ctx: &mut MutationContext<'_>) {
    ctx.publish(names::LEADERBOARD_UPDATE, &leaderboard(event));
}

pub fn queue_password(event: &EventRuntime, ctx: &mut MutationContext<'_>) {
    ctx.publish(
        names::PASSWORD_UPDATE,
        &PasswordUpdateEvent {
            password: event.game.password.display(),
        },
    );
}

pub fn queue_photos(event: &EventRuntime, ctx: &mut MutationContext<'_>) {
    ctx.publish(names::PHOTOS_UPDATE, &photo_gallery(event));
}

pub fn queue_game_over(ctx: &mut MutationContext<'_>) {
    ctx.publish(names::GAME_OVER, &GameOverEvent::default());
}

/// Everything a client shows after a round was started or reset.
pub fn queue_full_refresh(event: &EventRuntime, ctx: &mut MutationContext<'_>) {
    queue_game_state(event, ctx);
    queue_leaderboard(event, ctx);
    queue_password(event, ctx);
    queue_photos(event, ctx);
}

/// Frames sent to a single client when it (re)subscribes.
pub fn resync_frames(event: &EventRuntime, now: OffsetDateTime) -> Vec<ServerEvent> {
    let frames = [
        ServerEvent::json(
            Some(names::GAME_STATE_UPDATE.to_owned()),
            &GameStateView::build(event, now),
        ),
        ServerEvent::json(
            Some(names::LEADERBOARD_UPDATE.to_owned()),
            &leaderboard(event),
        ),
    ];
    frames
        .into_iter()
        .filter_map(|frame| {
            frame
                .inspect_err(|err| warn!(error = %err, "failed to serialise resync frame"))
                .ok()
        })
        .collect()
}

/// Subscribe to an event's channel together with the frames the client needs first.
///
/// The receiver exists before the snapshot is taken under the event lock, so
/// nothing published in between is lost.
pub async fn subscribe(
    state: &SharedState,
    event_id: EventId,
) -> Result<(Receiver<ServerEvent>, Vec<ServerEvent>), ServiceError> {
    if !state.event_exists(event_id) {
        return Err(ServiceError::NotFound(format!("event {event_id} does not exist")));
    }
    let receiver = state.hub().subscribe(event_id);
    let frames = state
        .read_event(event_id, |event| {
            resync_frames(event, OffsetDateTime::now_utc())
        })
        .await?;
    Ok((receiver, frames))
}
