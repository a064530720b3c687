//! Read models derived from an event aggregate and pushed on every change.

use serde::Serialize;
use time::OffsetDateTime;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    dao::models::{PhotoEntity, PlayerEntity, RevealMode},
    state::{event::EventRuntime, state_machine::GamePhase},
};

/// Full state snapshot of one event.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct GameStateView {
    pub game_active: bool,
    pub is_timer_running: bool,
    pub game_status: GameStatus,
    /// Seconds; the pause snapshot while paused, zero unless active.
    pub time_left: f64,
    pub time_elapsed: f64,
    pub time_elapsed_with_pauses: f64,
    /// Masked password as displayed to players.
    pub password: String,
    pub player_count: usize,
    pub correct_answers: usize,
    pub completion_percentage: u32,
    pub language_player: String,
    pub language_host: String,
    pub bonus_multiplier: u32,
    pub time_speed: u32,
}

/// Client-facing status label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum GameStatus {
    Waiting,
    Active,
    Paused,
    Stopped,
}

impl From<GamePhase> for GameStatus {
    fn from(value: GamePhase) -> Self {
        match value {
            GamePhase::Waiting => GameStatus::Waiting,
            GamePhase::Running => GameStatus::Active,
            GamePhase::Paused => GameStatus::Paused,
            GamePhase::Stopped => GameStatus::Stopped,
        }
    }
}

impl GameStateView {
    /// Project the aggregate at instant `now`.
    pub fn build(event: &EventRuntime, now: OffsetDateTime) -> Self {
        let game = &event.game;
        let phase = game.phase();
        let readings = game.clock.readings(now);
        Self {
            game_active: phase.is_active(),
            is_timer_running: phase == GamePhase::Running,
            game_status: phase.into(),
            time_left: readings.time_left,
            time_elapsed: readings.time_elapsed,
            time_elapsed_with_pauses: readings.time_elapsed_with_pauses,
            password: game.password.display(),
            player_count: event.players.len(),
            correct_answers: event.correct_answer_count(),
            completion_percentage: event.completion_percentage(),
            language_player: game.language_player.clone(),
            language_host: game.language_host.clone(),
            bonus_multiplier: game.bonus_multiplier,
            time_speed: game.clock.speed,
        }
    }
}

/// Leaderboard line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct LeaderboardEntry {
    pub name: String,
    pub score: i64,
}

impl From<&PlayerEntity> for LeaderboardEntry {
    fn from(value: &PlayerEntity) -> Self {
        Self {
            name: value.name.clone(),
            score: value.score,
        }
    }
}

/// Ordered leaderboard of an event.
pub fn leaderboard(event: &EventRuntime) -> Vec<LeaderboardEntry> {
    event.leaderboard().into_iter().map(Into::into).collect()
}

/// Password details shown in the host panel.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PasswordStateView {
    pub password: String,
    pub revealed_indices: Vec<usize>,
    pub displayed_password: String,
    pub mode: RevealMode,
}

impl PasswordStateView {
    pub fn build(event: &EventRuntime) -> Self {
        let password = &event.game.password;
        Self {
            password: password.secret().to_owned(),
            revealed_indices: password.revealed().iter().copied().collect(),
            displayed_password: password.display(),
            mode: password.mode,
        }
    }
}

/// Photo entry of the gallery.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PhotoView {
    pub id: Uuid,
    pub player_name: String,
    /// Opaque reference to the stored image.
    pub image_url: String,
    pub votes: u32,
    #[serde(with = "time::serde::rfc3339")]
    #[schema(value_type = String, format = DateTime)]
    pub timestamp: OffsetDateTime,
}

impl PhotoView {
    fn build(event: &EventRuntime, photo: &PhotoEntity) -> Self {
        Self {
            id: photo.id,
            player_name: event
                .players
                .get(&photo.player_id)
                .map(|p| p.name.clone())
                .unwrap_or_default(),
            image_url: photo.reference.clone(),
            votes: photo.votes,
            timestamp: photo.submitted_at,
        }
    }
}

/// Gallery ordered by votes, newest first on ties.
pub fn photo_gallery(event: &EventRuntime) -> Vec<PhotoView> {
    event
        .ranked_photos()
        .into_iter()
        .map(|photo| PhotoView::build(event, photo))
        .collect()
}

#[cfg(test)]
mod tests {
    use time::Duration;

    use super::*;
    use crate::state::event::tests::{NOW, add_player, runtime};

    #[test]
    fn paused_snapshot_reports_frozen_time_left() {
        let mut event = runtime();
        add_player(&mut event, "p", 0);
        event.game.clock.start(NOW, 10).unwrap();
        event.game.clock.pause(NOW + Duration::seconds(60)).unwrap();

        let view = GameStateView::build(&event, NOW + Duration::seconds(90));
        assert!(view.game_active);
        assert!(!view.is_timer_running);
        assert_eq!(view.game_status, GameStatus::Paused);
        assert_eq!(view.time_left, 540.0);
        assert_eq!(view.time_elapsed, 60.0);
        assert_eq!(view.time_elapsed_with_pauses, 90.0);
        assert_eq!(view.player_count, 1);
    }

    #[test]
    fn waiting_event_has_no_time_left() {
        let event = runtime();
        let view = GameStateView::build(&event, NOW);
        assert_eq!(view.game_status, GameStatus::Waiting);
        assert_eq!(view.time_left, 0.0);
        assert_eq!(view.password, "__________");
    }
}
