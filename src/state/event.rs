use std::collections::{BTreeSet, HashSet};

use indexmap::IndexMap;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    dao::models::{
        EventEntity, EventId, EventRecordEntity, GameStateEntity, MinigameTrack, PhotoEntity,
        PhotoVoteEntity, PlayerAnswerEntity, PlayerEntity, PlayerScanEntity, QrCodeEntity,
        QuestionEntity,
    },
    state::{password::PasswordState, state_machine::GamePhase, timer::GameClock},
};

/// Tunables applied to every event.
#[derive(Debug, Clone, PartialEq)]
pub struct GameRules {
    /// Cooldown between two scans of the same reusable color, in seconds.
    pub scan_cooldown_secs: u64,
    /// Minigame points needed to complete a track.
    pub minigame_target: u32,
    /// Secret assigned to new or reset events.
    pub default_password: String,
    /// Round duration used when the host does not provide one.
    pub default_duration_minutes: u32,
    /// UI language assigned to new or reset events.
    pub default_language: String,
}

impl Default for GameRules {
    fn default() -> Self {
        Self {
            scan_cooldown_secs: 300,
            minigame_target: 20,
            default_password: "SAPEREVENT".into(),
            default_duration_minutes: 30,
            default_language: "pl".into(),
        }
    }
}

/// Typed game parameters of one event.
#[derive(Debug, Clone, PartialEq)]
pub struct GameState {
    pub clock: GameClock,
    pub bonus_multiplier: u32,
    pub password: PasswordState,
    pub disabled_minigames: BTreeSet<MinigameTrack>,
    pub language_player: String,
    pub language_host: String,
}

impl GameState {
    pub fn new(rules: &GameRules) -> Self {
        Self {
            clock: GameClock::default(),
            bonus_multiplier: 1,
            password: PasswordState::new(rules.default_password.clone()),
            disabled_minigames: BTreeSet::new(),
            language_player: rules.default_language.clone(),
            language_host: rules.default_language.clone(),
        }
    }

    pub fn phase(&self) -> GamePhase {
        self.clock.phase
    }

    pub fn minigame_enabled(&self, track: MinigameTrack) -> bool {
        !self.disabled_minigames.contains(&track)
    }
}

/// In-memory aggregate of one event: definition, game parameters and every child record.
#[derive(Debug, Clone)]
pub struct EventRuntime {
    pub record: EventRecordEntity,
    pub game: GameState,
    /// Registration order is preserved and breaks leaderboard ties.
    pub players: IndexMap<Uuid, PlayerEntity>,
    pub questions: IndexMap<Uuid, QuestionEntity>,
    /// Keyed by the printed code identifier.
    pub qr_codes: IndexMap<String, QrCodeEntity>,
    pub scans: Vec<PlayerScanEntity>,
    pub answers: Vec<PlayerAnswerEntity>,
    pub ai_answers: Vec<PlayerAnswerEntity>,
    pub photos: IndexMap<Uuid, PhotoEntity>,
    /// `(photo, voter)` pairs.
    pub votes: HashSet<(Uuid, Uuid)>,
}

impl EventRuntime {
    /// Fresh event with default game parameters and no children.
    pub fn new(record: EventRecordEntity, rules: &GameRules) -> Self {
        Self {
            record,
            game: GameState::new(rules),
            players: IndexMap::new(),
            questions: IndexMap::new(),
            qr_codes: IndexMap::new(),
            scans: Vec::new(),
            answers: Vec::new(),
            ai_answers: Vec::new(),
            photos: IndexMap::new(),
            votes: HashSet::new(),
        }
    }

    pub fn id(&self) -> EventId {
        self.record.id
    }

    /// Drop everything a round produces: players, their history, photos and code claims.
    ///
    /// Questions and QR code definitions are kept for the next round.
    pub fn clear_round(&mut self) {
        for code in self.qr_codes.values_mut() {
            code.claimed_by = None;
        }
        self.players.clear();
        self.scans.clear();
        self.answers.clear();
        self.ai_answers.clear();
        self.photos.clear();
        self.votes.clear();
    }

    /// Return the event to its just-created state, keeping only its definition.
    pub fn reset_all(&mut self, rules: &GameRules) {
        self.clear_round();
        self.questions.clear();
        self.qr_codes.clear();
        self.game = GameState::new(rules);
    }

    /// Remove a player and everything that references them.
    pub fn remove_player(&mut self, player_id: Uuid) -> Option<PlayerEntity> {
        let removed = self.players.shift_remove(&player_id)?;

        for code in self.qr_codes.values_mut() {
            if code.claimed_by == Some(player_id) {
                code.claimed_by = None;
            }
        }
        self.scans.retain(|scan| scan.player_id != player_id);
        self.answers.retain(|answer| answer.player_id != player_id);
        self.ai_answers.retain(|answer| answer.player_id != player_id);

        let own_photos: HashSet<Uuid> = self
            .photos
            .values()
            .filter(|photo| photo.player_id == player_id)
            .map(|photo| photo.id)
            .collect();
        self.photos.retain(|id, _| !own_photos.contains(id));

        let photos = &mut self.photos;
        self.votes.retain(|(photo_id, voter_id)| {
            if own_photos.contains(photo_id) {
                return false;
            }
            if *voter_id == player_id {
                if let Some(photo) = photos.get_mut(photo_id) {
                    photo.votes = photo.votes.saturating_sub(1);
                }
                return false;
            }
            true
        });

        Some(removed)
    }

    /// Add `delta` to a player's score, never going below zero.
    pub fn apply_score_delta(&mut self, player_id: Uuid, delta: i64) -> Option<i64> {
        let player = self.players.get_mut(&player_id)?;
        player.score = (player.score + delta).max(0);
        Some(player.score)
    }

    /// Players sorted by score, highest first; ties keep registration order.
    pub fn leaderboard(&self) -> Vec<&PlayerEntity> {
        let mut players: Vec<&PlayerEntity> = self.players.values().collect();
        players.sort_by(|a, b| b.score.cmp(&a.score));
        players
    }

    /// Share of curated questions answered at least once, as a whole percentage.
    pub fn completion_percentage(&self) -> u32 {
        if self.questions.is_empty() {
            return 0;
        }
        let answered: HashSet<Uuid> = self
            .answers
            .iter()
            .map(|answer| answer.question_id)
            .filter(|id| self.questions.contains_key(id))
            .collect();
        (answered.len() * 100 / self.questions.len()) as u32
    }

    /// Number of correct curated answers given this round.
    pub fn correct_answer_count(&self) -> usize {
        self.answers.iter().filter(|answer| answer.correct).count()
    }

    /// Photos ordered by votes (most first), newest first on ties.
    pub fn ranked_photos(&self) -> Vec<&PhotoEntity> {
        let mut photos: Vec<&PhotoEntity> = self.photos.values().collect();
        photos.sort_by(|a, b| {
            b.votes
                .cmp(&a.votes)
                .then_with(|| b.submitted_at.cmp(&a.submitted_at))
        });
        photos
    }

    /// Status label used by the admin event listing.
    pub fn status_label(&self) -> &'static str {
        match self.game.phase() {
            GamePhase::Waiting => "preparation",
            GamePhase::Running => "running",
            GamePhase::Paused => "paused",
            GamePhase::Stopped => "finished",
        }
    }

    /// Most recent scan of `color` by `player_id`.
    pub fn last_scan_at(
        &self,
        player_id: Uuid,
        color: crate::dao::models::QrColor,
    ) -> Option<OffsetDateTime> {
        self.scans
            .iter()
            .filter(|scan| scan.player_id == player_id && scan.color == color)
            .map(|scan| scan.scanned_at)
            .max()
    }
}

impl From<&GameState> for GameStateEntity {
    fn from(value: &GameState) -> Self {
        let clock = &value.clock;
        Self {
            game_active: clock.phase.is_active(),
            timer_running: clock.phase == GamePhase::Running,
            started_at: clock.started_at,
            ends_at: clock.ends_at,
            pause_started_at: clock.pause_started_at,
            total_paused_secs: clock.total_paused,
            time_left_on_pause_secs: clock.time_left_on_pause,
            initial_duration_secs: clock.initial_duration,
            speed: clock.speed,
            bonus_multiplier: value.bonus_multiplier,
            password: value.password.secret().to_owned(),
            revealed_indices: value.password.revealed().iter().copied().collect(),
            reveal_mode: value.password.mode,
            disabled_minigames: value.disabled_minigames.iter().copied().collect(),
            language_player: value.language_player.clone(),
            language_host: value.language_host.clone(),
        }
    }
}

impl From<GameStateEntity> for GameState {
    fn from(value: GameStateEntity) -> Self {
        let phase = GamePhase::from_flags(
            value.game_active,
            value.timer_running,
            value.started_at.is_some(),
        );
        Self {
            clock: GameClock {
                phase,
                started_at: value.started_at,
                ends_at: value.ends_at,
                pause_started_at: value.pause_started_at,
                total_paused: value.total_paused_secs,
                time_left_on_pause: value.time_left_on_pause_secs,
                initial_duration: value.initial_duration_secs,
                speed: value.speed.max(1),
            },
            bonus_multiplier: value.bonus_multiplier.max(1),
            password: PasswordState::restore(
                value.password,
                value.revealed_indices,
                value.reveal_mode,
            ),
            disabled_minigames: value.disabled_minigames.into_iter().collect(),
            language_player: value.language_player,
            language_host: value.language_host,
        }
    }
}

impl From<&EventRuntime> for EventEntity {
    fn from(value: &EventRuntime) -> Self {
        Self {
            event: value.record.clone(),
            game: (&value.game).into(),
            players: value.players.values().cloned().collect(),
            questions: value.questions.values().cloned().collect(),
            qr_codes: value.qr_codes.values().cloned().collect(),
            scans: value.scans.clone(),
            answers: value.answers.clone(),
            ai_answers: value.ai_answers.clone(),
            photos: value.photos.values().cloned().collect(),
            votes: value
                .votes
                .iter()
                .map(|(photo_id, voter_id)| PhotoVoteEntity {
                    photo_id: *photo_id,
                    voter_id: *voter_id,
                })
                .collect(),
        }
    }
}

impl From<EventEntity> for EventRuntime {
    fn from(value: EventEntity) -> Self {
        Self {
            record: value.event,
            game: value.game.into(),
            players: value.players.into_iter().map(|p| (p.id, p)).collect(),
            questions: value.questions.into_iter().map(|q| (q.id, q)).collect(),
            qr_codes: value
                .qr_codes
                .into_iter()
                .map(|code| (code.code.clone(), code))
                .collect(),
            scans: value.scans,
            answers: value.answers,
            ai_answers: value.ai_answers,
            photos: value.photos.into_iter().map(|p| (p.id, p)).collect(),
            votes: value
                .votes
                .into_iter()
                .map(|vote| (vote.photo_id, vote.voter_id))
                .collect(),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use time::macros::datetime;

    use super::*;
    use crate::dao::models::{AnswerLetter, Difficulty, MinigameProgressEntity, QrColor, QuestionCategory};

    pub(crate) const NOW: OffsetDateTime = datetime!(2025-06-01 18:00 UTC);

    pub(crate) fn record(id: EventId) -> EventRecordEntity {
        EventRecordEntity {
            id,
            name: format!("Event #{id}"),
            login: format!("host{id}"),
            password: format!("password{id}"),
            event_date: None,
            notes: String::new(),
            logo: None,
            superhost: false,
        }
    }

    pub(crate) fn runtime() -> EventRuntime {
        EventRuntime::new(record(1), &GameRules::default())
    }

    pub(crate) fn add_player(event: &mut EventRuntime, name: &str, score: i64) -> Uuid {
        let id = Uuid::new_v4();
        event.players.insert(
            id,
            PlayerEntity {
                id,
                name: name.into(),
                score,
                warnings: 0,
                revealed_letters: String::new(),
                minigame_progress: MinigameProgressEntity::default(),
                registered_at: NOW,
            },
        );
        id
    }

    pub(crate) fn add_question(event: &mut EventRuntime, category: QuestionCategory) -> Uuid {
        let id = Uuid::new_v4();
        event.questions.insert(
            id,
            QuestionEntity {
                id,
                text: "Which?".into(),
                option_a: "one".into(),
                option_b: "two".into(),
                option_c: "three".into(),
                correct: AnswerLetter::B,
                letter_to_reveal: "S".into(),
                category,
                difficulty: Difficulty::Medium,
                times_shown: 0,
                times_correct: 0,
            },
        );
        id
    }

    pub(crate) fn add_code(event: &mut EventRuntime, code: &str, color: QrColor) {
        event.qr_codes.insert(
            code.into(),
            QrCodeEntity {
                code: code.into(),
                color,
                claimed_by: None,
            },
        );
    }

    #[test]
    fn leaderboard_sorts_by_score_and_keeps_registration_order_on_ties() {
        let mut event = runtime();
        add_player(&mut event, "first", 10);
        add_player(&mut event, "second", 30);
        add_player(&mut event, "third", 10);

        let names: Vec<&str> = event
            .leaderboard()
            .into_iter()
            .map(|p| p.name.as_str())
            .collect();
        assert_eq!(names, ["second", "first", "third"]);
    }

    #[test]
    fn score_never_drops_below_zero() {
        let mut event = runtime();
        let id = add_player(&mut event, "p", 10);
        assert_eq!(event.apply_score_delta(id, -25), Some(0));
        assert_eq!(event.apply_score_delta(id, 50), Some(50));
    }

    #[test]
    fn clear_round_keeps_questions_and_codes() {
        let mut event = runtime();
        let player = add_player(&mut event, "p", 0);
        add_question(&mut event, QuestionCategory::World);
        add_code(&mut event, "red1", QrColor::Red);
        event.qr_codes["red1"].claimed_by = Some(player);

        event.clear_round();

        assert!(event.players.is_empty());
        assert_eq!(event.questions.len(), 1);
        assert_eq!(event.qr_codes["red1"].claimed_by, None);

        event.reset_all(&GameRules::default());
        assert!(event.questions.is_empty());
        assert!(event.qr_codes.is_empty());
    }

    #[test]
    fn removing_a_player_cascades_to_claims_photos_and_votes() {
        let mut event = runtime();
        let leaving = add_player(&mut event, "leaving", 0);
        let staying = add_player(&mut event, "staying", 0);
        add_code(&mut event, "red1", QrColor::Red);
        event.qr_codes["red1"].claimed_by = Some(leaving);

        let own_photo = Uuid::new_v4();
        let other_photo = Uuid::new_v4();
        for (id, owner, votes) in [(own_photo, leaving, 1), (other_photo, staying, 1)] {
            event.photos.insert(
                id,
                PhotoEntity {
                    id,
                    player_id: owner,
                    reference: "photo.jpg".into(),
                    votes,
                    submitted_at: NOW,
                },
            );
        }
        event.votes.insert((own_photo, staying));
        event.votes.insert((other_photo, leaving));

        assert!(event.remove_player(leaving).is_some());

        assert_eq!(event.qr_codes["red1"].claimed_by, None);
        assert!(!event.photos.contains_key(&own_photo));
        assert_eq!(event.photos[&other_photo].votes, 0);
        assert!(event.votes.is_empty());
    }

    #[test]
    fn completion_counts_distinct_answered_questions() {
        let mut event = runtime();
        assert_eq!(event.completion_percentage(), 0);
        let player = add_player(&mut event, "p", 0);
        let question = add_question(&mut event, QuestionCategory::Company);
        add_question(&mut event, QuestionCategory::Company);
        add_question(&mut event, QuestionCategory::World);
        for correct in [true, false] {
            event.answers.push(PlayerAnswerEntity {
                player_id: player,
                question_id: question,
                correct,
                answered_at: NOW,
            });
        }
        assert_eq!(event.completion_percentage(), 33);
        assert_eq!(event.correct_answer_count(), 1);
    }

    #[test]
    fn entity_conversion_preserves_the_aggregate() {
        let mut event = runtime();
        add_player(&mut event, "p", 5);
        event.game.clock.start(NOW, 10).unwrap();
        event.game.clock.pause(NOW).unwrap();
        event.game.password.reveal_manual(&[0, 3]);

        let entity = EventEntity::from(&event);
        assert!(entity.game.game_active);
        assert!(!entity.game.timer_running);

        let restored = EventRuntime::from(entity);
        assert_eq!(restored.game, event.game);
        assert_eq!(restored.players, event.players);
    }
}
