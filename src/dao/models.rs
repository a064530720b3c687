//! Documents persisted by a [`crate::dao::game_store::GameStore`].

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use utoipa::ToSchema;
use uuid::Uuid;

/// Numeric identifier of an event; the first event created is `1`.
pub type EventId = u32;

/// Color category printed on a QR code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum QrColor {
    /// Reusable quiz code for the `company` question pool.
    White,
    /// Reusable quiz code for the `world` question pool.
    Yellow,
    /// Minigame dispatch code.
    Green,
    /// One-shot reward code.
    Red,
    /// One-shot penalty code.
    WhiteTrap,
    /// One-shot photo challenge code.
    Pink,
    /// Any color this server does not know about; claimed without effect.
    #[serde(other)]
    Other,
}

impl QrColor {
    /// Whether the code can be redeemed repeatedly (subject to the scan cooldown).
    pub fn is_reusable(self) -> bool {
        matches!(self, QrColor::White | QrColor::Yellow)
    }

    /// Whether the code is claimed by the first player scanning it.
    pub fn is_one_shot(self) -> bool {
        !self.is_reusable() && self != QrColor::Green
    }
}

/// Pool a curated question belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum QuestionCategory {
    /// Questions about the hosting company (white codes).
    Company,
    /// General knowledge questions (yellow codes).
    World,
}

/// Difficulty tag attached to questions and AI categories.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    /// Basic knowledge.
    Easy,
    /// General knowledge.
    #[default]
    Medium,
    /// Specialist knowledge.
    #[serde(alias = "hard")]
    Advanced,
}

/// One of the three options of a multiple-choice question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum AnswerLetter {
    /// First option.
    A,
    /// Second option.
    B,
    /// Third option.
    C,
}

impl AnswerLetter {
    /// Parse a single option letter, accepting lowercase input.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "A" => Some(AnswerLetter::A),
            "B" => Some(AnswerLetter::B),
            "C" => Some(AnswerLetter::C),
            _ => None,
        }
    }
}

/// Password reveal policy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum RevealMode {
    /// A random hidden letter is revealed on every correct curated answer.
    #[default]
    Auto,
    /// The host picks the indices to reveal.
    Manual,
}

/// Minigame tracks reachable from green codes.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum MinigameTrack {
    /// Falling blocks.
    Tetris,
    /// Brick breaker.
    Arkanoid,
    /// Snake.
    Snake,
}

impl MinigameTrack {
    /// Every track in display order.
    pub const ALL: [MinigameTrack; 3] = [
        MinigameTrack::Tetris,
        MinigameTrack::Arkanoid,
        MinigameTrack::Snake,
    ];
}

/// Event definition and host credentials.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EventRecordEntity {
    /// Stable identifier.
    pub id: EventId,
    /// Display name.
    pub name: String,
    /// Host login.
    pub login: String,
    /// Host password, also used to re-authenticate destructive timer actions.
    pub password: String,
    /// Scheduled date formatted as `YYYY-MM-DD`.
    pub event_date: Option<String>,
    /// Free-text notes for administrators.
    pub notes: String,
    /// Reference to the stored logo file.
    pub logo: Option<String>,
    /// Grants QR code management to the host.
    pub superhost: bool,
}

/// Durable mirror of the per-event game parameters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GameStateEntity {
    /// A round was started and not stopped yet.
    pub game_active: bool,
    /// The clock is counting down (the round is not paused).
    pub timer_running: bool,
    /// Start of the round.
    #[serde(with = "time::serde::rfc3339::option")]
    pub started_at: Option<OffsetDateTime>,
    /// Instant the round expires while running.
    #[serde(with = "time::serde::rfc3339::option")]
    pub ends_at: Option<OffsetDateTime>,
    /// Start of the current pause, if any.
    #[serde(with = "time::serde::rfc3339::option")]
    pub pause_started_at: Option<OffsetDateTime>,
    /// Seconds spent paused over the whole round.
    pub total_paused_secs: f64,
    /// Seconds left on the clock when the current pause began.
    pub time_left_on_pause_secs: f64,
    /// Round length in seconds as last set by the host.
    pub initial_duration_secs: u32,
    /// Clock speed multiplier; `1` is real time.
    pub speed: u32,
    /// Multiplier applied to answer and minigame rewards.
    pub bonus_multiplier: u32,
    /// Normalized password secret; empty when unset.
    pub password: String,
    /// Positions of the secret revealed to everyone.
    pub revealed_indices: Vec<usize>,
    /// How letters of the secret get revealed.
    pub reveal_mode: RevealMode,
    /// Tracks that green codes must not offer.
    pub disabled_minigames: Vec<MinigameTrack>,
    /// Language of the player screens.
    pub language_player: String,
    /// Language of the host panel.
    pub language_host: String,
}

/// Registered player of an event.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlayerEntity {
    /// Identifier kept by the client in local storage.
    pub id: Uuid,
    /// Display name chosen at registration.
    pub name: String,
    /// Current score, never below zero.
    pub score: i64,
    /// Number of warnings issued by the host.
    pub warnings: u32,
    /// Letters of the password collected through minigames.
    pub revealed_letters: String,
    /// Accumulated minigame points per track.
    #[serde(default)]
    pub minigame_progress: MinigameProgressEntity,
    /// Registration instant.
    #[serde(with = "time::serde::rfc3339")]
    pub registered_at: OffsetDateTime,
}

/// Points a player accumulated on each minigame track.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct MinigameProgressEntity {
    /// Points on [`MinigameTrack::Tetris`].
    pub tetris: u32,
    /// Points on [`MinigameTrack::Arkanoid`].
    pub arkanoid: u32,
    /// Points on [`MinigameTrack::Snake`].
    pub snake: u32,
}

impl MinigameProgressEntity {
    /// Points collected on `track`.
    pub fn get(&self, track: MinigameTrack) -> u32 {
        match track {
            MinigameTrack::Tetris => self.tetris,
            MinigameTrack::Arkanoid => self.arkanoid,
            MinigameTrack::Snake => self.snake,
        }
    }

    /// Mutable access to the counter of `track`.
    pub fn get_mut(&mut self, track: MinigameTrack) -> &mut u32 {
        match track {
            MinigameTrack::Tetris => &mut self.tetris,
            MinigameTrack::Arkanoid => &mut self.arkanoid,
            MinigameTrack::Snake => &mut self.snake,
        }
    }
}

/// Curated multiple-choice question owned by an event.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct QuestionEntity {
    /// Stable identifier.
    pub id: Uuid,
    /// Question text.
    pub text: String,
    /// Option `A`.
    pub option_a: String,
    /// Option `B`.
    pub option_b: String,
    /// Option `C`.
    pub option_c: String,
    /// Correct option; never sent to players before they answer.
    pub correct: AnswerLetter,
    /// Hint shown to a player answering correctly; may be empty.
    pub letter_to_reveal: String,
    /// Pool the question is served from.
    pub category: QuestionCategory,
    /// Difficulty tag.
    pub difficulty: Difficulty,
    /// Answers received so far.
    pub times_shown: u32,
    /// Correct answers received so far.
    pub times_correct: u32,
}

/// Printable code; one-shot codes remember who claimed them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct QrCodeEntity {
    /// Identifier printed in the code, such as `red3`.
    pub code: String,
    /// Behaviour of the code.
    pub color: QrColor,
    /// Player who claimed a one-shot code.
    pub claimed_by: Option<Uuid>,
}

/// Audit line for a reusable code redemption.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlayerScanEntity {
    /// Scanning player.
    pub player_id: Uuid,
    /// Color of the redeemed code; drives the cooldown.
    pub color: QrColor,
    /// Instant a question was served for the scan.
    #[serde(with = "time::serde::rfc3339")]
    pub scanned_at: OffsetDateTime,
}

/// Answer given by a player, for both curated and AI questions.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlayerAnswerEntity {
    /// Answering player.
    pub player_id: Uuid,
    /// Curated or AI question answered; at most one answer per player.
    pub question_id: Uuid,
    /// Whether the chosen option was the right one.
    pub correct: bool,
    /// Instant the answer was recorded.
    #[serde(with = "time::serde::rfc3339")]
    pub answered_at: OffsetDateTime,
}

/// Photo reference submitted by a player.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PhotoEntity {
    /// Stable identifier.
    pub id: Uuid,
    /// Author of the photo.
    pub player_id: Uuid,
    /// Location of the stored image, as given by the upload proxy.
    pub reference: String,
    /// Number of [`PhotoVoteEntity`] rows for this photo.
    pub votes: u32,
    /// Submission instant.
    #[serde(with = "time::serde::rfc3339")]
    pub submitted_at: OffsetDateTime,
}

/// Unique (photo, voter) pair.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct PhotoVoteEntity {
    /// Photo voted for.
    pub photo_id: Uuid,
    /// Voting player.
    pub voter_id: Uuid,
}

/// Full event aggregate as written to storage.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EventEntity {
    /// Definition and host credentials.
    pub event: EventRecordEntity,
    /// Clock, password and round settings.
    pub game: GameStateEntity,
    /// Players in registration order.
    pub players: Vec<PlayerEntity>,
    /// Curated questions.
    pub questions: Vec<QuestionEntity>,
    /// Printable codes.
    pub qr_codes: Vec<QrCodeEntity>,
    /// Redemptions of reusable codes.
    pub scans: Vec<PlayerScanEntity>,
    /// Answers to curated questions.
    pub answers: Vec<PlayerAnswerEntity>,
    /// Answers to AI quiz questions.
    pub ai_answers: Vec<PlayerAnswerEntity>,
    /// Submitted photos.
    pub photos: Vec<PhotoEntity>,
    /// Photo votes.
    pub votes: Vec<PhotoVoteEntity>,
}

/// AI quiz category, either global (`event_id` unset) or owned by one event.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AiCategoryEntity {
    /// Stable identifier.
    pub id: Uuid,
    /// Display name, unique per owner.
    pub name: String,
    /// Difficulty of generated questions.
    pub difficulty: Difficulty,
    /// Offered to players.
    pub active: bool,
    /// Owning event; `None` for default categories.
    pub event_id: Option<EventId>,
    /// Questions were produced by the external generator.
    pub generated: bool,
}

impl AiCategoryEntity {
    /// Default categories are shared by every event.
    pub fn is_default(&self) -> bool {
        self.event_id.is_none()
    }
}

/// AI quiz question; awards points only.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AiQuestionEntity {
    /// Stable identifier.
    pub id: Uuid,
    /// Category the question belongs to.
    pub category_id: Uuid,
    /// Question text.
    pub text: String,
    /// Option `A`.
    pub option_a: String,
    /// Option `B`.
    pub option_b: String,
    /// Option `C`.
    pub option_c: String,
    /// Correct option.
    pub correct: AnswerLetter,
    /// Difficulty tag.
    pub difficulty: Difficulty,
    /// Times a player drew the question.
    pub times_shown: u32,
    /// Correct answers received so far.
    pub times_correct: u32,
}

/// Global AI question catalog document.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct AiCatalogEntity {
    /// Default and event-owned categories.
    pub categories: Vec<AiCategoryEntity>,
    /// Questions of every category.
    pub questions: Vec<AiQuestionEntity>,
}
