//! DTO definitions used by player mobile clients.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    dao::models::{
        AiCategoryEntity, AiQuestionEntity, AnswerLetter, Difficulty, EventId, MinigameTrack,
        PlayerEntity, QuestionCategory,
    },
    dto::validation::{validate_answer_letter, validate_not_blank},
    state::redemption::{
        MINIGAME_COMPLETION_POINTS, MinigameOutcome, ScanOutcome, ServedQuestion,
    },
};

/// Registration of a new player.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct RegisterPlayerRequest {
    #[validate(length(max = 80), custom(function = "validate_not_blank"))]
    pub name: String,
    pub event_id: EventId,
}

/// Identity the client keeps in local storage.
#[derive(Debug, Serialize, ToSchema)]
pub struct RegisteredPlayer {
    pub id: Uuid,
    pub name: String,
    pub score: i64,
    pub event_id: EventId,
}

impl RegisteredPlayer {
    pub fn build(event_id: EventId, player: &PlayerEntity) -> Self {
        Self {
            id: player.id,
            name: player.name.clone(),
            score: player.score,
            event_id,
        }
    }
}

/// QR code scanned by a player.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct ScanRequest {
    pub player_id: Uuid,
    pub event_id: EventId,
    #[validate(custom(function = "validate_not_blank"))]
    pub qr_code: String,
}

/// Question body sent after a quiz code scan.
#[derive(Debug, Serialize, ToSchema)]
pub struct QuestionPayload {
    pub id: Uuid,
    pub text: String,
    pub option_a: String,
    pub option_b: String,
    pub option_c: String,
    pub category: QuestionCategory,
}

impl From<ServedQuestion> for QuestionPayload {
    fn from(value: ServedQuestion) -> Self {
        Self {
            id: value.id,
            text: value.text,
            option_a: value.option_a,
            option_b: value.option_b,
            option_c: value.option_c,
            category: value.category,
        }
    }
}

/// Outcome of a scan, discriminated by `status`.
#[derive(Debug, Serialize, ToSchema)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ScanResponse {
    /// Same color scanned too early; served with HTTP 429.
    Wait {
        remaining_seconds: u64,
        message: String,
    },
    Question { question: QuestionPayload },
    Minigame {
        game: MinigameTrack,
        current_score: u32,
        target: u32,
        message: String,
    },
    PhotoChallenge,
    Info {
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        score: Option<i64>,
    },
}

impl ScanResponse {
    pub fn is_wait(&self) -> bool {
        matches!(self, ScanResponse::Wait { .. })
    }
}

impl From<ScanOutcome> for ScanResponse {
    fn from(value: ScanOutcome) -> Self {
        match value {
            ScanOutcome::Wait { remaining_seconds } => ScanResponse::Wait {
                remaining_seconds,
                message: format!(
                    "Wait another {}m {}s.",
                    remaining_seconds / 60,
                    remaining_seconds % 60
                ),
            },
            ScanOutcome::Question(question) => ScanResponse::Question {
                question: question.into(),
            },
            ScanOutcome::CategoryExhausted(_) => ScanResponse::Info {
                message: "You answered every question of this category!".into(),
                score: None,
            },
            ScanOutcome::Minigame {
                track,
                current_score,
                target,
            } => ScanResponse::Minigame {
                game: track,
                current_score,
                target,
                message: format!("Minigame time! Your progress: {current_score}/{target} pts"),
            },
            ScanOutcome::MinigameUnavailable(reason) => ScanResponse::Info {
                message: reason.message().into(),
                score: None,
            },
            ScanOutcome::Reward { points, score } => ScanResponse::Info {
                message: format!("Special code! You earn {points} points!"),
                score: Some(score),
            },
            ScanOutcome::Penalty { points, score } => ScanResponse::Info {
                message: format!("Trap! You lose {points} points."),
                score: Some(score),
            },
            ScanOutcome::PhotoChallenge => ScanResponse::PhotoChallenge,
            ScanOutcome::Claimed => ScanResponse::Info {
                message: "Unidentified code.".into(),
                score: None,
            },
        }
    }
}

/// Answer to a curated question.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct AnswerRequest {
    pub player_id: Uuid,
    pub event_id: EventId,
    pub question_id: Uuid,
    #[validate(custom(function = "validate_answer_letter"))]
    pub answer: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AnswerResponse {
    pub correct: bool,
    /// Letter revealed to the player on a correct answer.
    pub letter: Option<String>,
    pub score: i64,
}

/// Points reported by a finished minigame session.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct MinigameCompleteRequest {
    pub player_id: Uuid,
    pub event_id: EventId,
    pub game: MinigameTrack,
    #[validate(range(min = 0, max = 10_000))]
    pub score: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MinigameCompleteResponse {
    pub success: bool,
    pub completed: bool,
    pub progress: u32,
    pub target: u32,
    pub points_earned: i64,
    pub total_score: i64,
    pub letter_revealed: Option<String>,
}

impl MinigameCompleteResponse {
    pub fn build(outcome: &MinigameOutcome, bonus: u32) -> Self {
        Self {
            success: true,
            completed: outcome.completed,
            progress: outcome.progress,
            target: outcome.target,
            points_earned: if outcome.completed {
                MINIGAME_COMPLETION_POINTS * i64::from(bonus)
            } else {
                0
            },
            total_score: outcome.score,
            letter_revealed: outcome.revealed_letter.map(String::from),
        }
    }
}

/// Reference to a photo already stored by the upload proxy.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct SubmitPhotoRequest {
    pub player_id: Uuid,
    pub event_id: EventId,
    #[validate(length(max = 512), custom(function = "validate_not_blank"))]
    pub image_url: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PhotoSubmitted {
    pub photo_id: Uuid,
}

/// Vote toggle or vote check issued by a player.
#[derive(Debug, Deserialize, ToSchema, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct VoteRequest {
    pub player_id: Uuid,
    pub event_id: EventId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum VoteAction {
    Added,
    Removed,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct VoteResponse {
    pub action: VoteAction,
    pub votes: u32,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CheckVoteResponse {
    pub voted: bool,
}

/// AI quiz category a player may pick.
#[derive(Debug, Serialize, ToSchema)]
pub struct AiCategoryItem {
    pub id: Uuid,
    pub name: String,
    pub difficulty: Difficulty,
    pub is_custom: bool,
}

impl From<AiCategoryEntity> for AiCategoryItem {
    fn from(value: AiCategoryEntity) -> Self {
        Self {
            is_custom: !value.is_default(),
            id: value.id,
            name: value.name,
            difficulty: value.difficulty,
        }
    }
}

/// Ask for an unanswered question of one category.
#[derive(Debug, Deserialize, ToSchema)]
pub struct AiQuestionRequest {
    pub player_id: Uuid,
    pub event_id: EventId,
    pub category_id: Uuid,
}

/// The three answer options keyed by letter.
#[derive(Debug, Serialize, ToSchema)]
pub struct AnswerOptions {
    #[serde(rename = "A")]
    pub a: String,
    #[serde(rename = "B")]
    pub b: String,
    #[serde(rename = "C")]
    pub c: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AiQuestionView {
    pub question_id: Uuid,
    pub question_text: String,
    pub options: AnswerOptions,
    pub category_name: String,
    pub difficulty: Difficulty,
}

impl AiQuestionView {
    pub fn build(category: &AiCategoryEntity, question: AiQuestionEntity) -> Self {
        Self {
            question_id: question.id,
            question_text: question.text,
            options: AnswerOptions {
                a: question.option_a,
                b: question.option_b,
                c: question.option_c,
            },
            category_name: category.name.clone(),
            difficulty: question.difficulty,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct AiAnswerRequest {
    pub player_id: Uuid,
    pub event_id: EventId,
    pub question_id: Uuid,
    #[validate(custom(function = "validate_answer_letter"))]
    pub answer: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AiAnswerResponse {
    pub correct: bool,
    pub points_earned: i64,
    pub total_score: i64,
    pub correct_answer: AnswerLetter,
}
