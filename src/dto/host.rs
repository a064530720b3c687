//! DTO definitions used by the host control panel.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    dao::models::{
        AnswerLetter, Difficulty, MinigameTrack, PlayerEntity, QrCodeEntity, QrColor,
        QuestionCategory, QuestionEntity, RevealMode,
    },
    dto::validation::{validate_answer_letter, validate_language, validate_not_blank},
    state::{catalog::CategorySummary, event::EventRuntime},
};

/// Start of a new round.
#[derive(Debug, Default, Deserialize, ToSchema, Validate)]
pub struct StartGameRequest {
    /// Round length; the configured default applies when omitted.
    #[validate(range(min = 1, max = 1440))]
    pub minutes: Option<u32>,
}

#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct SpeedRequest {
    #[validate(range(min = 1, max = 100))]
    pub speed: u32,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SpeedResponse {
    pub speed: u32,
}

#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct BonusRequest {
    #[validate(range(min = 1, max = 10))]
    pub multiplier: u32,
}

/// Destructive timer action re-authenticated with the event password.
#[derive(Debug, Deserialize, ToSchema)]
pub struct StopGameRequest {
    pub password: String,
}

#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct AdjustTimeRequest {
    #[validate(range(min = 1, max = 1440))]
    pub minutes: u32,
    pub password: String,
}

/// Languages of the player and host interfaces; omitted values are kept.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct LanguageRequest {
    #[validate(custom(function = "validate_language"))]
    pub language_player: Option<String>,
    #[validate(custom(function = "validate_language"))]
    pub language_host: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct SetPasswordRequest {
    #[validate(length(max = 50), custom(function = "validate_not_blank"))]
    pub password: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RevealModeRequest {
    pub mode: RevealMode,
}

#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct RevealLettersRequest {
    #[validate(length(min = 1))]
    pub indices: Vec<usize>,
}

/// Player row of the host panel.
#[derive(Debug, Serialize, ToSchema)]
pub struct PlayerView {
    pub id: Uuid,
    pub name: String,
    pub score: i64,
    pub warnings: u32,
}

impl From<&PlayerEntity> for PlayerView {
    fn from(value: &PlayerEntity) -> Self {
        Self {
            id: value.id,
            name: value.name.clone(),
            score: value.score,
            warnings: value.warnings,
        }
    }
}

/// Curated question as created or edited by the host.
#[derive(Debug, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct QuestionInput {
    #[validate(custom(function = "validate_not_blank"))]
    pub text: String,
    #[validate(length(equal = 3))]
    pub answers: Vec<String>,
    #[validate(custom(function = "validate_answer_letter"))]
    pub correct_answer: String,
    /// Letter shown to the player on a correct answer; `X` when omitted.
    #[validate(length(max = 1))]
    pub letter_to_reveal: Option<String>,
    pub category: Option<QuestionCategory>,
    pub difficulty: Option<Difficulty>,
}

impl QuestionInput {
    /// Apply the input to `question`, keeping its counters.
    pub fn apply(self, question: &mut QuestionEntity) {
        let [a, b, c] = self.options();
        question.text = self.text.trim().to_owned();
        question.option_a = a;
        question.option_b = b;
        question.option_c = c;
        question.correct = AnswerLetter::parse(&self.correct_answer).unwrap_or(question.correct);
        question.letter_to_reveal = self
            .letter_to_reveal
            .as_deref()
            .map(str::trim)
            .filter(|letter| !letter.is_empty())
            .unwrap_or("X")
            .to_uppercase();
        question.category = self.category.unwrap_or(QuestionCategory::Company);
        question.difficulty = self.difficulty.unwrap_or_default();
    }

    fn options(&self) -> [String; 3] {
        let option = |i: usize| {
            self.answers
                .get(i)
                .map(|s| s.trim().to_owned())
                .unwrap_or_default()
        };
        [option(0), option(1), option(2)]
    }

    /// Build a fresh question with zeroed counters.
    pub fn into_entity(self) -> QuestionEntity {
        let mut question = QuestionEntity {
            id: Uuid::new_v4(),
            text: String::new(),
            option_a: String::new(),
            option_b: String::new(),
            option_c: String::new(),
            correct: AnswerLetter::A,
            letter_to_reveal: String::new(),
            category: QuestionCategory::Company,
            difficulty: Difficulty::default(),
            times_shown: 0,
            times_correct: 0,
        };
        self.apply(&mut question);
        question
    }
}

/// Curated question with its statistics.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct QuestionView {
    pub id: Uuid,
    pub text: String,
    pub answers: [String; 3],
    pub correct_answer: AnswerLetter,
    pub letter_to_reveal: String,
    pub category: QuestionCategory,
    pub difficulty: Difficulty,
    pub times_shown: u32,
    pub times_correct: u32,
}

impl From<&QuestionEntity> for QuestionView {
    fn from(value: &QuestionEntity) -> Self {
        Self {
            id: value.id,
            text: value.text.clone(),
            answers: [
                value.option_a.clone(),
                value.option_b.clone(),
                value.option_c.clone(),
            ],
            correct_answer: value.correct,
            letter_to_reveal: value.letter_to_reveal.clone(),
            category: value.category,
            difficulty: value.difficulty,
            times_shown: value.times_shown,
            times_correct: value.times_correct,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MinigameStatusResponse {
    pub tetris_enabled: bool,
    pub arkanoid_enabled: bool,
    pub snake_enabled: bool,
}

impl MinigameStatusResponse {
    pub fn build(event: &EventRuntime) -> Self {
        Self {
            tetris_enabled: event.game.minigame_enabled(MinigameTrack::Tetris),
            arkanoid_enabled: event.game.minigame_enabled(MinigameTrack::Arkanoid),
            snake_enabled: event.game.minigame_enabled(MinigameTrack::Snake),
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct MinigameToggleRequest {
    pub game_type: MinigameTrack,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MinigameToggleResponse {
    pub game_type: MinigameTrack,
    pub enabled: bool,
}

#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct HostMessageRequest {
    #[validate(length(min = 1, max = 500), custom(function = "validate_not_blank"))]
    pub message: String,
}

/// Number of one-shot codes of each color to create; fixed quiz codes are always added.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct GenerateQrCodesRequest {
    #[validate(range(max = 200))]
    #[serde(default)]
    pub red: u32,
    #[validate(range(max = 200))]
    #[serde(default)]
    pub white_trap: u32,
    #[validate(range(max = 200))]
    #[serde(default)]
    pub green: u32,
    #[validate(range(max = 200))]
    #[serde(default)]
    pub pink: u32,
}

/// QR code with its claimant, for superhosts.
#[derive(Debug, Serialize, ToSchema)]
pub struct QrCodeView {
    pub code: String,
    pub color: QrColor,
    pub claimed_by: Option<String>,
}

impl QrCodeView {
    pub fn build(event: &EventRuntime, code: &QrCodeEntity) -> Self {
        Self {
            code: code.code.clone(),
            color: code.color,
            claimed_by: code
                .claimed_by
                .and_then(|id| event.players.get(&id))
                .map(|player| player.name.clone()),
        }
    }
}

#[derive(Debug, Default, Serialize, ToSchema)]
pub struct QrCodeCounts {
    pub white: usize,
    pub yellow: usize,
    pub red: usize,
    pub white_trap: usize,
    pub green: usize,
    pub pink: usize,
    pub other: usize,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct QrCodeListing {
    pub codes: Vec<QrCodeView>,
    pub counts: QrCodeCounts,
}

impl QrCodeListing {
    pub fn build(event: &EventRuntime) -> Self {
        let mut counts = QrCodeCounts::default();
        for code in event.qr_codes.values() {
            let slot = match code.color {
                QrColor::White => &mut counts.white,
                QrColor::Yellow => &mut counts.yellow,
                QrColor::Red => &mut counts.red,
                QrColor::WhiteTrap => &mut counts.white_trap,
                QrColor::Green => &mut counts.green,
                QrColor::Pink => &mut counts.pink,
                QrColor::Other => &mut counts.other,
            };
            *slot += 1;
        }
        Self {
            codes: event
                .qr_codes
                .values()
                .map(|code| QrCodeView::build(event, code))
                .collect(),
            counts,
        }
    }
}

/// AI category row of the host panel.
#[derive(Debug, Serialize, ToSchema)]
pub struct HostAiCategoryView {
    pub id: Uuid,
    pub name: String,
    pub difficulty: Difficulty,
    pub is_active: bool,
    pub question_count: usize,
    pub created_by_api: bool,
}

impl From<CategorySummary> for HostAiCategoryView {
    fn from(value: CategorySummary) -> Self {
        Self {
            id: value.category.id,
            name: value.category.name,
            difficulty: value.category.difficulty,
            is_active: value.category.active,
            question_count: value.question_count,
            created_by_api: value.category.generated,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HostAiCategoriesResponse {
    pub default_categories: Vec<HostAiCategoryView>,
    pub custom_categories: Vec<HostAiCategoryView>,
}

#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct CreateAiCategoryRequest {
    #[validate(length(max = 100), custom(function = "validate_not_blank"))]
    pub name: String,
    #[serde(default)]
    pub difficulty: Difficulty,
    /// Ask the external generator to fill the category.
    #[serde(default)]
    pub generate_questions: bool,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AiDifficultyRequest {
    pub difficulty: Difficulty,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AiToggleResponse {
    pub id: Uuid,
    pub is_active: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(letter: Option<&str>) -> QuestionInput {
        QuestionInput {
            text: " Who founded us? ".into(),
            answers: vec!["Ann".into(), " Bob ".into(), "Cid".into()],
            correct_answer: "b".into(),
            letter_to_reveal: letter.map(String::from),
            category: None,
            difficulty: None,
        }
    }

    #[test]
    fn question_input_applies_defaults() {
        let question = input(None).into_entity();
        assert_eq!(question.text, "Who founded us?");
        assert_eq!(question.option_b, "Bob");
        assert_eq!(question.correct, AnswerLetter::B);
        assert_eq!(question.letter_to_reveal, "X");
        assert_eq!(question.category, QuestionCategory::Company);
        assert_eq!(question.difficulty, Difficulty::Medium);
    }

    #[test]
    fn reveal_letter_is_uppercased() {
        assert_eq!(input(Some("q")).into_entity().letter_to_reveal, "Q");
    }

    #[test]
    fn question_input_needs_three_answers() {
        let mut request = input(None);
        request.answers.pop();
        assert!(request.validate().is_err());
    }
}
