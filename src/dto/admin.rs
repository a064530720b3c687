//! DTO definitions used by the admin REST API and documentation layer.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    dao::models::{AiQuestionEntity, AnswerLetter, Difficulty, EventId},
    dto::{
        host::GenerateQrCodesRequest,
        validation::{validate_answer_letter, validate_event_date, validate_not_blank},
    },
    state::{catalog::QuestionPatch, event::EventRuntime},
};

/// Event as listed for administrators.
#[derive(Debug, Serialize, ToSchema)]
pub struct EventSummary {
    pub id: EventId,
    pub name: String,
    pub login: String,
    pub password: String,
    pub is_superhost: bool,
    pub event_date: Option<String>,
    pub logo_url: Option<String>,
    pub notes: String,
    /// `preparation`, `running`, `paused` or `finished`.
    pub status: String,
}

impl From<&EventRuntime> for EventSummary {
    fn from(value: &EventRuntime) -> Self {
        let record = &value.record;
        Self {
            id: record.id,
            name: record.name.clone(),
            login: record.login.clone(),
            password: record.password.clone(),
            is_superhost: record.superhost,
            event_date: record.event_date.clone(),
            logo_url: record.logo.clone(),
            notes: record.notes.clone(),
            status: value.status_label().into(),
        }
    }
}

/// Partial update of an event definition; omitted fields are kept.
#[derive(Debug, Default, Deserialize, ToSchema, Validate)]
pub struct UpdateEventRequest {
    #[validate(length(max = 120), custom(function = "validate_not_blank"))]
    pub name: Option<String>,
    #[validate(length(max = 80), custom(function = "validate_not_blank"))]
    pub login: Option<String>,
    #[validate(length(max = 120), custom(function = "validate_not_blank"))]
    pub password: Option<String>,
    pub is_superhost: Option<bool>,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
    /// `YYYY-MM-DD`; an empty string clears the date.
    pub event_date: Option<String>,
}

impl UpdateEventRequest {
    /// Validated date change: `Some(None)` clears, `Some(Some(d))` sets.
    pub fn date_change(&self) -> Result<Option<Option<String>>, validator::ValidationError> {
        match self.event_date.as_deref().map(str::trim) {
            None => Ok(None),
            Some("") => Ok(Some(None)),
            Some(date) => {
                validate_event_date(date)?;
                Ok(Some(Some(date.to_owned())))
            }
        }
    }
}

/// Reference to a logo file already stored by the upload proxy.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct SetLogoRequest {
    #[validate(length(max = 512), custom(function = "validate_not_blank"))]
    pub logo_url: String,
}

/// AI question row of the admin panel.
#[derive(Debug, Serialize, ToSchema)]
pub struct AdminAiQuestionView {
    pub id: Uuid,
    pub category_id: Uuid,
    pub text: String,
    pub option_a: String,
    pub option_b: String,
    pub option_c: String,
    pub correct_answer: AnswerLetter,
    pub difficulty: Difficulty,
    pub times_shown: u32,
    pub times_correct: u32,
}

impl From<AiQuestionEntity> for AdminAiQuestionView {
    fn from(value: AiQuestionEntity) -> Self {
        Self {
            id: value.id,
            category_id: value.category_id,
            text: value.text,
            option_a: value.option_a,
            option_b: value.option_b,
            option_c: value.option_c,
            correct_answer: value.correct,
            difficulty: value.difficulty,
            times_shown: value.times_shown,
            times_correct: value.times_correct,
        }
    }
}

/// Partial edit of an AI question.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct UpdateAiQuestionRequest {
    #[validate(custom(function = "validate_not_blank"))]
    pub text: Option<String>,
    #[validate(custom(function = "validate_not_blank"))]
    pub option_a: Option<String>,
    #[validate(custom(function = "validate_not_blank"))]
    pub option_b: Option<String>,
    #[validate(custom(function = "validate_not_blank"))]
    pub option_c: Option<String>,
    #[validate(custom(function = "validate_answer_letter"))]
    pub correct_answer: Option<String>,
    pub difficulty: Option<Difficulty>,
}

impl From<UpdateAiQuestionRequest> for QuestionPatch {
    fn from(value: UpdateAiQuestionRequest) -> Self {
        let trimmed = |s: Option<String>| s.map(|s| s.trim().to_owned());
        Self {
            text: trimmed(value.text),
            option_a: trimmed(value.option_a),
            option_b: trimmed(value.option_b),
            option_c: trimmed(value.option_c),
            correct: value.correct_answer.as_deref().and_then(AnswerLetter::parse),
            difficulty: value.difficulty,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SeedQuestionsResponse {
    pub loaded: usize,
}

/// Code counts for a chosen event.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct AdminQrCodesRequest {
    pub event_id: EventId,
    #[serde(flatten)]
    #[validate(nested)]
    pub counts: GenerateQrCodesRequest,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_date_clears_and_bad_date_is_rejected() {
        let clear = UpdateEventRequest {
            event_date: Some(" ".into()),
            ..Default::default()
        };
        assert_eq!(clear.date_change().unwrap(), Some(None));

        let bad = UpdateEventRequest {
            event_date: Some("June 1st".into()),
            ..Default::default()
        };
        assert!(bad.date_change().is_err());

        let untouched = UpdateEventRequest::default();
        assert_eq!(untouched.date_change().unwrap(), None);
    }

    #[test]
    fn question_patch_parses_letters() {
        let patch = QuestionPatch::from(UpdateAiQuestionRequest {
            text: Some(" New? ".into()),
            option_a: None,
            option_b: None,
            option_c: None,
            correct_answer: Some("c".into()),
            difficulty: None,
        });
        assert_eq!(patch.text.as_deref(), Some("New?"));
        assert_eq!(patch.correct, Some(AnswerLetter::C));
    }
}
