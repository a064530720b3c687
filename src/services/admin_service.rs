//! Business logic powering the admin REST routes: event definitions, full
//! resets and the shared AI catalog.

use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    dao::models::EventId,
    dto::{
        admin::{AdminAiQuestionView, EventSummary, SeedQuestionsResponse, UpdateEventRequest},
        host::HostAiCategoryView,
    },
    error::ServiceError,
    services::broadcast,
    state::{SharedState, catalog::QuestionPatch},
};

/// The first event always exists.
const PROTECTED_EVENT: EventId = 1;

pub async fn list_events(state: &SharedState) -> Result<Vec<EventSummary>, ServiceError> {
    let mut events = Vec::new();
    for event_id in state.event_ids() {
        match state.read_event(event_id, |event| EventSummary::from(event)).await {
            Ok(summary) => events.push(summary),
            // Deleted between listing and reading.
            Err(ServiceError::NotFound(_)) => continue,
            Err(err) => return Err(err),
        }
    }
    Ok(events)
}

pub async fn create_event(state: &SharedState) -> Result<EventSummary, ServiceError> {
    let runtime = state.create_event().await?;
    Ok(EventSummary::from(&runtime))
}

/// Apply the provided fields to the event definition.
pub async fn update_event(
    state: &SharedState,
    event_id: EventId,
    request: UpdateEventRequest,
) -> Result<EventSummary, ServiceError> {
    let date = request
        .date_change()
        .map_err(|_| ServiceError::InvalidInput("event date must be YYYY-MM-DD".into()))?;
    if let Some(login) = request.login.as_deref() {
        ensure_login_free(state, event_id, login.trim()).await?;
    }

    state
        .with_event_mut(event_id, |event, _ctx| {
            let record = &mut event.record;
            if let Some(name) = request.name {
                record.name = name.trim().to_owned();
            }
            if let Some(login) = request.login {
                record.login = login.trim().to_owned();
            }
            if let Some(password) = request.password {
                record.password = password.trim().to_owned();
            }
            if let Some(superhost) = request.is_superhost {
                record.superhost = superhost;
            }
            if let Some(notes) = request.notes {
                record.notes = notes;
            }
            if let Some(date) = date {
                record.event_date = date;
            }
            Ok(EventSummary::from(&*event))
        })
        .await
}

/// Host logins identify the event, so two events cannot share one.
async fn ensure_login_free(
    state: &SharedState,
    event_id: EventId,
    login: &str,
) -> Result<(), ServiceError> {
    for other in state.event_ids().into_iter().filter(|id| *id != event_id) {
        let taken = state
            .read_event(other, |event| event.record.login == login)
            .await
            .unwrap_or(false);
        if taken {
            return Err(ServiceError::Conflict(format!(
                "login `{login}` is already used by event {other}"
            )));
        }
    }
    Ok(())
}

pub async fn delete_event(state: &SharedState, event_id: EventId) -> Result<(), ServiceError> {
    if event_id == PROTECTED_EVENT {
        return Err(ServiceError::Forbidden(format!(
            "event {PROTECTED_EVENT} cannot be deleted"
        )));
    }
    let removed = state.remove_event(event_id).await?;
    if let Some(logo) = removed.record.logo.as_deref() {
        state.files().delete(logo).await;
    }
    for photo in removed.photos.values() {
        state.files().delete(&photo.reference).await;
    }
    Ok(())
}

/// Point the event at an uploaded logo, removing the previous file.
pub async fn set_logo(
    state: &SharedState,
    event_id: EventId,
    reference: &str,
) -> Result<EventSummary, ServiceError> {
    let reference = reference.trim().to_owned();
    let (summary, previous) = state
        .with_event_mut(event_id, |event, _ctx| {
            let previous = event.record.logo.replace(reference);
            Ok((EventSummary::from(&*event), previous))
        })
        .await?;
    if let Some(previous) = previous.filter(|p| Some(p) != summary.logo_url.as_ref()) {
        state.files().delete(&previous).await;
    }
    Ok(summary)
}

pub async fn delete_logo(
    state: &SharedState,
    event_id: EventId,
) -> Result<EventSummary, ServiceError> {
    let (summary, previous) = state
        .with_event_mut(event_id, |event, _ctx| {
            let previous = event.record.logo.take();
            Ok((EventSummary::from(&*event), previous))
        })
        .await?;
    if let Some(previous) = previous {
        state.files().delete(&previous).await;
    }
    Ok(summary)
}

/// Wipe everything the event accumulated; only the definition and credentials survive.
pub async fn reset_event(
    state: &SharedState,
    event_id: EventId,
) -> Result<EventSummary, ServiceError> {
    let rules = &state.config().rules;
    let (summary, files) = state
        .with_event_mut(event_id, |event, ctx| {
            let mut files: Vec<String> = event
                .photos
                .values()
                .map(|photo| photo.reference.clone())
                .collect();
            files.extend(event.record.logo.take());
            event.reset_all(rules);
            broadcast::queue_full_refresh(event, ctx);
            Ok((EventSummary::from(&*event), files))
        })
        .await?;
    for file in &files {
        state.files().delete(file).await;
    }
    info!(event_id, removed_files = files.len(), "event reset");
    Ok(summary)
}

pub async fn default_categories(state: &SharedState) -> Vec<HostAiCategoryView> {
    state
        .read_catalog(|catalog| {
            catalog
                .default_categories()
                .into_iter()
                .map(HostAiCategoryView::from)
                .collect()
        })
        .await
}

pub async fn category_questions(
    state: &SharedState,
    category_id: Uuid,
) -> Result<Vec<AdminAiQuestionView>, ServiceError> {
    state
        .read_catalog(|catalog| {
            catalog
                .category(category_id)
                .map(|_| {
                    catalog
                        .questions_of(category_id)
                        .into_iter()
                        .map(AdminAiQuestionView::from)
                        .collect()
                })
                .ok_or_else(|| {
                    ServiceError::NotFound(format!("category `{category_id}` not found"))
                })
        })
        .await
}

pub async fn update_ai_question(
    state: &SharedState,
    question_id: Uuid,
    patch: QuestionPatch,
) -> Result<AdminAiQuestionView, ServiceError> {
    let question = state
        .with_catalog_mut(|catalog, _rng| Ok(catalog.update_question(question_id, patch)?))
        .await?;
    Ok(question.into())
}

/// Fill empty default categories from the configured seed set.
pub async fn load_seed_questions(
    state: &SharedState,
) -> Result<SeedQuestionsResponse, ServiceError> {
    let seed = &state.config().ai_seed;
    if seed.is_empty() {
        warn!("no seed questions configured");
        return Ok(SeedQuestionsResponse { loaded: 0 });
    }
    let loaded = state
        .with_catalog_mut(|catalog, _rng| Ok(catalog.load_seed(seed)))
        .await?;
    info!(loaded, "seed questions loaded");
    Ok(SeedQuestionsResponse { loaded })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        dao::models::{AnswerLetter, QrColor, QuestionCategory},
        dto::sse::names,
        services::{game_service, photo_service, player_service},
        state::{
            event::tests::{add_code, add_question},
            tests::test_state,
        },
    };

    #[tokio::test]
    async fn first_event_cannot_be_deleted() {
        let (state, _) = test_state().await;
        assert!(matches!(
            delete_event(&state, 1).await,
            Err(ServiceError::Forbidden(_))
        ));
        let created = create_event(&state).await.unwrap();
        assert_eq!(created.id, 2);
        delete_event(&state, 2).await.unwrap();
        assert_eq!(list_events(&state).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn update_applies_only_given_fields() {
        let (state, _) = test_state().await;
        let summary = update_event(
            &state,
            1,
            UpdateEventRequest {
                name: Some(" Summer party ".into()),
                event_date: Some("2026-07-01".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(summary.name, "Summer party");
        assert_eq!(summary.login, "host1");
        assert_eq!(summary.event_date.as_deref(), Some("2026-07-01"));

        let cleared = update_event(
            &state,
            1,
            UpdateEventRequest {
                event_date: Some(String::new()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(cleared.event_date, None);
    }

    #[tokio::test]
    async fn logins_stay_unique() {
        let (state, _) = test_state().await;
        create_event(&state).await.unwrap();
        let clash = update_event(
            &state,
            2,
            UpdateEventRequest {
                login: Some("host1".into()),
                ..Default::default()
            },
        )
        .await;
        assert!(matches!(clash, Err(ServiceError::Conflict(_))));
    }

    #[tokio::test]
    async fn reset_clears_content_but_keeps_credentials() {
        let (state, _) = test_state().await;
        state
            .with_event_mut(1, |event, _| {
                add_question(event, QuestionCategory::World);
                add_code(event, "red1", QrColor::Red);
                event.record.logo = Some("logos/one.png".into());
                Ok(())
            })
            .await
            .unwrap();
        game_service::start_game(&state, 1, None).await.unwrap();
        let ala = player_service::register(&state, 1, "Ala").await.unwrap().id;
        photo_service::submit(&state, 1, ala, "photos/a.jpg").await.unwrap();
        let mut receiver = state.hub().subscribe(1);

        let summary = reset_event(&state, 1).await.unwrap();

        assert_eq!(summary.status, "preparation");
        assert_eq!(summary.logo_url, None);
        assert_eq!(summary.password, "password1");
        let empty = state
            .read_event(1, |e| {
                e.players.is_empty()
                    && e.questions.is_empty()
                    && e.qr_codes.is_empty()
                    && e.photos.is_empty()
            })
            .await
            .unwrap();
        assert!(empty);
        let first = receiver.recv().await.unwrap();
        assert_eq!(first.event.as_deref(), Some(names::GAME_STATE_UPDATE));
    }

    #[tokio::test]
    async fn ai_questions_can_be_listed_and_edited() {
        let (state, _) = test_state().await;
        let categories = default_categories(&state).await;
        assert_eq!(categories.len(), 10);
        let category_id = categories[0].id;
        state
            .with_catalog_mut(|catalog, _| {
                Ok(catalog.add_questions(
                    category_id,
                    [crate::state::catalog::QuestionDraft {
                        text: "Capital of France?".into(),
                        option_a: "Paris".into(),
                        option_b: "Rome".into(),
                        option_c: "Oslo".into(),
                        correct: AnswerLetter::A,
                        difficulty: Default::default(),
                    }],
                )?)
            })
            .await
            .unwrap();

        let questions = category_questions(&state, category_id).await.unwrap();
        assert_eq!(questions.len(), 1);
        let edited = update_ai_question(
            &state,
            questions[0].id,
            QuestionPatch {
                correct: Some(AnswerLetter::B),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(edited.correct_answer, AnswerLetter::B);
        assert_eq!(edited.text, "Capital of France?");

        assert!(matches!(
            category_questions(&state, Uuid::new_v4()).await,
            Err(ServiceError::NotFound(_))
        ));
    }
}
