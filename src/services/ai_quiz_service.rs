//! AI quiz: players draw generated questions from shared and event-owned categories.

use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    dao::models::{AnswerLetter, Difficulty, EventId, PlayerAnswerEntity},
    dto::{
        host::{AiToggleResponse, HostAiCategoriesResponse, HostAiCategoryView},
        player::{AiAnswerResponse, AiCategoryItem, AiQuestionView},
    },
    error::ServiceError,
    services::{broadcast, question_generator::GenerationRequest},
    state::{SharedState, catalog::CategorySummary},
};

/// Points for a correct AI answer, before the bonus multiplier.
pub const AI_ANSWER_POINTS: i64 = 5;

/// Categories a player of the event can pick from.
pub async fn player_categories(
    state: &SharedState,
    event_id: EventId,
) -> Result<Vec<AiCategoryItem>, ServiceError> {
    if !state.event_exists(event_id) {
        return Err(ServiceError::StaleClient);
    }
    Ok(state
        .read_catalog(|catalog| {
            catalog
                .player_categories(event_id)
                .into_iter()
                .map(AiCategoryItem::from)
                .collect()
        })
        .await)
}

/// Serve a random question of the category the player has not answered yet.
pub async fn next_question(
    state: &SharedState,
    event_id: EventId,
    player_id: Uuid,
    category_id: Uuid,
) -> Result<AiQuestionView, ServiceError> {
    if !state.event_exists(event_id) {
        return Err(ServiceError::StaleClient);
    }
    let answered = state
        .read_event(event_id, |event| {
            event.players.contains_key(&player_id).then(|| {
                event
                    .ai_answers
                    .iter()
                    .filter(|answer| answer.player_id == player_id)
                    .map(|answer| answer.question_id)
                    .collect::<Vec<_>>()
            })
        })
        .await?
        .ok_or(ServiceError::StaleClient)?;

    let (category, question) = state
        .with_catalog_mut(|catalog, rng| {
            Ok(catalog.pick_question(category_id, event_id, &answered, rng)?)
        })
        .await?;
    Ok(AiQuestionView::build(&category, question))
}

/// Check an answer; each question counts once per player.
pub async fn answer(
    state: &SharedState,
    event_id: EventId,
    player_id: Uuid,
    question_id: Uuid,
    letter: &str,
) -> Result<AiAnswerResponse, ServiceError> {
    if !state.event_exists(event_id) {
        return Err(ServiceError::StaleClient);
    }
    let letter = AnswerLetter::parse(letter)
        .ok_or_else(|| ServiceError::InvalidInput("answer must be A, B or C".into()))?;
    let correct_answer = state
        .read_catalog(|catalog| catalog.question(question_id).map(|q| q.correct))
        .await
        .ok_or_else(|| ServiceError::NotFound(format!("question `{question_id}` not found")))?;
    let correct = letter == correct_answer;

    let (points_earned, total_score) = state
        .with_event_mut(event_id, |event, ctx| {
            if !event.players.contains_key(&player_id) {
                return Err(ServiceError::StaleClient);
            }
            let repeated = event
                .ai_answers
                .iter()
                .any(|a| a.player_id == player_id && a.question_id == question_id);
            if repeated {
                return Err(ServiceError::Conflict("question already answered".into()));
            }
            event.ai_answers.push(PlayerAnswerEntity {
                player_id,
                question_id,
                correct,
                answered_at: ctx.now,
            });
            let points = if correct {
                AI_ANSWER_POINTS * i64::from(event.game.bonus_multiplier)
            } else {
                0
            };
            let total = event
                .apply_score_delta(player_id, points)
                .ok_or(ServiceError::StaleClient)?;
            if correct {
                broadcast::queue_leaderboard(event, ctx);
            }
            Ok((points, total))
        })
        .await?;

    if correct {
        let counted = state
            .with_catalog_mut(|catalog, _rng| {
                catalog.record_correct(question_id);
                Ok(())
            })
            .await;
        if let Err(err) = counted {
            warn!(%question_id, error = %err, "failed to count correct AI answer");
        }
    }

    Ok(AiAnswerResponse {
        correct,
        points_earned,
        total_score,
        correct_answer,
    })
}

pub async fn host_categories(
    state: &SharedState,
    event_id: EventId,
) -> HostAiCategoriesResponse {
    state
        .read_catalog(|catalog| HostAiCategoriesResponse {
            default_categories: catalog
                .default_categories()
                .into_iter()
                .map(HostAiCategoryView::from)
                .collect(),
            custom_categories: catalog
                .custom_categories(event_id)
                .into_iter()
                .map(HostAiCategoryView::from)
                .collect(),
        })
        .await
}

/// Flip the active flag of a default category or one of the event's own.
pub async fn toggle_category(
    state: &SharedState,
    event_id: EventId,
    category_id: Uuid,
) -> Result<AiToggleResponse, ServiceError> {
    let is_active = state
        .with_catalog_mut(|catalog, _rng| Ok(catalog.toggle(category_id, event_id)?))
        .await?;
    Ok(AiToggleResponse {
        id: category_id,
        is_active,
    })
}

pub async fn set_difficulty(
    state: &SharedState,
    event_id: EventId,
    category_id: Uuid,
    difficulty: Difficulty,
) -> Result<(), ServiceError> {
    state
        .with_catalog_mut(|catalog, _rng| {
            Ok(catalog.set_difficulty(category_id, event_id, difficulty)?)
        })
        .await
}

/// Create a custom category, optionally filled by the question generator.
///
/// Generation runs before anything is stored: a generator failure leaves
/// neither the category nor any question behind.
pub async fn add_category(
    state: &SharedState,
    event_id: EventId,
    name: &str,
    difficulty: Difficulty,
    generate: bool,
) -> Result<HostAiCategoryView, ServiceError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ServiceError::InvalidInput("category name must not be empty".into()));
    }
    let duplicate = state
        .read_catalog(|catalog| {
            catalog
                .custom_categories(event_id)
                .iter()
                .any(|summary| summary.category.name == name)
        })
        .await;
    if duplicate {
        return Err(ServiceError::Conflict(format!("category `{name}` already exists")));
    }

    let drafts = if generate {
        let language = state
            .read_event(event_id, |event| event.game.language_player.clone())
            .await?;
        let request = GenerationRequest {
            category: name.to_owned(),
            difficulty,
            count: state.config().generator.questions_per_category,
            language,
        };
        let drafts = state.generator().generate(request).await?;
        info!(event_id, category = name, generated = drafts.len(), "questions generated");
        drafts
    } else {
        Vec::new()
    };

    let summary = state
        .with_catalog_mut(|catalog, _rng| {
            let id = catalog.add_custom(event_id, name, difficulty, generate)?;
            catalog.add_questions(id, drafts)?;
            let category = catalog
                .category(id)
                .cloned()
                .ok_or_else(|| ServiceError::NotFound("category vanished".into()))?;
            Ok(CategorySummary {
                question_count: catalog.question_count(id),
                category,
            })
        })
        .await?;
    Ok(summary.into())
}

/// Delete one of the event's custom categories and its questions.
pub async fn delete_category(
    state: &SharedState,
    event_id: EventId,
    category_id: Uuid,
) -> Result<(), ServiceError> {
    let removed = state
        .with_catalog_mut(|catalog, _rng| Ok(catalog.delete_custom(category_id, event_id)?))
        .await?;
    info!(event_id, category = %removed.name, "custom category deleted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, atomic::Ordering};

    use super::*;
    use crate::{
        services::{
            game_service, player_service, question_generator::tests::StaticGenerator,
        },
        state::tests::{test_state, test_state_with},
    };

    async fn player_with_category(state: &SharedState) -> (Uuid, Uuid) {
        let player = player_service::register(state, 1, "Ala").await.unwrap().id;
        let category = add_category(state, 1, "Movies", Difficulty::Easy, true)
            .await
            .unwrap();
        assert_eq!(category.question_count, 10);
        assert!(category.created_by_api);
        (player, category.id)
    }

    #[tokio::test]
    async fn questions_do_not_repeat_until_exhausted() {
        let (state, _) = test_state().await;
        let (player, category) = player_with_category(&state).await;

        let mut seen = Vec::new();
        for _ in 0..10 {
            let question = next_question(&state, 1, player, category).await.unwrap();
            assert!(!seen.contains(&question.question_id));
            seen.push(question.question_id);
            answer(&state, 1, player, question.question_id, "C").await.unwrap();
        }
        assert!(matches!(
            next_question(&state, 1, player, category).await,
            Err(ServiceError::Exhausted)
        ));
    }

    #[tokio::test]
    async fn correct_answer_pays_with_bonus_once() {
        let (state, _) = test_state().await;
        let (player, category) = player_with_category(&state).await;
        game_service::set_bonus(&state, 1, 3).await.unwrap();

        let question = next_question(&state, 1, player, category).await.unwrap();
        let response = answer(&state, 1, player, question.question_id, "a")
            .await
            .unwrap();
        assert!(response.correct);
        assert_eq!(response.points_earned, 15);
        assert_eq!(response.total_score, 15);
        assert_eq!(response.correct_answer, AnswerLetter::A);

        assert!(matches!(
            answer(&state, 1, player, question.question_id, "A").await,
            Err(ServiceError::Conflict(_))
        ));
        let times_correct = state
            .read_catalog(|c| c.question(question.question_id).map(|q| q.times_correct))
            .await;
        assert_eq!(times_correct, Some(1));
    }

    #[tokio::test]
    async fn wrong_answer_reveals_the_right_letter() {
        let (state, _) = test_state().await;
        let (player, category) = player_with_category(&state).await;
        let question = next_question(&state, 1, player, category).await.unwrap();
        let response = answer(&state, 1, player, question.question_id, "B")
            .await
            .unwrap();
        assert!(!response.correct);
        assert_eq!(response.points_earned, 0);
        assert_eq!(response.correct_answer, AnswerLetter::A);
    }

    #[tokio::test]
    async fn failed_generation_leaves_nothing_behind() {
        let generator = Arc::new(StaticGenerator::default());
        generator.fail.store(true, Ordering::SeqCst);
        let (state, _) = test_state_with(generator).await;

        assert!(matches!(
            add_category(&state, 1, "Movies", Difficulty::Advanced, true).await,
            Err(ServiceError::Generator(_))
        ));
        assert!(host_categories(&state, 1).await.custom_categories.is_empty());
    }

    #[tokio::test]
    async fn custom_categories_belong_to_their_event() {
        let (state, _) = test_state().await;
        state.create_event().await.unwrap();
        let own = add_category(&state, 1, "Office", Difficulty::Medium, false)
            .await
            .unwrap();
        assert!(matches!(
            add_category(&state, 1, " Office ", Difficulty::Medium, false).await,
            Err(ServiceError::Conflict(_))
        ));

        assert!(matches!(
            toggle_category(&state, 2, own.id).await,
            Err(ServiceError::Forbidden(_))
        ));
        assert!(matches!(
            delete_category(&state, 2, own.id).await,
            Err(ServiceError::Forbidden(_))
        ));
        let listed: Vec<String> = player_categories(&state, 2)
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert!(!listed.contains(&"Office".to_owned()));

        delete_category(&state, 1, own.id).await.unwrap();
        assert!(host_categories(&state, 1).await.custom_categories.is_empty());
    }

    #[tokio::test]
    async fn inactive_categories_are_hidden_from_players() {
        let (state, _) = test_state().await;
        let player = player_service::register(&state, 1, "Ala").await.unwrap().id;
        let first = player_categories(&state, 1).await.unwrap()[0].id;
        let toggled = toggle_category(&state, 1, first).await.unwrap();
        assert!(!toggled.is_active);

        assert!(
            player_categories(&state, 1)
                .await
                .unwrap()
                .iter()
                .all(|c| c.id != first)
        );
        assert!(matches!(
            next_question(&state, 1, player, first).await,
            Err(ServiceError::InvalidInput(_))
        ));
    }
}
