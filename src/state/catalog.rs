//! Global AI quiz catalog: shared default categories plus event-owned custom ones.

use indexmap::IndexMap;
use rand::{Rng, seq::IndexedRandom};
use thiserror::Error;
use uuid::Uuid;

use crate::dao::models::{
    AiCatalogEntity, AiCategoryEntity, AiQuestionEntity, AnswerLetter, Difficulty, EventId,
};

/// Catalog lookups and mutations that can be refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogError {
    #[error("category does not exist")]
    UnknownCategory,
    #[error("question does not exist")]
    UnknownQuestion,
    #[error("category belongs to another event")]
    ForeignCategory,
    #[error("only custom categories of this event can be deleted")]
    NotCustom,
    #[error("category `{0}` already exists")]
    DuplicateName(String),
    #[error("category is inactive")]
    Inactive,
    #[error("every question of this category was already answered")]
    Exhausted,
}

/// Question content before it is attached to a category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionDraft {
    pub text: String,
    pub option_a: String,
    pub option_b: String,
    pub option_c: String,
    pub correct: AnswerLetter,
    pub difficulty: Difficulty,
}

/// Partial update of an AI question; `None` keeps the current value.
#[derive(Debug, Clone, Default)]
pub struct QuestionPatch {
    pub text: Option<String>,
    pub option_a: Option<String>,
    pub option_b: Option<String>,
    pub option_c: Option<String>,
    pub correct: Option<AnswerLetter>,
    pub difficulty: Option<Difficulty>,
}

/// Category together with the size of its question pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategorySummary {
    pub category: AiCategoryEntity,
    pub question_count: usize,
}

#[derive(Debug, Clone, Default)]
pub struct AiCatalog {
    categories: IndexMap<Uuid, AiCategoryEntity>,
    questions: IndexMap<Uuid, AiQuestionEntity>,
}

impl AiCatalog {
    /// Add the named default categories that are not present yet.
    ///
    /// Returns how many categories were created.
    pub fn seed_defaults(&mut self, names: &[String]) -> usize {
        let mut created = 0;
        for name in names {
            let exists = self
                .categories
                .values()
                .any(|c| c.is_default() && c.name == *name);
            if exists {
                continue;
            }
            let id = Uuid::new_v4();
            self.categories.insert(
                id,
                AiCategoryEntity {
                    id,
                    name: name.clone(),
                    difficulty: Difficulty::Medium,
                    active: true,
                    event_id: None,
                    generated: false,
                },
            );
            created += 1;
        }
        created
    }

    pub fn question_count(&self, category_id: Uuid) -> usize {
        self.questions
            .values()
            .filter(|q| q.category_id == category_id)
            .count()
    }

    fn summarize(&self, category: &AiCategoryEntity) -> CategorySummary {
        CategorySummary {
            category: category.clone(),
            question_count: self.question_count(category.id),
        }
    }

    /// Every default category, in creation order.
    pub fn default_categories(&self) -> Vec<CategorySummary> {
        self.categories
            .values()
            .filter(|c| c.is_default())
            .map(|c| self.summarize(c))
            .collect()
    }

    /// Custom categories owned by `event_id`.
    pub fn custom_categories(&self, event_id: EventId) -> Vec<CategorySummary> {
        self.categories
            .values()
            .filter(|c| c.event_id == Some(event_id))
            .map(|c| self.summarize(c))
            .collect()
    }

    /// Active default categories followed by the active custom categories of `event_id`.
    pub fn player_categories(&self, event_id: EventId) -> Vec<AiCategoryEntity> {
        let defaults = self.categories.values().filter(|c| c.is_default());
        let customs = self
            .categories
            .values()
            .filter(|c| c.event_id == Some(event_id));
        defaults
            .chain(customs)
            .filter(|c| c.active)
            .cloned()
            .collect()
    }

    /// Resolve a category the given event may use: any default or one of its own customs.
    pub fn accessible(
        &self,
        category_id: Uuid,
        event_id: EventId,
    ) -> Result<&AiCategoryEntity, CatalogError> {
        let category = self
            .categories
            .get(&category_id)
            .ok_or(CatalogError::UnknownCategory)?;
        match category.event_id {
            Some(owner) if owner != event_id => Err(CatalogError::ForeignCategory),
            _ => Ok(category),
        }
    }

    fn accessible_mut(
        &mut self,
        category_id: Uuid,
        event_id: EventId,
    ) -> Result<&mut AiCategoryEntity, CatalogError> {
        self.accessible(category_id, event_id)?;
        self.categories
            .get_mut(&category_id)
            .ok_or(CatalogError::UnknownCategory)
    }

    /// Flip the active flag; returns the new value.
    pub fn toggle(&mut self, category_id: Uuid, event_id: EventId) -> Result<bool, CatalogError> {
        let category = self.accessible_mut(category_id, event_id)?;
        category.active = !category.active;
        Ok(category.active)
    }

    pub fn set_difficulty(
        &mut self,
        category_id: Uuid,
        event_id: EventId,
        difficulty: Difficulty,
    ) -> Result<(), CatalogError> {
        self.accessible_mut(category_id, event_id)?.difficulty = difficulty;
        Ok(())
    }

    /// Create an active custom category owned by `event_id`.
    pub fn add_custom(
        &mut self,
        event_id: EventId,
        name: &str,
        difficulty: Difficulty,
        generated: bool,
    ) -> Result<Uuid, CatalogError> {
        let name = name.trim();
        if self
            .categories
            .values()
            .any(|c| c.event_id == Some(event_id) && c.name == name)
        {
            return Err(CatalogError::DuplicateName(name.to_owned()));
        }
        let id = Uuid::new_v4();
        self.categories.insert(
            id,
            AiCategoryEntity {
                id,
                name: name.to_owned(),
                difficulty,
                active: true,
                event_id: Some(event_id),
                generated,
            },
        );
        Ok(id)
    }

    /// Attach questions to an existing category; returns how many were added.
    pub fn add_questions(
        &mut self,
        category_id: Uuid,
        drafts: impl IntoIterator<Item = QuestionDraft>,
    ) -> Result<usize, CatalogError> {
        if !self.categories.contains_key(&category_id) {
            return Err(CatalogError::UnknownCategory);
        }
        let mut added = 0;
        for draft in drafts {
            let id = Uuid::new_v4();
            self.questions.insert(
                id,
                AiQuestionEntity {
                    id,
                    category_id,
                    text: draft.text,
                    option_a: draft.option_a,
                    option_b: draft.option_b,
                    option_c: draft.option_c,
                    correct: draft.correct,
                    difficulty: draft.difficulty,
                    times_shown: 0,
                    times_correct: 0,
                },
            );
            added += 1;
        }
        Ok(added)
    }

    /// Delete a custom category of `event_id` together with its questions.
    pub fn delete_custom(
        &mut self,
        category_id: Uuid,
        event_id: EventId,
    ) -> Result<AiCategoryEntity, CatalogError> {
        let category = self
            .categories
            .get(&category_id)
            .ok_or(CatalogError::UnknownCategory)?;
        if category.event_id != Some(event_id) {
            return Err(CatalogError::NotCustom);
        }
        self.questions.retain(|_, q| q.category_id != category_id);
        self.categories
            .shift_remove(&category_id)
            .ok_or(CatalogError::UnknownCategory)
    }

    /// Remove every custom category owned by a deleted event.
    pub fn remove_event(&mut self, event_id: EventId) -> usize {
        let owned: Vec<Uuid> = self
            .categories
            .values()
            .filter(|c| c.event_id == Some(event_id))
            .map(|c| c.id)
            .collect();
        self.questions
            .retain(|_, q| !owned.contains(&q.category_id));
        self.categories.retain(|id, _| !owned.contains(id));
        owned.len()
    }

    /// Serve a random question of the category not in `answered`, counting it as shown.
    pub fn pick_question<R: Rng + ?Sized>(
        &mut self,
        category_id: Uuid,
        event_id: EventId,
        answered: &[Uuid],
        rng: &mut R,
    ) -> Result<(AiCategoryEntity, AiQuestionEntity), CatalogError> {
        let category = self.accessible(category_id, event_id)?.clone();
        if !category.active {
            return Err(CatalogError::Inactive);
        }
        let candidates: Vec<Uuid> = self
            .questions
            .values()
            .filter(|q| q.category_id == category_id && !answered.contains(&q.id))
            .map(|q| q.id)
            .collect();
        let id = *candidates.choose(rng).ok_or(CatalogError::Exhausted)?;
        let question = self
            .questions
            .get_mut(&id)
            .ok_or(CatalogError::UnknownQuestion)?;
        question.times_shown += 1;
        Ok((category, question.clone()))
    }

    pub fn category(&self, category_id: Uuid) -> Option<&AiCategoryEntity> {
        self.categories.get(&category_id)
    }

    pub fn question(&self, question_id: Uuid) -> Option<&AiQuestionEntity> {
        self.questions.get(&question_id)
    }

    /// Count a correct answer on the question.
    pub fn record_correct(&mut self, question_id: Uuid) {
        if let Some(question) = self.questions.get_mut(&question_id) {
            question.times_correct += 1;
        }
    }

    /// Questions of a category, in creation order.
    pub fn questions_of(&self, category_id: Uuid) -> Vec<AiQuestionEntity> {
        self.questions
            .values()
            .filter(|q| q.category_id == category_id)
            .cloned()
            .collect()
    }

    pub fn update_question(
        &mut self,
        question_id: Uuid,
        patch: QuestionPatch,
    ) -> Result<AiQuestionEntity, CatalogError> {
        let question = self
            .questions
            .get_mut(&question_id)
            .ok_or(CatalogError::UnknownQuestion)?;
        if let Some(text) = patch.text {
            question.text = text;
        }
        if let Some(option) = patch.option_a {
            question.option_a = option;
        }
        if let Some(option) = patch.option_b {
            question.option_b = option;
        }
        if let Some(option) = patch.option_c {
            question.option_c = option;
        }
        if let Some(correct) = patch.correct {
            question.correct = correct;
        }
        if let Some(difficulty) = patch.difficulty {
            question.difficulty = difficulty;
        }
        Ok(question.clone())
    }

    /// Fill default categories that have no questions yet from `seed`, keyed by category name.
    ///
    /// Returns the number of questions loaded.
    pub fn load_seed<'a>(
        &mut self,
        seed: impl IntoIterator<Item = (&'a String, &'a Vec<QuestionDraft>)>,
    ) -> usize {
        let mut loaded = 0;
        for (name, drafts) in seed {
            let Some(category_id) = self
                .categories
                .values()
                .find(|c| c.is_default() && c.name == *name)
                .map(|c| c.id)
            else {
                continue;
            };
            if self.question_count(category_id) > 0 {
                continue;
            }
            loaded += self
                .add_questions(category_id, drafts.iter().cloned())
                .unwrap_or(0);
        }
        loaded
    }
}

impl From<AiCatalogEntity> for AiCatalog {
    fn from(value: AiCatalogEntity) -> Self {
        Self {
            categories: value.categories.into_iter().map(|c| (c.id, c)).collect(),
            questions: value.questions.into_iter().map(|q| (q.id, q)).collect(),
        }
    }
}

impl From<&AiCatalog> for AiCatalogEntity {
    fn from(value: &AiCatalog) -> Self {
        Self {
            categories: value.categories.values().cloned().collect(),
            questions: value.questions.values().cloned().collect(),
        }
    }
}
