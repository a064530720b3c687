//! External quiz question generation over the Anthropic Messages API.

use std::env;

use futures::future::BoxFuture;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::{
    config::GeneratorConfig,
    dao::models::{AnswerLetter, Difficulty},
    state::catalog::QuestionDraft,
};

const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Failures of the question generator.
#[derive(Debug, Error)]
pub enum GeneratorError {
    #[error("generator API key is not configured (set {0})")]
    MissingApiKey(String),
    #[error("failed to build HTTP client")]
    Client(#[source] reqwest::Error),
    #[error("generator request failed")]
    Request(#[source] reqwest::Error),
    #[error("generator answered with status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("generator response is not valid JSON")]
    Decode(#[source] serde_json::Error),
    #[error("generator response is malformed: {0}")]
    Malformed(String),
}

/// What to generate.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub category: String,
    pub difficulty: Difficulty,
    pub count: usize,
    /// Language code of the player interface, e.g. `pl`.
    pub language: String,
}

/// Source of freshly generated quiz questions.
pub trait QuestionGenerator: Send + Sync {
    fn generate(
        &self,
        request: GenerationRequest,
    ) -> BoxFuture<'static, Result<Vec<QuestionDraft>, GeneratorError>>;
}

/// [`QuestionGenerator`] backed by the Anthropic Messages API.
#[derive(Clone)]
pub struct AnthropicGenerator {
    client: Client,
    config: GeneratorConfig,
}

impl AnthropicGenerator {
    pub fn new(config: GeneratorConfig) -> Result<Self, GeneratorError> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(GeneratorError::Client)?;
        Ok(Self { client, config })
    }
}

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: [ChatMessage<'a>; 1],
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: Option<String>,
}

/// Generated question in the compact layout requested from the model.
#[derive(Debug, Deserialize)]
struct GeneratedQuestion {
    q: String,
    a: String,
    b: String,
    c: String,
    correct: String,
}

impl QuestionGenerator for AnthropicGenerator {
    fn generate(
        &self,
        request: GenerationRequest,
    ) -> BoxFuture<'static, Result<Vec<QuestionDraft>, GeneratorError>> {
        let client = self.client.clone();
        let config = self.config.clone();
        Box::pin(async move {
            let api_key = env::var(&config.api_key_env)
                .ok()
                .filter(|key| !key.is_empty())
                .ok_or_else(|| GeneratorError::MissingApiKey(config.api_key_env.clone()))?;

            let prompt = build_prompt(&request);
            let body = MessagesRequest {
                model: &config.model,
                max_tokens: config.max_tokens,
                messages: [ChatMessage {
                    role: "user",
                    content: &prompt,
                }],
            };
            debug!(category = %request.category, count = request.count, "requesting questions");

            let response = client
                .post(&config.api_url)
                .header("x-api-key", api_key)
                .header("anthropic-version", ANTHROPIC_VERSION)
                .json(&body)
                .send()
                .await
                .map_err(GeneratorError::Request)?;
            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(GeneratorError::Status {
                    status: status.as_u16(),
                    body,
                });
            }
            let payload: MessagesResponse =
                response.json().await.map_err(GeneratorError::Request)?;
            let text = payload
                .content
                .into_iter()
                .find_map(|block| block.text)
                .ok_or_else(|| GeneratorError::Malformed("response has no text block".into()))?;

            let questions = parse_questions(&text, request.difficulty)?;
            info!(
                category = %request.category,
                generated = questions.len(),
                "questions generated"
            );
            Ok(questions)
        })
    }
}

fn difficulty_hint(difficulty: Difficulty) -> &'static str {
    match difficulty {
        Difficulty::Easy => "easy (basic knowledge)",
        Difficulty::Medium => "medium (requires general knowledge)",
        Difficulty::Advanced => "advanced (requires specialist knowledge)",
    }
}

fn build_prompt(request: &GenerationRequest) -> String {
    format!(
        "Generate {count} quiz questions about: {category}\n\n\
         Requirements:\n\
         - Difficulty level: {difficulty}\n\
         - Each question has 3 answer options (A, B, C)\n\
         - Only one answer is correct\n\
         - Questions and answers in the language with code `{language}`\n\
         - Cover various aspects of the category\n\
         - Questions should be specific and unambiguous\n\n\
         Response format (JSON):\n\
         [{{\"q\": \"Question text?\", \"a\": \"Answer A\", \"b\": \"Answer B\", \"c\": \"Answer C\", \"correct\": \"A\"}}]\n\n\
         Return ONLY valid JSON without markdown fences or additional text.",
        count = request.count,
        category = request.category,
        difficulty = difficulty_hint(request.difficulty),
        language = request.language,
    )
}

/// Remove a surrounding markdown code fence, with or without a `json` tag.
fn strip_fences(text: &str) -> &str {
    let mut text = text.trim();
    if let Some(rest) = text.strip_prefix("```json") {
        text = rest;
    } else if let Some(rest) = text.strip_prefix("```") {
        text = rest;
    }
    if let Some(rest) = text.strip_suffix("```") {
        text = rest;
    }
    text.trim()
}

/// Parse and validate the model output; a single bad item rejects the batch.
fn parse_questions(
    text: &str,
    difficulty: Difficulty,
) -> Result<Vec<QuestionDraft>, GeneratorError> {
    let items: Vec<GeneratedQuestion> =
        serde_json::from_str(strip_fences(text)).map_err(GeneratorError::Decode)?;
    if items.is_empty() {
        return Err(GeneratorError::Malformed("no questions returned".into()));
    }
    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| {
            let correct = AnswerLetter::parse(&item.correct).ok_or_else(|| {
                GeneratorError::Malformed(format!(
                    "question {index} has invalid correct answer `{}`",
                    item.correct
                ))
            })?;
            if [&item.q, &item.a, &item.b, &item.c]
                .iter()
                .any(|field| field.trim().is_empty())
            {
                return Err(GeneratorError::Malformed(format!(
                    "question {index} has an empty field"
                )));
            }
            Ok(QuestionDraft {
                text: item.q.trim().to_owned(),
                option_a: item.a.trim().to_owned(),
                option_b: item.b.trim().to_owned(),
                option_c: item.c.trim().to_owned(),
                correct,
                difficulty,
            })
        })
        .collect()
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};

    use super::*;

    /// Deterministic generator used by service tests.
    #[derive(Default)]
    pub(crate) struct StaticGenerator {
        pub(crate) fail: AtomicBool,
    }

    impl QuestionGenerator for StaticGenerator {
        fn generate(
            &self,
            request: GenerationRequest,
        ) -> BoxFuture<'static, Result<Vec<QuestionDraft>, GeneratorError>> {
            let fail = self.fail.load(Ordering::SeqCst);
            Box::pin(async move {
                if fail {
                    return Err(GeneratorError::Malformed("scripted failure".into()));
                }
                Ok((0..request.count)
                    .map(|i| QuestionDraft {
                        text: format!("{} question {i}?", request.category),
                        option_a: "one".into(),
                        option_b: "two".into(),
                        option_c: "three".into(),
                        correct: AnswerLetter::A,
                        difficulty: request.difficulty,
                    })
                    .collect())
            })
        }
    }

    #[test]
    fn fenced_output_is_accepted() {
        let text = "```json\n[{\"q\":\"Capital of Poland?\",\"a\":\"Warsaw\",\"b\":\"Kraków\",\"c\":\"Gdańsk\",\"correct\":\"A\"}]\n```";
        let questions = parse_questions(text, Difficulty::Easy).unwrap();
        assert_eq!(questions.len(), 1);
        assert_eq!(questions[0].option_a, "Warsaw");
        assert_eq!(questions[0].correct, AnswerLetter::A);
        assert_eq!(questions[0].difficulty, Difficulty::Easy);
    }

    #[test]
    fn invalid_correct_letter_rejects_the_batch() {
        let text = r#"[{"q":"?","a":"x","b":"y","c":"z","correct":"A"},{"q":"?","a":"x","b":"y","c":"z","correct":"D"}]"#;
        let err = parse_questions(text, Difficulty::Medium).unwrap_err();
        assert!(matches!(err, GeneratorError::Malformed(_)));
    }

    #[test]
    fn missing_field_is_a_decode_error() {
        let text = r#"[{"q":"?","a":"x","b":"y","correct":"A"}]"#;
        assert!(matches!(
            parse_questions(text, Difficulty::Medium),
            Err(GeneratorError::Decode(_))
        ));
    }

    #[test]
    fn prompt_mentions_category_and_count() {
        let prompt = build_prompt(&GenerationRequest {
            category: "Jazz".into(),
            difficulty: Difficulty::Advanced,
            count: 7,
            language: "pl".into(),
        });
        assert!(prompt.contains("Generate 7 quiz questions about: Jazz"));
        assert!(prompt.contains("specialist"));
    }
}
