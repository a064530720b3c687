//! Application-level configuration loading: game rules, admin credentials and AI quiz settings.

use std::{collections::BTreeMap, env, fs, io::ErrorKind, path::PathBuf, time::Duration};

use serde::Deserialize;
use tracing::{info, warn};

use crate::{
    dao::models::{AnswerLetter, Difficulty},
    state::{catalog::QuestionDraft, event::GameRules},
};

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "QR_HUNT_BACK_CONFIG_PATH";
/// Environment variable that overrides the configured admin token.
const ADMIN_TOKEN_ENV: &str = "QR_HUNT_ADMIN_TOKEN";

#[derive(Debug, Clone)]
/// Settings of the external question generator.
pub struct GeneratorConfig {
    pub api_url: String,
    pub model: String,
    pub max_tokens: u32,
    pub questions_per_category: usize,
    /// Name of the environment variable holding the API key.
    pub api_key_env: String,
    pub request_timeout: Duration,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.anthropic.com/v1/messages".into(),
            model: "claude-3-5-sonnet-20241022".into(),
            max_tokens: 4000,
            questions_per_category: 10,
            api_key_env: "ANTHROPIC_API_KEY".into(),
            request_timeout: Duration::from_secs(60),
        }
    }
}

#[derive(Debug, Clone)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    pub rules: GameRules,
    pub tick_interval: Duration,
    /// Fixed seed for reproducible draws; entropy-seeded when unset.
    pub rng_seed: Option<u64>,
    /// Token expected in `X-Admin-Token`; admin routes are closed when unset.
    pub admin_token: Option<String>,
    /// Directory holding uploaded logos and photos.
    pub upload_dir: PathBuf,
    pub ai_categories: Vec<String>,
    /// Questions loadable into empty default categories, keyed by category name.
    pub ai_seed: BTreeMap<String, Vec<QuestionDraft>>,
    pub generator: GeneratorConfig,
}

impl AppConfig {
    /// Load the application configuration from disk, falling back to built-in defaults.
    pub fn load() -> Self {
        let path = resolve_config_path();
        let mut config = match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<RawConfig>(&contents) {
                Ok(raw) => {
                    let app_config: Self = raw.into();
                    info!(
                        path = %path.display(),
                        categories = app_config.ai_categories.len(),
                        "loaded configuration"
                    );
                    app_config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        };

        if let Some(token) = env::var(ADMIN_TOKEN_ENV).ok().filter(|t| !t.is_empty()) {
            config.admin_token = Some(token);
        }
        if config.admin_token.is_none() {
            warn!("no admin token configured; admin routes will reject every request");
        }
        config
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            rules: GameRules::default(),
            tick_interval: Duration::from_millis(1000),
            rng_seed: None,
            admin_token: None,
            upload_dir: PathBuf::from("uploads"),
            ai_categories: default_ai_categories(),
            ai_seed: BTreeMap::new(),
            generator: GeneratorConfig::default(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    scan_cooldown_secs: u64,
    minigame_target: u32,
    default_password: String,
    default_duration_minutes: u32,
    default_language: String,
    tick_interval_ms: u64,
    rng_seed: Option<u64>,
    admin_token: Option<String>,
    upload_dir: PathBuf,
    ai_categories: Vec<String>,
    ai_seed: BTreeMap<String, Vec<RawSeedQuestion>>,
    generator: RawGenerator,
}

impl Default for RawConfig {
    fn default() -> Self {
        let defaults = AppConfig::default();
        Self {
            scan_cooldown_secs: defaults.rules.scan_cooldown_secs,
            minigame_target: defaults.rules.minigame_target,
            default_password: defaults.rules.default_password,
            default_duration_minutes: defaults.rules.default_duration_minutes,
            default_language: defaults.rules.default_language,
            tick_interval_ms: 1000,
            rng_seed: None,
            admin_token: None,
            upload_dir: defaults.upload_dir,
            ai_categories: defaults.ai_categories,
            ai_seed: BTreeMap::new(),
            generator: RawGenerator::default(),
        }
    }
}

#[derive(Debug, Deserialize)]
/// Seed question in the compact `q/a/b/c/correct` layout.
struct RawSeedQuestion {
    q: String,
    a: String,
    b: String,
    c: String,
    correct: AnswerLetter,
    #[serde(default)]
    difficulty: Difficulty,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct RawGenerator {
    api_url: String,
    model: String,
    max_tokens: u32,
    questions_per_category: usize,
    api_key_env: String,
    request_timeout_secs: u64,
}

impl Default for RawGenerator {
    fn default() -> Self {
        let defaults = GeneratorConfig::default();
        Self {
            api_url: defaults.api_url,
            model: defaults.model,
            max_tokens: defaults.max_tokens,
            questions_per_category: defaults.questions_per_category,
            api_key_env: defaults.api_key_env,
            request_timeout_secs: defaults.request_timeout.as_secs(),
        }
    }
}

impl From<RawConfig> for AppConfig {
    fn from(value: RawConfig) -> Self {
        let password = value.default_password.trim().to_uppercase();
        let rules = GameRules {
            scan_cooldown_secs: value.scan_cooldown_secs,
            minigame_target: value.minigame_target.max(1),
            default_password: if password.is_empty() {
                GameRules::default().default_password
            } else {
                password
            },
            default_duration_minutes: value.default_duration_minutes.max(1),
            default_language: value.default_language,
        };
        let ai_seed = value
            .ai_seed
            .into_iter()
            .map(|(name, questions)| {
                let drafts = questions
                    .into_iter()
                    .map(|q| QuestionDraft {
                        text: q.q,
                        option_a: q.a,
                        option_b: q.b,
                        option_c: q.c,
                        correct: q.correct,
                        difficulty: q.difficulty,
                    })
                    .collect();
                (name, drafts)
            })
            .collect();

        Self {
            rules,
            tick_interval: Duration::from_millis(value.tick_interval_ms.max(10)),
            rng_seed: value.rng_seed,
            admin_token: value.admin_token.filter(|token| !token.is_empty()),
            upload_dir: value.upload_dir,
            ai_categories: value.ai_categories,
            ai_seed,
            generator: GeneratorConfig {
                api_url: value.generator.api_url,
                model: value.generator.model,
                max_tokens: value.generator.max_tokens,
                questions_per_category: value.generator.questions_per_category.max(1),
                api_key_env: value.generator.api_key_env,
                request_timeout: Duration::from_secs(value.generator.request_timeout_secs.max(1)),
            },
        }
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

/// Default AI quiz categories shared by every event.
fn default_ai_categories() -> Vec<String> {
    [
        "World history",
        "Geography",
        "Famous people",
        "Music",
        "Literature",
        "Cuisine",
        "Film",
        "Science",
        "National history",
        "Sport",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}
