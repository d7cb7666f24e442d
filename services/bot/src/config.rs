//! services/bot/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use std::str::FromStr;
use std::time::Duration;
use teloxide::types::ParseMode;
use tracing::Level;

pub const DEFAULT_DATABASE_URL: &str = "sqlite:./database/career.db?mode=rwc";

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Settings for the streaming completion client.
#[derive(Clone, Debug)]
pub struct CompletionConfig {
    pub api_url: String,
    pub api_token: String,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub top_p: f32,
    pub timeout: Duration,
}

/// Settings for the Message Delivery Manager.
#[derive(Clone, Debug)]
pub struct DeliveryConfig {
    /// Upper bound, in characters, for any transmitted message.
    pub max_length: usize,
    pub min_edit_interval: Duration,
    pub cache_max_age: Duration,
    pub cache_sweep_interval: Duration,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            max_length: 4096,
            min_edit_interval: Duration::from_millis(500),
            cache_max_age: Duration::from_secs(3600),
            cache_sweep_interval: Duration::from_secs(300),
        }
    }
}

impl DeliveryConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_length < 64 {
            return Err(ConfigError::InvalidValue(
                "MESSAGE_MAX_LENGTH".to_string(),
                "must be at least 64".to_string(),
            ));
        }
        if self.cache_sweep_interval.is_zero() {
            return Err(ConfigError::InvalidValue(
                "EDIT_CACHE_SWEEP_SECS".to_string(),
                "must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Settings for the Pipeline Orchestrator.
#[derive(Clone, Debug)]
pub struct PipelineConfig {
    pub max_input_length: usize,
    pub search_limit: usize,
    pub broad_search_limit: usize,
    pub flush_every_increments: usize,
    pub flush_interval: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_input_length: 1000,
            search_limit: 8,
            broad_search_limit: 3,
            flush_every_increments: 8,
            flush_interval: Duration::from_millis(1000),
        }
    }
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub telegram_token: String,
    pub parse_mode: Option<ParseMode>,
    pub database_url: String,
    pub log_level: Level,
    pub history_depth: usize,
    pub completion: CompletionConfig,
    pub delivery: DeliveryConfig,
    pub pipeline: PipelineConfig,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        // --- Chat Platform and Storage ---
        let telegram_token = required("TELEGRAM_BOT_TOKEN")?;
        let parse_mode = match std::env::var("TELEGRAM_PARSE_MODE") {
            Ok(raw) => parse_mode(&raw)?,
            Err(_) => None,
        };
        let database_url =
            std::env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string());

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        // --- Completion API ---
        let completion = CompletionConfig {
            api_url: required("COMPLETION_API_URL")?,
            api_token: required("COMPLETION_API_TOKEN")?,
            model: std::env::var("COMPLETION_MODEL")
                .unwrap_or_else(|_| "SeaLLMs/SeaLLMs-v3-7B-Chat".to_string()),
            max_tokens: parsed("COMPLETION_MAX_TOKENS", 800)?,
            temperature: parsed("COMPLETION_TEMPERATURE", 0.7)?,
            top_p: parsed("COMPLETION_TOP_P", 0.9)?,
            timeout: Duration::from_secs(parsed("COMPLETION_TIMEOUT_SECS", 30)?),
        };

        // --- Delivery and Pipeline Tuning ---
        let delivery = DeliveryConfig {
            max_length: parsed("MESSAGE_MAX_LENGTH", 4096)?,
            min_edit_interval: Duration::from_millis(parsed("MIN_EDIT_INTERVAL_MS", 500)?),
            cache_max_age: Duration::from_secs(parsed("EDIT_CACHE_MAX_AGE_SECS", 3600)?),
            cache_sweep_interval: Duration::from_secs(parsed("EDIT_CACHE_SWEEP_SECS", 300)?),
        };
        delivery.validate()?;

        let pipeline = PipelineConfig {
            max_input_length: parsed("MAX_INPUT_LENGTH", 1000)?,
            search_limit: parsed("SEARCH_LIMIT", 8)?,
            broad_search_limit: parsed("BROAD_SEARCH_LIMIT", 3)?,
            flush_every_increments: parsed("STREAM_FLUSH_INCREMENTS", 8)?,
            flush_interval: Duration::from_millis(parsed("STREAM_FLUSH_INTERVAL_MS", 1000)?),
        };

        Ok(Self {
            telegram_token,
            parse_mode,
            database_url,
            log_level,
            history_depth: parsed("HISTORY_DEPTH", 5)?,
            completion,
            delivery,
            pipeline,
        })
    }
}

fn required(name: &str) -> Result<String, ConfigError> {
    std::env::var(name).map_err(|_| ConfigError::MissingVar(name.to_string()))
}

fn parsed<T>(name: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidValue(name.to_string(), e.to_string())),
        Err(_) => Ok(default),
    }
}

fn parse_mode(raw: &str) -> Result<Option<ParseMode>, ConfigError> {
    match raw.trim().to_lowercase().as_str() {
        "" | "none" | "plain" => Ok(None),
        "markdown" => Ok(Some(ParseMode::Markdown)),
        "markdownv2" => Ok(Some(ParseMode::MarkdownV2)),
        "html" => Ok(Some(ParseMode::Html)),
        other => Err(ConfigError::InvalidValue(
            "TELEGRAM_PARSE_MODE".to_string(),
            format!("'{}' is not one of none, markdown, markdownv2, html", other),
        )),
    }
}
