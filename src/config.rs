use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::PathBuf;

#[derive(Debug, Deserialize)]
pub struct AppConfig {
    pub youtube: YouTubeConfig,
    pub gemini: GeminiConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    pub storage: StorageConfig,
    pub web: WebConfig,
}

#[derive(Debug, Deserialize)]
pub struct YouTubeConfig {
    pub base_url: String,
    /// How many of the most relevant comment threads to fetch (one page).
    pub max_results: u32,
    // Loaded from env
    #[serde(skip)]
    pub api_key: String,
}

#[derive(Debug, Deserialize)]
pub struct GeminiConfig {
    pub model: String,
    pub base_url: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,
    // Loaded from env
    #[serde(skip)]
    pub api_key: String,
}

/// How the remote classifier is driven over a list of comments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// One request per comment, issued concurrently within a batch.
    PerComment,
    /// One indexed multi-comment prompt per batch.
    Batched,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SchedulerConfig {
    #[serde(default = "default_strategy")]
    pub strategy: Strategy,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_batch_delay_ms")]
    pub batch_delay_ms: u64,
    /// Total attempts per remote call, including the first one.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            strategy: default_strategy(),
            batch_size: default_batch_size(),
            batch_delay_ms: default_batch_delay_ms(),
            max_attempts: default_max_attempts(),
            initial_backoff_ms: default_initial_backoff_ms(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackend {
    Jsonl,
    Memory,
}

#[derive(Debug, Deserialize)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub data_dir: PathBuf,
}

#[derive(Debug, Deserialize)]
pub struct WebConfig {
    pub host: String,
    pub port: u16,
}

fn default_temperature() -> f32 {
    0.1
}

fn default_max_output_tokens() -> u32 {
    512
}

fn default_strategy() -> Strategy {
    Strategy::PerComment
}

fn default_batch_size() -> usize {
    10
}

fn default_batch_delay_ms() -> u64 {
    2000
}

fn default_max_attempts() -> u32 {
    3
}

fn default_initial_backoff_ms() -> u64 {
    2000
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let config_text =
            std::fs::read_to_string("config.toml").context("Failed to read config.toml")?;
        let mut config = Self::parse(&config_text)?;

        config.youtube.api_key =
            std::env::var("YOUTUBE_API_KEY").context("YOUTUBE_API_KEY not set")?;
        config.gemini.api_key =
            std::env::var("GEMINI_API_KEY").context("GEMINI_API_KEY not set")?;

        Ok(config)
    }

    fn parse(text: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(text).context("Failed to parse config.toml")?;

        if config.scheduler.batch_size == 0 {
            anyhow::bail!("scheduler.batch_size must be at least 1");
        }
        if config.scheduler.max_attempts == 0 {
            anyhow::bail!("scheduler.max_attempts must be at least 1");
        }

        Ok(config)
    }
}
