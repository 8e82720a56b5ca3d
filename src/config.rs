use std::path::{Path, PathBuf};
use std::time::Duration;

use eyre::{Result, WrapErr};
use log::debug;
use serde::{Deserialize, Serialize};

use crate::language::{Language, LanguageDetector};
use crate::{ollama, prompt, session, youtube};

/// Environment variable holding the Telegram bot token
pub const TOKEN_VAR: &str = "TELEGRAM_TOKEN";

#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub model: Option<String>,
    pub endpoint: Option<String>,
    pub inference_timeout_secs: Option<u64>,
    pub caption_timeout_secs: Option<u64>,
    pub metadata_timeout_secs: Option<u64>,
    pub transcript_budget: Option<usize>,
    pub session_capacity: Option<usize>,
    pub session_ttl_secs: Option<u64>,
    pub video_hosts: Option<Vec<String>>,
    /// Replaces the built-in hindi/kannada/tamil keywords; checked in file order
    pub language_keywords: Option<Vec<LanguageKeyword>>,
    pub poll_timeout_secs: Option<u64>,
    /// Path to the yt-dlp executable (default: looked up on PATH)
    pub yt_dlp: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LanguageKeyword {
    pub keyword: String,
    pub language: Language,
}

impl Config {
    /// Load config from ~/.config/ytbrief/config.toml if it exists
    pub fn load() -> Result<Self> {
        Self::load_from(&config_path())
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            debug!("Loading config from {}", path.display());
            let content = std::fs::read_to_string(path)?;
            let config: Config =
                toml::from_str(&content).wrap_err_with(|| format!("invalid config file {}", path.display()))?;
            Ok(config)
        } else {
            debug!("No config file found at {}", path.display());
            Ok(Config::default())
        }
    }

    pub fn model(&self) -> &str {
        self.model.as_deref().unwrap_or(ollama::DEFAULT_MODEL)
    }

    pub fn endpoint(&self) -> &str {
        self.endpoint.as_deref().unwrap_or(ollama::DEFAULT_ENDPOINT)
    }

    pub fn inference_timeout(&self) -> Duration {
        self.inference_timeout_secs
            .map(Duration::from_secs)
            .unwrap_or(ollama::DEFAULT_TIMEOUT)
    }

    pub fn caption_timeout(&self) -> Duration {
        self.caption_timeout_secs
            .map(Duration::from_secs)
            .unwrap_or(youtube::DEFAULT_CAPTION_TIMEOUT)
    }

    pub fn metadata_timeout(&self) -> Duration {
        self.metadata_timeout_secs
            .map(Duration::from_secs)
            .unwrap_or(youtube::DEFAULT_METADATA_TIMEOUT)
    }

    pub fn transcript_budget(&self) -> usize {
        self.transcript_budget.unwrap_or(prompt::DEFAULT_TRANSCRIPT_BUDGET)
    }

    pub fn session_capacity(&self) -> usize {
        self.session_capacity.unwrap_or(session::DEFAULT_CAPACITY)
    }

    pub fn session_ttl(&self) -> Option<Duration> {
        self.session_ttl_secs.map(Duration::from_secs)
    }

    /// Detector built from `language_keywords`, if the file sets any
    pub fn language_detector(&self) -> Option<LanguageDetector> {
        self.language_keywords.as_ref().map(|rules| {
            LanguageDetector::new(
                rules.iter().map(|r| (r.keyword.clone(), r.language)),
                Language::English,
            )
        })
    }

    pub fn poll_timeout(&self) -> Duration {
        Duration::from_secs(self.poll_timeout_secs.unwrap_or(30))
    }
}

pub fn config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from(".config"))
        .join("ytbrief")
        .join("config.toml")
}

/// Read the bot token, failing when it is unset or blank
pub fn telegram_token() -> Result<String> {
    token_from(std::env::var(TOKEN_VAR).ok())
}

fn token_from(value: Option<String>) -> Result<String> {
    match value.map(|v| v.trim().to_string()) {
        Some(token) if !token.is_empty() => Ok(token),
        _ => Err(eyre::eyre!(
            "{TOKEN_VAR} environment variable not set (required to talk to the Telegram Bot API)"
        )),
    }
}
