//! Runtime settings read from the environment (and an optional `.env`).

use anyhow::{Context, Result};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;

pub const DEFAULT_MODEL: &str = "gpt-4.1-mini";
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MAX_TOKENS: usize = 7000;
pub const DEFAULT_TEMPERATURE: f32 = 0.2;
pub const DEFAULT_LOG_CSV_PATH: &str = "logs/translated_log.csv";

/// Which translation backend to use
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TranslatorKind {
    OpenAi,
    /// Identity translation, for dry runs and tests
    Stub,
}

impl FromStr for TranslatorKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(Self::OpenAi),
            "stub" => Ok(Self::Stub),
            other => Err(format!("unknown translator '{other}' (expected openai|stub)")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub openai_api_key: Option<String>,
    pub openai_model: String,
    pub openai_base_url: String,
    pub mediawiki_api_endpoint: Option<String>,
    pub mediawiki_username: Option<String>,
    pub mediawiki_password: Option<String>,
    pub max_tokens_per_chunk: usize,
    pub temperature: f32,
    pub log_csv_path: PathBuf,
    pub translator: TranslatorKind,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            openai_api_key: None,
            openai_model: DEFAULT_MODEL.to_string(),
            openai_base_url: DEFAULT_BASE_URL.to_string(),
            mediawiki_api_endpoint: None,
            mediawiki_username: None,
            mediawiki_password: None,
            max_tokens_per_chunk: DEFAULT_MAX_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
            log_csv_path: PathBuf::from(DEFAULT_LOG_CSV_PATH),
            translator: TranslatorKind::OpenAi,
        }
    }
}

impl Settings {
    /// Load `.env` if present, then read the process environment
    pub fn load() -> Result<Self> {
        match dotenvy::dotenv() {
            Ok(path) => log::debug!("Loaded environment from {}", path.display()),
            Err(e) if e.not_found() => {}
            Err(e) => return Err(e).context("Failed to read .env"),
        }
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build settings from any key lookup; blank values count as unset
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let defaults = Self::default();

        let settings = Self {
            openai_api_key: get("OPENAI_API_KEY"),
            openai_model: get("OPENAI_MODEL").unwrap_or(defaults.openai_model),
            openai_base_url: get("OPENAI_BASE_URL").unwrap_or(defaults.openai_base_url),
            mediawiki_api_endpoint: get("MEDIAWIKI_API_ENDPOINT"),
            mediawiki_username: get("MEDIAWIKI_USERNAME"),
            mediawiki_password: get("MEDIAWIKI_PASSWORD"),
            max_tokens_per_chunk: parse_or("MAX_TOKENS_PER_CHUNK", get("MAX_TOKENS_PER_CHUNK"), defaults.max_tokens_per_chunk)?,
            temperature: parse_or("TEMPERATURE", get("TEMPERATURE"), defaults.temperature)?,
            log_csv_path: get("LOG_CSV_PATH").map_or(defaults.log_csv_path, PathBuf::from),
            translator: match get("WIKITRANS_TRANSLATOR") {
                Some(raw) => raw.parse().map_err(anyhow::Error::msg)?,
                None => defaults.translator,
            },
        };
        settings.validate().map_err(anyhow::Error::msg)?;
        Ok(settings)
    }

    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.max_tokens_per_chunk == 0 {
            return Err("MAX_TOKENS_PER_CHUNK must be > 0".to_string());
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(format!("TEMPERATURE must be within 0..=2, got {}", self.temperature));
        }
        Ok(())
    }

    /// Login credentials when both are set
    #[must_use]
    pub fn credentials(&self) -> Option<(String, String)> {
        self.mediawiki_username
            .clone()
            .zip(self.mediawiki_password.clone())
    }
}

fn parse_or<T: FromStr>(key: &str, raw: Option<String>, default: T) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    match raw {
        Some(raw) => raw
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid {key}='{raw}': {e}")),
        None => Ok(default),
    }
}
