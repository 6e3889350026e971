//! Translation backends.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

const SYSTEM_PROMPT: &str = "You are a professional MediaWiki translator. Translate the text from the \
source language into the target language while strictly keeping: templates (names and parameters \
untranslated), files and images, parser functions, internal links. Tokens of the form ⟪…⟫ are \
opaque and must be copied unchanged. Never add or remove markup. Return strictly formatted wikitext.";

const VALIDATE_PROMPT: &str = "You are a validator. Compare the translation with the original and \
return strict JSON with the fields {\"preserved_templates\": bool, \"preserved_links\": bool, \
\"preserved_files\": bool, \"same_brace_count\": bool, \"issues\": [string]}. Return nothing else.";

/// Characters of each text shown to the validator
const VALIDATE_EXCERPT_CHARS: usize = 2000;
const INVALID_VALIDATOR_JSON: &str = "invalid JSON from validator";

const MAX_ATTEMPTS: u32 = 3;
const MIN_BACKOFF: Duration = Duration::from_secs(1);
const MAX_BACKOFF: Duration = Duration::from_secs(8);

/// What is being translated; backends may phrase the request differently
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TranslationTask {
    /// A chunk of (masked) wikitext
    Wikitext,
    /// A page title without its namespace prefix
    Title,
    /// The name of a JSON subpage
    SubpageName,
    /// A JSON document whose string values should be translated
    JsonValues,
}

#[async_trait]
pub trait Translator: Send + Sync {
    async fn translate(
        &self,
        task: TranslationTask,
        text: &str,
        source_lang: &str,
        target_lang: &str,
    ) -> Result<String>;

    /// Second-pass review of a finished translation; returns the raw JSON
    /// verdict (see [`ValidationReport`]). Backends without a reviewer
    /// report nothing.
    async fn validate(&self, _original: &str, _translated: &str) -> Result<String> {
        Ok("{}".to_string())
    }

    /// Backend name for logging
    fn name(&self) -> &str;
}

/// Verdict of [`Translator::validate`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ValidationReport {
    #[serde(default)]
    pub preserved_templates: Option<bool>,
    #[serde(default)]
    pub preserved_links: Option<bool>,
    #[serde(default)]
    pub preserved_files: Option<bool>,
    #[serde(default)]
    pub same_brace_count: Option<bool>,
    #[serde(default)]
    pub issues: Vec<String>,
}

impl ValidationReport {
    /// Parse a validator reply; anything that is not the expected JSON
    /// object becomes a single issue.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        let body = raw
            .trim()
            .trim_start_matches("```json")
            .trim_start_matches("```")
            .trim_end_matches("```")
            .trim();
        serde_json::from_str(body).unwrap_or_else(|e| {
            log::warn!("Validator reply is not valid JSON ({e})");
            Self {
                issues: vec![INVALID_VALIDATOR_JSON.to_string()],
                ..Self::default()
            }
        })
    }

    #[must_use]
    pub fn has_issues(&self) -> bool {
        !self.issues.is_empty()
    }
}

/// Returns its input unchanged
#[derive(Debug, Clone, Copy, Default)]
pub struct StubTranslator;

#[async_trait]
impl Translator for StubTranslator {
    async fn translate(
        &self,
        _task: TranslationTask,
        text: &str,
        _source_lang: &str,
        _target_lang: &str,
    ) -> Result<String> {
        Ok(text.to_string())
    }

    fn name(&self) -> &str {
        "stub"
    }
}

/// Chat-completions client for OpenAI-compatible endpoints
#[derive(Clone)]
pub struct OpenAiTranslator {
    client: Client,
    endpoint: String,
    model: String,
    temperature: f32,
}

impl OpenAiTranslator {
    pub fn new(api_key: &str, base_url: &str, model: &str, temperature: f32) -> Result<Self> {
        anyhow::ensure!(!api_key.trim().is_empty(), "missing OPENAI_API_KEY");
        anyhow::ensure!(!model.trim().is_empty(), "missing OpenAI model name");

        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", api_key.trim()))
                .context("invalid OpenAI API key")?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .timeout(Duration::from_secs(120))
            .default_headers(headers)
            .build()
            .context("failed to build OpenAI HTTP client")?;

        Ok(Self {
            client,
            endpoint: format!("{}/chat/completions", base_url.trim_end_matches('/')),
            model: model.to_string(),
            temperature,
        })
    }

    async fn complete_once(&self, system: &str, user: &str, temperature: f32) -> Result<String> {
        let request = ChatRequest {
            model: &self.model,
            temperature,
            messages: [
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: user,
                },
            ],
        };

        let resp = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .context("OpenAI request failed")?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp
                .text()
                .await
                .unwrap_or_else(|_| "<body unavailable>".to_string());
            bail!(RequestFailed { status, body });
        }

        let parsed: ChatResponse = resp
            .json()
            .await
            .context("failed to parse OpenAI chat response")?;
        Ok(parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default())
    }

    async fn complete(&self, system: &str, user: &str, temperature: f32) -> Result<String> {
        let mut attempt = 1;
        loop {
            match self.complete_once(system, user, temperature).await {
                Ok(out) => return Ok(out),
                Err(e) if attempt < MAX_ATTEMPTS && is_retryable(&e) => {
                    let wait = backoff(attempt);
                    log::warn!("OpenAI attempt {attempt}/{MAX_ATTEMPTS} failed: {e:#}; retrying in {wait:?}");
                    tokio::time::sleep(wait).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[async_trait]
impl Translator for OpenAiTranslator {
    async fn translate(
        &self,
        task: TranslationTask,
        text: &str,
        source_lang: &str,
        target_lang: &str,
    ) -> Result<String> {
        let prompt = user_prompt(task, text, source_lang, target_lang);
        let out = self.complete(SYSTEM_PROMPT, &prompt, self.temperature).await?;
        Ok(clean_output(task, &out))
    }

    async fn validate(&self, original: &str, translated: &str) -> Result<String> {
        let prompt = format!(
            "Original:\n{}\n---\nTranslation:\n{}",
            excerpt(original),
            excerpt(translated)
        );
        let out = self.complete(VALIDATE_PROMPT, &prompt, 0.0).await?;
        Ok(if out.trim().is_empty() { "{}".to_string() } else { out })
    }

    fn name(&self) -> &str {
        &self.model
    }
}

fn user_prompt(task: TranslationTask, text: &str, source_lang: &str, target_lang: &str) -> String {
    match task {
        TranslationTask::Wikitext => {
            format!("Source language: {source_lang}\nTarget language: {target_lang}\n\n{text}")
        }
        TranslationTask::Title => format!(
            "Translate this page title from {source_lang} to {target_lang}. \
             Return ONLY the translated title, nothing else: {text}"
        ),
        TranslationTask::SubpageName => format!(
            "Translate this short name for a JSON subpage from {source_lang} to {target_lang}. \
             Return ONLY the translated name: {text}"
        ),
        TranslationTask::JsonValues => format!(
            "Translate the human-readable string VALUES inside this JSON from {source_lang} to \
             {target_lang}. Do not change keys, numbers, or structure. Return valid JSON only.\n\n{text}"
        ),
    }
}

fn excerpt(text: &str) -> &str {
    text.char_indices()
        .nth(VALIDATE_EXCERPT_CHARS)
        .map_or(text, |(end, _)| &text[..end])
}

/// Strip the quoting models like to add around short answers
fn clean_output(task: TranslationTask, out: &str) -> String {
    match task {
        TranslationTask::Title | TranslationTask::SubpageName => out
            .trim()
            .trim_matches(|c| c == '"' || c == '\'')
            .to_string(),
        TranslationTask::Wikitext | TranslationTask::JsonValues => out.to_string(),
    }
}

/// Exponential wait: 1s, 2s, 4s, … capped at 8s
fn backoff(attempt: u32) -> Duration {
    MIN_BACKOFF
        .saturating_mul(1 << attempt.saturating_sub(1).min(3))
        .min(MAX_BACKOFF)
}

fn is_retryable(err: &anyhow::Error) -> bool {
    if let Some(failed) = err.downcast_ref::<RequestFailed>() {
        return failed.status == StatusCode::TOO_MANY_REQUESTS || failed.status.is_server_error();
    }
    err.chain()
        .filter_map(|cause| cause.downcast_ref::<reqwest::Error>())
        .any(|e| e.is_timeout() || e.is_connect() || e.is_request() || e.is_body() || e.is_decode())
}

#[derive(Debug)]
struct RequestFailed {
    status: StatusCode,
    body: String,
}

impl std::fmt::Display for RequestFailed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OpenAI request failed ({}): {}", self.status, self.body)
    }
}

impl std::error::Error for RequestFailed {}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    messages: [ChatMessage<'a>; 2],
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Deserialize)]
struct ChatReply {
    content: Option<String>,
}
