//! LLM Client: the single point of entry for all text-generation calls.
//!
//! ARCHITECTURAL RULE: generators, ingestion and the agent loop only see
//! `dyn TextGenerator`. Provider HTTP details stay inside this module.
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::{de::DeserializeOwned, Deserialize};
use thiserror::Error;
use tracing::warn;

use crate::config::{Config, LlmProvider};

pub mod anthropic;
pub mod openai;
pub mod prompts;

pub use anthropic::AnthropicClient;
pub use openai::OpenAiClient;

const REQUEST_TIMEOUT_SECS: u64 = 120;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Unexpected response shape: {0}")]
    Shape(String),

    #[error("Rate limited after {retries} retries")]
    RateLimited { retries: u32 },

    #[error("LLM returned empty content")]
    EmptyContent,
}

impl LlmError {
    /// Auth failures and malformed requests will fail the same way on every attempt.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            LlmError::Api { status, .. } if (400..500).contains(status) && *status != 429
        )
    }
}

/// A hosted model that turns a system + user prompt into text.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, system: &str, user: &str) -> Result<String, LlmError>;

    /// Model identifier, for logs and package metadata.
    fn model(&self) -> &str;
}

/// Builds the configured provider client.
pub fn build_generator(config: &Config) -> anyhow::Result<Box<dyn TextGenerator>> {
    let api_key = config.api_key()?.to_string();
    let generator: Box<dyn TextGenerator> = match config.llm_provider {
        LlmProvider::Anthropic => Box::new(AnthropicClient::new(
            api_key,
            config.anthropic_model.clone(),
            config.llm_max_tokens,
            config.llm_temperature,
            config.llm_max_retries,
        )?),
        LlmProvider::OpenAi => Box::new(OpenAiClient::new(
            api_key,
            config.openai_base_url.clone(),
            config.openai_model.clone(),
            config.llm_max_tokens,
            config.llm_temperature,
            config.llm_max_retries,
        )?),
    };
    Ok(generator)
}

pub(crate) fn http_client() -> Result<Client, LlmError> {
    Ok(Client::builder()
        .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
        .build()?)
}

#[derive(Debug, Deserialize)]
struct ApiErrorEnvelope {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
}

const RETRY_BASE_DELAY: Duration = Duration::from_millis(1000);

/// Sends a request built by `build`, retrying on 429, 5xx and transport errors
/// with exponential backoff (1s, 2s, 4s, ...). Returns the success body.
pub(crate) async fn send_with_retry<F>(build: F, max_retries: u32) -> Result<String, LlmError>
where
    F: Fn() -> RequestBuilder,
{
    send_with_backoff(build, max_retries, RETRY_BASE_DELAY).await
}

/// Delay before retry number `retry` (1-based): `base * 2^(retry - 1)`, capped at 64x.
fn backoff_delay(base: Duration, retry: u32) -> Duration {
    base * (1u32 << retry.saturating_sub(1).min(6))
}

async fn send_with_backoff<F>(
    build: F,
    max_retries: u32,
    base_delay: Duration,
) -> Result<String, LlmError>
where
    F: Fn() -> RequestBuilder,
{
    let attempts = max_retries.max(1);
    let mut last_error: Option<LlmError> = None;

    for attempt in 0..attempts {
        if attempt > 0 {
            let delay = backoff_delay(base_delay, attempt);
            warn!(
                "LLM call attempt {} failed, retrying after {}ms...",
                attempt,
                delay.as_millis()
            );
            tokio::time::sleep(delay).await;
        }

        let response = match build().send().await {
            Ok(r) => r,
            Err(e) => {
                last_error = Some(LlmError::Http(e));
                continue;
            }
        };

        let status = response.status();

        if status.as_u16() == 429 || status.is_server_error() {
            let body = response.text().await.unwrap_or_default();
            warn!("LLM API returned {}: {}", status, body);
            last_error = Some(LlmError::Api {
                status: status.as_u16(),
                message: body,
            });
            continue;
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiErrorEnvelope>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(LlmError::Api {
                status: status.as_u16(),
                message,
            });
        }

        return Ok(response.text().await?);
    }

    Err(match last_error {
        Some(LlmError::Api { status: 429, .. }) | None => LlmError::RateLimited { retries: attempts },
        Some(e) => e,
    })
}

/// Calls the LLM and deserializes the text response as JSON.
/// The prompt must instruct the model to return valid JSON.
pub async fn call_json<T: DeserializeOwned>(
    llm: &dyn TextGenerator,
    prompt: &str,
    system: &str,
) -> Result<T, LlmError> {
    let text = llm.generate(system, prompt).await?;
    parse_json(&text)
}

/// Parses model output as JSON after removing fences and surrounding prose.
pub fn parse_json<T: DeserializeOwned>(text: &str) -> Result<T, LlmError> {
    if text.trim().is_empty() {
        return Err(LlmError::EmptyContent);
    }
    serde_json::from_str(extract_json_payload(text)).map_err(LlmError::Parse)
}

/// Strips ```json ... ``` or ``` ... ``` code fences from LLM output.
fn strip_json_fences(text: &str) -> &str {
    let text = text.trim();
    if let Some(stripped) = text.strip_prefix("```json") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else if let Some(stripped) = text.strip_prefix("```") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else {
        text
    }
}

/// Returns the outermost JSON object or array in `text`, or the fence-stripped
/// text unchanged when no bracket pair is found.
fn extract_json_payload(text: &str) -> &str {
    let text = strip_json_fences(text);
    if text.starts_with('{') || text.starts_with('[') {
        return text;
    }
    let open = match text.find(['{', '[']) {
        Some(i) => i,
        None => return text,
    };
    let closer = if text[open..].starts_with('{') { '}' } else { ']' };
    match text.rfind(closer) {
        Some(close) if close > open => &text[open..=close],
        _ => text,
    }
}
