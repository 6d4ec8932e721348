use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

/// Which hosted LLM answers generation calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum LlmProvider {
    Anthropic,
    #[serde(rename = "openai")]
    #[value(name = "openai")]
    OpenAi,
}

impl FromStr for LlmProvider {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "anthropic" | "claude" => Ok(LlmProvider::Anthropic),
            "openai" | "open_ai" => Ok(LlmProvider::OpenAi),
            other => bail!("Unknown LLM provider '{other}' (expected 'anthropic' or 'openai')"),
        }
    }
}

/// Which encoder backs retrieval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmbeddingBackend {
    /// Local feature-hashing encoder. No network, deterministic.
    Hashing,
    /// OpenAI-compatible `/v1/embeddings` endpoint.
    Http,
}

impl FromStr for EmbeddingBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "hashing" | "local" => Ok(EmbeddingBackend::Hashing),
            "http" | "openai" => Ok(EmbeddingBackend::Http),
            other => bail!("Unknown embedding backend '{other}' (expected 'hashing' or 'http')"),
        }
    }
}

/// Application configuration loaded from environment variables.
/// Fails at startup if the API key for the selected provider is missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub llm_provider: LlmProvider,
    pub anthropic_api_key: Option<String>,
    pub openai_api_key: Option<String>,
    pub anthropic_model: String,
    pub openai_model: String,
    pub openai_base_url: String,
    pub llm_max_tokens: u32,
    pub llm_temperature: f32,
    pub llm_max_retries: u32,
    pub embedding_backend: EmbeddingBackend,
    pub embedding_model: String,
    pub embedding_dim: usize,
    pub retrieval_top_k: usize,
    pub skill_top_k: usize,
    pub max_attempts: u32,
    pub min_skill_coverage: f64,
    pub max_bullet_chars: usize,
    pub concurrency_limit: usize,
    pub output_dir: PathBuf,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let config = Config {
            llm_provider: env_or("LLM_PROVIDER", LlmProvider::Anthropic)?,
            anthropic_api_key: optional_env("ANTHROPIC_API_KEY"),
            openai_api_key: optional_env("OPENAI_API_KEY"),
            anthropic_model: env_or("ANTHROPIC_MODEL", "claude-sonnet-4-5".to_string())?,
            openai_model: env_or("OPENAI_MODEL", "gpt-4o-mini".to_string())?,
            openai_base_url: env_or("OPENAI_BASE_URL", "https://api.openai.com/v1".to_string())?,
            llm_max_tokens: env_or("LLM_MAX_TOKENS", 1500)?,
            llm_temperature: env_or("LLM_TEMPERATURE", 0.7)?,
            llm_max_retries: env_or("LLM_MAX_RETRIES", 3)?,
            embedding_backend: env_or("EMBEDDING_BACKEND", EmbeddingBackend::Hashing)?,
            embedding_model: env_or("EMBEDDING_MODEL", "text-embedding-3-small".to_string())?,
            embedding_dim: env_or("EMBEDDING_DIM", 384)?,
            retrieval_top_k: env_or("RETRIEVAL_TOP_K", 5)?,
            skill_top_k: env_or("SKILL_TOP_K", 3)?,
            max_attempts: env_or("MAX_ATTEMPTS", 3)?,
            min_skill_coverage: env_or("MIN_SKILL_COVERAGE", 0.5)?,
            max_bullet_chars: env_or("MAX_BULLET_CHARS", 150)?,
            concurrency_limit: env_or("CONCURRENCY_LIMIT", 3)?,
            output_dir: PathBuf::from(env_or("OUTPUT_DIR", "outputs".to_string())?),
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        };
        config.validate()?;
        Ok(config)
    }

    /// Range checks shared by env loading and CLI overrides.
    pub fn validate(&self) -> Result<()> {
        if self.max_attempts == 0 {
            bail!("MAX_ATTEMPTS must be at least 1");
        }
        if !(0.0..=1.0).contains(&self.min_skill_coverage) {
            bail!("MIN_SKILL_COVERAGE must be between 0.0 and 1.0");
        }
        if !(0.0..=2.0).contains(&self.llm_temperature) {
            bail!("LLM_TEMPERATURE must be between 0.0 and 2.0");
        }
        if self.concurrency_limit == 0 {
            bail!("CONCURRENCY_LIMIT must be at least 1");
        }
        if self.embedding_dim == 0 {
            bail!("EMBEDDING_DIM must be at least 1");
        }
        Ok(())
    }

    /// Returns the API key for the selected provider.
    pub fn api_key(&self) -> Result<&str> {
        let (key, var) = match self.llm_provider {
            LlmProvider::Anthropic => (&self.anthropic_api_key, "ANTHROPIC_API_KEY"),
            LlmProvider::OpenAi => (&self.openai_api_key, "OPENAI_API_KEY"),
        };
        key.as_deref()
            .with_context(|| format!("Required environment variable '{var}' is not set"))
    }

    pub fn model_name(&self) -> &str {
        match self.llm_provider {
            LlmProvider::Anthropic => &self.anthropic_model,
            LlmProvider::OpenAi => &self.openai_model,
        }
    }
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn env_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match optional_env(key) {
        Some(raw) => raw
            .parse::<T>()
            .map_err(|e| anyhow::anyhow!("{key} has an invalid value '{raw}': {e}")),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_parses_aliases() {
        assert_eq!("Claude".parse::<LlmProvider>().unwrap(), LlmProvider::Anthropic);
        assert_eq!("openai".parse::<LlmProvider>().unwrap(), LlmProvider::OpenAi);
        assert!("cohere".parse::<LlmProvider>().is_err());
    }

    #[test]
    fn test_embedding_backend_parses() {
        assert_eq!(
            "hashing".parse::<EmbeddingBackend>().unwrap(),
            EmbeddingBackend::Hashing
        );
        assert_eq!("HTTP".parse::<EmbeddingBackend>().unwrap(), EmbeddingBackend::Http);
    }

    #[test]
    fn test_env_or_uses_default_when_unset() {
        let value: usize = env_or("TAILOR_TEST_SURELY_UNSET_VAR", 7).unwrap();
        assert_eq!(value, 7);
    }

    #[test]
    fn test_validate_rejects_zero_attempts() {
        let mut config = crate::test_support::test_config();
        config.max_attempts = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_api_key_missing_for_selected_provider() {
        let mut config = crate::test_support::test_config();
        config.llm_provider = LlmProvider::OpenAi;
        config.openai_api_key = None;
        let err = config.api_key().unwrap_err();
        assert!(err.to_string().contains("OPENAI_API_KEY"));
    }
}
