//! Embeddings: text encoding, the per-bullet similarity index, and retrieval.
//!
//! The encoder is a black box: any backend that returns fixed-length vectors
//! whose cosine similarity tracks meaning can sit behind `Encoder`.

use async_trait::async_trait;
use thiserror::Error;

use crate::config::{Config, EmbeddingBackend};
use crate::llm_client::LlmError;

pub mod hashing;
pub mod http;
pub mod index;
pub mod retriever;

pub use hashing::HashingEncoder;
pub use http::HttpEncoder;
pub use index::{SearchHit, SimilarityIndex};
pub use retriever::{retrieve, Retrieval, RetrievalConfig};

#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("embedding request failed: {0}")]
    Request(#[from] LlmError),

    #[error("embedding response parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("embedding service returned no vectors")]
    EmptyResponse,

    #[error("expected {expected} vectors, got {actual}")]
    CountMismatch { expected: usize, actual: usize },

    #[error("vector dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
}

/// Turns text into L2-normalized vectors.
#[async_trait]
pub trait Encoder: Send + Sync {
    /// Backend identifier for logs.
    fn name(&self) -> &str;

    /// Length of every vector this encoder returns.
    fn dimension(&self) -> usize;

    /// Encodes every text, preserving order. An empty batch never reaches the model.
    async fn encode_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError>;

    async fn encode(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let mut vectors = self.encode_batch(&[text.to_string()]).await?;
        vectors.pop().ok_or(EmbeddingError::EmptyResponse)
    }
}

/// Builds the configured encoder.
pub fn build_encoder(config: &Config) -> anyhow::Result<Box<dyn Encoder>> {
    let encoder: Box<dyn Encoder> = match config.embedding_backend {
        EmbeddingBackend::Hashing => Box::new(HashingEncoder::new(config.embedding_dim)),
        EmbeddingBackend::Http => {
            let api_key = config.openai_api_key.clone().ok_or_else(|| {
                anyhow::anyhow!("EMBEDDING_BACKEND=http requires OPENAI_API_KEY")
            })?;
            Box::new(HttpEncoder::new(
                api_key,
                config.openai_base_url.clone(),
                config.embedding_model.clone(),
                config.embedding_dim,
                config.llm_max_retries,
            )?)
        }
    };
    Ok(encoder)
}

/// Scales `v` to unit length in place. Zero vectors are left untouched.
pub fn normalize(v: &mut [f32]) {
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        v.iter_mut().for_each(|x| *x /= norm);
    }
}

/// Cosine similarity; 0.0 when either side is a zero vector.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(&x, &y)| x * y).sum();
    let mag_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let mag_b: f32 = b.iter().map(|y| y * y).sum::<f32>().sqrt();
    if mag_a == 0.0 || mag_b == 0.0 {
        return 0.0;
    }
    dot / (mag_a * mag_b)
}
