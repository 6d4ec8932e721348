//! OpenAI-compatible `/embeddings` backend.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{normalize, EmbeddingError, Encoder};
use crate::llm_client::{http_client, send_with_retry};

/// Inputs per request; the API caps batch size well above this.
const MAX_BATCH: usize = 96;

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
    dimensions: usize,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingDatum>,
    usage: Option<EmbeddingUsage>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingDatum {
    index: usize,
    embedding: Vec<f32>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingUsage {
    total_tokens: u32,
}

pub struct HttpEncoder {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    dimension: usize,
    max_retries: u32,
}

impl HttpEncoder {
    pub fn new(
        api_key: String,
        base_url: String,
        model: String,
        dimension: usize,
        max_retries: u32,
    ) -> Result<Self, EmbeddingError> {
        Ok(Self {
            client: http_client()?,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
            dimension,
            max_retries,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/embeddings", self.base_url)
    }

    async fn encode_chunk(&self, chunk: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let request_body = EmbeddingRequest {
            model: &self.model,
            input: chunk,
            dimensions: self.dimension,
        };
        let url = self.endpoint();

        let body = send_with_retry(
            || {
                self.client
                    .post(&url)
                    .bearer_auth(&self.api_key)
                    .json(&request_body)
            },
            self.max_retries,
        )
        .await?;

        let parsed: EmbeddingResponse = serde_json::from_str(&body)?;
        if let Some(usage) = &parsed.usage {
            debug!("Embedding call succeeded: total_tokens={}", usage.total_tokens);
        }
        order_and_normalize(parsed.data, chunk.len(), self.dimension)
    }
}

#[async_trait]
impl Encoder for HttpEncoder {
    fn name(&self) -> &str {
        &self.model
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn encode_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let mut vectors = Vec::with_capacity(texts.len());
        for chunk in texts.chunks(MAX_BATCH) {
            vectors.extend(self.encode_chunk(chunk).await?);
        }
        Ok(vectors)
    }
}

/// Orders vectors by their `index` field and re-normalizes them.
fn order_and_normalize(
    mut data: Vec<EmbeddingDatum>,
    expected: usize,
    dimension: usize,
) -> Result<Vec<Vec<f32>>, EmbeddingError> {
    if data.is_empty() {
        return Err(EmbeddingError::EmptyResponse);
    }
    if data.len() != expected {
        return Err(EmbeddingError::CountMismatch {
            expected,
            actual: data.len(),
        });
    }
    data.sort_by_key(|d| d.index);
    data.into_iter()
        .map(|d| {
            let mut v = d.embedding;
            if v.len() != dimension {
                return Err(EmbeddingError::DimensionMismatch {
                    expected: dimension,
                    actual: v.len(),
                });
            }
            normalize(&mut v);
            Ok(v)
        })
        .collect()
}
