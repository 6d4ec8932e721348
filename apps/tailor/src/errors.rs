use thiserror::Error;

use crate::embeddings::EmbeddingError;
use crate::llm_client::LlmError;

/// Application-level error type.
/// Every pipeline stage returns `Result<T, TailorError>`; `main` maps it to an exit code.
#[derive(Debug, Error)]
pub enum TailorError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("Embedding error: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl TailorError {
    /// Stable machine-readable code, written into batch summaries.
    pub fn code(&self) -> &'static str {
        match self {
            TailorError::NotFound(_) => "NOT_FOUND",
            TailorError::Validation(_) => "VALIDATION_ERROR",
            TailorError::InvalidInput(_) => "INVALID_INPUT",
            TailorError::Llm(_) => "LLM_ERROR",
            TailorError::Embedding(_) => "EMBEDDING_ERROR",
            TailorError::Io(_) => "IO_ERROR",
            TailorError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}
