// Data model shared by retrieval, generation, validation and rendering.

pub mod generated;
pub mod job;
pub mod resume;

use std::path::Path;

use serde::de::DeserializeOwned;

use crate::errors::TailorError;

pub use generated::{GeneratedBullet, GeneratedCoverLetter, GenerationMode, TailoredPackage};
pub use job::{load_job, JobDescription};
pub use resume::{load_resume, CandidateProfile, Experience, Project};

/// Reads a YAML (`.yaml`/`.yml`) or JSON document into `T`, choosing the format by extension.
pub(crate) fn load_document<T: DeserializeOwned>(path: &Path) -> Result<T, TailorError> {
    if !path.exists() {
        return Err(TailorError::NotFound(format!("{}", path.display())));
    }
    let raw = std::fs::read_to_string(path)?;
    parse_document(&raw, path)
}

pub(crate) fn parse_document<T: DeserializeOwned>(raw: &str, path: &Path) -> Result<T, TailorError> {
    let is_yaml = matches!(
        path.extension().and_then(|e| e.to_str()).map(str::to_ascii_lowercase).as_deref(),
        Some("yaml") | Some("yml")
    );
    if is_yaml {
        serde_yaml::from_str(raw).map_err(|e| {
            TailorError::InvalidInput(format!("{} is not a valid document: {e}", path.display()))
        })
    } else {
        serde_json::from_str(raw).map_err(|e| {
            TailorError::InvalidInput(format!("{} is not a valid document: {e}", path.display()))
        })
    }
}
