use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::TailorError;

/// A structured job posting. Usually authored as YAML or produced by `ingestion`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobDescription {
    pub job_id: String,
    pub title: String,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub seniority: Option<String>,
    #[serde(default)]
    pub responsibilities: Vec<String>,
    #[serde(default)]
    pub required_skills: Vec<String>,
    #[serde(default)]
    pub nice_to_have_skills: Vec<String>,
    #[serde(default)]
    pub extra_metadata: BTreeMap<String, serde_json::Value>,
}

impl JobDescription {
    /// Title, responsibilities and required skills joined into one query string.
    pub fn search_text(&self) -> String {
        let mut parts = vec![self.title.clone()];
        parts.extend(self.responsibilities.iter().cloned());
        if !self.required_skills.is_empty() {
            parts.push(format!("Skills: {}", self.required_skills.join(", ")));
        }
        parts.join("\n")
    }

    pub fn company_or_default(&self) -> &str {
        self.company.as_deref().unwrap_or("the company")
    }
}

pub fn load_job(path: &Path) -> Result<JobDescription, TailorError> {
    let job: JobDescription = super::load_document(path)?;
    if job.job_id.trim().is_empty() || job.title.trim().is_empty() {
        return Err(TailorError::InvalidInput(format!(
            "{}: job_id and title are required",
            path.display()
        )));
    }
    Ok(job)
}
