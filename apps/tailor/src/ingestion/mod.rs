// Ingestion: raw job postings and resumes (text or PDF) into structured models.

pub mod prompts;

use std::path::Path;

use serde::de::DeserializeOwned;
use tracing::{info, warn};

use crate::errors::TailorError;
use crate::ingestion::prompts::{
    JOB_PARSE_PROMPT, JOB_PARSE_ROLE, RESUME_PARSE_PROMPT, RESUME_PARSE_ROLE, RETRY_INSTRUCTION,
};
use crate::llm_client::prompts::json_system;
use crate::llm_client::{call_json, LlmError, TextGenerator};
use crate::models::{CandidateProfile, JobDescription};

const MAX_PARSE_ATTEMPTS: u32 = 2;

/// Reads a source document. PDFs go through text extraction; anything else is read as UTF-8.
pub fn read_source_text(path: &Path) -> Result<String, TailorError> {
    if !path.exists() {
        return Err(TailorError::NotFound(format!("{}", path.display())));
    }
    let is_pdf = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("pdf"));

    let text = if is_pdf {
        pdf_extract::extract_text(path).map_err(|e| {
            TailorError::InvalidInput(format!("{}: PDF text extraction failed: {e}", path.display()))
        })?
    } else {
        std::fs::read_to_string(path)?
    };

    if text.trim().is_empty() {
        return Err(TailorError::InvalidInput(format!(
            "{} contains no text",
            path.display()
        )));
    }
    Ok(text)
}

pub async fn ingest_job_text(
    raw: &str,
    llm: &dyn TextGenerator,
) -> Result<JobDescription, TailorError> {
    let job: JobDescription = parse_with_retry(raw, llm, JOB_PARSE_ROLE, JOB_PARSE_PROMPT).await?;
    if job.job_id.trim().is_empty() || job.title.trim().is_empty() {
        return Err(TailorError::Validation(
            "parsed job is missing job_id or title".into(),
        ));
    }
    info!(
        "Parsed job {} ({} responsibilities, {} required skills)",
        job.job_id,
        job.responsibilities.len(),
        job.required_skills.len()
    );
    Ok(job)
}

pub async fn ingest_resume_text(
    raw: &str,
    llm: &dyn TextGenerator,
) -> Result<CandidateProfile, TailorError> {
    let resume: CandidateProfile =
        parse_with_retry(raw, llm, RESUME_PARSE_ROLE, RESUME_PARSE_PROMPT).await?;
    info!(
        "Parsed resume for {} ({} skills, {} experiences, {} projects)",
        resume.name,
        resume.skills.len(),
        resume.experiences.len(),
        resume.projects.len()
    );
    Ok(resume)
}

async fn parse_with_retry<T: DeserializeOwned>(
    raw: &str,
    llm: &dyn TextGenerator,
    role: &str,
    template: &str,
) -> Result<T, TailorError> {
    if raw.trim().is_empty() {
        return Err(TailorError::InvalidInput("source text is empty".into()));
    }
    let system = json_system(role);
    let mut last_error: Option<LlmError> = None;

    for attempt in 1..=MAX_PARSE_ATTEMPTS {
        let retry_block = if attempt > 1 { RETRY_INSTRUCTION } else { "" };
        let prompt = template
            .replace("{retry_block}", retry_block)
            .replace("{raw_text}", raw.trim());

        match call_json::<T>(llm, &prompt, &system).await {
            Ok(parsed) => return Ok(parsed),
            Err(e) if e.is_fatal() => return Err(e.into()),
            Err(e) => {
                warn!("Parse attempt {}/{} failed: {}", attempt, MAX_PARSE_ATTEMPTS, e);
                last_error = Some(e);
            }
        }
    }

    Err(last_error.map_or_else(
        || TailorError::Validation("no parse attempts were made".into()),
        TailorError::from,
    ))
}
