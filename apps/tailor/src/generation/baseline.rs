//! Baseline arm: one-shot generation from raw resume bullets.
//! No retrieval, no validation, no attribution. Exists so evaluation has
//! something to compare the agent loop against.

use serde_json::Value;
use tracing::info;

use crate::generation::cover_letter::normalize_cover_letter;
use crate::generation::prompts::{
    comma_list, dash_list, BASELINE_COVER_LETTER_TEMPLATE, BASELINE_PROMPT_TEMPLATE,
    BASELINE_ROLE,
};
use crate::llm_client::prompts::json_system;
use crate::llm_client::{parse_json, LlmError, TextGenerator};
use crate::models::{CandidateProfile, GeneratedBullet, GeneratedCoverLetter, JobDescription};

/// Raw bullets shown to the model.
const MAX_SOURCE_BULLETS: usize = 20;
const MAX_RESPONSIBILITIES: usize = 5;
const MIN_BULLET_COUNT: usize = 5;

pub async fn generate_baseline_bullets(
    job: &JobDescription,
    resume: &CandidateProfile,
    llm: &dyn TextGenerator,
) -> Result<Vec<GeneratedBullet>, LlmError> {
    info!("Generating baseline bullets for {} (no retrieval)", job.job_id);

    let source: Vec<String> = resume
        .all_bullets()
        .into_iter()
        .take(MAX_SOURCE_BULLETS)
        .map(|(_, _, text)| text.to_string())
        .collect();
    let responsibilities: Vec<String> = job
        .responsibilities
        .iter()
        .take(MAX_RESPONSIBILITIES)
        .cloned()
        .collect();
    let count = MIN_BULLET_COUNT.max(job.responsibilities.len());

    let prompt = BASELINE_PROMPT_TEMPLATE
        .replace("{job_title}", &job.title)
        .replace("{company}", job.company.as_deref().unwrap_or("N/A"))
        .replace("{required_skills}", &comma_list(&job.required_skills))
        .replace("{responsibilities}", &dash_list(&responsibilities))
        .replace("{bullets}", &dash_list(&source))
        .replace("{count}", &count.to_string());

    let raw = llm.generate(&json_system(BASELINE_ROLE), &prompt).await?;
    let parsed: Value = parse_json(&raw)?;
    let items = match parsed {
        Value::Object(mut map) => match map.remove("bullets") {
            Some(Value::Array(items)) => items,
            _ => Vec::new(),
        },
        Value::Array(items) => items,
        _ => Vec::new(),
    };

    // Items that fail to deserialize are skipped; the arm is deliberately lenient.
    let bullets: Vec<GeneratedBullet> = items
        .into_iter()
        .filter_map(|item| serde_json::from_value::<GeneratedBullet>(item).ok())
        .enumerate()
        .map(|(i, mut b)| {
            if b.id.trim().is_empty() {
                b.id = format!("baseline-bullet-{:03}", i + 1);
            }
            b.text = b.text.trim().to_string();
            b.source_experience_id = None;
            b
        })
        .collect();

    info!("Generated {} baseline bullets", bullets.len());
    Ok(bullets)
}

pub async fn generate_baseline_cover_letter(
    job: &JobDescription,
    resume: &CandidateProfile,
    llm: &dyn TextGenerator,
) -> Result<GeneratedCoverLetter, LlmError> {
    let skills: Vec<String> = job.required_skills.iter().take(5).cloned().collect();
    let prompt = BASELINE_COVER_LETTER_TEMPLATE
        .replace("{candidate_name}", &resume.name)
        .replace("{job_title}", &job.title)
        .replace("{company}", job.company_or_default())
        .replace("{job_id}", &job.job_id)
        .replace("{required_skills}", &comma_list(&skills));

    let raw = llm
        .generate(
            &json_system("You are a professional career advisor and cover letter writer."),
            &prompt,
        )
        .await?;
    normalize_cover_letter(&raw, job)
}
