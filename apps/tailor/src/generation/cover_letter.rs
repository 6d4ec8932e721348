//! Cover letter generation and response normalization.

use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::generation::prompts::{
    comma_list, dash_list, feedback_block, COVER_LETTER_PROMPT_TEMPLATE, COVER_LETTER_ROLE,
};
use crate::llm_client::prompts::{json_system, GROUNDING_INSTRUCTION};
use crate::llm_client::{parse_json, LlmError, TextGenerator};
use crate::models::{CandidateProfile, GeneratedBullet, GeneratedCoverLetter, JobDescription};

const TEXT_KEYS: &[&str] = &["text", "body", "content", "letter", "full_text"];
const PART_KEYS: &[&str] = &["opening", "body", "closing"];

pub async fn generate_cover_letter(
    job: &JobDescription,
    resume: &CandidateProfile,
    bullets: &[GeneratedBullet],
    llm: &dyn TextGenerator,
    feedback: Option<&str>,
) -> Result<GeneratedCoverLetter, LlmError> {
    let bullet_lines: Vec<String> = bullets.iter().map(|b| b.text.clone()).collect();
    let prompt = COVER_LETTER_PROMPT_TEMPLATE
        .replace("{grounding_instruction}", GROUNDING_INSTRUCTION)
        .replace("{candidate_name}", &resume.name)
        .replace("{job_title}", &job.title)
        .replace("{company}", job.company_or_default())
        .replace("{job_id}", &job.job_id)
        .replace("{responsibilities}", &dash_list(&job.responsibilities))
        .replace("{required_skills}", &comma_list(&job.required_skills))
        .replace("{bullets}", &dash_list(&bullet_lines))
        .replace("{feedback_block}", &feedback_block(feedback));
    debug!("Cover letter prompt for {}:\n{}", job.job_id, prompt);

    let raw = llm.generate(&json_system(COVER_LETTER_ROLE), &prompt).await?;
    let letter = normalize_cover_letter(&raw, job)?;

    info!(
        "Generated cover letter for {} ({} words, {} paragraphs)",
        job.job_id,
        letter.word_count(),
        letter.paragraph_count()
    );
    Ok(letter)
}

/// Coerces whatever the model returned into a `GeneratedCoverLetter`.
///
/// - `{"cover_letter": {...}}` is unwrapped.
/// - `text` comes from the first non-empty of `text`, `body`, `content`,
///   `letter`, `full_text`; otherwise `opening`/`body`/`closing` are stitched.
/// - Missing `job_id`, `job_title` and `company` are filled from the job.
/// - Output that is not JSON at all is taken verbatim as the letter text.
pub fn normalize_cover_letter(
    raw: &str,
    job: &JobDescription,
) -> Result<GeneratedCoverLetter, LlmError> {
    if raw.trim().is_empty() {
        return Err(LlmError::EmptyContent);
    }

    let mut map = match parse_json::<Value>(raw) {
        Ok(Value::Object(map)) => unwrap_nested(map),
        Ok(_) | Err(_) => {
            return Ok(fill_from_job(
                GeneratedCoverLetter {
                    id: String::new(),
                    job_id: String::new(),
                    job_title: None,
                    company: None,
                    tone: "professional".to_string(),
                    text: raw.trim().to_string(),
                },
                job,
            ))
        }
    };

    let text = first_text(&map).or_else(|| stitch_parts(&map)).ok_or_else(|| {
        LlmError::Shape("cover letter response has no text field".to_string())
    })?;
    map.insert("text".to_string(), Value::String(text));

    let letter: GeneratedCoverLetter = serde_json::from_value(Value::Object(map))?;
    Ok(fill_from_job(letter, job))
}

fn unwrap_nested(mut map: Map<String, Value>) -> Map<String, Value> {
    match map.remove("cover_letter") {
        Some(Value::Object(inner)) => inner,
        Some(other) => {
            map.insert("cover_letter".to_string(), other);
            map
        }
        None => map,
    }
}

fn first_text(map: &Map<String, Value>) -> Option<String> {
    TEXT_KEYS
        .iter()
        .filter_map(|k| map.get(*k).and_then(Value::as_str))
        .map(str::trim)
        .find(|t| !t.is_empty())
        .map(str::to_string)
}

fn stitch_parts(map: &Map<String, Value>) -> Option<String> {
    let parts: Vec<String> = PART_KEYS
        .iter()
        .filter_map(|k| map.get(*k))
        .flat_map(|v| match v {
            Value::String(s) => vec![s.trim().to_string()],
            Value::Array(items) => items
                .iter()
                .filter_map(Value::as_str)
                .map(|s| s.trim().to_string())
                .collect(),
            _ => vec![],
        })
        .filter(|s| !s.is_empty())
        .collect();

    if parts.is_empty() {
        None
    } else {
        Some(parts.join("\n\n"))
    }
}

fn fill_from_job(mut letter: GeneratedCoverLetter, job: &JobDescription) -> GeneratedCoverLetter {
    if letter.id.trim().is_empty() {
        letter.id = format!("cover-{}", job.job_id);
    }
    if letter.job_id.trim().is_empty() {
        letter.job_id = job.job_id.clone();
    }
    if letter.job_title.as_deref().map_or(true, |t| t.trim().is_empty()) {
        letter.job_title = Some(job.title.clone());
    }
    if letter.company.as_deref().map_or(true, |c| c.trim().is_empty()) {
        letter.company = job.company.clone();
    }
    letter
}
