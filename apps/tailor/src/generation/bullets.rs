//! Bullet generation: evidence-grounded prompt, LLM call, response normalization.

use std::collections::HashSet;

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::embeddings::retriever::most_common_source;
use crate::generation::prompts::{
    comma_list, dash_list, feedback_block, BULLETS_PROMPT_TEMPLATE, BULLETS_ROLE,
};
use crate::generation::GenerationContext;
use crate::llm_client::prompts::{json_system, GROUNDING_INSTRUCTION};
use crate::llm_client::{parse_json, LlmError, TextGenerator};
use crate::models::GeneratedBullet;

/// Hits per query that make it into the prompt.
const HITS_PER_QUERY: usize = 3;
pub const MIN_BULLET_CHARS: usize = 30;

pub async fn generate_bullets(
    ctx: &GenerationContext<'_>,
    llm: &dyn TextGenerator,
    feedback: Option<&str>,
) -> Result<Vec<GeneratedBullet>, LlmError> {
    let prompt = build_bullets_prompt(ctx, feedback);
    debug!("Bullet prompt for {}:\n{}", ctx.job.job_id, prompt);

    let raw = llm.generate(&json_system(BULLETS_ROLE), &prompt).await?;
    let parsed: Value = parse_json(&raw)?;
    let bullets = normalize_bullets(parsed, ctx)?;

    info!("Generated {} bullets for {}", bullets.len(), ctx.job.job_id);
    Ok(bullets)
}

/// Builds the prompt by filling the template with job, skill and evidence blocks.
pub fn build_bullets_prompt(ctx: &GenerationContext<'_>, feedback: Option<&str>) -> String {
    BULLETS_PROMPT_TEMPLATE
        .replace("{grounding_instruction}", GROUNDING_INSTRUCTION)
        .replace("{job_title}", &ctx.job.title)
        .replace("{company}", ctx.job.company_or_default())
        .replace("{responsibilities}", &dash_list(&ctx.job.responsibilities))
        .replace("{required_skills}", &comma_list(&ctx.job.required_skills))
        .replace("{nice_to_have}", &comma_list(&ctx.job.nice_to_have_skills))
        .replace("{candidate_skills}", &comma_list(&ctx.resume.skills))
        .replace("{skill_gap}", &ctx.skill_gap.prompt_summary())
        .replace("{evidence}", &format_evidence(ctx))
        .replace("{min_chars}", &MIN_BULLET_CHARS.to_string())
        .replace("{max_chars}", &ctx.max_bullet_chars.to_string())
        .replace("{feedback_block}", &feedback_block(feedback))
}

/// Groups the top hits of every query by source, first-seen order, no repeated text.
fn format_evidence(ctx: &GenerationContext<'_>) -> String {
    let mut groups: Vec<(String, Vec<&str>)> = Vec::new();
    let mut seen_text: HashSet<&str> = HashSet::new();

    let queries = ctx
        .retrieval
        .responsibilities
        .iter()
        .chain(ctx.retrieval.skills.iter());

    for query in queries {
        for hit in query.hits.iter().take(HITS_PER_QUERY) {
            if !seen_text.insert(hit.text.as_str()) {
                continue;
            }
            match groups.iter_mut().find(|(id, _)| *id == hit.source_id) {
                Some((_, texts)) => texts.push(&hit.text),
                None => groups.push((hit.source_id.clone(), vec![&hit.text])),
            }
        }
    }

    if groups.is_empty() {
        return "N/A".to_string();
    }

    groups
        .iter()
        .map(|(id, texts)| {
            let label = ctx
                .resume
                .source_label(id)
                .unwrap_or_else(|| id.clone());
            let lines = texts
                .iter()
                .map(|t| format!("- {t}"))
                .collect::<Vec<_>>()
                .join("\n");
            format!("### {label} (id: {id})\n{lines}")
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Accepts `{"bullets": [...]}` or a bare array, fills ids and attributions.
pub fn normalize_bullets(
    parsed: Value,
    ctx: &GenerationContext<'_>,
) -> Result<Vec<GeneratedBullet>, LlmError> {
    let items = match parsed {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("bullets") {
            Some(Value::Array(items)) => items,
            _ => {
                return Err(LlmError::Shape(
                    "expected a \"bullets\" array in the response".to_string(),
                ))
            }
        },
        other => {
            return Err(LlmError::Shape(format!(
                "expected a bullets object or array, got {}",
                json_kind(&other)
            )))
        }
    };

    let fallback_source = most_common_source(ctx.retrieval)
        .or_else(|| ctx.resume.experiences.first().map(|e| e.id.clone()));

    let mut bullets = Vec::with_capacity(items.len());
    for (i, item) in items.into_iter().enumerate() {
        let mut bullet: GeneratedBullet = serde_json::from_value(item)?;
        bullet.text = bullet.text.trim().to_string();

        if bullet.id.trim().is_empty() {
            bullet.id = format!("bullet-{:03}", i + 1);
        }

        let known = bullet
            .source_experience_id
            .as_deref()
            .is_some_and(|id| ctx.resume.has_source(id));
        if !known {
            if let Some(unknown) = &bullet.source_experience_id {
                warn!(
                    "Bullet {} cites unknown source '{}', inferring attribution",
                    bullet.id, unknown
                );
            }
            bullet.source_experience_id = fallback_source.clone();
        }

        bullets.push(bullet);
    }
    Ok(bullets)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
