// All LLM prompt constants for the generation module.
// Reuses cross-cutting fragments from llm_client::prompts.

/// Role line for bullet generation; `json_system` appends the JSON-only rules.
pub const BULLETS_ROLE: &str = "You are an expert resume writer generating factual, \
    grounded resume bullets from a candidate's verified experience.";

/// Bullet generation prompt template.
/// Replace: {grounding_instruction}, {job_title}, {company}, {responsibilities},
///          {required_skills}, {nice_to_have}, {candidate_skills}, {skill_gap},
///          {evidence}, {min_chars}, {max_chars}, {feedback_block}
pub const BULLETS_PROMPT_TEMPLATE: &str = r#"{grounding_instruction}

TARGET ROLE: {job_title} at {company}

RESPONSIBILITIES:
{responsibilities}

REQUIRED SKILLS: {required_skills}
NICE TO HAVE: {nice_to_have}

CANDIDATE SKILL LIST (the ONLY skills you may claim):
{candidate_skills}

SKILL GAP ANALYSIS:
{skill_gap}

RETRIEVED EVIDENCE (source of truth, grouped by source, cite the id):
{evidence}

Write 4 to 6 tailored resume bullets. Return a JSON object:
{
  "bullets": [
    {
      "id": "bullet-001",
      "text": "Deployed 12 ranking models to Kubernetes, cutting inference latency by 35%",
      "source_experience_id": "exp-001",
      "skills_covered": ["Kubernetes"]
    }
  ]
}

HARD RULES:
1. Every bullet is {min_chars} to {max_chars} characters
2. `source_experience_id` MUST be one of the ids shown in the evidence above
3. `skills_covered` may only contain skills from the candidate skill list
4. Mention required skills by name in the bullet text where the evidence supports them
5. Start with an action verb; no first-person pronouns; no filler such as "responsible for"
6. Use ONLY facts from the evidence; never invent metrics or employers{feedback_block}"#;

/// Role line for cover letters.
pub const COVER_LETTER_ROLE: &str = "You are a professional career advisor writing concise, \
    specific cover letters grounded in a candidate's real achievements.";

/// Cover letter prompt template.
/// Replace: {grounding_instruction}, {candidate_name}, {job_title}, {company},
///          {job_id}, {responsibilities}, {required_skills}, {bullets}, {feedback_block}
pub const COVER_LETTER_PROMPT_TEMPLATE: &str = r#"{grounding_instruction}

CANDIDATE: {candidate_name}
ROLE: {job_title} at {company}

RESPONSIBILITIES:
{responsibilities}

REQUIRED SKILLS: {required_skills}

VALIDATED ACHIEVEMENTS (cite these, nothing else):
{bullets}

Write a three to four paragraph cover letter of 250 to 400 words. Open with why this role and
company, connect two or three achievements to the responsibilities, and close with a short
call to action. Do NOT open with "I am writing to apply" or any similar stock phrase.

Return a JSON object:
{
  "id": "cover-001",
  "job_id": "{job_id}",
  "job_title": "{job_title}",
  "company": "{company}",
  "tone": "professional",
  "text": "<full letter, paragraphs separated by a blank line>"
}{feedback_block}"#;

/// Role line for the one-shot baseline arm.
pub const BASELINE_ROLE: &str = "You are a professional resume writer. \
    Generate tailored resume bullets for job applications.";

/// Baseline prompt template. No retrieval, no grounding block.
/// Replace: {job_title}, {company}, {required_skills}, {responsibilities}, {bullets}, {count}
pub const BASELINE_PROMPT_TEMPLATE: &str = r#"Rewrite resume bullets to match this job posting.

JOB TITLE: {job_title}
COMPANY: {company}
REQUIRED SKILLS: {required_skills}

RESPONSIBILITIES:
{responsibilities}

CANDIDATE'S CURRENT RESUME BULLETS:
{bullets}

Generate {count} tailored resume bullets. Use strong action verbs, be specific and
quantifiable, no first-person pronouns. Return a JSON object:
{
  "bullets": [
    {"id": "baseline-bullet-001", "text": "...", "skills_covered": ["Skill"]}
  ]
}"#;

/// Baseline cover letter template.
/// Replace: {candidate_name}, {job_title}, {company}, {job_id}, {required_skills}
pub const BASELINE_COVER_LETTER_TEMPLATE: &str = r#"Write a professional cover letter for this job application.

CANDIDATE: {candidate_name}
JOB: {job_title} at {company}
REQUIRED SKILLS: {required_skills}

Write a concise cover letter (200 to 500 words) that expresses interest in the position,
highlights relevant experience and explains the fit. Return a JSON object:
{
  "id": "cover-baseline-001",
  "job_id": "{job_id}",
  "tone": "professional",
  "text": "<full cover letter text>"
}"#;

/// Renders `items` as a dash list, or "N/A" when empty.
pub fn dash_list(items: &[String]) -> String {
    if items.is_empty() {
        return "N/A".to_string();
    }
    items
        .iter()
        .map(|i| format!("- {i}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Comma-joined list, or "N/A" when empty.
pub fn comma_list(items: &[String]) -> String {
    if items.is_empty() {
        "N/A".to_string()
    } else {
        items.join(", ")
    }
}

/// Wraps formatted validation feedback so it lands after the hard rules.
pub fn feedback_block(feedback: Option<&str>) -> String {
    match feedback {
        Some(f) if !f.trim().is_empty() => format!(
            "\n\nPREVIOUS ATTEMPTS FAILED VALIDATION. Fix every issue below:\n{}",
            f.trim_end()
        ),
        _ => String::new(),
    }
}
