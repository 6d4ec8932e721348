// Shared prompt constants and prompt-building utilities.
// Each module that needs LLM calls defines its own prompts alongside it.
// This file contains cross-cutting prompt fragments.

/// System prompt fragment that enforces JSON-only output.
pub const JSON_ONLY_SYSTEM: &str = "You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or apologies.";

/// Common instruction appended to all generation prompts.
pub const GROUNDING_INSTRUCTION: &str = "\
    CRITICAL: Every claim you generate must be traceable to the candidate's \
    experience shown below. Do NOT infer, interpolate, or invent details, \
    employers, metrics, or skills. If the evidence does not support a claim, omit it.";

/// Rule set repeated in feedback blocks so a retry sees the constraints next to its mistakes.
pub const STYLE_RULES: &[&str] = &[
    "Start every bullet with a strong action verb",
    "NO first-person pronouns (I, me, my, we, our)",
    "Avoid filler phrasing such as 'responsible for' or 'worked on'",
    "Only list skills that appear in the candidate's skill list",
];

/// Appends the JSON-only fragment to a role description.
pub fn json_system(role: &str) -> String {
    format!("{role}\n\n{JSON_ONLY_SYSTEM}")
}
