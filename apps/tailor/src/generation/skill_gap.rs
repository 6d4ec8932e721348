//! Skill gap: compares the job's skill lists against the candidate's resume.
//!
//! Pure keyword matching, no LLM call:
//! 1. For each required (weight 1.0) and nice-to-have (weight 0.5) skill:
//!    - listed in the resume skills → strength 1.0 (matched)
//!    - mentioned in an original bullet → strength 0.6 (partial)
//!    - otherwise → strength 0.0 (missing)
//! 2. match_score = Σ(strength × weight) / Σ(weight) × 100
//! 3. `extra` holds resume skills the job never asks for.

use serde::{Deserialize, Serialize};

use crate::models::{CandidateProfile, JobDescription};

const REQUIRED_WEIGHT: f32 = 1.0;
const NICE_TO_HAVE_WEIGHT: f32 = 0.5;
const LISTED_STRENGTH: f32 = 1.0;
const MENTIONED_STRENGTH: f32 = 0.6;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SkillGap {
    /// Job skills the resume lists outright.
    pub matched: Vec<String>,
    /// Job skills the resume never lists but an original bullet mentions.
    pub partial: Vec<String>,
    /// Required skills with no evidence at all.
    pub missing: Vec<String>,
    /// Resume skills the job does not ask for.
    pub extra: Vec<String>,
    pub match_score: u32, // 0 – 100
    pub recommendation: String,
}

pub fn analyze_skill_gap(job: &JobDescription, resume: &CandidateProfile) -> SkillGap {
    let bullet_text = resume
        .all_bullets()
        .into_iter()
        .map(|(_, _, text)| text.to_lowercase())
        .collect::<Vec<_>>()
        .join("\n");

    let mut gap = SkillGap::default();
    let mut total_weight = 0.0_f32;
    let mut total_score = 0.0_f32;

    let weighted = job
        .required_skills
        .iter()
        .map(|s| (s, REQUIRED_WEIGHT, true))
        .chain(
            job.nice_to_have_skills
                .iter()
                .map(|s| (s, NICE_TO_HAVE_WEIGHT, false)),
        );

    for (skill, weight, required) in weighted {
        let skill = skill.trim();
        if skill.is_empty() {
            continue;
        }
        total_weight += weight;

        let strength = if resume.has_skill(skill) {
            gap.matched.push(skill.to_string());
            LISTED_STRENGTH
        } else if bullet_text.contains(&skill.to_lowercase()) {
            gap.partial.push(skill.to_string());
            MENTIONED_STRENGTH
        } else {
            if required {
                gap.missing.push(skill.to_string());
            }
            0.0
        };
        total_score += strength * weight;
    }

    gap.extra = resume
        .skills
        .iter()
        .filter(|s| {
            !job.required_skills
                .iter()
                .chain(job.nice_to_have_skills.iter())
                .any(|j| j.trim().eq_ignore_ascii_case(s.trim()))
        })
        .cloned()
        .collect();

    gap.match_score = if total_weight > 0.0 {
        ((total_score / total_weight) * 100.0).round() as u32
    } else {
        0
    };
    gap.recommendation = build_recommendation(gap.match_score, &gap.missing);
    gap
}

/// Builds a human-readable recommendation string from score and missing skills.
fn build_recommendation(score: u32, missing: &[String]) -> String {
    let top_missing: Vec<&str> = missing.iter().take(3).map(String::as_str).collect();

    if score >= 80 {
        "Strong fit. The resume directly covers the key job requirements.".to_string()
    } else if score >= 60 {
        format!(
            "Moderate fit ({score}/100). Lean on transferable evidence for: {}.",
            top_missing.join(", ")
        )
    } else {
        format!(
            "Low fit ({score}/100). Significant gaps: {}. Do not claim these skills.",
            top_missing.join(", ")
        )
    }
}

impl SkillGap {
    /// Compact summary for prompts.
    pub fn prompt_summary(&self) -> String {
        let list = |v: &[String]| {
            if v.is_empty() {
                "none".to_string()
            } else {
                v.join(", ")
            }
        };
        format!(
            "Matched skills: {}\nMentioned only in past bullets: {}\nMissing (never claim these): {}\nMatch score: {}/100",
            list(&self.matched),
            list(&self.partial),
            list(&self.missing),
            self.match_score
        )
    }
}
