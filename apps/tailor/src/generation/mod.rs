// Generation: prompt building, LLM calls and response normalization for
// bullets and cover letters, plus the one-shot baseline arm.
// All LLM calls go through llm_client::TextGenerator.

pub mod baseline;
pub mod bullets;
pub mod cover_letter;
pub mod prompts;
pub mod skill_gap;

pub use baseline::{generate_baseline_bullets, generate_baseline_cover_letter};
pub use bullets::generate_bullets;
pub use cover_letter::generate_cover_letter;
pub use skill_gap::{analyze_skill_gap, SkillGap};

use crate::embeddings::Retrieval;
use crate::models::{CandidateProfile, JobDescription};

/// Everything a bullet prompt is built from. Borrowed for the duration of a run.
#[derive(Debug, Clone, Copy)]
pub struct GenerationContext<'a> {
    pub job: &'a JobDescription,
    pub resume: &'a CandidateProfile,
    pub retrieval: &'a Retrieval,
    pub skill_gap: &'a SkillGap,
    pub max_bullet_chars: usize,
}

impl<'a> GenerationContext<'a> {
    pub fn new(
        job: &'a JobDescription,
        resume: &'a CandidateProfile,
        retrieval: &'a Retrieval,
        skill_gap: &'a SkillGap,
        max_bullet_chars: usize,
    ) -> Self {
        Self {
            job,
            resume,
            retrieval,
            skill_gap,
            max_bullet_chars,
        }
    }
}
