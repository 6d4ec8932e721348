use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single tailored resume bullet produced by the generation LLM call.
///
/// `source_experience_id` names the experience or project the claim is drawn from.
/// The generator infers it when the model omits it; baseline bullets carry none.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedBullet {
    #[serde(default)]
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub source_experience_id: Option<String>,
    #[serde(default)]
    pub skills_covered: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedCoverLetter {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub job_id: String,
    #[serde(default)]
    pub job_title: Option<String>,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default = "default_tone")]
    pub tone: String,
    pub text: String,
}

fn default_tone() -> String {
    "professional".to_string()
}

impl GeneratedCoverLetter {
    pub fn word_count(&self) -> usize {
        self.text.split_whitespace().count()
    }

    /// Paragraphs are separated by blank lines.
    pub fn paragraph_count(&self) -> usize {
        self.text
            .split("\n\n")
            .filter(|p| !p.trim().is_empty())
            .count()
    }
}

/// How a package was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationMode {
    /// Retrieval + validation + retry.
    Agent,
    /// One-shot generation without retrieval, kept as an evaluation arm.
    Baseline,
}

/// Final output of one job × resume run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TailoredPackage {
    pub id: String,
    pub job_id: String,
    pub candidate_id: String,
    pub mode: GenerationMode,
    pub model: String,
    pub bullets: Vec<GeneratedBullet>,
    pub cover_letter: Option<GeneratedCoverLetter>,
    pub generated_at: DateTime<Utc>,
}

impl TailoredPackage {
    pub fn new(
        job_id: &str,
        candidate_id: &str,
        mode: GenerationMode,
        model: &str,
        bullets: Vec<GeneratedBullet>,
        cover_letter: Option<GeneratedCoverLetter>,
    ) -> Self {
        Self {
            id: format!("pkg-{job_id}"),
            job_id: job_id.to_string(),
            candidate_id: candidate_id.to_string(),
            mode,
            model: model.to_string(),
            bullets,
            cover_letter,
            generated_at: Utc::now(),
        }
    }
}
