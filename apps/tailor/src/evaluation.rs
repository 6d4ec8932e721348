//! Evaluation: quality metrics for a package and the baseline-vs-agent comparison.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::agent::executor::{AgentExecutor, RunReport, RunStatus};
use crate::agent::validator::{banned_phrase_count, skill_coverage, unlisted_skills, ValidatorConfig};
use crate::embeddings::{cosine_similarity, EmbeddingError, Encoder};
use crate::models::{CandidateProfile, GeneratedBullet, JobDescription, TailoredPackage};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PackageMetrics {
    pub bullet_count: usize,
    pub avg_bullet_chars: f64,
    /// Required skills named in bullet text (0.0 – 1.0).
    pub skill_coverage: f64,
    /// Share of bullets inside the configured length bounds.
    pub length_compliance: f64,
    pub banned_phrase_count: usize,
    pub hallucinated_skill_count: usize,
    /// Claimed skills absent from the resume, over all claimed skills.
    pub hallucination_ratio: f64,
    /// Share of bullets citing a real experience or project.
    pub attribution_rate: f64,
    /// Mean cosine between each bullet and the job search text.
    pub alignment_score: Option<f64>,
    pub cover_letter_words: usize,
}

impl PackageMetrics {
    pub fn compute(
        package: &TailoredPackage,
        job: &JobDescription,
        resume: &CandidateProfile,
        limits: &ValidatorConfig,
    ) -> Self {
        let bullets = &package.bullets;
        let cover_letter_words = package
            .cover_letter
            .as_ref()
            .map(|l| l.word_count())
            .unwrap_or(0);

        if bullets.is_empty() {
            return Self {
                cover_letter_words,
                ..Self::default()
            };
        }

        let n = bullets.len() as f64;
        let lengths: Vec<usize> = bullets.iter().map(|b| b.text.chars().count()).collect();
        let in_bounds = lengths
            .iter()
            .filter(|&&l| l >= limits.min_bullet_chars && l <= limits.max_bullet_chars)
            .count();

        let claimed: usize = bullets.iter().map(|b| b.skills_covered.len()).sum();
        let hallucinated: usize = bullets.iter().map(|b| unlisted_skills(b, resume).len()).sum();
        let attributed = bullets
            .iter()
            .filter(|b| {
                b.source_experience_id
                    .as_deref()
                    .is_some_and(|id| resume.has_source(id))
            })
            .count();

        Self {
            bullet_count: bullets.len(),
            avg_bullet_chars: lengths.iter().sum::<usize>() as f64 / n,
            skill_coverage: skill_coverage(bullets, &job.required_skills),
            length_compliance: in_bounds as f64 / n,
            banned_phrase_count: bullets.iter().map(|b| banned_phrase_count(&b.text)).sum(),
            hallucinated_skill_count: hallucinated,
            hallucination_ratio: if claimed == 0 {
                0.0
            } else {
                hallucinated as f64 / claimed as f64
            },
            attribution_rate: attributed as f64 / n,
            alignment_score: None,
            cover_letter_words,
        }
    }
}

/// Mean cosine similarity between each bullet and the job's search text.
pub async fn alignment_score(
    bullets: &[GeneratedBullet],
    job: &JobDescription,
    encoder: &dyn Encoder,
) -> Result<f64, EmbeddingError> {
    if bullets.is_empty() {
        return Ok(0.0);
    }
    let job_vector = encoder.encode(&job.search_text()).await?;
    let texts: Vec<String> = bullets.iter().map(|b| b.text.clone()).collect();
    let vectors = encoder.encode_batch(&texts).await?;
    let total: f64 = vectors
        .iter()
        .map(|v| cosine_similarity(&job_vector, v) as f64)
        .sum();
    Ok(total / vectors.len() as f64)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArmResult {
    pub name: String,
    pub status: RunStatus,
    pub metrics: Option<PackageMetrics>,
    pub report: RunReport,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comparison {
    pub job_id: String,
    pub candidate_id: String,
    pub baseline: ArmResult,
    pub agent: ArmResult,
}

/// Runs the baseline and agent arms on the same pair and scores both.
pub async fn compare(
    executor: &AgentExecutor,
    encoder: &dyn Encoder,
    job: &JobDescription,
    resume: &CandidateProfile,
) -> Comparison {
    info!("Comparing baseline and agent for {}", job.job_id);
    let baseline = executor.run_baseline(job, resume).await;
    let agent = executor.run(job, resume).await;

    Comparison {
        job_id: job.job_id.clone(),
        candidate_id: resume.candidate_id.clone(),
        baseline: score_arm("baseline", baseline, executor, encoder, job, resume).await,
        agent: score_arm("agent", agent, executor, encoder, job, resume).await,
    }
}

async fn score_arm(
    name: &str,
    report: RunReport,
    executor: &AgentExecutor,
    encoder: &dyn Encoder,
    job: &JobDescription,
    resume: &CandidateProfile,
) -> ArmResult {
    let mut metrics = None;
    if let Some(package) = &report.package {
        let mut m = PackageMetrics::compute(package, job, resume, &executor.validator().config);
        m.alignment_score = alignment_score(&package.bullets, job, encoder).await.ok();
        metrics = Some(m);
    }
    ArmResult {
        name: name.to_string(),
        status: report.status,
        metrics,
        report,
    }
}

/// Fixed-width side-by-side table for the terminal.
pub fn format_comparison(comparison: &Comparison) -> String {
    let mut lines = vec![
        format!("Comparison for {} ({})", comparison.job_id, comparison.candidate_id),
        format!("{:<26} {:>12} {:>12}", "METRIC", "BASELINE", "AGENT"),
        "-".repeat(52),
    ];

    let a = comparison.baseline.metrics.clone().unwrap_or_default();
    let b = comparison.agent.metrics.clone().unwrap_or_default();
    let rows: [(&str, String, String); 9] = [
        ("status", format!("{:?}", comparison.baseline.status), format!("{:?}", comparison.agent.status)),
        ("bullets", a.bullet_count.to_string(), b.bullet_count.to_string()),
        ("avg bullet chars", format!("{:.1}", a.avg_bullet_chars), format!("{:.1}", b.avg_bullet_chars)),
        ("skill coverage", format!("{:.2}", a.skill_coverage), format!("{:.2}", b.skill_coverage)),
        ("length compliance", format!("{:.2}", a.length_compliance), format!("{:.2}", b.length_compliance)),
        ("banned phrases", a.banned_phrase_count.to_string(), b.banned_phrase_count.to_string()),
        ("hallucination ratio", format!("{:.2}", a.hallucination_ratio), format!("{:.2}", b.hallucination_ratio)),
        ("attribution rate", format!("{:.2}", a.attribution_rate), format!("{:.2}", b.attribution_rate)),
        (
            "alignment",
            a.alignment_score.map_or("n/a".into(), |s| format!("{s:.2}")),
            b.alignment_score.map_or("n/a".into(), |s| format!("{s:.2}")),
        ),
    ];
    lines.extend(
        rows.iter()
            .map(|(name, x, y)| format!("{name:<26} {x:>12} {y:>12}")),
    );
    lines.push(format!(
        "{:<26} {:>12} {:>12}",
        "cover letter words", a.cover_letter_words, b.cover_letter_words
    ));
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::agent::validator::Validator;
    use crate::embeddings::{HashingEncoder, RetrievalConfig};
    use crate::models::GenerationMode;
    use crate::test_support::{
        sample_job, sample_resume, valid_bullets_reply, valid_cover_letter_reply, ScriptedGenerator,
    };
    use serde_json::json;

    fn bullet(text: &str, source: Option<&str>, skills: &[&str]) -> GeneratedBullet {
        GeneratedBullet {
            id: "b".into(),
            text: text.into(),
            source_experience_id: source.map(str::to_string),
            skills_covered: skills.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn test_metrics_for_mixed_bullets() {
        let job = sample_job();
        let resume = sample_resume();
        let package = TailoredPackage::new(
            &job.job_id,
            &resume.candidate_id,
            GenerationMode::Baseline,
            "m",
            vec![
                bullet("Shipped Python services to Kubernetes clusters at scale", Some("exp-001"), &["Python", "Erlang"]),
                bullet("We worked on things", None, &["Kafka"]),
            ],
            None,
        );

        let m = PackageMetrics::compute(&package, &job, &resume, &ValidatorConfig::default());
        assert_eq!(m.bullet_count, 2);
        assert!((m.skill_coverage - 2.0 / 3.0).abs() < 1e-9);
        assert!((m.length_compliance - 0.5).abs() < 1e-9);
        assert_eq!(m.banned_phrase_count, 2);
        assert_eq!(m.hallucinated_skill_count, 1);
        assert!((m.hallucination_ratio - 1.0 / 3.0).abs() < 1e-9);
        assert!((m.attribution_rate - 0.5).abs() < 1e-9);
        assert_eq!(m.cover_letter_words, 0);
    }

    #[test]
    fn test_metrics_for_empty_package() {
        let job = sample_job();
        let resume = sample_resume();
        let package = TailoredPackage::new("j", "c", GenerationMode::Agent, "m", vec![], None);
        let m = PackageMetrics::compute(&package, &job, &resume, &ValidatorConfig::default());
        assert_eq!(m, PackageMetrics::default());
    }

    #[tokio::test]
    async fn test_alignment_prefers_relevant_bullets() {
        let job = sample_job();
        let encoder = HashingEncoder::new(256);
        let relevant = vec![bullet(
            "Deployed machine learning models to production on Kubernetes",
            None,
            &[],
        )];
        let unrelated = vec![bullet("Organized quarterly offsite for finance team", None, &[])];

        let good = alignment_score(&relevant, &job, &encoder).await.unwrap();
        let bad = alignment_score(&unrelated, &job, &encoder).await.unwrap();
        assert!(good > bad);
        assert_eq!(alignment_score(&[], &job, &encoder).await.unwrap(), 0.0);
    }

    #[tokio::test]
    async fn test_compare_runs_both_arms() {
        let llm = Arc::new(ScriptedGenerator::new(vec![
            // baseline: bullets + cover letter
            json!({"bullets": [{"text": "Responsible for Python jobs"}]}).to_string(),
            valid_cover_letter_reply(),
            // agent: bullets + cover letter
            valid_bullets_reply(),
            valid_cover_letter_reply(),
        ]));
        let encoder = Arc::new(HashingEncoder::new(128));
        let executor = AgentExecutor::new(
            llm,
            encoder.clone(),
            Validator::default(),
            RetrievalConfig::default(),
            2,
        );

        let comparison = compare(&executor, encoder.as_ref(), &sample_job(), &sample_resume()).await;
        assert_eq!(comparison.agent.status, RunStatus::Success);
        assert_eq!(comparison.baseline.status, RunStatus::SuccessWithWarnings);

        let agent = comparison.agent.metrics.as_ref().unwrap();
        let baseline = comparison.baseline.metrics.as_ref().unwrap();
        assert_eq!(agent.attribution_rate, 1.0);
        assert_eq!(baseline.attribution_rate, 0.0);
        assert!(agent.alignment_score.is_some());

        let table = format_comparison(&comparison);
        assert!(table.contains("skill coverage"));
        assert!(table.contains("BASELINE"));
    }
}
