//! Agent loop: retrieval → generate → validate → retry with feedback → package.
//!
//! Flow per run:
//!   skill gap → index build → retrieval → bullet stage → cover-letter stage
//!   → package assembly → final package validation (warnings only).
//!
//! Each stage is retried up to `max_attempts` times. Attempt `n` sees the issues
//! from every earlier attempt, not just the last one.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::agent::validator::{format_feedback, IssueKind, ValidationIssue, Validator, ValidatorConfig};
use crate::config::Config;
use crate::embeddings::{retrieve, Encoder, RetrievalConfig, SimilarityIndex};
use crate::errors::TailorError;
use crate::generation::{
    analyze_skill_gap, generate_baseline_bullets, generate_baseline_cover_letter, generate_bullets,
    generate_cover_letter, GenerationContext, SkillGap,
};
use crate::llm_client::{LlmError, TextGenerator};
use crate::models::{
    CandidateProfile, GeneratedBullet, GeneratedCoverLetter, GenerationMode, JobDescription,
    TailoredPackage,
};

// ────────────────────────────────────────────────────────────────────────────
// Report models
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Success,
    SuccessWithWarnings,
    Failed,
}

impl RunStatus {
    pub fn is_success(self) -> bool {
        !matches!(self, RunStatus::Failed)
    }
}

/// One generate + validate pass inside a stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttemptRecord {
    pub stage: String,
    pub attempt: u32,
    pub passed: bool,
    pub issues: Vec<ValidationIssue>,
    /// LLM transport or parse failure, when the attempt produced nothing.
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub job_id: String,
    pub mode: GenerationMode,
    pub status: RunStatus,
    pub package: Option<TailoredPackage>,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub attempts: Vec<AttemptRecord>,
    pub skill_gap: Option<SkillGap>,
    pub elapsed_ms: u64,
}

impl RunReport {
    fn new(job_id: &str, mode: GenerationMode) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            job_id: job_id.to_string(),
            mode,
            status: RunStatus::Failed,
            package: None,
            errors: Vec::new(),
            warnings: Vec::new(),
            attempts: Vec::new(),
            skill_gap: None,
            elapsed_ms: 0,
        }
    }

    fn fail(mut self, message: impl Into<String>, started: Instant) -> Self {
        let message = message.into();
        error!("Run {} for {} failed: {}", self.run_id, self.job_id, message);
        self.status = RunStatus::Failed;
        self.errors.push(message);
        self.elapsed_ms = started.elapsed().as_millis() as u64;
        self
    }

    fn finish(mut self, package: TailoredPackage, warnings: Vec<String>, started: Instant) -> Self {
        self.status = if warnings.is_empty() {
            RunStatus::Success
        } else {
            RunStatus::SuccessWithWarnings
        };
        self.package = Some(package);
        self.warnings = warnings;
        self.elapsed_ms = started.elapsed().as_millis() as u64;
        info!(
            "Run {} for {} finished: {:?} in {}ms",
            self.run_id, self.job_id, self.status, self.elapsed_ms
        );
        self
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Stage loop
// ────────────────────────────────────────────────────────────────────────────

/// A retryable generation step.
#[async_trait]
pub trait Stage: Send + Sync {
    type Output: Send;

    fn name(&self) -> &'static str;

    async fn attempt(&self, feedback: Option<&str>) -> Result<Self::Output, LlmError>;

    fn validate(&self, output: &Self::Output) -> Vec<ValidationIssue>;
}

#[derive(Debug)]
pub struct StageOutcome<T> {
    /// Present only when an attempt passed validation.
    pub output: Option<T>,
    pub attempts: Vec<AttemptRecord>,
    /// Set when a non-retryable LLM error stopped the loop early.
    pub aborted: Option<String>,
}

impl<T> StageOutcome<T> {
    /// Issue messages from the final attempt, or the abort reason.
    pub fn failure_messages(&self) -> Vec<String> {
        if let Some(reason) = &self.aborted {
            return vec![reason.clone()];
        }
        self.attempts
            .last()
            .map(|a| match &a.error {
                Some(e) => vec![e.clone()],
                None => a.issues.iter().map(|i| i.message.clone()).collect(),
            })
            .unwrap_or_default()
    }
}

pub async fn run_stage<S: Stage>(stage: &S, max_attempts: u32) -> StageOutcome<S::Output> {
    let max_attempts = max_attempts.max(1);
    let mut history: Vec<Vec<ValidationIssue>> = Vec::new();
    let mut attempts = Vec::new();

    for n in 1..=max_attempts {
        let feedback = format_feedback(&history);
        let feedback = (!feedback.is_empty()).then_some(feedback);
        info!("{} attempt {}/{}", stage.name(), n, max_attempts);

        match stage.attempt(feedback.as_deref()).await {
            Ok(output) => {
                let issues = stage.validate(&output);
                let passed = issues.is_empty();
                attempts.push(AttemptRecord {
                    stage: stage.name().to_string(),
                    attempt: n,
                    passed,
                    issues: issues.clone(),
                    error: None,
                });

                if passed {
                    info!("{} passed validation on attempt {}", stage.name(), n);
                    return StageOutcome {
                        output: Some(output),
                        attempts,
                        aborted: None,
                    };
                }

                for issue in &issues {
                    warn!("{} attempt {}: {}", stage.name(), n, issue);
                }
                history.push(issues);
            }
            Err(e) if e.is_fatal() => {
                error!("{} aborted on non-retryable LLM error: {}", stage.name(), e);
                attempts.push(AttemptRecord {
                    stage: stage.name().to_string(),
                    attempt: n,
                    passed: false,
                    issues: vec![],
                    error: Some(e.to_string()),
                });
                return StageOutcome {
                    output: None,
                    attempts,
                    aborted: Some(format!("{} aborted: {e}", stage.name())),
                };
            }
            Err(e) => {
                warn!("{} attempt {} failed: {}", stage.name(), n, e);
                let message = format!("The previous response could not be used: {e}");
                attempts.push(AttemptRecord {
                    stage: stage.name().to_string(),
                    attempt: n,
                    passed: false,
                    issues: vec![],
                    error: Some(e.to_string()),
                });
                history.push(vec![ValidationIssue::new(
                    IssueKind::GenerationFailed,
                    stage.name(),
                    message,
                )]);
            }
        }
    }

    warn!("{} failed after {} attempts", stage.name(), max_attempts);
    StageOutcome {
        output: None,
        attempts,
        aborted: None,
    }
}

struct BulletStage<'a> {
    ctx: GenerationContext<'a>,
    llm: &'a dyn TextGenerator,
    validator: &'a Validator,
}

#[async_trait]
impl Stage for BulletStage<'_> {
    type Output = Vec<GeneratedBullet>;

    fn name(&self) -> &'static str {
        "bullets"
    }

    async fn attempt(&self, feedback: Option<&str>) -> Result<Self::Output, LlmError> {
        generate_bullets(&self.ctx, self.llm, feedback).await
    }

    fn validate(&self, output: &Self::Output) -> Vec<ValidationIssue> {
        self.validator
            .validate_bullets(output, self.ctx.job, self.ctx.resume)
    }
}

struct CoverLetterStage<'a> {
    job: &'a JobDescription,
    resume: &'a CandidateProfile,
    bullets: &'a [GeneratedBullet],
    llm: &'a dyn TextGenerator,
    validator: &'a Validator,
}

#[async_trait]
impl Stage for CoverLetterStage<'_> {
    type Output = GeneratedCoverLetter;

    fn name(&self) -> &'static str {
        "cover_letter"
    }

    async fn attempt(&self, feedback: Option<&str>) -> Result<Self::Output, LlmError> {
        generate_cover_letter(self.job, self.resume, self.bullets, self.llm, feedback).await
    }

    fn validate(&self, output: &Self::Output) -> Vec<ValidationIssue> {
        self.validator.validate_cover_letter(output, self.job)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Executor
// ────────────────────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct AgentExecutor {
    llm: Arc<dyn TextGenerator>,
    encoder: Arc<dyn Encoder>,
    validator: Validator,
    retrieval: RetrievalConfig,
    max_attempts: u32,
}

impl AgentExecutor {
    pub fn new(
        llm: Arc<dyn TextGenerator>,
        encoder: Arc<dyn Encoder>,
        validator: Validator,
        retrieval: RetrievalConfig,
        max_attempts: u32,
    ) -> Self {
        Self {
            llm,
            encoder,
            validator,
            retrieval,
            max_attempts: max_attempts.max(1),
        }
    }

    pub fn from_config(
        config: &Config,
        llm: Arc<dyn TextGenerator>,
        encoder: Arc<dyn Encoder>,
    ) -> Self {
        Self::new(
            llm,
            encoder,
            Validator::new(ValidatorConfig::from_config(config)),
            RetrievalConfig {
                top_k: config.retrieval_top_k,
                skill_top_k: config.skill_top_k,
            },
            config.max_attempts,
        )
    }

    pub fn model(&self) -> &str {
        self.llm.model()
    }

    pub fn validator(&self) -> &Validator {
        &self.validator
    }

    pub async fn run(&self, job: &JobDescription, resume: &CandidateProfile) -> RunReport {
        let started = Instant::now();
        let mut report = RunReport::new(&job.job_id, GenerationMode::Agent);
        info!(
            "Run {}: tailoring {} for {} ({})",
            report.run_id, job.job_id, resume.candidate_id, self.llm.model()
        );

        // Step 1: Skill gap
        let skill_gap = analyze_skill_gap(job, resume);
        info!(
            "Skill match {}/100 for {} (missing: {})",
            skill_gap.match_score,
            job.job_id,
            skill_gap.missing.len()
        );
        report.skill_gap = Some(skill_gap.clone());

        // Step 2: Index + retrieval
        let retrieval = match self.retrieve(job, resume).await {
            Ok(r) => r,
            Err(e) => return report.fail(e.to_string(), started),
        };

        // Step 3: Bullets
        let ctx = GenerationContext::new(
            job,
            resume,
            &retrieval,
            &skill_gap,
            self.validator.config.max_bullet_chars,
        );
        let bullet_stage = BulletStage {
            ctx,
            llm: self.llm.as_ref(),
            validator: &self.validator,
        };
        let outcome = run_stage(&bullet_stage, self.max_attempts).await;
        let failure = outcome.failure_messages();
        report.attempts.extend(outcome.attempts);
        let Some(bullets) = outcome.output else {
            report.errors.extend(failure);
            return report.fail("bullet generation did not pass validation", started);
        };

        // Step 4: Cover letter
        let letter_stage = CoverLetterStage {
            job,
            resume,
            bullets: &bullets,
            llm: self.llm.as_ref(),
            validator: &self.validator,
        };
        let outcome = run_stage(&letter_stage, self.max_attempts).await;
        let failure = outcome.failure_messages();
        report.attempts.extend(outcome.attempts);
        let Some(letter) = outcome.output else {
            report.errors.extend(failure);
            return report.fail("cover letter generation did not pass validation", started);
        };

        // Step 5: Package + final validation
        let package = TailoredPackage::new(
            &job.job_id,
            &resume.candidate_id,
            GenerationMode::Agent,
            self.llm.model(),
            bullets,
            Some(letter),
        );
        let warnings = self
            .validator
            .validate_package(&package, job, resume)
            .into_iter()
            .map(|i| i.message)
            .collect();

        report.finish(package, warnings, started)
    }

    /// One-shot package without retrieval or retries. Validation results are
    /// reported as warnings only.
    pub async fn run_baseline(&self, job: &JobDescription, resume: &CandidateProfile) -> RunReport {
        let started = Instant::now();
        let mut report = RunReport::new(&job.job_id, GenerationMode::Baseline);
        report.skill_gap = Some(analyze_skill_gap(job, resume));
        info!("Run {}: baseline for {}", report.run_id, job.job_id);

        let bullets = match generate_baseline_bullets(job, resume, self.llm.as_ref()).await {
            Ok(b) => b,
            Err(e) => return report.fail(format!("baseline bullets failed: {e}"), started),
        };

        // A missing letter is still a usable baseline; final validation reports it.
        let letter = match generate_baseline_cover_letter(job, resume, self.llm.as_ref()).await {
            Ok(l) => Some(l),
            Err(e) => {
                warn!("Baseline cover letter failed for {}: {}", job.job_id, e);
                None
            }
        };

        let package = TailoredPackage::new(
            &job.job_id,
            &resume.candidate_id,
            GenerationMode::Baseline,
            self.llm.model(),
            bullets,
            letter,
        );
        let warnings = self
            .validator
            .validate_package(&package, job, resume)
            .into_iter()
            .map(|i| i.message)
            .collect();

        report.finish(package, warnings, started)
    }

    async fn retrieve(
        &self,
        job: &JobDescription,
        resume: &CandidateProfile,
    ) -> Result<crate::embeddings::Retrieval, TailorError> {
        let index =
            SimilarityIndex::build(self.encoder.as_ref(), &resume.experiences, &resume.projects)
                .await?;
        info!(
            "Indexed {} resume bullets with {} encoder",
            index.len(),
            self.encoder.name()
        );
        retrieve(job, self.encoder.as_ref(), &index, self.retrieval).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::HashingEncoder;
    use crate::test_support::{
        sample_job, sample_resume, valid_bullets_reply, valid_cover_letter_reply, ScriptedGenerator,
    };
    use serde_json::json;

    fn executor(llm: Arc<ScriptedGenerator>, max_attempts: u32) -> AgentExecutor {
        AgentExecutor::new(
            llm,
            Arc::new(HashingEncoder::new(128)),
            Validator::default(),
            RetrievalConfig::default(),
            max_attempts,
        )
    }

    fn too_short_bullets() -> String {
        json!({"bullets": [{"id": "b1", "text": "Too short", "source_experience_id": "exp-001"}]})
            .to_string()
    }

    fn pronoun_bullets() -> String {
        json!({"bullets": [{
            "id": "b1",
            "text": "I deployed Python and Kafka pipelines on Kubernetes for ranking models",
            "source_experience_id": "exp-001"
        }]})
        .to_string()
    }

    #[tokio::test]
    async fn test_first_attempt_success() {
        let llm = Arc::new(ScriptedGenerator::new(vec![
            valid_bullets_reply(),
            valid_cover_letter_reply(),
        ]));
        let report = executor(llm.clone(), 3)
            .run(&sample_job(), &sample_resume())
            .await;

        assert_eq!(report.status, RunStatus::Success, "{:?}", report.errors);
        let package = report.package.unwrap();
        assert_eq!(package.bullets.len(), 3);
        assert_eq!(package.mode, GenerationMode::Agent);
        assert_eq!(package.model, "scripted-model");
        assert_eq!(report.attempts.len(), 2);
        assert!(report.attempts.iter().all(|a| a.passed));
        assert_eq!(llm.calls().len(), 2);
    }

    #[tokio::test]
    async fn test_retry_accumulates_feedback_from_all_attempts() {
        let llm = Arc::new(ScriptedGenerator::new(vec![
            too_short_bullets(),
            pronoun_bullets(),
            valid_bullets_reply(),
            valid_cover_letter_reply(),
        ]));
        let report = executor(llm.clone(), 3)
            .run(&sample_job(), &sample_resume())
            .await;

        assert_eq!(report.status, RunStatus::Success, "{:?}", report.errors);
        let bullet_attempts: Vec<&AttemptRecord> =
            report.attempts.iter().filter(|a| a.stage == "bullets").collect();
        assert_eq!(bullet_attempts.len(), 3);
        assert!(bullet_attempts[2].passed);

        let calls = llm.calls();
        assert!(!calls[0].user.contains("PREVIOUS ATTEMPTS"));
        assert!(calls[1].user.contains("too short"));
        // Third prompt still carries the first attempt's issue.
        assert!(calls[2].user.contains("too short"));
        assert!(calls[2].user.contains("banned phrasing: 'i'"));
        let short_at = calls[2].user.find("too short").unwrap();
        let pronoun_at = calls[2].user.find("banned phrasing").unwrap();
        assert!(short_at < pronoun_at);
    }

    #[tokio::test]
    async fn test_exhausted_attempts_fail_without_package() {
        let llm = Arc::new(ScriptedGenerator::new(vec![
            too_short_bullets(),
            too_short_bullets(),
        ]));
        let report = executor(llm.clone(), 2)
            .run(&sample_job(), &sample_resume())
            .await;

        assert_eq!(report.status, RunStatus::Failed);
        assert!(report.package.is_none());
        assert_eq!(report.attempts.len(), 2);
        assert!(report.errors.iter().any(|e| e.contains("too short")));
        assert_eq!(llm.calls().len(), 2);
    }

    #[tokio::test]
    async fn test_transient_llm_error_counts_as_attempt() {
        let llm = Arc::new(ScriptedGenerator::with_results(vec![
            Err(LlmError::EmptyContent),
            Ok(valid_bullets_reply()),
            Ok(valid_cover_letter_reply()),
        ]));
        let report = executor(llm.clone(), 3)
            .run(&sample_job(), &sample_resume())
            .await;

        assert_eq!(report.status, RunStatus::Success);
        assert!(report.attempts[0].error.is_some());
        assert!(llm.calls()[1].user.contains("could not be used"));
    }

    #[tokio::test]
    async fn test_fatal_llm_error_aborts_immediately() {
        let llm = Arc::new(ScriptedGenerator::with_results(vec![
            Err(LlmError::Api {
                status: 401,
                message: "invalid x-api-key".into(),
            }),
            Ok(valid_bullets_reply()),
        ]));
        let report = executor(llm.clone(), 3)
            .run(&sample_job(), &sample_resume())
            .await;

        assert_eq!(report.status, RunStatus::Failed);
        assert_eq!(llm.calls().len(), 1);
        assert!(report.errors.iter().any(|e| e.contains("invalid x-api-key")));
    }

    #[tokio::test]
    async fn test_zero_max_attempts_still_runs_once() {
        let llm = Arc::new(ScriptedGenerator::new(vec![
            valid_bullets_reply(),
            valid_cover_letter_reply(),
        ]));
        let report = executor(llm, 0).run(&sample_job(), &sample_resume()).await;
        assert_eq!(report.status, RunStatus::Success);
    }

    #[tokio::test]
    async fn test_cover_letter_stage_retries() {
        let short_letter = json!({"job_id": "acme-ml-engineer", "text": "Too short."}).to_string();
        let llm = Arc::new(ScriptedGenerator::new(vec![
            valid_bullets_reply(),
            short_letter,
            valid_cover_letter_reply(),
        ]));
        let report = executor(llm.clone(), 3)
            .run(&sample_job(), &sample_resume())
            .await;

        assert_eq!(report.status, RunStatus::Success);
        let letter_attempts = report
            .attempts
            .iter()
            .filter(|a| a.stage == "cover_letter")
            .count();
        assert_eq!(letter_attempts, 2);
        assert!(llm.calls()[2].user.contains("Cover letter too short"));
    }

    #[tokio::test]
    async fn test_resume_without_bullets_fails_before_llm() {
        let llm = Arc::new(ScriptedGenerator::new(vec![]));
        let mut resume = sample_resume();
        for exp in &mut resume.experiences {
            exp.bullets.clear();
        }
        resume.projects.clear();

        let report = executor(llm.clone(), 3).run(&sample_job(), &resume).await;
        assert_eq!(report.status, RunStatus::Failed);
        assert!(llm.calls().is_empty());
    }

    #[tokio::test]
    async fn test_baseline_reports_issues_as_warnings() {
        let llm = Arc::new(ScriptedGenerator::new(vec![
            json!({"bullets": [{"text": "Responsible for various Python things"}]}).to_string(),
            valid_cover_letter_reply(),
        ]));
        let report = executor(llm, 3)
            .run_baseline(&sample_job(), &sample_resume())
            .await;

        assert_eq!(report.status, RunStatus::SuccessWithWarnings);
        assert!(report.errors.is_empty());
        assert!(report.warnings.iter().any(|w| w.contains("banned phrasing")));
        let package = report.package.unwrap();
        assert_eq!(package.mode, GenerationMode::Baseline);
        assert!(package.bullets[0].source_experience_id.is_none());
    }

    #[tokio::test]
    async fn test_report_serializes_status_snake_case() {
        let report = RunReport::new("job", GenerationMode::Agent);
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["status"], "failed");
        assert_eq!(json["mode"], "agent");
    }
}
