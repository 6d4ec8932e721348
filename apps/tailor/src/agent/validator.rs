//! Validator: structural and grounding checks on generated bullets and cover letters.
//!
//! Every check returns `ValidationIssue`s instead of failing fast, so the agent
//! loop can feed the complete list back into the next prompt.

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::llm_client::prompts::STYLE_RULES;
use crate::models::{
    CandidateProfile, GeneratedBullet, GeneratedCoverLetter, JobDescription, TailoredPackage,
};

// Whole-word, case-insensitive first-person pronouns.
static PRONOUN_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(i|me|my|mine|we|us|our|ours)\b").expect("Invalid pronoun regex pattern")
});

const CLICHE_PHRASES: &[&str] = &[
    "responsible for",
    "worked on",
    "helped with",
    "various",
    "duties included",
    "team player",
    "go-getter",
    "hard worker",
    "think outside the box",
    "results-driven",
];

const BANNED_OPENERS: &[&str] = &[
    "i am writing to apply",
    "i am writing to express my interest",
    "please find my resume attached",
    "please find attached my resume",
    "to whom it may concern",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    NoBullets,
    TooShort,
    TooLong,
    BannedPhrase,
    HallucinatedSkill,
    LowSkillCoverage,
    MissingCoverLetter,
    CoverLetterLength,
    BannedOpener,
    JobMismatch,
    /// The attempt produced no output at all (LLM or parse failure).
    GenerationFailed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub kind: IssueKind,
    /// Bullet id, "cover_letter", "package" or the stage name.
    pub subject: String,
    pub message: String,
}

impl ValidationIssue {
    pub fn new(kind: IssueKind, subject: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            subject: subject.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValidatorConfig {
    pub min_bullet_chars: usize,
    pub max_bullet_chars: usize,
    pub min_skill_coverage: f64,
    pub min_cover_letter_chars: usize,
    pub max_cover_letter_chars: usize,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            min_bullet_chars: 30,
            max_bullet_chars: 150,
            min_skill_coverage: 0.5,
            min_cover_letter_chars: 200,
            max_cover_letter_chars: 4000,
        }
    }
}

impl ValidatorConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_bullet_chars: config.max_bullet_chars,
            min_skill_coverage: config.min_skill_coverage,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Validator {
    pub config: ValidatorConfig,
}

impl Validator {
    pub fn new(config: ValidatorConfig) -> Self {
        Self { config }
    }

    // ── Bullets ──────────────────────────────────────────────────────────────

    pub fn validate_bullet(
        &self,
        bullet: &GeneratedBullet,
        resume: &CandidateProfile,
    ) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();
        let len = bullet.text.chars().count();

        if len < self.config.min_bullet_chars {
            issues.push(ValidationIssue::new(
                IssueKind::TooShort,
                &bullet.id,
                format!(
                    "Bullet '{}' too short: {} chars (min {})",
                    bullet.id, len, self.config.min_bullet_chars
                ),
            ));
        } else if len > self.config.max_bullet_chars {
            issues.push(ValidationIssue::new(
                IssueKind::TooLong,
                &bullet.id,
                format!(
                    "Bullet '{}' too long: {} chars (max {})",
                    bullet.id, len, self.config.max_bullet_chars
                ),
            ));
        }

        if let Some(phrase) = banned_phrase(&bullet.text) {
            issues.push(ValidationIssue::new(
                IssueKind::BannedPhrase,
                &bullet.id,
                format!("Bullet '{}' uses banned phrasing: '{}'", bullet.id, phrase),
            ));
        }

        if let Some(issue) = hallucinated_skills(bullet, resume) {
            issues.push(issue);
        }

        issues
    }

    /// Per-bullet checks plus the collective skill-coverage constraint.
    pub fn validate_bullets(
        &self,
        bullets: &[GeneratedBullet],
        job: &JobDescription,
        resume: &CandidateProfile,
    ) -> Vec<ValidationIssue> {
        if bullets.is_empty() {
            return vec![ValidationIssue::new(
                IssueKind::NoBullets,
                "bullets",
                "No bullets generated",
            )];
        }

        let mut issues: Vec<ValidationIssue> = bullets
            .iter()
            .flat_map(|b| self.validate_bullet(b, resume))
            .collect();

        let coverage = skill_coverage(bullets, &job.required_skills);
        if coverage < self.config.min_skill_coverage {
            let missing = missing_skills(bullets, &job.required_skills);
            issues.push(ValidationIssue::new(
                IssueKind::LowSkillCoverage,
                "bullets",
                format!(
                    "Bullets cover {:.0}% of required skills (min {:.0}%). Missing: {}",
                    coverage * 100.0,
                    self.config.min_skill_coverage * 100.0,
                    missing.join(", ")
                ),
            ));
        }

        issues
    }

    // ── Cover letter ─────────────────────────────────────────────────────────

    pub fn validate_cover_letter(
        &self,
        letter: &GeneratedCoverLetter,
        job: &JobDescription,
    ) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();
        let text = letter.text.trim();
        let len = text.chars().count();

        if len < self.config.min_cover_letter_chars {
            issues.push(ValidationIssue::new(
                IssueKind::CoverLetterLength,
                "cover_letter",
                format!(
                    "Cover letter too short: {} chars (min {})",
                    len, self.config.min_cover_letter_chars
                ),
            ));
        } else if len > self.config.max_cover_letter_chars {
            issues.push(ValidationIssue::new(
                IssueKind::CoverLetterLength,
                "cover_letter",
                format!(
                    "Cover letter too long: {} chars (max {})",
                    len, self.config.max_cover_letter_chars
                ),
            ));
        }

        let lower = text.to_lowercase();
        if let Some(opener) = BANNED_OPENERS.iter().find(|o| lower.contains(*o)) {
            issues.push(ValidationIssue::new(
                IssueKind::BannedOpener,
                "cover_letter",
                format!("Cover letter uses a stock opener: '{opener}'"),
            ));
        }

        if letter.job_id != job.job_id {
            issues.push(ValidationIssue::new(
                IssueKind::JobMismatch,
                "cover_letter",
                format!(
                    "Cover letter job_id '{}' does not match job '{}'",
                    letter.job_id, job.job_id
                ),
            ));
        }

        issues
    }

    // ── Package ──────────────────────────────────────────────────────────────

    pub fn validate_package(
        &self,
        package: &TailoredPackage,
        job: &JobDescription,
        resume: &CandidateProfile,
    ) -> Vec<ValidationIssue> {
        let mut issues = self.validate_bullets(&package.bullets, job, resume);

        match &package.cover_letter {
            Some(letter) => issues.extend(self.validate_cover_letter(letter, job)),
            None => issues.push(ValidationIssue::new(
                IssueKind::MissingCoverLetter,
                "cover_letter",
                "Package has no cover letter",
            )),
        }

        if package.job_id != job.job_id {
            issues.push(ValidationIssue::new(
                IssueKind::JobMismatch,
                "package",
                format!(
                    "Package job_id '{}' does not match job '{}'",
                    package.job_id, job.job_id
                ),
            ));
        }

        issues
    }
}

/// First banned pronoun or cliché found in `text`, lowercased.
pub fn banned_phrase(text: &str) -> Option<String> {
    if let Some(m) = PRONOUN_PATTERN.find(text) {
        return Some(m.as_str().to_lowercase());
    }
    let lower = text.to_lowercase();
    CLICHE_PHRASES
        .iter()
        .find(|p| lower.contains(*p))
        .map(|p| p.to_string())
}

/// Count of banned pronouns and clichés across `text`.
pub fn banned_phrase_count(text: &str) -> usize {
    let lower = text.to_lowercase();
    PRONOUN_PATTERN.find_iter(text).count()
        + CLICHE_PHRASES
            .iter()
            .map(|p| lower.matches(p).count())
            .sum::<usize>()
}

/// Skills in `skills_covered` that the resume does not list.
pub fn unlisted_skills<'a>(bullet: &'a GeneratedBullet, resume: &CandidateProfile) -> Vec<&'a str> {
    bullet
        .skills_covered
        .iter()
        .filter(|s| !resume.has_skill(s))
        .map(String::as_str)
        .collect()
}

fn hallucinated_skills(
    bullet: &GeneratedBullet,
    resume: &CandidateProfile,
) -> Option<ValidationIssue> {
    if bullet.skills_covered.is_empty() {
        return None;
    }

    if resume.skills.is_empty() {
        return Some(ValidationIssue::new(
            IssueKind::HallucinatedSkill,
            &bullet.id,
            format!(
                "Bullet '{}' claims skills [{}] but the resume lists no skills",
                bullet.id,
                bullet.skills_covered.join(", ")
            ),
        ));
    }

    let unlisted = unlisted_skills(bullet, resume);
    if unlisted.is_empty() {
        return None;
    }
    Some(ValidationIssue::new(
        IssueKind::HallucinatedSkill,
        &bullet.id,
        format!(
            "Bullet '{}' mentions skills not found in resume: [{}]",
            bullet.id,
            unlisted.join(", ")
        ),
    ))
}

/// Fraction of `required` skills that appear (case-insensitive) in at least one
/// bullet's text. 1.0 when nothing is required.
pub fn skill_coverage(bullets: &[GeneratedBullet], required: &[String]) -> f64 {
    let total = required.iter().filter(|s| !s.trim().is_empty()).count();
    if total == 0 {
        return 1.0;
    }
    let covered = total - missing_skills(bullets, required).len();
    covered as f64 / total as f64
}

/// Required skills that no bullet text mentions, in job order.
pub fn missing_skills(bullets: &[GeneratedBullet], required: &[String]) -> Vec<String> {
    let texts: Vec<String> = bullets.iter().map(|b| b.text.to_lowercase()).collect();
    required
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .filter(|s| {
            let needle = s.to_lowercase();
            !texts.iter().any(|t| t.contains(&needle))
        })
        .map(str::to_string)
        .collect()
}

/// Renders the issues from every prior attempt as a numbered list, most recent
/// last and without repeats, followed by the standing rules.
pub fn format_feedback(history: &[Vec<ValidationIssue>]) -> String {
    let mut messages: Vec<&str> = Vec::new();
    for attempt in history {
        for issue in attempt {
            if !messages.contains(&issue.message.as_str()) {
                messages.push(&issue.message);
            }
        }
    }

    if messages.is_empty() {
        return String::new();
    }

    let mut lines = vec!["The previous output had these validation issues:".to_string()];
    lines.extend(
        messages
            .iter()
            .enumerate()
            .map(|(i, m)| format!("{}. {}", i + 1, m)),
    );
    lines.push(String::new());
    lines.push("Regenerate while following these rules:".to_string());
    lines.extend(STYLE_RULES.iter().map(|r| format!("- {r}")));
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{sample_job, sample_resume, valid_bullets_reply, valid_cover_letter_reply};
    use crate::generation::cover_letter::normalize_cover_letter;
    use crate::models::GenerationMode;

    fn bullet(id: &str, text: &str, skills: &[&str]) -> GeneratedBullet {
        GeneratedBullet {
            id: id.to_string(),
            text: text.to_string(),
            source_experience_id: Some("exp-001".to_string()),
            skills_covered: skills.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn valid_bullets() -> Vec<GeneratedBullet> {
        let value: serde_json::Value = serde_json::from_str(&valid_bullets_reply()).unwrap();
        serde_json::from_value(value["bullets"].clone()).unwrap()
    }

    #[test]
    fn test_fixture_bullets_pass() {
        let validator = Validator::default();
        let issues = validator.validate_bullets(&valid_bullets(), &sample_job(), &sample_resume());
        assert!(issues.is_empty(), "{issues:?}");
    }

    #[test]
    fn test_length_bounds() {
        let validator = Validator::default();
        let resume = sample_resume();

        let short = validator.validate_bullet(&bullet("b1", "Built APIs", &[]), &resume);
        assert_eq!(short[0].kind, IssueKind::TooShort);

        let long_text = "Optimized ".repeat(20);
        let long = validator.validate_bullet(&bullet("b2", &long_text, &[]), &resume);
        assert_eq!(long[0].kind, IssueKind::TooLong);
        assert!(long[0].message.contains("max 150"));
    }

    #[test]
    fn test_length_counts_chars_not_bytes() {
        let validator = Validator::default();
        // 30 chars, 60 bytes
        let text = "é".repeat(30);
        let issues = validator.validate_bullet(&bullet("b", &text, &[]), &sample_resume());
        assert!(issues.is_empty(), "{issues:?}");
    }

    #[test]
    fn test_pronouns_are_whole_word_case_insensitive() {
        assert_eq!(banned_phrase("Led migration where I cut costs").as_deref(), Some("i"));
        assert_eq!(banned_phrase("OUR team shipped it").as_deref(), Some("our"));
        // "us" inside "status", "my" inside "dynamo", "i" inside "migration"
        assert!(banned_phrase("Improved status pages backed by DynamoDB").is_none());
    }

    #[test]
    fn test_cliches_are_flagged() {
        assert_eq!(
            banned_phrase("Responsible for maintaining the billing service").as_deref(),
            Some("responsible for")
        );
        assert_eq!(banned_phrase_count("We worked on various things"), 3);
    }

    #[test]
    fn test_hallucinated_skills() {
        let validator = Validator::default();
        let resume = sample_resume();
        let b = bullet(
            "b1",
            "Built low-latency services in Haskell and Python for pricing",
            &["python", "Haskell"],
        );
        let issues = validator.validate_bullet(&b, &resume);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].kind, IssueKind::HallucinatedSkill);
        assert!(issues[0].message.contains("Haskell"));
        assert!(!issues[0].message.contains("python"));
    }

    #[test]
    fn test_any_claimed_skill_suspicious_without_resume_skills() {
        let validator = Validator::default();
        let mut resume = sample_resume();
        resume.skills.clear();
        let b = bullet("b1", "Built streaming pipelines processing 2TB per day", &["Kafka"]);
        let issues = validator.validate_bullet(&b, &resume);
        assert_eq!(issues[0].kind, IssueKind::HallucinatedSkill);
    }

    #[test]
    fn test_skill_coverage_fraction() {
        let bullets = vec![bullet("b1", "Shipped PYTHON services on kubernetes", &[])];
        let required = vec!["Python".to_string(), "Kubernetes".to_string(), "Kafka".to_string(), "Go".to_string()];
        assert!((skill_coverage(&bullets, &required) - 0.5).abs() < 1e-9);
        assert_eq!(missing_skills(&bullets, &required), vec!["Kafka", "Go"]);
        assert_eq!(skill_coverage(&bullets, &[]), 1.0);
    }

    #[test]
    fn test_low_coverage_lists_missing_skills() {
        let validator = Validator::default();
        let bullets = vec![bullet(
            "b1",
            "Cut warehouse query costs by 40% by redesigning Spark partitioning",
            &["Spark"],
        )];
        let issues = validator.validate_bullets(&bullets, &sample_job(), &sample_resume());
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].kind, IssueKind::LowSkillCoverage);
        assert!(issues[0].message.contains("Python, Kubernetes, Kafka"));
    }

    #[test]
    fn test_no_bullets_is_single_issue() {
        let validator = Validator::default();
        let issues = validator.validate_bullets(&[], &sample_job(), &sample_resume());
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].kind, IssueKind::NoBullets);
    }

    #[test]
    fn test_cover_letter_checks() {
        let validator = Validator::default();
        let job = sample_job();

        let good = normalize_cover_letter(&valid_cover_letter_reply(), &job).unwrap();
        assert!(validator.validate_cover_letter(&good, &job).is_empty());

        let mut bad = good.clone();
        bad.text = format!("I am writing to apply for this role. {}", "x".repeat(10));
        bad.job_id = "other".to_string();
        let kinds: Vec<IssueKind> = validator
            .validate_cover_letter(&bad, &job)
            .into_iter()
            .map(|i| i.kind)
            .collect();
        assert_eq!(
            kinds,
            vec![IssueKind::CoverLetterLength, IssueKind::BannedOpener, IssueKind::JobMismatch]
        );
    }

    #[test]
    fn test_package_without_cover_letter() {
        let validator = Validator::default();
        let job = sample_job();
        let package = TailoredPackage::new(
            &job.job_id,
            "jane-doe",
            GenerationMode::Agent,
            "m",
            valid_bullets(),
            None,
        );
        let issues = validator.validate_package(&package, &job, &sample_resume());
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].kind, IssueKind::MissingCoverLetter);
    }

    #[test]
    fn test_format_feedback_accumulates_without_repeats() {
        let first = vec![ValidationIssue::new(IssueKind::TooLong, "b1", "Bullet 'b1' too long")];
        let second = vec![
            ValidationIssue::new(IssueKind::TooLong, "b1", "Bullet 'b1' too long"),
            ValidationIssue::new(IssueKind::BannedPhrase, "b2", "Bullet 'b2' uses banned phrasing"),
        ];
        let feedback = format_feedback(&[first, second]);
        assert!(feedback.contains("1. Bullet 'b1' too long"));
        assert!(feedback.contains("2. Bullet 'b2' uses banned phrasing"));
        assert_eq!(feedback.matches("too long").count(), 1);
        assert!(feedback.contains("- Start every bullet with a strong action verb"));
        assert!(format_feedback(&[]).is_empty());
    }
}
