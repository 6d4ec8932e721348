// Render: writes a finished package to disk as JSON and Markdown.
// Sinks are independent; write_outputs runs every built-in sink into one
// per-job directory under the output root.

pub mod markdown;

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::info;

use crate::agent::{RunReport, ValidatorConfig};
use crate::errors::TailorError;
use crate::evaluation::PackageMetrics;
use crate::models::{CandidateProfile, JobDescription, TailoredPackage};

pub use markdown::MarkdownSink;

/// Something that can persist a package. Returns the files it wrote.
pub trait RenderSink {
    fn name(&self) -> &'static str;

    fn write(
        &self,
        package: &TailoredPackage,
        job: &JobDescription,
        resume: &CandidateProfile,
        dir: &Path,
    ) -> Result<Vec<PathBuf>, TailorError>;
}

/// The whole package as pretty-printed `package.json`.
pub struct JsonSink;

impl RenderSink for JsonSink {
    fn name(&self) -> &'static str {
        "json"
    }

    fn write(
        &self,
        package: &TailoredPackage,
        _job: &JobDescription,
        _resume: &CandidateProfile,
        dir: &Path,
    ) -> Result<Vec<PathBuf>, TailorError> {
        let path = dir.join("package.json");
        write_json(&path, package)?;
        Ok(vec![path])
    }
}

/// `<root>/<Company>_<Title>` with whitespace collapsed to `_` and anything
/// outside `[A-Za-z0-9_-]` dropped.
pub fn output_dir_for(root: &Path, job: &JobDescription) -> PathBuf {
    root.join(slug(&format!("{} {}", job.company_or_default(), job.title)))
}

fn slug(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        let c = if c.is_whitespace() { '_' } else { c };
        if !(c.is_ascii_alphanumeric() || c == '-' || c == '_') {
            continue;
        }
        if c == '_' && out.ends_with('_') {
            continue;
        }
        out.push(c);
    }
    let trimmed = out.trim_matches('_');
    if trimmed.is_empty() {
        "untitled".to_string()
    } else {
        trimmed.to_string()
    }
}

pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), TailorError> {
    let body = serde_json::to_string_pretty(value).map_err(|e| TailorError::Internal(e.into()))?;
    std::fs::write(path, body)?;
    Ok(())
}

/// `output_dir_for` suffixed with the job id, for a second job that shares a
/// company and title with one already written.
pub fn disambiguated_dir(root: &Path, job: &JobDescription, n: usize) -> PathBuf {
    let base = output_dir_for(root, job);
    let name = base
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let suffix = match n {
        0 | 1 => slug(&job.job_id),
        n => format!("{}_{}", slug(&job.job_id), n),
    };
    root.join(format!("{name}_{suffix}"))
}

/// Runs the JSON and Markdown sinks into `dir`.
pub fn write_outputs(
    package: &TailoredPackage,
    job: &JobDescription,
    resume: &CandidateProfile,
    dir: &Path,
) -> Result<Vec<PathBuf>, TailorError> {
    std::fs::create_dir_all(dir)?;

    let sinks: [&dyn RenderSink; 2] = [&JsonSink, &MarkdownSink];
    let mut written = Vec::new();
    for sink in sinks {
        let files = sink.write(package, job, resume, dir)?;
        info!("{} sink wrote {} file(s) to {}", sink.name(), files.len(), dir.display());
        written.extend(files);
    }
    Ok(written)
}

/// Everything a finished run leaves on disk: the sink files and `metrics.json`
/// when a package exists, and `run_report.json` always.
pub fn write_run_files(
    report: &RunReport,
    job: &JobDescription,
    resume: &CandidateProfile,
    limits: &ValidatorConfig,
    dir: &Path,
) -> Result<Vec<PathBuf>, TailorError> {
    std::fs::create_dir_all(dir)?;
    let mut written = Vec::new();

    if let Some(package) = &report.package {
        written.extend(write_outputs(package, job, resume, dir)?);
        let metrics_path = dir.join("metrics.json");
        write_json(&metrics_path, &PackageMetrics::compute(package, job, resume, limits))?;
        written.push(metrics_path);
    }

    let report_path = dir.join("run_report.json");
    write_json(&report_path, report)?;
    written.push(report_path);
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{GeneratedBullet, GeneratedCoverLetter, GenerationMode};
    use crate::test_support::{sample_job, sample_resume, valid_cover_letter_text};

    fn package(with_letter: bool) -> TailoredPackage {
        let letter = with_letter.then(|| GeneratedCoverLetter {
            id: "cover-acme-ml-engineer".into(),
            job_id: "acme-ml-engineer".into(),
            job_title: Some("Machine Learning Engineer".into()),
            company: Some("Acme".into()),
            tone: "professional".into(),
            text: valid_cover_letter_text(),
        });
        TailoredPackage::new(
            "acme-ml-engineer",
            "jane-doe",
            GenerationMode::Agent,
            "m",
            vec![GeneratedBullet {
                id: "bullet-001".into(),
                text: "Deployed 12 Kubernetes-hosted ML models with zero downtime".into(),
                source_experience_id: Some("exp-001".into()),
                skills_covered: vec!["Kubernetes".into()],
            }],
            letter,
        )
    }

    #[test]
    fn test_slug_cleans_company_and_title() {
        assert_eq!(slug("Acme  Corp. Senior ML/AI Engineer"), "Acme_Corp_Senior_MLAI_Engineer");
        assert_eq!(slug("  ***  "), "untitled");
        let dir = output_dir_for(Path::new("/out"), &sample_job());
        assert_eq!(dir, PathBuf::from("/out/Acme_Machine_Learning_Engineer"));
    }

    #[test]
    fn test_disambiguated_dir_appends_job_id() {
        let job = sample_job();
        let root = Path::new("/out");
        assert_eq!(
            disambiguated_dir(root, &job, 1),
            PathBuf::from("/out/Acme_Machine_Learning_Engineer_acme-ml-engineer")
        );
        assert_eq!(
            disambiguated_dir(root, &job, 3),
            PathBuf::from("/out/Acme_Machine_Learning_Engineer_acme-ml-engineer_3")
        );
    }

    #[test]
    fn test_write_outputs_creates_all_files() {
        let root = tempfile::tempdir().unwrap();
        let dir = output_dir_for(root.path(), &sample_job());
        let files = write_outputs(&package(true), &sample_job(), &sample_resume(), &dir).unwrap();

        let names: Vec<String> = files
            .iter()
            .map(|f| f.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["package.json", "resume.md", "cover_letter.md"]);

        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&files[0]).unwrap()).unwrap();
        assert_eq!(json["job_id"], "acme-ml-engineer");
        assert_eq!(json["mode"], "agent");
    }

    #[test]
    fn test_write_outputs_skips_missing_cover_letter() {
        let root = tempfile::tempdir().unwrap();
        let files = write_outputs(&package(false), &sample_job(), &sample_resume(), root.path()).unwrap();
        assert_eq!(files.len(), 2);
        assert!(!files.iter().any(|f| f.ends_with("cover_letter.md")));
    }

    #[test]
    fn test_write_run_files_adds_metrics_and_report() {
        let dir = tempfile::tempdir().unwrap();
        let mut report: RunReport = serde_json::from_value(serde_json::json!({
            "run_id": "00000000-0000-0000-0000-000000000000",
            "job_id": "acme-ml-engineer",
            "mode": "agent",
            "status": "success",
            "package": null,
            "errors": [],
            "warnings": [],
            "attempts": [],
            "skill_gap": null,
            "elapsed_ms": 5
        }))
        .unwrap();
        report.package = Some(package(true));

        let files = write_run_files(
            &report,
            &sample_job(),
            &sample_resume(),
            &ValidatorConfig::default(),
            dir.path(),
        )
        .unwrap();
        let names: Vec<String> = files
            .iter()
            .map(|f| f.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            names,
            vec!["package.json", "resume.md", "cover_letter.md", "metrics.json", "run_report.json"]
        );

        report.package = None;
        let failed_dir = dir.path().join("failed");
        let files = write_run_files(
            &report,
            &sample_job(),
            &sample_resume(),
            &ValidatorConfig::default(),
            &failed_dir,
        )
        .unwrap();
        assert_eq!(files, vec![failed_dir.join("run_report.json")]);
    }
}
