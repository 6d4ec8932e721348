//! Bounded parallel fan-out over independent (job, resume) pairs.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

use crate::agent::executor::{AgentExecutor, RunReport, RunStatus};
use crate::errors::TailorError;
use crate::models::{load_job, load_resume, CandidateProfile, JobDescription};
use crate::render::{disambiguated_dir, output_dir_for, write_run_files};

#[derive(Debug, Clone)]
pub struct BatchPair {
    pub job_path: PathBuf,
    pub resume_path: PathBuf,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct BatchOptions {
    pub concurrency: usize,
    pub baseline: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchJobResult {
    pub job_path: PathBuf,
    pub resume_path: PathBuf,
    pub status: RunStatus,
    pub report: Option<RunReport>,
    pub error: Option<String>,
    pub error_code: Option<String>,
    pub output_files: Vec<PathBuf>,
}

impl BatchJobResult {
    fn failed(pair: &BatchPair, error: String, code: &str) -> Self {
        Self {
            job_path: pair.job_path.clone(),
            resume_path: pair.resume_path.clone(),
            status: RunStatus::Failed,
            report: None,
            error: Some(error),
            error_code: Some(code.to_string()),
            output_files: Vec::new(),
        }
    }
}

/// Runs every pair with at most `options.concurrency` in flight.
/// Results come back in input order; one failing pair never stops the others.
pub async fn run_batch(
    executor: Arc<AgentExecutor>,
    pairs: Vec<BatchPair>,
    options: BatchOptions,
    output_root: Option<PathBuf>,
) -> Vec<BatchJobResult> {
    let concurrency = options.concurrency.max(1);
    info!(
        "Starting batch of {} pairs (concurrency={})",
        pairs.len(),
        concurrency
    );

    let semaphore = Arc::new(Semaphore::new(concurrency));
    let mut slots: Vec<Option<BatchJobResult>> = vec![None; pairs.len()];
    let mut claimed: HashSet<PathBuf> = HashSet::new();
    let mut tasks = JoinSet::new();

    for (index, pair) in pairs.iter().cloned().enumerate() {
        let (job, resume) = match load_pair(&pair) {
            Ok(loaded) => loaded,
            Err(e) => {
                warn!("Skipping {}: {}", pair.job_path.display(), e);
                slots[index] = Some(BatchJobResult::failed(&pair, e.to_string(), e.code()));
                continue;
            }
        };
        // Claimed in input order so the earlier pair keeps the plain directory name.
        let out_dir = output_root
            .as_deref()
            .map(|root| claim_output_dir(&mut claimed, root, &job));

        let semaphore = semaphore.clone();
        let executor = executor.clone();
        tasks.spawn(async move {
            let _permit = match semaphore.acquire_owned().await {
                Ok(p) => p,
                Err(_) => {
                    return (
                        index,
                        BatchJobResult::failed(&pair, "semaphore closed".into(), "INTERNAL_ERROR"),
                    )
                }
            };
            let result = run_pair(&executor, &pair, &job, &resume, options.baseline, out_dir.as_deref()).await;
            (index, result)
        });
    }

    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((index, result)) => slots[index] = Some(result),
            Err(e) => error!("Batch task panicked: {}", e),
        }
    }

    let results: Vec<BatchJobResult> = slots
        .into_iter()
        .zip(pairs.iter())
        .map(|(slot, pair)| {
            slot.unwrap_or_else(|| {
                BatchJobResult::failed(pair, "task panicked".into(), "INTERNAL_ERROR")
            })
        })
        .collect();

    log_summary(&results);
    results
}

fn load_pair(pair: &BatchPair) -> Result<(JobDescription, CandidateProfile), TailorError> {
    let job = load_job(&pair.job_path)?;
    let resume = load_resume(&pair.resume_path)?;
    Ok((job, resume))
}

/// The job's output directory, suffixed with its id (and a counter if needed)
/// when an earlier pair in the batch already owns that name.
fn claim_output_dir(claimed: &mut HashSet<PathBuf>, root: &Path, job: &JobDescription) -> PathBuf {
    let mut dir = output_dir_for(root, job);
    let mut n = 0;
    while claimed.contains(&dir) {
        n += 1;
        dir = disambiguated_dir(root, job, n);
    }
    if n > 0 {
        warn!(
            "{} shares its output directory with an earlier job; writing to {}",
            job.job_id,
            dir.display()
        );
    }
    claimed.insert(dir.clone());
    dir
}

async fn run_pair(
    executor: &AgentExecutor,
    pair: &BatchPair,
    job: &JobDescription,
    resume: &CandidateProfile,
    baseline: bool,
    out_dir: Option<&Path>,
) -> BatchJobResult {
    let report = if baseline {
        executor.run_baseline(job, resume).await
    } else {
        executor.run(job, resume).await
    };

    let mut result = BatchJobResult {
        job_path: pair.job_path.clone(),
        resume_path: pair.resume_path.clone(),
        status: report.status,
        report: None,
        error: report.errors.first().cloned(),
        error_code: None,
        output_files: Vec::new(),
    };

    if let Some(dir) = out_dir {
        match write_run_files(&report, job, resume, &executor.validator().config, dir) {
            Ok(files) => result.output_files = files,
            Err(e) => {
                error!("Writing outputs for {} failed: {}", job.job_id, e);
                result.status = RunStatus::Failed;
                result.error = Some(e.to_string());
                result.error_code = Some(e.code().to_string());
            }
        }
    }

    if result.status == RunStatus::Failed && result.error_code.is_none() {
        result.error_code = Some("RUN_FAILED".to_string());
    }
    result.report = Some(report);
    result
}

fn log_summary(results: &[BatchJobResult]) {
    let succeeded = results.iter().filter(|r| r.status.is_success()).count();
    let with_warnings = results
        .iter()
        .filter(|r| r.status == RunStatus::SuccessWithWarnings)
        .count();
    info!(
        "Batch complete: {}/{} succeeded ({} with warnings), {} failed",
        succeeded,
        results.len(),
        with_warnings,
        results.len() - succeeded
    );
    for r in results.iter().filter(|r| !r.status.is_success()) {
        warn!(
            "  {} → {}",
            r.job_path.display(),
            r.error.as_deref().unwrap_or("unknown error")
        );
    }
}

/// Every `.yaml`, `.yml` and `.json` file directly inside `dir`, sorted by name.
pub fn discover_jobs(dir: &Path) -> Result<Vec<PathBuf>, TailorError> {
    if !dir.is_dir() {
        return Err(TailorError::NotFound(format!("{} is not a directory", dir.display())));
    }
    let mut jobs: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| {
            p.is_file()
                && matches!(
                    p.extension().and_then(|e| e.to_str()),
                    Some("yaml") | Some("yml") | Some("json")
                )
        })
        .collect();
    jobs.sort();
    Ok(jobs)
}
