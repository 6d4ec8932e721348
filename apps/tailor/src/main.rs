mod agent;
mod cli;
mod config;
mod embeddings;
mod errors;
mod evaluation;
mod generation;
mod ingestion;
mod llm_client;
mod models;
mod render;
#[cfg(test)]
mod test_support;

use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::agent::{discover_jobs, run_batch, AgentExecutor, BatchOptions, BatchPair, RunReport};
use crate::cli::{Cli, Command, IngestKind};
use crate::config::Config;
use crate::embeddings::{build_encoder, Encoder};
use crate::evaluation::{compare, format_comparison};
use crate::ingestion::{ingest_job_text, ingest_resume_text, read_source_text};
use crate::llm_client::{build_generator, TextGenerator};
use crate::models::{load_job, load_resume, CandidateProfile, JobDescription};
use crate::render::{output_dir_for, write_json, write_run_files};

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let mut config = Config::from_env()?;
    if let Some(provider) = cli.provider {
        config.llm_provider = provider;
    }

    // Initialize structured logging
    let filter = if cli.verbose {
        EnvFilter::new(format!("{}=debug", env!("CARGO_PKG_NAME")))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        })
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("tailor v{}", env!("CARGO_PKG_VERSION"));

    let llm: Arc<dyn TextGenerator> = Arc::from(build_generator(&config)?);
    info!("LLM client initialized ({:?}, model: {})", config.llm_provider, llm.model());

    let succeeded = match cli.command {
        Command::Ingest { kind, input, out } => {
            ingest(kind, &input, &out, llm.as_ref()).await?;
            true
        }
        Command::Run {
            job,
            resume,
            output,
            baseline,
        } => {
            let (executor, _) = build_executor(&config, llm)?;
            let (job, resume) = load_pair(&job, &resume)?;
            let report = if baseline {
                executor.run_baseline(&job, &resume).await
            } else {
                executor.run(&job, &resume).await
            };
            let root = output.unwrap_or_else(|| config.output_dir.clone());
            finish_run(&report, &job, &resume, &executor, &root)?
        }
        Command::Batch {
            jobs,
            resume,
            output,
            concurrency,
            baseline,
        } => {
            let (executor, _) = build_executor(&config, llm)?;
            let root = output.unwrap_or_else(|| config.output_dir.clone());
            let options = BatchOptions {
                concurrency: concurrency.unwrap_or(config.concurrency_limit),
                baseline,
            };
            batch(executor, &jobs, &resume, options, &root).await?
        }
        Command::Compare {
            job,
            resume,
            output,
        } => {
            let (executor, encoder) = build_executor(&config, llm)?;
            let (job, resume) = load_pair(&job, &resume)?;
            let comparison = compare(&executor, encoder.as_ref(), &job, &resume).await;
            println!("{}", format_comparison(&comparison));

            let dir = output_dir_for(&output.unwrap_or_else(|| config.output_dir.clone()), &job);
            std::fs::create_dir_all(&dir)?;
            write_json(&dir.join("comparison.json"), &comparison)?;
            info!("Comparison written to {}", dir.display());
            comparison.agent.status.is_success()
        }
    };

    Ok(if succeeded {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn build_executor(
    config: &Config,
    llm: Arc<dyn TextGenerator>,
) -> Result<(AgentExecutor, Arc<dyn Encoder>)> {
    let encoder: Arc<dyn Encoder> = Arc::from(build_encoder(config)?);
    info!("Encoder initialized ({}, dim {})", encoder.name(), encoder.dimension());
    Ok((AgentExecutor::from_config(config, llm, encoder.clone()), encoder))
}

async fn batch(
    executor: AgentExecutor,
    jobs_dir: &Path,
    resume: &Path,
    options: BatchOptions,
    root: &Path,
) -> Result<bool> {
    let pairs: Vec<BatchPair> = discover_jobs(jobs_dir)?
        .into_iter()
        .map(|job_path| BatchPair {
            job_path,
            resume_path: resume.to_path_buf(),
        })
        .collect();
    if pairs.is_empty() {
        warn!("No job files found in {}", jobs_dir.display());
        return Ok(true);
    }

    let results = run_batch(Arc::new(executor), pairs, options, Some(root.to_path_buf())).await;

    std::fs::create_dir_all(root)?;
    let summary = root.join("batch_summary.json");
    write_json(&summary, &results)?;
    info!("Batch summary written to {}", summary.display());
    Ok(results.iter().all(|r| r.status.is_success()))
}

fn load_pair(job: &Path, resume: &Path) -> Result<(JobDescription, CandidateProfile)> {
    let job = load_job(job).with_context(|| format!("Failed to load job {}", job.display()))?;
    let resume =
        load_resume(resume).with_context(|| format!("Failed to load resume {}", resume.display()))?;
    Ok((job, resume))
}

/// Writes package, metrics and report for a single run. Returns whether it succeeded.
fn finish_run(
    report: &RunReport,
    job: &JobDescription,
    resume: &CandidateProfile,
    executor: &AgentExecutor,
    root: &Path,
) -> Result<bool> {
    let dir = output_dir_for(root, job);
    let files = write_run_files(report, job, resume, &executor.validator().config, &dir)?;
    for file in &files {
        info!("Wrote {}", file.display());
    }

    for w in &report.warnings {
        warn!("{}", w);
    }
    if report.status.is_success() {
        info!("Run {} finished with status {:?}", report.run_id, report.status);
        Ok(true)
    } else {
        for e in &report.errors {
            error!("{}", e);
        }
        Ok(false)
    }
}

async fn ingest(kind: IngestKind, input: &Path, out: &Path, llm: &dyn TextGenerator) -> Result<()> {
    let raw = read_source_text(input)?;
    info!("Read {} chars from {}", raw.len(), input.display());

    match kind {
        IngestKind::Job => write_json(out, &ingest_job_text(&raw, llm).await?)?,
        IngestKind::Resume => write_json(out, &ingest_resume_text(&raw, llm).await?)?,
    }
    info!("Wrote {}", out.display());
    Ok(())
}
