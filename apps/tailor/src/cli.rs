use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use crate::config::LlmProvider;

/// Tailors resume bullets and a cover letter to a job posting.
///
/// Evidence is retrieved from the candidate's own resume, generated by an LLM,
/// and validated with bounded retries before anything is written.
#[derive(Debug, Parser)]
#[command(name = "tailor", version, about)]
pub struct Cli {
    /// Enable debug logging (overrides RUST_LOG)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// LLM provider (defaults to LLM_PROVIDER)
    #[arg(long, global = true, value_enum)]
    pub provider: Option<LlmProvider>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Tailor one resume to one job
    Run {
        /// Job description (.yaml, .yml or .json)
        #[arg(long)]
        job: PathBuf,

        /// Candidate profile (.json, .yaml or .yml)
        #[arg(long)]
        resume: PathBuf,

        /// Output root (defaults to OUTPUT_DIR)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// One-shot generation without retrieval or retries
        #[arg(long)]
        baseline: bool,
    },

    /// Tailor one resume to every job file in a directory
    Batch {
        /// Directory of job description files
        #[arg(long)]
        jobs: PathBuf,

        #[arg(long)]
        resume: PathBuf,

        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Maximum runs in flight (defaults to CONCURRENCY_LIMIT)
        #[arg(short, long)]
        concurrency: Option<usize>,

        #[arg(long)]
        baseline: bool,
    },

    /// Run baseline and agent on the same pair and print both metric sets
    Compare {
        #[arg(long)]
        job: PathBuf,

        #[arg(long)]
        resume: PathBuf,

        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Convert a raw posting or resume (text or PDF) into structured JSON
    Ingest {
        #[arg(value_enum)]
        kind: IngestKind,

        /// Source document (.txt, .md or .pdf)
        #[arg(short, long)]
        input: PathBuf,

        /// Where to write the parsed JSON
        #[arg(long)]
        out: PathBuf,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum IngestKind {
    Job,
    Resume,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_run_with_global_flags() {
        let cli = Cli::try_parse_from([
            "tailor", "run", "--job", "j.yaml", "--resume", "r.json", "--provider", "openai", "-v",
        ])
        .unwrap();
        assert!(cli.verbose);
        assert_eq!(cli.provider, Some(LlmProvider::OpenAi));
        match cli.command {
            Command::Run { job, baseline, output, .. } => {
                assert_eq!(job, PathBuf::from("j.yaml"));
                assert!(!baseline);
                assert!(output.is_none());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_batch_and_ingest() {
        let cli = Cli::try_parse_from([
            "tailor", "batch", "--jobs", "jobs/", "--resume", "r.json", "-c", "4",
        ])
        .unwrap();
        assert!(matches!(cli.command, Command::Batch { concurrency: Some(4), .. }));

        let cli = Cli::try_parse_from([
            "tailor", "ingest", "resume", "--input", "cv.pdf", "--out", "cv.json",
        ])
        .unwrap();
        assert!(matches!(cli.command, Command::Ingest { kind: IngestKind::Resume, .. }));
    }

    #[test]
    fn test_missing_required_flag_is_rejected() {
        assert!(Cli::try_parse_from(["tailor", "run", "--job", "j.yaml"]).is_err());
    }
}
