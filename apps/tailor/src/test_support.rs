//! Shared fixtures for unit tests.

use std::collections::{BTreeMap, VecDeque};
use std::path::PathBuf;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::config::{Config, EmbeddingBackend, LlmProvider};
use crate::llm_client::{LlmError, TextGenerator};
use crate::models::resume::Education;
use crate::models::{CandidateProfile, Experience, JobDescription, Project};

/// A `(system, user)` prompt pair seen by `ScriptedGenerator`.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub system: String,
    pub user: String,
}

/// Replays canned replies in order and records every prompt it receives.
pub struct ScriptedGenerator {
    replies: Mutex<VecDeque<Result<String, LlmError>>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedGenerator {
    pub fn new(replies: Vec<String>) -> Self {
        Self::with_results(replies.into_iter().map(Ok).collect())
    }

    pub fn with_results(replies: Vec<Result<String, LlmError>>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    async fn generate(&self, system: &str, user: &str) -> Result<String, LlmError> {
        self.calls.lock().unwrap().push(RecordedCall {
            system: system.to_string(),
            user: user.to_string(),
        });
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(LlmError::Shape("script exhausted".to_string())))
    }

    fn model(&self) -> &str {
        "scripted-model"
    }
}

pub fn test_config() -> Config {
    Config {
        llm_provider: LlmProvider::Anthropic,
        anthropic_api_key: Some("test-key".to_string()),
        openai_api_key: None,
        anthropic_model: "claude-sonnet-4-5".to_string(),
        openai_model: "gpt-4o-mini".to_string(),
        openai_base_url: "https://api.openai.com/v1".to_string(),
        llm_max_tokens: 1500,
        llm_temperature: 0.7,
        llm_max_retries: 1,
        embedding_backend: EmbeddingBackend::Hashing,
        embedding_model: "text-embedding-3-small".to_string(),
        embedding_dim: 64,
        retrieval_top_k: 3,
        skill_top_k: 2,
        max_attempts: 3,
        min_skill_coverage: 0.5,
        max_bullet_chars: 150,
        concurrency_limit: 2,
        output_dir: PathBuf::from("outputs"),
        rust_log: "info".to_string(),
    }
}

pub fn sample_resume() -> CandidateProfile {
    CandidateProfile {
        candidate_id: "jane-doe".to_string(),
        name: "Jane Doe".to_string(),
        email: "jane@example.com".to_string(),
        phone: None,
        location: Some("Berlin".to_string()),
        summary: Some("Data engineer moving into ML platform work.".to_string()),
        skills: ["Python", "SQL", "Kafka", "Spark", "Kubernetes", "Rust", "Docker"]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        experiences: vec![
            Experience {
                id: "exp-001".to_string(),
                role: "Senior Data Engineer".to_string(),
                company: "Globex".to_string(),
                location: Some("Berlin".to_string()),
                start_date: Some("2021-04".to_string()),
                end_date: None,
                bullets: vec![
                    "Deployed 12 machine learning models to production on Kubernetes with zero downtime".to_string(),
                    "Built streaming data pipelines in Python and Kafka processing 2TB per day".to_string(),
                    "Cut warehouse query costs by 40% by redesigning Spark partitioning".to_string(),
                ],
            },
            Experience {
                id: "exp-002".to_string(),
                role: "Data Analyst".to_string(),
                company: "Initech".to_string(),
                location: None,
                start_date: Some("2018-09".to_string()),
                end_date: Some("2021-03".to_string()),
                bullets: vec![
                    "Automated weekly revenue reporting with Python and SQL, saving 10 analyst hours".to_string(),
                    "Designed A/B testing dashboards adopted by 30 product managers".to_string(),
                ],
            },
        ],
        education: vec![Education {
            degree: "BSc Computer Science".to_string(),
            institution: "TU Berlin".to_string(),
            year: Some(2018),
            details: vec![],
        }],
        projects: vec![Project {
            id: "proj-001".to_string(),
            name: "vecsearch".to_string(),
            description: Some("Approximate nearest neighbour library".to_string()),
            tech_stack: vec!["Rust".to_string()],
            bullets: vec![
                "Implemented approximate nearest neighbour search in Rust serving 5k queries per second".to_string(),
                "Published benchmarks comparing HNSW and IVF index recall".to_string(),
            ],
        }],
    }
}

pub fn sample_job() -> JobDescription {
    JobDescription {
        job_id: "acme-ml-engineer".to_string(),
        title: "Machine Learning Engineer".to_string(),
        company: Some("Acme".to_string()),
        location: Some("Remote".to_string()),
        seniority: Some("Senior".to_string()),
        responsibilities: vec![
            "Deploy machine learning models to production on Kubernetes".to_string(),
            "Build streaming feature pipelines".to_string(),
            "Improve search relevance for the product catalogue".to_string(),
        ],
        required_skills: vec![
            "Python".to_string(),
            "Kubernetes".to_string(),
            "Kafka".to_string(),
        ],
        nice_to_have_skills: vec!["Rust".to_string()],
        extra_metadata: BTreeMap::new(),
    }
}

/// A bullets reply that passes every validator rule for `sample_job`.
pub fn valid_bullets_reply() -> String {
    serde_json::json!({
        "bullets": [
            {
                "id": "bullet-001",
                "text": "Deployed 12 machine learning models to production on Kubernetes with zero downtime",
                "source_experience_id": "exp-001",
                "skills_covered": ["Kubernetes"]
            },
            {
                "id": "bullet-002",
                "text": "Built Python and Kafka streaming pipelines processing 2TB of events per day",
                "source_experience_id": "exp-001",
                "skills_covered": ["Python", "Kafka"]
            },
            {
                "id": "bullet-003",
                "text": "Implemented nearest neighbour search in Rust serving 5k queries per second",
                "source_experience_id": "proj-001",
                "skills_covered": ["Rust"]
            }
        ]
    })
    .to_string()
}

pub fn valid_cover_letter_text() -> String {
    [
        "Acme's work on production machine learning is exactly where I want to spend the next few years, and the Machine Learning Engineer role lines up closely with what I have been building at Globex.",
        "At Globex I deployed twelve models to Kubernetes with zero downtime and built Python and Kafka pipelines that process two terabytes of events a day. Outside work I maintain vecsearch, a Rust nearest neighbour library serving five thousand queries per second.",
        "I would welcome the chance to talk about how that experience could help Acme ship models faster and more reliably.",
    ]
    .join("\n\n")
}

/// A cover-letter reply that passes validation for `sample_job`.
pub fn valid_cover_letter_reply() -> String {
    serde_json::json!({
        "id": "cover-001",
        "job_id": "acme-ml-engineer",
        "tone": "professional",
        "text": valid_cover_letter_text()
    })
    .to_string()
}
