//! Maps job responsibilities and required skills to resume evidence.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::index::{SearchHit, SimilarityIndex};
use super::{EmbeddingError, Encoder};
use crate::errors::TailorError;
use crate::models::JobDescription;

#[derive(Debug, Clone, Copy)]
pub struct RetrievalConfig {
    /// Hits kept per responsibility query.
    pub top_k: usize,
    /// Hits kept per required-skill query.
    pub skill_top_k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: 5,
            skill_top_k: 3,
        }
    }
}

/// Ranked hits for one query, in query order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryHits {
    pub query: String,
    pub hits: Vec<SearchHit>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Retrieval {
    pub responsibilities: Vec<QueryHits>,
    pub skills: Vec<QueryHits>,
}

impl Retrieval {
    /// Every hit from every query, responsibilities first.
    pub fn all_hits(&self) -> impl Iterator<Item = &SearchHit> {
        self.responsibilities
            .iter()
            .chain(self.skills.iter())
            .flat_map(|q| q.hits.iter())
    }

    pub fn is_empty(&self) -> bool {
        self.all_hits().next().is_none()
    }
}

pub fn skill_query(skill: &str) -> String {
    format!("experience with {skill}")
}

pub async fn retrieve(
    job: &JobDescription,
    encoder: &dyn Encoder,
    index: &SimilarityIndex,
    config: RetrievalConfig,
) -> Result<Retrieval, TailorError> {
    let responsibilities: Vec<&String> = job
        .responsibilities
        .iter()
        .filter(|r| !r.trim().is_empty())
        .collect();
    let skills: Vec<&String> = job
        .required_skills
        .iter()
        .filter(|s| !s.trim().is_empty())
        .collect();

    if responsibilities.is_empty() && skills.is_empty() {
        return Err(TailorError::InvalidInput(format!(
            "job '{}' has no responsibilities or required skills to retrieve for",
            job.job_id
        )));
    }

    let mut queries: Vec<String> = responsibilities.iter().map(|r| r.to_string()).collect();
    queries.extend(skills.iter().map(|s| skill_query(s)));

    let vectors = encoder.encode_batch(&queries).await?;
    if vectors.len() != queries.len() {
        return Err(EmbeddingError::CountMismatch {
            expected: queries.len(),
            actual: vectors.len(),
        }
        .into());
    }

    let mut retrieval = Retrieval::default();
    for (i, (query, vector)) in queries.into_iter().zip(vectors.iter()).enumerate() {
        if i < responsibilities.len() {
            let hits = index.search(vector, config.top_k)?;
            retrieval.responsibilities.push(QueryHits { query, hits });
        } else {
            let hits = index.search(vector, config.skill_top_k)?;
            retrieval.skills.push(QueryHits { query, hits });
        }
    }

    debug!(
        "Retrieved {} responsibility and {} skill query results for {}",
        retrieval.responsibilities.len(),
        retrieval.skills.len(),
        job.job_id
    );
    Ok(retrieval)
}

/// One hit per distinct bullet text, keeping the best score, highest first.
pub fn deduplicate<'a>(hits: impl IntoIterator<Item = &'a SearchHit>) -> Vec<SearchHit> {
    let mut best: Vec<SearchHit> = Vec::new();
    let mut position: HashMap<String, usize> = HashMap::new();

    for hit in hits {
        match position.get(&hit.text) {
            Some(&i) => {
                if hit.score > best[i].score {
                    best[i] = hit.clone();
                }
            }
            None => {
                position.insert(hit.text.clone(), best.len());
                best.push(hit.clone());
            }
        }
    }

    best.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    best
}

/// Deduplicated union of all hits, at most `max_per_source` per source and
/// `top_k_overall` in total.
pub fn aggregate(retrieval: &Retrieval, top_k_overall: usize, max_per_source: usize) -> Vec<SearchHit> {
    let mut per_source: HashMap<String, usize> = HashMap::new();
    deduplicate(retrieval.all_hits())
        .into_iter()
        .filter(|hit| {
            let count = per_source.entry(hit.source_id.clone()).or_insert(0);
            *count += 1;
            *count <= max_per_source
        })
        .take(top_k_overall)
        .collect()
}

/// Source id with the most hits. Ties go to the source seen first.
pub fn most_common_source(retrieval: &Retrieval) -> Option<String> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    let mut order: Vec<&str> = Vec::new();
    let mut seen: HashSet<&str> = HashSet::new();

    for hit in retrieval.all_hits() {
        *counts.entry(hit.source_id.as_str()).or_insert(0) += 1;
        if seen.insert(hit.source_id.as_str()) {
            order.push(hit.source_id.as_str());
        }
    }

    let mut best: Option<(&str, usize)> = None;
    for id in order {
        let count = counts[id];
        if best.map_or(true, |(_, c)| count > c) {
            best = Some((id, count));
        }
    }
    best.map(|(id, _)| id.to_string())
}
