use serde::{Deserialize, Serialize};

use super::{cosine_similarity, EmbeddingError, Encoder};
use crate::errors::TailorError;
use crate::models::resume::SourceType;
use crate::models::{Experience, Project};

/// One resume bullet returned by a similarity search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub source_id: String,
    pub source_type: SourceType,
    pub text: String,
    pub score: f32,
}

#[derive(Debug, Clone)]
struct IndexedBullet {
    source_id: String,
    source_type: SourceType,
    text: String,
    vector: Vec<f32>,
}

/// In-memory cosine index over every original resume bullet.
/// Built once per run; small enough that brute-force search is fine.
#[derive(Debug, Clone)]
pub struct SimilarityIndex {
    entries: Vec<IndexedBullet>,
    dimension: usize,
}

impl SimilarityIndex {
    pub async fn build(
        encoder: &dyn Encoder,
        experiences: &[Experience],
        projects: &[Project],
    ) -> Result<Self, TailorError> {
        let mut sources: Vec<(&str, SourceType, &str)> = Vec::new();
        for exp in experiences {
            for bullet in &exp.bullets {
                sources.push((&exp.id, SourceType::Experience, bullet));
            }
        }
        for project in projects {
            for bullet in &project.bullets {
                sources.push((&project.id, SourceType::Project, bullet));
            }
        }

        if sources.is_empty() {
            return Err(TailorError::Validation(
                "resume has no bullets to index".to_string(),
            ));
        }

        let texts: Vec<String> = sources.iter().map(|(_, _, t)| t.to_string()).collect();
        let vectors = encoder.encode_batch(&texts).await?;
        if vectors.len() != texts.len() {
            return Err(EmbeddingError::CountMismatch {
                expected: texts.len(),
                actual: vectors.len(),
            }
            .into());
        }

        let entries = sources
            .into_iter()
            .zip(vectors)
            .map(|((id, kind, text), vector)| IndexedBullet {
                source_id: id.to_string(),
                source_type: kind,
                text: text.to_string(),
                vector,
            })
            .collect();

        Ok(Self {
            entries,
            dimension: encoder.dimension(),
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Top-`k` bullets by cosine score, highest first. Equal scores keep index order.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchHit>, EmbeddingError> {
        if query.len() != self.dimension {
            return Err(EmbeddingError::DimensionMismatch {
                expected: self.dimension,
                actual: query.len(),
            });
        }
        if k == 0 {
            return Ok(Vec::new());
        }

        let mut scored: Vec<(usize, f32)> = self
            .entries
            .iter()
            .enumerate()
            .map(|(i, e)| (i, cosine_similarity(query, &e.vector)))
            .collect();
        // sort_by is stable, so ties stay in insertion order
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

        Ok(scored
            .into_iter()
            .take(k)
            .map(|(i, score)| {
                let e = &self.entries[i];
                SearchHit {
                    source_id: e.source_id.clone(),
                    source_type: e.source_type,
                    text: e.text.clone(),
                    score,
                }
            })
            .collect())
    }

    /// Original bullet texts indexed for one experience or project.
    pub fn bullets_for_source(&self, source_id: &str) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|e| e.source_id == source_id)
            .map(|e| e.text.as_str())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::HashingEncoder;
    use crate::test_support::sample_resume;

    async fn sample_index() -> SimilarityIndex {
        let resume = sample_resume();
        let encoder = HashingEncoder::new(256);
        SimilarityIndex::build(&encoder, &resume.experiences, &resume.projects)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_build_indexes_every_bullet() {
        let index = sample_index().await;
        assert_eq!(index.len(), 7);
        assert!(!index.is_empty());
        assert_eq!(index.bullets_for_source("proj-001").len(), 2);
    }

    #[tokio::test]
    async fn test_build_without_bullets_fails() {
        let encoder = HashingEncoder::new(32);
        let result = SimilarityIndex::build(&encoder, &[], &[]).await;
        assert!(matches!(result, Err(TailorError::Validation(_))));
    }

    #[tokio::test]
    async fn test_search_ranks_descending_and_caps_k() {
        let index = sample_index().await;
        let encoder = HashingEncoder::new(256);
        let query = encoder.encode("Kubernetes deployment of models").await.unwrap();

        let hits = index.search(&query, 3).unwrap();
        assert_eq!(hits.len(), 3);
        assert!(hits.windows(2).all(|w| w[0].score >= w[1].score));
        assert!(hits[0].text.contains("Kubernetes"));

        assert!(index.search(&query, 0).unwrap().is_empty());
        assert_eq!(index.search(&query, 100).unwrap().len(), 7);
    }

    #[tokio::test]
    async fn test_ties_keep_insertion_order() {
        let index = sample_index().await;
        // A zero query scores every entry 0.0.
        let hits = index.search(&vec![0.0; 256], 7).unwrap();
        let resume = sample_resume();
        let expected: Vec<&str> = resume.all_bullets().into_iter().map(|(_, _, t)| t).collect();
        let actual: Vec<&str> = hits.iter().map(|h| h.text.as_str()).collect();
        assert_eq!(actual, expected);
    }

    #[tokio::test]
    async fn test_dimension_mismatch_is_error() {
        let index = sample_index().await;
        assert!(matches!(
            index.search(&[1.0, 0.0], 1),
            Err(EmbeddingError::DimensionMismatch { expected: 256, actual: 2 })
        ));
    }
}
