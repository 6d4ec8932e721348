//! Local feature-hashing encoder.
//!
//! Lowercase alphanumeric tokens (stopwords dropped) are hashed into a fixed
//! number of buckets with a sign bit; adjacent token pairs add half-weight
//! bigram features. Deterministic across runs and platforms.

use async_trait::async_trait;

use super::{normalize, EmbeddingError, Encoder};

const BIGRAM_WEIGHT: f32 = 0.5;

const STOPWORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "by", "for", "from", "in", "into", "is", "it",
    "of", "on", "or", "our", "that", "the", "this", "to", "was", "we", "will", "with", "you",
    "your", "experience",
];

pub struct HashingEncoder {
    dimension: usize,
}

impl HashingEncoder {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(1),
        }
    }

    fn embed(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0_f32; self.dimension];
        let tokens = tokenize(text);

        for token in &tokens {
            self.add_feature(&mut vector, token.as_bytes(), 1.0);
        }
        for pair in tokens.windows(2) {
            let bigram = format!("{} {}", pair[0], pair[1]);
            self.add_feature(&mut vector, bigram.as_bytes(), BIGRAM_WEIGHT);
        }

        normalize(&mut vector);
        vector
    }

    fn add_feature(&self, vector: &mut [f32], feature: &[u8], weight: f32) {
        let hash = fnv1a(feature);
        let bucket = (hash % self.dimension as u64) as usize;
        let sign = if (hash >> 63) & 1 == 0 { 1.0 } else { -1.0 };
        vector[bucket] += sign * weight;
    }
}

#[async_trait]
impl Encoder for HashingEncoder {
    fn name(&self) -> &str {
        "hashing"
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn encode_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        Ok(texts.iter().map(|t| self.embed(t)).collect())
    }
}

/// Lowercase alphanumeric tokens; `+` and `#` stay attached so "C++" and "C#" survive.
pub(crate) fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !(c.is_alphanumeric() || c == '+' || c == '#'))
        .filter(|t| !t.is_empty() && !STOPWORDS.contains(t))
        .map(str::to_string)
        .collect()
}

fn fnv1a(bytes: &[u8]) -> u64 {
    const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;
    bytes
        .iter()
        .fold(OFFSET, |hash, &b| (hash ^ b as u64).wrapping_mul(PRIME))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::cosine_similarity;

    #[test]
    fn test_tokenize_drops_stopwords_and_keeps_cpp() {
        assert_eq!(
            tokenize("Experience with C++ and the Kafka platform"),
            vec!["c++", "kafka", "platform"]
        );
    }

    #[test]
    fn test_embedding_is_deterministic_and_normalized() {
        let encoder = HashingEncoder::new(128);
        let a = encoder.embed("Built streaming pipelines in Rust");
        let b = encoder.embed("Built streaming pipelines in Rust");
        assert_eq!(a, b);
        let norm: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_overlapping_text_scores_higher() {
        let encoder = HashingEncoder::new(384);
        let query = encoder.embed("Deploy machine learning models on Kubernetes");
        let related = encoder.embed("Deployed 12 machine learning models to Kubernetes clusters");
        let unrelated = encoder.embed("Organized quarterly offsite for finance team");
        assert!(cosine_similarity(&query, &related) > cosine_similarity(&query, &unrelated));
    }

    #[test]
    fn test_stopword_only_text_is_zero_vector() {
        let encoder = HashingEncoder::new(16);
        let v = encoder.embed("the and of");
        assert!(v.iter().all(|x| *x == 0.0));
    }

    #[test]
    fn test_zero_dimension_is_clamped() {
        assert_eq!(HashingEncoder::new(0).dimension(), 1);
    }
}
