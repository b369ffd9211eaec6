//! Offline embedding provider based on hashed character trigrams.

use crate::embeddings::provider::EmbeddingProvider;
use qa_core::AppResult;

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// Deterministic local provider for tests and offline runs.
///
/// Every lowercase character trigram of the text is hashed into one of
/// `dimensions` buckets and the counts are scaled to unit length. Texts
/// sharing many trigrams end up close under cosine distance. The vector is
/// never all-zero, so cosine distance is always defined.
#[derive(Debug)]
pub struct MockProvider {
    dimensions: usize,
}

impl MockProvider {
    /// Create a new mock provider with specified dimensions.
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions: dimensions.max(1),
        }
    }

    fn bucket(&self, gram: &[char]) -> usize {
        let mut hash = FNV_OFFSET;
        for c in gram {
            for byte in (*c as u32).to_le_bytes() {
                hash ^= u64::from(byte);
                hash = hash.wrapping_mul(FNV_PRIME);
            }
        }
        (hash % self.dimensions as u64) as usize
    }

    fn embed_one(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimensions];

        let chars: Vec<char> = text
            .chars()
            .flat_map(char::to_lowercase)
            .filter(|c| !c.is_whitespace())
            .collect();

        if chars.len() < 3 {
            if !chars.is_empty() {
                vector[self.bucket(&chars)] += 1.0;
            }
        } else {
            for gram in chars.windows(3) {
                vector[self.bucket(gram)] += 1.0;
            }
        }

        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            vector.iter_mut().for_each(|v| *v /= norm);
        } else {
            vector[0] = 1.0;
        }

        vector
    }
}

#[async_trait::async_trait]
impl EmbeddingProvider for MockProvider {
    fn provider_name(&self) -> &str {
        "mock"
    }

    fn model_name(&self) -> &str {
        "hashed-trigram"
    }

    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|text| self.embed_one(text)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cosine(a: &[f32], b: &[f32]) -> f32 {
        a.iter().zip(b).map(|(x, y)| x * y).sum()
    }

    #[tokio::test]
    async fn test_deterministic_and_normalized() {
        let provider = MockProvider::new(64);
        let texts = vec!["Platform AI docs".to_string(), "Platform AI docs".to_string()];
        let vectors = provider.embed_batch(&texts).await.unwrap();

        assert_eq!(vectors.len(), 2);
        assert_eq!(vectors[0], vectors[1]);
        assert_eq!(vectors[0].len(), 64);
        assert!((cosine(&vectors[0], &vectors[0]) - 1.0).abs() < 1e-5);
    }

    #[tokio::test]
    async fn test_similar_text_is_closer() {
        let provider = MockProvider::new(256);
        let query = provider.embed("token ai pricing plans").await.unwrap();
        let near = provider.embed("pricing plans for token ai").await.unwrap();
        let far = provider.embed("weather in the mountains").await.unwrap();

        assert!(cosine(&query, &near) > cosine(&query, &far));
    }

    #[tokio::test]
    async fn test_empty_text_is_not_zero() {
        let provider = MockProvider::new(16);
        let vector = provider.embed("").await.unwrap();
        assert_eq!(vector[0], 1.0);
    }
}
