//! Deterministic hash-seeded embedding provider.
//!
//! A SHA-256 digest of the text seeds a pseudo-random generator that fills a
//! fixed-size vector, which is then normalized to unit length. Identical text
//! always produces the identical embedding; different text produces
//! near-orthogonal embeddings with high probability. No model binaries or
//! network access are required, so the semantic retriever always functions.

use crate::embeddings::EmbeddingProvider;
use prism_core::PrismResult;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use sha2::{Digest, Sha256};

/// Offline embedding provider with reproducible vectors.
///
/// Not semantically accurate like a neural model; it guarantees determinism
/// and pairwise near-orthogonality, which is what the pipeline's tests and
/// offline operation depend on.
#[derive(Debug)]
pub struct HashProvider {
    dimensions: usize,
}

impl HashProvider {
    /// Create a new hash provider with the given dimensions.
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions }
    }

    fn generate(&self, text: &str) -> Vec<f32> {
        let digest = Sha256::digest(text.as_bytes());

        let mut seed_bytes = [0u8; 8];
        seed_bytes.copy_from_slice(&digest[..8]);
        let mut rng = StdRng::seed_from_u64(u64::from_le_bytes(seed_bytes));

        let mut embedding: Vec<f32> = (0..self.dimensions)
            .map(|_| rng.gen::<f32>() * 2.0 - 1.0)
            .collect();

        let norm: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut embedding {
                *v /= norm;
            }
        }

        embedding
    }
}

#[async_trait::async_trait]
impl EmbeddingProvider for HashProvider {
    fn provider_name(&self) -> &str {
        "hash"
    }

    fn model_name(&self) -> &str {
        "hash-v1"
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed_batch(&self, texts: &[String]) -> PrismResult<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|text| self.generate(text)).collect())
    }
}
