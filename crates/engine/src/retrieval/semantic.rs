//! Semantic candidate retrieval via embedding similarity.
//!
//! Document embeddings are computed once at initialization and held in
//! memory, unit-normalized, so query-time similarity is a dot product.
//! Top-k selection is partial (size-k min-heap), then sorted descending.

use crate::corpus::Corpus;
use crate::embeddings::EmbeddingProvider;
use crate::types::Candidate;
use ordered_float::OrderedFloat;
use prism_core::PrismResult;
use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::sync::Arc;

/// Vector-similarity retriever over an immutable corpus.
pub struct SemanticRetriever {
    corpus: Arc<Corpus>,
    provider: Arc<dyn EmbeddingProvider>,
    embeddings: Vec<Vec<f32>>,
}

impl SemanticRetriever {
    /// Embed every document once and keep the normalized vectors.
    pub async fn new(
        corpus: Arc<Corpus>,
        provider: Arc<dyn EmbeddingProvider>,
    ) -> PrismResult<Self> {
        let mut embeddings = provider.embed_batch(corpus.documents()).await?;
        for embedding in &mut embeddings {
            normalize(embedding);
        }

        tracing::debug!(
            "Embedded {} documents with provider '{}' ({} dimensions)",
            embeddings.len(),
            provider.provider_name(),
            provider.dimensions()
        );

        Ok(Self {
            corpus,
            provider,
            embeddings,
        })
    }

    /// Search the corpus, returning at most `top_k` candidates ordered by
    /// descending similarity (ties by document index).
    pub async fn search(&self, query: &str, top_k: usize) -> PrismResult<Vec<Candidate>> {
        if self.corpus.is_empty() || top_k == 0 {
            return Ok(Vec::new());
        }

        let mut query_embedding = self.provider.embed(query).await?;
        normalize(&mut query_embedding);

        // Partial selection: O(n log k) via a min-heap of size k. Ties keep
        // the lower document index by evicting the higher one first.
        let mut heap: BinaryHeap<Reverse<(OrderedFloat<f32>, Reverse<usize>)>> =
            BinaryHeap::with_capacity(top_k + 1);

        for (i, doc_embedding) in self.embeddings.iter().enumerate() {
            let score = dot(&query_embedding, doc_embedding);
            heap.push(Reverse((OrderedFloat(score), Reverse(i))));
            if heap.len() > top_k {
                heap.pop();
            }
        }

        let mut hits: Vec<(usize, f32)> = heap
            .into_iter()
            .map(|Reverse((score, Reverse(i)))| (i, score.0))
            .collect();
        hits.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.0.cmp(&b.0))
        });

        Ok(hits
            .into_iter()
            .map(|(i, score)| Candidate::dense(self.corpus.documents()[i].clone(), score))
            .collect())
    }
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

fn normalize(v: &mut [f32]) {
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::HashProvider;

    async fn retriever(docs: &[&str]) -> SemanticRetriever {
        let corpus = Arc::new(Corpus::from_documents(
            docs.iter().map(|d| d.to_string()).collect(),
        ));
        SemanticRetriever::new(corpus, Arc::new(HashProvider::new(128)))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_identical_text_scores_highest() {
        let r = retriever(&[
            "activation dropped in March",
            "signup flow changed in release",
        ])
        .await;

        let results = r.search("activation dropped in March", 10).await.unwrap();
        assert_eq!(results[0].text, "activation dropped in March");
        // Identical text means identical embedding: similarity 1
        assert!((results[0].score - 1.0).abs() < 0.001);
        assert!(results[1].score < 0.5);
    }

    #[tokio::test]
    async fn test_scores_descend() {
        let r = retriever(&["alpha", "beta", "gamma", "delta"]).await;
        let results = r.search("alpha", 10).await.unwrap();

        for pair in results.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }
    }

    #[tokio::test]
    async fn test_top_k_limit() {
        let r = retriever(&["one", "two", "three", "four", "five"]).await;
        let results = r.search("three", 2).await.unwrap();
        assert_eq!(results.len(), 2);
    }

    #[tokio::test]
    async fn test_empty_corpus_returns_empty() {
        let r = retriever(&[]).await;
        assert!(r.search("anything", 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_deterministic_repeat_search() {
        let r = retriever(&["metrics dashboard", "churn cohort", "weekly actives"]).await;

        let first = r.search("churn analysis", 10).await.unwrap();
        let second = r.search("churn analysis", 10).await.unwrap();

        let a: Vec<(String, f32)> = first.into_iter().map(|c| (c.text, c.score)).collect();
        let b: Vec<(String, f32)> = second.into_iter().map(|c| (c.text, c.score)).collect();
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn test_candidates_carry_dense_provenance() {
        let r = retriever(&["a doc"]).await;
        let results = r.search("a doc", 1).await.unwrap();
        assert_eq!(results[0].dense_score, Some(results[0].score));
        assert_eq!(results[0].sparse_score, None);
    }
}
