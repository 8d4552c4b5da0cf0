//! Hybrid fusion of lexical and semantic candidates.
//!
//! Scores are fused additively, keyed by document text. The two retrievers
//! score on different scales and no normalization is applied before fusion;
//! callers that need comparable signals use the per-retriever provenance
//! fields carried on each candidate.

use crate::retrieval::{LexicalRetriever, SemanticRetriever};
use crate::types::Candidate;
use prism_core::PrismResult;
use std::collections::HashMap;

/// Runs both retrievers and merges their candidate sets.
pub struct HybridRetriever {
    lexical: LexicalRetriever,
    semantic: SemanticRetriever,
    per_retriever_k: usize,
}

impl HybridRetriever {
    /// Combine the two retrievers with a shared per-retriever budget.
    pub fn new(
        lexical: LexicalRetriever,
        semantic: SemanticRetriever,
        per_retriever_k: usize,
    ) -> Self {
        Self {
            lexical,
            semantic,
            per_retriever_k,
        }
    }

    /// Retrieve candidates from both retrievers and fuse by additive score,
    /// deduplicated by document text, ordered by descending fused score.
    ///
    /// Documents returned by only one retriever keep that single score.
    pub async fn search(&self, query: &str) -> PrismResult<Vec<Candidate>> {
        let dense = self.semantic.search(query, self.per_retriever_k).await?;
        let sparse = self.lexical.search(query, self.per_retriever_k);

        tracing::debug!(
            "Hybrid retrieval: {} dense + {} sparse candidates",
            dense.len(),
            sparse.len()
        );

        let mut merged: Vec<Candidate> = Vec::with_capacity(dense.len() + sparse.len());
        let mut by_text: HashMap<String, usize> = HashMap::new();

        for candidate in dense.into_iter().chain(sparse) {
            match by_text.get(candidate.text.as_str()) {
                Some(&i) => {
                    let existing = &mut merged[i];
                    existing.score += candidate.score;
                    if candidate.dense_score.is_some() {
                        existing.dense_score = candidate.dense_score;
                    }
                    if candidate.sparse_score.is_some() {
                        existing.sparse_score = candidate.sparse_score;
                    }
                }
                None => {
                    by_text.insert(candidate.text.clone(), merged.len());
                    merged.push(candidate);
                }
            }
        }

        // Stable sort keeps first-seen order for equal fused scores
        merged.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        Ok(merged)
    }
}
