//! Ranking orchestration over retrieval candidates.
//!
//! Validates candidates at the boundary, extracts features, scores them with
//! the ranking model, and reattaches scores to the original candidates.

use crate::ranking::features;
use crate::ranking::model::RankingModel;
use crate::types::{Candidate, RankedCandidate};
use prism_core::{PrismError, PrismResult};
use std::sync::Arc;

/// Wires the feature extractor and ranking model over a candidate list.
#[derive(Debug)]
pub struct RankingOrchestrator {
    model: Arc<RankingModel>,
}

impl RankingOrchestrator {
    pub fn new(model: Arc<RankingModel>) -> Self {
        Self { model }
    }

    /// Rank candidates by predicted usefulness.
    ///
    /// Returns `min(top_k, candidates.len())` results, descending by
    /// `rank_score`, ties keeping the original candidate order. Empty input
    /// yields empty output. Malformed candidates (empty text, non-finite
    /// score) fail fast with an error naming the field.
    ///
    /// Dense/sparse feature slots use each candidate's retriever provenance
    /// when present; a candidate without provenance contributes its fused
    /// score to both slots, which loses the per-retriever signal.
    pub fn rank_candidates(
        &self,
        query: &str,
        candidates: &[Candidate],
        top_k: usize,
    ) -> PrismResult<Vec<RankedCandidate>> {
        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        for candidate in candidates {
            validate(candidate)?;
        }

        let rows: Vec<(&str, f32, f32)> = candidates
            .iter()
            .map(|c| {
                (
                    c.text.as_str(),
                    c.dense_score.unwrap_or(c.score),
                    c.sparse_score.unwrap_or(c.score),
                )
            })
            .collect();

        let feature_matrix = features::extract_batch(query, &rows);
        let scores = self.model.rank(&feature_matrix);

        let mut ranked: Vec<RankedCandidate> = candidates
            .iter()
            .cloned()
            .zip(scores)
            .map(|(candidate, rank_score)| RankedCandidate {
                candidate,
                rank_score,
            })
            .collect();

        // Stable: ties keep original candidate order
        ranked.sort_by(|a, b| {
            b.rank_score
                .partial_cmp(&a.rank_score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        ranked.truncate(top_k);

        Ok(ranked)
    }
}

fn validate(candidate: &Candidate) -> PrismResult<()> {
    if candidate.text.trim().is_empty() {
        return Err(PrismError::MalformedCandidate { field: "text" });
    }
    if !candidate.score.is_finite() {
        return Err(PrismError::MalformedCandidate { field: "score" });
    }
    Ok(())
}
