//! Engine type definitions.
//!
//! Candidates and answers are explicit tagged records, validated at the
//! retrieval/ranking boundary. They are created fresh per query and never
//! cached or mutated across queries.

use serde::{Deserialize, Serialize};

/// A retrieval hit: a document plus its relevance score.
///
/// `score` is retriever-specific and not comparable across retrievers until
/// fused. The optional `dense_score`/`sparse_score` fields carry retriever
/// provenance through fusion so the ranking features do not have to re-derive
/// them from the fused score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candidate {
    /// Document text
    pub text: String,

    /// Retrieval score (fused score after hybrid merge)
    pub score: f32,

    /// Semantic similarity, when the semantic retriever returned this text
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dense_score: Option<f32>,

    /// Lexical relevance, when the lexical retriever returned this text
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sparse_score: Option<f32>,
}

impl Candidate {
    /// Create a candidate with no retriever provenance.
    pub fn new(text: impl Into<String>, score: f32) -> Self {
        Self {
            text: text.into(),
            score,
            dense_score: None,
            sparse_score: None,
        }
    }

    /// Create a candidate produced by the semantic retriever.
    pub fn dense(text: impl Into<String>, score: f32) -> Self {
        Self {
            text: text.into(),
            score,
            dense_score: Some(score),
            sparse_score: None,
        }
    }

    /// Create a candidate produced by the lexical retriever.
    pub fn sparse(text: impl Into<String>, score: f32) -> Self {
        Self {
            text: text.into(),
            score,
            dense_score: None,
            sparse_score: Some(score),
        }
    }
}

/// A candidate extended with a ranking-model score.
///
/// Produced only by the ranking layer. A set of ranked candidates is totally
/// ordered by `rank_score` descending, ties broken by original candidate
/// order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankedCandidate {
    /// The underlying retrieval candidate
    pub candidate: Candidate,

    /// Usefulness score from the ranking model
    pub rank_score: f32,
}

/// Outcome of constrained answer synthesis.
///
/// Invariants: `refused == true` implies `answer` is `None` and `citations`
/// is empty; `refused == false` implies `confidence` met the gate threshold.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Answer {
    /// Synthesized answer text, absent on refusal
    pub answer: Option<String>,

    /// Evidence excerpts backing the answer, in rank order
    pub citations: Vec<String>,

    /// Confidence in [0, 1]
    pub confidence: f32,

    /// Whether the answer was withheld
    pub refused: bool,

    /// Human-readable reason for refusal
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl Answer {
    /// Create a refusal with the given confidence and reason.
    pub fn refusal(confidence: f32, reason: impl Into<String>) -> Self {
        Self {
            answer: None,
            citations: Vec::new(),
            confidence,
            refused: true,
            reason: Some(reason.into()),
        }
    }

    /// Create an accepted answer with its citations.
    pub fn accepted(text: String, citations: Vec<String>, confidence: f32) -> Self {
        Self {
            answer: Some(text),
            citations,
            confidence,
            refused: false,
            reason: None,
        }
    }
}

/// External response shape for one answered query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineResponse {
    /// Fresh unique identifier for this call, used for logging correlation
    pub query_id: String,

    /// Synthesized answer text, absent on refusal
    pub answer: Option<String>,

    /// Evidence excerpts backing the answer
    pub citations: Vec<String>,

    /// Confidence in [0, 1]
    pub confidence: f32,

    /// Whether the answer was withheld
    pub refused: bool,

    /// Wall-clock latency of the whole pipeline call
    pub latency_ms: f64,
}
