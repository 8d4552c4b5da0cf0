//! Prism answering engine.
//!
//! Implements the retrieve → re-rank → synthesize pipeline over an immutable
//! document corpus: hybrid candidate retrieval (lexical + semantic), learned
//! ranking with a deterministic fallback, and confidence-gated answer
//! synthesis with mandatory citations and a refusal policy.

pub mod answer;
pub mod corpus;
pub mod embeddings;
pub mod feedback;
pub mod pipeline;
pub mod ranking;
pub mod retrieval;
pub mod training;
pub mod types;

#[cfg(test)]
mod tests;

// Re-export commonly used types
pub use answer::ConstrainedSynthesizer;
pub use corpus::Corpus;
pub use feedback::{FeedbackStats, FeedbackStore};
pub use pipeline::{Pipeline, QueryOutcome};
pub use training::{TrainingPipeline, TrainingReport};
pub use types::{Answer, Candidate, PipelineResponse, RankedCandidate};
