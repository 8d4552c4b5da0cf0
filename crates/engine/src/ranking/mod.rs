//! Candidate ranking: feature extraction, scoring model, orchestration.

pub mod features;
pub mod model;
pub mod orchestrator;

pub use features::{FeatureVector, FEATURE_COUNT};
pub use model::{ModelMetadata, RankingModel};
pub use orchestrator::RankingOrchestrator;
