//! Train command handler.
//!
//! Retrains the ranking model from the feedback log. Insufficient data is
//! reported and skipped, never a hard failure.

use clap::Args;
use prism_core::{AppConfig, PrismError, PrismResult};
use prism_engine::{FeedbackStore, TrainingPipeline};
use prism_engine::ranking::RankingModel;
use prism_engine::training::DEFAULT_EPOCHS;
use std::sync::Arc;

/// Retrain the ranking model from logged feedback
#[derive(Args, Debug)]
pub struct TrainCommand {
    /// Number of training epochs
    #[arg(long, default_value_t = DEFAULT_EPOCHS)]
    pub epochs: usize,
}

impl TrainCommand {
    /// Execute the train command.
    pub async fn execute(&self, config: &AppConfig) -> PrismResult<()> {
        let feedback = Arc::new(FeedbackStore::open(&config.feedback_log)?);
        let model = Arc::new(RankingModel::load_or_init(config.model_path.clone()));

        let pipeline = TrainingPipeline::new(
            feedback,
            model,
            config.min_feedback,
            config.training_log.clone(),
        );

        match pipeline.run(self.epochs) {
            Ok(report) => {
                println!(
                    "Trained model {} on {} samples from {} queries ({} epochs)",
                    report.version, report.samples, report.groups, report.epochs
                );
                Ok(())
            }
            Err(e @ PrismError::TrainingDataInsufficient { .. }) => {
                tracing::warn!("{}", e);
                println!("Training skipped: {}", e);
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}
