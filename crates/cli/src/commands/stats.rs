//! Stats command handler.
//!
//! Shows corpus, ranking model, and feedback statistics.

use clap::Args;
use prism_core::{AppConfig, PrismResult};
use prism_engine::ranking::RankingModel;
use prism_engine::{Corpus, FeedbackStore};
use serde_json::json;

/// Show corpus, model, and feedback statistics
#[derive(Args, Debug)]
pub struct StatsCommand {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl StatsCommand {
    /// Execute the stats command.
    pub async fn execute(&self, config: &AppConfig) -> PrismResult<()> {
        let corpus = Corpus::load(&config.corpus_path)?;
        let model = RankingModel::load_or_init(config.model_path.clone());
        let metadata = model.metadata();
        let feedback = FeedbackStore::open(&config.feedback_log)?;
        let feedback_stats = feedback.stats();

        if self.json {
            let stats = json!({
                "corpus": {
                    "documents": corpus.len(),
                    "fingerprint": corpus.fingerprint(),
                    "path": config.corpus_path,
                },
                "model": metadata,
                "feedback": feedback_stats,
            });
            println!("{}", serde_json::to_string_pretty(&stats)?);
            return Ok(());
        }

        println!("Corpus: {} documents ({:?})", corpus.len(), config.corpus_path);
        println!("  fingerprint: {}", corpus.fingerprint());
        println!(
            "Ranking model: {} (trained: {}, created {})",
            metadata.version, metadata.trained, metadata.created_at
        );
        println!(
            "Feedback: {} interactions, {:.0}% refused, {:.0}% helpful",
            feedback_stats.total_interactions,
            feedback_stats.refused_rate * 100.0,
            feedback_stats.helpful_rate * 100.0
        );

        Ok(())
    }
}
