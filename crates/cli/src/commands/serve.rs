//! Serve command handler.
//!
//! Loads the corpus, builds the pipeline and its collaborators, and runs the
//! HTTP API until interrupted.

use clap::Args;
use prism_core::{AppConfig, PrismResult};
use prism_engine::{Corpus, FeedbackStore, Pipeline};
use prism_server::{AppState, HealthCheck, MetricsCollector};
use std::sync::Arc;

/// Run the HTTP API service
#[derive(Args, Debug)]
pub struct ServeCommand {
    /// Bind address override (e.g. 0.0.0.0:8080)
    #[arg(long)]
    pub bind: Option<String>,
}

impl ServeCommand {
    /// Execute the serve command.
    pub async fn execute(&self, config: &AppConfig) -> PrismResult<()> {
        let corpus = Corpus::load(&config.corpus_path)?;
        tracing::info!(
            "Serving {} documents (fingerprint {})",
            corpus.len(),
            &corpus.fingerprint()[..12]
        );

        let pipeline = Pipeline::new(config, corpus).await?;

        let state = AppState {
            pipeline: Arc::new(pipeline),
            feedback: Arc::new(FeedbackStore::open(&config.feedback_log)?),
            metrics: Arc::new(MetricsCollector::new(&config.metrics_log)?),
            health: Arc::new(HealthCheck::new(config.baselines.clone())),
        };

        let bind = self.bind.as_deref().unwrap_or(&config.server_bind);
        prism_server::serve(bind, state).await
    }
}
