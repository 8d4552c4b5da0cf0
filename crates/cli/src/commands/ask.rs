//! Ask command handler.
//!
//! Answers a single question from the command line, printing either a human
//! summary or the raw JSON response.

use clap::Args;
use prism_core::{AppConfig, PrismError, PrismResult};
use prism_engine::{Corpus, Pipeline};

/// Answer one question from the command line
#[derive(Args, Debug)]
pub struct AskCommand {
    /// The question to ask
    pub query: Option<String>,

    /// Output the raw response as JSON
    #[arg(long)]
    pub json: bool,
}

impl AskCommand {
    /// Execute the ask command.
    pub async fn execute(&self, config: &AppConfig) -> PrismResult<()> {
        let query = self
            .query
            .as_deref()
            .ok_or_else(|| PrismError::Config("No question provided".to_string()))?;

        let corpus = Corpus::load(&config.corpus_path)?;
        let pipeline = Pipeline::new(config, corpus).await?;

        let response = pipeline.answer_for(query).await;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&response)?);
            return Ok(());
        }

        if response.refused {
            println!("No answer (confidence {:.2}).", response.confidence);
        } else {
            // answer is always present when not refused
            if let Some(answer) = &response.answer {
                println!("{}", answer);
            }
            println!();
            println!("Confidence: {:.2}", response.confidence);
            if !response.citations.is_empty() {
                println!("Citations:");
                for citation in &response.citations {
                    println!("  - {}", citation);
                }
            }
        }

        Ok(())
    }
}
