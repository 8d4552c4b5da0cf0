//! Pipeline orchestration: retrieve → rank → synthesize.
//!
//! The pipeline is an explicit context object constructed once at process
//! start and shared behind `Arc`. Each query runs the full chain to
//! completion with no shared mutable state, so concurrent queries are
//! independent.

use crate::answer::ConstrainedSynthesizer;
use crate::corpus::Corpus;
use crate::embeddings;
use crate::ranking::{ModelMetadata, RankingModel, RankingOrchestrator};
use crate::retrieval::{HybridRetriever, LexicalRetriever, LexicalScorer, SemanticRetriever};
use crate::types::{Answer, PipelineResponse};
use prism_core::{AppConfig, PrismError, PrismResult};
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

/// One answered query plus the per-query quality proxies the caller logs.
#[derive(Debug, Clone)]
pub struct QueryOutcome {
    /// External response shape
    pub response: PipelineResponse,

    /// Fraction of the corpus surfaced as candidates (recall proxy)
    pub retrieval_recall: f64,

    /// Mean rank score over the returned evidence (rank quality proxy)
    pub rank_quality: f64,
}

/// The retrieve → rank → synthesize pipeline over an immutable corpus.
pub struct Pipeline {
    corpus: Arc<Corpus>,
    hybrid: HybridRetriever,
    orchestrator: RankingOrchestrator,
    synthesizer: ConstrainedSynthesizer,
    model: Arc<RankingModel>,
    rank_top_k: usize,
}

impl Pipeline {
    /// Build the pipeline from configuration and a loaded corpus.
    ///
    /// Document embeddings are computed here, once; the corpus and model are
    /// read-only afterwards.
    pub async fn new(config: &AppConfig, corpus: Corpus) -> PrismResult<Self> {
        let corpus = Arc::new(corpus);

        let scorer = LexicalScorer::from_name(&config.lexical_scorer).ok_or_else(|| {
            PrismError::Config(format!("Unknown lexical scorer: {}", config.lexical_scorer))
        })?;
        let lexical = LexicalRetriever::new(Arc::clone(&corpus), scorer);

        let provider = embeddings::create_provider(&config.embedding).await?;
        let semantic = SemanticRetriever::new(Arc::clone(&corpus), provider).await?;

        let hybrid = HybridRetriever::new(lexical, semantic, config.retrieval_top_k);

        let model = Arc::new(RankingModel::load_or_init(config.model_path.clone()));
        let orchestrator = RankingOrchestrator::new(Arc::clone(&model));

        let synthesizer =
            ConstrainedSynthesizer::new(config.confidence_threshold, config.max_answer_chars);

        tracing::info!(
            "Pipeline ready: {} documents, ranking model {}",
            corpus.len(),
            model.metadata().version
        );

        Ok(Self {
            corpus,
            hybrid,
            orchestrator,
            synthesizer,
            model,
            rank_top_k: config.rank_top_k,
        })
    }

    /// Answer a query, returning the external response shape.
    pub async fn answer_for(&self, query: &str) -> PipelineResponse {
        self.execute(query).await.response
    }

    /// Answer a query and expose the per-query quality proxies for logging.
    ///
    /// Internal failures are absorbed into a refusal with the error as the
    /// reason; this surface never returns a raw error.
    pub async fn execute(&self, query: &str) -> QueryOutcome {
        let query_id = Uuid::new_v4().to_string();
        let start = Instant::now();

        let (answer, retrieval_recall, rank_quality) = match self.run(query).await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::warn!("Pipeline error for query {}: {}", query_id, e);
                (Answer::refusal(0.0, e.to_string()), 0.0, 0.0)
            }
        };

        let latency_ms = start.elapsed().as_secs_f64() * 1000.0;

        tracing::info!(
            "Query {} answered in {:.1}ms (refused: {}, confidence: {:.2})",
            query_id,
            latency_ms,
            answer.refused,
            answer.confidence
        );

        QueryOutcome {
            response: PipelineResponse {
                query_id,
                answer: answer.answer,
                citations: answer.citations,
                confidence: answer.confidence,
                refused: answer.refused,
                latency_ms,
            },
            retrieval_recall,
            rank_quality,
        }
    }

    async fn run(&self, query: &str) -> PrismResult<(Answer, f64, f64)> {
        let candidates = self.hybrid.search(query).await?;

        let ranked = self
            .orchestrator
            .rank_candidates(query, &candidates, self.rank_top_k)?;

        let retrieval_recall = if self.corpus.is_empty() {
            0.0
        } else {
            (candidates.len() as f64 / self.corpus.len() as f64).min(1.0)
        };

        let rank_quality = if ranked.is_empty() {
            0.0
        } else {
            ranked.iter().map(|r| r.rank_score as f64).sum::<f64>() / ranked.len() as f64
        };

        let answer = self.synthesizer.synthesize(query, &ranked);

        Ok((answer, retrieval_recall, rank_quality))
    }

    /// The corpus this pipeline serves.
    pub fn corpus(&self) -> &Arc<Corpus> {
        &self.corpus
    }

    /// Handle to the ranking model, for training and stats surfaces.
    pub fn model(&self) -> &Arc<RankingModel> {
        &self.model
    }

    /// Ranking model metadata (version, creation time, mode).
    pub fn model_metadata(&self) -> ModelMetadata {
        self.model.metadata()
    }
}
