//! HTTP routes for the Prism API.
//!
//! Handlers delegate to the pipeline and the feedback/metrics collaborators.
//! Pipeline failures never surface as HTTP errors: they arrive here already
//! absorbed into refusal responses.

use crate::metrics::{HealthCheck, MetricsCollector, QueryMetrics};
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use prism_engine::{FeedbackStore, Pipeline, PipelineResponse};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Shared state passed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<Pipeline>,
    pub feedback: Arc<FeedbackStore>,
    pub metrics: Arc<MetricsCollector>,
    pub health: Arc<HealthCheck>,
}

#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    pub query: String,
}

#[derive(Debug, Deserialize)]
pub struct FeedbackRequest {
    pub query_id: String,
    pub helpful: bool,
    #[serde(default)]
    pub feedback: Option<String>,
}

/// Build the API router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/query", post(query))
        .route("/health", get(health))
        .route("/metrics", get(metrics))
        .route("/feedback", post(feedback))
        .route("/feedback/stats", get(feedback_stats))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Answer a query about product metrics.
async fn query(
    State(state): State<AppState>,
    Json(request): Json<QueryRequest>,
) -> Json<PipelineResponse> {
    let outcome = state.pipeline.execute(&request.query).await;

    state.metrics.record_query(&QueryMetrics {
        query_id: outcome.response.query_id.clone(),
        timestamp: Utc::now(),
        latency_ms: outcome.response.latency_ms,
        retrieval_recall: outcome.retrieval_recall,
        rank_quality: outcome.rank_quality,
        refused: outcome.response.refused,
        confidence: outcome.response.confidence as f64,
    });

    // Interaction logging is advisory; a full feedback log must not block
    // the answer
    if let Err(e) = state
        .feedback
        .log_interaction(&request.query, &outcome.response)
    {
        tracing::warn!("Failed to log interaction: {}", e);
    }

    Json(outcome.response)
}

/// System health and drift detection.
async fn health(State(state): State<AppState>) -> Json<Value> {
    let report = state.health.report(&state.metrics);

    let message = if report.status == "ok" {
        "System operational"
    } else {
        "System degraded - check metrics"
    };

    Json(json!({
        "status": report.status,
        "uptime_seconds": report.uptime_seconds,
        "drift_detected": report.drift_detected,
        "message": message,
    }))
}

/// Current system metrics.
async fn metrics(State(state): State<AppState>) -> Json<crate::metrics::MetricsSnapshot> {
    Json(state.metrics.snapshot())
}

/// Submit feedback on an answer.
async fn feedback(
    State(state): State<AppState>,
    Json(request): Json<FeedbackRequest>,
) -> (StatusCode, Json<Value>) {
    match state
        .feedback
        .log_feedback(&request.query_id, request.helpful, request.feedback)
    {
        Ok(true) => (
            StatusCode::OK,
            Json(json!({
                "status": "feedback recorded",
                "query_id": request.query_id,
            })),
        ),
        Ok(false) => (
            StatusCode::NOT_FOUND,
            Json(json!({
                "error": format!("Unknown query_id: {}", request.query_id),
            })),
        ),
        Err(e) => {
            tracing::error!("Failed to record feedback: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Failed to record feedback" })),
            )
        }
    }
}

/// Feedback statistics.
async fn feedback_stats(State(state): State<AppState>) -> Json<prism_engine::FeedbackStats> {
    Json(state.feedback.stats())
}

#[cfg(test)]
mod tests {
    use super::*;
    use prism_core::config::Baselines;
    use prism_core::AppConfig;
    use prism_engine::Corpus;
    use tempfile::TempDir;

    async fn test_state(dir: &TempDir, docs: Vec<String>) -> AppState {
        let mut config = AppConfig::default();
        config.model_path = dir.path().join("models/ranker.json");
        config.embedding.dimensions = 128;

        let pipeline = Pipeline::new(&config, Corpus::from_documents(docs))
            .await
            .unwrap();

        AppState {
            pipeline: Arc::new(pipeline),
            feedback: Arc::new(
                FeedbackStore::open(&dir.path().join("logs/feedback.jsonl")).unwrap(),
            ),
            metrics: Arc::new(
                MetricsCollector::new(&dir.path().join("logs/metrics.jsonl")).unwrap(),
            ),
            health: Arc::new(HealthCheck::new(Baselines::default())),
        }
    }

    #[tokio::test]
    async fn test_query_records_metrics_and_interaction() {
        let dir = TempDir::new().unwrap();
        let state = test_state(
            &dir,
            vec!["Onboarding redesign in March caused a 20% activation drop".to_string()],
        )
        .await;

        let response = query(
            State(state.clone()),
            Json(QueryRequest {
                query: "activation drop in march".to_string(),
            }),
        )
        .await;

        assert!(!response.0.query_id.is_empty());
        assert_eq!(state.metrics.snapshot().queries, 1);
        assert_eq!(state.feedback.stats().total_interactions, 1);

        // Citations trace back to the served corpus
        for citation in &response.0.citations {
            let stem = citation.trim_end_matches("...");
            assert!(state
                .pipeline
                .corpus()
                .documents()
                .iter()
                .any(|d| d.contains(stem)));
        }
    }

    #[tokio::test]
    async fn test_feedback_roundtrip() {
        let dir = TempDir::new().unwrap();
        let state = test_state(&dir, vec!["signup conversions doubled".to_string()]).await;

        let response = query(
            State(state.clone()),
            Json(QueryRequest {
                query: "signup conversions".to_string(),
            }),
        )
        .await;
        let query_id = response.0.query_id.clone();

        let (status, _body) = feedback(
            State(state.clone()),
            Json(FeedbackRequest {
                query_id: query_id.clone(),
                helpful: true,
                feedback: Some("useful".to_string()),
            }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let stats = state.feedback.stats();
        assert_eq!(stats.total_interactions, 1);
        assert!((stats.helpful_rate - 1.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_feedback_unknown_id_is_not_found() {
        let dir = TempDir::new().unwrap();
        let state = test_state(&dir, vec!["a document".to_string()]).await;

        let (status, _body) = feedback(
            State(state),
            Json(FeedbackRequest {
                query_id: "does-not-exist".to_string(),
                helpful: false,
                feedback: None,
            }),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_health_reports_ok_without_traffic() {
        let dir = TempDir::new().unwrap();
        let state = test_state(&dir, vec!["a document".to_string()]).await;

        let body = health(State(state)).await;
        assert_eq!(body.0["status"], "ok");
    }
}
