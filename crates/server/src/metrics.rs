//! Per-query metrics collection and health reporting.
//!
//! Each answered query is appended to a JSONL log and mirrored into
//! in-memory series for quick percentile snapshots. Drift detection compares
//! the snapshot against configured baselines; the health endpoint reports
//! degraded status while any series drifts.

use chrono::{DateTime, Utc};
use prism_core::config::Baselines;
use prism_core::PrismResult;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// One logged query's metrics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryMetrics {
    /// Correlation id from the pipeline response
    pub query_id: String,

    /// When the query was recorded
    pub timestamp: DateTime<Utc>,

    /// Wall-clock latency of the pipeline call
    pub latency_ms: f64,

    /// Fraction of the corpus surfaced as candidates
    pub retrieval_recall: f64,

    /// Mean rank score over returned evidence
    pub rank_quality: f64,

    /// Whether the answer was refused
    pub refused: bool,

    /// Confidence of the answer
    pub confidence: f64,
}

/// Percentile summary of one metric series.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SeriesStats {
    pub p50: f64,
    pub p95: f64,
    pub mean: f64,
}

/// Aggregate snapshot over the collector's lifetime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    /// Queries recorded
    pub queries: usize,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<SeriesStats>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub retrieval_recall: Option<SeriesStats>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub rank_quality: Option<SeriesStats>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<SeriesStats>,

    /// Fraction of recorded queries that were refused
    pub refusal_rate: f64,
}

#[derive(Debug, Default)]
struct Series {
    latency_ms: Vec<f64>,
    retrieval_recall: Vec<f64>,
    rank_quality: Vec<f64>,
    confidence: Vec<f64>,
    refused: Vec<bool>,
}

/// Collects per-query metrics into a JSONL log and in-memory series.
#[derive(Debug)]
pub struct MetricsCollector {
    log_path: PathBuf,
    series: Mutex<Series>,
}

impl MetricsCollector {
    /// Create a collector writing to the given JSONL path.
    pub fn new(log_path: &Path) -> PrismResult<Self> {
        if let Some(parent) = log_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        Ok(Self {
            log_path: log_path.to_path_buf(),
            series: Mutex::new(Series::default()),
        })
    }

    /// Record one query's metrics.
    ///
    /// Log-write failures are reported but do not fail the caller: metrics
    /// are advisory, answers are not.
    pub fn record_query(&self, metrics: &QueryMetrics) {
        if let Err(e) = self.append(metrics) {
            tracing::warn!("Failed to append query metrics: {}", e);
        }

        let mut series = self.series.lock().unwrap();
        series.latency_ms.push(metrics.latency_ms);
        series.retrieval_recall.push(metrics.retrieval_recall);
        series.rank_quality.push(metrics.rank_quality);
        series.confidence.push(metrics.confidence);
        series.refused.push(metrics.refused);
    }

    fn append(&self, metrics: &QueryMetrics) -> PrismResult<()> {
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_path)?;
        writeln!(file, "{}", serde_json::to_string(metrics)?)?;
        Ok(())
    }

    /// Aggregate statistics over everything recorded so far.
    pub fn snapshot(&self) -> MetricsSnapshot {
        let series = self.series.lock().unwrap();

        let refusal_rate = if series.refused.is_empty() {
            0.0
        } else {
            series.refused.iter().filter(|&&r| r).count() as f64 / series.refused.len() as f64
        };

        MetricsSnapshot {
            queries: series.latency_ms.len(),
            latency_ms: summarize(&series.latency_ms),
            retrieval_recall: summarize(&series.retrieval_recall),
            rank_quality: summarize(&series.rank_quality),
            confidence: summarize(&series.confidence),
            refusal_rate,
        }
    }

    /// Compare the current snapshot against baselines.
    ///
    /// Returns a map from drifted series name to a human-readable reason;
    /// empty when healthy.
    pub fn detect_drift(&self, baselines: &Baselines) -> BTreeMap<String, String> {
        let snapshot = self.snapshot();
        let mut drift = BTreeMap::new();

        if let Some(latency) = snapshot.latency_ms {
            if latency.p95 > baselines.latency_p95_ms {
                drift.insert(
                    "latency".to_string(),
                    format!(
                        "P95 latency {:.1}ms above baseline {:.1}ms",
                        latency.p95, baselines.latency_p95_ms
                    ),
                );
            }
        }

        if let Some(recall) = snapshot.retrieval_recall {
            if recall.mean < baselines.recall_mean {
                drift.insert(
                    "recall".to_string(),
                    format!(
                        "Mean recall {:.2} below baseline {:.2}",
                        recall.mean, baselines.recall_mean
                    ),
                );
            }
        }

        if snapshot.queries > 0 && snapshot.refusal_rate > baselines.refusal_rate {
            drift.insert(
                "refusal".to_string(),
                format!(
                    "Refusal rate {:.2} above baseline {:.2}",
                    snapshot.refusal_rate, baselines.refusal_rate
                ),
            );
        }

        drift
    }
}

fn summarize(values: &[f64]) -> Option<SeriesStats> {
    if values.is_empty() {
        return None;
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let p95_index = ((sorted.len() as f64 * 0.95) as usize).min(sorted.len() - 1);

    Some(SeriesStats {
        p50: sorted[sorted.len() / 2],
        p95: sorted[p95_index],
        mean: values.iter().sum::<f64>() / values.len() as f64,
    })
}

/// Health status derived from uptime and metric drift.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthReport {
    /// "ok" or "degraded"
    pub status: String,

    /// Seconds since the service started
    pub uptime_seconds: f64,

    /// Drifted series, empty when healthy
    pub drift_detected: BTreeMap<String, String>,

    /// Report generation time
    pub timestamp: DateTime<Utc>,
}

/// Computes health reports from the metrics collector.
#[derive(Debug)]
pub struct HealthCheck {
    started_at: DateTime<Utc>,
    baselines: Baselines,
}

impl HealthCheck {
    pub fn new(baselines: Baselines) -> Self {
        Self {
            started_at: Utc::now(),
            baselines,
        }
    }

    /// Build a health report from the current metric state.
    pub fn report(&self, metrics: &MetricsCollector) -> HealthReport {
        let drift = metrics.detect_drift(&self.baselines);

        HealthReport {
            status: if drift.is_empty() { "ok" } else { "degraded" }.to_string(),
            uptime_seconds: (Utc::now() - self.started_at).num_milliseconds() as f64 / 1000.0,
            drift_detected: drift,
            timestamp: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn metrics(id: &str, latency: f64, recall: f64, refused: bool) -> QueryMetrics {
        QueryMetrics {
            query_id: id.to_string(),
            timestamp: Utc::now(),
            latency_ms: latency,
            retrieval_recall: recall,
            rank_quality: 0.5,
            refused,
            confidence: if refused { 0.2 } else { 0.8 },
        }
    }

    fn collector(dir: &TempDir) -> MetricsCollector {
        MetricsCollector::new(&dir.path().join("logs/metrics.jsonl")).unwrap()
    }

    #[test]
    fn test_snapshot_empty() {
        let dir = TempDir::new().unwrap();
        let snapshot = collector(&dir).snapshot();

        assert_eq!(snapshot.queries, 0);
        assert!(snapshot.latency_ms.is_none());
        assert_eq!(snapshot.refusal_rate, 0.0);
    }

    #[test]
    fn test_snapshot_percentiles() {
        let dir = TempDir::new().unwrap();
        let c = collector(&dir);

        for i in 1..=100 {
            c.record_query(&metrics(&format!("q{}", i), i as f64, 0.9, false));
        }

        let snapshot = c.snapshot();
        assert_eq!(snapshot.queries, 100);

        let latency = snapshot.latency_ms.unwrap();
        assert!((latency.p50 - 51.0).abs() <= 1.0);
        assert!((latency.p95 - 96.0).abs() <= 1.0);
        assert!((latency.mean - 50.5).abs() < 0.01);
    }

    #[test]
    fn test_metrics_appended_to_log() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("logs/metrics.jsonl");
        let c = MetricsCollector::new(&path).unwrap();

        c.record_query(&metrics("q1", 10.0, 1.0, false));
        c.record_query(&metrics("q2", 12.0, 1.0, true));

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents.lines().count(), 2);
        assert!(contents.contains("q1"));
    }

    #[test]
    fn test_no_drift_when_healthy() {
        let dir = TempDir::new().unwrap();
        let c = collector(&dir);
        c.record_query(&metrics("q1", 20.0, 0.9, false));

        let drift = c.detect_drift(&Baselines::default());
        assert!(drift.is_empty());
    }

    #[test]
    fn test_latency_drift_detected() {
        let dir = TempDir::new().unwrap();
        let c = collector(&dir);

        for i in 0..10 {
            c.record_query(&metrics(&format!("q{}", i), 900.0, 0.9, false));
        }

        let drift = c.detect_drift(&Baselines::default());
        assert!(drift.contains_key("latency"));
    }

    #[test]
    fn test_refusal_drift_detected() {
        let dir = TempDir::new().unwrap();
        let c = collector(&dir);

        for i in 0..10 {
            c.record_query(&metrics(&format!("q{}", i), 20.0, 0.9, i % 2 == 0));
        }

        let drift = c.detect_drift(&Baselines::default());
        assert!(drift.contains_key("refusal"));
    }

    #[test]
    fn test_health_degrades_on_drift() {
        let dir = TempDir::new().unwrap();
        let c = collector(&dir);
        let health = HealthCheck::new(Baselines::default());

        assert_eq!(health.report(&c).status, "ok");

        for i in 0..10 {
            c.record_query(&metrics(&format!("q{}", i), 2000.0, 0.9, false));
        }

        let report = health.report(&c);
        assert_eq!(report.status, "degraded");
        assert!(!report.drift_detected.is_empty());
        assert!(report.uptime_seconds >= 0.0);
    }
}
