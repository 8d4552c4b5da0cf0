//! Ranking model training from logged feedback.
//!
//! Builds listwise training data out of the feedback log: interactions are
//! grouped by query, labeled by user feedback, and fed to the ranking model.
//! Too little data skips training and reports it; it is never fatal to the
//! serving path.

use crate::feedback::{FeedbackStore, InteractionRecord};
use crate::ranking::features::FeatureVector;
use crate::ranking::RankingModel;
use chrono::{DateTime, Utc};
use prism_core::{PrismError, PrismResult};
use serde::Serialize;
use std::collections::BTreeMap;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

/// Default number of training epochs.
pub const DEFAULT_EPOCHS: usize = 100;

/// Result of one training run.
#[derive(Debug, Clone, Serialize)]
pub struct TrainingReport {
    /// Feature rows used
    pub samples: usize,

    /// Query groups used
    pub groups: usize,

    /// Epochs run
    pub epochs: usize,

    /// Version of the persisted model
    pub version: String,

    /// When training finished
    pub trained_at: DateTime<Utc>,
}

/// One appended line of the training event log.
#[derive(Debug, Serialize)]
struct TrainingEvent<'a> {
    timestamp: DateTime<Utc>,
    version: &'a str,
    n_samples: usize,
    n_groups: usize,
    epochs: usize,
    features_mean: Vec<f32>,
    labels_mean: f32,
    labels_std: f32,
}

/// Extracts training data from feedback and retrains the ranking model.
pub struct TrainingPipeline {
    feedback: Arc<FeedbackStore>,
    model: Arc<RankingModel>,
    min_feedback: usize,
    training_log: PathBuf,
}

impl TrainingPipeline {
    pub fn new(
        feedback: Arc<FeedbackStore>,
        model: Arc<RankingModel>,
        min_feedback: usize,
        training_log: PathBuf,
    ) -> Self {
        Self {
            feedback,
            model,
            min_feedback,
            training_log,
        }
    }

    /// Run one training pass over the current feedback log.
    ///
    /// # Errors
    /// `TrainingDataInsufficient` when fewer than the configured minimum of
    /// labeled interactions exist, or when no query group holds at least two
    /// interactions.
    pub fn run(&self, epochs: usize) -> PrismResult<TrainingReport> {
        let records = self.feedback.records();

        if records.len() < self.min_feedback {
            return Err(PrismError::TrainingDataInsufficient {
                have: records.len(),
                need: self.min_feedback,
            });
        }

        let (features, labels, group_sizes) = build_training_data(&records);

        if features.is_empty() {
            return Err(PrismError::TrainingDataInsufficient {
                have: 0,
                need: self.min_feedback,
            });
        }

        tracing::info!(
            "Training on {} samples from {} query groups",
            features.len(),
            group_sizes.len()
        );

        let metadata = self.model.train(&features, &labels, &group_sizes, epochs)?;

        let report = TrainingReport {
            samples: features.len(),
            groups: group_sizes.len(),
            epochs,
            version: metadata.version,
            trained_at: metadata.created_at,
        };

        self.append_event(&report, &features, &labels)?;

        Ok(report)
    }

    fn append_event(
        &self,
        report: &TrainingReport,
        features: &[FeatureVector],
        labels: &[f32],
    ) -> PrismResult<()> {
        let n = features.len() as f32;

        let mut features_mean = vec![0.0f32; crate::ranking::FEATURE_COUNT];
        for row in features {
            for (acc, value) in features_mean.iter_mut().zip(row.iter()) {
                *acc += value / n;
            }
        }

        let labels_mean = labels.iter().sum::<f32>() / n;
        let labels_var =
            labels.iter().map(|l| (l - labels_mean).powi(2)).sum::<f32>() / n;

        let event = TrainingEvent {
            timestamp: report.trained_at,
            version: &report.version,
            n_samples: report.samples,
            n_groups: report.groups,
            epochs: report.epochs,
            features_mean,
            labels_mean,
            labels_std: labels_var.sqrt(),
        };

        if let Some(parent) = self.training_log.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.training_log)?;
        writeln!(file, "{}", serde_json::to_string(&event)?)?;

        Ok(())
    }
}

/// Build (features, labels, group_sizes) from logged interactions.
///
/// Interactions are grouped by query text (deterministic order); groups with
/// fewer than two interactions carry no ranking signal and are dropped. The
/// label is `helpful · confidence`, zeroed for refusals.
fn build_training_data(
    records: &[InteractionRecord],
) -> (Vec<FeatureVector>, Vec<f32>, Vec<usize>) {
    let mut by_query: BTreeMap<&str, Vec<&InteractionRecord>> = BTreeMap::new();
    for record in records {
        by_query.entry(record.query.as_str()).or_default().push(record);
    }

    let mut features = Vec::new();
    let mut labels = Vec::new();
    let mut group_sizes = Vec::new();

    for (_query, mut group) in by_query {
        if group.len() < 2 {
            continue;
        }

        // Deterministic row order regardless of index iteration order
        group.sort_by(|a, b| a.interaction_id.cmp(&b.interaction_id));

        for record in &group {
            let label = label_for(record);
            let answer_chars = record
                .answer
                .as_deref()
                .map(|a| a.chars().count())
                .unwrap_or(0) as f32;

            // Feature proxies reconstructed from the logged interaction; the
            // original documents are not retained in the log
            features.push([
                record.confidence,
                record.confidence * 0.9,
                (answer_chars / 100.0).min(1.0),
                (record.citations.len() as f32 / 3.0).min(1.0),
                0.9,
                label,
            ]);
            labels.push(label);
        }

        group_sizes.push(group.len());
    }

    (features, labels, group_sizes)
}

fn label_for(record: &InteractionRecord) -> f32 {
    if record.refused {
        return 0.0;
    }

    let helpful = record
        .user_feedback
        .as_ref()
        .map(|f| f.helpful)
        .unwrap_or(false);

    if helpful {
        record.confidence
    } else {
        0.0
    }
}
