//! Learned-to-rank scoring model with a deterministic fallback.
//!
//! The model is a two-variant sum type chosen once at construction by
//! probing the artifact path: `Trained` (weights fitted from labeled
//! interactions) or `Fallback` (fixed weights). Both variants return one
//! score per input row, aligned to input order; callers cannot observe which
//! variant is active except through [`RankingModel::metadata`].
//!
//! Training is listwise, grouped by query: within each group, every
//! label-discordant pair contributes a pairwise logistic gradient step.
//! Fitting is deterministic (fixed initialization, fixed learning rate,
//! fixed iteration order).

use crate::ranking::features::{FeatureVector, FEATURE_COUNT};
use chrono::{DateTime, Utc};
use prism_core::{PrismError, PrismResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, RwLock};

/// Fallback linear weights over the six features.
///
/// Dense and sparse similarity dominate by design: they carry the direct
/// relevance signal. Weights sum to 1.
pub const FALLBACK_WEIGHTS: [f32; FEATURE_COUNT] = [0.45, 0.35, 0.01, 0.10, 0.05, 0.04];

/// Gradient step size for pairwise training.
const LEARNING_RATE: f32 = 0.05;

/// Persisted model artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ModelArtifact {
    version: String,
    created_at: DateTime<Utc>,
    weights: Vec<f32>,
}

#[derive(Debug, Clone)]
enum ModelState {
    Trained {
        weights: [f32; FEATURE_COUNT],
        version: String,
        created_at: DateTime<Utc>,
    },
    Fallback,
}

/// Model metadata exposed to callers and the stats surface.
#[derive(Debug, Clone, Serialize)]
pub struct ModelMetadata {
    /// Version identifier of the loaded artifact, or "fallback"
    pub version: String,

    /// Artifact creation time (process start time in fallback mode)
    pub created_at: DateTime<Utc>,

    /// Artifact location
    pub path: PathBuf,

    /// Whether a trained artifact is active
    pub trained: bool,
}

/// Ranking model handle, safe to share across concurrent queries.
///
/// `rank` takes a read lock only; `train` holds a dedicated lock across
/// fit + save + state swap so concurrent training calls are serialized and
/// cannot interleave artifact writes.
#[derive(Debug)]
pub struct RankingModel {
    path: PathBuf,
    state: RwLock<ModelState>,
    train_lock: Mutex<()>,
    initialized_at: DateTime<Utc>,
}

impl RankingModel {
    /// Probe the artifact path and construct in `Trained` or `Fallback` mode.
    ///
    /// A missing artifact is the normal cold start. A present-but-unloadable
    /// artifact is logged as a degraded-mode notice; it is never fatal.
    pub fn load_or_init(path: PathBuf) -> Self {
        let state = if path.exists() {
            match Self::load_artifact(&path) {
                Ok(artifact) => {
                    tracing::info!(
                        "Loaded ranking model {} (created {})",
                        artifact.version,
                        artifact.created_at
                    );
                    let mut weights = [0.0; FEATURE_COUNT];
                    weights.copy_from_slice(&artifact.weights);
                    ModelState::Trained {
                        weights,
                        version: artifact.version,
                        created_at: artifact.created_at,
                    }
                }
                Err(e) => {
                    let e = PrismError::ModelUnavailable(e.to_string());
                    tracing::warn!("{}; scoring with deterministic fallback weights", e);
                    ModelState::Fallback
                }
            }
        } else {
            tracing::debug!(
                "No ranking model artifact at {:?}; scoring with deterministic fallback weights",
                path
            );
            ModelState::Fallback
        };

        Self {
            path,
            state: RwLock::new(state),
            train_lock: Mutex::new(()),
            initialized_at: Utc::now(),
        }
    }

    fn load_artifact(path: &Path) -> PrismResult<ModelArtifact> {
        let contents = std::fs::read_to_string(path)?;
        let artifact: ModelArtifact = serde_json::from_str(&contents)?;

        if artifact.weights.len() != FEATURE_COUNT {
            return Err(PrismError::ModelUnavailable(format!(
                "artifact at {:?} has {} weights, expected {}",
                path,
                artifact.weights.len(),
                FEATURE_COUNT
            )));
        }

        Ok(artifact)
    }

    /// Score feature rows, returning one score per row aligned to input
    /// order. Callers attach scores back to their candidates by index.
    pub fn rank(&self, features: &[FeatureVector]) -> Vec<f32> {
        let weights = match &*self.state.read().unwrap() {
            ModelState::Trained { weights, .. } => *weights,
            ModelState::Fallback => FALLBACK_WEIGHTS,
        };

        features.iter().map(|row| dot(row, &weights)).collect()
    }

    /// Fit the model on labeled feature rows grouped by query, persist the
    /// artifact, and switch to `Trained` mode.
    ///
    /// `group_sizes` must sum to the number of feature rows; each group is
    /// one query's candidate list.
    pub fn train(
        &self,
        features: &[FeatureVector],
        labels: &[f32],
        group_sizes: &[usize],
        epochs: usize,
    ) -> PrismResult<ModelMetadata> {
        if labels.len() != features.len() {
            return Err(PrismError::Other(format!(
                "training labels ({}) do not match feature rows ({})",
                labels.len(),
                features.len()
            )));
        }

        let grouped: usize = group_sizes.iter().sum();
        if grouped != features.len() {
            return Err(PrismError::Other(format!(
                "training group sizes sum to {} but feature matrix has {} rows",
                grouped,
                features.len()
            )));
        }

        // Single-writer discipline: fit, save, and swap under one lock
        let _guard = self.train_lock.lock().unwrap();

        let weights = fit(features, labels, group_sizes, epochs);

        let created_at = Utc::now();
        let version = format!("v{}", created_at.format("%Y%m%d%H%M%S"));
        let artifact = ModelArtifact {
            version: version.clone(),
            created_at,
            weights: weights.to_vec(),
        };

        self.save(&artifact)?;

        *self.state.write().unwrap() = ModelState::Trained {
            weights,
            version,
            created_at,
        };

        tracing::info!(
            "Trained ranking model {} on {} rows in {} groups",
            artifact.version,
            features.len(),
            group_sizes.len()
        );

        Ok(self.metadata())
    }

    /// Write the artifact atomically: temp file then rename.
    fn save(&self, artifact: &ModelArtifact) -> PrismResult<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let tmp_path = self.path.with_extension("json.tmp");
        let contents = serde_json::to_string_pretty(artifact)?;
        std::fs::write(&tmp_path, contents)?;
        std::fs::rename(&tmp_path, &self.path)?;

        Ok(())
    }

    /// The only surface through which the active mode is observable.
    pub fn metadata(&self) -> ModelMetadata {
        match &*self.state.read().unwrap() {
            ModelState::Trained {
                version,
                created_at,
                ..
            } => ModelMetadata {
                version: version.clone(),
                created_at: *created_at,
                path: self.path.clone(),
                trained: true,
            },
            ModelState::Fallback => ModelMetadata {
                version: "fallback".to_string(),
                created_at: self.initialized_at,
                path: self.path.clone(),
                trained: false,
            },
        }
    }
}

/// Pairwise logistic fitting within each group.
///
/// For every pair whose labels differ, nudge the weights toward scoring the
/// higher-labeled row above the lower-labeled one. Initialization starts
/// from the fallback weights so an undertrained model degrades gracefully.
fn fit(
    features: &[FeatureVector],
    labels: &[f32],
    group_sizes: &[usize],
    epochs: usize,
) -> [f32; FEATURE_COUNT] {
    let mut weights = FALLBACK_WEIGHTS;

    for _ in 0..epochs {
        let mut offset = 0;
        for &size in group_sizes {
            for i in offset..offset + size {
                for j in (i + 1)..offset + size {
                    if labels[i] == labels[j] {
                        continue;
                    }
                    let (hi, lo) = if labels[i] > labels[j] { (i, j) } else { (j, i) };

                    let margin = dot(&features[hi], &weights) - dot(&features[lo], &weights);
                    let grad = sigmoid(-margin);

                    for k in 0..FEATURE_COUNT {
                        weights[k] += LEARNING_RATE * grad * (features[hi][k] - features[lo][k]);
                    }
                }
            }
            offset += size;
        }
    }

    weights
}

fn dot(row: &FeatureVector, weights: &[f32; FEATURE_COUNT]) -> f32 {
    row.iter().zip(weights.iter()).map(|(x, w)| x * w).sum()
}

fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn model_path(dir: &TempDir) -> PathBuf {
        dir.path().join("models/ranker.json")
    }

    #[test]
    fn test_missing_artifact_starts_in_fallback() {
        let dir = TempDir::new().unwrap();
        let model = RankingModel::load_or_init(model_path(&dir));

        let meta = model.metadata();
        assert!(!meta.trained);
        assert_eq!(meta.version, "fallback");
    }

    #[test]
    fn test_corrupt_artifact_degrades_to_fallback() {
        let dir = TempDir::new().unwrap();
        let path = model_path(&dir);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "not json at all").unwrap();

        let model = RankingModel::load_or_init(path);
        assert!(!model.metadata().trained);
    }

    #[test]
    fn test_rank_returns_aligned_scores() {
        let dir = TempDir::new().unwrap();
        let model = RankingModel::load_or_init(model_path(&dir));

        let features = vec![
            [0.9, 0.9, 0.5, 1.0, 1.0, 0.5],
            [0.1, 0.1, 0.5, 0.0, 1.0, 0.5],
            [0.5, 0.5, 0.5, 0.5, 1.0, 0.5],
        ];

        let scores = model.rank(&features);
        assert_eq!(scores.len(), 3);
        // Scores align with rows: the strong row scores highest at index 0,
        // the weak row lowest at index 1
        assert!(scores[0] > scores[2]);
        assert!(scores[2] > scores[1]);
    }

    #[test]
    fn test_rank_empty_input() {
        let dir = TempDir::new().unwrap();
        let model = RankingModel::load_or_init(model_path(&dir));
        assert!(model.rank(&[]).is_empty());
    }

    #[test]
    fn test_fallback_scoring_matches_weighted_sum() {
        let dir = TempDir::new().unwrap();
        let model = RankingModel::load_or_init(model_path(&dir));

        let row = [0.8, 0.6, 0.2, 0.5, 1.0, 0.5];
        let expected: f32 = row
            .iter()
            .zip(FALLBACK_WEIGHTS.iter())
            .map(|(x, w)| x * w)
            .sum();

        let scores = model.rank(&[row]);
        assert!((scores[0] - expected).abs() < 1e-6);
    }

    #[test]
    fn test_train_persists_and_transitions_to_trained() {
        let dir = TempDir::new().unwrap();
        let path = model_path(&dir);
        let model = RankingModel::load_or_init(path.clone());

        let features = vec![
            [0.9, 0.9, 0.5, 1.0, 1.0, 0.9],
            [0.1, 0.1, 0.5, 0.0, 1.0, 0.1],
            [0.8, 0.7, 0.4, 0.9, 1.0, 0.8],
            [0.2, 0.3, 0.4, 0.1, 1.0, 0.2],
        ];
        let labels = vec![1.0, 0.0, 1.0, 0.0];
        let groups = vec![2, 2];

        let meta = model.train(&features, &labels, &groups, 10).unwrap();
        assert!(meta.trained);
        assert!(path.exists());

        // A fresh handle loads the trained artifact
        let reloaded = RankingModel::load_or_init(path);
        let meta2 = reloaded.metadata();
        assert!(meta2.trained);
        assert_eq!(meta2.version, meta.version);
    }

    #[test]
    fn test_trained_model_orders_discordant_pair() {
        let dir = TempDir::new().unwrap();
        let model = RankingModel::load_or_init(model_path(&dir));

        let good = [0.9, 0.9, 0.5, 1.0, 1.0, 0.9];
        let bad = [0.1, 0.1, 0.5, 0.0, 1.0, 0.1];
        let features = vec![good, bad];

        model
            .train(&features, &[1.0, 0.0], &[2], 50)
            .unwrap();

        let scores = model.rank(&features);
        assert!(scores[0] > scores[1]);
    }

    #[test]
    fn test_train_rejects_mismatched_groups() {
        let dir = TempDir::new().unwrap();
        let model = RankingModel::load_or_init(model_path(&dir));

        let features = vec![[0.0; 6], [0.0; 6]];
        let result = model.train(&features, &[0.0, 1.0], &[3], 5);
        assert!(result.is_err());
    }

    #[test]
    fn test_both_modes_return_same_shape() {
        let dir = TempDir::new().unwrap();
        let model = RankingModel::load_or_init(model_path(&dir));

        let features = vec![[0.5; 6]; 4];
        assert_eq!(model.rank(&features).len(), 4);

        let labels = vec![1.0, 0.0, 1.0, 0.0];
        model.train(&features, &labels, &[4], 2).unwrap();
        assert_eq!(model.rank(&features).len(), 4);
    }
}
