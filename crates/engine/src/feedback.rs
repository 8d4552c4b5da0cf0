//! Feedback persistence: interaction log plus user feedback.
//!
//! The log is append-only JSONL with an in-memory index keyed by interaction
//! id. A feedback update appends a superseding record rather than rewriting
//! the file; replay keeps the latest record per id.

use crate::types::PipelineResponse;
use chrono::{DateTime, Utc};
use prism_core::PrismResult;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// User feedback attached to an interaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserFeedback {
    /// Whether the user found the answer helpful
    pub helpful: bool,

    /// Free-form comment
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,

    /// When the feedback was recorded
    pub feedback_at: DateTime<Utc>,
}

/// One logged query/answer interaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InteractionRecord {
    /// Interaction id; equals the pipeline's query id
    pub interaction_id: String,

    /// When the interaction was logged
    pub timestamp: DateTime<Utc>,

    /// The user's query
    pub query: String,

    /// Answer text, absent on refusal
    pub answer: Option<String>,

    /// Citations backing the answer
    pub citations: Vec<String>,

    /// Confidence of the answer
    pub confidence: f32,

    /// Whether the answer was refused
    pub refused: bool,

    /// User feedback, absent until submitted
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_feedback: Option<UserFeedback>,
}

/// Aggregate feedback statistics for the monitoring surface.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackStats {
    /// Total logged interactions
    pub total_interactions: usize,

    /// Fraction of interactions that were refusals
    pub refused_rate: f64,

    /// Fraction of interactions with user feedback
    pub feedback_rate: f64,

    /// Fraction of feedback marked helpful
    pub helpful_rate: f64,

    /// Mean confidence over all interactions
    pub avg_confidence: f64,
}

/// Append-only feedback store with an id-keyed replay index.
#[derive(Debug)]
pub struct FeedbackStore {
    log_path: PathBuf,
    inner: Mutex<HashMap<String, InteractionRecord>>,
}

impl FeedbackStore {
    /// Open the store, replaying any existing log into the index.
    ///
    /// Unparseable lines are skipped with a warning; a partially corrupt
    /// log never blocks startup.
    pub fn open(log_path: &Path) -> PrismResult<Self> {
        if let Some(parent) = log_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut index = HashMap::new();

        if log_path.exists() {
            let contents = std::fs::read_to_string(log_path)?;
            for (line_no, line) in contents.lines().enumerate() {
                if line.trim().is_empty() {
                    continue;
                }
                match serde_json::from_str::<InteractionRecord>(line) {
                    // Later records supersede earlier ones for the same id
                    Ok(record) => {
                        index.insert(record.interaction_id.clone(), record);
                    }
                    Err(e) => {
                        tracing::warn!(
                            "Skipping unparseable feedback record at line {}: {}",
                            line_no + 1,
                            e
                        );
                    }
                }
            }
            tracing::debug!("Replayed {} interactions from {:?}", index.len(), log_path);
        }

        Ok(Self {
            log_path: log_path.to_path_buf(),
            inner: Mutex::new(index),
        })
    }

    /// Log a query/answer interaction, keyed by the pipeline's query id.
    pub fn log_interaction(&self, query: &str, response: &PipelineResponse) -> PrismResult<String> {
        let record = InteractionRecord {
            interaction_id: response.query_id.clone(),
            timestamp: Utc::now(),
            query: query.to_string(),
            answer: response.answer.clone(),
            citations: response.citations.clone(),
            confidence: response.confidence,
            refused: response.refused,
            user_feedback: None,
        };

        let mut inner = self.inner.lock().unwrap();
        self.append(&record)?;
        inner.insert(record.interaction_id.clone(), record.clone());

        Ok(record.interaction_id)
    }

    /// Attach user feedback to a logged interaction.
    ///
    /// Appends a superseding record; returns `false` when the interaction id
    /// is unknown.
    pub fn log_feedback(
        &self,
        interaction_id: &str,
        helpful: bool,
        comment: Option<String>,
    ) -> PrismResult<bool> {
        let mut inner = self.inner.lock().unwrap();

        let mut record = match inner.get(interaction_id) {
            Some(record) => record.clone(),
            None => return Ok(false),
        };

        record.user_feedback = Some(UserFeedback {
            helpful,
            comment,
            feedback_at: Utc::now(),
        });

        self.append(&record)?;
        inner.insert(record.interaction_id.clone(), record);

        Ok(true)
    }

    fn append(&self, record: &InteractionRecord) -> PrismResult<()> {
        let line = serde_json::to_string(record)?;

        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_path)?;
        writeln!(file, "{}", line)?;

        Ok(())
    }

    /// Latest record per interaction id, in unspecified order.
    pub fn records(&self) -> Vec<InteractionRecord> {
        self.inner.lock().unwrap().values().cloned().collect()
    }

    /// Aggregate statistics over all logged interactions.
    pub fn stats(&self) -> FeedbackStats {
        let inner = self.inner.lock().unwrap();
        let total = inner.len();

        if total == 0 {
            return FeedbackStats {
                total_interactions: 0,
                refused_rate: 0.0,
                feedback_rate: 0.0,
                helpful_rate: 0.0,
                avg_confidence: 0.0,
            };
        }

        let refused = inner.values().filter(|r| r.refused).count();
        let with_feedback = inner.values().filter(|r| r.user_feedback.is_some()).count();
        let helpful = inner
            .values()
            .filter(|r| r.user_feedback.as_ref().map(|f| f.helpful).unwrap_or(false))
            .count();
        let confidence_sum: f64 = inner.values().map(|r| r.confidence as f64).sum();

        FeedbackStats {
            total_interactions: total,
            refused_rate: refused as f64 / total as f64,
            feedback_rate: with_feedback as f64 / total as f64,
            helpful_rate: if with_feedback > 0 {
                helpful as f64 / with_feedback as f64
            } else {
                0.0
            },
            avg_confidence: confidence_sum / total as f64,
        }
    }
}
