//! Corpus loading and validation.
//!
//! The corpus is an ordered, immutable sequence of document strings loaded
//! once at process start. Reloading is a caller concern and must be an atomic
//! swap visible only to new queries.

use prism_core::{PrismError, PrismResult};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::Path;

/// An immutable, ordered document collection.
///
/// Documents are identified by their position. An empty corpus is valid: the
/// retrievers return empty results for it rather than failing, and every
/// query over it ends in a refusal.
#[derive(Debug, Clone)]
pub struct Corpus {
    documents: Vec<String>,
    fingerprint: String,
}

impl Corpus {
    /// Load a corpus from a file with one document per non-empty line.
    pub fn load(path: &Path) -> PrismResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            PrismError::Corpus(format!("Failed to read corpus file {:?}: {}", path, e))
        })?;

        let documents: Vec<String> = contents
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect();

        if documents.is_empty() {
            tracing::warn!("Corpus at {:?} contains no documents; every query will be refused", path);
        } else {
            tracing::info!("Loaded {} documents from {:?}", documents.len(), path);
        }

        Ok(Self::from_documents(documents))
    }

    /// Build a corpus from an in-memory document list.
    pub fn from_documents(documents: Vec<String>) -> Self {
        let fingerprint = fingerprint_documents(&documents);
        Self {
            documents,
            fingerprint,
        }
    }

    /// All documents, in load order.
    pub fn documents(&self) -> &[String] {
        &self.documents
    }

    /// Number of documents.
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    /// Whether the corpus holds no documents.
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Content fingerprint, stable under document reordering.
    ///
    /// Two corpus loads with the same fingerprint carry the same documents;
    /// a changed fingerprint signals data drift to the monitoring layer.
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }
}

fn fingerprint_documents(documents: &[String]) -> String {
    let mut sorted: Vec<&str> = documents.iter().map(String::as_str).collect();
    sorted.sort_unstable();

    let mut hasher = Sha256::new();
    for doc in sorted {
        hasher.update(doc.as_bytes());
        hasher.update(b"\n");
    }
    format!("{:x}", hasher.finalize())
}

/// One row of structured metric data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricRow {
    /// Observation date (as recorded in the source, not parsed)
    pub date: String,

    /// Metric name, e.g. "activation_rate"
    pub metric: String,

    /// Observed value
    pub value: f64,
}

/// Load structured metric data from a `date,metric,value` CSV file.
///
/// The header row is required. Rows with a missing field or a non-numeric
/// value fail the whole load: partially valid structured data is worse than
/// none.
pub fn load_structured_csv(path: &Path) -> PrismResult<Vec<MetricRow>> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| PrismError::Corpus(format!("Failed to read CSV file {:?}: {}", path, e)))?;

    let mut lines = contents.lines().enumerate();

    let header = match lines.next() {
        Some((_, header)) => header,
        None => return Ok(Vec::new()),
    };

    let columns: Vec<&str> = header.split(',').map(str::trim).collect();
    if columns != ["date", "metric", "value"] {
        return Err(PrismError::Corpus(format!(
            "Unexpected CSV header in {:?}: expected date,metric,value, got {}",
            path, header
        )));
    }

    let mut rows = Vec::new();
    for (line_no, line) in lines {
        if line.trim().is_empty() {
            continue;
        }

        let fields: Vec<&str> = line.split(',').map(str::trim).collect();
        if fields.len() != 3 {
            return Err(PrismError::Corpus(format!(
                "Malformed CSV row at line {} in {:?}: expected 3 fields, got {}",
                line_no + 1,
                path,
                fields.len()
            )));
        }

        let value: f64 = fields[2].parse().map_err(|_| {
            PrismError::Corpus(format!(
                "Non-numeric value at line {} in {:?}: {}",
                line_no + 1,
                path,
                fields[2]
            ))
        })?;

        rows.push(MetricRow {
            date: fields[0].to_string(),
            metric: fields[1].to_string(),
            value,
        });
    }

    Ok(rows)
}
