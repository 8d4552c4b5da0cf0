//! Feature extraction for the ranking model.
//!
//! Every feature is a pure function of its inputs: no hidden state, fully
//! deterministic. All components are normalized into [0, 1] except the two
//! raw retrieval scores, which stay on their retriever-defined scales.

use std::collections::HashSet;

/// Number of features per (query, document) pair.
pub const FEATURE_COUNT: usize = 6;

/// Fixed-length feature representation of a (query, document) pair.
///
/// Order: dense score, sparse score, normalized length, term overlap ratio,
/// recency decay, feedback signal.
pub type FeatureVector = [f32; FEATURE_COUNT];

/// Recency decay default: no decay.
pub const DEFAULT_RECENCY_DECAY: f32 = 1.0;

/// Feedback signal default: neutral prior.
pub const DEFAULT_FEEDBACK_SIGNAL: f32 = 0.5;

/// Document word count at which the length feature saturates.
const LENGTH_SATURATION_WORDS: f32 = 500.0;

/// Extract ranking features with neutral recency and feedback priors.
pub fn extract(query: &str, document: &str, dense_score: f32, sparse_score: f32) -> FeatureVector {
    extract_full(
        query,
        document,
        dense_score,
        sparse_score,
        DEFAULT_RECENCY_DECAY,
        DEFAULT_FEEDBACK_SIGNAL,
    )
}

/// Extract ranking features with explicit recency decay and feedback signal.
pub fn extract_full(
    query: &str,
    document: &str,
    dense_score: f32,
    sparse_score: f32,
    recency_decay: f32,
    feedback_signal: f32,
) -> FeatureVector {
    let word_count = document.split_whitespace().count() as f32;

    [
        dense_score,
        sparse_score,
        (word_count / LENGTH_SATURATION_WORDS).min(1.0),
        term_overlap_ratio(query, document),
        recency_decay,
        feedback_signal,
    ]
}

/// Extract features for a batch of (document, dense, sparse) rows,
/// preserving input order.
pub fn extract_batch(query: &str, rows: &[(&str, f32, f32)]) -> Vec<FeatureVector> {
    rows.iter()
        .map(|&(document, dense, sparse)| extract(query, document, dense, sparse))
        .collect()
}

/// Ratio of unique query words found in the document.
fn term_overlap_ratio(query: &str, document: &str) -> f32 {
    let query_words: HashSet<String> = lowercase_words(query);
    let doc_words: HashSet<String> = lowercase_words(document);

    let overlap = query_words.intersection(&doc_words).count() as f32;
    overlap / query_words.len().max(1) as f32
}

fn lowercase_words(text: &str) -> HashSet<String> {
    text.to_lowercase()
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feature_count_and_order() {
        let features = extract_full("a b", "a b c", 0.9, 0.7, 0.8, 0.6);
        assert_eq!(features.len(), FEATURE_COUNT);
        assert_eq!(features[0], 0.9);
        assert_eq!(features[1], 0.7);
        assert_eq!(features[4], 0.8);
        assert_eq!(features[5], 0.6);
    }

    #[test]
    fn test_normalized_components_stay_in_unit_interval() {
        let long_doc = "word ".repeat(2000);
        let features = extract("some query", &long_doc, 3.2, -0.4);

        for &f in &features[2..] {
            assert!((0.0..=1.0).contains(&f), "component out of range: {}", f);
        }
        // Raw retrieval scores pass through untouched
        assert_eq!(features[0], 3.2);
        assert_eq!(features[1], -0.4);
    }

    #[test]
    fn test_length_feature_saturates() {
        let doc = "word ".repeat(500);
        let features = extract("q", &doc, 0.0, 0.0);
        assert_eq!(features[2], 1.0);
    }

    #[test]
    fn test_term_overlap_full_and_none() {
        let full = extract("activation drop", "activation drop in march", 0.0, 0.0);
        assert!((full[3] - 1.0).abs() < f32::EPSILON);

        let none = extract("revenue churn", "kitchen menu pasta", 0.0, 0.0);
        assert_eq!(none[3], 0.0);
    }

    #[test]
    fn test_overlap_counts_unique_words() {
        // "drop drop drop" has one unique word, present in the document
        let features = extract("drop drop drop", "activation drop", 0.0, 0.0);
        assert!((features[3] - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_defaults_applied() {
        let features = extract("q", "d", 0.1, 0.2);
        assert_eq!(features[4], DEFAULT_RECENCY_DECAY);
        assert_eq!(features[5], DEFAULT_FEEDBACK_SIGNAL);
    }

    #[test]
    fn test_batch_preserves_order() {
        let rows = vec![("first doc", 0.1, 0.2), ("second doc", 0.3, 0.4)];
        let batch = extract_batch("query", &rows);

        assert_eq!(batch.len(), 2);
        assert_eq!(batch[0][0], 0.1);
        assert_eq!(batch[1][0], 0.3);
    }

    #[test]
    fn test_extraction_is_deterministic() {
        let a = extract("why did activation drop", "activation dropped 20%", 0.5, 1.3);
        let b = extract("why did activation drop", "activation dropped 20%", 0.5, 1.3);
        assert_eq!(a, b);
    }
}
