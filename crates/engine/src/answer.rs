//! Constrained answer synthesis with citations, confidence, and refusal.
//!
//! The answer text is a bounded excerpt of the top-ranked evidence: nothing
//! is produced that does not trace to a supplied document. Below the
//! confidence threshold the answer is withheld entirely.

use crate::types::{Answer, RankedCandidate};

/// Weight of the supporting-document-count factor.
const DOC_COUNT_WEIGHT: f32 = 0.4;

/// Weight of the top document's rank score.
const RANK_SCORE_WEIGHT: f32 = 0.4;

/// Weight of the answer-length factor.
const ANSWER_LENGTH_WEIGHT: f32 = 0.2;

/// Document count at which the support factor saturates.
const DOC_COUNT_SATURATION: f32 = 3.0;

/// Answer word count at which the length factor saturates.
const ANSWER_WORDS_SATURATION: f32 = 50.0;

/// Characters of top evidence quoted into the answer body.
const EXCERPT_CHARS: usize = 150;

/// Maximum number of citations attached to an answer.
const MAX_CITATIONS: usize = 3;

/// Character budget per citation.
const CITATION_CHARS: usize = 100;

/// Evidence-gated answer synthesizer.
///
/// Stateless per call: every synthesis is a pure function of the query, the
/// ranked evidence, and the configured thresholds.
#[derive(Debug, Clone)]
pub struct ConstrainedSynthesizer {
    confidence_threshold: f32,
    max_answer_chars: usize,
}

impl ConstrainedSynthesizer {
    pub fn new(confidence_threshold: f32, max_answer_chars: usize) -> Self {
        Self {
            confidence_threshold,
            max_answer_chars,
        }
    }

    /// Synthesize an answer strictly from the provided ranked evidence.
    ///
    /// No evidence refuses immediately with zero confidence. Otherwise the
    /// confidence gate decides between a cited answer and a refusal whose
    /// reason states the numeric confidence and threshold.
    pub fn synthesize(&self, _query: &str, evidence: &[RankedCandidate]) -> Answer {
        let top = match evidence.first() {
            Some(top) => top,
            None => return Answer::refusal(0.0, "no relevant context found"),
        };

        let answer_text = self.excerpt_answer(&top.candidate.text);
        let confidence = self.compute_confidence(evidence, &answer_text);

        if confidence < self.confidence_threshold {
            return Answer::refusal(
                confidence,
                format!(
                    "confidence {:.2} below threshold {:.2}",
                    confidence, self.confidence_threshold
                ),
            );
        }

        let citations = evidence
            .iter()
            .take(MAX_CITATIONS)
            .map(|e| truncate_chars(&e.candidate.text, CITATION_CHARS))
            .collect();

        Answer::accepted(answer_text, citations, confidence)
    }

    /// Build the answer body as a bounded excerpt of the top evidence.
    fn excerpt_answer(&self, top_text: &str) -> String {
        let excerpt = truncate_chars(top_text, EXCERPT_CHARS);
        let answer = format!("Based on internal documentation: {}", excerpt);
        truncate_chars(&answer, self.max_answer_chars)
    }

    /// Confidence from evidence volume, top rank score, and answer length.
    ///
    /// The top rank score is assumed pre-normalized to [0, 1] by the caller;
    /// the final confidence is clamped into [0, 1] regardless.
    fn compute_confidence(&self, evidence: &[RankedCandidate], answer_text: &str) -> f32 {
        let doc_factor = (evidence.len() as f32 / DOC_COUNT_SATURATION).min(1.0);

        let top_rank_score = evidence.first().map(|e| e.rank_score).unwrap_or(0.0);

        let answer_words = answer_text.split_whitespace().count() as f32;
        let length_factor = (answer_words / ANSWER_WORDS_SATURATION).min(1.0);

        let confidence = DOC_COUNT_WEIGHT * doc_factor
            + RANK_SCORE_WEIGHT * top_rank_score
            + ANSWER_LENGTH_WEIGHT * length_factor;

        confidence.clamp(0.0, 1.0)
    }

    /// Check that a citation actually occurs in the provided evidence.
    pub fn citation_supported(&self, citation: &str, evidence: &[RankedCandidate]) -> bool {
        let needle = citation
            .trim_end_matches("...")
            .to_lowercase();
        evidence
            .iter()
            .any(|e| e.candidate.text.to_lowercase().contains(&needle))
    }

    /// Split an answer into sentence-level claims for validation.
    pub fn extract_claims(&self, answer: &str) -> Vec<String> {
        answer
            .split(['.', '!', '?'])
            .map(str::trim)
            .filter(|s| s.len() > 10)
            .map(str::to_string)
            .collect()
    }
}

/// Truncate on a character boundary, appending an ellipsis when shortened.
fn truncate_chars(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let mut truncated: String = text.chars().take(max_chars).collect();
        truncated.push_str("...");
        truncated
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Candidate;

    fn synthesizer() -> ConstrainedSynthesizer {
        ConstrainedSynthesizer::new(0.5, 256)
    }

    fn evidence(entries: &[(&str, f32)]) -> Vec<RankedCandidate> {
        entries
            .iter()
            .map(|&(text, rank_score)| RankedCandidate {
                candidate: Candidate::new(text, rank_score),
                rank_score,
            })
            .collect()
    }

    #[test]
    fn test_no_evidence_refuses_with_zero_confidence() {
        let answer = synthesizer().synthesize("any query", &[]);

        assert!(answer.refused);
        assert_eq!(answer.confidence, 0.0);
        assert!(answer.answer.is_none());
        assert!(answer.citations.is_empty());
        assert!(answer.reason.unwrap().contains("no relevant context"));
    }

    #[test]
    fn test_strong_evidence_produces_cited_answer() {
        let evidence = evidence(&[
            ("Onboarding redesign in March caused a 20% activation drop", 0.9),
            ("Release 2.3 changed signup UI", 0.6),
            ("Weekly actives held steady through Q1", 0.5),
        ]);

        let answer = synthesizer().synthesize("Why did activation drop?", &evidence);

        assert!(!answer.refused);
        assert!(answer.confidence >= 0.5);
        let text = answer.answer.unwrap();
        assert!(text.starts_with("Based on internal documentation:"));
        assert!(text.contains("Onboarding redesign"));
        assert_eq!(answer.citations.len(), 3);
    }

    #[test]
    fn test_low_rank_score_refuses_with_numeric_reason() {
        let evidence = evidence(&[("barely related text", 0.05)]);

        let answer = synthesizer().synthesize("unrelated question", &evidence);

        assert!(answer.refused);
        assert!(answer.answer.is_none());
        assert!(answer.citations.is_empty());
        let reason = answer.reason.unwrap();
        assert!(reason.contains("below threshold 0.50"), "reason: {}", reason);
    }

    #[test]
    fn test_confidence_monotonic_in_top_rank_score() {
        let s = synthesizer();
        let mut last = -1.0f32;

        for rank_score in [0.0, 0.2, 0.4, 0.6, 0.8, 1.0] {
            let evidence = evidence(&[
                ("Onboarding redesign in March caused a 20% activation drop", rank_score),
                ("Release 2.3 changed signup UI", 0.1),
            ]);
            let answer = s.synthesize("activation drop", &evidence);
            assert!(
                answer.confidence >= last,
                "confidence decreased: {} < {}",
                answer.confidence,
                last
            );
            last = answer.confidence;
        }
    }

    #[test]
    fn test_citations_drawn_from_evidence() {
        let s = synthesizer();
        let evidence = evidence(&[
            ("First supporting document about activation", 0.9),
            ("Second supporting document about signup", 0.8),
        ]);

        let answer = s.synthesize("activation", &evidence);
        assert!(!answer.refused);

        for citation in &answer.citations {
            assert!(s.citation_supported(citation, &evidence));
        }
    }

    #[test]
    fn test_citation_char_budget() {
        let long_doc = "activation ".repeat(40);
        let evidence = evidence(&[(long_doc.as_str(), 0.9)]);

        let answer = synthesizer().synthesize("activation", &evidence);
        for citation in &answer.citations {
            assert!(citation.chars().count() <= CITATION_CHARS + 3);
        }
    }

    #[test]
    fn test_answer_respects_char_budget() {
        let long_doc = "metric ".repeat(100);
        let evidence = evidence(&[(long_doc.as_str(), 1.0), ("second", 0.9), ("third", 0.8)]);

        let s = ConstrainedSynthesizer::new(0.1, 64);
        let answer = s.synthesize("metric", &evidence);
        let text = answer.answer.unwrap();
        assert!(text.chars().count() <= 64 + 3);
    }

    #[test]
    fn test_truncate_is_char_boundary_safe() {
        let text = "métriques d'activation très détaillées";
        let truncated = truncate_chars(text, 10);
        assert!(truncated.starts_with("métriques"));
    }

    #[test]
    fn test_extract_claims_drops_fragments() {
        let claims = synthesizer()
            .extract_claims("Activation dropped 20% in March. Yes. The signup UI changed too!");
        assert_eq!(claims.len(), 2);
    }
}
