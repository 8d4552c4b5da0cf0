//! Lexical candidate retrieval over the corpus.
//!
//! An inverted index (term → postings with term frequency) backs two scorer
//! variants selected at construction: BM25 Okapi and a normalized
//! term-overlap ratio. Both are deterministic; ties are broken by original
//! document index.

use crate::corpus::Corpus;
use crate::retrieval::tokenize;
use crate::types::Candidate;
use std::collections::HashMap;
use std::sync::Arc;

/// Scorer selection for the lexical retriever.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LexicalScorer {
    /// BM25 Okapi with term saturation and length normalization.
    Bm25 {
        /// Term-frequency saturation parameter.
        k1: f32,
        /// Length normalization parameter.
        b: f32,
    },
    /// Normalized term overlap: |query ∩ doc| / |query|.
    Overlap,
}

impl Default for LexicalScorer {
    fn default() -> Self {
        Self::Bm25 { k1: 1.2, b: 0.75 }
    }
}

impl LexicalScorer {
    /// Resolve a scorer by its configuration name.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "bm25" => Some(Self::default()),
            "overlap" => Some(Self::Overlap),
            _ => None,
        }
    }
}

/// A single entry in a term's postings list.
#[derive(Debug, Clone)]
struct Posting {
    doc_id: u32,
    term_frequency: u32,
}

/// Keyword retriever over an immutable corpus.
#[derive(Debug)]
pub struct LexicalRetriever {
    corpus: Arc<Corpus>,
    scorer: LexicalScorer,
    index: HashMap<String, Vec<Posting>>,
    doc_lengths: Vec<u32>,
    total_doc_length: u64,
}

impl LexicalRetriever {
    /// Build the inverted index over the corpus.
    pub fn new(corpus: Arc<Corpus>, scorer: LexicalScorer) -> Self {
        let mut index: HashMap<String, Vec<Posting>> = HashMap::new();
        let mut doc_lengths = Vec::with_capacity(corpus.len());
        let mut total_doc_length = 0u64;

        for (doc_id, doc) in corpus.documents().iter().enumerate() {
            let tokens = tokenize(doc);
            doc_lengths.push(tokens.len() as u32);
            total_doc_length += tokens.len() as u64;

            let mut tf_map: HashMap<&str, u32> = HashMap::new();
            for token in &tokens {
                *tf_map.entry(token.as_str()).or_insert(0) += 1;
            }

            for (term, tf) in tf_map {
                index.entry(term.to_string()).or_default().push(Posting {
                    doc_id: doc_id as u32,
                    term_frequency: tf,
                });
            }
        }

        tracing::debug!(
            "Built lexical index: {} terms over {} documents",
            index.len(),
            corpus.len()
        );

        Self {
            corpus,
            scorer,
            index,
            doc_lengths,
            total_doc_length,
        }
    }

    /// Search the corpus, returning at most `top_k` candidates ordered by
    /// descending score (ties by document index).
    ///
    /// An empty corpus or a query with no tokens yields empty results.
    pub fn search(&self, query: &str, top_k: usize) -> Vec<Candidate> {
        if self.corpus.is_empty() || top_k == 0 {
            return Vec::new();
        }

        let query_tokens = tokenize(query);
        if query_tokens.is_empty() {
            return Vec::new();
        }

        let scores = match self.scorer {
            LexicalScorer::Bm25 { k1, b } => self.bm25_scores(&query_tokens, k1, b),
            LexicalScorer::Overlap => self.overlap_scores(&query_tokens),
        };

        let mut order: Vec<usize> = (0..scores.len()).collect();
        order.sort_by(|&a, &b| {
            scores[b]
                .partial_cmp(&scores[a])
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.cmp(&b))
        });
        order.truncate(top_k);

        order
            .into_iter()
            .map(|i| Candidate::sparse(self.corpus.documents()[i].clone(), scores[i]))
            .collect()
    }

    fn average_doc_length(&self) -> f32 {
        if self.doc_lengths.is_empty() {
            return 0.0;
        }
        self.total_doc_length as f32 / self.doc_lengths.len() as f32
    }

    fn bm25_scores(&self, query_tokens: &[String], k1: f32, b: f32) -> Vec<f32> {
        let n = self.corpus.len() as f32;
        let avgdl = self.average_doc_length();
        let mut scores = vec![0.0f32; self.corpus.len()];

        // Every document tokenized to nothing; no term can match
        if avgdl == 0.0 {
            return scores;
        }

        for term in unique(query_tokens) {
            if let Some(postings) = self.index.get(term) {
                let df = postings.len() as f32;
                // IDF: ln((N - df + 0.5) / (df + 0.5) + 1)
                let idf = ((n - df + 0.5) / (df + 0.5) + 1.0).ln();

                for posting in postings {
                    let dl = self.doc_lengths[posting.doc_id as usize] as f32;
                    let tf = posting.term_frequency as f32;

                    let tf_norm = (tf * (k1 + 1.0)) / (tf + k1 * (1.0 - b + b * dl / avgdl));
                    scores[posting.doc_id as usize] += idf * tf_norm;
                }
            }
        }

        scores
    }

    fn overlap_scores(&self, query_tokens: &[String]) -> Vec<f32> {
        let query_terms = unique(query_tokens);
        let denominator = query_terms.len().max(1) as f32;
        let mut matches = vec![0u32; self.corpus.len()];

        for term in query_terms {
            if let Some(postings) = self.index.get(term) {
                for posting in postings {
                    matches[posting.doc_id as usize] += 1;
                }
            }
        }

        matches
            .into_iter()
            .map(|m| m as f32 / denominator)
            .collect()
    }
}

/// Deduplicate tokens, preserving first-seen order.
fn unique(tokens: &[String]) -> Vec<&str> {
    let mut seen = std::collections::HashSet::new();
    tokens
        .iter()
        .map(String::as_str)
        .filter(|t| seen.insert(*t))
        .collect()
}
