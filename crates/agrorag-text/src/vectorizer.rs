//! TF-IDF vectorizer over the analyzer's terms.
//!
//! Weighting: raw term count × smooth idf `ln((1 + n) / (1 + df)) + 1`, then
//! L2 normalization per vector. Terms present in every fitted text are dropped
//! unless that would leave nothing; `vocabulary_cap` then keeps the most
//! frequent terms corpus-wide.

use std::collections::{BTreeMap, HashMap};

use agrorag_core::config::{EngineConfig, StopwordPolicy};
use agrorag_core::error::{Error, Result};

use crate::analyzer::Analyzer;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VectorizerOptions {
    pub ngram_max: usize,
    pub vocabulary_cap: Option<usize>,
    pub stopwords: StopwordPolicy,
}

impl Default for VectorizerOptions {
    fn default() -> Self {
        Self { ngram_max: 2, vocabulary_cap: None, stopwords: StopwordPolicy::None }
    }
}

impl From<&EngineConfig> for VectorizerOptions {
    fn from(cfg: &EngineConfig) -> Self {
        Self { ngram_max: cfg.ngram_max, vocabulary_cap: cfg.vocabulary_cap, stopwords: cfg.stopwords }
    }
}

/// Non-zero entries of a vector, sorted by term id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SparseVector {
    entries: Vec<(usize, f32)>,
}

impl SparseVector {
    fn normalized(mut entries: Vec<(usize, f32)>) -> Self {
        entries.sort_by_key(|(id, _)| *id);
        let norm = entries.iter().map(|(_, w)| w * w).sum::<f32>().sqrt();
        if norm > 0.0 {
            for (_, w) in &mut entries {
                *w /= norm;
            }
        }
        Self { entries }
    }

    pub fn entries(&self) -> &[(usize, f32)] {
        &self.entries
    }

    pub fn is_zero(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn dot(&self, other: &SparseVector) -> f32 {
        let (mut i, mut j, mut sum) = (0, 0, 0.0f32);
        while i < self.entries.len() && j < other.entries.len() {
            let (a, wa) = self.entries[i];
            let (b, wb) = other.entries[j];
            match a.cmp(&b) {
                std::cmp::Ordering::Less => i += 1,
                std::cmp::Ordering::Greater => j += 1,
                std::cmp::Ordering::Equal => {
                    sum += wa * wb;
                    i += 1;
                    j += 1;
                }
            }
        }
        sum
    }

    /// Cosine similarity of two unit (or zero) vectors, clamped to `[0, 1]`.
    pub fn cosine(&self, other: &SparseVector) -> f32 {
        self.dot(other).clamp(0.0, 1.0)
    }
}

/// A fitted vocabulary with its idf weights.
#[derive(Clone)]
pub struct TfidfModel {
    analyzer: Analyzer,
    vocabulary: Vec<String>,
    term_ids: HashMap<String, usize>,
    idf: Vec<f32>,
}

impl TfidfModel {
    /// Fits the vocabulary over `texts` and returns the model with one
    /// normalized row per text.
    pub fn fit(texts: &[&str], options: &VectorizerOptions) -> Result<(Self, Vec<SparseVector>)> {
        if texts.is_empty() {
            return Err(Error::Indexing("cannot fit a vocabulary over zero texts".into()));
        }
        let analyzer = Analyzer::new(options.stopwords, options.ngram_max);
        let counts: Vec<BTreeMap<String, u32>> = texts.iter().map(|t| count_terms(&analyzer, t)).collect();

        let mut doc_freq: BTreeMap<&str, usize> = BTreeMap::new();
        let mut corpus_freq: BTreeMap<&str, u64> = BTreeMap::new();
        for doc in &counts {
            for (term, &n) in doc {
                *doc_freq.entry(term.as_str()).or_insert(0) += 1;
                *corpus_freq.entry(term.as_str()).or_insert(0) += u64::from(n);
            }
        }
        if doc_freq.is_empty() {
            return Err(Error::Indexing("vocabulary is empty after analysis".into()));
        }

        let n_docs = texts.len();
        let mut kept: Vec<&str> = doc_freq.iter().filter(|(_, &df)| df < n_docs).map(|(t, _)| *t).collect();
        if kept.is_empty() {
            tracing::debug!(terms = doc_freq.len(), "every term occurs in all texts, keeping them");
            kept = doc_freq.keys().copied().collect();
        }
        if let Some(cap) = options.vocabulary_cap {
            if kept.len() > cap {
                kept.sort_by(|a, b| corpus_freq[b].cmp(&corpus_freq[a]).then(a.cmp(b)));
                kept.truncate(cap);
            }
        }
        kept.sort_unstable();

        let vocabulary: Vec<String> = kept.iter().map(|t| t.to_string()).collect();
        let term_ids: HashMap<String, usize> = vocabulary.iter().enumerate().map(|(i, t)| (t.clone(), i)).collect();
        let idf: Vec<f32> = kept
            .iter()
            .map(|t| {
                let df = doc_freq[t] as f32;
                ((1.0 + n_docs as f32) / (1.0 + df)).ln() + 1.0
            })
            .collect();

        let model = Self { analyzer, vocabulary, term_ids, idf };
        let rows = counts.iter().map(|c| model.weigh(c)).collect();
        Ok((model, rows))
    }

    /// Projects text into the fitted space; unknown terms contribute nothing.
    pub fn transform(&self, text: &str) -> SparseVector {
        self.weigh(&count_terms(&self.analyzer, text))
    }

    pub fn vocabulary(&self) -> &[String] {
        &self.vocabulary
    }

    pub fn term(&self, id: usize) -> Option<&str> {
        self.vocabulary.get(id).map(String::as_str)
    }

    pub fn idf(&self, term: &str) -> Option<f32> {
        self.term_ids.get(term).map(|&id| self.idf[id])
    }

    fn weigh(&self, counts: &BTreeMap<String, u32>) -> SparseVector {
        let entries = counts
            .iter()
            .filter_map(|(term, &n)| self.term_ids.get(term).map(|&id| (id, n as f32 * self.idf[id])))
            .collect();
        SparseVector::normalized(entries)
    }
}

fn count_terms(analyzer: &Analyzer, text: &str) -> BTreeMap<String, u32> {
    let mut counts = BTreeMap::new();
    for term in analyzer.terms(text) {
        *counts.entry(term).or_insert(0) += 1;
    }
    counts
}
