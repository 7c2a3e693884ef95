use std::time::Instant;

use agrorag_core::config::EngineConfig;
use agrorag_core::error::{Error, Result};
use agrorag_core::traits::{Retriever, SearchIndex};
use agrorag_core::types::{rank, Chunk, ScoredChunk};

use crate::vectorizer::{SparseVector, TfidfModel, VectorizerOptions};

/// Term-weight matrix over a chunk sequence: one normalized row per chunk.
pub struct SparseIndex {
    chunks: Vec<Chunk>,
    model: TfidfModel,
    rows: Vec<SparseVector>,
}

impl SparseIndex {
    pub fn build(chunks: &[Chunk], options: &VectorizerOptions) -> Result<Self> {
        if chunks.is_empty() {
            return Err(Error::Indexing("document produced no chunks".into()));
        }
        let start = Instant::now();
        let texts: Vec<&str> = chunks.iter().map(|c| c.content.as_str()).collect();
        let (model, rows) = TfidfModel::fit(&texts, options)?;
        tracing::info!(
            chunks = chunks.len(),
            vocabulary = model.vocabulary().len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "sparse index built"
        );
        Ok(Self { chunks: chunks.to_vec(), model, rows })
    }

    pub fn model(&self) -> &TfidfModel {
        &self.model
    }

    /// Cosine ranking of every chunk with a positive similarity to `text`.
    pub fn search(&self, text: &str, k: usize) -> Vec<ScoredChunk> {
        let query = self.model.transform(text);
        if query.is_zero() {
            tracing::debug!(query = text, "no query term is in the vocabulary");
            return Vec::new();
        }
        let mut hits: Vec<ScoredChunk> = self
            .rows
            .iter()
            .zip(&self.chunks)
            .filter_map(|(row, chunk)| {
                let score = query.cosine(row);
                (score > 0.0).then(|| ScoredChunk { chunk: chunk.clone(), score })
            })
            .collect();
        rank(&mut hits);
        hits.truncate(k);
        hits
    }
}

impl SearchIndex for SparseIndex {
    fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    fn term_weights(&self, chunk_index: usize) -> Vec<(String, f32)> {
        let Some(row) = self.rows.get(chunk_index) else { return Vec::new() };
        let mut weights: Vec<(String, f32)> = row
            .entries()
            .iter()
            .filter_map(|&(id, w)| self.model.term(id).map(|t| (t.to_string(), w)))
            .collect();
        weights.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal).then(a.0.cmp(&b.0)));
        weights
    }
}

/// Lexical retrieval backend.
#[derive(Debug, Clone, Default)]
pub struct SparseRetriever {
    options: VectorizerOptions,
}

impl SparseRetriever {
    pub fn new(options: VectorizerOptions) -> Self {
        Self { options }
    }

    pub fn from_config(cfg: &EngineConfig) -> Self {
        Self::new(VectorizerOptions::from(cfg))
    }
}

impl Retriever for SparseRetriever {
    type Index = SparseIndex;

    fn signature(&self) -> String {
        let cap = self.options.vocabulary_cap.map_or_else(|| "all".to_string(), |c| c.to_string());
        format!("tfidf:ngram{}:cap{}:{:?}", self.options.ngram_max, cap, self.options.stopwords)
    }

    fn build(&self, chunks: &[Chunk]) -> Result<SparseIndex> {
        SparseIndex::build(chunks, &self.options)
    }

    fn query(&self, index: &SparseIndex, text: &str, k: usize) -> Result<Vec<ScoredChunk>> {
        Ok(index.search(text, k))
    }
}
