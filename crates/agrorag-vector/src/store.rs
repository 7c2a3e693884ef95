use std::time::Instant;

use indicatif::{ProgressBar, ProgressStyle};

use agrorag_core::error::{Error, Result};
use agrorag_core::traits::{Embedder, Retriever, SearchIndex};
use agrorag_core::types::{rank, Chunk, ScoredChunk};

pub const DEFAULT_BATCH_SIZE: usize = 64;

/// Chunk-to-vector pairs. Vectors are stored L2-normalized.
pub struct DenseIndex {
    chunks: Vec<Chunk>,
    vectors: Vec<Vec<f32>>,
    dim: usize,
}

impl DenseIndex {
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// The `k` nearest chunks to `query_vec`, scores clamped to `[0, 1]`.
    pub fn search_vec(&self, query_vec: &[f32], k: usize) -> Result<Vec<ScoredChunk>> {
        if query_vec.len() != self.dim {
            return Err(Error::dependency(
                "query embedding",
                format!("dim mismatch: got {} expected {}", query_vec.len(), self.dim),
            ));
        }
        let q = normalized(query_vec.to_vec());
        let mut hits: Vec<ScoredChunk> = self
            .vectors
            .iter()
            .zip(&self.chunks)
            .map(|(v, chunk)| ScoredChunk { chunk: chunk.clone(), score: dot(&q, v).clamp(0.0, 1.0) })
            .collect();
        rank(&mut hits);
        hits.truncate(k);
        Ok(hits)
    }
}

impl SearchIndex for DenseIndex {
    fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }
}

/// Dense retrieval backend over an injected embedding collaborator.
pub struct DenseRetriever {
    embedder: Box<dyn Embedder>,
    batch_size: usize,
    show_progress: bool,
}

impl DenseRetriever {
    pub fn new(embedder: Box<dyn Embedder>) -> Self {
        Self { embedder, batch_size: DEFAULT_BATCH_SIZE, show_progress: false }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    fn progress_bar(&self, len: usize) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }
        let pb = ProgressBar::new(len as u64);
        if let Ok(style) = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} chunks ({percent}%) {msg}")
        {
            pb.set_style(style.progress_chars("#>-"));
        }
        pb
    }
}

impl Retriever for DenseRetriever {
    type Index = DenseIndex;

    fn signature(&self) -> String {
        format!("dense:{}", self.embedder.embedder_id())
    }

    fn build(&self, chunks: &[Chunk]) -> Result<DenseIndex> {
        if chunks.is_empty() {
            return Err(Error::Indexing("document produced no chunks".into()));
        }
        let start = Instant::now();
        let mut dim = None;
        let pb = self.progress_bar(chunks.len());
        let mut vectors = Vec::with_capacity(chunks.len());
        for batch in chunks.chunks(self.batch_size) {
            let texts: Vec<String> = batch.iter().map(|c| c.content.clone()).collect();
            let embs = match self.embedder.embed_batch(&texts) {
                Ok(embs) => embs,
                Err(e) => {
                    pb.abandon_with_message("embedding failed");
                    return Err(e);
                }
            };
            if embs.len() != texts.len() {
                pb.abandon_with_message("embedding failed");
                return Err(Error::dependency(
                    "embeddings",
                    format!("embedder returned {} vectors for {} texts", embs.len(), texts.len()),
                ));
            }
            let expected = *dim.get_or_insert_with(|| self.embedder.dim());
            for v in embs {
                if v.len() != expected {
                    pb.abandon_with_message("embedding failed");
                    return Err(Error::dependency(
                        "embeddings",
                        format!("dim mismatch: got {} expected {}", v.len(), expected),
                    ));
                }
                vectors.push(normalized(v));
            }
            pb.inc(batch.len() as u64);
        }
        pb.finish_with_message("done");
        let dim = dim.unwrap_or_else(|| self.embedder.dim());
        tracing::info!(
            chunks = chunks.len(),
            dim,
            embedder = self.embedder.embedder_id(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "dense index built"
        );
        Ok(DenseIndex { chunks: chunks.to_vec(), vectors, dim })
    }

    fn query(&self, index: &DenseIndex, text: &str, k: usize) -> Result<Vec<ScoredChunk>> {
        let mut embs = self.embedder.embed_batch(&[text.to_string()])?;
        if embs.len() != 1 {
            return Err(Error::dependency("query embedding", format!("expected 1 vector, got {}", embs.len())));
        }
        index.search_vec(&embs.remove(0), k)
    }
}

fn normalized(mut v: Vec<f32>) -> Vec<f32> {
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in &mut v {
            *x /= norm;
        }
    }
    v
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}
