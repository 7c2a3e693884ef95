use crate::error::Result;
use crate::types::{Chunk, ScoredChunk};

/// Capability shape of an external embedding collaborator.
pub trait Embedder: Send + Sync {
    /// Stable identifier for the provider/model (e.g. `openai:text-embedding-3-small`).
    fn embedder_id(&self) -> &str;
    /// Vector size. Providers that learn it from their first response may
    /// report 0 before any batch was embedded.
    fn dim(&self) -> usize;
    /// One vector per input text, in input order.
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}

/// Capability shape of an external text generation collaborator.
pub trait Generator: Send + Sync {
    fn generate(&self, prompt: &str) -> Result<String>;
}

/// A built, read-only index over an ordered chunk sequence.
pub trait SearchIndex: Send + Sync {
    fn chunks(&self) -> &[Chunk];

    /// Per-term weights of one chunk, heaviest first. Indexes without a term
    /// vocabulary return nothing.
    fn term_weights(&self, _chunk_index: usize) -> Vec<(String, f32)> {
        Vec::new()
    }
}

/// A retrieval backend: builds an index once, then ranks chunks per query.
pub trait Retriever: Send + Sync {
    type Index: SearchIndex;

    /// Short label folded into the index cache fingerprint. Must change whenever
    /// a setting that affects `build` changes.
    fn signature(&self) -> String;

    /// All-or-nothing: either every chunk is indexed or an error is returned.
    fn build(&self, chunks: &[Chunk]) -> Result<Self::Index>;

    /// At most `k` hits, descending by score, ties in ascending chunk order.
    fn query(&self, index: &Self::Index, text: &str, k: usize) -> Result<Vec<ScoredChunk>>;
}
