use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use agrorag_core::cache::{Fingerprint, IndexCache};
use agrorag_core::config::{validate_chunking, EngineConfig, ProviderConfig};
use agrorag_core::error::{Error, Result};
use agrorag_core::loader::load_document;
use agrorag_core::segment::segment;
use agrorag_core::traits::{Embedder, Retriever, SearchIndex};
use agrorag_core::types::{Answer, Document, DocumentStats};
use agrorag_text::SparseRetriever;
use agrorag_vector::DenseRetriever;

use crate::compose::Composer;

/// Answers questions about one document with a fixed retriever and composer.
///
/// The index is built on first use and reused until the document or the
/// chunking settings change.
pub struct Engine<R: Retriever> {
    document: Document,
    config: EngineConfig,
    retriever: R,
    composer: Composer,
    cache: IndexCache<R::Index>,
}

impl<R: Retriever> Engine<R> {
    pub fn new(document: Document, config: EngineConfig, retriever: R, composer: Composer) -> Result<Self> {
        config.validate()?;
        Ok(Self { document, config, retriever, composer, cache: IndexCache::new() })
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn fingerprint(&self) -> Fingerprint {
        Fingerprint::new(
            &self.document.content_hash,
            self.config.chunk_size,
            self.config.chunk_overlap,
            self.retriever.signature(),
        )
    }

    /// Builds (or reuses) the index for the current document and chunking.
    pub fn index(&mut self) -> Result<Arc<R::Index>> {
        let fingerprint = self.fingerprint();
        let Self { document, config, retriever, cache, .. } = self;
        cache.get_or_build(&fingerprint, || {
            let chunks = segment(document, config.chunk_size, config.chunk_overlap)?;
            if chunks.is_empty() {
                return Err(Error::Indexing(format!("document '{}' has no text to index", document.id)));
            }
            tracing::info!(doc = %document.id, chunks = chunks.len(), fingerprint = %fingerprint.digest(), "building index");
            retriever.build(&chunks)
        })
    }

    /// Number of index builds so far; stays put while the fingerprint is unchanged.
    pub fn builds(&self) -> usize {
        self.cache.builds()
    }

    pub fn stats(&mut self) -> Result<DocumentStats> {
        let sections = self.index()?.chunks().len();
        Ok(self.document.stats(sections))
    }

    pub fn set_document(&mut self, document: Document) {
        self.document = document;
    }

    pub fn set_chunking(&mut self, chunk_size: usize, chunk_overlap: usize) -> Result<()> {
        validate_chunking(chunk_size, chunk_overlap)?;
        self.config.chunk_size = chunk_size;
        self.config.chunk_overlap = chunk_overlap;
        Ok(())
    }

    pub fn answer(&mut self, query: &str) -> Result<Answer> {
        let query = query.trim();
        if query.is_empty() {
            return Err(Error::Validation("query must not be empty".into()));
        }
        let start = Instant::now();
        let index = self.index()?;
        let hits = self.retriever.query(&index, query, self.config.top_k)?;
        tracing::debug!(query, hits = hits.len(), "chunks ranked");
        let answer = self.composer.compose(query, hits, &*index)?;
        tracing::info!(
            composer = self.composer.name(),
            confidence = answer.confidence,
            tier = answer.tier.label(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "question answered"
        );
        Ok(answer)
    }
}

/// Lexical engine over a document on disk.
pub fn sparse_engine(path: &Path, config: EngineConfig, composer: Composer) -> Result<Engine<SparseRetriever>> {
    config.validate()?;
    let document = load_document(path)?;
    let retriever = SparseRetriever::from_config(&config);
    Engine::new(document, config, retriever, composer)
}

/// Dense engine over a document on disk, embedding through `embedder`.
pub fn dense_engine(
    path: &Path,
    config: EngineConfig,
    provider: &ProviderConfig,
    embedder: Box<dyn Embedder>,
    composer: Composer,
) -> Result<Engine<DenseRetriever>> {
    config.validate()?;
    provider.validate()?;
    let document = load_document(path)?;
    let retriever = DenseRetriever::new(embedder).with_batch_size(provider.batch_size).with_progress(true);
    Engine::new(document, config, retriever, composer)
}
