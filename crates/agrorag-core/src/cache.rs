//! Memoization of built indexes keyed by an explicit fingerprint.

use std::sync::Arc;

use crate::error::Result;

/// Identity of a built index: which document, how it was chunked and which
/// retriever settings were used.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint {
    pub content_hash: String,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub retriever: String,
}

impl Fingerprint {
    pub fn new(content_hash: &str, chunk_size: usize, chunk_overlap: usize, retriever: impl Into<String>) -> Self {
        Self {
            content_hash: content_hash.to_string(),
            chunk_size,
            chunk_overlap,
            retriever: retriever.into(),
        }
    }

    /// Short hex digest, handy for logs.
    pub fn digest(&self) -> String {
        let mut hasher = blake3::Hasher::new();
        hasher.update(self.content_hash.as_bytes());
        hasher.update(&(self.chunk_size as u64).to_le_bytes());
        hasher.update(&(self.chunk_overlap as u64).to_le_bytes());
        hasher.update(self.retriever.as_bytes());
        let hex = hasher.finalize().to_hex();
        hex.as_str()[..12].to_string()
    }
}

/// Holds at most one built index. A lookup with a different fingerprint drops
/// the cached one and builds anew.
pub struct IndexCache<I> {
    slot: Option<(Fingerprint, Arc<I>)>,
    builds: usize,
}

impl<I> Default for IndexCache<I> {
    fn default() -> Self {
        Self { slot: None, builds: 0 }
    }
}

impl<I> IndexCache<I> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached index for `fingerprint`, building it with `build` on a miss.
    /// A failed build leaves the cache empty.
    pub fn get_or_build<F>(&mut self, fingerprint: &Fingerprint, build: F) -> Result<Arc<I>>
    where
        F: FnOnce() -> Result<I>,
    {
        if let Some((cached, index)) = &self.slot {
            if cached == fingerprint {
                tracing::debug!(fingerprint = %fingerprint.digest(), "index cache hit");
                return Ok(Arc::clone(index));
            }
            tracing::info!(
                old = %cached.digest(),
                new = %fingerprint.digest(),
                "fingerprint changed, invalidating cached index"
            );
        }
        self.slot = None;
        let index = Arc::new(build()?);
        self.builds += 1;
        self.slot = Some((fingerprint.clone(), Arc::clone(&index)));
        Ok(index)
    }

    pub fn current(&self) -> Option<&Fingerprint> {
        self.slot.as_ref().map(|(fp, _)| fp)
    }

    /// Number of successful builds since creation.
    pub fn builds(&self) -> usize {
        self.builds
    }
}
