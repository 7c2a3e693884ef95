//! Embedding and generation collaborators.
//!
//! `HashEmbedder` is deterministic and offline; `OpenAiEmbedder` and
//! `OpenAiGenerator` talk to any OpenAI-compatible HTTP endpoint.

pub mod hashing;
pub mod openai;

pub use hashing::HashEmbedder;
pub use openai::{OpenAiEmbedder, OpenAiGenerator};

use agrorag_core::config::ProviderConfig;
use agrorag_core::error::Result;
use agrorag_core::traits::Embedder;

pub const FAKE_EMBEDDING_DIM: usize = 384;

/// True when `APP_USE_FAKE_EMBEDDINGS` is `1` or `true`.
pub fn fake_embeddings_requested() -> bool {
    std::env::var("APP_USE_FAKE_EMBEDDINGS")
        .ok()
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

/// The hashing embedder when fake embeddings are requested, the HTTP
/// embedder otherwise.
pub fn get_default_embedder(provider: &ProviderConfig) -> Result<Box<dyn Embedder>> {
    if fake_embeddings_requested() {
        tracing::info!(dim = FAKE_EMBEDDING_DIM, "using HashEmbedder");
        return Ok(Box::new(HashEmbedder::new(FAKE_EMBEDDING_DIM)));
    }
    Ok(Box::new(OpenAiEmbedder::from_config(provider)?))
}
