//! agrorag-vector
//!
//! Dense retrieval: chunks are embedded in batches through an external
//! `Embedder` into an in-memory store ranked by cosine similarity.

pub mod store;

pub use store::{DenseIndex, DenseRetriever};
