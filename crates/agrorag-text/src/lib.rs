//! agrorag-text
//!
//! Lexical retrieval: a tantivy analyzer chain feeds a TF-IDF vectorizer, and
//! chunks are ranked by cosine similarity against the projected query.

pub mod analyzer;
pub mod index;
pub mod vectorizer;

pub use analyzer::Analyzer;
pub use index::{SparseIndex, SparseRetriever};
pub use vectorizer::{SparseVector, TfidfModel, VectorizerOptions};
