//! agrorag-engine
//!
//! Query answering on top of either retrieval backend: validates the query,
//! reuses the memoized index, ranks chunks and composes the final `Answer`.

pub mod compose;
pub mod engine;
pub mod prompt;

pub use compose::Composer;
pub use engine::{dense_engine, sparse_engine, Engine};
