//! Error taxonomy shared by every retrieval crate.
//!
//! Configuration and validation errors are caller bugs and are surfaced
//! immediately. `Dependency` wraps failures of an external embedding or
//! generation collaborator and keeps the underlying cause reachable through
//! `std::error::Error::source`.

use std::path::PathBuf;
use thiserror::Error;

pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    #[error("Indexing failed: {0}")]
    Indexing(String),

    #[error("Invalid query: {0}")]
    Validation(String),

    #[error("Dependency failure ({context}): {source}")]
    Dependency {
        context: String,
        #[source]
        source: BoxError,
    },

    #[error("Document not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Could not extract text from {}: {reason}", path.display())]
    Extraction { path: PathBuf, reason: String },
}

impl Error {
    pub fn dependency<E>(context: impl Into<String>, source: E) -> Self
    where
        E: Into<BoxError>,
    {
        Self::Dependency { context: context.into(), source: source.into() }
    }

    /// True for errors that point at a bug in the caller's input.
    pub fn is_caller_error(&self) -> bool {
        matches!(self, Self::Configuration(_) | Self::Validation(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
