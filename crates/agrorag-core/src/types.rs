//! Domain types shared by the segmenter, both retrieval variants and the
//! response composer.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub type ChunkId = String;

/// Raw text extracted from one source document.
///
/// - `id`: stable document identity (file stem or caller-supplied id)
/// - `path`: original path, `None` for in-memory documents
/// - `text`: the extracted text, never modified after loading
/// - `content_hash`: blake3 hex digest of `text`, used as the cache identity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub path: Option<PathBuf>,
    pub text: String,
    pub content_hash: String,
}

impl Document {
    pub fn from_text(id: impl Into<String>, text: impl Into<String>) -> Self {
        let text = text.into();
        let content_hash = blake3::hash(text.as_bytes()).to_hex().to_string();
        Self { id: id.into(), path: None, text, content_hash }
    }

    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn stats(&self, sections: usize) -> DocumentStats {
        DocumentStats {
            characters: self.text.chars().count(),
            words: self.text.split_whitespace().count(),
            sections,
        }
    }
}

/// Size summary of a loaded document and its segmentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentStats {
    pub characters: usize,
    pub words: usize,
    pub sections: usize,
}

/// A fixed-size word window over a document; the atomic unit of retrieval.
///
/// `chunk_index`/`total_chunks` give the position within the parent document.
/// `content` holds the window's words joined by single spaces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub id: ChunkId,
    pub doc_id: String,
    pub content: String,
    pub chunk_index: usize,
    pub total_chunks: usize,
    pub word_count: usize,
}

impl Chunk {
    pub fn char_len(&self) -> usize {
        self.content.chars().count()
    }
}

/// One entry of a ranked query result. `score` lies in `[0, 1]`, higher is better.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredChunk {
    pub chunk: Chunk,
    pub score: f32,
}

impl ScoredChunk {
    /// The chunk text cut to at most `max_chars` characters, with `...` appended
    /// when something was cut.
    pub fn preview(&self, max_chars: usize) -> String {
        truncate_chars(&self.chunk.content, max_chars)
    }
}

pub(crate) fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte, _)) => format!("{}...", &text[..byte]),
        None => text.to_string(),
    }
}

/// Sorts hits descending by score; equal scores keep ascending chunk order.
pub fn rank(hits: &mut [ScoredChunk]) {
    hits.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.chunk.chunk_index.cmp(&b.chunk.chunk_index))
    });
}

/// Presentation band derived from an answer's confidence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelevanceTier {
    High,
    Medium,
    Low,
}

impl RelevanceTier {
    pub const HIGH_THRESHOLD: f32 = 0.3;
    pub const LOW_THRESHOLD: f32 = 0.1;

    /// `> 0.3` is high, `(0.1, 0.3]` is medium, anything else is low.
    pub fn from_confidence(confidence: f32) -> Self {
        if confidence > Self::HIGH_THRESHOLD {
            Self::High
        } else if confidence > Self::LOW_THRESHOLD {
            Self::Medium
        } else {
            Self::Low
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }
}

/// The composed response handed back to the presentation layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Answer {
    pub text: String,
    pub confidence: f32,
    pub tier: RelevanceTier,
    pub key_terms: Vec<String>,
    pub supporting: Vec<ScoredChunk>,
}

impl Answer {
    pub fn is_empty_match(&self) -> bool {
        self.supporting.is_empty()
    }
}

/// Mean score of the given hits, `0.0` for an empty slice.
pub fn mean_score(hits: &[ScoredChunk]) -> f32 {
    if hits.is_empty() {
        return 0.0;
    }
    hits.iter().map(|h| h.score).sum::<f32>() / hits.len() as f32
}
