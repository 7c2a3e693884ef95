//! Word-window segmentation with overlap.

use crate::config::validate_chunking;
use crate::error::Result;
use crate::types::{Chunk, Document};

/// Collapses whitespace runs to single spaces and trims.
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Splits `text` into windows of `size` words advancing by `size - overlap`.
///
/// Empty or whitespace-only text gives no windows. The last window may be
/// shorter than `size`; no window is emitted once a previous one reached the
/// final word, so a tail made only of overlap is never repeated.
pub fn split_words(text: &str, size: usize, overlap: usize) -> Result<Vec<String>> {
    validate_chunking(size, overlap)?;
    let words: Vec<&str> = text.split_whitespace().collect();
    let stride = size - overlap;
    let mut windows = Vec::new();
    let mut start = 0;
    while start < words.len() {
        let end = (start + size).min(words.len());
        windows.push(words[start..end].join(" "));
        if end >= words.len() {
            break;
        }
        start += stride;
    }
    Ok(windows)
}

/// Segments a document into ordered chunks.
pub fn segment(doc: &Document, size: usize, overlap: usize) -> Result<Vec<Chunk>> {
    let windows = split_words(&doc.text, size, overlap)?;
    let total_chunks = windows.len();
    let chunks: Vec<Chunk> = windows
        .into_iter()
        .enumerate()
        .map(|(chunk_index, content)| Chunk {
            id: format!("{}:{}", doc.id, chunk_index),
            doc_id: doc.id.clone(),
            word_count: content.split(' ').count(),
            content,
            chunk_index,
            total_chunks,
        })
        .collect();
    tracing::debug!(doc = %doc.id, size, overlap, chunks = chunks.len(), "document segmented");
    Ok(chunks)
}

/// Expected number of windows for `words` words: `ceil((words - overlap) / stride)`,
/// and one window when the whole text fits inside the overlap.
pub fn expected_chunk_count(words: usize, size: usize, overlap: usize) -> usize {
    if words == 0 {
        return 0;
    }
    let stride = size - overlap;
    words.saturating_sub(overlap).div_ceil(stride).max(1)
}
