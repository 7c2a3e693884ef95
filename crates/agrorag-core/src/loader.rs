//! Document loading: PDF through `pdf-extract`, anything else as text.

use std::fs;
use std::path::Path;
use std::time::Instant;

use crate::error::{Error, Result};
use crate::types::Document;

pub fn load_document(path: &Path) -> Result<Document> {
    if !path.is_file() {
        return Err(Error::NotFound(path.to_path_buf()));
    }
    let start = Instant::now();
    let text = if is_pdf(path) { read_pdf(path)? } else { read_text(path)? };
    if text.trim().is_empty() {
        return Err(Error::Extraction {
            path: path.to_path_buf(),
            reason: "no extractable text (image-based or encrypted document?)".to_string(),
        });
    }
    let doc = Document::from_text(extract_doc_id(path), text).with_path(path);
    tracing::info!(
        path = %path.display(),
        chars = doc.text.len(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "document loaded"
    );
    Ok(doc)
}

fn is_pdf(path: &Path) -> bool {
    path.extension()
        .and_then(|s| s.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"))
}

fn read_pdf(path: &Path) -> Result<String> {
    let bytes = fs::read(path).map_err(|e| extraction(path, e))?;
    pdf_extract::extract_text_from_mem(&bytes).map_err(|e| extraction(path, e))
}

fn read_text(path: &Path) -> Result<String> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(content),
        Err(_) => {
            let bytes = fs::read(path).map_err(|e| extraction(path, e))?;
            Ok(String::from_utf8_lossy(&bytes).to_string())
        }
    }
}

fn extraction(path: &Path, err: impl std::fmt::Display) -> Error {
    Error::Extraction { path: path.to_path_buf(), reason: err.to_string() }
}

fn extract_doc_id(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "document".to_string())
}
