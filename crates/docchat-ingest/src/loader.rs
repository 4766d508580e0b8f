//! Document loading: a document becomes an ordered list of page texts.
//!
//! The document itself is ephemeral; nothing here retains bytes past
//! chunking. By the time a path reaches this module it is expected to
//! be a supported format, and anything that still fails to parse is
//! `Unparseable`.

use std::fs;
use std::path::Path;

use lopdf::Document;
use tracing::debug;

use docchat_core::error::IngestError;

pub struct PageText {
    pub page: u32,
    pub text: String,
}

/// Load `path` into pages. PDFs keep their 1-based page numbers; plain
/// text formats load as a single page.
pub fn load_pages(path: &Path) -> Result<Vec<PageText>, IngestError> {
    if !path.exists() {
        return Err(IngestError::NotFound(path.to_path_buf()));
    }
    let ext = path.extension().and_then(|s| s.to_str()).unwrap_or("").to_ascii_lowercase();
    let pages = match ext.as_str() {
        "pdf" => load_pdf(path)?,
        _ => load_plaintext(path)?,
    };
    if pages.iter().all(|p| p.text.trim().is_empty()) {
        return Err(IngestError::Unparseable(path.to_path_buf()));
    }
    Ok(pages)
}

fn load_pdf(path: &Path) -> Result<Vec<PageText>, IngestError> {
    let doc = Document::load(path).map_err(|_| IngestError::Unparseable(path.to_path_buf()))?;
    let mut pages = Vec::new();
    for (page_no, _object_id) in doc.get_pages() {
        // A page that fails text extraction contributes an empty page;
        // the document is only Unparseable if every page ends up empty.
        let text = doc.extract_text(&[page_no]).unwrap_or_default();
        debug!(page = page_no, chars = text.len(), "extracted pdf page");
        pages.push(PageText { page: page_no, text });
    }
    if pages.is_empty() {
        return Err(IngestError::Unparseable(path.to_path_buf()));
    }
    Ok(pages)
}

fn load_plaintext(path: &Path) -> Result<Vec<PageText>, IngestError> {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(_) => String::from_utf8_lossy(
            &fs::read(path).map_err(|_| IngestError::Unparseable(path.to_path_buf()))?,
        )
        .to_string(),
    };
    Ok(vec![PageText { page: 1, text }])
}
