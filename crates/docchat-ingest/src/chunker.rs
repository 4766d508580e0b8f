//! Page-aware chunking: paragraph splitting with word overlap for
//! oversized paragraphs. Chunks never cross a page boundary.

use docchat_core::types::PageChunk;

use crate::loader::PageText;

#[derive(Debug, Clone)]
pub struct ChunkingConfig {
    pub max_tokens: usize,
    pub overlap_percent: f32,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self { max_tokens: 500, overlap_percent: 0.2 }
    }
}

const WORDS_PER_CHUNK: usize = 300;

/// Split every page into chunks. Paragraphs under the token budget stay
/// whole; larger ones are subdivided with overlapping word windows so
/// retrieval does not lose sentences cut at a window edge.
pub fn chunk_pages(doc_id: &str, pages: &[PageText], config: &ChunkingConfig) -> Vec<PageChunk> {
    let mut chunks = Vec::new();
    for page in pages {
        for paragraph in page.text.split("\n\n") {
            let paragraph = paragraph.trim();
            if paragraph.is_empty() {
                continue;
            }
            if approx_tokens(paragraph) <= config.max_tokens {
                chunks.push(PageChunk {
                    doc_id: doc_id.to_string(),
                    page: page.page,
                    content: paragraph.to_string(),
                });
            } else {
                for piece in split_with_overlap(paragraph, config) {
                    chunks.push(PageChunk {
                        doc_id: doc_id.to_string(),
                        page: page.page,
                        content: piece,
                    });
                }
            }
        }
    }
    chunks
}

/// Rough token estimate: one token per 0.75 words.
fn approx_tokens(text: &str) -> usize {
    let word_count = text.split_whitespace().count();
    (word_count as f32 / 0.75) as usize
}

fn split_with_overlap(paragraph: &str, config: &ChunkingConfig) -> Vec<String> {
    let words: Vec<&str> = paragraph.split_whitespace().collect();
    // Clamp so the window always advances even for overlap_percent >= 1.0.
    let overlap_words =
        ((WORDS_PER_CHUNK as f32 * config.overlap_percent) as usize).min(WORDS_PER_CHUNK - 1);
    let mut pieces = Vec::new();
    let mut start = 0;
    while start < words.len() {
        let end = (start + WORDS_PER_CHUNK).min(words.len());
        pieces.push(words[start..end].join(" "));
        if end >= words.len() {
            break;
        }
        start = end - overlap_words;
    }
    pieces
}
