//! Fixed prompt template: retrieved chunk texts as context, the raw
//! query as question.

use docchat_core::types::ScoredChunk;

pub const PROMPT_TEMPLATE: &str = "\
Use the following pieces of information to answer the user's question.
If you don't know the answer, just say that you don't know, don't try to make up an answer.

Context: {context}
Question: {question}

Only return the helpful answer below and nothing else.
Helpful answer:
";

pub fn build_prompt(context: &str, question: &str) -> String {
    PROMPT_TEMPLATE.replace("{context}", context).replace("{question}", question)
}

/// Concatenate retrieved chunk texts, blank-line separated, in retrieval
/// order (nearest first).
pub fn context_text(chunks: &[ScoredChunk]) -> String {
    chunks.iter().map(|c| c.chunk.content.as_str()).collect::<Vec<_>>().join("\n\n")
}
