//! Splitting document text into overlapping fixed-size passages.
//!
//! The chunker is a pure function: the same text and parameters always
//! produce the same chunk sequence, which is what makes re-ingestion
//! idempotent.

use crate::error::{FinbotError, Result};
use serde::{Deserialize, Serialize};

/// A bounded contiguous slice of a document's text, the unit of retrieval.
///
/// Offsets are character offsets into the extracted document text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    /// Position of this chunk in the document's chunk sequence.
    pub index: usize,
    /// Start character offset (inclusive).
    pub start: usize,
    /// End character offset (exclusive).
    pub end: usize,
    /// Text content of this chunk.
    pub content: String,
}

/// Split text into overlapping chunks of `size` characters.
///
/// A window of `size` characters slides forward by `size - overlap` each
/// step. The remainder shorter than `size` becomes the final chunk verbatim;
/// whitespace-only remainders are dropped rather than emitted as degenerate
/// chunks. Empty input produces an empty sequence, not an error.
pub fn chunk_text(text: &str, size: usize, overlap: usize) -> Result<Vec<Chunk>> {
    if size == 0 {
        return Err(FinbotError::Config(
            "chunk size must be greater than zero".to_string(),
        ));
    }
    if overlap >= size {
        return Err(FinbotError::Config(format!(
            "chunk overlap ({}) must be less than chunk size ({})",
            overlap, size
        )));
    }

    if text.trim().is_empty() {
        return Ok(Vec::new());
    }

    let chars: Vec<char> = text.chars().collect();
    let step = size - overlap;
    let mut chunks = Vec::new();
    let mut start = 0;

    while start < chars.len() {
        let end = (start + size).min(chars.len());
        let content: String = chars[start..end].iter().collect();

        if !content.trim().is_empty() {
            chunks.push(Chunk {
                index: chunks.len(),
                start,
                end,
                content,
            });
        }

        if end == chars.len() {
            break;
        }
        start += step;
    }

    Ok(chunks)
}
