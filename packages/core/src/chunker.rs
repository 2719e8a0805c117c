//! Text chunking for document indexing.
//!
//! Splits text at a target chunk size, preferring to break at the nearest
//! preceding paragraph boundary (`\n\n`) within the last 200 characters of
//! the target offset, else the nearest preceding sentence terminator
//! (`.`, `!`, `?` followed by a space) within the last 100 characters,
//! else exactly at the target size. All offsets are character offsets.
//!
//! The split is deterministic for a given input and chunk size.

use serde::{Deserialize, Serialize};

/// How far back from the target offset a paragraph boundary may be.
const PARAGRAPH_LOOKBACK: usize = 200;

/// How far back from the target offset a sentence boundary may be.
const SENTENCE_LOOKBACK: usize = 100;

/// One chunk of a document, with its position in the source text.
///
/// `text` is trimmed of leading/trailing whitespace; `start`/`end` are the
/// untrimmed character offsets, so ordered raw slices re-join to the
/// original text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub index: usize,
    pub text: String,
    pub start: usize,
    pub end: usize,
}

/// Split `text` into chunks of at most `chunk_size` characters.
///
/// Empty trailing fragments (whitespace-only tails) are dropped.
pub fn chunk_text(text: &str, chunk_size: usize) -> Vec<Chunk> {
    let chunk_size = chunk_size.max(1);
    let offsets: Vec<usize> = text.char_indices().map(|(i, _)| i).collect();
    let total = offsets.len();
    let byte_at = |pos: usize| {
        if pos >= total {
            text.len()
        } else {
            offsets[pos]
        }
    };

    let mut chunks = Vec::new();
    let mut start = 0usize;
    while start < total {
        let target = (start + chunk_size).min(total);
        let end = if target < total {
            find_break(text, byte_at, start, target).unwrap_or(target)
        } else {
            target
        };

        let raw = &text[byte_at(start)..byte_at(end)];
        chunks.push(Chunk {
            index: chunks.len(),
            text: raw.trim().to_string(),
            start,
            end,
        });
        start = end;
    }

    while chunks.last().is_some_and(|c| c.text.is_empty()) {
        chunks.pop();
    }
    chunks
}

/// Best break position in `(start, target]`, or None for a hard cut.
fn find_break(
    text: &str,
    byte_at: impl Fn(usize) -> usize,
    start: usize,
    target: usize,
) -> Option<usize> {
    // Paragraph boundary wins when one is close enough.
    let floor = target.saturating_sub(PARAGRAPH_LOOKBACK).max(start + 1);
    let window = &text[byte_at(floor)..byte_at(target)];
    if let Some(pos) = window.rfind("\n\n") {
        return Some(floor + window[..pos].chars().count() + 2);
    }

    // Otherwise a sentence terminator followed by a space.
    let floor = target.saturating_sub(SENTENCE_LOOKBACK).max(start + 1);
    let window = &text[byte_at(floor)..byte_at(target)];
    let best = [". ", "! ", "? "]
        .iter()
        .filter_map(|pat| window.rfind(pat))
        .max()?;
    Some(floor + window[..best].chars().count() + 2)
}
