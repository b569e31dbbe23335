//! Overlapping text chunker for embedding.
//!
//! Splits text into pieces of at most `chunk_size` characters. Each cut is
//! placed at the last paragraph break inside the window, else the last line
//! break, else the last sentence end, else the last space, else a hard cut.
//! Consecutive chunks share up to `chunk_overlap` characters, and every
//! chunk records its byte span so the source can be rebuilt exactly.

use serde::{Deserialize, Serialize};

/// Break preferences, best first.
pub const SEPARATORS: [&str; 4] = ["\n\n", "\n", ". ", " "];

pub const DEFAULT_CHUNK_SIZE: usize = 1000;
pub const DEFAULT_CHUNK_OVERLAP: usize = 100;

/// Chunk sizing, in characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkConfig {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
        }
    }
}

/// A chunk and its byte span in the source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextChunk {
    pub text: String,
    pub start: usize,
    pub end: usize,
}

/// Split `text` into overlapping chunks. Blank text yields no chunks.
pub fn split_text(text: &str, config: &ChunkConfig) -> Vec<TextChunk> {
    if text.trim().is_empty() {
        return Vec::new();
    }

    let size = config.chunk_size.max(1);
    let overlap = config.chunk_overlap.min(size - 1);

    // bounds[i] is the byte offset of char i; the last entry is text.len()
    let bounds: Vec<usize> = text
        .char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(text.len()))
        .collect();
    let char_count = bounds.len() - 1;

    let mut chunks = Vec::new();
    let mut start = 0;
    loop {
        if char_count - start <= size {
            chunks.push(make_chunk(text, &bounds, start, char_count));
            break;
        }

        let end = find_break(text, &bounds, start, start + size, overlap);
        chunks.push(make_chunk(text, &bounds, start, end));
        start = next_start(text, &bounds, end, overlap);
    }
    chunks
}

/// Rebuild the source from chunks, dropping the overlapping prefixes.
pub fn reconstruct(chunks: &[TextChunk]) -> String {
    let mut out = String::new();
    let mut covered: usize = 0;
    for chunk in chunks {
        let skip = covered.saturating_sub(chunk.start).min(chunk.text.len());
        out.push_str(&chunk.text[skip..]);
        covered = covered.max(chunk.end);
    }
    out
}

fn make_chunk(text: &str, bounds: &[usize], start: usize, end: usize) -> TextChunk {
    let (start, end) = (bounds[start], bounds[end]);
    TextChunk {
        text: text[start..end].to_string(),
        start,
        end,
    }
}

/// Char index to cut at. Only breaks past `start + overlap` count, so the
/// next chunk always starts after this one did.
fn find_break(text: &str, bounds: &[usize], start: usize, window_end: usize, overlap: usize) -> usize {
    let window = &text[bounds[start]..bounds[window_end]];
    for sep in SEPARATORS {
        let Some(pos) = window.rfind(sep) else {
            continue;
        };
        let cut_byte = bounds[start] + pos + sep.len();
        if let Ok(cut) = bounds.binary_search(&cut_byte) {
            if cut > start + overlap {
                return cut;
            }
        }
    }
    window_end
}

/// Start of the next chunk: `end - overlap`, moved forward to the first word
/// start before `end` when there is one.
fn next_start(text: &str, bounds: &[usize], end: usize, overlap: usize) -> usize {
    let earliest = end - overlap;
    (earliest..end)
        .find(|&i| {
            i == 0
                || text[bounds[i - 1]..bounds[i]]
                    .chars()
                    .all(char::is_whitespace)
        })
        .unwrap_or(earliest)
}
