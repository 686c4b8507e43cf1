//! Recursive boundary-aware text splitting.
//!
//! Text is first cut into pieces no longer than the chunk size, preferring the
//! coarsest boundary that works (paragraph, line, sentence, word, then raw
//! characters). Pieces are then packed greedily into chunks, carrying a tail of
//! whole pieces from one chunk into the next as overlap.

use super::{Chunk, ChunkingConfig};
use std::collections::VecDeque;
use std::ops::Range;
use tracing::debug;

/// Boundary levels, coarsest first. A piece ends right after its separator.
const LEVELS: &[&[&str]] = &[
    &["\n\n"],
    &["\n"],
    &[". ", "? ", "! "],
    &[" "],
];

/// A piece of the source text with its length in characters.
#[derive(Debug, Clone)]
struct Piece {
    range: Range<usize>,
    chars: usize,
}

/// Splits text into overlapping chunks.
#[derive(Debug, Clone, Default)]
pub struct Chunker {
    config: ChunkingConfig,
}

impl Chunker {
    /// Create a chunker with the given configuration.
    pub fn new(config: ChunkingConfig) -> Self {
        Self { config }
    }

    /// The active configuration.
    pub fn config(&self) -> &ChunkingConfig {
        &self.config
    }

    /// Split `text` into chunks.
    ///
    /// Every chunk is at most `chunk_size` characters and is an exact slice of `text`.
    /// Consecutive chunks are contiguous or share at most `overlap` characters.
    /// Blank input produces no chunks.
    pub fn split(&self, text: &str) -> Vec<Chunk> {
        if text.trim().is_empty() {
            return Vec::new();
        }

        let mut pieces = Vec::new();
        self.collect_pieces(text, 0, 0, &mut pieces);

        let chunks = self.merge(text, pieces);
        debug!(
            "Split {} characters into {} chunks",
            text.chars().count(),
            chunks.len()
        );
        chunks
    }

    fn collect_pieces(&self, text: &str, offset: usize, level: usize, out: &mut Vec<Piece>) {
        let chars = text.chars().count();
        if chars <= self.config.chunk_size {
            if !text.is_empty() {
                out.push(Piece {
                    range: offset..offset + text.len(),
                    chars,
                });
            }
            return;
        }

        let Some(separators) = LEVELS.get(level) else {
            self.split_characters(text, offset, out);
            return;
        };

        for part in split_after(text, separators) {
            self.collect_pieces(&text[part.clone()], offset + part.start, level + 1, out);
        }
    }

    fn split_characters(&self, text: &str, offset: usize, out: &mut Vec<Piece>) {
        let mut start = 0;
        let mut count = 0;

        for (i, _) in text.char_indices() {
            if count == self.config.chunk_size {
                out.push(Piece {
                    range: offset + start..offset + i,
                    chars: count,
                });
                start = i;
                count = 0;
            }
            count += 1;
        }

        if count > 0 {
            out.push(Piece {
                range: offset + start..offset + text.len(),
                chars: count,
            });
        }
    }

    fn merge(&self, text: &str, pieces: Vec<Piece>) -> Vec<Chunk> {
        let ChunkingConfig {
            chunk_size,
            overlap,
        } = self.config;

        let mut chunks = Vec::new();
        let mut window: VecDeque<Piece> = VecDeque::new();
        let mut window_chars = 0;

        for piece in pieces {
            if !window.is_empty() && window_chars + piece.chars > chunk_size {
                chunks.push(make_chunk(text, &window, chunks.len()));

                while let Some(front) = window.front() {
                    if window_chars > overlap || window_chars + piece.chars > chunk_size {
                        window_chars -= front.chars;
                        window.pop_front();
                    } else {
                        break;
                    }
                }
            }

            window_chars += piece.chars;
            window.push_back(piece);
        }

        if !window.is_empty() {
            chunks.push(make_chunk(text, &window, chunks.len()));
        }

        chunks
    }
}

fn make_chunk(text: &str, window: &VecDeque<Piece>, index: usize) -> Chunk {
    let start = window.front().map_or(0, |p| p.range.start);
    let end = window.back().map_or(start, |p| p.range.end);
    Chunk {
        text: text[start..end].to_string(),
        index,
        start,
        end,
    }
}

/// Split `text` so that each part ends right after one of `separators`.
fn split_after(text: &str, separators: &[&str]) -> Vec<Range<usize>> {
    let mut parts = Vec::new();
    let mut start = 0;
    let mut i = 0;

    while i < text.len() {
        let rest = &text[i..];
        if let Some(sep) = separators.iter().find(|sep| rest.starts_with(**sep)) {
            i += sep.len();
            parts.push(start..i);
            start = i;
        } else {
            i += rest.chars().next().map_or(1, char::len_utf8);
        }
    }

    if start < text.len() {
        parts.push(start..text.len());
    }
    parts
}
