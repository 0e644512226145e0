//! Text chunking with character offsets and overlap
//!
//! Each segment is cut into windows of at most `chunk_size` characters.
//! A window ends at the latest paragraph break that fits, else the latest
//! sentence boundary, line break, or whitespace, and is hard-cut when none
//! of those leave enough room. The next window starts `overlap` characters
//! before the previous end.
//!
//! A window holding only whitespace is not emitted; chunking resumes at the
//! next non-whitespace character, so the chunks on either side of such a
//! gap do not overlap.

use unicode_segmentation::UnicodeSegmentation;

use crate::error::{Error, Result};
use crate::types::{Chunk, ChunkSource, LoadedSegment};

/// Text chunker with configurable size and overlap
#[derive(Debug, Clone)]
pub struct TextChunker {
    /// Maximum chunk size in characters
    chunk_size: usize,
    /// Overlap between chunks in characters
    overlap: usize,
}

/// Candidate break offsets within one segment, in characters, ascending
struct Boundaries {
    paragraphs: Vec<usize>,
    sentences: Vec<usize>,
    lines: Vec<usize>,
    words: Vec<usize>,
}

impl Boundaries {
    fn scan(text: &str, byte_offsets: &[usize]) -> Self {
        let mut paragraphs = Vec::new();
        let mut lines = Vec::new();
        let mut words = Vec::new();

        let mut previous = None;
        for (index, ch) in text.chars().enumerate() {
            if ch == '\n' {
                lines.push(index + 1);
                if previous == Some('\n') {
                    paragraphs.push(index + 1);
                }
            }
            if ch.is_whitespace() {
                words.push(index + 1);
            }
            previous = Some(ch);
        }

        let sentences = text
            .split_sentence_bound_indices()
            .map(|(byte, _)| byte_offsets.partition_point(|&b| b < byte))
            .filter(|&offset| offset > 0)
            .collect();

        Self {
            paragraphs,
            sentences,
            lines,
            words,
        }
    }

    /// Latest preferred boundary in `(floor, ceiling]`
    fn best_in(&self, floor: usize, ceiling: usize) -> Option<usize> {
        [&self.paragraphs, &self.sentences, &self.lines, &self.words]
            .into_iter()
            .find_map(|candidates| {
                let idx = candidates.partition_point(|&c| c <= ceiling);
                candidates[..idx].last().copied().filter(|&c| c > floor)
            })
    }
}

impl TextChunker {
    /// Create a new chunker; the overlap must be smaller than the chunk size
    pub fn new(chunk_size: usize, overlap: usize) -> Result<Self> {
        if chunk_size == 0 || overlap >= chunk_size {
            return Err(Error::Config(format!(
                "chunk overlap ({}) must be smaller than a positive chunk size ({})",
                overlap, chunk_size
            )));
        }
        Ok(Self {
            chunk_size,
            overlap,
        })
    }

    /// Maximum chunk size in characters
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Overlap between consecutive chunks in characters
    pub fn overlap(&self) -> usize {
        self.overlap
    }

    /// Split loaded segments into chunks, numbered across the whole run
    pub fn split(&self, segments: &[LoadedSegment]) -> Result<Vec<Chunk>> {
        let mut chunks = Vec::new();
        for segment in segments {
            self.chunk_segment(segment, &mut chunks);
        }

        if chunks.is_empty() {
            return Err(Error::EmptyInput);
        }
        Ok(chunks)
    }

    fn chunk_segment(&self, segment: &LoadedSegment, chunks: &mut Vec<Chunk>) {
        let text = segment.text.as_str();
        let byte_offsets: Vec<usize> = text
            .char_indices()
            .map(|(byte, _)| byte)
            .chain(std::iter::once(text.len()))
            .collect();
        let total = byte_offsets.len() - 1;

        let Some(mut start) = text.chars().position(|c| !c.is_whitespace()) else {
            return;
        };
        let boundaries = Boundaries::scan(text, &byte_offsets);

        // Breaks too close to the window start make tiny chunks
        let min_advance = self.overlap.max(self.chunk_size / 2);

        loop {
            let ceiling = (start + self.chunk_size).min(total);
            let end = if ceiling == total {
                total
            } else {
                boundaries
                    .best_in(start + min_advance, ceiling)
                    .unwrap_or(ceiling)
            };

            let piece = &text[byte_offsets[start]..byte_offsets[end]];
            if piece.trim().is_empty() {
                match text[byte_offsets[end]..].chars().position(|c| !c.is_whitespace()) {
                    Some(skip) => {
                        start = end + skip;
                        continue;
                    }
                    None => break,
                }
            }
            chunks.push(Chunk {
                text: piece.to_string(),
                source: ChunkSource {
                    source_name: segment.source_name.clone(),
                    page: segment.page,
                    char_start: start,
                    char_end: end,
                    chunk_index: chunks.len() as u32,
                },
            });

            if end >= total || text[byte_offsets[end]..].trim().is_empty() {
                break;
            }
            start = end - self.overlap;
        }
    }
}
