//! Chunk Stitcher - rebuilds continuous text from overlapping chunks
//!
//! Provides:
//! - Position ordering of a fetched window
//! - Suffix/prefix overlap detection bounded by the declared overlap
//! - Concatenation with each detected overlap removed once

use mosaic_common::document::Chunk;
use tracing::{debug, warn};

/// Stitches the chunks of one group window back together
#[derive(Debug, Clone, Copy, Default)]
pub struct ChunkStitcher;

impl ChunkStitcher {
    pub fn new() -> Self {
        Self
    }

    /// Join `chunks` in position order, dropping the text each one repeats
    /// from its predecessor.
    ///
    /// The overlap bound is the first chunk's declared overlap. When no
    /// overlap is found the next chunk is appended whole.
    pub fn stitch(&self, chunks: &[Chunk]) -> String {
        let mut ordered: Vec<&Chunk> = chunks.iter().collect();
        ordered.sort_by_key(|chunk| chunk.position);

        let Some(first) = ordered.first() else {
            return String::new();
        };
        let max_overlap = first.declared_overlap;
        let mut stitched = first.text.clone();

        for pair in ordered.windows(2) {
            let (prev, current) = (pair[0], pair[1]);
            let overlap = find_overlap(&prev.text, &current.text, max_overlap);

            if overlap == 0 && max_overlap > 0 {
                warn!(
                    chunk_id = %current.id,
                    position = current.position,
                    max_overlap,
                    "No overlap with previous chunk, appending whole text"
                );
            }
            stitched.push_str(&current.text[byte_offset(&current.text, overlap)..]);
        }

        debug!(chunks = ordered.len(), chars = stitched.chars().count(), "Stitched window");
        stitched
    }
}

/// Longest `i <= min(chars(prev), max_overlap)` such that `prev` ends with
/// the first `i` characters of `current`; 0 when none
pub fn find_overlap(prev: &str, current: &str, max_overlap: usize) -> usize {
    let upper = prev.chars().count().min(max_overlap);
    (1..=upper)
        .rev()
        .find(|&i| prev.ends_with(&current[..byte_offset(current, i)]))
        .unwrap_or(0)
}

/// Byte offset just past the first `chars` characters, or the end of `text`
fn byte_offset(text: &str, chars: usize) -> usize {
    text.char_indices()
        .nth(chars)
        .map_or(text.len(), |(offset, _)| offset)
}
