//! Fixed-window text chunking with configurable size and overlap.
//!
//! Offsets are counted in characters (Unicode scalar values), so multi-byte
//! text is never split inside a code point.

/// Chunking parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkConfig {
    /// Window length in characters
    pub size: usize,

    /// Characters shared by consecutive windows
    pub overlap: usize,
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            size: 900,
            overlap: 120,
        }
    }
}

impl ChunkConfig {
    /// Distance between window starts. Never zero.
    pub fn step(&self) -> usize {
        self.size.saturating_sub(self.overlap).max(1)
    }
}

/// Split `text` into overlapping windows.
///
/// Windows start at 0 and advance by `max(1, size - overlap)` while the
/// start is inside the text. The last window may be shorter than `size`.
/// Empty text or `size == 0` yields no chunks.
pub fn chunk_text(text: &str, size: usize, overlap: usize) -> Vec<&str> {
    if text.is_empty() || size == 0 {
        return Vec::new();
    }

    let step = ChunkConfig { size, overlap }.step();

    // Byte offset of every character, plus the end of the text.
    let mut bounds: Vec<usize> = text.char_indices().map(|(i, _)| i).collect();
    let len = bounds.len();
    bounds.push(text.len());

    let mut chunks = Vec::with_capacity(len.div_ceil(step));
    let mut offset = 0;

    while offset < len {
        let end = (offset + size).min(len);
        chunks.push(&text[bounds[offset]..bounds[end]]);
        offset += step;
    }

    chunks
}

/// Split using a [`ChunkConfig`].
pub fn chunk_with(text: &str, config: ChunkConfig) -> Vec<&str> {
    chunk_text(text, config.size, config.overlap)
}
