//! Scatter-gather receive buffer.
//!
//! Received bytes are appended to a chain of chunks. A new chunk is allocated
//! only when the current one is full, sized to hold at least the rest of the
//! pending write and growing geometrically. [`ScatterGatherBuffer::to_array`]
//! copies everything into one contiguous array with a reserved prefix, so a
//! response head can be spliced in without a second copy of the body.

use crate::config::{CHUNK_SIZE_CEILING, DEFAULT_CHUNK_SIZE};

/// Growable chunk chain for in-memory response bodies.
#[derive(Debug, Default)]
pub struct ScatterGatherBuffer {
    chunks: Vec<Vec<u8>>,
    len: usize,
}

impl ScatterGatherBuffer {
    /// Creates a buffer whose first chunk holds `capacity` bytes.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            chunks: vec![Vec::with_capacity(capacity)],
            len: 0,
        }
    }

    /// Sizes the first chunk from a declared content length.
    ///
    /// Lengths above the ceiling (or unknown ones) fall back to the default
    /// chunk size.
    #[must_use]
    pub fn for_declared_length(declared: Option<u64>) -> Self {
        let initial = declared
            .and_then(|n| usize::try_from(n).ok())
            .filter(|&n| n > 0 && n <= CHUNK_SIZE_CEILING)
            .unwrap_or(DEFAULT_CHUNK_SIZE);
        Self::with_capacity(initial)
    }

    /// Appends `data`, allocating new chunks as needed.
    pub fn append(&mut self, mut data: &[u8]) {
        while !data.is_empty() {
            let needs_chunk = self
                .chunks
                .last()
                .is_none_or(|chunk| chunk.len() == chunk.capacity());
            if needs_chunk {
                let previous = self.chunks.last().map_or(0, Vec::capacity);
                let grown = previous.saturating_mul(2).min(CHUNK_SIZE_CEILING);
                self.chunks.push(Vec::with_capacity(grown.max(data.len())));
            }
            let Some(chunk) = self.chunks.last_mut() else {
                return;
            };
            let take = (chunk.capacity() - chunk.len()).min(data.len());
            chunk.extend_from_slice(&data[..take]);
            data = &data[take..];
            self.len += take;
        }
    }

    /// Total bytes stored.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// True when nothing has been stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of chunks in the chain.
    #[must_use]
    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    /// Copies the chain into one array preceded by `head_reserve` zero bytes.
    #[must_use]
    pub fn to_array(&self, head_reserve: usize) -> Vec<u8> {
        let mut out = Vec::with_capacity(head_reserve + self.len);
        out.resize(head_reserve, 0);
        for chunk in &self.chunks {
            out.extend_from_slice(chunk);
        }
        out
    }
}
