//! Append-only history of dispatched chunks.

use std::sync::Mutex;

use glossa_core::types::Chunk;

/// In-memory, append-only chunk log.
///
/// Chunks land in response-arrival order, which under concurrent in-flight
/// dispatches is not necessarily transcript order; `list_chronological`
/// sorts by each chunk's captured dispatch offset. Entries are never
/// removed or reordered; the log clears only when a new session starts.
pub struct HistoryStore {
    chunks: Mutex<Vec<Chunk>>,
}

impl HistoryStore {
    /// Create an empty history.
    pub fn new() -> Self {
        Self {
            chunks: Mutex::new(Vec::new()),
        }
    }

    /// Append a chunk to the end of the log.
    pub fn append(&self, chunk: Chunk) {
        let mut chunks = match self.chunks.lock() {
            Ok(c) => c,
            Err(poisoned) => poisoned.into_inner(),
        };
        chunks.push(chunk);
    }

    /// All chunks in arrival order.
    pub fn list_all(&self) -> Vec<Chunk> {
        match self.chunks.lock() {
            Ok(c) => c.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// All chunks sorted by dispatch offset (transcript order).
    pub fn list_chronological(&self) -> Vec<Chunk> {
        let mut chunks = self.list_all();
        chunks.sort_by_key(|c| c.offset);
        chunks
    }

    /// Number of recorded chunks.
    pub fn len(&self) -> usize {
        match self.chunks.lock() {
            Ok(c) => c.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop all chunks. Called only when a new session starts.
    pub fn clear(&self) {
        let mut chunks = match self.chunks.lock() {
            Ok(c) => c,
            Err(poisoned) => poisoned.into_inner(),
        };
        chunks.clear();
    }
}

impl Default for HistoryStore {
    fn default() -> Self {
        Self::new()
    }
}
