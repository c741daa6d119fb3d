use crate::series::SeriesFrame;
use tracing::debug;

/// Bounded LRU cache of loaded partition frames.
///
/// Incremental fitting re-reads the full processed history on every step;
/// the buffer keeps the most recently touched frames in memory so resumed
/// runs do not hit the filesystem for every historical partition.
#[derive(Debug)]
pub struct FrameBuffer {
    max_size: usize,
    entries: Vec<(String, SeriesFrame)>,
}

impl FrameBuffer {
    #[must_use]
    pub fn new(max_size: usize) -> Self {
        Self { max_size: max_size.max(1), entries: Vec::new() }
    }

    /// Insert a frame, evicting the least recently used entry when full.
    pub fn insert(&mut self, key: impl Into<String>, frame: SeriesFrame) {
        let key = key.into();
        self.entries.retain(|(k, _)| *k != key);
        self.entries.push((key, frame));

        while self.entries.len() > self.max_size {
            let (evicted, _) = self.entries.remove(0);
            debug!(key = %evicted, "evicted frame from buffer");
        }
    }

    /// Fetch a frame, refreshing its recency.
    pub fn get(&mut self, key: &str) -> Option<&SeriesFrame> {
        let pos = self.entries.iter().position(|(k, _)| k == key)?;
        let entry = self.entries.remove(pos);
        self.entries.push(entry);
        self.entries.last().map(|(_, frame)| frame)
    }

    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.entries.iter().any(|(k, _)| k == key)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn keys(&self) -> Vec<&str> {
        self.entries.iter().map(|(k, _)| k.as_str()).collect()
    }
}
