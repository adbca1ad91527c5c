//! Per-key log of admitted request timestamps.

use std::collections::VecDeque;

use tracing::warn;

/// Timestamps of admitted requests for one key, oldest first.
///
/// The log is kept sorted so that expiry only ever looks at the front.
/// It is not synchronized on its own; the limiter holds the owning map
/// shard's write guard for the whole evict-count-append sequence.
#[derive(Debug, Default, Clone)]
pub(crate) struct RequestLog {
    timestamps: VecDeque<f64>,
}

impl RequestLog {
    /// Create an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop every timestamp strictly older than `cutoff`.
    ///
    /// Returns the number of entries removed.
    pub fn evict_before(&mut self, cutoff: f64) -> usize {
        let before = self.timestamps.len();
        while let Some(&oldest) = self.timestamps.front() {
            if oldest >= cutoff {
                break;
            }
            self.timestamps.pop_front();
        }
        before - self.timestamps.len()
    }

    /// Record an admitted request at `now`.
    ///
    /// A timestamp older than the newest entry is inserted at its sorted
    /// position instead of the tail, which keeps front eviction valid.
    pub fn record(&mut self, now: f64) {
        match self.timestamps.back() {
            Some(&newest) if now < newest => {
                warn!(
                    timestamp = now,
                    newest = newest,
                    "Out-of-order timestamp, inserting at sorted position"
                );
                let index = self.timestamps.partition_point(|&t| t <= now);
                self.timestamps.insert(index, now);
            }
            _ => self.timestamps.push_back(now),
        }
    }

    /// Number of timestamps currently held.
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    /// Whether the log holds no timestamps.
    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    /// The oldest retained timestamp, if any.
    pub fn oldest(&self) -> Option<f64> {
        self.timestamps.front().copied()
    }

    /// The newest retained timestamp, if any.
    #[cfg(test)]
    pub fn newest(&self) -> Option<f64> {
        self.timestamps.back().copied()
    }
}
