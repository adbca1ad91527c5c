//! Core sliding-window limiter implementation.

use std::sync::Arc;

use dashmap::DashMap;
use tracing::{debug, trace, warn};

use super::clock::{Clock, SystemClock};
use super::decision::{round_secs, Decision, Status};
use super::window::RequestLog;
use crate::config::LimiterConfig;
use crate::error::Result;

/// Per-key sliding-window log limiter.
///
/// Admits at most `max_requests` requests per key within any trailing
/// `window_seconds`. Only admitted requests are recorded, and expired
/// timestamps are evicted lazily whenever a key is touched.
///
/// The key map is sharded. Every call runs its evict-count-decide-append
/// sequence under the write guard of the key's shard, so concurrent calls on
/// the same key can never both take the last slot, while keys in other shards
/// are not blocked.
pub struct SlidingWindowLimiter {
    /// Admitted-request logs indexed by key
    logs: DashMap<String, RequestLog>,
    max_requests: u64,
    window_seconds: f64,
    clock: Arc<dyn Clock>,
}

impl SlidingWindowLimiter {
    /// Create a limiter reading the system clock.
    ///
    /// Fails with `InvalidConfiguration` unless both values are positive.
    pub fn new(max_requests: u64, window_seconds: f64) -> Result<Self> {
        Self::with_clock(max_requests, window_seconds, Arc::new(SystemClock))
    }

    /// Create a limiter that reads "now" from `clock`.
    pub fn with_clock(
        max_requests: u64,
        window_seconds: f64,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        LimiterConfig::new(max_requests, window_seconds).validate()?;

        debug!(max_requests, window_seconds, "Creating sliding window limiter");

        Ok(Self::from_validated(max_requests, window_seconds, clock))
    }

    /// Assemble a limiter from parameters that already passed validation.
    fn from_validated(max_requests: u64, window_seconds: f64, clock: Arc<dyn Clock>) -> Self {
        Self {
            logs: DashMap::new(),
            max_requests,
            window_seconds,
            clock,
        }
    }

    /// Create a limiter from a loaded configuration.
    pub fn from_config(config: &LimiterConfig) -> Result<Self> {
        config.validate()?;
        Self::new(config.max_requests, config.window_seconds)
    }

    /// Check and, if admitted, record a request for `key` at the current time.
    pub fn check(&self, key: &str) -> Decision {
        self.check_at(key, self.clock.now())
    }

    /// Check and, if admitted, record a request for `key` at `now`.
    ///
    /// Timestamps for a key are expected to be non-decreasing. An older
    /// timestamp is still handled, but the quota guarantee only covers
    /// monotonic callers. A non-finite `now` is rejected without touching
    /// the key's log.
    pub fn check_at(&self, key: &str, now: f64) -> Decision {
        if !now.is_finite() {
            warn!(key = %key, now, "Non-finite timestamp, rejecting request");
            let count = self.logs.get(key).map_or(0, |log| log.len() as u64);
            return Decision::invalid_timestamp(
                key,
                count,
                self.max_requests,
                self.window_seconds,
            );
        }

        let cutoff = now - self.window_seconds;

        trace!(key = %key, now, "Checking rate limit");

        let mut log = self.logs.entry(key.to_string()).or_insert_with(|| {
            debug!(key = %key, "Creating request log");
            RequestLog::new()
        });

        log.evict_before(cutoff);
        let count = log.len() as u64;

        if count >= self.max_requests {
            let oldest = log.oldest().unwrap_or(now);
            drop(log);

            let time_until_reset = self.window_seconds - (now - oldest);
            debug!(
                key = %key,
                count,
                time_until_reset,
                "Rate limit exceeded"
            );
            return Decision::rejected(
                key,
                count,
                self.max_requests,
                self.window_seconds,
                time_until_reset,
            );
        }

        log.record(now);
        drop(log);

        Decision::admitted(key, count + 1, self.max_requests, self.window_seconds)
    }

    /// Report the quota state of `key` at the current time without recording a request.
    pub fn status(&self, key: &str) -> Status {
        self.status_at(key, self.clock.now())
    }

    /// Report the quota state of `key` at `now` without recording a request.
    ///
    /// Expired entries are still evicted, and a key whose log drains is
    /// dropped from the map. A non-finite `now` reports the log as it stands
    /// without evicting anything.
    pub fn status_at(&self, key: &str, now: f64) -> Status {
        if !now.is_finite() {
            warn!(key = %key, now, "Non-finite timestamp, reporting without eviction");
            let count = self.logs.get(key).map_or(0, |log| log.len() as u64);
            return self.snapshot(key, count, 0.0);
        }

        let cutoff = now - self.window_seconds;

        let (count, oldest) = match self.logs.get_mut(key) {
            Some(mut log) => {
                log.evict_before(cutoff);
                (log.len() as u64, log.oldest())
            }
            None => (0, None),
        };

        if count == 0 {
            self.logs.remove_if(key, |_, log| log.is_empty());
        }

        let time_until_reset = oldest
            .map(|oldest| (self.window_seconds - (now - oldest)).max(0.0))
            .unwrap_or(0.0);

        self.snapshot(key, count, time_until_reset)
    }

    fn snapshot(&self, key: &str, count: u64, time_until_reset: f64) -> Status {
        Status {
            key: key.to_string(),
            current_requests: count,
            max_requests: self.max_requests,
            window_seconds: self.window_seconds,
            remaining_requests: self.max_requests.saturating_sub(count),
            time_until_reset: round_secs(time_until_reset),
            is_allowed: count < self.max_requests,
        }
    }

    /// Forget everything recorded for `key`. Absent keys are ignored.
    pub fn reset_key(&self, key: &str) {
        if self.logs.remove(key).is_some() {
            debug!(key = %key, "Reset request log");
        }
    }

    /// Forget every key. The quota itself is unchanged.
    pub fn reset_all(&self) {
        self.logs.clear();
        debug!("Reset all request logs");
    }

    /// Evict expired entries from every key at the current time and drop
    /// keys left empty. Returns the number of keys removed.
    pub fn purge_expired(&self) -> usize {
        self.purge_expired_at(self.clock.now())
    }

    /// Like [`purge_expired`](Self::purge_expired) with an explicit `now`.
    /// A non-finite `now` purges nothing.
    pub fn purge_expired_at(&self, now: f64) -> usize {
        if !now.is_finite() {
            warn!(now, "Non-finite timestamp, skipping purge");
            return 0;
        }

        let cutoff = now - self.window_seconds;
        let mut removed = 0;

        self.logs.retain(|_, log| {
            log.evict_before(cutoff);
            if log.is_empty() {
                removed += 1;
                false
            } else {
                true
            }
        });

        removed
    }

    /// The configured quota.
    pub fn max_requests(&self) -> u64 {
        self.max_requests
    }

    /// The configured window length in seconds.
    pub fn window_seconds(&self) -> f64 {
        self.window_seconds
    }

    /// Get the number of keys currently holding a request log.
    pub fn tracked_keys(&self) -> usize {
        self.logs.len()
    }
}

impl Default for SlidingWindowLimiter {
    /// Five requests per sixty seconds on the system clock.
    ///
    /// The default configuration always passes `LimiterConfig::validate`.
    fn default() -> Self {
        let config = LimiterConfig::default();
        Self::from_validated(config.max_requests, config.window_seconds, Arc::new(SystemClock))
    }
}
