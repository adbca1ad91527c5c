//! Payloads returned by admission checks and status queries.

use serde::Serialize;

/// Round seconds to two decimals for reporting.
pub(crate) fn round_secs(seconds: f64) -> f64 {
    (seconds * 100.0).round() / 100.0
}

/// Outcome of a [`check`](super::SlidingWindowLimiter::check).
///
/// A rejection is a normal result, not an error; `time_until_reset` tells the
/// caller how long to back off.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Decision {
    /// Whether the request was admitted
    pub allowed: bool,
    /// The key the request was checked against
    pub key: String,
    /// Admitted requests in the window, including this one when admitted
    pub current_requests: u64,
    /// Configured quota
    pub max_requests: u64,
    /// Configured window length in seconds
    pub window_seconds: f64,
    /// Requests still available in the window (admitted requests only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remaining_requests: Option<u64>,
    /// Seconds until the oldest entry ages out (rejected requests only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_until_reset: Option<f64>,
    /// Human-readable summary
    pub message: String,
}

impl Decision {
    pub(crate) fn admitted(
        key: &str,
        current: u64,
        max_requests: u64,
        window_seconds: f64,
    ) -> Self {
        Self {
            allowed: true,
            key: key.to_string(),
            current_requests: current,
            max_requests,
            window_seconds,
            remaining_requests: Some(max_requests.saturating_sub(current)),
            time_until_reset: None,
            message: "Request allowed".to_string(),
        }
    }

    pub(crate) fn rejected(
        key: &str,
        current: u64,
        max_requests: u64,
        window_seconds: f64,
        time_until_reset: f64,
    ) -> Self {
        Self {
            allowed: false,
            key: key.to_string(),
            current_requests: current,
            max_requests,
            window_seconds,
            remaining_requests: None,
            time_until_reset: Some(round_secs(time_until_reset)),
            message: format!(
                "Rate limit exceeded. Try again in {:.1} seconds.",
                time_until_reset
            ),
        }
    }

    pub(crate) fn invalid_timestamp(
        key: &str,
        current: u64,
        max_requests: u64,
        window_seconds: f64,
    ) -> Self {
        Self {
            allowed: false,
            key: key.to_string(),
            current_requests: current,
            max_requests,
            window_seconds,
            remaining_requests: None,
            time_until_reset: Some(0.0),
            message: "Request rejected: timestamp is not finite.".to_string(),
        }
    }

    /// Suggested `Retry-After` value in whole seconds, rounded up.
    ///
    /// `None` for admitted requests.
    pub fn retry_after_secs(&self) -> Option<u64> {
        self.time_until_reset.map(|t| t.max(0.0).ceil() as u64)
    }
}

/// Snapshot of a key's quota, returned by
/// [`status`](super::SlidingWindowLimiter::status).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Status {
    /// The key queried
    pub key: String,
    /// Admitted requests still inside the window
    pub current_requests: u64,
    /// Configured quota
    pub max_requests: u64,
    /// Configured window length in seconds
    pub window_seconds: f64,
    /// Requests still available in the window
    pub remaining_requests: u64,
    /// Seconds until the oldest entry ages out, 0 when the log is empty
    pub time_until_reset: f64,
    /// Whether a check made now would be admitted.
    ///
    /// This is a prediction, not a reservation.
    pub is_allowed: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_secs() {
        assert_eq!(round_secs(59.996), 60.0);
        assert_eq!(round_secs(1.234), 1.23);
        assert_eq!(round_secs(0.0), 0.0);
    }

    #[test]
    fn test_rejected_message_and_retry_after() {
        let decision = Decision::rejected("u", 5, 5, 60.0, 12.34);
        assert!(!decision.allowed);
        assert_eq!(decision.time_until_reset, Some(12.34));
        assert_eq!(decision.remaining_requests, None);
        assert_eq!(decision.message, "Rate limit exceeded. Try again in 12.3 seconds.");
        assert_eq!(decision.retry_after_secs(), Some(13));
    }

    #[test]
    fn test_invalid_timestamp_decision() {
        let decision = Decision::invalid_timestamp("u", 1, 5, 60.0);
        assert!(!decision.allowed);
        assert_eq!(decision.current_requests, 1);
        assert_eq!(decision.retry_after_secs(), Some(0));
        assert!(decision.message.contains("not finite"));
    }

    #[test]
    fn test_admitted_serializes_without_reset_field() {
        let decision = Decision::admitted("u", 2, 5, 60.0);
        assert_eq!(decision.retry_after_secs(), None);

        let json = serde_json::to_value(&decision).unwrap();
        assert_eq!(json["allowed"], true);
        assert_eq!(json["remaining_requests"], 3);
        assert_eq!(json["message"], "Request allowed");
        assert!(json.get("time_until_reset").is_none());
    }
}
