//! Background removal of idle keys.
//!
//! Expiry is lazy, so a key that is never touched again keeps its log until
//! a reset. The reaper periodically sweeps such keys out of long-running
//! processes that see many one-shot keys.

use std::sync::{Arc, Weak};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use super::limiter::SlidingWindowLimiter;

/// Spawn a tokio task that calls [`SlidingWindowLimiter::purge_expired`]
/// every `every`.
///
/// The task holds only a weak reference and exits once the limiter is
/// dropped. Abort the returned handle to stop it earlier.
pub fn spawn_reaper(limiter: &Arc<SlidingWindowLimiter>, every: Duration) -> JoinHandle<()> {
    let weak: Weak<SlidingWindowLimiter> = Arc::downgrade(limiter);

    info!(interval_ms = every.as_millis() as u64, "Starting idle key reaper");

    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            interval.tick().await;

            let Some(limiter) = weak.upgrade() else {
                debug!("Limiter dropped, stopping reaper");
                break;
            };

            let removed = limiter.purge_expired();
            if removed > 0 {
                debug!(
                    removed,
                    remaining = limiter.tracked_keys(),
                    "Reaped idle keys"
                );
            }
        }
    })
}
