//! Rate limiting logic and state management.

mod clock;
mod decision;
mod limiter;
mod reaper;
mod window;

pub use clock::{Clock, ManualClock, SystemClock};
pub use decision::{Decision, Status};
pub use limiter::SlidingWindowLimiter;
pub use reaper::spawn_reaper;
