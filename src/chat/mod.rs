pub mod engine;
pub mod follow_up;
pub mod prompt;
pub mod sessions;

pub use engine::ConversationEngine;
pub use follow_up::{FollowUpGenerator, DEFAULT_FOLLOW_UPS};
pub use sessions::{SessionManager, DEFAULT_SESSION};

use std::time::Duration;

use rand::Rng;

/// Exponential backoff with jitter for the bounded retry loops.
pub(crate) fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    if base.is_zero() {
        return Duration::ZERO;
    }

    let shift = attempt.clamp(1, 6) - 1;
    let exp = base.saturating_mul(1 << shift);
    let half = (base.as_millis() / 2) as u64;
    let jitter = Duration::from_millis(rand::rng().random_range(0..=half));
    exp + jitter
}
