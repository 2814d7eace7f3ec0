//! Request rate limiter shared by all connections of one API handle.

use governor::{Quota, RateLimiter as GovLimiter};
use std::num::NonZeroU32;
use std::sync::Arc;

type DirectLimiter = GovLimiter<
    governor::state::NotKeyed,
    governor::state::InMemoryState,
    governor::clock::DefaultClock,
>;

/// Single-bucket limiter over outgoing API requests.
#[derive(Clone)]
pub struct RateLimiter {
    limiter: Arc<DirectLimiter>,
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter").finish_non_exhaustive()
    }
}

impl RateLimiter {
    /// Create with a per-second limit. Zero is clamped to one.
    pub fn with_limit(requests_per_sec: u32) -> Self {
        let per_sec = NonZeroU32::new(requests_per_sec).unwrap_or(NonZeroU32::MIN);
        Self {
            limiter: Arc::new(GovLimiter::direct(Quota::per_second(per_sec))),
        }
    }

    /// Wait until a request slot is available.
    pub async fn wait(&self) {
        self.limiter.until_ready().await;
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::with_limit(5)
    }
}
