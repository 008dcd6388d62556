use std::num::NonZeroU32;

use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};

/// Optional cap on how many navigations start per second, across all workers.
pub struct NavigationPacer {
    limiter: Option<DefaultDirectRateLimiter>,
}

impl NavigationPacer {
    pub fn new(requests_per_second: Option<NonZeroU32>) -> Self {
        Self {
            limiter: requests_per_second.map(|rps| RateLimiter::direct(Quota::per_second(rps))),
        }
    }

    pub fn unlimited() -> Self {
        Self::new(None)
    }

    pub fn is_limited(&self) -> bool {
        self.limiter.is_some()
    }

    /// Waits (non-blocking) until another navigation may start.
    pub async fn wait_until_ready(&self) {
        if let Some(limiter) = &self.limiter {
            limiter.until_ready().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unlimited_never_waits() {
        let pacer = NavigationPacer::unlimited();
        assert!(!pacer.is_limited());
        for _ in 0..1000 {
            pacer.wait_until_ready().await;
        }
    }

    #[tokio::test]
    async fn limited_pacer_admits_a_burst() {
        let pacer = NavigationPacer::new(NonZeroU32::new(5));
        assert!(pacer.is_limited());
        let started = std::time::Instant::now();
        for _ in 0..5 {
            pacer.wait_until_ready().await;
        }
        assert!(started.elapsed() < std::time::Duration::from_millis(500));
    }
}
