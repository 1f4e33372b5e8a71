//! Randomized pause between live requests.

use rand::Rng;
use std::time::Duration;

use crate::config::ThrottleConfig;

/// Sleeps for a duration drawn uniformly from `[min, max)` after each live fetch.
///
/// The pause is awaited by the crawl, so it holds up the next request rather
/// than running in the background.
#[derive(Debug, Clone, Copy)]
pub struct Throttle {
    min: Duration,
    max: Duration,
}

impl Throttle {
    pub fn new(min: Duration, max: Duration) -> Self {
        Self { min, max }
    }

    pub fn from_config(config: &ThrottleConfig) -> Self {
        Self::new(config.min_delay(), config.max_delay())
    }

    /// No pause at all
    pub fn none() -> Self {
        Self::new(Duration::ZERO, Duration::ZERO)
    }

    /// Draw the next pause
    pub fn next_delay(&self) -> Duration {
        if self.max <= self.min {
            return self.min;
        }
        let millis = rand::thread_rng().gen_range(self.min.as_millis()..self.max.as_millis());
        Duration::from_millis(millis as u64)
    }

    /// Wait for a freshly drawn pause
    pub async fn pause(&self) {
        let delay = self.next_delay();
        if delay.is_zero() {
            return;
        }
        tracing::info!("Sleeping for {} seconds", delay.as_secs());
        tokio::time::sleep(delay).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delay_within_bounds() {
        let throttle = Throttle::new(Duration::from_secs(60), Duration::from_secs(120));
        for _ in 0..200 {
            let delay = throttle.next_delay();
            assert!(delay >= Duration::from_secs(60));
            assert!(delay < Duration::from_secs(120));
        }
    }

    #[test]
    fn test_degenerate_range() {
        let throttle = Throttle::new(Duration::from_secs(5), Duration::from_secs(5));
        assert_eq!(throttle.next_delay(), Duration::from_secs(5));
        assert_eq!(Throttle::none().next_delay(), Duration::ZERO);
    }

    #[tokio::test]
    async fn test_no_pause_returns_immediately() {
        let start = std::time::Instant::now();
        Throttle::none().pause().await;
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_pause_sleeps_for_drawn_delay() {
        let start = tokio::time::Instant::now();
        Throttle::new(Duration::from_secs(5), Duration::from_secs(5)).pause().await;
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_secs(5));
        assert!(elapsed < Duration::from_secs(6));
    }
}
