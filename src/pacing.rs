//! Randomized pauses between consecutive sends
//!
//! Mail providers throttle or flag senders that deliver at a fixed cadence, so
//! every gap is drawn uniformly from a configurable range. Pausing suspends only
//! the current task; other dispatches keep running.

use crate::config::DispatchConfig;
use rand::Rng;
use std::time::Duration;

/// Inclusive range from which inter-send pauses are sampled
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DelayRange {
    min: Duration,
    max: Duration,
}

impl DelayRange {
    /// Range `[min, max]`; the bounds are swapped if given in reverse
    pub fn new(min: Duration, max: Duration) -> Self {
        if min <= max {
            Self { min, max }
        } else {
            Self { min: max, max: min }
        }
    }

    /// Range configured for dispatch
    pub fn from_config(config: &DispatchConfig) -> Self {
        Self::new(config.min_delay, config.max_delay)
    }

    /// Zero-length pauses
    pub fn none() -> Self {
        Self::new(Duration::ZERO, Duration::ZERO)
    }

    /// Lower bound
    pub fn min(&self) -> Duration {
        self.min
    }

    /// Upper bound
    pub fn max(&self) -> Duration {
        self.max
    }

    /// Draw a pause uniformly from the range
    pub fn sample(&self) -> Duration {
        if self.min == self.max {
            return self.min;
        }
        let secs = rand::thread_rng().gen_range(self.min.as_secs_f64()..=self.max.as_secs_f64());
        Duration::from_secs_f64(secs)
    }

    /// Suspend the current task for a sampled pause and return its length
    pub async fn pause(&self) -> Duration {
        let delay = self.sample();
        if !delay.is_zero() {
            tracing::debug!(delay_secs = delay.as_secs_f64(), "Pausing before next send");
            tokio::time::sleep(delay).await;
        }
        delay
    }
}

impl Default for DelayRange {
    fn default() -> Self {
        Self::from_config(&DispatchConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::Instant;

    #[test]
    fn samples_stay_within_bounds() {
        let range = DelayRange::new(Duration::from_secs(30), Duration::from_secs(60));
        for _ in 0..1000 {
            let d = range.sample();
            assert!(d >= Duration::from_secs(30) && d <= Duration::from_secs(60), "{d:?}");
        }
    }

    #[test]
    fn samples_are_not_constant() {
        let range = DelayRange::new(Duration::from_secs(30), Duration::from_secs(60));
        let first = range.sample();
        assert!((0..100).any(|_| range.sample() != first));
    }

    #[test]
    fn reversed_bounds_are_normalized() {
        let range = DelayRange::new(Duration::from_secs(9), Duration::from_secs(3));
        assert_eq!(range.min(), Duration::from_secs(3));
        assert_eq!(range.max(), Duration::from_secs(9));
    }

    #[test]
    fn default_matches_dispatch_defaults() {
        let range = DelayRange::default();
        assert_eq!(range.min(), Duration::from_secs(30));
        assert_eq!(range.max(), Duration::from_secs(60));
    }

    #[tokio::test(start_paused = true)]
    async fn pause_suspends_for_sampled_duration() {
        let range = DelayRange::new(Duration::from_secs(30), Duration::from_secs(60));
        let start = Instant::now();
        let slept = range.pause().await;
        let elapsed = start.elapsed();
        assert!(elapsed >= slept && elapsed < slept + Duration::from_secs(1));
        assert!(slept >= Duration::from_secs(30));
    }

    #[tokio::test(start_paused = true)]
    async fn zero_range_does_not_sleep() {
        let start = Instant::now();
        assert_eq!(DelayRange::none().pause().await, Duration::ZERO);
        assert_eq!(start.elapsed(), Duration::ZERO);
    }
}
