use std::time::Duration;

use crate::cfg::Cfg;

/// Exponential backoff: starts at `initial`, multiplies by `factor` per failure, capped at `max`.
#[derive(Clone, Debug)]
pub struct Backoff {
    initial: Duration,
    current: Duration,
    factor: u32,
    max: Duration,
}

impl Backoff {
    pub fn new(initial: Duration, factor: u32, max: Duration) -> Self {
        Self {
            initial,
            current: initial,
            factor: factor.max(1),
            max: max.max(initial),
        }
    }

    pub fn from_cfg(cfg: &Cfg) -> Self {
        Self::new(
            Duration::from_millis(cfg.initial_backoff_ms),
            cfg.backoff_factor,
            Duration::from_secs(cfg.max_backoff_secs),
        )
    }

    /// Delay to wait after the current failure.
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current;
        self.current = self.current.saturating_mul(self.factor).min(self.max);
        delay
    }

    pub fn reset(&mut self) {
        self.current = self.initial;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_grows_and_caps() {
        let mut backoff = Backoff::new(Duration::from_secs(1), 2, Duration::from_secs(5));
        let delays: Vec<_> = (0..5).map(|_| backoff.next_delay().as_secs()).collect();
        assert_eq!(delays, [1, 2, 4, 5, 5]);

        backoff.reset();
        assert_eq!(backoff.next_delay(), Duration::from_secs(1));
    }

    #[test]
    fn test_factor_of_zero_is_constant() {
        let mut backoff = Backoff::new(Duration::from_millis(100), 0, Duration::from_secs(1));
        assert_eq!(backoff.next_delay(), Duration::from_millis(100));
        assert_eq!(backoff.next_delay(), Duration::from_millis(100));
    }
}
