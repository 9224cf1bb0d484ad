//! Fixed-rate sampling schedule
//!
//! The sampler does not own a timer. Each loop pass hands it the current
//! monotonic time; it reports whether an interval has elapsed since the last
//! sample and, if so, takes that instant as the new sample timestamp. Request
//! handling between passes may stretch the spacing, never shrink it.

/// Sampling cadence used when no configuration overrides it (10 Hz)
pub const DEFAULT_SAMPLE_INTERVAL_MS: u64 = 100;

#[derive(Debug, Clone, Copy)]
pub struct Sampler {
    interval_ms: u64,
    /// Timestamp of the previous tick; boot counts as the first
    previous_ms: u64,
}

impl Default for Sampler {
    fn default() -> Self {
        Self::new(DEFAULT_SAMPLE_INTERVAL_MS)
    }
}

impl Sampler {
    pub const fn new(interval_ms: u64) -> Self {
        Self {
            interval_ms,
            previous_ms: 0,
        }
    }

    pub const fn interval_ms(&self) -> u64 {
        self.interval_ms
    }

    pub fn is_due(&self, now_ms: u64) -> bool {
        now_ms.saturating_sub(self.previous_ms) >= self.interval_ms
    }

    /// Earliest time at which the next tick can fire.
    pub fn next_due_ms(&self) -> u64 {
        self.previous_ms.saturating_add(self.interval_ms)
    }

    /// Returns the sample timestamp when a tick is due and records it.
    pub fn tick(&mut self, now_ms: u64) -> Option<u64> {
        if !self.is_due(now_ms) {
            return None;
        }
        self.previous_ms = now_ms;
        Some(now_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_tick_after_one_interval() {
        let mut sampler = Sampler::default();
        assert_eq!(sampler.tick(0), None);
        assert_eq!(sampler.tick(99), None);
        assert_eq!(sampler.tick(100), Some(100));
        assert_eq!(sampler.tick(150), None);
        assert_eq!(sampler.next_due_ms(), 200);
    }

    #[test]
    fn test_late_tick_restarts_interval() {
        let mut sampler = Sampler::new(100);
        assert_eq!(sampler.tick(130), Some(130));
        assert_eq!(sampler.tick(229), None);
        assert_eq!(sampler.tick(230), Some(230));
    }

    #[test]
    fn test_tick_count_over_quiet_window() {
        // floor(1000 / 100) ticks, minus one when polling overshoots
        for period in [1, 7, 13, 50] {
            let mut sampler = Sampler::new(100);
            let ticks = (0..=1000)
                .step_by(period)
                .filter_map(|now| sampler.tick(now))
                .count();
            assert!((9..=10).contains(&ticks), "period {period}: {ticks} ticks");
        }
    }
}
