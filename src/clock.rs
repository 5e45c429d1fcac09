use std::time::Instant;

/// Source of the host's current playback position, in seconds.
///
/// The pacer floors newly assigned frame timestamps to this value so that
/// frames arriving late are never scheduled in the past.
pub trait PlaybackClock: Send + Sync {
    fn playback_time(&self) -> f64;
}

/// Playback clock that starts at zero when created and follows wall time.
#[derive(Debug, Clone)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl PlaybackClock for MonotonicClock {
    fn playback_time(&self) -> f64 {
        self.origin.elapsed().as_secs_f64()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_monotonic_clock_starts_near_zero_and_advances() {
        let clock = MonotonicClock::new();
        let first = clock.playback_time();
        let second = clock.playback_time();

        assert!(first >= 0.0 && first < 1.0);
        assert!(second >= first);
    }
}
