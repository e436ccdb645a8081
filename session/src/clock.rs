use std::time::Duration;

/// Single time source for a round, with a hard deadline.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SessionClock {
    duration: Duration,
    elapsed: Duration,
}

impl SessionClock {
    /// Creates a clock that expires after `duration`.
    #[must_use]
    pub const fn new(duration: Duration) -> Self {
        Self {
            duration,
            elapsed: Duration::ZERO,
        }
    }

    /// Advances by `dt` without crossing the deadline and returns the time
    /// actually consumed.
    pub fn advance(&mut self, dt: Duration) -> Duration {
        let step = dt.min(self.remaining());
        self.elapsed += step;
        step
    }

    /// Time played so far.
    #[must_use]
    pub const fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// Length of the round.
    #[must_use]
    pub const fn duration(&self) -> Duration {
        self.duration
    }

    /// Time left before the deadline.
    #[must_use]
    pub fn remaining(&self) -> Duration {
        self.duration.saturating_sub(self.elapsed)
    }

    /// Remaining time as whole `(minutes, seconds)`, rounded down.
    #[must_use]
    pub fn remaining_display(&self) -> (u64, u64) {
        let seconds = self.remaining().as_secs();
        (seconds / 60, seconds % 60)
    }

    /// Reports whether the deadline has been reached.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.elapsed >= self.duration
    }

    /// Rewinds to the start of the round.
    pub fn reset(&mut self) {
        self.elapsed = Duration::ZERO;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advance_clamps_at_deadline() {
        let mut clock = SessionClock::new(Duration::from_secs(2));
        assert_eq!(clock.advance(Duration::from_millis(1_500)), Duration::from_millis(1_500));
        assert!(!clock.is_finished());
        assert_eq!(clock.advance(Duration::from_secs(1)), Duration::from_millis(500));
        assert!(clock.is_finished());
        assert_eq!(clock.advance(Duration::from_secs(1)), Duration::ZERO);
    }

    #[test]
    fn display_rounds_down() {
        let mut clock = SessionClock::new(Duration::from_secs(120));
        assert_eq!(clock.remaining_display(), (2, 0));
        let _ = clock.advance(Duration::from_millis(500));
        assert_eq!(clock.remaining_display(), (1, 59));
        let _ = clock.advance(Duration::from_millis(59_600));
        assert_eq!(clock.remaining_display(), (0, 59));
    }
}
