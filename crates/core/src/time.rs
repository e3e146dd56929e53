use chrono::{DateTime, Duration, Utc};

/// Source of "now" for session start and submission timestamps.
///
/// Services take a `Clock` so tests can pin time instead of reading the system clock.
#[derive(Debug, Clone, Copy, Default)]
pub enum Clock {
    #[default]
    System,
    Fixed(DateTime<Utc>),
}

impl Clock {
    /// Returns a clock fixed at the given timestamp.
    #[must_use]
    pub fn fixed(at: DateTime<Utc>) -> Self {
        Self::Fixed(at)
    }

    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        match self {
            Clock::System => Utc::now(),
            Clock::Fixed(t) => *t,
        }
    }

    /// Move a fixed clock forward. No effect on the system clock.
    pub fn advance(&mut self, delta: Duration) {
        if let Clock::Fixed(t) = self {
            *t += delta;
        }
    }

    /// Whole seconds between `since` and now, never negative.
    #[must_use]
    pub fn elapsed_seconds(&self, since: DateTime<Utc>) -> u64 {
        u64::try_from((self.now() - since).num_seconds()).unwrap_or(0)
    }
}

/// Deterministic timestamp for tests (2023-11-14T22:13:20Z).
pub const FIXED_TEST_TIMESTAMP: i64 = 1_700_000_000;

/// Returns a deterministic `DateTime<Utc>` for tests.
///
/// # Panics
///
/// Panics if the fixed timestamp cannot be represented.
#[must_use]
pub fn fixed_now() -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp(FIXED_TEST_TIMESTAMP, 0)
        .expect("fixed timestamp should be valid")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn elapsed_tracks_advances() {
        let start = fixed_now();
        let mut clock = Clock::fixed(start);
        clock.advance(Duration::seconds(95));
        assert_eq!(clock.elapsed_seconds(start), 95);
    }

    #[test]
    fn elapsed_never_negative() {
        let clock = Clock::fixed(fixed_now());
        assert_eq!(clock.elapsed_seconds(fixed_now() + Duration::seconds(10)), 0);
    }
}
