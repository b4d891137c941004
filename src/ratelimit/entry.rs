//! Per-identifier attempt record.

use std::time::Instant;

/// Attempts recorded for one identifier.
///
/// `count` is always at least 1 and `last_attempt` never precedes
/// `first_attempt`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitEntry {
    /// Attempts recorded since the last reset
    pub count: u32,
    /// First attempt of the sequence
    pub first_attempt: Instant,
    /// Most recent attempt
    pub last_attempt: Instant,
}

impl RateLimitEntry {
    /// Record the first attempt for an identifier.
    pub fn new(now: Instant) -> Self {
        Self {
            count: 1,
            first_attempt: now,
            last_attempt: now,
        }
    }

    /// Record another attempt.
    pub(crate) fn record(&mut self, now: Instant) {
        self.count = self.count.saturating_add(1);
        self.touch(now);
    }

    /// Start counting again from a single attempt.
    pub(crate) fn reset(&mut self, now: Instant) {
        self.count = 1;
        self.touch(now);
    }

    fn touch(&mut self, now: Instant) {
        self.last_attempt = self.last_attempt.max(now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_new_entry() {
        let now = Instant::now();
        let entry = RateLimitEntry::new(now);

        assert_eq!(entry.count, 1);
        assert_eq!(entry.first_attempt, now);
        assert_eq!(entry.last_attempt, now);
    }

    #[test]
    fn test_record_and_reset() {
        let start = Instant::now();
        let mut entry = RateLimitEntry::new(start);

        entry.record(start + Duration::from_secs(1));
        entry.record(start + Duration::from_secs(2));
        assert_eq!(entry.count, 3);
        assert_eq!(entry.last_attempt, start + Duration::from_secs(2));

        entry.reset(start + Duration::from_secs(3));
        assert_eq!(entry.count, 1);
        assert_eq!(entry.first_attempt, start);
        assert_eq!(entry.last_attempt, start + Duration::from_secs(3));
    }

    #[test]
    fn test_last_attempt_never_moves_backwards() {
        let start = Instant::now();
        let mut entry = RateLimitEntry::new(start + Duration::from_secs(5));

        entry.record(start);
        assert_eq!(entry.last_attempt, start + Duration::from_secs(5));
        assert!(entry.last_attempt >= entry.first_attempt);
    }
}
