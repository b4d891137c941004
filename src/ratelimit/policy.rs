//! Incremental backoff policy.

use std::time::Duration;

use crate::error::{ContactGateError, Result};

/// Parameters governing free attempts and the cooldown that follows them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackoffPolicy {
    /// Attempts always allowed before backoff begins
    pub max_attempts: u32,
    /// Unit of backoff
    pub base_window: Duration,
    /// Successive multiples of the base window, indexed by backoff level
    pub backoff_multipliers: Vec<u32>,
    /// Hard ceiling on any computed wait time
    pub max_backoff: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_window: Duration::from_secs(5 * 60),
            backoff_multipliers: vec![1, 2, 4, 8, 16],
            max_backoff: Duration::from_secs(24 * 60 * 60),
        }
    }
}

impl BackoffPolicy {
    /// How long an entry is kept after its last attempt before cleanup drops it.
    pub fn retention(&self) -> Duration {
        self.max_backoff.saturating_mul(2)
    }

    /// Backoff level for an entry that has recorded `count` attempts.
    ///
    /// Grows by one per attempt beyond the quota and is clamped to the last
    /// multiplier.
    pub fn backoff_level(&self, count: u32) -> usize {
        let over = count.saturating_sub(self.max_attempts) as usize;
        over.min(self.backoff_multipliers.len().saturating_sub(1))
    }

    /// Cooldown that applies to an entry that has recorded `count` attempts.
    pub fn wait_time(&self, count: u32) -> Duration {
        let multiplier = self
            .backoff_multipliers
            .get(self.backoff_level(count))
            .copied()
            .unwrap_or(1);

        self.base_window
            .saturating_mul(multiplier)
            .min(self.max_backoff)
    }

    /// Reject parameters that would make the limiter meaningless.
    pub fn validate(&self) -> Result<()> {
        if self.max_attempts == 0 {
            return Err(ContactGateError::Config(
                "max_attempts must be at least 1".to_string(),
            ));
        }
        if self.base_window.is_zero() {
            return Err(ContactGateError::Config(
                "base_window_ms must be greater than zero".to_string(),
            ));
        }
        if self.backoff_multipliers.is_empty() {
            return Err(ContactGateError::Config(
                "backoff_multipliers must not be empty".to_string(),
            ));
        }
        if self.backoff_multipliers.contains(&0) {
            return Err(ContactGateError::Config(
                "backoff_multipliers must all be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINUTE: Duration = Duration::from_secs(60);

    #[test]
    fn test_default_policy() {
        let policy = BackoffPolicy::default();

        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.base_window, 5 * MINUTE);
        assert_eq!(policy.retention(), Duration::from_secs(48 * 60 * 60));
        assert!(policy.validate().is_ok());
    }

    #[test]
    fn test_wait_time_progression() {
        let policy = BackoffPolicy::default();

        assert_eq!(policy.wait_time(3), 5 * MINUTE);
        assert_eq!(policy.wait_time(4), 10 * MINUTE);
        assert_eq!(policy.wait_time(5), 20 * MINUTE);
        assert_eq!(policy.wait_time(6), 40 * MINUTE);
        assert_eq!(policy.wait_time(7), 80 * MINUTE);
    }

    #[test]
    fn test_backoff_level_is_clamped() {
        let policy = BackoffPolicy::default();

        assert_eq!(policy.backoff_level(0), 0);
        assert_eq!(policy.backoff_level(3), 0);
        assert_eq!(policy.backoff_level(7), 4);
        assert_eq!(policy.backoff_level(1_000), 4);
        assert_eq!(policy.backoff_level(u32::MAX), 4);
        assert_eq!(policy.wait_time(u32::MAX), 80 * MINUTE);
    }

    #[test]
    fn test_wait_time_respects_ceiling() {
        let policy = BackoffPolicy {
            max_attempts: 1,
            base_window: Duration::from_secs(60 * 60),
            backoff_multipliers: vec![1, 48],
            max_backoff: Duration::from_secs(24 * 60 * 60),
        };

        assert_eq!(policy.wait_time(1), Duration::from_secs(60 * 60));
        assert_eq!(policy.wait_time(2), Duration::from_secs(24 * 60 * 60));
    }

    #[test]
    fn test_validate_rejects_bad_parameters() {
        let zero_attempts = BackoffPolicy {
            max_attempts: 0,
            ..BackoffPolicy::default()
        };
        assert!(zero_attempts.validate().is_err());

        let zero_window = BackoffPolicy {
            base_window: Duration::ZERO,
            ..BackoffPolicy::default()
        };
        assert!(zero_window.validate().is_err());

        let no_multipliers = BackoffPolicy {
            backoff_multipliers: Vec::new(),
            ..BackoffPolicy::default()
        };
        assert!(no_multipliers.validate().is_err());

        let zero_multiplier = BackoffPolicy {
            backoff_multipliers: vec![1, 0],
            ..BackoffPolicy::default()
        };
        assert!(zero_multiplier.validate().is_err());
    }
}
