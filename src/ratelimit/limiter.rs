//! Core rate limiter implementation.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::time::{Duration, Instant};
use tracing::{debug, trace};

use super::clock::{Clock, SystemClock};
use super::entry::RateLimitEntry;
use super::policy::BackoffPolicy;

/// Outcome of a single rate limit check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitDecision {
    /// Whether the attempt may proceed
    pub allowed: bool,
    /// Remaining cooldown; zero when allowed
    pub wait_time: Duration,
    /// Explanation for the caller; empty when allowed
    pub message: String,
}

impl RateLimitDecision {
    fn allow() -> Self {
        Self {
            allowed: true,
            wait_time: Duration::ZERO,
            message: String::new(),
        }
    }

    fn deny(wait_time: Duration, attempt_beyond_limit: u32) -> Self {
        Self {
            allowed: false,
            wait_time,
            message: format!(
                "Too many attempts. This is attempt #{} beyond the limit. \
                 Please wait before trying again.",
                attempt_beyond_limit
            ),
        }
    }

    /// Remaining cooldown in whole milliseconds.
    pub fn wait_time_ms(&self) -> u64 {
        u64::try_from(self.wait_time.as_millis()).unwrap_or(u64::MAX)
    }
}

/// In-memory rate limiter with incremental backoff.
///
/// Every check counts as an attempt. Once an identifier has used its free
/// attempts, each further attempt must wait out a cooldown measured from the
/// previous attempt, and the cooldown grows with every attempt made while it
/// is still running. Waiting out a cooldown resets the identifier to a single
/// attempt, so escalation starts over from the first level.
///
/// Entries live in a sharded map and each check runs under its key's shard
/// lock, so concurrent checks for the same identifier are serialized.
pub struct BackoffRateLimiter<C: Clock = SystemClock> {
    /// Attempt records indexed by identifier
    entries: DashMap<String, RateLimitEntry>,
    /// Backoff parameters
    policy: BackoffPolicy,
    /// Time source
    clock: C,
}

impl BackoffRateLimiter<SystemClock> {
    /// Create a rate limiter using the system clock.
    pub fn new(policy: BackoffPolicy) -> Self {
        Self::with_clock(policy, SystemClock)
    }
}

impl<C: Clock> BackoffRateLimiter<C> {
    /// Create a rate limiter with an explicit time source.
    pub fn with_clock(policy: BackoffPolicy, clock: C) -> Self {
        Self {
            entries: DashMap::new(),
            policy,
            clock,
        }
    }

    /// Record an attempt for `identifier` and decide whether it may proceed.
    ///
    /// Never fails. Any string is accepted, including an empty one, and is
    /// bucketed on its own.
    pub fn check_rate_limit(&self, identifier: &str) -> RateLimitDecision {
        let now = self.clock.now();

        trace!(identifier = %identifier, "Checking rate limit");

        match self.entries.entry(identifier.to_owned()) {
            Entry::Vacant(vacant) => {
                debug!(identifier = %identifier, "Creating new rate limit entry");
                vacant.insert(RateLimitEntry::new(now));
                RateLimitDecision::allow()
            }
            Entry::Occupied(mut occupied) => {
                self.apply_attempt(identifier, occupied.get_mut(), now)
            }
        }
    }

    /// Apply an attempt to an existing entry. Called with the entry's shard locked.
    fn apply_attempt(
        &self,
        identifier: &str,
        entry: &mut RateLimitEntry,
        now: Instant,
    ) -> RateLimitDecision {
        if entry.count < self.policy.max_attempts {
            entry.record(now);
            return RateLimitDecision::allow();
        }

        let wait_time = self.policy.wait_time(entry.count);
        let elapsed = now.saturating_duration_since(entry.last_attempt);

        if elapsed >= wait_time {
            debug!(
                identifier = %identifier,
                elapsed_ms = elapsed.as_millis() as u64,
                "Cooldown elapsed, resetting rate limit entry"
            );
            entry.reset(now);
            return RateLimitDecision::allow();
        }

        let remaining = wait_time - elapsed;
        let attempt_beyond_limit = entry.count - self.policy.max_attempts + 1;
        entry.record(now);

        debug!(
            identifier = %identifier,
            attempt = attempt_beyond_limit,
            backoff_level = self.policy.backoff_level(entry.count - 1),
            remaining_ms = remaining.as_millis() as u64,
            "Rate limit exceeded"
        );

        RateLimitDecision::deny(remaining, attempt_beyond_limit)
    }

    /// Drop entries whose last attempt is older than the retention threshold.
    ///
    /// Returns the number of entries removed.
    pub fn cleanup_rate_limit(&self) -> usize {
        let now = self.clock.now();
        let retention = self.policy.retention();
        let mut removed = 0;

        self.entries.retain(|_, entry| {
            let keep = now.saturating_duration_since(entry.last_attempt) <= retention;
            if !keep {
                removed += 1;
            }
            keep
        });

        debug!(
            removed = removed,
            remaining = self.entries.len(),
            "Rate limit cleanup finished"
        );

        removed
    }

    /// Snapshot of the entry for an identifier, if any.
    pub fn entry(&self, identifier: &str) -> Option<RateLimitEntry> {
        self.entries.get(identifier).map(|entry| *entry)
    }

    /// Get the number of tracked identifiers.
    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    /// Clear all entries.
    ///
    /// This is primarily useful for testing.
    pub fn clear(&self) {
        self.entries.clear();
    }

    /// The backoff policy in use.
    pub fn policy(&self) -> &BackoffPolicy {
        &self.policy
    }
}

impl Default for BackoffRateLimiter<SystemClock> {
    fn default() -> Self {
        Self::new(BackoffPolicy::default())
    }
}
