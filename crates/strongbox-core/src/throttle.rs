//! Failed-login counting and lockout arithmetic.
//!
//! Pure functions over [`LoginAttemptRecord`]; the service layer owns
//! persistence and decides when to call them.
//!
//! # Lockout Schedule
//!
//! With the default policy (threshold 3, base 5 minutes):
//!
//! | consecutive failures | lock       |
//! |----------------------|------------|
//! | 1, 2                 | none       |
//! | 3                    | 5 minutes  |
//! | 4                    | 10 minutes |
//! | 5                    | 20 minutes |
//! | n                    | 5·2^(n−3)  |
//!
//! A successful login deletes the record, which resets the count to zero.

use serde::{Deserialize, Serialize};

const MILLIS_PER_MINUTE: u64 = 60_000;

/// Lockout thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockoutPolicy {
    /// Consecutive failures at which the first lock is applied
    pub threshold: u32,
    /// Length of the first lock, doubled for every further failure
    pub base_lock_minutes: u64,
}

impl Default for LockoutPolicy {
    fn default() -> Self {
        Self { threshold: 3, base_lock_minutes: 5 }
    }
}

impl LockoutPolicy {
    /// Lock length for a given failure count, or `None` below the threshold.
    ///
    /// Saturates at `u64::MAX` minutes instead of overflowing.
    pub fn lock_minutes(&self, attempts: u32) -> Option<u64> {
        if attempts < self.threshold {
            return None;
        }

        let exponent = attempts - self.threshold;
        let multiplier = 1u64.checked_shl(exponent).unwrap_or(u64::MAX);
        Some(self.base_lock_minutes.saturating_mul(multiplier))
    }

    /// Apply one more failure to the previous record (if any).
    ///
    /// Increments the count, stamps `last_attempt_ms`, and sets a new lock
    /// once the count reaches the threshold. A record below the threshold
    /// never carries a lock.
    pub fn register_failure(
        &self,
        identity: &str,
        previous: Option<&LoginAttemptRecord>,
        now_ms: u64,
    ) -> LoginAttemptRecord {
        let attempts = previous.map_or(1, |record| record.attempts.saturating_add(1));

        let lock_minutes = self.lock_minutes(attempts);
        let lock_until_ms = lock_minutes
            .map(|minutes| now_ms.saturating_add(minutes.saturating_mul(MILLIS_PER_MINUTE)));

        LoginAttemptRecord {
            identity: identity.to_string(),
            attempts,
            lock_until_ms,
            lock_minutes,
            last_attempt_ms: now_ms,
        }
    }

    /// Classify a record (or its absence).
    pub fn state(&self, record: Option<&LoginAttemptRecord>) -> AttemptState {
        match record {
            None => AttemptState::Clean,
            Some(r) if r.attempts == 0 => AttemptState::Clean,
            Some(r) if r.attempts < self.threshold => AttemptState::Warned { attempts: r.attempts },
            Some(r) => AttemptState::Locked { attempts: r.attempts },
        }
    }
}

/// Persisted failed-login counter for one identity.
///
/// # Invariants
///
/// - `lock_until_ms` and `lock_minutes` are either both set or both unset
/// - They are set only when `attempts` reached the policy threshold
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginAttemptRecord {
    /// Identity (email) the counter belongs to
    pub identity: String,
    /// Consecutive failures since the last successful login
    pub attempts: u32,
    /// End of the current lock, milliseconds since the Unix epoch
    pub lock_until_ms: Option<u64>,
    /// Length of the current lock
    pub lock_minutes: Option<u64>,
    /// Time of the most recent failure, milliseconds since the Unix epoch
    pub last_attempt_ms: u64,
}

impl LoginAttemptRecord {
    /// Gate check before any credential verification.
    ///
    /// Remaining time is rounded up to whole minutes, so a lock with 1ms left
    /// reports 1 minute.
    pub fn lock_status(&self, now_ms: u64) -> LockStatus {
        match self.lock_until_ms {
            Some(until) if now_ms < until => {
                LockStatus::Locked { remaining_minutes: (until - now_ms).div_ceil(MILLIS_PER_MINUTE) }
            },
            _ => LockStatus::Open,
        }
    }
}

/// Result of the pre-authentication lock gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockStatus {
    /// Credentials may be checked
    Open,
    /// Credentials must not be checked
    Locked {
        /// Whole minutes until the lock expires, rounded up
        remaining_minutes: u64,
    },
}

/// Where an identity sits on the lockout ladder.
///
/// `Locked` describes the count, not whether the lock is still running; an
/// expired lock stays `Locked` until the next attempt moves the record on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptState {
    /// No failures recorded
    Clean,
    /// Failures recorded, below the lock threshold
    Warned {
        /// Consecutive failures so far
        attempts: u32,
    },
    /// Failures at or above the lock threshold
    Locked {
        /// Consecutive failures so far
        attempts: u32,
    },
}
