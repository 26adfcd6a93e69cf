//! Fuzz target for the lockout state machine
//!
//! Replays arbitrary sequences of failures, successes, and clock jumps
//! against `LockoutPolicy` with arbitrary thresholds.
//!
//! # Invariants
//!
//! - No arithmetic panics, even at `u32::MAX` attempts or `u64::MAX` time
//! - Below the threshold a record never carries a lock
//! - Lock length never shrinks while failures accumulate
//! - A locked gate always reports at least one remaining minute

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use strongbox_core::{LockStatus, LockoutPolicy, LoginAttemptRecord};

#[derive(Debug, Arbitrary)]
struct Scenario {
    threshold: u32,
    base_lock_minutes: u64,
    start_ms: u64,
    operations: Vec<Operation>,
}

#[derive(Debug, Arbitrary)]
enum Operation {
    Fail,
    Succeed,
    Advance { millis: u64 },
    Check,
}

fuzz_target!(|scenario: Scenario| {
    let policy = LockoutPolicy {
        threshold: scenario.threshold.max(1),
        base_lock_minutes: scenario.base_lock_minutes,
    };

    let mut now_ms = scenario.start_ms;
    let mut record: Option<LoginAttemptRecord> = None;

    for op in scenario.operations {
        match op {
            Operation::Fail => {
                let previous_lock = record.as_ref().and_then(|r| r.lock_minutes);
                let next = policy.register_failure("fuzz@example.com", record.as_ref(), now_ms);

                assert_eq!(next.lock_minutes.is_some(), next.lock_until_ms.is_some());
                if next.attempts < policy.threshold {
                    assert!(next.lock_minutes.is_none());
                }
                if let (Some(before), Some(after)) = (previous_lock, next.lock_minutes) {
                    assert!(after >= before);
                }

                record = Some(next);
            },
            Operation::Succeed => record = None,
            Operation::Advance { millis } => now_ms = now_ms.saturating_add(millis),
            Operation::Check => {
                let status = record.as_ref().map_or(LockStatus::Open, |r| r.lock_status(now_ms));
                if let LockStatus::Locked { remaining_minutes } = status {
                    assert!(remaining_minutes >= 1);
                }
            },
        }
    }
});
