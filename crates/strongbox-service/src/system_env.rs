//! Production Environment implementation using system time and RNG.
//!
//! Lock windows and upload names are derived from the wall clock, and every
//! file key and nonce comes from the OS RNG, so production behavior is not
//! reproducible. Tests use `strongbox_core::env::test_utils::MockEnv` instead.

use strongbox_core::Environment;

/// Production environment using the system clock and cryptographic RNG.
///
/// # Panics
///
/// Panics if the OS RNG fails. Without working randomness every file key and
/// nonce would be predictable; there is no safe way to continue.
#[derive(Clone, Debug, Default)]
pub struct SystemEnv;

impl SystemEnv {
    /// Create a new system environment.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Environment for SystemEnv {
    #[allow(clippy::disallowed_methods)]
    #[allow(clippy::expect_used)]
    fn wall_clock_millis(&self) -> u64 {
        let elapsed = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("invariant: system clock is after Unix epoch (1970-01-01)");

        u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
    }

    #[allow(clippy::expect_used)]
    fn random_bytes(&self, buffer: &mut [u8]) {
        getrandom::fill(buffer)
            .expect("invariant: OS RNG failure is unrecoverable - keys cannot be generated");
    }
}
