//! Environment abstraction for deterministic testing.
//!
//! Decouples key handling and lockout logic from system resources (wall clock,
//! randomness). Production uses the OS clock and RNG; tests drive a manual
//! clock so lock expiry can be checked without sleeping.

/// Abstract environment providing time and randomness.
///
/// # Safety
///
/// Implementations MUST guarantee:
///
/// - `random_bytes()` uses cryptographically secure entropy in production.
///   File keys and every AES-GCM nonce are drawn from it.
/// - Methods are infallible except in exceptional circumstances (e.g., OS
///   entropy exhaustion)
pub trait Environment: Clone + Send + Sync + 'static {
    /// Wall-clock time as milliseconds since the Unix epoch.
    ///
    /// Used for lock expiry, audit timestamps, and upload names. Lock state is
    /// persisted, so this must be comparable across process restarts.
    fn wall_clock_millis(&self) -> u64;

    /// Fills the provided buffer with random bytes.
    fn random_bytes(&self, buffer: &mut [u8]);

    /// Returns a fixed-size array of random bytes.
    ///
    /// Convenience for keys and nonces.
    fn random_array<const N: usize>(&self) -> [u8; N] {
        let mut bytes = [0u8; N];
        self.random_bytes(&mut bytes);
        bytes
    }

    /// Generates a random `u64`.
    ///
    /// Used for metadata record IDs.
    fn random_u64(&self) -> u64 {
        u64::from_be_bytes(self.random_array())
    }
}

/// Test environments.
pub mod test_utils {
    use std::sync::{
        Arc, Mutex, PoisonError,
        atomic::{AtomicU64, Ordering},
    };

    use rand::{RngCore, SeedableRng, rngs::StdRng};

    use super::Environment;

    /// Manually advanced clock with a seeded RNG.
    ///
    /// Clones share the clock and the RNG, so a test can hold one handle and
    /// advance time underneath a service that owns another.
    #[derive(Clone)]
    pub struct MockEnv {
        now_ms: Arc<AtomicU64>,
        rng: Arc<Mutex<StdRng>>,
    }

    impl MockEnv {
        /// Start at `now_ms` with a reproducible RNG.
        pub fn new(now_ms: u64, seed: u64) -> Self {
            Self {
                now_ms: Arc::new(AtomicU64::new(now_ms)),
                rng: Arc::new(Mutex::new(StdRng::seed_from_u64(seed))),
            }
        }

        /// Move the clock forward.
        pub fn advance_millis(&self, millis: u64) {
            self.now_ms.fetch_add(millis, Ordering::SeqCst);
        }

        /// Move the clock forward by whole minutes.
        pub fn advance_minutes(&self, minutes: u64) {
            self.advance_millis(minutes * 60_000);
        }
    }

    impl Default for MockEnv {
        fn default() -> Self {
            Self::new(1_700_000_000_000, 0)
        }
    }

    impl Environment for MockEnv {
        fn wall_clock_millis(&self) -> u64 {
            self.now_ms.load(Ordering::SeqCst)
        }

        fn random_bytes(&self, buffer: &mut [u8]) {
            self.rng.lock().unwrap_or_else(PoisonError::into_inner).fill_bytes(buffer);
        }
    }
}
