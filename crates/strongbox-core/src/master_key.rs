//! Lazily derived, shared company master key.
//!
//! The provider owns the only copy of the master key. The first caller that
//! needs it triggers one passphrase request and one PBKDF2 run; every caller
//! arriving while that derivation is in flight awaits the same result instead
//! of prompting again.
//!
//! # States
//!
//! ```text
//!            get()                 derivation ok
//!   Empty ─────────────▶ Pending ─────────────────▶ Ready
//!     ▲                     │                         │
//!     │   derivation error  │                         │
//!     ├─────────────────────┘                         │
//!     │                 clear()                       │
//!     └───────────────────────────────────────────────┘
//! ```
//!
//! `clear()` from any state returns to `Empty`. A derivation that finishes
//! after a `clear()` still answers the callers that were waiting on it, but
//! its key is not cached.

use std::sync::{
    Arc, Mutex, MutexGuard, PoisonError,
    atomic::{AtomicU64, Ordering},
};

use futures::{
    FutureExt,
    future::{BoxFuture, Shared},
};
use strongbox_crypto::{KdfParams, MasterKey, derive_master_key};

use crate::{error::KeyError, passphrase::PassphraseSource};

type Derivation = Shared<BoxFuture<'static, Result<Arc<MasterKey>, KeyError>>>;

enum Slot {
    Empty,
    Pending { generation: u64, derivation: Derivation },
    Ready(Arc<MasterKey>),
}

struct State {
    slot: Slot,
    /// Bumped by every `clear()` and every new derivation
    generation: u64,
}

/// Single-flight cache for the company master key.
///
/// # Invariants
///
/// - At most one derivation is in flight at any time
/// - The passphrase source is asked at most once per derivation
/// - After `clear()` returns, no caller observes the previously cached key
///   unless it was already holding it
pub struct MasterKeyProvider<P> {
    source: Arc<P>,
    params: KdfParams,
    state: Mutex<State>,
    derivations_started: AtomicU64,
}

impl<P: PassphraseSource> MasterKeyProvider<P> {
    /// Create a provider with the deployment's default KDF parameters.
    pub fn new(source: P) -> Self {
        Self::with_params(source, KdfParams::default())
    }

    /// Create a provider with explicit KDF parameters.
    pub fn with_params(source: P, params: KdfParams) -> Self {
        Self {
            source: Arc::new(source),
            params,
            state: Mutex::new(State { slot: Slot::Empty, generation: 0 }),
            derivations_started: AtomicU64::new(0),
        }
    }

    /// Return the master key, deriving it on first use.
    ///
    /// Must be called from within a Tokio runtime; the derivation itself runs
    /// on [`tokio::task::spawn_blocking`].
    ///
    /// # Errors
    ///
    /// - `MissingPassphrase`: the source cancelled or returned an empty
    ///   string. Nothing is cached; the next call asks again.
    /// - `DerivationFailed`: the KDF could not run. Nothing is cached.
    pub async fn get(&self) -> Result<Arc<MasterKey>, KeyError> {
        let (generation, derivation) = {
            let mut state = self.lock_state();
            match &state.slot {
                Slot::Ready(key) => return Ok(Arc::clone(key)),
                Slot::Pending { generation, derivation } => (*generation, derivation.clone()),
                Slot::Empty => {
                    state.generation += 1;
                    let generation = state.generation;
                    let derivation = self.start_derivation();
                    state.slot = Slot::Pending { generation, derivation: derivation.clone() };
                    (generation, derivation)
                },
            }
        };

        let result = derivation.await;

        let mut state = self.lock_state();
        if matches!(state.slot, Slot::Pending { generation: g, .. } if g == generation) {
            state.slot = match &result {
                Ok(key) => Slot::Ready(Arc::clone(key)),
                Err(_) => Slot::Empty,
            };
        }

        result
    }

    /// Discard the cached key and any in-flight derivation.
    ///
    /// Idempotent. Called on logout, on session start, and whenever a
    /// decryption fails authentication.
    pub fn clear(&self) {
        let mut state = self.lock_state();
        let had_key = matches!(state.slot, Slot::Ready(_));
        state.slot = Slot::Empty;
        state.generation += 1;
        drop(state);

        if had_key {
            tracing::debug!("Master key cache cleared");
        }
    }

    /// Returns true if a derived key is cached.
    pub fn is_cached(&self) -> bool {
        matches!(self.lock_state().slot, Slot::Ready(_))
    }

    /// Number of derivations started since construction.
    pub fn derivations_started(&self) -> u64 {
        self.derivations_started.load(Ordering::Relaxed)
    }

    fn start_derivation(&self) -> Derivation {
        self.derivations_started.fetch_add(1, Ordering::Relaxed);
        let source = Arc::clone(&self.source);
        let params = self.params.clone();

        async move {
            let passphrase = source
                .request_passphrase()
                .await
                .filter(|p| !p.is_empty())
                .ok_or(KeyError::MissingPassphrase)?;

            // PBKDF2 at 100k iterations takes long enough to stall an executor
            let key = tokio::task::spawn_blocking(move || derive_master_key(&passphrase, &params))
                .await
                .map_err(|e| KeyError::DerivationFailed { reason: e.to_string() })?
                .map_err(|e| KeyError::DerivationFailed { reason: e.to_string() })?;

            tracing::debug!("Master key derived");
            Ok(Arc::new(key))
        }
        .boxed()
        .shared()
    }

    fn lock_state(&self) -> MutexGuard<'_, State> {
        // State is replaced wholesale under the lock, so a poisoned guard
        // never holds a half-written slot
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<P> std::fmt::Debug for MasterKeyProvider<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MasterKeyProvider")
            .field("params", &self.params)
            .field("derivations_started", &self.derivations_started.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}
