//! Source of the company passphrase.
//!
//! The master key provider never reads a terminal or a form itself; it asks a
//! [`PassphraseSource`] when (and only when) it has no cached key.

use std::future::Future;

use zeroize::Zeroizing;

/// Supplies the shared company passphrase on demand.
///
/// Called at most once per derivation, even when many operations are waiting
/// on the key. Returning `None` (or an empty string) means the user cancelled.
pub trait PassphraseSource: Send + Sync + 'static {
    /// Ask for the passphrase.
    fn request_passphrase(&self) -> impl Future<Output = Option<Zeroizing<String>>> + Send;
}

/// Passphrase source that always answers with the same value.
///
/// Used for non-interactive runs (passphrase from configuration) and tests.
#[derive(Clone)]
pub struct FixedPassphrase {
    passphrase: Option<Zeroizing<String>>,
}

impl FixedPassphrase {
    /// Source that always supplies `passphrase`.
    pub fn new(passphrase: impl Into<String>) -> Self {
        Self { passphrase: Some(Zeroizing::new(passphrase.into())) }
    }

    /// Source that always cancels.
    pub fn cancelled() -> Self {
        Self { passphrase: None }
    }
}

impl std::fmt::Debug for FixedPassphrase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FixedPassphrase")
            .field("configured", &self.passphrase.is_some())
            .finish()
    }
}

impl PassphraseSource for FixedPassphrase {
    async fn request_passphrase(&self) -> Option<Zeroizing<String>> {
        self.passphrase.clone()
    }
}
