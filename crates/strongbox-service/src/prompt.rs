//! Terminal secret entry.

use strongbox_core::PassphraseSource;
use zeroize::Zeroizing;

/// Read a secret from `env_var`, or prompt for it without echo.
///
/// The prompt blocks, so it runs on the blocking pool. Returns `None` if the
/// terminal cannot be read (no TTY, EOF).
pub async fn read_secret(env_var: &str, prompt: &str) -> Option<Zeroizing<String>> {
    if let Ok(value) = std::env::var(env_var) {
        tracing::debug!(env_var, "Secret taken from environment");
        return Some(Zeroizing::new(value));
    }

    let prompt = prompt.to_string();
    match tokio::task::spawn_blocking(move || rpassword::prompt_password(prompt)).await {
        Ok(Ok(secret)) => Some(Zeroizing::new(secret)),
        Ok(Err(e)) => {
            tracing::warn!(error = %e, "Could not read secret from terminal");
            None
        },
        Err(e) => {
            tracing::warn!(error = %e, "Secret prompt task failed");
            None
        },
    }
}

/// Company passphrase from the environment or the terminal.
///
/// Asked only when the master key is not cached, so a CLI run that shares
/// several files prompts once.
#[derive(Debug, Clone)]
pub struct TerminalPassphrase {
    env_var: String,
}

impl TerminalPassphrase {
    /// Source that checks `env_var` before prompting.
    pub fn new(env_var: impl Into<String>) -> Self {
        Self { env_var: env_var.into() }
    }
}

impl PassphraseSource for TerminalPassphrase {
    async fn request_passphrase(&self) -> Option<Zeroizing<String>> {
        read_secret(&self.env_var, "Company passphrase: ").await
    }
}
