//! Service configuration.

use std::path::{Path, PathBuf};

use strongbox_core::LockoutPolicy;
use strongbox_crypto::KdfParams;

use crate::identity::PasswordHashing;

/// Environment variable consulted for the company passphrase.
pub const DEFAULT_PASSPHRASE_ENV: &str = "STRONGBOX_PASSPHRASE";

/// Environment variable consulted for the employee's login password.
pub const DEFAULT_PASSWORD_ENV: &str = "STRONGBOX_PASSWORD";

/// Configuration for a Strongbox deployment.
///
/// Every employee of a deployment must use the same `kdf` parameters;
/// changing them makes every stored wrapped key unreadable.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Directory holding the metadata database and the blob store
    pub data_dir: PathBuf,
    /// Master key derivation parameters
    pub kdf: KdfParams,
    /// Failed-login lockout thresholds
    pub lockout: LockoutPolicy,
    /// Argon2id cost for employee passwords
    pub password_hashing: PasswordHashing,
    /// Variable that, when set, supplies the company passphrase
    pub passphrase_env: String,
    /// Variable that, when set, supplies the login password
    pub password_env: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("strongbox-data"),
            kdf: KdfParams::default(),
            lockout: LockoutPolicy::default(),
            password_hashing: PasswordHashing::default(),
            passphrase_env: DEFAULT_PASSPHRASE_ENV.to_string(),
            password_env: DEFAULT_PASSWORD_ENV.to_string(),
        }
    }
}

impl ServiceConfig {
    /// Default configuration rooted at `data_dir`.
    pub fn with_data_dir(data_dir: impl AsRef<Path>) -> Self {
        Self { data_dir: data_dir.as_ref().to_path_buf(), ..Self::default() }
    }

    /// Path of the redb metadata database.
    pub fn metadata_path(&self) -> PathBuf {
        self.data_dir.join("metadata.redb")
    }

    /// Root of the blob store.
    pub fn objects_dir(&self) -> PathBuf {
        self.data_dir.join("objects")
    }
}

#[cfg(test)]
mod tests {
    use strongbox_crypto::{DEFAULT_ITERATIONS, DEFAULT_SALT};

    use super::*;

    #[test]
    fn defaults_match_deployment_constants() {
        let config = ServiceConfig::default();

        assert_eq!(config.kdf.salt, DEFAULT_SALT.as_bytes());
        assert_eq!(config.kdf.iterations, DEFAULT_ITERATIONS);
        assert_eq!(config.lockout, LockoutPolicy { threshold: 3, base_lock_minutes: 5 });
        assert_eq!(config.passphrase_env, "STRONGBOX_PASSPHRASE");
    }

    #[test]
    fn paths_live_under_data_dir() {
        let config = ServiceConfig::with_data_dir("/srv/strongbox");

        assert_eq!(config.metadata_path(), Path::new("/srv/strongbox/metadata.redb"));
        assert_eq!(config.objects_dir(), Path::new("/srv/strongbox/objects"));
    }
}
