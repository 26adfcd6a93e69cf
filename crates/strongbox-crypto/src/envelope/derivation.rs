//! Master key derivation using PBKDF2-HMAC-SHA256

use pbkdf2::pbkdf2_hmac;
use sha2::Sha256;
use zeroize::Zeroize;

use super::{
    error::CryptoError,
    keys::{KEY_SIZE, MasterKey},
};

/// Application-wide salt shared by every deployment
pub const DEFAULT_SALT: &str = "CompanyFileSystemSalt";

/// PBKDF2 iteration count
pub const DEFAULT_ITERATIONS: u32 = 100_000;

/// Parameters for stretching a passphrase into a master key.
///
/// The salt is fixed per deployment rather than per key: every session in
/// the same deployment must derive the same master key from the same
/// passphrase, otherwise previously wrapped file keys become unreadable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KdfParams {
    /// Salt bytes fed to PBKDF2
    pub salt: Vec<u8>,
    /// PBKDF2 iteration count (must be non-zero)
    pub iterations: u32,
}

impl Default for KdfParams {
    fn default() -> Self {
        Self { salt: DEFAULT_SALT.as_bytes().to_vec(), iterations: DEFAULT_ITERATIONS }
    }
}

/// Derive the 256-bit master key from a passphrase.
///
/// Deterministic: the same passphrase and parameters always produce the same
/// key. CPU-bound at the default iteration count; async callers should run
/// it off the executor.
///
/// # Errors
///
/// - `InvalidKdfParams`: zero iterations
pub fn derive_master_key(passphrase: &str, params: &KdfParams) -> Result<MasterKey, CryptoError> {
    if params.iterations == 0 {
        return Err(CryptoError::InvalidKdfParams {
            reason: "iteration count must be non-zero".to_string(),
        });
    }

    let mut output = [0u8; KEY_SIZE];
    pbkdf2_hmac::<Sha256>(passphrase.as_bytes(), &params.salt, params.iterations, &mut output);

    let key = MasterKey::from_bytes(output);
    output.zeroize();
    Ok(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast_params(salt: &[u8]) -> KdfParams {
        KdfParams { salt: salt.to_vec(), iterations: 1 }
    }

    #[test]
    fn matches_pbkdf2_sha256_vector() {
        // RFC 7914 section 11, first 32 bytes
        let key = derive_master_key("passwd", &fast_params(b"salt")).unwrap();
        assert_eq!(
            hex::encode(key.key()),
            "55ac046e56e3089fec1691c22544b605f94185216dde0465e68b9d57c20dacbc"
        );
    }

    #[test]
    fn default_params_match_deployment_constants() {
        let params = KdfParams::default();
        assert_eq!(params.salt, b"CompanyFileSystemSalt");
        assert_eq!(params.iterations, 100_000);
    }

    #[test]
    fn derive_with_default_params() {
        let key = derive_master_key("correct horse", &KdfParams::default()).unwrap();
        assert_eq!(
            hex::encode(key.key()),
            "1ca1ae89c602625faf3e54a63183db7d15f63926e18305b3d240537e603b468a"
        );
    }

    #[test]
    fn derive_is_deterministic() {
        let params = fast_params(b"deployment-salt");
        let key1 = derive_master_key("hunter2", &params).unwrap();
        let key2 = derive_master_key("hunter2", &params).unwrap();

        assert_eq!(key1.key(), key2.key(), "same inputs must produce same output");
    }

    #[test]
    fn different_passphrases_produce_different_keys() {
        let params = fast_params(b"deployment-salt");
        let key1 = derive_master_key("hunter2", &params).unwrap();
        let key2 = derive_master_key("hunter3", &params).unwrap();

        assert_ne!(key1.key(), key2.key());
    }

    #[test]
    fn different_salts_produce_different_keys() {
        let key1 = derive_master_key("hunter2", &fast_params(b"salt-a")).unwrap();
        let key2 = derive_master_key("hunter2", &fast_params(b"salt-b")).unwrap();

        assert_ne!(key1.key(), key2.key());
    }

    #[test]
    fn zero_iterations_rejected() {
        let params = KdfParams { salt: b"salt".to_vec(), iterations: 0 };
        let result = derive_master_key("hunter2", &params);

        assert!(matches!(result, Err(CryptoError::InvalidKdfParams { .. })));
    }
}
