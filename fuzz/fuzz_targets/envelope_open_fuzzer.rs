//! Fuzz target for opening stored files
//!
//! Feeds attacker-controlled blobs and wrapped-key metadata through the same
//! parse, unwrap, and open path a download takes.
//!
//! # Invariants
//!
//! - Parsing and opening NEVER panic; bad input is an `Err`
//! - Blobs shorter than nonce + tag are rejected before any AEAD work
//! - Random input never authenticates under a fixed master key

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use strongbox_crypto::{
    CryptoError, KdfParams, SealedFile, WrappedKey, derive_master_key, open_file, unwrap_file_key,
};

#[derive(Debug, Arbitrary)]
struct StoredFile {
    blob: Vec<u8>,
    wrapped_key: String,
    wrap_nonce: String,
}

fuzz_target!(|input: StoredFile| {
    let sealed = match SealedFile::from_blob(&input.blob) {
        Ok(sealed) => sealed,
        Err(CryptoError::BlobTooShort { actual, minimum }) => {
            assert!(actual < minimum);
            assert_eq!(actual, input.blob.len());
            return;
        },
        Err(e) => panic!("unexpected parse error: {e:?}"),
    };
    assert_eq!(sealed.to_blob(), input.blob);

    let params = KdfParams { salt: b"fuzz".to_vec(), iterations: 1 };
    let Ok(master_key) = derive_master_key("fuzz passphrase", &params) else {
        return;
    };

    let wrapped = WrappedKey { wrapped_key: input.wrapped_key, wrap_nonce: input.wrap_nonce };
    match unwrap_file_key(&wrapped, &master_key) {
        // Accepting this would be a tag forgery
        Ok(file_key) => {
            let opened = open_file(&sealed, &file_key);
            panic!("random wrapped key authenticated (file opened: {})", opened.is_ok());
        },
        Err(CryptoError::Base64 { .. } | CryptoError::InvalidNonceLength { .. }) => {},
        Err(e) => assert_eq!(e, CryptoError::AuthenticationFailed),
    }
});
