//! Encrypted private key loading.
//!
//! Key files are JSON documents of the form
//! `{"encryptedData": "...", "iv": "...", "salt": "..."}` with hex-encoded
//! fields. The cipher key is derived from the operator password with scrypt
//! (N=2^14, r=8, p=1, 32 bytes) and the payload is AES-256-CBC with PKCS#7
//! padding.
//!
//! Batch decryption never fails as a whole: bad files are counted and
//! skipped, and the caller decides whether enough keys survived.

use std::fs;
use std::path::Path;

use aes::cipher::{block_padding::Pkcs7, BlockDecryptMut, KeyIvInit};
use serde::Deserialize;
use thiserror::Error;

type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;

const SCRYPT_LOG_N: u8 = 14;
const SCRYPT_R: u32 = 8;
const SCRYPT_P: u32 = 1;

/// Errors from decrypting a single key file.
#[derive(Debug, Error)]
pub enum KeystoreError {
    #[error("failed to read key file: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed key file: {0}")]
    Format(#[from] serde_json::Error),

    #[error("invalid hex field: {0}")]
    Hex(#[from] hex::FromHexError),

    #[error("invalid initialization vector length")]
    InvalidIv,

    #[error("key derivation failed")]
    KeyDerivation,

    #[error("decryption failed, wrong password or corrupt file")]
    Decrypt,

    #[error("decrypted key is not valid UTF-8")]
    Encoding,
}

/// On-disk layout of an encrypted key file.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EncryptedKeyFile {
    encrypted_data: String,
    iv: String,
    salt: String,
}

/// Result of a batch decryption pass.
#[derive(Debug, Default)]
pub struct DecryptionReport {
    /// Successfully decrypted private keys, in input order.
    pub keys: Vec<String>,
    /// Number of files that could not be decrypted.
    pub failures: usize,
}

/// Decrypt one key file with the given password.
pub fn decrypt_key_file(path: &Path, password: &str) -> Result<String, KeystoreError> {
    let raw = fs::read_to_string(path)?;
    let file: EncryptedKeyFile = serde_json::from_str(&raw)?;

    let salt = hex::decode(&file.salt)?;
    let iv: [u8; 16] = hex::decode(&file.iv)?
        .try_into()
        .map_err(|_| KeystoreError::InvalidIv)?;
    let ciphertext = hex::decode(&file.encrypted_data)?;

    let params = scrypt::Params::new(SCRYPT_LOG_N, SCRYPT_R, SCRYPT_P, 32)
        .map_err(|_| KeystoreError::KeyDerivation)?;
    let mut key = [0u8; 32];
    scrypt::scrypt(password.as_bytes(), &salt, &params, &mut key)
        .map_err(|_| KeystoreError::KeyDerivation)?;

    let plaintext = Aes256CbcDec::new(&key.into(), &iv.into())
        .decrypt_padded_vec_mut::<Pkcs7>(&ciphertext)
        .map_err(|_| KeystoreError::Decrypt)?;

    String::from_utf8(plaintext).map_err(|_| KeystoreError::Encoding)
}

/// Decrypt every key file in `paths`, counting failures instead of
/// propagating them.
pub fn decrypt_all(paths: &[String], password: &str) -> DecryptionReport {
    let mut report = DecryptionReport::default();

    for path in paths {
        match decrypt_key_file(Path::new(path), password) {
            Ok(key) => report.keys.push(key),
            Err(e) => {
                tracing::warn!(path = %path, error = %e, "Failed to decrypt key file");
                report.failures += 1;
            }
        }
    }

    report
}
