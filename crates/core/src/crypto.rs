//! Encryption of tenant object-store secrets at rest.
//!
//! Secrets are sealed with AES-256-GCM under a single process-wide key that
//! is injected at startup. The stored form is base64 of
//!
//! ```text
//! [12-byte nonce][encrypted data][16-byte auth tag]
//! ```

use std::fmt;

use aes_gcm::{
    Aes256Gcm, Nonce,
    aead::{Aead, AeadCore, KeyInit, OsRng},
};
use base64::{Engine as _, engine::general_purpose::STANDARD};
use thiserror::Error;

/// Length of the AES-256 key in bytes.
pub const KEY_LEN: usize = 32;

const NONCE_LEN: usize = 12;

/// Secret encryption errors.
#[derive(Debug, Clone, Error)]
pub enum CryptoError {
    /// The process key is missing or malformed.
    #[error("invalid encryption key: {0}")]
    InvalidKey(String),

    /// Sealing the plaintext failed.
    #[error("encryption failed: {0}")]
    Encrypt(String),

    /// Opening the ciphertext failed (wrong key, tampering, bad encoding).
    #[error("decryption failed: {0}")]
    Decrypt(String),
}

/// Symmetric cipher for tenant secrets.
#[derive(Clone)]
pub struct SecretCipher {
    cipher: Aes256Gcm,
}

impl fmt::Debug for SecretCipher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretCipher").finish_non_exhaustive()
    }
}

impl SecretCipher {
    /// Creates a cipher from raw key bytes.
    #[must_use]
    pub fn new(key: &[u8; KEY_LEN]) -> Self {
        Self {
            cipher: Aes256Gcm::new(key.into()),
        }
    }

    /// Creates a cipher from a configured key.
    ///
    /// Accepts standard base64 of exactly 32 bytes, or a raw 32-byte string.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::InvalidKey`] if neither form yields 32 bytes.
    pub fn from_encoded(encoded: &str) -> Result<Self, CryptoError> {
        let encoded = encoded.trim();
        if encoded.is_empty() {
            return Err(CryptoError::InvalidKey("key is empty".to_string()));
        }

        let key: [u8; KEY_LEN] = match STANDARD.decode(encoded) {
            Ok(bytes) if bytes.len() == KEY_LEN => bytes
                .try_into()
                .map_err(|_| CryptoError::InvalidKey("unexpected key length".to_string()))?,
            _ => encoded.as_bytes().try_into().map_err(|_| {
                CryptoError::InvalidKey(format!(
                    "expected {KEY_LEN} raw bytes or base64 of {KEY_LEN} bytes"
                ))
            })?,
        };

        Ok(Self::new(&key))
    }

    /// Encrypts a secret and returns the base64 envelope.
    ///
    /// A fresh random nonce is used on every call.
    pub fn encrypt(&self, plain: &str) -> Result<String, CryptoError> {
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let ciphertext = self
            .cipher
            .encrypt(&nonce, plain.as_bytes())
            .map_err(|e| CryptoError::Encrypt(e.to_string()))?;

        let mut sealed = nonce.to_vec();
        sealed.extend_from_slice(&ciphertext);
        Ok(STANDARD.encode(sealed))
    }

    /// Decrypts a base64 envelope produced by [`SecretCipher::encrypt`].
    pub fn decrypt(&self, sealed: &str) -> Result<String, CryptoError> {
        let data = STANDARD
            .decode(sealed.trim())
            .map_err(|e| CryptoError::Decrypt(format!("invalid base64: {e}")))?;

        if data.len() <= NONCE_LEN {
            return Err(CryptoError::Decrypt(
                "ciphertext too short (missing nonce)".to_string(),
            ));
        }

        let (nonce_bytes, ciphertext) = data.split_at(NONCE_LEN);
        let plain = self
            .cipher
            .decrypt(Nonce::from_slice(nonce_bytes), ciphertext)
            .map_err(|_| CryptoError::Decrypt("wrong key or tampered data".to_string()))?;

        String::from_utf8(plain).map_err(|e| CryptoError::Decrypt(e.to_string()))
    }
}
