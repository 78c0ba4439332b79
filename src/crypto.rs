//! Credential encryption module using AES-256-GCM
//!
//! Tenant secrets (Delifast password, Shopify access token) are stored as
//! `{ivHex}:{authTagHex}:{cipherHex}` strings. Values with no separator are
//! legacy plaintext from before encryption-at-rest was introduced and are
//! returned as-is.

use aes_gcm::{
    Aes256Gcm, Key, Nonce,
    aead::{Aead, AeadCore, KeyInit, OsRng},
};
use thiserror::Error;
use zeroize::{Zeroize, ZeroizeOnDrop};

const NONCE_LEN: usize = 12;
const TAG_LEN: usize = 16;

/// Crypto error types
#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("encryption failed: {0}")]
    EncryptionFailed(String),
    #[error("decryption failed: {0}")]
    DecryptionFailed(String),
    #[error("invalid ciphertext format")]
    InvalidFormat,
    #[error("empty ciphertext")]
    EmptyCiphertext,
}

/// Secure wrapper for encryption keys with zeroization
#[derive(Debug, Clone, Zeroize, ZeroizeOnDrop)]
pub struct ZeroizingKey(Vec<u8>);

/// Type alias for crypto keys
pub type CryptoKey = ZeroizingKey;

impl CryptoKey {
    /// Create a new crypto key from bytes
    pub fn new(bytes: Vec<u8>) -> Result<Self, CryptoError> {
        if bytes.len() != 32 {
            return Err(CryptoError::EncryptionFailed(
                "Invalid key length: expected 32 bytes".to_string(),
            ));
        }
        Ok(ZeroizingKey(bytes))
    }

    /// Get the key as bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

/// Encrypt a secret into the `{ivHex}:{authTagHex}:{cipherHex}` wire format.
pub fn encrypt_string(key: &CryptoKey, plaintext: &str) -> Result<String, CryptoError> {
    let cipher_key = Key::<Aes256Gcm>::from_slice(key.as_bytes());
    let cipher = Aes256Gcm::new(cipher_key);

    let nonce = Aes256Gcm::generate_nonce(&mut OsRng);

    // aes-gcm appends the 16-byte auth tag to the ciphertext
    let mut combined = cipher
        .encrypt(&nonce, plaintext.as_bytes())
        .map_err(|e| CryptoError::EncryptionFailed(e.to_string()))?;

    if combined.len() < TAG_LEN {
        return Err(CryptoError::EncryptionFailed(
            "ciphertext shorter than auth tag".to_string(),
        ));
    }
    let tag = combined.split_off(combined.len() - TAG_LEN);

    Ok(format!(
        "{}:{}:{}",
        hex::encode(nonce),
        hex::encode(tag),
        hex::encode(combined)
    ))
}

/// Decrypt a stored secret.
///
/// Values without a `:` separator are legacy plaintext and returned
/// unchanged. Values with a separator must have exactly three hex segments.
pub fn decrypt_string(key: &CryptoKey, stored: &str) -> Result<String, CryptoError> {
    if stored.is_empty() {
        return Err(CryptoError::EmptyCiphertext);
    }

    if !stored.contains(':') {
        return Ok(stored.to_string());
    }

    let parts: Vec<&str> = stored.split(':').collect();
    if parts.len() != 3 {
        return Err(CryptoError::InvalidFormat);
    }

    let nonce_bytes = hex::decode(parts[0]).map_err(|_| CryptoError::InvalidFormat)?;
    let tag = hex::decode(parts[1]).map_err(|_| CryptoError::InvalidFormat)?;
    let ciphertext = hex::decode(parts[2]).map_err(|_| CryptoError::InvalidFormat)?;

    if nonce_bytes.len() != NONCE_LEN || tag.len() != TAG_LEN {
        return Err(CryptoError::InvalidFormat);
    }

    let mut combined = ciphertext;
    combined.extend_from_slice(&tag);

    let cipher_key = Key::<Aes256Gcm>::from_slice(key.as_bytes());
    let cipher = Aes256Gcm::new(cipher_key);
    let nonce = Nonce::from_slice(&nonce_bytes);

    let plaintext = cipher
        .decrypt(nonce, combined.as_slice())
        .map_err(|e| CryptoError::DecryptionFailed(e.to_string()))?;

    String::from_utf8(plaintext)
        .map_err(|e| CryptoError::DecryptionFailed(format!("Invalid UTF-8: {}", e)))
}

/// Determine if a stored value is in the encrypted wire format.
pub fn is_encrypted_value(stored: &str) -> bool {
    stored.split(':').count() == 3
}
