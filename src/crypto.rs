//! Key material for the security module and API key hashing.
//!
//! Managed data keys are never stored in the clear: each one is sealed
//! with the master key and kept as base64 in `encryption_keys.wrapped_key`.
//! Ciphertexts are `base64(nonce || sealed bytes)`.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use chacha20poly1305::aead::{Aead, AeadCore, KeyInit, OsRng};
use chacha20poly1305::{ChaCha20Poly1305, Key, Nonce};
use rand::Rng;
use rand::distr::Alphanumeric;
use sha2::{Digest, Sha256};
use thiserror::Error;

pub const KEY_ALGORITHM: &str = "chacha20poly1305";
pub const API_KEY_PREFIX: &str = "erp_";
pub const API_KEY_LENGTH: usize = 40;
pub const API_KEY_VISIBLE_CHARS: usize = 12;

const NONCE_LEN: usize = 12;
const KEY_LEN: usize = 32;

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("invalid master key")]
    InvalidMasterKey,

    #[error("encryption failed")]
    Encryption,

    #[error("decryption failed: wrong key or tampered input")]
    Decryption,

    #[error("malformed base64 input")]
    Encoding,
}

/// Seals and opens data under keys wrapped by a master key.
#[derive(Clone)]
pub struct Encryption {
    master: Key,
}

impl std::fmt::Debug for Encryption {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Encryption { .. }")
    }
}

impl Encryption {
    pub fn new(master_key: [u8; KEY_LEN]) -> Self {
        Self {
            master: Key::from(master_key),
        }
    }

    /// Derives the master key as SHA-256 of `secret`.
    pub fn from_secret(secret: &str) -> Self {
        let digest = Sha256::digest(secret.as_bytes());
        let mut key = [0u8; KEY_LEN];
        key.copy_from_slice(&digest);
        Self::new(key)
    }

    /// Accepts a base64 encoded 32-byte key.
    pub fn from_base64(encoded: &str) -> Result<Self, CryptoError> {
        let bytes = STANDARD
            .decode(encoded.trim())
            .map_err(|_| CryptoError::Encoding)?;
        let key: [u8; KEY_LEN] = bytes
            .try_into()
            .map_err(|_| CryptoError::InvalidMasterKey)?;
        Ok(Self::new(key))
    }

    /// Creates a fresh random data key and returns it sealed under the master key.
    pub fn generate_wrapped_key(&self) -> Result<String, CryptoError> {
        let data_key = ChaCha20Poly1305::generate_key(&mut OsRng);
        seal(&self.master, data_key.as_slice())
    }

    pub fn encrypt(&self, wrapped_key: &str, plaintext: &[u8]) -> Result<String, CryptoError> {
        let key = self.unwrap_key(wrapped_key)?;
        seal(&key, plaintext)
    }

    pub fn decrypt(&self, wrapped_key: &str, ciphertext: &str) -> Result<Vec<u8>, CryptoError> {
        let key = self.unwrap_key(wrapped_key)?;
        open(&key, ciphertext)
    }

    fn unwrap_key(&self, wrapped_key: &str) -> Result<Key, CryptoError> {
        let raw = open(&self.master, wrapped_key)?;
        let raw: [u8; KEY_LEN] = raw.try_into().map_err(|_| CryptoError::Decryption)?;
        Ok(Key::from(raw))
    }
}

fn seal(key: &Key, plaintext: &[u8]) -> Result<String, CryptoError> {
    let cipher = ChaCha20Poly1305::new(key);
    let nonce = ChaCha20Poly1305::generate_nonce(&mut OsRng);
    let sealed = cipher
        .encrypt(&nonce, plaintext)
        .map_err(|_| CryptoError::Encryption)?;
    let mut payload = nonce.to_vec();
    payload.extend_from_slice(&sealed);
    Ok(STANDARD.encode(payload))
}

fn open(key: &Key, encoded: &str) -> Result<Vec<u8>, CryptoError> {
    let payload = STANDARD
        .decode(encoded.trim())
        .map_err(|_| CryptoError::Encoding)?;
    if payload.len() <= NONCE_LEN {
        return Err(CryptoError::Decryption);
    }
    let (nonce, sealed) = payload.split_at(NONCE_LEN);
    ChaCha20Poly1305::new(key)
        .decrypt(Nonce::from_slice(nonce), sealed)
        .map_err(|_| CryptoError::Decryption)
}

/// Random `erp_`-prefixed alphanumeric key of [`API_KEY_LENGTH`] characters.
pub fn generate_api_key() -> String {
    let suffix: String = rand::rng()
        .sample_iter(&Alphanumeric)
        .take(API_KEY_LENGTH - API_KEY_PREFIX.len())
        .map(char::from)
        .collect();
    format!("{API_KEY_PREFIX}{suffix}")
}

/// Lowercase hex SHA-256 digest stored instead of the key.
pub fn hash_api_key(key: &str) -> String {
    format!("{:x}", Sha256::digest(key.as_bytes()))
}

/// Leading characters kept for display.
pub fn api_key_prefix(key: &str) -> String {
    key.chars().take(API_KEY_VISIBLE_CHARS).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_round_trips_through_wrapped_key() {
        let encryption = Encryption::from_secret("master secret");
        let wrapped = encryption.generate_wrapped_key().unwrap();
        let sealed = encryption.encrypt(&wrapped, b"payroll").unwrap();
        assert_eq!(encryption.decrypt(&wrapped, &sealed).unwrap(), b"payroll");
    }

    #[test]
    fn tampered_ciphertext_fails() {
        let encryption = Encryption::from_secret("master secret");
        let wrapped = encryption.generate_wrapped_key().unwrap();
        let sealed = encryption.encrypt(&wrapped, b"payroll").unwrap();
        let mut bytes = STANDARD.decode(&sealed).unwrap();
        let last = bytes.len() - 1;
        bytes[last] ^= 0x01;
        let tampered = STANDARD.encode(bytes);
        assert!(matches!(
            encryption.decrypt(&wrapped, &tampered),
            Err(CryptoError::Decryption)
        ));
    }

    #[test]
    fn other_master_key_cannot_unwrap() {
        let wrapped = Encryption::from_secret("a").generate_wrapped_key().unwrap();
        let other = Encryption::from_secret("b");
        assert!(other.encrypt(&wrapped, b"x").is_err());
    }

    #[test]
    fn master_key_from_base64_requires_32_bytes() {
        let encoded = STANDARD.encode([7u8; 32]);
        assert!(Encryption::from_base64(&encoded).is_ok());
        let short = STANDARD.encode([7u8; 16]);
        assert!(matches!(
            Encryption::from_base64(&short),
            Err(CryptoError::InvalidMasterKey)
        ));
    }

    #[test]
    fn api_keys_have_prefix_and_length() {
        let key = generate_api_key();
        assert!(key.starts_with(API_KEY_PREFIX));
        assert_eq!(key.len(), API_KEY_LENGTH);
        assert_eq!(api_key_prefix(&key).len(), API_KEY_VISIBLE_CHARS);
        assert_ne!(generate_api_key(), key);
    }

    #[test]
    fn api_key_hash_is_hex_sha256() {
        let hash = hash_api_key("erp_test");
        assert_eq!(hash.len(), 64);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(hash, hash_api_key("erp_test"));
    }
}
