//! AES-256-GCM key manager

use std::sync::Arc;

use aes_gcm::aead::Aead;
use aes_gcm::{Aes256Gcm, KeyInit, Nonce};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use rand::rngs::OsRng;
use rand::RngCore;

use super::{KeySpec, KeyStore};
use crate::error::{Error, Result};

const NONCE_LEN: usize = 12;

/// Sentinel substituted for a field whose ciphertext no longer decrypts
pub const DECRYPTION_ERROR: &str = "Decryption error";

/// Authenticated encryption under one keystore-held AES-256 key
///
/// Blob format: `base64(nonce || ciphertext+tag)`, with a fresh random
/// 12-byte nonce per call. The tag check makes tampering a decrypt error
/// rather than silent garbage.
pub struct KeyManager {
    store: Arc<dyn KeyStore>,
    alias: String,
}

impl KeyManager {
    /// Key manager bound to one alias in the given store
    pub fn new(store: Arc<dyn KeyStore>, alias: impl Into<String>) -> Self {
        Self {
            store,
            alias: alias.into(),
        }
    }

    /// Create the key if no key exists under this alias yet; idempotent
    pub fn generate_key_if_absent(&self) -> Result<()> {
        if !self.store.has_alias(&self.alias)? {
            self.store.generate_key(&KeySpec::aes256(&self.alias))?;
            tracing::debug!(alias = %self.alias, "Generated encryption key");
        }
        Ok(())
    }

    /// Whether the key exists; diagnostics only
    #[must_use]
    pub fn is_key_generated(&self) -> bool {
        self.store.has_alias(&self.alias).unwrap_or(false)
    }

    fn cipher(&self) -> Result<Aes256Gcm> {
        let key = self.store.key(&self.alias)?;
        Aes256Gcm::new_from_slice(&key)
            .map_err(|error| Error::Crypto(format!("AES key init failed: {error}")))
    }

    /// Encrypt a string field to its persisted blob form
    pub fn encrypt(&self, plaintext: &str) -> Result<String> {
        let cipher = self.cipher()?;
        let mut nonce = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce);
        let ciphertext = cipher
            .encrypt(Nonce::from_slice(&nonce), plaintext.as_bytes())
            .map_err(|error| Error::Crypto(format!("AES-GCM encrypt failed: {error}")))?;

        let mut blob = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        blob.extend_from_slice(&nonce);
        blob.extend_from_slice(&ciphertext);
        Ok(BASE64.encode(blob))
    }

    /// Decrypt a persisted blob back to the plaintext field
    pub fn decrypt(&self, blob: &str) -> Result<String> {
        let decoded = BASE64
            .decode(blob.trim())
            .map_err(|error| Error::Crypto(format!("Malformed base64 blob: {error}")))?;
        if decoded.len() < NONCE_LEN {
            return Err(Error::Crypto("Encrypted blob too short".to_string()));
        }
        let (nonce, ciphertext) = decoded.split_at(NONCE_LEN);
        let plaintext = self
            .cipher()?
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|error| Error::Crypto(format!("AES-GCM decrypt failed: {error}")))?;
        String::from_utf8(plaintext)
            .map_err(|error| Error::Crypto(format!("Decrypted bytes not UTF-8: {error}")))
    }
}
