//! Key storage and envelope encryption
//!
//! The [`KeyStore`] trait abstracts over wherever key material actually
//! lives; the app only ever talks to [`KeyManager`], which uses exactly one
//! AES-256 key under a well-known alias. [`KeyringKeyStore`] keeps that key
//! in the OS keychain so it never lands in the data directory.

mod manager;

use std::collections::HashMap;
use std::sync::Mutex;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use keyring::Entry;
use rand::rngs::OsRng;
use rand::RngCore;

use crate::error::{Error, Result};

pub use manager::{KeyManager, DECRYPTION_ERROR};

/// AES-256 key length in bytes
pub const AES_KEY_LEN: usize = 32;

/// What a generated key may be used for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyPurpose {
    /// Symmetric encrypt + decrypt only
    EncryptDecrypt,
}

/// Parameters for key generation
#[derive(Debug, Clone)]
pub struct KeySpec {
    pub alias: String,
    pub purpose: KeyPurpose,
    pub size_bits: u32,
}

impl KeySpec {
    /// Spec for a 256-bit AES encrypt/decrypt key under the given alias
    #[must_use]
    pub fn aes256(alias: impl Into<String>) -> Self {
        Self {
            alias: alias.into(),
            purpose: KeyPurpose::EncryptDecrypt,
            size_bits: 256,
        }
    }

    fn validate(&self) -> Result<()> {
        if self.size_bits != 256 {
            return Err(Error::InvalidInput(format!(
                "Unsupported key size: {} bits",
                self.size_bits
            )));
        }
        Ok(())
    }
}

/// Abstract key-store capability consumed by [`KeyManager`]
pub trait KeyStore: Send + Sync {
    /// Create a key for the given spec if the alias is still free
    fn generate_key(&self, spec: &KeySpec) -> Result<()>;

    /// Fetch the key bytes for an alias
    fn key(&self, alias: &str) -> Result<[u8; AES_KEY_LEN]>;

    /// Whether a key exists under the alias
    fn has_alias(&self, alias: &str) -> Result<bool>;
}

/// OS keychain-backed key store
///
/// Key bytes are generated from the OS RNG and handed to the platform
/// keychain (Keychain, Credential Manager, keyutils). The data directory
/// never sees them.
pub struct KeyringKeyStore {
    service: String,
}

impl KeyringKeyStore {
    /// Key store scoped to the given keychain service name
    #[must_use]
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    fn entry(&self, alias: &str) -> Result<Entry> {
        Entry::new(&self.service, alias).map_err(|error| Error::KeyStore(error.to_string()))
    }
}

impl Default for KeyringKeyStore {
    fn default() -> Self {
        Self::new("jot")
    }
}

impl KeyStore for KeyringKeyStore {
    fn generate_key(&self, spec: &KeySpec) -> Result<()> {
        spec.validate()?;
        let entry = self.entry(&spec.alias)?;
        match entry.get_password() {
            Ok(_) => Ok(()),
            Err(keyring::Error::NoEntry) => {
                let mut key = [0u8; AES_KEY_LEN];
                OsRng.fill_bytes(&mut key);
                entry
                    .set_password(&BASE64.encode(key))
                    .map_err(|error| Error::KeyStore(error.to_string()))
            }
            Err(error) => Err(Error::KeyStore(error.to_string())),
        }
    }

    fn key(&self, alias: &str) -> Result<[u8; AES_KEY_LEN]> {
        let encoded = self
            .entry(alias)?
            .get_password()
            .map_err(|error| Error::KeyStore(error.to_string()))?;
        let bytes = BASE64
            .decode(encoded)
            .map_err(|_| Error::KeyStore("Stored key has invalid format".to_string()))?;
        bytes
            .try_into()
            .map_err(|_| Error::KeyStore("Stored key has invalid length".to_string()))
    }

    fn has_alias(&self, alias: &str) -> Result<bool> {
        match self.entry(alias)?.get_password() {
            Ok(_) => Ok(true),
            Err(keyring::Error::NoEntry) => Ok(false),
            Err(error) => Err(Error::KeyStore(error.to_string())),
        }
    }
}

/// In-process key store for tests and ephemeral runs
#[derive(Default)]
pub struct MemoryKeyStore {
    keys: Mutex<HashMap<String, [u8; AES_KEY_LEN]>>,
}

impl MemoryKeyStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyStore for MemoryKeyStore {
    fn generate_key(&self, spec: &KeySpec) -> Result<()> {
        spec.validate()?;
        let mut keys = self.keys.lock().expect("key store lock poisoned");
        keys.entry(spec.alias.clone()).or_insert_with(|| {
            let mut key = [0u8; AES_KEY_LEN];
            OsRng.fill_bytes(&mut key);
            key
        });
        Ok(())
    }

    fn key(&self, alias: &str) -> Result<[u8; AES_KEY_LEN]> {
        let keys = self.keys.lock().expect("key store lock poisoned");
        keys.get(alias)
            .copied()
            .ok_or_else(|| Error::KeyStore(format!("No key under alias: {alias}")))
    }

    fn has_alias(&self, alias: &str) -> Result<bool> {
        let keys = self.keys.lock().expect("key store lock poisoned");
        Ok(keys.contains_key(alias))
    }
}
