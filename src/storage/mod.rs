//! Durable key-value storage for credentials.
//!
//! The credential layer only needs `get`/`set` of opaque string values by key.
//! Three implementations ship with the crate:
//!
//! - [`MemoryStore`] - process-local, for tests and short-lived tools
//! - [`EncryptedFileStore`] - XChaCha20-Poly1305 encrypted file under the user config dir
//! - [`KeyringStore`] - a single entry in the system keychain
//!
//! Each implementation writes a multi-key [`set_all`](CredentialStore::set_all)
//! as one unit, so an access token is never persisted without its refresh token.

mod encrypted;
mod keychain;
mod keyring_store;

use std::collections::BTreeMap;
use std::sync::{Mutex, PoisonError};

pub use encrypted::{EncryptedFileStore, default_credentials_path};
pub use keyring_store::KeyringStore;

/// Errors for credential storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// No suitable user config directory is available.
    #[error("unable to determine config directory (set XDG_CONFIG_HOME or HOME)")]
    ConfigDirUnavailable,
    /// Filesystem I/O failed.
    #[error(transparent)]
    Io(#[from] std::io::Error),
    /// Serialization/deserialization failed.
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    /// Could not access keychain and no env fallback key was provided.
    #[error(
        "unable to access system keychain; set FREESOUND_MASTER_KEY or configure keychain access"
    )]
    KeychainUnavailable,
    /// Stored payload is malformed.
    #[error("stored credential payload is invalid")]
    InvalidPayload,
    /// Encryption failed.
    #[error("failed to encrypt stored credentials")]
    EncryptionFailed,
    /// Decryption failed.
    #[error("failed to decrypt stored credentials")]
    DecryptionFailed,
}

/// Durable mapping from key to opaque string value.
///
/// Implementations must survive process restarts (except [`MemoryStore`]) and
/// must apply [`set_all`](Self::set_all) atomically: after a crash either every
/// entry is visible or none is.
pub trait CredentialStore: Send + Sync {
    /// Returns the stored value for `key`, or `None` when absent.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the backing storage cannot be read or is corrupted.
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Writes several entries as one unit; a `None` value removes the key.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the backing storage cannot be written.
    fn set_all(&self, entries: &[(&str, Option<&str>)]) -> Result<(), StoreError>;

    /// Writes or removes a single entry.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the backing storage cannot be written.
    fn set(&self, key: &str, value: Option<&str>) -> Result<(), StoreError> {
        self.set_all(&[(key, value)])
    }
}

/// Applies `entries` to an in-memory key map.
pub(crate) fn apply_entries(map: &mut BTreeMap<String, String>, entries: &[(&str, Option<&str>)]) {
    for (key, value) in entries {
        match value {
            Some(value) => {
                map.insert((*key).to_string(), (*value).to_string());
            }
            None => {
                map.remove(*key);
            }
        }
    }
}

/// Process-local store with no durability.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<BTreeMap<String, String>>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-populated with `entries`.
    #[must_use]
    pub fn with_entries(entries: &[(&str, &str)]) -> Self {
        let values = entries
            .iter()
            .map(|(key, value)| ((*key).to_string(), (*value).to_string()))
            .collect();
        Self {
            values: Mutex::new(values),
        }
    }

    /// Returns a copy of every stored entry.
    #[must_use]
    pub fn snapshot(&self) -> BTreeMap<String, String> {
        self.values
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl CredentialStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self
            .values
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned())
    }

    fn set_all(&self, entries: &[(&str, Option<&str>)]) -> Result<(), StoreError> {
        let mut values = self.values.lock().unwrap_or_else(PoisonError::into_inner);
        apply_entries(&mut values, entries);
        Ok(())
    }
}
