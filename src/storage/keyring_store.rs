//! Credential store backed by one system keychain entry.

use std::collections::BTreeMap;
use std::sync::{Mutex, PoisonError};

use tracing::warn;

use super::{CredentialStore, StoreError, apply_entries, keychain};

const DEFAULT_SERVICE: &str = "freesound";
const DEFAULT_ACCOUNT: &str = "oauth2-credentials";

/// Keeps every key as one JSON object inside a single keychain secret.
///
/// One entry per key would let the access and refresh tokens drift apart if a
/// write failed halfway, so the whole map is rewritten on each update.
pub struct KeyringStore {
    entry: keyring::Entry,
    write_lock: Mutex<()>,
}

impl std::fmt::Debug for KeyringStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyringStore").finish_non_exhaustive()
    }
}

impl KeyringStore {
    /// Opens the default `freesound` / `oauth2-credentials` entry.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::KeychainUnavailable`] when the platform keychain cannot be reached.
    pub fn open_default() -> Result<Self, StoreError> {
        Self::new(DEFAULT_SERVICE, DEFAULT_ACCOUNT)
    }

    /// Opens the entry identified by `service` and `account`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::KeychainUnavailable`] when the platform keychain cannot be reached.
    pub fn new(service: &str, account: &str) -> Result<Self, StoreError> {
        Ok(Self {
            entry: keychain::entry(service, account)?,
            write_lock: Mutex::new(()),
        })
    }

    fn load_map(&self) -> Result<BTreeMap<String, String>, StoreError> {
        match keychain::get_password(&self.entry)? {
            Some(secret) => {
                serde_json::from_str(&secret).map_err(|_| StoreError::InvalidPayload)
            }
            None => Ok(BTreeMap::new()),
        }
    }
}

impl CredentialStore for KeyringStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.load_map()?.remove(key))
    }

    fn set_all(&self, entries: &[(&str, Option<&str>)]) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut map = match self.load_map() {
            Ok(map) => map,
            Err(StoreError::InvalidPayload) => {
                warn!("replacing unreadable keychain credential entry");
                BTreeMap::new()
            }
            Err(error) => return Err(error),
        };
        apply_entries(&mut map, entries);

        if map.is_empty() {
            keychain::delete(&self.entry)
        } else {
            let secret = serde_json::to_string(&map)?;
            keychain::set_password(&self.entry, &secret)
        }
    }
}
