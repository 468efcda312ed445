//! Panic-safe wrappers around the system keychain.
//!
//! Some sandboxed environments panic inside the platform keychain bindings;
//! every call is wrapped so that surfaces as [`StoreError::KeychainUnavailable`].

use std::panic::{AssertUnwindSafe, catch_unwind};

use super::StoreError;

pub(crate) fn entry(service: &str, account: &str) -> Result<keyring::Entry, StoreError> {
    catch_unwind(|| keyring::Entry::new(service, account))
        .map_err(|_| StoreError::KeychainUnavailable)?
        .map_err(|_| StoreError::KeychainUnavailable)
}

/// Reads the secret; `Ok(None)` when the entry does not exist.
pub(crate) fn get_password(entry: &keyring::Entry) -> Result<Option<String>, StoreError> {
    match catch_unwind(AssertUnwindSafe(|| entry.get_password()))
        .map_err(|_| StoreError::KeychainUnavailable)?
    {
        Ok(secret) => Ok(Some(secret)),
        Err(keyring::Error::NoEntry) => Ok(None),
        Err(_) => Err(StoreError::KeychainUnavailable),
    }
}

pub(crate) fn set_password(entry: &keyring::Entry, password: &str) -> Result<(), StoreError> {
    catch_unwind(AssertUnwindSafe(|| entry.set_password(password)))
        .map_err(|_| StoreError::KeychainUnavailable)?
        .map_err(|_| StoreError::KeychainUnavailable)
}

/// Deletes the entry; a missing entry is not an error.
pub(crate) fn delete(entry: &keyring::Entry) -> Result<(), StoreError> {
    match catch_unwind(AssertUnwindSafe(|| entry.delete_credential()))
        .map_err(|_| StoreError::KeychainUnavailable)?
    {
        Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
        Err(_) => Err(StoreError::KeychainUnavailable),
    }
}
