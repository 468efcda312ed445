//! Credential persistence with encrypted-at-rest storage.
//!
//! Credentials are written as one encrypted JSON object to:
//! `~/.config/freesound/credentials.enc` (or `$XDG_CONFIG_HOME/freesound/credentials.enc`).
//! The master key comes from `FREESOUND_MASTER_KEY` or is generated once and
//! kept in the system keychain.

use std::collections::BTreeMap;
use std::env;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use chacha20poly1305::aead::{Aead, KeyInit};
use chacha20poly1305::{Key, XChaCha20Poly1305, XNonce};
use rand::RngCore;
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use super::{CredentialStore, StoreError, apply_entries, keychain};

const CREDENTIALS_FILE_NAME: &str = "credentials.enc";
const KEYRING_SERVICE: &str = "freesound";
const KEYRING_ENTRY_NAME: &str = "credential-master-key-v1";
const MASTER_KEY_ENV: &str = "FREESOUND_MASTER_KEY";
const MAGIC: &[u8; 4] = b"FSC1";
const NONCE_LEN: usize = 24;
const KEY_LEN: usize = 32;

/// File-backed [`CredentialStore`] encrypted with XChaCha20-Poly1305.
pub struct EncryptedFileStore {
    path: PathBuf,
    key_material: String,
    write_lock: Mutex<()>,
}

impl std::fmt::Debug for EncryptedFileStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncryptedFileStore")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

/// Returns the default credential file path (`~/.config/freesound/credentials.enc`).
///
/// # Errors
///
/// Returns [`StoreError::ConfigDirUnavailable`] if no usable config dir is found.
pub fn default_credentials_path() -> Result<PathBuf, StoreError> {
    Ok(default_config_dir()?.join(CREDENTIALS_FILE_NAME))
}

impl EncryptedFileStore {
    /// Opens the store at the default path, loading or creating the master key.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when no config dir exists or the keychain is unavailable
    /// and `FREESOUND_MASTER_KEY` is unset.
    pub fn open_default() -> Result<Self, StoreError> {
        let path = default_credentials_path()?;
        let key_material = load_or_create_key()?;
        Ok(Self::with_key(path, key_material))
    }

    /// Opens a store at `path` encrypted with explicit key material.
    #[must_use]
    pub fn with_key(path: impl Into<PathBuf>, key_material: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            key_material: key_material.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Returns the file backing this store.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load_map(&self) -> Result<BTreeMap<String, String>, StoreError> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let bytes = fs::read(&self.path)?;
        let plaintext = decrypt_bytes(&bytes, &self.key_material)?;
        Ok(serde_json::from_slice(&plaintext)?)
    }

    fn write_map(&self, map: &BTreeMap<String, String>) -> Result<(), StoreError> {
        let plaintext = serde_json::to_vec(map)?;
        let encrypted = encrypt_bytes(&plaintext, &self.key_material)?;
        write_payload_atomically(&self.path, &encrypted)
    }
}

impl CredentialStore for EncryptedFileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.load_map()?.remove(key))
    }

    fn set_all(&self, entries: &[(&str, Option<&str>)]) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut map = match self.load_map() {
            Ok(map) => map,
            Err(error @ (StoreError::Io(_) | StoreError::ConfigDirUnavailable)) => return Err(error),
            Err(error) => {
                warn!(path = %self.path.display(), error = %error, "replacing unreadable credential file");
                BTreeMap::new()
            }
        };
        apply_entries(&mut map, entries);
        self.write_map(&map)?;
        debug!(path = %self.path.display(), keys = entries.len(), "credential file updated");
        Ok(())
    }
}

fn default_config_dir() -> Result<PathBuf, StoreError> {
    resolve_config_dir(
        sanitize_env_path(env::var_os("XDG_CONFIG_HOME")),
        sanitize_env_path(env::var_os("HOME")),
        sanitize_env_path(env::var_os("APPDATA")),
    )
}

fn sanitize_env_path(value: Option<OsString>) -> Option<PathBuf> {
    let value = value?;
    if value.to_string_lossy().trim().is_empty() {
        return None;
    }

    Some(PathBuf::from(value))
}

fn resolve_config_dir(
    xdg_config_home: Option<PathBuf>,
    home: Option<PathBuf>,
    app_data: Option<PathBuf>,
) -> Result<PathBuf, StoreError> {
    if let Some(xdg) = xdg_config_home {
        return Ok(xdg.join("freesound"));
    }
    if let Some(home) = home {
        return Ok(home.join(".config").join("freesound"));
    }
    if let Some(app_data) = app_data {
        return Ok(app_data.join("freesound"));
    }

    Err(StoreError::ConfigDirUnavailable)
}

fn load_or_create_key() -> Result<String, StoreError> {
    if let Some(from_env) = env::var_os(MASTER_KEY_ENV) {
        let key = from_env.to_string_lossy().trim().to_string();
        if !key.is_empty() {
            return Ok(key);
        }
    }

    let entry = keychain::entry(KEYRING_SERVICE, KEYRING_ENTRY_NAME)?;

    match keychain::get_password(&entry) {
        Ok(Some(existing)) if !existing.trim().is_empty() => Ok(existing),
        _ => {
            let generated = generate_key_material();
            keychain::set_password(&entry, &generated)?;
            Ok(generated)
        }
    }
}

fn generate_key_material() -> String {
    let mut bytes = [0_u8; KEY_LEN];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex_encode(&bytes)
}

fn hex_encode(bytes: &[u8]) -> String {
    const HEX: &[u8; 16] = b"0123456789abcdef";
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        out.push(char::from(HEX[usize::from(byte >> 4)]));
        out.push(char::from(HEX[usize::from(byte & 0x0f)]));
    }
    out
}

fn derive_key_bytes(key_material: &str) -> [u8; KEY_LEN] {
    let digest = Sha256::digest(key_material.as_bytes());
    let mut key = [0_u8; KEY_LEN];
    key.copy_from_slice(&digest[..KEY_LEN]);
    key
}

/// Writes to a sibling temp file, then renames over the target.
fn write_payload_atomically(path: &Path, payload: &[u8]) -> Result<(), StoreError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let mut temp_name = path.file_name().map(OsString::from).unwrap_or_default();
    temp_name.push(".tmp");
    let temp_path = path.with_file_name(temp_name);

    fs::write(&temp_path, payload)?;
    set_owner_only_permissions(&temp_path)?;
    if let Err(error) = fs::rename(&temp_path, path) {
        let _ = fs::remove_file(&temp_path);
        return Err(error.into());
    }
    Ok(())
}

#[cfg(unix)]
fn set_owner_only_permissions(path: &Path) -> Result<(), StoreError> {
    use std::os::unix::fs::PermissionsExt;

    let permissions = fs::Permissions::from_mode(0o600);
    fs::set_permissions(path, permissions)?;
    Ok(())
}

#[cfg(not(unix))]
fn set_owner_only_permissions(_path: &Path) -> Result<(), StoreError> {
    Ok(())
}

fn encrypt_bytes(plaintext: &[u8], key_material: &str) -> Result<Vec<u8>, StoreError> {
    let key_bytes = derive_key_bytes(key_material);
    let cipher = XChaCha20Poly1305::new(Key::from_slice(&key_bytes));

    let mut nonce = [0_u8; NONCE_LEN];
    rand::thread_rng().fill_bytes(&mut nonce);
    let nonce_ref = XNonce::from_slice(&nonce);

    let ciphertext = cipher
        .encrypt(nonce_ref, plaintext)
        .map_err(|_| StoreError::EncryptionFailed)?;

    let mut output = Vec::with_capacity(MAGIC.len() + NONCE_LEN + ciphertext.len());
    output.extend_from_slice(MAGIC);
    output.extend_from_slice(&nonce);
    output.extend_from_slice(&ciphertext);
    Ok(output)
}

fn decrypt_bytes(payload: &[u8], key_material: &str) -> Result<Vec<u8>, StoreError> {
    if payload.len() < MAGIC.len() + NONCE_LEN || &payload[..MAGIC.len()] != MAGIC {
        return Err(StoreError::InvalidPayload);
    }

    let key_bytes = derive_key_bytes(key_material);
    let cipher = XChaCha20Poly1305::new(Key::from_slice(&key_bytes));
    let nonce_start = MAGIC.len();
    let nonce_end = nonce_start + NONCE_LEN;
    let nonce = XNonce::from_slice(&payload[nonce_start..nonce_end]);
    let ciphertext = &payload[nonce_end..];

    cipher
        .decrypt(nonce, ciphertext)
        .map_err(|_| StoreError::DecryptionFailed)
}
