//! Client identity, token pair, and lifecycle state.

use std::fmt;

use tracing::warn;

use crate::error::ClientError;
use crate::storage::CredentialStore;

/// Store key for the access token.
pub(crate) const ACCESS_TOKEN_KEY: &str = "access_token";
/// Store key for the refresh token.
pub(crate) const REFRESH_TOKEN_KEY: &str = "refresh_token";
/// Store key for the authorized flag (`"true"` when set).
pub(crate) const AUTHORIZED_KEY: &str = "is_authorized";

/// The registered application's OAuth2 client credentials.
#[derive(Clone, PartialEq, Eq)]
pub struct ClientIdentity {
    client_id: String,
    client_secret: String,
}

impl ClientIdentity {
    /// Validates and wraps a client id and secret.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidArgument`] when either value is blank.
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Result<Self, ClientError> {
        let client_id = client_id.into().trim().to_string();
        let client_secret = client_secret.into().trim().to_string();
        if client_id.is_empty() {
            return Err(ClientError::invalid_argument("client_id must not be empty"));
        }
        if client_secret.is_empty() {
            return Err(ClientError::invalid_argument(
                "client_secret must not be empty",
            ));
        }
        Ok(Self {
            client_id,
            client_secret,
        })
    }

    /// The public client id.
    #[must_use]
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub(crate) fn client_secret(&self) -> &str {
        &self.client_secret
    }
}

impl fmt::Debug for ClientIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientIdentity")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}

/// Lifecycle state of the credential manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState {
    /// No usable token pair.
    Unauthenticated,
    /// An authorization URL was issued; waiting for the code.
    AuthorizationPending,
    /// A token pair is held and believed valid.
    Authorized,
    /// A refresh exchange is in flight.
    Refreshing,
}

impl fmt::Display for AuthState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Unauthenticated => "unauthenticated",
            Self::AuthorizationPending => "authorization pending",
            Self::Authorized => "authorized",
            Self::Refreshing => "refreshing",
        };
        f.write_str(label)
    }
}

/// The current token pair.
///
/// `authorized` implies `access_token` is present.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    /// Bearer token for API calls.
    pub access_token: Option<String>,
    /// Token used to obtain a new access token.
    pub refresh_token: Option<String>,
    /// Whether the pair came from a completed authorization.
    pub authorized: bool,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mask = |token: &Option<String>| token.as_ref().map(|_| "<redacted>");
        f.debug_struct("Credentials")
            .field("access_token", &mask(&self.access_token))
            .field("refresh_token", &mask(&self.refresh_token))
            .field("authorized", &self.authorized)
            .finish()
    }
}

impl Credentials {
    /// A freshly issued pair.
    pub(crate) fn issued(access_token: String, refresh_token: String) -> Self {
        Self {
            access_token: Some(access_token),
            refresh_token: Some(refresh_token),
            authorized: true,
        }
    }

    /// Reads the persisted pair.
    ///
    /// Read failures are logged and treated as "nothing stored" so a corrupt
    /// store degrades to the unauthenticated state instead of blocking startup.
    pub(crate) fn load(store: &dyn CredentialStore) -> Self {
        let read = |key: &str| match store.get(key) {
            Ok(value) => value.filter(|value| !value.is_empty()),
            Err(error) => {
                warn!(key, error = %error, "failed to read stored credential; ignoring");
                None
            }
        };
        let access_token = read(ACCESS_TOKEN_KEY);
        let refresh_token = read(REFRESH_TOKEN_KEY);
        let authorized = read(AUTHORIZED_KEY).as_deref() == Some("true") && access_token.is_some();
        Self {
            access_token,
            refresh_token,
            authorized,
        }
    }

    /// Writes every field as one store update; absent fields are removed.
    pub(crate) fn persist(&self, store: &dyn CredentialStore) -> Result<(), ClientError> {
        store.set_all(&[
            (ACCESS_TOKEN_KEY, self.access_token.as_deref()),
            (REFRESH_TOKEN_KEY, self.refresh_token.as_deref()),
            (AUTHORIZED_KEY, self.authorized.then_some("true")),
        ])?;
        Ok(())
    }

    /// The state a manager holding these credentials rests in.
    pub(crate) fn resting_state(&self) -> AuthState {
        if self.authorized {
            AuthState::Authorized
        } else {
            AuthState::Unauthenticated
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::storage::{MemoryStore, StoreError};

    struct BrokenStore;

    impl CredentialStore for BrokenStore {
        fn get(&self, _key: &str) -> Result<Option<String>, StoreError> {
            Err(StoreError::InvalidPayload)
        }

        fn set_all(&self, _entries: &[(&str, Option<&str>)]) -> Result<(), StoreError> {
            Err(StoreError::InvalidPayload)
        }
    }

    #[test]
    fn test_identity_rejects_blank_values() {
        assert!(matches!(
            ClientIdentity::new("  ", "secret"),
            Err(ClientError::InvalidArgument { .. })
        ));
        assert!(matches!(
            ClientIdentity::new("id", ""),
            Err(ClientError::InvalidArgument { .. })
        ));
    }

    #[test]
    fn test_identity_debug_hides_secret() {
        let identity = ClientIdentity::new("my-id", "my-secret").unwrap();
        let debug = format!("{identity:?}");
        assert!(debug.contains("my-id"));
        assert!(!debug.contains("my-secret"));
    }

    #[test]
    fn test_credentials_debug_hides_tokens() {
        let credentials = Credentials::issued("AAA".to_string(), "RRR".to_string());
        let debug = format!("{credentials:?}");
        assert!(!debug.contains("AAA"));
        assert!(!debug.contains("RRR"));
    }

    #[test]
    fn test_load_requires_flag_and_access_token() {
        let store = MemoryStore::with_entries(&[("access_token", "A"), ("refresh_token", "R")]);
        let credentials = Credentials::load(&store);
        assert!(!credentials.authorized);
        assert_eq!(credentials.resting_state(), AuthState::Unauthenticated);

        let store = MemoryStore::with_entries(&[("refresh_token", "R"), ("is_authorized", "true")]);
        assert!(!Credentials::load(&store).authorized);

        let store = MemoryStore::with_entries(&[
            ("access_token", "A"),
            ("refresh_token", "R"),
            ("is_authorized", "true"),
        ]);
        let credentials = Credentials::load(&store);
        assert!(credentials.authorized);
        assert_eq!(credentials.access_token.as_deref(), Some("A"));
        assert_eq!(credentials.resting_state(), AuthState::Authorized);
    }

    #[test]
    fn test_load_from_failing_store_is_unauthenticated() {
        let credentials = Credentials::load(&BrokenStore);
        assert_eq!(credentials, Credentials::default());
    }

    #[test]
    fn test_persist_writes_and_clears_all_keys() {
        let store = MemoryStore::new();
        Credentials::issued("A".to_string(), "R".to_string())
            .persist(&store)
            .unwrap();
        let snapshot = store.snapshot();
        assert_eq!(snapshot["access_token"], "A");
        assert_eq!(snapshot["refresh_token"], "R");
        assert_eq!(snapshot["is_authorized"], "true");

        Credentials::default().persist(&store).unwrap();
        assert!(store.snapshot().is_empty());
    }

    #[test]
    fn test_auth_state_display() {
        assert_eq!(AuthState::AuthorizationPending.to_string(), "authorization pending");
    }
}
