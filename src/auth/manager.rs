//! The credential state machine.

use std::fmt;
use std::sync::{Arc, OnceLock, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use rand::Rng;
use rand::distributions::Alphanumeric;
use reqwest::Client;
use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, info, instrument, warn};
use url::Url;

use super::credentials::{AuthState, ClientIdentity, Credentials};
use super::prompt::AuthorizationPrompt;
use super::token::{self, Grant};
use crate::dispatch::ClientOptions;
use crate::dispatch::options::build_http_client;
use crate::endpoint::{EndpointTemplate, routes};
use crate::error::ClientError;
use crate::storage::CredentialStore;

/// Length of the random `state` parameter sent with authorization requests.
const STATE_PARAM_LEN: usize = 24;

/// Single authority over the client identity and token pair.
///
/// Cloning is cheap and every clone shares the same state, so the composition
/// root creates one manager and hands clones to the dispatcher and callers.
///
/// Token exchanges (authorization code, refresh, logout) are serialized by one
/// async gate. Concurrent [`refresh`](Self::refresh) calls that arrive while a
/// refresh is pending join it instead of sending their own request.
#[derive(Clone)]
pub struct CredentialManager {
    inner: Arc<Inner>,
}

struct Inner {
    identity: OnceLock<ClientIdentity>,
    store: Arc<dyn CredentialStore>,
    http: Client,
    options: ClientOptions,
    session: RwLock<Session>,
    exchange_gate: Arc<AsyncMutex<()>>,
}

struct Session {
    credentials: Credentials,
    state: AuthState,
    pending_state: Option<String>,
    /// Bumped each time a refresh exchange finishes.
    refresh_generation: u64,
    last_refresh: Option<Result<(), ClientError>>,
}

impl fmt::Debug for CredentialManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialManager")
            .field("base_url", &self.inner.options.base_url.as_str())
            .field("configured", &self.inner.identity.get().is_some())
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl CredentialManager {
    /// Creates a manager with default [`ClientOptions`], loading any stored tokens.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidArgument`] if the HTTP client cannot be built.
    pub fn new(store: Arc<dyn CredentialStore>) -> Result<Self, ClientError> {
        Self::with_options(store, ClientOptions::default())
    }

    /// Creates a manager with explicit connection options.
    ///
    /// Stored tokens are loaded immediately. The manager starts `Authorized`
    /// only when the stored flag is set and an access token is present;
    /// unreadable storage is logged and treated as empty.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidArgument`] if the HTTP client cannot be built.
    pub fn with_options(
        store: Arc<dyn CredentialStore>,
        options: ClientOptions,
    ) -> Result<Self, ClientError> {
        let http = build_http_client(&options)?;
        let credentials = Credentials::load(store.as_ref());
        let state = credentials.resting_state();
        debug!(state = %state, base_url = %options.base_url, "credential manager created");

        Ok(Self {
            inner: Arc::new(Inner {
                identity: OnceLock::new(),
                store,
                http,
                options,
                session: RwLock::new(Session {
                    credentials,
                    state,
                    pending_state: None,
                    refresh_generation: 0,
                    last_refresh: None,
                }),
                exchange_gate: Arc::new(AsyncMutex::new(())),
            }),
        })
    }

    /// Sets the client identity. Must run once before any other operation.
    ///
    /// # Errors
    ///
    /// - [`ClientError::InvalidArgument`] when either value is blank
    /// - [`ClientError::AlreadyConfigured`] on a second call
    pub fn configure(
        &self,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Result<(), ClientError> {
        let identity = ClientIdentity::new(client_id, client_secret)?;
        let client_id = identity.client_id().to_string();
        self.inner
            .identity
            .set(identity)
            .map_err(|_| ClientError::AlreadyConfigured)?;
        info!(client_id = %client_id, "client identity configured");
        Ok(())
    }

    /// Returns true once [`configure`](Self::configure) has succeeded.
    #[must_use]
    pub fn is_configured(&self) -> bool {
        self.inner.identity.get().is_some()
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> AuthState {
        self.read_session().state
    }

    /// Copy of the current token pair.
    #[must_use]
    pub fn credentials(&self) -> Credentials {
        self.read_session().credentials.clone()
    }

    /// The `state` value sent with the last authorization URL, until it is completed.
    #[must_use]
    pub fn pending_state(&self) -> Option<String> {
        self.read_session().pending_state.clone()
    }

    /// `Bearer <token>` for the current access token.
    ///
    /// Returns `None` when unconfigured or not authorized. Never blocks on an
    /// exchange and never refreshes.
    #[must_use]
    pub fn current_auth_header(&self) -> Option<String> {
        if !self.is_configured() {
            return None;
        }
        let session = self.read_session();
        if !session.credentials.authorized {
            return None;
        }
        session
            .credentials
            .access_token
            .as_ref()
            .map(|token| format!("Bearer {token}"))
    }

    /// Builds the URL the user must open to grant access, and moves to
    /// `AuthorizationPending`. No network I/O.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::NotConfigured`] before [`configure`](Self::configure).
    pub fn begin_authorization(&self) -> Result<Url, ClientError> {
        self.issue_authorization_url(routes::AUTHORIZE)
    }

    /// Like [`begin_authorization`](Self::begin_authorization) but signs the
    /// browser session out first, to switch accounts.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::NotConfigured`] before [`configure`](Self::configure).
    pub fn begin_reauthorization(&self) -> Result<Url, ClientError> {
        self.issue_authorization_url(routes::LOGOUT_AND_AUTHORIZE)
    }

    fn issue_authorization_url(&self, route: EndpointTemplate) -> Result<Url, ClientError> {
        let identity = self.identity()?;
        let mut url = route.resolve(&self.inner.options.base_url, &[])?;
        let state = random_state();
        url.query_pairs_mut()
            .append_pair("client_id", identity.client_id())
            .append_pair("response_type", "code")
            .append_pair("state", &state);

        let mut session = self.write_session();
        session.pending_state = Some(state);
        session.state = AuthState::AuthorizationPending;
        info!(route = %route, "authorization requested");
        Ok(url)
    }

    /// Exchanges an authorization code for a token pair.
    ///
    /// On success both tokens and the authorized flag are persisted in one
    /// store write, then published. On any failure nothing is persisted and
    /// the state is left as it was.
    ///
    /// # Errors
    ///
    /// - [`ClientError::NotConfigured`] before [`configure`](Self::configure)
    /// - [`ClientError::InvalidArgument`] for a blank code
    /// - [`ClientError::Transport`], [`ClientError::Api`], or
    ///   [`ClientError::InvalidResponse`] when the exchange fails
    /// - [`ClientError::Storage`] when the pair cannot be persisted
    #[instrument(skip(self, code))]
    pub async fn complete_authorization(&self, code: &str) -> Result<AuthState, ClientError> {
        let identity = self.identity()?.clone();
        let code = code.trim();
        if code.is_empty() {
            return Err(ClientError::invalid_argument(
                "authorization code must not be empty",
            ));
        }

        let _gate = self.inner.exchange_gate.lock().await;
        let pair = token::exchange(
            &self.inner.http,
            &self.inner.options.base_url,
            &identity,
            Grant::AuthorizationCode(code),
        )
        .await
        .inspect_err(|error| warn!(error = %error, "authorization code exchange failed"))?;

        self.commit(Credentials::issued(pair.access_token, pair.refresh_token))?;
        self.write_session().pending_state = None;
        info!("authorization completed");
        Ok(AuthState::Authorized)
    }

    /// Runs the whole authorization flow through `prompt`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Unauthenticated`] when the prompt yields no
    /// code, otherwise the errors of
    /// [`complete_authorization`](Self::complete_authorization).
    pub async fn authorize_with(
        &self,
        prompt: &dyn AuthorizationPrompt,
    ) -> Result<AuthState, ClientError> {
        let url = self.begin_authorization()?;
        let Some(code) = prompt.request_code(&url).await else {
            debug!("authorization prompt returned no code");
            return Err(ClientError::Unauthenticated);
        };
        self.complete_authorization(&code).await
    }

    /// Exchanges the refresh token for a new pair.
    ///
    /// Calls that arrive while another refresh is pending wait for it and
    /// return its outcome without sending a request. The exchange runs on its
    /// own task, so dropping the returned future never abandons it halfway.
    ///
    /// A 400 or 401 from the token endpoint, or another client error carrying
    /// an OAuth rejection code such as `invalid_grant`, means the refresh token
    /// is dead: stored tokens are cleared, the state becomes `Unauthenticated`,
    /// and [`ClientError::RefreshFailed`] is returned. Network failures, 408,
    /// 429 and 5xx responses keep the current tokens.
    ///
    /// # Errors
    ///
    /// - [`ClientError::NotConfigured`] before [`configure`](Self::configure)
    /// - [`ClientError::Unauthenticated`] when no refresh token is held
    /// - [`ClientError::RefreshFailed`] when the grant was rejected
    /// - [`ClientError::Transport`] or [`ClientError::Api`] for transient failures
    #[instrument(skip(self))]
    pub async fn refresh(&self) -> Result<AuthState, ClientError> {
        let identity = self.identity()?.clone();
        let observed = self.read_session().refresh_generation;
        let gate = Arc::clone(&self.inner.exchange_gate).lock_owned().await;

        let refresh_token = {
            let mut session = self.write_session();
            if session.refresh_generation != observed {
                debug!("joined a refresh completed by another caller");
                return match &session.last_refresh {
                    Some(Err(error)) => Err(error.duplicate()),
                    Some(Ok(())) | None => Ok(session.state),
                };
            }
            let Some(refresh_token) = session.credentials.refresh_token.clone() else {
                return Err(ClientError::Unauthenticated);
            };
            session.state = AuthState::Refreshing;
            refresh_token
        };
        info!("refreshing access token");

        let manager = self.clone();
        let exchange = tokio::spawn(async move {
            let _gate = gate;
            manager.run_refresh(&identity, &refresh_token).await
        });
        match exchange.await {
            Ok(result) => result,
            Err(join_error) => {
                let mut session = self.write_session();
                session.state = session.credentials.resting_state();
                Err(ClientError::refresh_failed(format!(
                    "refresh task did not finish: {join_error}"
                )))
            }
        }
    }

    async fn run_refresh(
        &self,
        identity: &ClientIdentity,
        refresh_token: &str,
    ) -> Result<AuthState, ClientError> {
        let exchanged = token::exchange(
            &self.inner.http,
            &self.inner.options.base_url,
            identity,
            Grant::RefreshToken(refresh_token),
        )
        .await;

        let result = match exchanged {
            Ok(pair) => self
                .commit(Credentials::issued(pair.access_token, pair.refresh_token))
                .map(|()| AuthState::Authorized),
            Err(error) if token::is_grant_rejection(&error) => {
                warn!(error = %error, "refresh token rejected; clearing stored credentials");
                Err(self.discard_credentials(&error))
            }
            Err(error) => {
                warn!(error = %error, "token refresh failed; keeping current credentials");
                Err(error)
            }
        };

        let mut session = self.write_session();
        session.state = session.credentials.resting_state();
        session.refresh_generation = session.refresh_generation.wrapping_add(1);
        session.last_refresh = Some(
            result
                .as_ref()
                .map(|_| ())
                .map_err(ClientError::duplicate),
        );
        if result.is_ok() {
            info!("access token refreshed");
        }
        result
    }

    /// Drops a pair whose refresh token the server refused.
    fn discard_credentials(&self, rejection: &ClientError) -> ClientError {
        let reason = match rejection {
            ClientError::Api { status, body, .. } => format!("HTTP {status}: {body}"),
            other => other.to_string(),
        };
        // The server will never accept this pair again, so memory is cleared
        // even if the store cannot be.
        if let Err(store_error) = Credentials::default().persist(self.inner.store.as_ref()) {
            warn!(error = %store_error, "failed to clear stored credentials");
        }
        let mut session = self.write_session();
        session.credentials = Credentials::default();
        session.pending_state = None;
        ClientError::refresh_failed(reason)
    }

    /// Clears every stored key and returns to `Unauthenticated`.
    ///
    /// # Errors
    ///
    /// - [`ClientError::NotConfigured`] before [`configure`](Self::configure)
    /// - [`ClientError::Storage`] when the store cannot be cleared; memory is left untouched
    #[instrument(skip(self))]
    pub async fn logout(&self) -> Result<(), ClientError> {
        self.identity()?;
        let _gate = self.inner.exchange_gate.lock().await;
        self.commit(Credentials::default())?;
        self.write_session().pending_state = None;
        info!("logged out");
        Ok(())
    }

    /// Persists `credentials`, then publishes them.
    fn commit(&self, credentials: Credentials) -> Result<(), ClientError> {
        credentials
            .persist(self.inner.store.as_ref())
            .inspect_err(|error| warn!(error = %error, "failed to persist credentials"))?;
        let mut session = self.write_session();
        session.state = credentials.resting_state();
        session.credentials = credentials;
        Ok(())
    }

    fn identity(&self) -> Result<&ClientIdentity, ClientError> {
        self.inner.identity.get().ok_or(ClientError::NotConfigured)
    }

    pub(crate) fn http(&self) -> &Client {
        &self.inner.http
    }

    pub(crate) fn options(&self) -> &ClientOptions {
        &self.inner.options
    }

    fn read_session(&self) -> RwLockReadGuard<'_, Session> {
        self.inner
            .session
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn write_session(&self) -> RwLockWriteGuard<'_, Session> {
        self.inner
            .session
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

fn random_state() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(STATE_PARAM_LEN)
        .map(char::from)
        .collect()
}
