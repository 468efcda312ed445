//! Error types shared by the credential, dispatch, and transfer layers.
//!
//! Every public operation in this crate reports failure through
//! [`ClientError`], so callers can match one taxonomy regardless of which
//! layer rejected the request.

use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;

use crate::endpoint::EncodingError;
use crate::storage::StoreError;

/// Errors that can occur while authenticating or talking to the API.
#[derive(Debug, Error)]
pub enum ClientError {
    /// An operation ran before [`configure`](crate::CredentialManager::configure).
    #[error("client identity is not configured; call configure(client_id, client_secret) first")]
    NotConfigured,

    /// `configure` was called a second time.
    #[error("client identity is already configured")]
    AlreadyConfigured,

    /// A caller-supplied value is unusable (empty client id, blank code, ...).
    #[error("invalid argument: {reason}")]
    InvalidArgument {
        /// What was wrong with the supplied value.
        reason: String,
    },

    /// No usable credential is held; no request was sent.
    #[error("not authenticated; run the authorization flow first")]
    Unauthenticated,

    /// The server rejected the bearer credential (HTTP 401).
    ///
    /// Callers may `refresh()` and retry the operation once.
    #[error("credential rejected by server (HTTP 401) requesting {url}")]
    Unauthorized {
        /// The URL that rejected the credential.
        url: String,
    },

    /// The refresh token itself is invalid or revoked.
    ///
    /// Stored tokens have been cleared; the full authorization flow must be re-run.
    #[error("token refresh failed: {reason}")]
    RefreshFailed {
        /// Server-provided or locally derived reason.
        reason: String,
    },

    /// Network-level failure (DNS, connection refused, TLS, timeout).
    #[error("transport error requesting {url}: {source}")]
    Transport {
        /// The URL being requested.
        url: String,
        /// The underlying network error, shared with callers that joined the same refresh.
        #[source]
        source: Arc<reqwest::Error>,
    },

    /// Well-formed rejection by the server (non-2xx other than 401).
    #[error("HTTP {status} from {url}: {body}")]
    Api {
        /// The URL that returned an error status.
        url: String,
        /// The HTTP status code.
        status: u16,
        /// Response body, usually a JSON `detail` message.
        body: String,
    },

    /// A route template could not be resolved.
    #[error(transparent)]
    Encoding(#[from] EncodingError),

    /// Local I/O failed during an upload or download.
    #[error("transfer I/O error at {path}: {source}")]
    Transfer {
        /// The local path involved in the transfer.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A 2xx response body was not the JSON shape we expected.
    #[error("invalid response body from {url}: {reason}")]
    InvalidResponse {
        /// The URL that returned the body.
        url: String,
        /// Parse failure or missing field description.
        reason: String,
    },

    /// Credential storage could not be read or written.
    #[error(transparent)]
    Storage(#[from] StoreError),
}

impl ClientError {
    /// Creates a transport error from a reqwest error.
    pub fn transport(url: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Transport {
            url: url.into(),
            source: Arc::new(source),
        }
    }

    /// Creates an API status error.
    pub fn api(url: impl Into<String>, status: u16, body: impl Into<String>) -> Self {
        Self::Api {
            url: url.into(),
            status,
            body: body.into(),
        }
    }

    /// Creates a transfer I/O error.
    pub fn transfer(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Transfer {
            path: path.into(),
            source,
        }
    }

    /// Creates an invalid-response error.
    pub fn invalid_response(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidResponse {
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// Creates a refresh failure.
    pub fn refresh_failed(reason: impl Into<String>) -> Self {
        Self::RefreshFailed {
            reason: reason.into(),
        }
    }

    /// Returns true when the transport failure was a timeout.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Transport { source, .. } if source.is_timeout())
    }

    /// Creates an invalid-argument error.
    pub fn invalid_argument(reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            reason: reason.into(),
        }
    }

    /// Returns a copy of this error for callers that joined a shared refresh.
    ///
    /// Local storage and I/O failures cannot be copied; they are reported to
    /// joiners as [`ClientError::RefreshFailed`] carrying the original message.
    pub(crate) fn duplicate(&self) -> Self {
        match self {
            Self::NotConfigured => Self::NotConfigured,
            Self::AlreadyConfigured => Self::AlreadyConfigured,
            Self::InvalidArgument { reason } => Self::invalid_argument(reason.clone()),
            Self::Unauthenticated => Self::Unauthenticated,
            Self::Unauthorized { url } => Self::Unauthorized { url: url.clone() },
            Self::RefreshFailed { reason } => Self::refresh_failed(reason.clone()),
            Self::Transport { url, source } => Self::Transport {
                url: url.clone(),
                source: Arc::clone(source),
            },
            Self::Api { url, status, body } => Self::api(url.clone(), *status, body.clone()),
            Self::Encoding(error) => Self::Encoding(error.clone()),
            Self::InvalidResponse { url, reason } => {
                Self::invalid_response(url.clone(), reason.clone())
            }
            Self::Transfer { .. } | Self::Storage(_) => Self::refresh_failed(self.to_string()),
        }
    }

    /// Returns true when refreshing and retrying once may succeed.
    #[must_use]
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized { .. })
    }
}

// Like the download errors this grew from, reqwest and io errors are not
// converted with `From`: each variant needs the url or path the source lacks.
