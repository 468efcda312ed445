//! Connection options and shared HTTP client construction.
//!
//! One `reqwest::Client` is built per [`CredentialManager`](crate::CredentialManager)
//! and reused by the token exchange, the request dispatcher, and transfers so
//! they share a connection pool.

use std::panic::{AssertUnwindSafe, catch_unwind, set_hook, take_hook};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use reqwest::{Client, ClientBuilder, Proxy};
use tracing::warn;
use url::Url;

use crate::endpoint::routes::DEFAULT_BASE_URL;
use crate::error::ClientError;
use crate::user_agent;

/// Default TCP connect timeout.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default end-to-end timeout for JSON requests.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Default idle timeout between body chunks during transfers.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(300);

/// Connection settings for the API client.
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// API root; routes are appended to it.
    pub base_url: Url,
    /// TCP connect timeout.
    pub connect_timeout: Duration,
    /// Whole-request timeout for JSON calls. Transfers are bounded by `read_timeout` instead.
    pub request_timeout: Duration,
    /// Maximum idle time between body chunks.
    pub read_timeout: Duration,
    /// User-Agent header value.
    pub user_agent: String,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            read_timeout: DEFAULT_READ_TIMEOUT,
            user_agent: user_agent::default_user_agent(),
        }
    }
}

impl ClientOptions {
    /// Returns default options pointed at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidArgument`] when `base_url` is not an absolute http(s) URL.
    pub fn with_base_url(base_url: &str) -> Result<Self, ClientError> {
        let parsed = Url::parse(base_url)
            .map_err(|e| ClientError::invalid_argument(format!("base url '{base_url}': {e}")))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ClientError::invalid_argument(format!(
                "base url '{base_url}' must use http or https"
            )));
        }
        Ok(Self {
            base_url: parsed,
            ..Self::default()
        })
    }
}

fn default_base_url() -> Url {
    // The constant is a literal https URL; parsing cannot fail at runtime.
    Url::parse(DEFAULT_BASE_URL).unwrap_or_else(|_| unreachable!("DEFAULT_BASE_URL is valid"))
}

/// Builds the shared client.
///
/// Some platforms panic while reading system proxy settings; in that case the
/// build is retried with proxies taken only from the environment.
pub(crate) fn build_http_client(options: &ClientOptions) -> Result<Client, ClientError> {
    match try_build(options, false) {
        Ok(client) => Ok(client),
        Err(BuildFailure::Panic) => {
            warn!("HTTP client builder panicked loading system proxy settings; using env proxies");
            match try_build(options, true) {
                Ok(client) => Ok(client),
                Err(BuildFailure::Build(error)) => Err(build_error(&error)),
                Err(BuildFailure::Panic) => Err(ClientError::invalid_argument(
                    "HTTP client builder panicked while applying env proxy fallback",
                )),
            }
        }
        Err(BuildFailure::Build(error)) => Err(build_error(&error)),
    }
}

fn build_error(error: &reqwest::Error) -> ClientError {
    ClientError::invalid_argument(format!("failed to build HTTP client: {error}"))
}

enum BuildFailure {
    Panic,
    Build(reqwest::Error),
}

// catch_unwind does not silence the panic hook; swap it out while building.
static BUILD_PANIC_HOOK_LOCK: Mutex<()> = Mutex::new(());

fn try_build(options: &ClientOptions, env_proxies_only: bool) -> Result<Client, BuildFailure> {
    let _hook_guard = BUILD_PANIC_HOOK_LOCK
        .lock()
        .unwrap_or_else(PoisonError::into_inner);
    let previous_hook = take_hook();
    set_hook(Box::new(|_| {}));
    let outcome = catch_unwind(AssertUnwindSafe(|| {
        let mut builder = base_builder(options);
        if env_proxies_only {
            builder = apply_env_proxies(builder.no_proxy());
        }
        builder.build()
    }));
    set_hook(previous_hook);

    match outcome {
        Ok(Ok(client)) => Ok(client),
        Ok(Err(error)) => Err(BuildFailure::Build(error)),
        Err(_) => Err(BuildFailure::Panic),
    }
}

fn base_builder(options: &ClientOptions) -> ClientBuilder {
    Client::builder()
        .connect_timeout(options.connect_timeout)
        .read_timeout(options.read_timeout)
        .gzip(true)
        .user_agent(options.user_agent.clone())
}

fn apply_env_proxies(mut builder: ClientBuilder) -> ClientBuilder {
    for (scheme, names) in [
        ("https", ["HTTPS_PROXY", "https_proxy", "ALL_PROXY", "all_proxy"]),
        ("http", ["HTTP_PROXY", "http_proxy", "ALL_PROXY", "all_proxy"]),
    ] {
        let Some(value) = names.iter().find_map(|name| {
            std::env::var(name)
                .ok()
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        }) else {
            continue;
        };
        let proxy = if scheme == "https" {
            Proxy::https(&value)
        } else {
            Proxy::http(&value)
        };
        if let Ok(proxy) = proxy {
            builder = builder.proxy(proxy);
        }
    }
    builder
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options_point_at_public_api() {
        let options = ClientOptions::default();
        assert_eq!(options.base_url.as_str(), "https://freesound.org/apiv2");
        assert_eq!(options.connect_timeout, Duration::from_secs(30));
        assert_eq!(options.request_timeout, Duration::from_secs(60));
    }

    #[test]
    fn test_with_base_url_rejects_non_http_scheme() {
        let result = ClientOptions::with_base_url("ftp://freesound.org/apiv2");
        assert!(matches!(result, Err(ClientError::InvalidArgument { .. })));
    }

    #[test]
    fn test_with_base_url_rejects_garbage() {
        assert!(ClientOptions::with_base_url("not a url").is_err());
    }

    #[test]
    fn test_build_http_client_with_defaults() {
        assert!(build_http_client(&ClientOptions::default()).is_ok());
    }
}
