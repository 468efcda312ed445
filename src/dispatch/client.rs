//! JSON request dispatch.

use std::time::Duration;

use reqwest::header::{AUTHORIZATION, HeaderValue};
use reqwest::{Response, StatusCode};
use serde_json::Value;
use tracing::{debug, instrument};
use url::Url;

use super::request::{HttpMethod, RequestSpec};
use crate::auth::CredentialManager;
use crate::error::ClientError;

/// Executes requests with the shared credential attached.
///
/// Cheap to clone; every clone uses the manager's connection pool.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use freesound_core::{CredentialManager, MemoryStore, RequestDispatcher, RequestSpec};
/// use freesound_core::endpoint::routes;
///
/// # async fn example() -> Result<(), freesound_core::ClientError> {
/// let credentials = CredentialManager::new(Arc::new(MemoryStore::new()))?;
/// credentials.configure("client-id", "client-secret")?;
/// let dispatcher = RequestDispatcher::new(credentials);
/// let me = dispatcher.dispatch(&RequestSpec::get(routes::ME)).await?;
/// println!("{me}");
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct RequestDispatcher {
    credentials: CredentialManager,
}

impl RequestDispatcher {
    /// Creates a dispatcher that authenticates through `credentials`.
    #[must_use]
    pub fn new(credentials: CredentialManager) -> Self {
        Self { credentials }
    }

    /// The credential manager this dispatcher reads headers from.
    #[must_use]
    pub fn credentials(&self) -> &CredentialManager {
        &self.credentials
    }

    /// The API root every route is resolved against.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.credentials.options().base_url
    }

    /// Sends `spec` and decodes the JSON response body.
    ///
    /// An empty 2xx body decodes to [`Value::Null`].
    ///
    /// # Errors
    ///
    /// - [`ClientError::NotConfigured`] / [`ClientError::Unauthenticated`]
    ///   before any network I/O when no credential is available
    /// - [`ClientError::Encoding`] when the route cannot be resolved
    /// - [`ClientError::Transport`] on connection failure or timeout
    /// - [`ClientError::Unauthorized`] on HTTP 401
    /// - [`ClientError::Api`] on any other non-2xx status
    /// - [`ClientError::InvalidResponse`] when the body is not JSON
    #[instrument(skip(self, spec), fields(method = %spec.method(), route = %spec.route()))]
    pub async fn dispatch(&self, spec: &RequestSpec) -> Result<Value, ClientError> {
        let request_timeout = self.credentials.options().request_timeout;
        let response = self.send(spec, Some(request_timeout)).await?;
        decode_json(response).await
    }

    /// Sends `spec` and returns the checked response.
    ///
    /// `default_timeout` applies when the spec carries no override; `None`
    /// leaves only the client's connect and read timeouts in force.
    pub(super) async fn send(
        &self,
        spec: &RequestSpec,
        default_timeout: Option<Duration>,
    ) -> Result<Response, ClientError> {
        let authorization = self.authorization()?;
        let url = spec.resolve(self.base_url())?;
        let params = spec.present_params();
        debug!(url = %url, params = params.len(), "sending request");

        let http = self.credentials.http();
        let mut request = match spec.method() {
            HttpMethod::Get => http.get(url.clone()).query(&params),
            HttpMethod::Post => http.post(url.clone()).form(&params),
        }
        .header(AUTHORIZATION, authorization);
        if let Some(timeout) = spec.timeout_override().or(default_timeout) {
            request = request.timeout(timeout);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ClientError::transport(url.as_str(), e))?;
        check_status(response, &url).await
    }

    /// Returns the bearer header, failing before any I/O when there is none.
    pub(super) fn authorization(&self) -> Result<HeaderValue, ClientError> {
        if !self.credentials.is_configured() {
            return Err(ClientError::NotConfigured);
        }
        let header = self
            .credentials
            .current_auth_header()
            .ok_or(ClientError::Unauthenticated)?;
        let mut value = HeaderValue::from_str(&header).map_err(|_| {
            ClientError::invalid_argument("stored access token is not a valid header value")
        })?;
        value.set_sensitive(true);
        Ok(value)
    }
}

/// Maps non-2xx statuses onto the error taxonomy.
pub(super) async fn check_status(response: Response, url: &Url) -> Result<Response, ClientError> {
    let status = response.status();
    debug!(status = status.as_u16(), "response received");
    if status.is_success() {
        return Ok(response);
    }
    if status == StatusCode::UNAUTHORIZED {
        return Err(ClientError::Unauthorized {
            url: url.to_string(),
        });
    }
    let body = match response.text().await {
        Ok(body) => body,
        Err(error) => {
            debug!(error = %error, "failed to read error response body");
            format!("<unreadable response body: {error}>")
        }
    };
    Err(ClientError::api(url.as_str(), status.as_u16(), body))
}

/// Reads the body and parses it as JSON.
pub(super) async fn decode_json(response: Response) -> Result<Value, ClientError> {
    let url = response.url().to_string();
    let body = response
        .text()
        .await
        .map_err(|e| ClientError::transport(url.as_str(), e))?;
    if body.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(&body).map_err(|e| ClientError::invalid_response(url, e.to_string()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use wiremock::matchers::{body_string, header, method, path, query_param};
    use wiremock::{Mock, ResponseTemplate};

    use super::*;
    use crate::dispatch::ClientOptions;
    use crate::endpoint::routes;
    use crate::storage::MemoryStore;
    use crate::test_support::socket_guard::start_mock_server_or_skip;

    fn authorized_dispatcher(base_url: &str) -> RequestDispatcher {
        let store = MemoryStore::with_entries(&[
            ("access_token", "A"),
            ("refresh_token", "R"),
            ("is_authorized", "true"),
        ]);
        let options = ClientOptions::with_base_url(base_url).unwrap();
        let credentials = CredentialManager::with_options(Arc::new(store), options).unwrap();
        credentials.configure("id", "secret").unwrap();
        RequestDispatcher::new(credentials)
    }

    #[tokio::test]
    async fn test_dispatch_before_configure_is_not_configured() {
        let credentials = CredentialManager::new(Arc::new(MemoryStore::new())).unwrap();
        let dispatcher = RequestDispatcher::new(credentials);
        let result = dispatcher.dispatch(&RequestSpec::get(routes::ME)).await;
        assert!(matches!(result, Err(ClientError::NotConfigured)));
    }

    #[tokio::test]
    async fn test_dispatch_without_token_is_unauthenticated() {
        let credentials = CredentialManager::new(Arc::new(MemoryStore::new())).unwrap();
        credentials.configure("id", "secret").unwrap();
        let dispatcher = RequestDispatcher::new(credentials);
        let result = dispatcher.dispatch(&RequestSpec::get(routes::ME)).await;
        assert!(matches!(result, Err(ClientError::Unauthenticated)));
    }

    #[test]
    fn test_authorization_header_is_sensitive() {
        let store = MemoryStore::with_entries(&[("access_token", "A"), ("is_authorized", "true")]);
        let credentials = CredentialManager::new(Arc::new(store)).unwrap();
        credentials.configure("id", "secret").unwrap();
        let value = RequestDispatcher::new(credentials).authorization().unwrap();
        assert!(value.is_sensitive());
        assert_eq!(value.to_str().unwrap(), "Bearer A");
    }

    #[test]
    fn test_base_url_comes_from_options() {
        let credentials = CredentialManager::new(Arc::new(MemoryStore::new())).unwrap();
        let dispatcher = RequestDispatcher::new(credentials);
        assert_eq!(dispatcher.base_url().as_str(), "https://freesound.org/apiv2");
    }

    #[tokio::test]
    async fn test_dispatch_get_sends_bearer_and_present_params() {
        let Some(server) = start_mock_server_or_skip().await else {
            return;
        };
        Mock::given(method("GET"))
            .and(path("/apiv2/search/text/"))
            .and(header("authorization", "Bearer A"))
            .and(query_param("query", "abc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"ok": true})))
            .expect(1)
            .mount(&server)
            .await;

        let dispatcher = authorized_dispatcher(&format!("{}/apiv2", server.uri()));
        let spec = RequestSpec::get(routes::TEXT_SEARCH)
            .optional_param("filter", None::<&str>)
            .param("query", "abc");
        let value = dispatcher.dispatch(&spec).await.unwrap();
        assert_eq!(value["ok"], true);

        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests[0].url.query(), Some("query=abc"));
    }

    #[tokio::test]
    async fn test_dispatch_post_sends_form_body() {
        let Some(server) = start_mock_server_or_skip().await else {
            return;
        };
        Mock::given(method("POST"))
            .and(path("/apiv2/sounds/7/comment/"))
            .and(body_string("comment=nice+sound"))
            .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({"detail": "ok"})))
            .expect(1)
            .mount(&server)
            .await;

        let dispatcher = authorized_dispatcher(&format!("{}/apiv2", server.uri()));
        let spec = RequestSpec::post(routes::COMMENT)
            .bind("sound_id", 7)
            .param("comment", "nice sound");
        dispatcher.dispatch(&spec).await.unwrap();
    }

    #[tokio::test]
    async fn test_dispatch_maps_statuses() {
        let Some(server) = start_mock_server_or_skip().await else {
            return;
        };
        Mock::given(path("/apiv2/me/"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;
        Mock::given(path("/apiv2/sounds/1/"))
            .respond_with(ResponseTemplate::new(404).set_body_string(r#"{"detail":"Not found."}"#))
            .mount(&server)
            .await;
        Mock::given(path("/apiv2/sounds/2/"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
            .mount(&server)
            .await;

        let dispatcher = authorized_dispatcher(&format!("{}/apiv2", server.uri()));
        let unauthorized = dispatcher.dispatch(&RequestSpec::get(routes::ME)).await;
        assert!(matches!(unauthorized, Err(ClientError::Unauthorized { .. })));

        let missing = dispatcher
            .dispatch(&RequestSpec::get(routes::SOUND).bind("sound_id", 1))
            .await;
        match missing {
            Err(ClientError::Api { status, body, .. }) => {
                assert_eq!(status, 404);
                assert!(body.contains("Not found"));
            }
            other => panic!("Expected Api error, got: {other:?}"),
        }

        let garbled = dispatcher
            .dispatch(&RequestSpec::get(routes::SOUND).bind("sound_id", 2))
            .await;
        assert!(matches!(garbled, Err(ClientError::InvalidResponse { .. })));
    }

    #[tokio::test]
    async fn test_dispatch_timeout_is_transport_error() {
        let Some(server) = start_mock_server_or_skip().await else {
            return;
        };
        Mock::given(path("/apiv2/me/"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
            .mount(&server)
            .await;

        let dispatcher = authorized_dispatcher(&format!("{}/apiv2", server.uri()));
        let spec = RequestSpec::get(routes::ME).timeout(Duration::from_millis(50));
        let error = dispatcher.dispatch(&spec).await.unwrap_err();
        assert!(error.is_timeout(), "Expected timeout, got: {error:?}");
        assert_eq!(
            dispatcher.credentials().current_auth_header().as_deref(),
            Some("Bearer A")
        );
    }

    #[tokio::test]
    async fn test_truncated_error_body_is_reported_in_api_error() {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};
        use tokio::net::TcpListener;

        // Only used to skip where local sockets are unavailable.
        let Some(_server) = start_mock_server_or_skip().await else {
            return;
        };
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = [0_u8; 1024];
            let _ = socket.read(&mut request).await;
            socket
                .write_all(b"HTTP/1.1 500 Internal Server Error\r\nContent-Length: 100\r\n\r\n{\"detail\"")
                .await
                .unwrap();
        });

        let dispatcher = authorized_dispatcher(&format!("http://{address}/apiv2"));
        let result = dispatcher.dispatch(&RequestSpec::get(routes::ME)).await;
        match result {
            Err(ClientError::Api { status, body, .. }) => {
                assert_eq!(status, 500);
                assert!(
                    body.starts_with("<unreadable response body"),
                    "Unexpected body: {body}"
                );
            }
            other => panic!("Expected Api error, got: {other:?}"),
        }
    }
}
