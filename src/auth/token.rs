//! Token endpoint exchange.

use std::fmt;

use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, instrument};
use url::Url;

use super::credentials::ClientIdentity;
use crate::endpoint::routes;
use crate::error::ClientError;

/// What is being exchanged for a token pair.
pub(crate) enum Grant<'a> {
    AuthorizationCode(&'a str),
    RefreshToken(&'a str),
}

impl Grant<'_> {
    fn grant_type(&self) -> &'static str {
        match self {
            Self::AuthorizationCode(_) => "authorization_code",
            Self::RefreshToken(_) => "refresh_token",
        }
    }

    fn field(&self) -> (&'static str, &str) {
        match self {
            Self::AuthorizationCode(code) => ("code", code),
            Self::RefreshToken(token) => ("refresh_token", token),
        }
    }
}

impl fmt::Debug for Grant<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.grant_type())
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
}

/// A newly issued token pair.
pub(crate) struct TokenPair {
    pub(crate) access_token: String,
    pub(crate) refresh_token: String,
}

/// Posts `grant` to the token endpoint.
///
/// Any non-2xx status comes back as [`ClientError::Api`]; callers decide
/// whether a status means the grant was rejected.
#[instrument(skip(http, base_url, identity), fields(grant = ?grant))]
pub(crate) async fn exchange(
    http: &Client,
    base_url: &Url,
    identity: &ClientIdentity,
    grant: Grant<'_>,
) -> Result<TokenPair, ClientError> {
    let url = routes::ACCESS_TOKEN.resolve(base_url, &[])?;
    let (field, value) = grant.field();
    let form = [
        ("client_id", identity.client_id()),
        ("client_secret", identity.client_secret()),
        ("grant_type", grant.grant_type()),
        (field, value),
    ];

    debug!(url = %url, "requesting token");
    let response = http
        .post(url.clone())
        .form(&form)
        .send()
        .await
        .map_err(|e| ClientError::transport(url.as_str(), e))?;

    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| ClientError::transport(url.as_str(), e))?;
    if !status.is_success() {
        return Err(ClientError::api(url.as_str(), status.as_u16(), body));
    }

    let parsed: TokenResponse = serde_json::from_str(&body)
        .map_err(|e| ClientError::invalid_response(url.as_str(), e.to_string()))?;
    if parsed.access_token.is_empty() || parsed.refresh_token.is_empty() {
        return Err(ClientError::invalid_response(
            url.as_str(),
            "token response carried an empty token",
        ));
    }
    debug!(status = status.as_u16(), "token issued");
    Ok(TokenPair {
        access_token: parsed.access_token,
        refresh_token: parsed.refresh_token,
    })
}

/// OAuth `error` codes meaning the client or the grant will never be accepted.
const REJECTED_GRANT_ERRORS: [&str; 3] = ["invalid_grant", "invalid_client", "unauthorized_client"];

/// True when the token endpoint refused the grant itself, as opposed to
/// failing for a reason that may clear up on retry.
///
/// 400 and 401 are rejections. Other client errors count only when the body
/// carries one of the OAuth rejection codes, so 408 and 429 stay transient.
pub(crate) fn is_grant_rejection(error: &ClientError) -> bool {
    let ClientError::Api { status, body, .. } = error else {
        return false;
    };
    match *status {
        400 | 401 => true,
        408 | 429 => false,
        402..=499 => oauth_error_code(body)
            .is_some_and(|code| REJECTED_GRANT_ERRORS.contains(&code.as_str())),
        _ => false,
    }
}

fn oauth_error_code(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    value.get("error")?.as_str().map(str::to_owned)
}
