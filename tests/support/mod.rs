//! Shared fixtures for integration tests.

#![allow(dead_code)]

#[path = "../../src/test_support/socket_guard.rs"]
pub mod socket_guard;

use std::sync::Arc;

use freesound_core::{ClientOptions, CredentialManager, Freesound, MemoryStore};
use serde_json::json;
use wiremock::{MockServer, ResponseTemplate};

pub const TOKEN_PATH: &str = "/apiv2/oauth2/access_token/";

/// API root served by `server`.
pub fn api_base(server: &MockServer) -> String {
    format!("{}/apiv2", server.uri())
}

/// A store holding the pair `A` / `R`, marked authorized.
pub fn authorized_store() -> Arc<MemoryStore> {
    Arc::new(MemoryStore::with_entries(&[
        ("access_token", "A"),
        ("refresh_token", "R"),
        ("is_authorized", "true"),
    ]))
}

/// A configured manager (`id` / `secret`) pointed at `server`.
pub fn manager(server: &MockServer, store: Arc<MemoryStore>) -> CredentialManager {
    let options = ClientOptions::with_base_url(&api_base(server)).unwrap();
    let credentials = CredentialManager::with_options(store, options).unwrap();
    credentials.configure("id", "secret").unwrap();
    credentials
}

/// An authorized client pointed at `server`.
pub fn authorized_client(server: &MockServer) -> Freesound {
    Freesound::new(manager(server, authorized_store()))
}

/// Token endpoint reply carrying `access` / `refresh`.
pub fn token_response(access: &str, refresh: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "access_token": access,
        "refresh_token": refresh,
        "expires_in": 86399,
        "scope": "read write",
        "token_type": "Bearer"
    }))
}
