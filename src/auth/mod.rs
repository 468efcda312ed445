//! OAuth2 credential lifecycle.
//!
//! [`CredentialManager`] owns the client identity and the token pair, drives
//! the authorization-code flow, and coalesces concurrent refreshes into one
//! token exchange. Every token mutation is persisted through a
//! [`CredentialStore`](crate::storage::CredentialStore) before it becomes
//! visible in memory.

mod credentials;
mod manager;
mod prompt;
mod token;

pub use credentials::{AuthState, ClientIdentity, Credentials};
pub use manager::CredentialManager;
pub use prompt::{AuthorizationPrompt, retry_once_on_unauthorized};
