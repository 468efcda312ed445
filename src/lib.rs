//! Freesound Core Library
//!
//! An authenticated client for the Freesound sound-sharing API.
//!
//! # Architecture
//!
//! - [`auth`] - OAuth2 credential state machine with coalesced refresh
//! - [`storage`] - durable credential stores (memory, encrypted file, keychain)
//! - [`endpoint`] - route templates and parameter encoding
//! - [`dispatch`] - authenticated JSON requests and binary transfers
//! - [`paginate`] - lazy page-by-page iteration of list endpoints
//! - [`api`] - the resource operations (search, sounds, users, packs, ...)
//!
//! The application owns one [`CredentialManager`] and shares clones of it;
//! nothing in this crate holds global credential state.

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod api;
pub mod auth;
pub mod dispatch;
pub mod endpoint;
pub mod error;
pub mod paginate;
pub mod storage;
mod user_agent;

#[cfg(test)]
pub(crate) mod test_support;

// Re-export commonly used types
pub use api::{Freesound, License, PreviewQuality, SoundDescription, TextSearch};
pub use auth::{
    AuthState, AuthorizationPrompt, ClientIdentity, CredentialManager, Credentials,
    retry_once_on_unauthorized,
};
pub use dispatch::{ClientOptions, HttpMethod, RequestDispatcher, RequestSpec};
pub use endpoint::{EncodingError, EndpointTemplate};
pub use error::ClientError;
pub use paginate::{Page, PageRequest, PaginatedQuery};
pub use storage::{CredentialStore, EncryptedFileStore, KeyringStore, MemoryStore, StoreError};
