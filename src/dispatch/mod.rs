//! Authenticated request execution.
//!
//! [`RequestDispatcher`] turns a [`RequestSpec`] into one HTTP request with
//! the current bearer credential attached and maps the outcome onto
//! [`ClientError`](crate::ClientError). It never refreshes or retries on its
//! own; see [`retry_once_on_unauthorized`](crate::retry_once_on_unauthorized).

mod client;
pub(crate) mod options;
mod request;
mod transfer;

pub use client::RequestDispatcher;
pub use options::{
    ClientOptions, DEFAULT_CONNECT_TIMEOUT, DEFAULT_READ_TIMEOUT, DEFAULT_REQUEST_TIMEOUT,
};
pub use request::{HttpMethod, RequestSpec};
