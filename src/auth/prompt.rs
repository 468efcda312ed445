//! Collaborator seam for the interactive half of authorization, and the
//! opt-in retry helper.

use std::future::Future;

use async_trait::async_trait;
use tracing::info;
use url::Url;

use super::manager::CredentialManager;
use crate::error::ClientError;

/// Shows the authorization URL to the user and returns the code they obtain.
///
/// Implementations may open a browser, print the URL and read stdin, or run a
/// local redirect listener.
#[async_trait]
pub trait AuthorizationPrompt: Send + Sync {
    /// Returns the authorization code, or `None` if the user gave up.
    async fn request_code(&self, authorization_url: &Url) -> Option<String>;
}

/// Runs `operation`; if it fails with [`ClientError::Unauthorized`], refreshes
/// the credentials and runs it exactly once more.
///
/// # Errors
///
/// Returns the refresh error when refreshing fails, otherwise the result of
/// the last attempt.
pub async fn retry_once_on_unauthorized<T, F, Fut>(
    credentials: &CredentialManager,
    mut operation: F,
) -> Result<T, ClientError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ClientError>>,
{
    match operation().await {
        Err(error) if error.is_unauthorized() => {
            info!(error = %error, "credential rejected; refreshing and retrying once");
            credentials.refresh().await?;
            operation().await
        }
        other => other,
    }
}
