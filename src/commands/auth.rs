//! Auth command handlers: authorization URL, login, refresh, logout, status.

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use freesound_core::{AuthorizationPrompt, CredentialManager};
use serde_json::json;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info};
use url::Url;

use super::print_json;
use crate::cli::AuthCommand;
use crate::config::StoreBackend;

pub async fn run_auth_command(
    command: AuthCommand,
    credentials: &CredentialManager,
    store: StoreBackend,
) -> Result<()> {
    match command {
        AuthCommand::Url => {
            let url = credentials
                .begin_authorization()
                .context("Failed to build the authorization URL")?;
            println!("{url}");
        }
        AuthCommand::Login { switch_account } => {
            let prompt = StdinPrompt;
            let state = if switch_account {
                let url = credentials
                    .begin_reauthorization()
                    .context("Failed to build the authorization URL")?;
                let code = prompt
                    .request_code(&url)
                    .await
                    .ok_or_else(|| anyhow!("No authorization code entered"))?;
                credentials.complete_authorization(&code).await
            } else {
                credentials.authorize_with(&prompt).await
            }
            .context("Authorization failed")?;
            info!(state = %state, store = store.as_str(), "Authorization stored");
        }
        AuthCommand::Refresh => {
            let state = credentials
                .refresh()
                .await
                .context("Token refresh failed")?;
            info!(state = %state, "Tokens refreshed");
        }
        AuthCommand::Logout => {
            credentials.logout().await.context("Logout failed")?;
            info!(store = store.as_str(), "Stored tokens removed");
        }
        AuthCommand::Status => {
            let stored = credentials.credentials();
            print_json(&json!({
                "state": credentials.state().to_string(),
                "store": store.as_str(),
                "has_access_token": stored.access_token.is_some(),
                "has_refresh_token": stored.refresh_token.is_some(),
            }))?;
        }
    }
    Ok(())
}

/// Prints the authorization URL on stderr and reads the code from stdin.
struct StdinPrompt;

#[async_trait]
impl AuthorizationPrompt for StdinPrompt {
    async fn request_code(&self, authorization_url: &Url) -> Option<String> {
        eprintln!("Open this URL in a browser and authorize the application:\n\n  {authorization_url}\n");
        eprintln!("Then paste the authorization code (or the full redirect URL):");

        let mut line = String::new();
        let mut reader = BufReader::new(tokio::io::stdin());
        match reader.read_line(&mut line).await {
            Ok(0) => None,
            Ok(_) => extract_code(&line),
            Err(error) => {
                debug!(error = %error, "failed to read authorization code");
                None
            }
        }
    }
}

/// Accepts either a bare code or a redirect URL carrying `code=...`.
fn extract_code(input: &str) -> Option<String> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(url) = Url::parse(trimmed)
        && url.has_host()
    {
        return url
            .query_pairs()
            .find(|(key, _)| key == "code")
            .map(|(_, value)| value.into_owned())
            .filter(|code| !code.is_empty());
    }
    Some(trimmed.to_string())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_code_bare() {
        assert_eq!(extract_code("  abc123\n").as_deref(), Some("abc123"));
    }

    #[test]
    fn test_extract_code_blank_is_none() {
        assert_eq!(extract_code(" \n"), None);
    }

    #[test]
    fn test_extract_code_from_redirect_url() {
        let code = extract_code("https://freesound.org/home/app_permissions/permission_granted/?state=xyz&code=Q1w2");
        assert_eq!(code.as_deref(), Some("Q1w2"));
    }

    #[test]
    fn test_extract_code_redirect_url_without_code() {
        let code = extract_code("https://freesound.org/home/?error=access_denied");
        assert_eq!(code, None);
    }
}
