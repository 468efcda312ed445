//! User-Agent string sent with every API, token, and transfer request.

/// Project URL advertised in the User-Agent.
const PROJECT_UA_URL: &str = "https://github.com/fierce/freesound-rs";

/// Default User-Agent identifying this client and its version.
#[must_use]
pub(crate) fn default_user_agent() -> String {
    let version = env!("CARGO_PKG_VERSION");
    format!("freesound-rs/{version} (+{PROJECT_UA_URL})")
}
