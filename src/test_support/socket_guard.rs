//! Skips wiremock-backed tests where localhost sockets cannot be bound.
//!
//! Shared by the unit tests and, through `tests/support`, the integration tests.

use std::net::TcpListener;

use wiremock::MockServer;

fn socket_tests_required() -> bool {
    std::env::var("FREESOUND_REQUIRE_SOCKET_TESTS")
        .ok()
        .is_some_and(|value| matches!(value.to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
}

/// Starts a mock server, or returns `None` (after a note on stderr) when the
/// sandbox forbids binding a local port.
#[track_caller]
pub(crate) fn start_mock_server_or_skip() -> impl std::future::Future<Output = Option<MockServer>> {
    let location = std::panic::Location::caller();
    let can_bind = TcpListener::bind("127.0.0.1:0").is_ok();
    async move {
        if can_bind {
            return Some(MockServer::start().await);
        }
        let message = format!(
            "mock server unavailable for {}:{}: binding 127.0.0.1 is not permitted here",
            location.file(),
            location.line()
        );
        assert!(
            !socket_tests_required(),
            "{message} (FREESOUND_REQUIRE_SOCKET_TESTS is set)"
        );
        eprintln!("{message}; skipping");
        None
    }
}
