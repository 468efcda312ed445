//! CLI command handlers.

mod auth;
mod sounds;

use anyhow::{Context, Result};
use serde::Serialize;

pub use auth::run_auth_command;
pub use sounds::{
    run_download_command, run_me_command, run_preview_command, run_search_command,
    run_sound_command,
};

/// Prints `value` to stdout as pretty JSON.
fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    let rendered = serde_json::to_string_pretty(value).context("Failed to render JSON output")?;
    println!("{rendered}");
    Ok(())
}
