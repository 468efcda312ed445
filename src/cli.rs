//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::{Args as ClapArgs, Parser, Subcommand};
use freesound_core::PreviewQuality;

/// Command-line client for the Freesound API.
///
/// Authorizes once through the browser, then keeps the OAuth2 tokens in the
/// configured credential store and refreshes them when the server rejects them.
#[derive(Parser, Debug)]
#[command(name = "freesound")]
#[command(author, version, about)]
pub struct Args {
    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Config file to read instead of the default location
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// OAuth2 client id (overrides FREESOUND_CLIENT_ID and the config file)
    #[arg(long, value_name = "ID", global = true)]
    pub client_id: Option<String>,

    /// OAuth2 client secret (overrides FREESOUND_CLIENT_SECRET and the config file)
    #[arg(long, value_name = "SECRET", global = true)]
    pub client_secret: Option<String>,

    /// API root (overrides the config file)
    #[arg(long, value_name = "URL", global = true)]
    pub base_url: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

/// Top-level subcommands.
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Manage the stored authorization
    #[command(subcommand)]
    Auth(AuthCommand),
    /// Text search; prints every result of the fetched pages
    Search(SearchArgs),
    /// Show one sound
    Sound {
        /// Sound id
        id: u64,
    },
    /// Download the original file of a sound
    Download {
        /// Sound id
        id: u64,
        /// Destination file
        dest: PathBuf,
    },
    /// Download the MP3 preview of a sound
    Preview {
        /// Sound id
        id: u64,
        /// Destination file
        dest: PathBuf,
        /// Preview quality (low or high)
        #[arg(long, default_value = "low", value_parser = parse_quality)]
        quality: PreviewQuality,
    },
    /// Show the authorized user
    Me,
}

/// `auth` subcommands.
#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthCommand {
    /// Print the authorization URL to open in a browser
    Url,
    /// Print the authorization URL, then read the code from stdin
    Login {
        /// Switch account: log out of the website before authorizing
        #[arg(long)]
        switch_account: bool,
    },
    /// Exchange the refresh token for a new access token
    Refresh,
    /// Forget the stored tokens
    Logout,
    /// Show whether a token is stored
    Status,
}

/// Arguments of `search`.
#[derive(ClapArgs, Debug, Clone, PartialEq, Eq)]
pub struct SearchArgs {
    /// Search terms
    pub text: String,

    /// Filter expression, e.g. "duration:[0 TO 5]"
    #[arg(long)]
    pub filter: Option<String>,

    /// Sort order, e.g. "rating_desc"
    #[arg(long)]
    pub sort: Option<String>,

    /// Results per page (1-150)
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..=150))]
    pub page_size: Option<u32>,

    /// Stop after this many pages
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
    pub max_pages: u32,
}

fn parse_quality(value: &str) -> Result<PreviewQuality, String> {
    value.parse()
}
