//! CLI entry point for the freesound tool.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use freesound_core::{
    CredentialManager, CredentialStore, EncryptedFileStore, Freesound, KeyringStore,
};
use tracing::{debug, info};

mod cli;
mod commands;
mod config;

use cli::{Args, Command};
use config::{Overrides, StoreBackend};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (info)
    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    // Logs go to stderr so command output on stdout stays machine-readable.
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    debug!(command = ?args.command, "CLI arguments parsed");

    let (file_config, config_path) = config::load_file_config(args.config.as_deref())?;
    let flags = Overrides {
        client_id: args.client_id.clone(),
        client_secret: args.client_secret.clone(),
        base_url: args.base_url.clone(),
    };
    let settings = config::resolve(
        file_config,
        flags.or(Overrides::from_env()),
        config_path.as_deref(),
    )?;
    debug!(
        base_url = %settings.options.base_url,
        store = settings.store.as_str(),
        "Configuration resolved"
    );

    let store = open_store(settings.store)?;
    let credentials = CredentialManager::with_options(store, settings.options)
        .context("Failed to initialise the credential manager")?;
    credentials
        .configure(&settings.client_id, &settings.client_secret)
        .context("Invalid client identity")?;
    info!(state = %credentials.state(), "Credentials loaded");

    let client = Freesound::new(credentials);
    match args.command {
        Command::Auth(command) => {
            commands::run_auth_command(command, client.credentials(), settings.store).await
        }
        Command::Search(search) => commands::run_search_command(&client, search).await,
        Command::Sound { id } => commands::run_sound_command(&client, id).await,
        Command::Download { id, dest } => commands::run_download_command(&client, id, &dest).await,
        Command::Preview { id, dest, quality } => {
            commands::run_preview_command(&client, id, &dest, quality).await
        }
        Command::Me => commands::run_me_command(&client).await,
    }
}

fn open_store(backend: StoreBackend) -> Result<Arc<dyn CredentialStore>> {
    match backend {
        StoreBackend::File => {
            let store = EncryptedFileStore::open_default()
                .context("Failed to open the encrypted credential file")?;
            debug!(path = %store.path().display(), "Using encrypted credential file");
            Ok(Arc::new(store))
        }
        StoreBackend::Keyring => {
            let store =
                KeyringStore::open_default().context("Failed to open the system keychain")?;
            Ok(Arc::new(store))
        }
    }
}
