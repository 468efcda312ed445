//! Binary configuration: config file, environment, and flag overrides.
//!
//! Precedence for every value is flag > environment > file > built-in default.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use freesound_core::ClientOptions;

const CONFIG_DIR_NAME: &str = "freesound";
const CONFIG_FILE_NAME: &str = "config.toml";
const CLIENT_ID_ENV: &str = "FREESOUND_CLIENT_ID";
const CLIENT_SECRET_ENV: &str = "FREESOUND_CLIENT_SECRET";

/// Values read from the `key = value` config file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileConfig {
    /// OAuth2 client id.
    pub client_id: Option<String>,
    /// OAuth2 client secret.
    pub client_secret: Option<String>,
    /// API root, e.g. `https://freesound.org/apiv2`.
    pub base_url: Option<String>,
    /// TCP connect timeout in seconds.
    pub connect_timeout_secs: Option<u64>,
    /// JSON request timeout in seconds.
    pub request_timeout_secs: Option<u64>,
    /// Idle timeout between transfer chunks in seconds.
    pub read_timeout_secs: Option<u64>,
    /// Where tokens are kept between runs.
    pub credential_store: Option<StoreBackend>,
}

impl FileConfig {
    /// Validates config values against runtime constraints.
    pub fn validate(&self) -> Result<()> {
        validate_timeout_secs("connect_timeout_secs", self.connect_timeout_secs)?;
        validate_timeout_secs("request_timeout_secs", self.request_timeout_secs)?;
        validate_timeout_secs("read_timeout_secs", self.read_timeout_secs)?;
        validate_non_empty("client_id", self.client_id.as_deref())?;
        validate_non_empty("client_secret", self.client_secret.as_deref())?;
        Ok(())
    }
}

fn validate_timeout_secs(field: &str, value: Option<u64>) -> Result<()> {
    let Some(value) = value else {
        return Ok(());
    };
    if !(1..=3600).contains(&value) {
        bail!("Invalid config value for `{field}`: {value}. Expected range: 1..=3600");
    }
    Ok(())
}

fn validate_non_empty(field: &str, value: Option<&str>) -> Result<()> {
    if value.is_some_and(|value| value.trim().is_empty()) {
        bail!("Invalid config value for `{field}`: must not be empty");
    }
    Ok(())
}

/// Credential store backends selectable from config.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StoreBackend {
    /// Encrypted file under the config directory.
    #[default]
    File,
    /// One entry in the system keychain.
    Keyring,
}

impl StoreBackend {
    /// Returns the stable string label for display output.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::File => "file",
            Self::Keyring => "keyring",
        }
    }
}

fn parse_store_backend(value: &str) -> Result<StoreBackend> {
    match value {
        "file" => Ok(StoreBackend::File),
        "keyring" => Ok(StoreBackend::Keyring),
        other => bail!("Unknown credential store '{other}'. Expected one of: file, keyring"),
    }
}

/// Values supplied outside the config file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Overrides {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub base_url: Option<String>,
}

impl Overrides {
    /// Reads `FREESOUND_CLIENT_ID` and `FREESOUND_CLIENT_SECRET`.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            client_id: env_var_non_empty(CLIENT_ID_ENV),
            client_secret: env_var_non_empty(CLIENT_SECRET_ENV),
            base_url: None,
        }
    }

    /// Fills every unset value from `lower`.
    #[must_use]
    pub fn or(self, lower: Self) -> Self {
        Self {
            client_id: self.client_id.or(lower.client_id),
            client_secret: self.client_secret.or(lower.client_secret),
            base_url: self.base_url.or(lower.base_url),
        }
    }
}

/// Fully resolved runtime settings.
#[derive(Debug, Clone)]
pub struct Settings {
    pub client_id: String,
    pub client_secret: String,
    pub options: ClientOptions,
    pub store: StoreBackend,
}

/// Merges file values with `overrides` and builds client options.
///
/// `config_path` only appears in error messages.
pub fn resolve(
    file: FileConfig,
    overrides: Overrides,
    config_path: Option<&Path>,
) -> Result<Settings> {
    let merged = overrides.or(Overrides {
        client_id: file.client_id,
        client_secret: file.client_secret,
        base_url: file.base_url,
    });
    let location = config_path.map_or_else(
        || "the config file".to_string(),
        |path| format!("'{}'", path.display()),
    );

    let client_id = required(merged.client_id, "client_id", CLIENT_ID_ENV, &location)?;
    let client_secret = required(
        merged.client_secret,
        "client_secret",
        CLIENT_SECRET_ENV,
        &location,
    )?;

    let mut options = match merged.base_url.as_deref() {
        Some(base_url) => ClientOptions::with_base_url(base_url)
            .with_context(|| format!("Invalid base url '{base_url}'"))?,
        None => ClientOptions::default(),
    };
    if let Some(secs) = file.connect_timeout_secs {
        options.connect_timeout = Duration::from_secs(secs);
    }
    if let Some(secs) = file.request_timeout_secs {
        options.request_timeout = Duration::from_secs(secs);
    }
    if let Some(secs) = file.read_timeout_secs {
        options.read_timeout = Duration::from_secs(secs);
    }

    Ok(Settings {
        client_id,
        client_secret,
        options,
        store: file.credential_store.unwrap_or_default(),
    })
}

fn required(value: Option<String>, key: &str, env_name: &str, location: &str) -> Result<String> {
    match value.map(|value| value.trim().to_string()) {
        Some(value) if !value.is_empty() => Ok(value),
        _ => bail!(
            "Missing {key}: set `{key}` in {location}, export {env_name}, or pass --{}",
            key.replace('_', "-")
        ),
    }
}

/// Resolves default config path.
///
/// Priority:
/// 1. `$XDG_CONFIG_HOME/freesound/config.toml`
/// 2. `$HOME/.config/freesound/config.toml`
#[must_use]
pub fn resolve_default_config_path() -> Option<PathBuf> {
    if let Some(xdg_config_home) = env_var_non_empty_os("XDG_CONFIG_HOME") {
        return Some(
            PathBuf::from(xdg_config_home)
                .join(CONFIG_DIR_NAME)
                .join(CONFIG_FILE_NAME),
        );
    }

    let home = env_var_non_empty_os("HOME")?;
    Some(
        PathBuf::from(home)
            .join(".config")
            .join(CONFIG_DIR_NAME)
            .join(CONFIG_FILE_NAME),
    )
}

fn env_var_non_empty_os(name: &str) -> Option<std::ffi::OsString> {
    let value = env::var_os(name)?;
    if value.is_empty() { None } else { Some(value) }
}

fn env_var_non_empty(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Loads `explicit` when given (it must exist), otherwise the default path if present.
///
/// Returns the parsed config with the path it was read from.
pub fn load_file_config(explicit: Option<&Path>) -> Result<(FileConfig, Option<PathBuf>)> {
    if let Some(path) = explicit {
        return Ok((read_config_file(path)?, Some(path.to_path_buf())));
    }

    let Some(path) = resolve_default_config_path() else {
        return Ok((FileConfig::default(), None));
    };
    if !path.exists() {
        return Ok((FileConfig::default(), Some(path)));
    }
    Ok((read_config_file(&path)?, Some(path)))
}

fn read_config_file(path: &Path) -> Result<FileConfig> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file '{}'", path.display()))?;
    parse_config_str(&raw)
        .with_context(|| format!("Failed to parse config file '{}'", path.display()))
}

fn parse_config_str(raw: &str) -> Result<FileConfig> {
    let mut cfg = FileConfig::default();
    for (line_index, raw_line) in raw.lines().enumerate() {
        let line = strip_inline_comment(raw_line).trim();
        if line.is_empty() {
            continue;
        }

        let Some((raw_key, raw_value)) = line.split_once('=') else {
            bail!(
                "Invalid config syntax on line {}: expected key = value",
                line_index + 1
            );
        };

        let key = raw_key.trim();
        let value = raw_value.trim();
        let line_number = line_index + 1;

        match key {
            "client_id" => {
                cfg.client_id = Some(string_value(key, value, line_number)?);
            }
            "client_secret" => {
                cfg.client_secret = Some(string_value(key, value, line_number)?);
            }
            "base_url" => {
                cfg.base_url = Some(string_value(key, value, line_number)?);
            }
            "connect_timeout_secs" => {
                cfg.connect_timeout_secs = Some(integer_value(key, value, line_number)?);
            }
            "request_timeout_secs" => {
                cfg.request_timeout_secs = Some(integer_value(key, value, line_number)?);
            }
            "read_timeout_secs" => {
                cfg.read_timeout_secs = Some(integer_value(key, value, line_number)?);
            }
            "credential_store" => {
                let parsed = string_value(key, value, line_number)?;
                cfg.credential_store = Some(parse_store_backend(&parsed).with_context(|| {
                    format!("Invalid `credential_store` value '{parsed}' on line {line_number}")
                })?);
            }
            unknown => {
                bail!("Unknown configuration key: '{unknown}' on line {line_number}");
            }
        }
    }
    cfg.validate()?;
    Ok(cfg)
}

fn string_value(key: &str, value: &str, line_number: usize) -> Result<String> {
    parse_string_literal(value)
        .with_context(|| format!("Invalid `{key}` value on line {line_number}"))
}

fn integer_value(key: &str, value: &str, line_number: usize) -> Result<u64> {
    parse_integer_u64(value)
        .with_context(|| format!("Invalid `{key}` value on line {line_number}"))
}

fn strip_inline_comment(line: &str) -> &str {
    let mut in_string = false;
    for (index, ch) in line.char_indices() {
        match ch {
            '"' => in_string = !in_string,
            '#' if !in_string => return &line[..index],
            _ => {}
        }
    }
    line
}

fn parse_string_literal(raw_value: &str) -> Result<String> {
    if raw_value.len() < 2 || !raw_value.starts_with('"') || !raw_value.ends_with('"') {
        bail!("Expected double-quoted string");
    }
    Ok(raw_value[1..raw_value.len() - 1].to_string())
}

fn parse_integer_u64(raw_value: &str) -> Result<u64> {
    let token = raw_value.trim();
    if token.is_empty() {
        bail!("Expected integer value");
    }
    let value = token.parse::<i128>()?;
    if value < 0 {
        bail!("Expected non-negative integer");
    }
    u64::try_from(value).map_err(|_| anyhow::anyhow!("Integer value out of range for u64"))
}
