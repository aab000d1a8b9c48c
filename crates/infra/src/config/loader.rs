//! Configuration loader
//!
//! Loads application configuration from environment variables or files.
//!
//! ## Loading Strategy
//! 1. Reads a `.env` file into the process environment, if one exists
//! 2. Attempts to load from environment variables
//! 3. If the client id is not set, falls back to loading from file
//! 4. Probes multiple paths for config files
//! 5. Supports JSON and TOML formats
//!
//! ## Environment Variables
//! - `SPOTICIZR_CLIENT_ID`: Spotify application client id (required)
//! - `SPOTICIZR_REDIRECT_URI`: Registered redirect URI
//! - `SPOTICIZR_SCOPES`: Requested scopes, separated by spaces or commas
//! - `SPOTICIZR_AUTHORIZE_URL`: Provider authorize endpoint
//! - `SPOTICIZR_TOKEN_URL`: Provider token endpoint (relay side)
//! - `SPOTICIZR_RELAY_URL`: Base URL the login client uses to reach the relay
//! - `SPOTICIZR_RELAY_BIND`: Socket address the relay listens on
//! - `SPOTICIZR_API_BASE_URL`: Spotify Web API base URL
//! - `SPOTICIZR_REFRESH_MARGIN_SECS`: Renew this many seconds before expiry
//! - `SPOTICIZR_HTTP_TIMEOUT_SECS`: Per-request timeout (client and relay)
//! - `SPOTICIZR_STATE_PATH`: File holding the persisted session
//!
//! ## File Locations
//! The loader probes the following paths (in order):
//! 1. `./spoticizr.json` or `./spoticizr.toml` (current working directory)
//! 2. `./config.json` or `./config.toml` (current working directory)
//! 3. `../spoticizr.json` or `../spoticizr.toml` (parent directory)
//! 4. Relative to executable location

use std::path::{Path, PathBuf};

use spoticizr_domain::constants::DEFAULT_REDIRECT_URI;
use spoticizr_domain::{Config, Result, SpoticizrError};

/// Load configuration with automatic fallback strategy
///
/// First attempts to load from environment variables (after reading `.env`).
/// If the client id is missing, falls back to loading from a config file.
///
/// # Errors
/// Returns `SpoticizrError::Config` if:
/// - Configuration cannot be loaded from either source
/// - File format is invalid
/// - Required fields are missing
pub fn load() -> Result<Config> {
    match dotenvy::dotenv() {
        Ok(path) => tracing::debug!(path = %path.display(), "Loaded .env file"),
        Err(e) if e.not_found() => {}
        Err(e) => tracing::warn!(error = %e, "Ignoring unreadable .env file"),
    }

    match load_from_env() {
        Ok(config) => {
            tracing::info!("Configuration loaded from environment variables");
            Ok(config)
        }
        Err(e) => {
            tracing::debug!(error = ?e, "Failed to load from environment, trying file");
            load_from_file(None)
        }
    }
}

/// Load configuration from environment variables
///
/// `SPOTICIZR_CLIENT_ID` must be present; every other variable falls back to
/// its default.
///
/// # Environment Variables
/// See module documentation for the complete list.
///
/// # Errors
/// Returns `SpoticizrError::Config` if the client id is missing or a numeric
/// variable has an invalid value.
pub fn load_from_env() -> Result<Config> {
    let client_id = env_var("SPOTICIZR_CLIENT_ID")?;
    let redirect_uri =
        optional_env("SPOTICIZR_REDIRECT_URI").unwrap_or_else(|| DEFAULT_REDIRECT_URI.to_string());

    let mut config = Config::new(client_id, redirect_uri);

    if let Some(scopes) = optional_env("SPOTICIZR_SCOPES") {
        config.client.scopes = parse_scopes(&scopes);
    }
    if let Some(url) = optional_env("SPOTICIZR_AUTHORIZE_URL") {
        config.client.authorize_url = url;
    }
    if let Some(url) = optional_env("SPOTICIZR_RELAY_URL") {
        config.client.relay_url = url;
    }
    if let Some(url) = optional_env("SPOTICIZR_API_BASE_URL") {
        config.client.api_base_url = url;
    }
    if let Some(path) = optional_env("SPOTICIZR_STATE_PATH") {
        config.client.state_path = path;
    }
    if let Some(margin) = env_u64("SPOTICIZR_REFRESH_MARGIN_SECS")? {
        config.client.refresh_margin_secs = margin;
    }
    if let Some(timeout) = env_u64("SPOTICIZR_HTTP_TIMEOUT_SECS")? {
        config.client.http_timeout_secs = timeout;
        config.relay.http_timeout_secs = timeout;
    }
    if let Some(bind) = optional_env("SPOTICIZR_RELAY_BIND") {
        config.relay.bind = bind;
    }
    if let Some(url) = optional_env("SPOTICIZR_TOKEN_URL") {
        config.relay.token_url = url;
    }

    Ok(config)
}

/// Load configuration from a file
///
/// If `path` is `None`, probes multiple locations for config files.
/// Supports both JSON and TOML formats (detected by file extension).
///
/// # Arguments
/// * `path` - Optional path to config file. If `None`, uses
///   [`probe_config_paths`].
///
/// # Errors
/// Returns `SpoticizrError::Config` if:
/// - File not found (when path is specified)
/// - No config file found (when path is `None`)
/// - File format is invalid
/// - Required fields are missing or empty
pub fn load_from_file(path: Option<PathBuf>) -> Result<Config> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(SpoticizrError::Config(format!(
                    "Config file not found: {}",
                    p.display()
                )));
            }
            p
        }
        None => probe_config_paths().ok_or_else(|| {
            SpoticizrError::Config(
                "SPOTICIZR_CLIENT_ID is not set and no config file was found".to_string(),
            )
        })?,
    };

    tracing::info!(path = %config_path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| SpoticizrError::Config(format!("Failed to read config file: {e}")))?;

    let config = parse_config(&contents, &config_path)?;
    config.validate()?;
    Ok(config)
}

/// Parse configuration from string content
///
/// Format is detected by file extension (`.json` or `.toml`).
///
/// # Errors
/// Returns `SpoticizrError::Config` if format is invalid or parsing fails.
fn parse_config(contents: &str, path: &Path) -> Result<Config> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

    match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| SpoticizrError::Config(format!("Invalid TOML format: {e}"))),
        "json" => serde_json::from_str(contents)
            .map_err(|e| SpoticizrError::Config(format!("Invalid JSON format: {e}"))),
        _ => Err(SpoticizrError::Config(format!("Unsupported config format: {extension}"))),
    }
}

/// Probe multiple paths for configuration files
///
/// Searches the current working directory, its parent, and the directory of
/// the running executable.
///
/// # Returns
/// The first config file found, or `None` if no file exists.
#[must_use]
pub fn probe_config_paths() -> Option<PathBuf> {
    const NAMES: [&str; 4] = ["spoticizr.json", "spoticizr.toml", "config.json", "config.toml"];

    let mut roots = Vec::new();
    if let Ok(cwd) = std::env::current_dir() {
        roots.push(cwd.clone());
        roots.push(cwd.join(".."));
    }
    if let Some(exe_dir) = std::env::current_exe().ok().and_then(|p| p.parent().map(Path::to_path_buf))
    {
        roots.push(exe_dir);
    }

    roots
        .iter()
        .flat_map(|root| NAMES.iter().map(move |name| root.join(name)))
        .find(|path| path.exists())
}

/// Split a scope list on whitespace and commas
fn parse_scopes(raw: &str) -> Vec<String> {
    raw.split(|c: char| c.is_whitespace() || c == ',')
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Get required environment variable
///
/// # Errors
/// Returns `SpoticizrError::Config` if the variable is not set or blank.
fn env_var(key: &str) -> Result<String> {
    optional_env(key).ok_or_else(|| {
        SpoticizrError::Config(format!("Missing required environment variable: {key}"))
    })
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn env_u64(key: &str) -> Result<Option<u64>> {
    optional_env(key)
        .map(|v| {
            v.parse::<u64>()
                .map_err(|e| SpoticizrError::Config(format!("Invalid value for {key}: {e}")))
        })
        .transpose()
}
