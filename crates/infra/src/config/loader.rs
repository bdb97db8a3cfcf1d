//! Configuration loader
//!
//! ## Loading Strategy
//! 1. Environment variables, when `HERDSYNC_DB_PATH` and
//!    `HERDSYNC_API_BASE_URL` are both set
//! 2. Otherwise the first config file found by [`probe_config_paths`]
//! 3. JSON and TOML are detected by file extension
//!
//! ## Environment Variables
//! - `HERDSYNC_DB_PATH`: queue database file (required)
//! - `HERDSYNC_API_BASE_URL`: livestock service base URL (required)
//! - `HERDSYNC_DB_POOL_SIZE`: connection pool size
//! - `HERDSYNC_API_TIMEOUT_SECS`: per-request timeout
//! - `HERDSYNC_API_MAX_ATTEMPTS`: attempts per submission call
//! - `HERDSYNC_SYNC_ENABLED`: run the background worker (true/false)
//! - `HERDSYNC_SYNC_POLL_INTERVAL`: seconds between drain passes
//! - `HERDSYNC_PROBE_TIMEOUT_SECS`: connectivity probe timeout
//! - `HERDSYNC_LOG_LEVEL`: default tracing filter
//! - `HERDSYNC_LOG_JSON`: emit JSON log lines (true/false)
//!
//! ## File Locations
//! Probed in order, first hit wins:
//! 1. `./config.{json,toml}` and `./herdsync.{json,toml}`
//! 2. `../config.{json,toml}` and `../../config.{json,toml}`
//! 3. The same names relative to the executable

use std::path::{Path, PathBuf};
use std::str::FromStr;

use herdsync_domain::{
    ApiConfig, Config, DatabaseConfig, HerdSyncError, LoggingConfig, Result, SyncConfig,
};

/// Load configuration, preferring the environment over files.
///
/// # Errors
/// Returns `HerdSyncError::Config` if neither source yields a valid config.
pub fn load() -> Result<Config> {
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

/// Load configuration from `HERDSYNC_*` environment variables.
///
/// Optional variables fall back to the defaults of their config section.
///
/// # Errors
/// Returns `HerdSyncError::Config` if a required variable is missing or any
/// variable has an invalid value.
pub fn load_from_env() -> Result<Config> {
    let database_defaults = DatabaseConfig::default();
    let api_defaults = ApiConfig::default();
    let sync_defaults = SyncConfig::default();
    let logging_defaults = LoggingConfig::default();

    let database = DatabaseConfig {
        path: env_var("HERDSYNC_DB_PATH")?,
        pool_size: env_parse("HERDSYNC_DB_POOL_SIZE", "pool size")?
            .unwrap_or(database_defaults.pool_size),
    };

    let api = ApiConfig {
        base_url: env_var("HERDSYNC_API_BASE_URL")?,
        request_timeout_secs: env_parse("HERDSYNC_API_TIMEOUT_SECS", "request timeout")?
            .unwrap_or(api_defaults.request_timeout_secs),
        max_attempts: env_parse("HERDSYNC_API_MAX_ATTEMPTS", "max attempts")?
            .unwrap_or(api_defaults.max_attempts),
    };

    let sync = SyncConfig {
        enabled: env_bool("HERDSYNC_SYNC_ENABLED", sync_defaults.enabled),
        poll_interval_seconds: env_parse("HERDSYNC_SYNC_POLL_INTERVAL", "poll interval")?
            .unwrap_or(sync_defaults.poll_interval_seconds),
        probe_timeout_secs: env_parse("HERDSYNC_PROBE_TIMEOUT_SECS", "probe timeout")?
            .unwrap_or(sync_defaults.probe_timeout_secs),
    };

    let logging = LoggingConfig {
        level: std::env::var("HERDSYNC_LOG_LEVEL").unwrap_or(logging_defaults.level),
        json: env_bool("HERDSYNC_LOG_JSON", logging_defaults.json),
    };

    let config = Config { database, api, sync, logging };
    validate(&config)?;
    Ok(config)
}

/// Load configuration from a file, probing standard locations when `path`
/// is `None`.
///
/// # Errors
/// Returns `HerdSyncError::Config` if the file is missing, unreadable, in an
/// unsupported format, or fails validation.
pub fn load_from_file(path: Option<PathBuf>) -> Result<Config> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(HerdSyncError::Config(format!(
                    "Config file not found: {}",
                    p.display()
                )));
            }
            p
        }
        None => probe_config_paths().ok_or_else(|| {
            HerdSyncError::Config(
                "No config file found in any of the standard locations".to_string(),
            )
        })?,
    };

    tracing::info!(path = %config_path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| HerdSyncError::Config(format!("Failed to read config file: {e}")))?;

    let config = parse_config(&contents, &config_path)?;
    validate(&config)?;
    Ok(config)
}

fn parse_config(contents: &str, path: &Path) -> Result<Config> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

    match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| HerdSyncError::Config(format!("Invalid TOML format: {e}"))),
        "json" => serde_json::from_str(contents)
            .map_err(|e| HerdSyncError::Config(format!("Invalid JSON format: {e}"))),
        _ => Err(HerdSyncError::Config(format!("Unsupported config format: {extension}"))),
    }
}

fn validate(config: &Config) -> Result<()> {
    if config.database.path.trim().is_empty() {
        return Err(HerdSyncError::Config("database.path must not be empty".to_string()));
    }
    if config.database.pool_size == 0 {
        return Err(HerdSyncError::Config("database.pool_size must be at least 1".to_string()));
    }
    if !(config.api.base_url.starts_with("http://") || config.api.base_url.starts_with("https://"))
    {
        return Err(HerdSyncError::Config(format!(
            "api.base_url must be an http(s) URL, got {:?}",
            config.api.base_url
        )));
    }
    if config.api.max_attempts == 0 {
        return Err(HerdSyncError::Config("api.max_attempts must be at least 1".to_string()));
    }
    if config.sync.poll_interval_seconds == 0 {
        return Err(HerdSyncError::Config(
            "sync.poll_interval_seconds must be at least 1".to_string(),
        ));
    }
    Ok(())
}

/// First existing config file among the standard locations.
pub fn probe_config_paths() -> Option<PathBuf> {
    let mut candidates = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        candidates.extend(candidates_in(&cwd));
    }

    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            candidates.extend(candidates_in(exe_dir));
        }
    }

    candidates.into_iter().find(|path| path.exists())
}

fn candidates_in(dir: &Path) -> Vec<PathBuf> {
    vec![
        dir.join("config.json"),
        dir.join("config.toml"),
        dir.join("herdsync.json"),
        dir.join("herdsync.toml"),
        dir.join("../config.json"),
        dir.join("../config.toml"),
        dir.join("../../config.json"),
        dir.join("../../config.toml"),
    ]
}

fn env_var(key: &str) -> Result<String> {
    std::env::var(key).map_err(|_| {
        HerdSyncError::Config(format!("Missing required environment variable: {key}"))
    })
}

/// Parse an optional variable. Unset yields `None`, garbage yields an error.
fn env_parse<T>(key: &str, what: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| HerdSyncError::Config(format!("Invalid {what}: {e}"))),
        Err(_) => Ok(None),
    }
}

/// Accepts `1`/`0`, `true`/`false`, `yes`/`no`, `on`/`off` (case-insensitive).
fn env_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .ok()
        .map(|s| matches!(s.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(default)
}
