//! Application Configuration Module
//!
//! Settings for the operator console, loaded from environment variables (and an optional
//! `.env` file) into one struct that is handed to the rest of the binary.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;
use tracing::Level;

// --- Application Constants ---

/// Capacity of the notice channel between the core and the console.
pub const NOTICE_CAPACITY: usize = 64;
/// Width of each channel's text waveform, in characters.
pub const WAVEFORM_WIDTH: u32 = 32;
/// Height of each channel's text waveform, in levels.
pub const WAVEFORM_HEIGHT: u32 = 8;

const DEFAULT_BASE_URL: &str = "https://api.vapi.ai";
const DEFAULT_FRAME_INTERVAL_MS: u64 = 16;
const DEFAULT_WAVEFORM_REFRESH_MS: u64 = 200;

/// Holds all configuration loaded from the environment.
#[derive(Debug)]
pub struct Config {
    pub vapi_api_key: SecretString,
    pub vapi_base_url: String,
    pub agent_catalog: Option<PathBuf>,
    pub frame_interval: Duration,
    pub waveform_refresh: Duration,
    pub log_level: Level,
}

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingVar(String),
    #[error("Invalid log level provided for RUST_LOG: {0}")]
    InvalidLogLevel(String),
    #[error("{name} must be a positive number of milliseconds, got {value:?}")]
    InvalidInterval { name: String, value: String },
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    // *   `VAPI_API_KEY`: Your private key for the Vapi API. Required.
    // *   `VAPI_BASE_URL`: (Optional) API base URL. Defaults to "https://api.vapi.ai".
    // *   `AGENT_CATALOG`: (Optional) Path to a JSON agent catalog. Defaults to the built-in one.
    // *   `FRAME_INTERVAL_MS`: (Optional) Waveform animation frame interval. Defaults to 16.
    // *   `WAVEFORM_REFRESH_MS`: (Optional) How often the waveform line is reprinted. Defaults to 200.
    // *   `RUST_LOG`: (Optional) The logging level. Defaults to "INFO".
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file. This is useful for local development and is ignored if not present.
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from any key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let vapi_api_key = lookup("VAPI_API_KEY")
            .filter(|key| !key.trim().is_empty())
            .map(SecretString::from)
            .ok_or_else(|| ConfigError::MissingVar("VAPI_API_KEY".to_string()))?;

        let vapi_base_url = lookup("VAPI_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let agent_catalog = lookup("AGENT_CATALOG").map(PathBuf::from);

        let frame_interval = interval(&lookup, "FRAME_INTERVAL_MS", DEFAULT_FRAME_INTERVAL_MS)?;
        let waveform_refresh = interval(&lookup, "WAVEFORM_REFRESH_MS", DEFAULT_WAVEFORM_REFRESH_MS)?;

        // Configure logging level from RUST_LOG, with a sensible default.
        let log_level_str = lookup("RUST_LOG").unwrap_or_else(|| "INFO".to_string());
        let log_level = log_level_str
            .parse::<Level>()
            .map_err(|_| ConfigError::InvalidLogLevel(log_level_str))?;

        Ok(Self {
            vapi_api_key,
            vapi_base_url,
            agent_catalog,
            frame_interval,
            waveform_refresh,
            log_level,
        })
    }
}

fn interval<F>(lookup: &F, name: &str, default_ms: u64) -> Result<Duration, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(value) = lookup(name) else {
        return Ok(Duration::from_millis(default_ms));
    };
    match value.trim().parse::<u64>() {
        Ok(ms) if ms > 0 => Ok(Duration::from_millis(ms)),
        _ => Err(ConfigError::InvalidInterval {
            name: name.to_string(),
            value,
        }),
    }
}
