//! Application-level configuration loading: rotation sizing, the queue
//! low-watermark, and the synchronizer's poll interval.

use std::{env, fs, io::ErrorKind, path::PathBuf, time::Duration};

use serde::Deserialize;
use tracing::{info, warn};

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "RALLY_BACK_CONFIG_PATH";

const DEFAULT_ROTATION_LENGTH: usize = 100;
const DEFAULT_LOW_WATERMARK: usize = 10;
const DEFAULT_POLL_INTERVAL_MS: u64 = 2_000;

#[derive(Debug, Clone)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    /// Number of matches a fresh rotation (and each refill) is built with.
    pub rotation_length: usize,
    /// Minimum number of queued, not-yet-played matches before the queue is
    /// extended.
    pub low_watermark: usize,
    /// Interval between synchronizer polls of the shared store.
    pub poll_interval: Duration,
}

impl AppConfig {
    /// Load the application configuration from disk, falling back to baked-in
    /// defaults.
    pub fn load() -> Self {
        let path = resolve_config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<RawConfig>(&contents) {
                Ok(raw) => {
                    let config: Self = raw.into();
                    info!(
                        path = %path.display(),
                        rotation_length = config.rotation_length,
                        low_watermark = config.low_watermark,
                        poll_interval_ms = config.poll_interval.as_millis() as u64,
                        "loaded configuration"
                    );
                    config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            rotation_length: DEFAULT_ROTATION_LENGTH,
            low_watermark: DEFAULT_LOW_WATERMARK,
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
        }
    }
}

#[derive(Debug, Deserialize)]
/// JSON representation of the configuration file located at
/// [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    #[serde(default = "default_rotation_length")]
    rotation_length: usize,
    #[serde(default = "default_low_watermark")]
    low_watermark: usize,
    #[serde(default = "default_poll_interval_ms")]
    poll_interval_ms: u64,
}

impl From<RawConfig> for AppConfig {
    fn from(value: RawConfig) -> Self {
        Self {
            rotation_length: value.rotation_length.max(1),
            low_watermark: value.low_watermark,
            poll_interval: Duration::from_millis(value.poll_interval_ms.max(100)),
        }
    }
}

fn default_rotation_length() -> usize {
    DEFAULT_ROTATION_LENGTH
}

fn default_low_watermark() -> usize {
    DEFAULT_LOW_WATERMARK
}

fn default_poll_interval_ms() -> u64 {
    DEFAULT_POLL_INTERVAL_MS
}

/// Resolve the configuration path taking the environment override into
/// account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}
