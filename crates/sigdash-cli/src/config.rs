//! Application configuration.
//!
//! Loaded from a TOML file, then overridden by `SIGDASH__SECTION__KEY`
//! environment variables (e.g. `SIGDASH__API__BASE_URL`).

use crate::error::{AppError, AppResult};
use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use sigdash_client::ListingStyle;
use sigdash_telemetry::LoggingConfig;
use sigdash_view::CoordinatorConfig;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Config file used when neither `--config` nor `SIGDASH_CONFIG` is given.
pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Backend connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Backend origin (e.g., "http://localhost:8080").
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Per-request timeout (seconds).
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Signal listing endpoint: "body" (`POST /api/signals/list`) or "query"
    /// (`GET /api/signals`).
    #[serde(default)]
    pub listing: ListingStyle,
}

fn default_base_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
            listing: ListingStyle::default(),
        }
    }
}

/// Signal list behaviour.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryConfig {
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    /// Page buttons shown by the pager.
    #[serde(default = "default_pager_window")]
    pub pager_window: u32,
    /// Quiet period after a filter edit (ms).
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
    #[serde(default = "default_latest_limit")]
    pub latest_limit: u32,
}

fn default_page_size() -> u32 {
    10
}

fn default_pager_window() -> u32 {
    5
}

fn default_debounce_ms() -> u64 {
    500
}

fn default_latest_limit() -> u32 {
    5
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            pager_window: default_pager_window(),
            debounce_ms: default_debounce_ms(),
            latest_limit: default_latest_limit(),
        }
    }
}

/// Theme persistence and clock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThemeConfig {
    /// JSON preference file.
    #[serde(default = "default_preferences_path")]
    pub preferences_path: PathBuf,
    /// Day/night re-evaluation interval (seconds).
    #[serde(default = "default_tick_secs")]
    pub tick_secs: u64,
}

fn default_preferences_path() -> PathBuf {
    PathBuf::from(".sigdash/preferences.json")
}

fn default_tick_secs() -> u64 {
    60
}

impl Default for ThemeConfig {
    fn default() -> Self {
        Self {
            preferences_path: default_preferences_path(),
            tick_secs: default_tick_secs(),
        }
    }
}

/// `watch` command polling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchConfig {
    /// Interval between automatic refreshes (seconds).
    #[serde(default = "default_refresh_secs")]
    pub refresh_secs: u64,
}

fn default_refresh_secs() -> u64 {
    30
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            refresh_secs: default_refresh_secs(),
        }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub query: QueryConfig,
    #[serde(default)]
    pub theme: ThemeConfig,
    #[serde(default)]
    pub watch: WatchConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load `path` (if it exists) with environment overrides applied.
    pub fn load(path: &Path) -> AppResult<Self> {
        if !path.exists() {
            tracing::warn!(path = %path.display(), "Config file not found, using defaults");
        }

        let config: Self = Config::builder()
            .add_source(File::from(path).format(FileFormat::Toml).required(false))
            .add_source(
                Environment::with_prefix("SIGDASH")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    /// Parse a config file without environment overrides.
    pub fn from_file(path: &Path) -> AppResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| AppError::Config(format!("Failed to read config: {e}")))?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> AppResult<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| AppError::Config(format!("Failed to parse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> AppResult<()> {
        if self.api.base_url.trim().is_empty() {
            return Err(AppError::Config("api.base_url must not be empty".to_string()));
        }
        if self.api.timeout_secs == 0 {
            return Err(AppError::Config("api.timeout_secs must be positive".to_string()));
        }
        if self.query.page_size == 0 || self.query.pager_window == 0 {
            return Err(AppError::Config(
                "query.page_size and query.pager_window must be positive".to_string(),
            ));
        }
        if self.theme.tick_secs == 0 || self.watch.refresh_secs == 0 {
            return Err(AppError::Config(
                "theme.tick_secs and watch.refresh_secs must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.api.timeout_secs)
    }

    pub fn coordinator(&self) -> CoordinatorConfig {
        CoordinatorConfig {
            page_size: self.query.page_size,
            pager_window: self.query.pager_window,
            debounce: Duration::from_millis(self.query.debounce_ms),
            latest_limit: self.query.latest_limit,
        }
    }
}
