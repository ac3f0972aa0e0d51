//! Structured logging initialization.

use serde::{Deserialize, Serialize};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::error::{TelemetryError, TelemetryResult};

/// Filter used when neither `RUST_LOG` nor the config sets one.
pub const DEFAULT_FILTER: &str = "info,sigdash=debug";

/// Output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

/// `[logging]` section of the application config.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Forced format; derived from `RUST_ENV` when unset.
    #[serde(default)]
    pub format: Option<LogFormat>,
    /// Filter directives; `RUST_LOG` takes precedence.
    #[serde(default)]
    pub filter: Option<String>,
}

impl LoggingConfig {
    /// Effective format given the value of `RUST_ENV`.
    pub fn resolve_format(&self, rust_env: Option<&str>) -> LogFormat {
        match (self.format, rust_env) {
            (Some(format), _) => format,
            (None, Some("production")) => LogFormat::Json,
            (None, _) => LogFormat::Pretty,
        }
    }

    fn env_filter(&self) -> TelemetryResult<EnvFilter> {
        if let Ok(filter) = EnvFilter::try_from_default_env() {
            return Ok(filter);
        }
        let directives = self.filter.as_deref().unwrap_or(DEFAULT_FILTER);
        EnvFilter::try_new(directives).map_err(|e| TelemetryError::InvalidFilter {
            filter: directives.to_string(),
            reason: e.to_string(),
        })
    }
}

/// Initialize structured logging.
///
/// JSON output for production, pretty output for development. Fails if a
/// global subscriber is already installed.
pub fn init_logging(config: &LoggingConfig) -> TelemetryResult<()> {
    let env_filter = config.env_filter()?;
    let rust_env = std::env::var("RUST_ENV").ok();

    let result = match config.resolve_format(rust_env.as_deref()) {
        LogFormat::Json => tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_list(true)
                    .with_writer(std::io::stderr),
            )
            .try_init(),
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .pretty()
                    .with_target(true)
                    .with_thread_names(true)
                    .with_writer(std::io::stderr),
            )
            .try_init(),
    };

    result.map_err(|e| TelemetryError::LoggingInit(e.to_string()))
}
