//! Structured logging initialisation.
//!
//! # Example
//!
//! ```rust,ignore
//! use tessera_telemetry::logging::{init_logging, LogConfig};
//!
//! let config = LogConfig::development();
//! init_logging(&config)?;
//!
//! tracing::info!(database = "users", "MongoDB client connected");
//! ```

use tessera_config::{ConfigLoader, EnvConfig};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use crate::error::TelemetryError;
use crate::TelemetryResult;

/// Logging configuration.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Whether logging is enabled.
    pub enabled: bool,

    /// Default filter directive (e.g., "info", "tessera_store=debug").
    /// `RUST_LOG` takes precedence when set.
    pub level: String,

    /// Whether to output JSON format.
    pub json_format: bool,

    /// Whether to include file/line info.
    pub file_line_info: bool,

    /// Whether to include target (module path).
    pub include_target: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self::production()
    }
}

impl LogConfig {
    /// Creates a development configuration with human-readable output.
    #[must_use]
    pub fn development() -> Self {
        Self {
            enabled: true,
            level: "debug".to_string(),
            json_format: false,
            file_line_info: true,
            include_target: true,
        }
    }

    /// Creates a production configuration with JSON output.
    #[must_use]
    pub fn production() -> Self {
        Self {
            enabled: true,
            level: "info".to_string(),
            json_format: true,
            file_line_info: false,
            include_target: true,
        }
    }

    /// Picks development or production output from a loaded configuration.
    #[must_use]
    pub fn from_env_config(config: &EnvConfig) -> Self {
        if config.is_development() {
            Self::development()
        } else {
            Self::production()
        }
    }

    /// Picks development or production output from the `ENVIRONMENT`
    /// variable. An unreadable environment falls back to production.
    #[must_use]
    pub fn from_env() -> Self {
        ConfigLoader::new()
            .with_env()
            .load()
            .map(|config| Self::from_env_config(&config))
            .unwrap_or_else(|_| Self::production())
    }
}

/// Initializes the logging subsystem.
///
/// # Errors
///
/// Returns `TelemetryError::LoggingInit` if the filter is invalid or a global
/// subscriber is already installed.
pub fn init_logging(config: &LogConfig) -> TelemetryResult<()> {
    if !config.enabled {
        return Ok(());
    }

    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => create_env_filter(&config.level)?,
    };

    if config.json_format {
        let fmt_layer = tracing_subscriber::fmt::layer()
            .json()
            .with_file(config.file_line_info)
            .with_line_number(config.file_line_info)
            .with_target(config.include_target)
            .with_filter(filter);

        tracing_subscriber::registry()
            .with(fmt_layer)
            .try_init()
            .map_err(|e| TelemetryError::LoggingInit(e.to_string()))?;
    } else {
        let fmt_layer = tracing_subscriber::fmt::layer()
            .pretty()
            .with_file(config.file_line_info)
            .with_line_number(config.file_line_info)
            .with_target(config.include_target)
            .with_filter(filter);

        tracing_subscriber::registry()
            .with(fmt_layer)
            .try_init()
            .map_err(|e| TelemetryError::LoggingInit(e.to_string()))?;
    }

    Ok(())
}

/// Creates an env filter from a string.
///
/// # Errors
///
/// Returns error if the filter string is invalid.
pub fn create_env_filter(filter: &str) -> TelemetryResult<EnvFilter> {
    EnvFilter::try_new(filter)
        .map_err(|e| TelemetryError::LoggingInit(format!("Invalid log level: {e}")))
}

/// Standard log fields for Tessera.
///
/// Use these field names for consistency across logs.
pub mod fields {
    /// Owning team field name, see [`Team`](crate::Team).
    pub const TEAM: &str = "team";

    /// Error message field name.
    pub const ERROR: &str = "error";

    /// Domain error code field name.
    pub const CODE: &str = "code";

    /// Captured stack trace field name.
    pub const STACK_TRACE: &str = "stack_trace";

    /// Trace ID field name.
    pub const TRACE_ID: &str = "trace_id";

    /// Database name field name.
    pub const DATABASE: &str = "database";

    /// Collection name field name.
    pub const COLLECTION: &str = "collection";

    /// HTTP path field name.
    pub const HTTP_PATH: &str = "http.path";
}
