//! Structured logging for Tessera services.
//!
//! Every Tessera crate logs through `tracing` macros. This crate installs the
//! subscriber that renders those events:
//!
//! - human-readable output when `ENVIRONMENT=dev`
//! - JSON lines otherwise
//!
//! Failures are attributed to the team that owns them with the
//! [`fields::TEAM`] field and a [`Team`] value.
//!
//! # Example
//!
//! ```rust,ignore
//! use tessera_telemetry::{fields, init_logging, LogConfig, Team};
//!
//! init_logging(&LogConfig::from_env())?;
//!
//! tracing::error!(team = %Team::Ops, error = "bind failed", "Server startup failed");
//! ```

#![doc(html_root_url = "https://docs.rs/tessera-telemetry/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod error;
pub mod logging;
mod team;

pub use error::TelemetryError;
pub use logging::{create_env_filter, fields, init_logging, LogConfig};
pub use team::Team;

/// Result type for telemetry operations.
pub type TelemetryResult<T> = Result<T, TelemetryError>;
