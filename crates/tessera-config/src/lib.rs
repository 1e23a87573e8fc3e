//! Environment-driven configuration for Tessera services.
//!
//! A Tessera service reads three settings from its environment:
//!
//! | Variable       | Field                     | Default      |
//! |----------------|---------------------------|--------------|
//! | `SERVER_PORT`  | [`EnvConfig::server_port`] | `8080`       |
//! | `ENVIRONMENT`  | [`EnvConfig::environment`] | `production` |
//! | `MONGO_DB_URI` | [`EnvConfig::store_uri`]   | unset        |
//!
//! # Example
//!
//! ```no_run
//! use tessera_config::ConfigLoader;
//!
//! # fn main() -> Result<(), tessera_config::ConfigError> {
//! let config = ConfigLoader::new()
//!     .with_dotenv()?
//!     .with_env()
//!     .load()?;
//!
//! println!("listening on port {}", config.server_port);
//! # Ok(())
//! # }
//! ```

#![doc(html_root_url = "https://docs.rs/tessera-config/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod config;
mod error;
mod loader;

pub use config::{
    EnvConfig, DEFAULT_ENVIRONMENT, DEFAULT_SERVER_PORT, DEVELOPMENT_ENVIRONMENT, ENVIRONMENT_VAR,
    SERVER_PORT_VAR, STORE_URI_VAR,
};
pub use error::ConfigError;
pub use loader::ConfigLoader;
