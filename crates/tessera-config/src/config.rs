//! Configuration values.

use serde::{Deserialize, Serialize};

/// Variable holding the listening port.
pub const SERVER_PORT_VAR: &str = "SERVER_PORT";

/// Variable selecting the runtime environment.
pub const ENVIRONMENT_VAR: &str = "ENVIRONMENT";

/// Variable holding the document store connection string.
pub const STORE_URI_VAR: &str = "MONGO_DB_URI";

/// Port used when `SERVER_PORT` is unset.
pub const DEFAULT_SERVER_PORT: u16 = 8080;

/// Environment used when `ENVIRONMENT` is unset.
pub const DEFAULT_ENVIRONMENT: &str = "production";

/// Environment value that selects human-readable logs.
pub const DEVELOPMENT_ENVIRONMENT: &str = "dev";

/// Settings a service reads from its environment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EnvConfig {
    /// Port the transport host listens on.
    #[serde(default = "default_server_port")]
    pub server_port: u16,

    /// Runtime environment name, `dev` for local development.
    #[serde(default = "default_environment")]
    pub environment: String,

    /// Document store connection string. Only consulted when no explicit
    /// connection options are supplied.
    #[serde(default)]
    pub store_uri: Option<String>,
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self {
            server_port: DEFAULT_SERVER_PORT,
            environment: DEFAULT_ENVIRONMENT.to_string(),
            store_uri: None,
        }
    }
}

impl EnvConfig {
    /// Returns `true` when running in the development environment.
    #[must_use]
    pub fn is_development(&self) -> bool {
        self.environment == DEVELOPMENT_ENVIRONMENT
    }
}

fn default_server_port() -> u16 {
    DEFAULT_SERVER_PORT
}

fn default_environment() -> String {
    DEFAULT_ENVIRONMENT.to_string()
}
