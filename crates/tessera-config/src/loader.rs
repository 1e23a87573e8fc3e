//! Configuration loader with layered approach.
//!
//! This module provides the [`ConfigLoader`] for loading configuration from
//! multiple sources: defaults, a `.env` file, the process environment and
//! explicit variables.

use std::collections::HashMap;
use std::env;
use std::path::Path;

use crate::config::{ENVIRONMENT_VAR, SERVER_PORT_VAR, STORE_URI_VAR};
use crate::{ConfigError, EnvConfig};

/// Configuration loader with layered approach.
///
/// The loader collects variables in layers, with later layers overriding
/// earlier ones, then parses them into an [`EnvConfig`]:
/// 1. Default values (built into the code)
/// 2. A `.env` file, if present
/// 3. The process environment
/// 4. Explicit variables passed to [`with_vars`](Self::with_vars)
///
/// The `.env` layer is read without touching the process environment.
///
/// # Example
///
/// ```
/// use tessera_config::ConfigLoader;
///
/// let config = ConfigLoader::new()
///     .with_vars([("SERVER_PORT", "9000"), ("ENVIRONMENT", "dev")])
///     .load()
///     .unwrap();
///
/// assert_eq!(config.server_port, 9000);
/// assert!(config.is_development());
/// ```
#[derive(Debug, Default)]
pub struct ConfigLoader {
    vars: HashMap<String, String>,
}

impl ConfigLoader {
    /// Create a new configuration loader holding only defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Layer variables from a `.env` file in the current directory or its
    /// parents.
    ///
    /// A missing file is not an error.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Dotenv` if the file exists but cannot be parsed.
    pub fn with_dotenv(self) -> Result<Self, ConfigError> {
        match dotenvy::dotenv_iter() {
            Ok(iter) => self.extend_from_dotenv(iter),
            Err(e) if e.not_found() => Ok(self),
            Err(e) => Err(e.into()),
        }
    }

    /// Layer variables from a specific `.env` file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Dotenv` if the file cannot be read or parsed.
    pub fn with_dotenv_file<P: AsRef<Path>>(self, path: P) -> Result<Self, ConfigError> {
        let iter = dotenvy::from_path_iter(path)?;
        self.extend_from_dotenv(iter)
    }

    /// Layer the process environment.
    #[must_use]
    pub fn with_env(mut self) -> Self {
        for key in [SERVER_PORT_VAR, ENVIRONMENT_VAR, STORE_URI_VAR] {
            if let Ok(value) = env::var(key) {
                self.vars.insert(key.to_string(), value);
            }
        }
        self
    }

    /// Layer explicit variables.
    ///
    /// Tests use this instead of mutating the process environment.
    #[must_use]
    pub fn with_vars<I, K, V>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.vars
            .extend(vars.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Finalize and return the loaded configuration.
    ///
    /// Empty values are treated as unset.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::EnvParse` if `SERVER_PORT` is not a valid port.
    pub fn load(self) -> Result<EnvConfig, ConfigError> {
        let mut config = EnvConfig::default();

        if let Some(port) = self.get(SERVER_PORT_VAR) {
            config.server_port = port
                .trim()
                .parse()
                .map_err(|_| ConfigError::env_parse_error(SERVER_PORT_VAR, "expected port number"))?;
        }

        if let Some(environment) = self.get(ENVIRONMENT_VAR) {
            config.environment = environment.to_string();
        }

        config.store_uri = self.get(STORE_URI_VAR).map(ToString::to_string);

        Ok(config)
    }

    fn get(&self, key: &str) -> Option<&str> {
        self.vars
            .get(key)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    fn extend_from_dotenv<R: std::io::Read>(
        mut self,
        iter: dotenvy::Iter<R>,
    ) -> Result<Self, ConfigError> {
        for item in iter {
            let (key, value) = item?;
            self.vars.insert(key, value);
        }
        Ok(self)
    }
}
