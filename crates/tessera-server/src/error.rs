//! Transport host errors.

use thiserror::Error;

/// Errors raised while starting the transport host.
///
/// Failures after startup (connection errors, drain timeouts) are logged,
/// not returned.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The configured address could not be parsed.
    #[error("invalid address '{addr}': {reason}")]
    InvalidAddress {
        /// The configured address
        addr: String,
        /// Why it was rejected
        reason: String,
    },

    /// The listener could not be bound.
    #[error("failed to bind {addr}")]
    Bind {
        /// The address that could not be bound
        addr: std::net::SocketAddr,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Environment configuration could not be loaded.
    #[error(transparent)]
    Config(#[from] tessera_config::ConfigError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let err = ServerError::InvalidAddress {
            addr: "nope".to_string(),
            reason: "invalid socket address syntax".to_string(),
        };
        assert!(err.to_string().contains("invalid address 'nope'"));

        let err = ServerError::Bind {
            addr: "127.0.0.1:80".parse().unwrap(),
            source: std::io::Error::from(std::io::ErrorKind::AddrInUse),
        };
        assert_eq!(err.to_string(), "failed to bind 127.0.0.1:80");
        assert!(std::error::Error::source(&err).is_some());
    }
}
