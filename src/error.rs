//! Error types for the telemetry link.
//!
//! The client itself never surfaces these to its consumer: transient failures
//! feed the reconnect cycle and are reported through the log callback. The
//! structured variants exist for the configuration path and for internal
//! plumbing between the read loop and the connection manager.

use std::io;
use thiserror::Error;

/// Error type covering every failure mode of the telemetry link.
#[derive(Error, Debug)]
pub enum LinkError {
    /// Configuration errors (parsing, validation, missing files)
    #[error("Configuration error: {0}")]
    Config(String),

    /// TCP connect failures (refused, unreachable)
    #[error("Connect to '{addr}' failed: {source}")]
    Connect {
        /// Address the connect attempt targeted
        addr: String,
        /// Underlying I/O error
        #[source]
        source: io::Error,
    },

    /// Connect attempts that exceeded the configured timeout
    #[error("Connect to '{addr}' timed out")]
    ConnectTimeout {
        /// Address the connect attempt targeted
        addr: String,
    },

    /// I/O errors on an established connection
    #[error("Link I/O error: {0}")]
    Io(#[from] io::Error),

    /// Stream-level termination (EOF, peer reset) with a readable reason
    #[error("Stream ended: {0}")]
    Stream(String),
}

/// Type alias for Results that use LinkError
pub type Result<T> = std::result::Result<T, LinkError>;

impl LinkError {
    /// Create a new configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a new connect error
    pub fn connect(addr: impl Into<String>, source: io::Error) -> Self {
        Self::Connect {
            addr: addr.into(),
            source,
        }
    }

    /// Create a new connect-timeout error
    pub fn connect_timeout(addr: impl Into<String>) -> Self {
        Self::ConnectTimeout { addr: addr.into() }
    }

    /// Create a new stream-termination error
    pub fn stream(msg: impl Into<String>) -> Self {
        Self::Stream(msg.into())
    }
}
