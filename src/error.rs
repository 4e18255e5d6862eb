//! Harness error types.
//!
//! Only conditions that stop the harness from doing its job are errors here.
//! Script-level problems (an unresolvable `call`, a malformed `cli-setting`)
//! are reported through `tracing` and handled by the engine, and remote
//! failures are session outcomes rather than errors.

use std::time::Duration;

use thiserror::Error;

/// Harness errors.
#[derive(Error, Debug)]
pub enum HarnessError {
    /// Configuration could not be read or parsed.
    #[error("Config error: {0}")]
    Config(String),

    /// The TCP connection to the target could not be established.
    #[error("Failed to connect to {addr}: {source}")]
    Connect {
        /// Target address as given by the operator.
        addr: String,
        /// Underlying socket error.
        #[source]
        source: std::io::Error,
    },

    /// The target did not accept the connection in time.
    #[error("Failed to connect to the host within {}s", .0.as_secs())]
    ConnectTimeout(Duration),

    /// A `call` target could not be opened relative to either search root.
    #[error("Script not found: {0}")]
    ScriptNotFound(String),

    /// A `cli-setting` value does not match the kind its key expects.
    #[error("Invalid setting: {0}")]
    InvalidSetting(String),

    /// Engine misuse, such as retransmitting before anything was sent.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// I/O error on a script, the result log or the socket.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl HarnessError {
    /// Whether this error happened before a session could start.
    ///
    /// Setup failures abort the process without closing the result log.
    pub fn is_setup_failure(&self) -> bool {
        matches!(self, Self::Connect { .. } | Self::ConnectTimeout(_))
    }
}

/// Result type alias for harness operations
pub type Result<T> = std::result::Result<T, HarnessError>;

impl From<toml::de::Error> for HarnessError {
    fn from(err: toml::de::Error) -> Self {
        HarnessError::Config(err.to_string())
    }
}
