//! Configuration management.
//!
//! Supports configuration from:
//! - TOML config files
//! - Environment variables
//! - CLI arguments (applied by the binary on top of the loaded config)
//!
//! This is process configuration only. The per-script Settings Store lives in
//! [`crate::protocol::Settings`] and is driven by `cli-setting` directives.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{HarnessError, Result};

/// Default connect timeout, in seconds
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 30;

/// Default bound on nested `call` depth, root script included
pub const DEFAULT_MAX_CALL_DEPTH: usize = 100;

/// Default longest line read from a script or from the target
pub const DEFAULT_MAX_LINE_LENGTH: usize = 1024;

/// Main configuration struct
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Target connection configuration
    #[serde(default)]
    pub connection: ConnectionConfig,

    /// Script reader configuration
    #[serde(default)]
    pub script: ScriptConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let content = std::fs::read_to_string(&path)
            .map_err(|e| HarnessError::Config(format!("Failed to read config file: {e}")))?;

        toml::from_str(&content)
            .map_err(|e| HarnessError::Config(format!("Failed to parse config: {e}")))
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(host) = std::env::var("CASCADES_HOST") {
            config.connection.host = host;
        }
        if let Ok(port) = std::env::var("CASCADES_PORT") {
            if let Ok(port) = port.parse() {
                config.connection.port = port;
            }
        }
        if let Ok(secs) = std::env::var("CASCADES_CONNECT_TIMEOUT_SECS") {
            if let Ok(secs) = secs.parse() {
                config.connection.connect_timeout_secs = secs;
            }
        }
        if let Ok(depth) = std::env::var("CASCADES_MAX_CALL_DEPTH") {
            if let Ok(depth) = depth.parse() {
                config.script.max_call_depth = depth;
            }
        }

        config
    }

    /// Default config file location, `<config_dir>/cascades-cli/config.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("cascades-cli").join("config.toml"))
    }

    /// Load file config (explicit path, or the default location if present)
    /// and overlay the environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file = match path {
            Some(path) => Self::from_file(path)?,
            None => match Self::default_path() {
                Some(path) if path.is_file() => Self::from_file(path)?,
                _ => Self::default(),
            },
        };
        Ok(file.merge(Self::from_env()))
    }

    /// Merge with another config (other takes precedence)
    pub fn merge(self, other: Self) -> Self {
        let defaults = Self::default();
        Self {
            connection: ConnectionConfig {
                host: if other.connection.host != defaults.connection.host {
                    other.connection.host
                } else {
                    self.connection.host
                },
                port: if other.connection.port != defaults.connection.port {
                    other.connection.port
                } else {
                    self.connection.port
                },
                connect_timeout_secs: if other.connection.connect_timeout_secs
                    != defaults.connection.connect_timeout_secs
                {
                    other.connection.connect_timeout_secs
                } else {
                    self.connection.connect_timeout_secs
                },
            },
            script: ScriptConfig {
                max_call_depth: if other.script.max_call_depth != defaults.script.max_call_depth {
                    other.script.max_call_depth
                } else {
                    self.script.max_call_depth
                },
                max_line_length: if other.script.max_line_length
                    != defaults.script.max_line_length
                {
                    other.script.max_line_length
                } else {
                    self.script.max_line_length
                },
            },
            logging: LoggingConfig {
                level: if other.logging.level != defaults.logging.level {
                    other.logging.level
                } else {
                    self.logging.level
                },
                json: other.logging.json || self.logging.json,
            },
        }
    }
}

/// Target connection configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    /// Target host name or address
    pub host: String,

    /// Target port
    pub port: u16,

    /// Seconds to wait for the connection before aborting
    pub connect_timeout_secs: u64,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 15000,
            connect_timeout_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
        }
    }
}

impl ConnectionConfig {
    /// Get the full target address
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Connect timeout as a duration
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

/// Script reader configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScriptConfig {
    /// Maximum number of simultaneously open scripts
    pub max_call_depth: usize,

    /// Longest single line read from a script or the socket
    pub max_line_length: usize,
}

impl Default for ScriptConfig {
    fn default() -> Self {
        Self {
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
            max_line_length: DEFAULT_MAX_LINE_LENGTH,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset
    pub level: String,

    /// Emit JSON formatted log lines
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.connection.port, 15000);
        assert_eq!(config.connection.connect_timeout(), Duration::from_secs(30));
        assert_eq!(config.script.max_call_depth, 100);
        assert_eq!(config.script.max_line_length, 1024);
        assert!(!config.logging.json);
    }

    #[test]
    fn test_connection_addr() {
        let config = ConnectionConfig::default();
        assert_eq!(config.addr(), "127.0.0.1:15000");
    }

    #[test]
    fn test_config_from_toml() {
        let toml = r#"
            [connection]
            host = "192.168.0.20"
            port = 9090

            [script]
            max_call_depth = 8
        "#;

        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.connection.host, "192.168.0.20");
        assert_eq!(config.connection.port, 9090);
        assert_eq!(config.connection.connect_timeout_secs, 30);
        assert_eq!(config.script.max_call_depth, 8);
        assert_eq!(config.script.max_line_length, 1024);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_config_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[logging]\nlevel = \"debug\"\njson = true\n").unwrap();

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.logging.level, "debug");
        assert!(config.logging.json);
    }

    #[test]
    fn test_config_from_missing_file() {
        let result = Config::from_file("/nonexistent/cascades/config.toml");
        assert!(matches!(result, Err(HarnessError::Config(_))));
    }

    #[test]
    fn test_merge_prefers_non_default_values() {
        let mut base = Config::default();
        base.connection.host = "10.0.0.1".to_string();
        base.script.max_call_depth = 5;

        let mut overlay = Config::default();
        overlay.connection.port = 4000;

        let merged = base.merge(overlay);
        assert_eq!(merged.connection.host, "10.0.0.1");
        assert_eq!(merged.connection.port, 4000);
        assert_eq!(merged.script.max_call_depth, 5);
    }
}
