//! File configuration for udsock.
//!
//! ```toml
//! [endpoint]
//! path = "/tmp/udsock.sock"
//! backlog = 10
//! nonblocking = false
//! cloexec = true
//!
//! [logging]
//! level = "debug"
//! format = "json"
//! ```

use crate::kind::{Kind, MAX_PATH_LEN, SocketFlags, SocketType};
use crate::logging::LogConfig;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

/// Default socket path used when neither the config nor the CLI names one.
pub const DEFAULT_SOCKET_PATH: &str = "/tmp/udsock.sock";

/// Default listen backlog.
pub const DEFAULT_BACKLOG: i32 = 10;

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-friendly output
    #[default]
    Pretty,
    /// JSON lines
    Json,
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pretty => f.write_str("pretty"),
            Self::Json => f.write_str("json"),
        }
    }
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            _ => Err(format!(
                "unknown log format: {s}. Expected one of: pretty, json"
            )),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config file not found: {0}")]
    NotFound(PathBuf),

    #[error("Failed to read config file {0}: {1}")]
    Read(PathBuf, #[source] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),
}

/// Endpoint settings shared by `serve` and the client commands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointConfig {
    pub path: PathBuf,
    pub backlog: i32,
    pub nonblocking: bool,
    pub cloexec: bool,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_SOCKET_PATH),
            backlog: DEFAULT_BACKLOG,
            nonblocking: false,
            cloexec: true,
        }
    }
}

impl EndpointConfig {
    /// Stream kind carrying the configured flags.
    pub fn kind(&self) -> Kind {
        let mut flags = SocketFlags::empty();
        flags.set(SocketFlags::NONBLOCK, self.nonblocking);
        flags.set(SocketFlags::CLOEXEC, self.cloexec);
        SocketType::Stream | flags
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let len = self.path.as_os_str().len();
        if len == 0 {
            return Err(ConfigError::Validation(
                "endpoint.path must not be empty".to_string(),
            ));
        }
        if len >= MAX_PATH_LEN {
            return Err(ConfigError::Validation(format!(
                "endpoint.path is {len} bytes, limit is {}",
                MAX_PATH_LEN - 1
            )));
        }
        if self.backlog <= 0 {
            return Err(ConfigError::Validation(format!(
                "endpoint.backlog must be positive, got {}",
                self.backlog
            )));
        }
        Ok(())
    }
}

/// Top-level configuration file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub endpoint: EndpointConfig,
    pub logging: LogConfig,
}

impl Config {
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|err| {
            if err.kind() == std::io::ErrorKind::NotFound {
                ConfigError::NotFound(path.to_path_buf())
            } else {
                ConfigError::Read(path.to_path_buf(), err)
            }
        })?;
        Self::from_toml_str(&contents)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.endpoint.validate()
    }
}
