// src/config.rs

//! Client configuration: loading from TOML, defaults and validation.

use crate::core::dispatcher::ErrorRouting;
use crate::core::protocol::ipp_line::DEFAULT_MAX_LINE_LENGTH;
use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use std::fs;
use std::time::Duration;
use tracing::warn;

/// The smallest line limit that still fits a tag, a marker and a payload.
const MIN_LINE_LENGTH: usize = 16;

fn default_host() -> String {
    "127.0.0.1".to_string()
}
fn default_port() -> u16 {
    1294
}
fn default_connect_timeout() -> Duration {
    Duration::from_secs(3)
}
fn default_write_timeout() -> Duration {
    Duration::from_secs(3)
}
fn default_max_line_length() -> usize {
    DEFAULT_MAX_LINE_LENGTH
}
fn default_log_level() -> String {
    "info".to_string()
}

/// Everything needed to reach and talk to an I++ server.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Config {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// How long to wait for the TCP handshake.
    #[serde(with = "humantime_serde", default = "default_connect_timeout")]
    pub connect_timeout: Duration,
    /// How long a single command write may stall before the connection is
    /// considered dead.
    #[serde(with = "humantime_serde", default = "default_write_timeout")]
    pub write_timeout: Duration,
    /// Upper bound on one inbound line, terminator excluded.
    #[serde(default = "default_max_line_length")]
    pub max_line_length: usize,
    #[serde(default)]
    pub error_routing: ErrorRouting,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            connect_timeout: default_connect_timeout(),
            write_timeout: default_write_timeout(),
            max_line_length: default_max_line_length(),
            error_routing: ErrorRouting::default(),
            log_level: default_log_level(),
        }
    }
}

impl Config {
    /// Loads and validates a configuration from a TOML file.
    pub fn from_file(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file at '{path}'"))?;
        let config = Self::from_toml(&contents)
            .with_context(|| format!("Invalid configuration in '{path}'"))?;
        Ok(config)
    }

    /// Parses and validates a configuration from TOML text.
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents).context("Failed to parse TOML")?;
        config.validate()?;
        Ok(config)
    }

    /// `host:port`, suitable for `TcpStream::connect`.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn validate(&self) -> Result<()> {
        if self.port == 0 {
            return Err(anyhow!("port cannot be 0"));
        }
        if self.host.trim().is_empty() {
            return Err(anyhow!("host cannot be empty"));
        }
        if self.connect_timeout.is_zero() {
            return Err(anyhow!("connect_timeout must be greater than 0"));
        }
        if self.write_timeout.is_zero() {
            return Err(anyhow!("write_timeout must be greater than 0"));
        }
        if self.max_line_length < MIN_LINE_LENGTH {
            return Err(anyhow!(
                "max_line_length must be at least {MIN_LINE_LENGTH}, got {}",
                self.max_line_length
            ));
        }
        if self.error_routing == ErrorRouting::Strict {
            warn!(
                "error_routing is strict: error lines from servers that do not echo the command tag will be dropped."
            );
        }
        Ok(())
    }
}
