use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use crate::agent::output_log::DEFAULT_OUTPUT_PATH;
use crate::transport::websocket::{Endpoint, DEFAULT_CONNECT_TIMEOUT, DEFAULT_ENDPOINT};

pub const ENDPOINT_ENV: &str = "MESSAGE_LOGGER_ENDPOINT";
pub const OUTPUT_ENV: &str = "MESSAGE_LOGGER_OUTPUT";
pub const STATUS_PORT_ENV: &str = "MESSAGE_LOGGER_STATUS_PORT";

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

fn default_output_path() -> PathBuf {
    PathBuf::from(DEFAULT_OUTPUT_PATH)
}

fn default_connect_timeout_secs() -> u64 {
    DEFAULT_CONNECT_TIMEOUT.as_secs()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// WebSocket address to read messages from.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// CSV file every message is appended to.
    #[serde(default = "default_output_path")]
    pub output_path: PathBuf,

    /// Port of the local status API; disabled when absent.
    #[serde(default)]
    pub status_port: Option<u16>,

    /// Seconds to wait for the WebSocket handshake before giving up.
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            output_path: default_output_path(),
            status_port: None,
            connect_timeout_secs: default_connect_timeout_secs(),
        }
    }
}

impl Config {
    pub fn from_file(path: &str) -> Result<Self> {
        let raw = fs::read_to_string(path).with_context(|| format!("reading config file {path}"))?;
        let cfg: Config = serde_json::from_str(&raw).context("parsing JSON config")?;
        Ok(cfg)
    }

    /// Defaults, then the config file when one is given.
    pub fn load(path: Option<&str>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }

    /// Apply `MESSAGE_LOGGER_*` overrides from the process environment.
    pub fn apply_env(self) -> Result<Self> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    pub fn apply_overrides<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(endpoint) = lookup(ENDPOINT_ENV) {
            self.endpoint = endpoint;
        }
        if let Some(output) = lookup(OUTPUT_ENV) {
            self.output_path = PathBuf::from(output);
        }
        if let Some(port) = lookup(STATUS_PORT_ENV) {
            let port = port
                .trim()
                .parse::<u16>()
                .with_context(|| format!("{STATUS_PORT_ENV} is not a port number: {port:?}"))?;
            self.status_port = Some(port);
        }
        Ok(self)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    /// Check the endpoint syntax without connecting.
    pub fn validate(&self) -> Result<Endpoint> {
        Endpoint::parse(&self.endpoint).context("validating endpoint")
    }
}
