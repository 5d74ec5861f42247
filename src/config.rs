use crate::error::{LinkError, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use tokio::fs;

/// Connection settings for one telemetry link.
///
/// Host and port are fixed for the lifetime of a client; they are not
/// re-read during a run.
#[derive(Debug, Clone, Deserialize)]
pub struct LinkConfig {
    pub host: String,
    pub port: u16,
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    #[serde(default = "default_backoff_floor_ms")]
    pub backoff_floor_ms: u64,
    #[serde(default = "default_backoff_ceiling_ms")]
    pub backoff_ceiling_ms: u64,
}

fn default_connect_timeout_ms() -> u64 {
    2000
}
fn default_backoff_floor_ms() -> u64 {
    1000
}
fn default_backoff_ceiling_ms() -> u64 {
    5000
}

impl LinkConfig {
    /// Creates a config for `host:port` with default timeouts and backoff.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            connect_timeout_ms: default_connect_timeout_ms(),
            backoff_floor_ms: default_backoff_floor_ms(),
            backoff_ceiling_ms: default_backoff_ceiling_ms(),
        }
    }

    /// Loads and validates a config from a TOML file.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .await
            .map_err(|e| LinkError::config(format!("failed to read config file: {e}")))?;
        Self::parse(&content)
    }

    /// Parses and validates a config from a TOML string.
    pub fn parse(content: &str) -> Result<Self> {
        let config: LinkConfig = toml::from_str(content)
            .map_err(|e| LinkError::config(format!("failed to parse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            return Err(LinkError::config("host must not be empty"));
        }
        if self.port == 0 {
            return Err(LinkError::config("port must be non-zero"));
        }
        if self.backoff_floor_ms == 0 {
            return Err(LinkError::config("backoff_floor_ms must be non-zero"));
        }
        if self.backoff_ceiling_ms < self.backoff_floor_ms {
            return Err(LinkError::config(format!(
                "backoff_ceiling_ms ({}) below backoff_floor_ms ({})",
                self.backoff_ceiling_ms, self.backoff_floor_ms
            )));
        }
        Ok(())
    }

    /// `host:port` rendering used for connects and log lines.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn backoff_floor(&self) -> Duration {
        Duration::from_millis(self.backoff_floor_ms)
    }

    pub fn backoff_ceiling(&self) -> Duration {
        Duration::from_millis(self.backoff_ceiling_ms)
    }
}
