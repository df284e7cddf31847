use crate::error::{ConfigError, Result};
use std::env;

/// Bytes requested from the socket per receive. Larger messages are
/// truncated to this size.
pub const READ_BUFFER_SIZE: usize = 1 << 20;

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 1337;

pub const HOST_ENV: &str = "KOSA_HOST";
pub const PORT_ENV: &str = "KOSA_PORT";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub host: String,
    pub port: u16,
    pub read_buffer_size: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            read_buffer_size: READ_BUFFER_SIZE,
        }
    }
}

impl ClientConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Self::default()
        }
    }

    /// Defaults overlaid with `KOSA_HOST` and `KOSA_PORT`.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(host) = lookup(HOST_ENV) {
            config.host = host;
        }
        if let Some(port) = lookup(PORT_ENV) {
            config.port = parse_port(&port)?;
        }
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            return Err(ConfigError::EmptyHost.into());
        }
        if self.read_buffer_size == 0 {
            return Err(ConfigError::ZeroBufferSize.into());
        }
        Ok(())
    }
}

pub fn parse_port(raw: &str) -> Result<u16> {
    raw.trim()
        .parse::<u16>()
        .map_err(|_| ConfigError::InvalidPort(raw.to_string()).into())
}
