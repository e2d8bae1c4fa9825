//! Relay configuration.
//!
//! Reads configuration from environment variables:
//! - `GRML_HOST`: listen address (default: "0.0.0.0")
//! - `GRML_PORT`: listen port (default: "7000")

use crate::error::RelayError;

pub const HOST_VAR: &str = "GRML_HOST";
pub const PORT_VAR: &str = "GRML_PORT";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayConfig {
    pub host: String,
    pub port: u16,
}

impl Default for RelayConfig {
    fn default() -> Self {
        RelayConfig {
            host: "0.0.0.0".to_string(),
            port: 7000,
        }
    }
}

impl RelayConfig {
    pub fn from_env() -> Result<Self, RelayError> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    pub fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, RelayError> {
        let mut config = RelayConfig::default();
        if let Some(host) = lookup(HOST_VAR) {
            config.host = host;
        }
        if let Some(port) = lookup(PORT_VAR) {
            config.port = port.trim().parse().map_err(|_| RelayError::Config {
                key: PORT_VAR.to_string(),
                value: port.clone(),
            })?;
        }
        Ok(config)
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
