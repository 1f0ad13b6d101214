#[cfg(feature = "cli")]
pub mod cli;
pub mod toml_config;

use crate::core::ConfigProvider;
use crate::utils::error::Result;
use crate::utils::validation::{
    validate_file_extension, validate_path, validate_range, validate_socket_addr, Validate,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:5080";
pub const DEFAULT_STORE_PATH: &str = "./database.json";
/// Upper bound for a configured long-poll timeout (one day).
pub const MAX_BIND_TIMEOUT_SECS: u64 = 86_400;

/// Fully resolved server settings, after file and flag overrides.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    pub listen_addr: String,
    pub store_path: String,
    /// 0 disables the server-side timeout.
    pub bind_timeout_seconds: u64,
    pub verbose: bool,
    pub json_logs: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: DEFAULT_LISTEN_ADDR.to_string(),
            store_path: DEFAULT_STORE_PATH.to_string(),
            bind_timeout_seconds: 0,
            verbose: false,
            json_logs: false,
        }
    }
}

impl ConfigProvider for ServerConfig {
    fn listen_addr(&self) -> &str {
        &self.listen_addr
    }

    fn store_path(&self) -> &str {
        &self.store_path
    }

    fn bind_timeout(&self) -> Option<Duration> {
        (self.bind_timeout_seconds > 0).then(|| Duration::from_secs(self.bind_timeout_seconds))
    }
}

impl Validate for ServerConfig {
    fn validate(&self) -> Result<()> {
        validate_socket_addr("server.listen_addr", &self.listen_addr)?;
        validate_path("store.path", &self.store_path)?;
        validate_file_extension("store.path", &self.store_path, &["json"])?;
        validate_range(
            "pairing.bind_timeout_seconds",
            self.bind_timeout_seconds,
            0,
            MAX_BIND_TIMEOUT_SECS,
        )?;
        Ok(())
    }
}
