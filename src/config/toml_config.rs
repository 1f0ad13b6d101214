use crate::config::ServerConfig;
use crate::utils::error::{PairingError, Result};
use crate::utils::validation::Validate;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::OnceLock;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TomlConfig {
    #[serde(default)]
    pub server: Option<ServerSection>,
    #[serde(default)]
    pub store: Option<StoreSection>,
    #[serde(default)]
    pub pairing: Option<PairingSection>,
    #[serde(default)]
    pub logging: Option<LoggingSection>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSection {
    pub listen_addr: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreSection {
    pub path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PairingSection {
    pub bind_timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSection {
    pub verbose: Option<bool>,
    pub json: Option<bool>,
}

fn env_var_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\$\{([^}]+)\}").expect("static pattern"))
}

impl TomlConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(PairingError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content);

        toml::from_str(&processed_content).map_err(|e| PairingError::ConfigError {
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${STORE_PATH})，未設定的變數保持原樣
    fn substitute_env_vars(content: &str) -> String {
        env_var_pattern()
            .replace_all(content, |caps: &regex::Captures| {
                let var_name = &caps[1];
                std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
            })
            .into_owned()
    }

    /// Layer the file values over the built-in defaults.
    pub fn to_server_config(&self) -> ServerConfig {
        let defaults = ServerConfig::default();
        ServerConfig {
            listen_addr: self
                .server
                .as_ref()
                .and_then(|s| s.listen_addr.clone())
                .unwrap_or(defaults.listen_addr),
            store_path: self
                .store
                .as_ref()
                .and_then(|s| s.path.clone())
                .unwrap_or(defaults.store_path),
            bind_timeout_seconds: self
                .pairing
                .as_ref()
                .and_then(|p| p.bind_timeout_seconds)
                .unwrap_or(defaults.bind_timeout_seconds),
            verbose: self
                .logging
                .as_ref()
                .and_then(|l| l.verbose)
                .unwrap_or(defaults.verbose),
            json_logs: self
                .logging
                .as_ref()
                .and_then(|l| l.json)
                .unwrap_or(defaults.json_logs),
        }
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        self.to_server_config().validate()
    }
}
