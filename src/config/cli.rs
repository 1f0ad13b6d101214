use crate::config::toml_config::TomlConfig;
use crate::config::ServerConfig;
use crate::utils::error::Result;
use clap::Parser;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize, Parser)]
#[command(name = "wardrobe-pairing")]
#[command(about = "Pairs RFID/NFC tag scans with wardrobe items and hangers")]
pub struct CliConfig {
    /// Path to a TOML configuration file
    #[arg(short, long)]
    pub config: Option<String>,

    /// Address the HTTP API binds to (host:port)
    #[arg(long)]
    pub listen_addr: Option<String>,

    /// JSON file holding the items and hangers tables
    #[arg(long)]
    pub store_path: Option<String>,

    /// Seconds a bind long-poll may wait before answering `timeout` (0 = no limit)
    #[arg(long)]
    pub bind_timeout_secs: Option<u64>,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Emit logs as JSON lines")]
    pub json_logs: bool,
}

impl CliConfig {
    /// 合併設定：預設值 < TOML 檔案 < 命令列參數
    pub fn resolve(&self) -> Result<ServerConfig> {
        let mut config = match &self.config {
            Some(path) => TomlConfig::from_file(path)?.to_server_config(),
            None => ServerConfig::default(),
        };

        if let Some(listen_addr) = &self.listen_addr {
            config.listen_addr = listen_addr.clone();
        }
        if let Some(store_path) = &self.store_path {
            config.store_path = store_path.clone();
        }
        if let Some(timeout) = self.bind_timeout_secs {
            config.bind_timeout_seconds = timeout;
        }
        config.verbose |= self.verbose;
        config.json_logs |= self.json_logs;

        Ok(config)
    }
}
