pub mod adapters;
pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::cli::CliConfig;

pub use adapters::{json_store::JsonFileStore, memory_store::MemoryStore, reader_client::ReaderClient};
pub use app::server::PairingServer;
pub use config::ServerConfig;
pub use crate::core::coordinator::{BindHandle, PairingCoordinator};
pub use utils::error::{PairingError, Result};
