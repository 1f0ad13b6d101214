// Adapters layer: concrete implementations for external systems (stores, http server, reader client).

pub mod http;
pub mod json_store;
pub mod memory_store;
pub mod reader_client;
