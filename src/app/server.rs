use crate::adapters::http::{self, AppState};
use crate::adapters::json_store::JsonFileStore;
use crate::config::ServerConfig;
use crate::core::coordinator::PairingCoordinator;
use crate::core::ConfigProvider;
use crate::utils::error::Result;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

/// Composition root: JSON store, coordinator and HTTP listener.
pub struct PairingServer {
    coordinator: Arc<PairingCoordinator<JsonFileStore>>,
    listener: TcpListener,
    bind_timeout: Option<Duration>,
}

impl PairingServer {
    pub async fn bind(config: &ServerConfig) -> Result<Self> {
        let store = JsonFileStore::open(config.store_path()).await?;
        let listener = TcpListener::bind(config.listen_addr()).await?;

        Ok(Self {
            coordinator: Arc::new(PairingCoordinator::new(store)),
            listener,
            bind_timeout: config.bind_timeout(),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    pub fn coordinator(&self) -> Arc<PairingCoordinator<JsonFileStore>> {
        Arc::clone(&self.coordinator)
    }

    /// Serve until `shutdown` resolves.
    ///
    /// On shutdown the coordinator is closed first: parked long-polls get a
    /// `cancelled` answer, and so does any bind arriving on a kept-alive
    /// connection while the server drains.
    pub async fn run<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let coordinator = Arc::clone(&self.coordinator);
        let shutdown = async move {
            shutdown.await;
            tracing::info!("Shutdown requested, releasing bind waiters");
            coordinator.close().await;
        };

        let router = http::router(AppState {
            coordinator: self.coordinator,
            bind_timeout: self.bind_timeout,
        });
        http::serve(self.listener, router, shutdown).await
    }
}
