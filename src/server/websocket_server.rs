use crate::config::Config;
use crate::model::Result;
use crate::server::{
    create_router, BroadcastHub, ConnectionHandler, ConnectionRepository, MemoryStorage,
    RenderShell, StaticShell,
};
use axum::Router;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::info;

/// The relay: registry, hub and routes wired from one [`Config`].
pub struct WebSocketServer {
    config: Config,
    connection_handler: ConnectionHandler,
    shell: Arc<dyn RenderShell>,
    shutdown: watch::Sender<bool>,
}

impl WebSocketServer {
    pub fn new(config: Config) -> Self {
        Self::with_repository(config, Arc::new(MemoryStorage::new()))
    }

    pub fn with_repository(config: Config, connection_repo: Arc<dyn ConnectionRepository>) -> Self {
        let (shutdown, shutdown_rx) = watch::channel(false);
        let hub = BroadcastHub::new(connection_repo, config.slow_consumer);
        let connection_handler = ConnectionHandler::new(hub, &config, shutdown_rx);
        WebSocketServer {
            config,
            connection_handler,
            shell: Arc::new(StaticShell),
            shutdown,
        }
    }

    pub fn with_shell(mut self, shell: Arc<dyn RenderShell>) -> Self {
        self.shell = shell;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn connection_repo(&self) -> &Arc<dyn ConnectionRepository> {
        self.connection_handler.connection_repo()
    }

    pub fn router(&self) -> Router {
        create_router(self.connection_handler.clone(), self.shell.clone())
    }

    /// Checks the configuration and binds the listening socket.
    pub async fn bind(&self) -> Result<TcpListener> {
        let config = self.config.clone().validated()?;
        Ok(TcpListener::bind(config.address()).await?)
    }

    /// Serves until `signal` resolves, then closes every open session.
    pub async fn run<F>(self, listener: TcpListener, signal: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let address: SocketAddr = listener.local_addr()?;
        info!("Relay listening on http://{}", address);

        let shutdown = self.shutdown.clone();
        axum::serve(listener, self.router())
            .with_graceful_shutdown(async move {
                signal.await;
                info!("Shutdown requested");
                let _ = shutdown.send(true);
            })
            .await?;

        info!("Relay stopped");
        Ok(())
    }
}

/// Resolves on ctrl-c.
pub async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = ?e, "Failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
}
