//! HTTP server configuration and startup

use std::net::SocketAddr;

use anyhow::Context;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tracing::info;

use oracle_core::ServerConfig;

use crate::api::create_router;
use crate::service::OracleService;

/// HTTP server wrapper
pub struct HttpServer {
    config: ServerConfig,
    service: OracleService,
}

impl HttpServer {
    pub fn new(config: ServerConfig, service: OracleService) -> Self {
        Self { config, service }
    }

    /// Get reference to the service
    pub fn service(&self) -> &OracleService {
        &self.service
    }

    /// Serve until `shutdown` fires or its sender is dropped
    pub async fn start_with_shutdown(&self, shutdown: oneshot::Receiver<()>) -> anyhow::Result<()> {
        let addr: SocketAddr = self
            .address()
            .parse()
            .with_context(|| format!("invalid listen address {}", self.address()))?;

        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("binding {}", addr))?;

        info!("Starting HTTP server on {} (with graceful shutdown)", listener.local_addr()?);

        axum::serve(listener, create_router(self.service.clone()))
            .with_graceful_shutdown(async {
                shutdown.await.ok();
                info!("Shutdown signal received");
            })
            .await?;

        Ok(())
    }

    /// Get server address
    pub fn address(&self) -> String {
        format!("{}:{}", self.config.host, self.config.port)
    }
}

/// Builder for server configuration
pub struct HttpServerBuilder {
    config: ServerConfig,
    service: OracleService,
}

impl HttpServerBuilder {
    pub fn new(service: OracleService) -> Self {
        Self {
            config: ServerConfig::default(),
            service,
        }
    }

    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.config.host = host.into();
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    pub fn build(self) -> HttpServer {
        HttpServer::new(self.config, self.service)
    }
}
