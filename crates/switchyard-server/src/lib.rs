mod health;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use switchyard_config::Config;
use switchyard_llm::LlmState;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;

use crate::health::HealthReport;

/// Assembled server with all routes and middleware
pub struct Server {
    router: Router,
    llm_state: LlmState,
    listen_address: SocketAddr,
}

impl Server {
    /// Build the server from configuration
    ///
    /// Provider catalogs are discovered once before this returns.
    ///
    /// # Errors
    ///
    /// Returns an error if LLM state initialization fails
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let listen_address = config.server.listen_address();
        let llm_state = LlmState::from_config(&config).await?;

        let mut app = Router::new();

        if config.server.health.enabled {
            let report = HealthReport::new(llm_state.provider_names(), llm_state.default_provider());
            app = app.route(
                &config.server.health.path,
                axum::routing::get(health::health_handler).with_state(Arc::new(report)),
            );
        }

        app = app.merge(switchyard_llm::llm_router(llm_state.clone()));
        app = app.layer(TraceLayer::new_for_http());

        Ok(Self {
            router: app,
            llm_state,
            listen_address,
        })
    }

    /// Override the configured listen address
    #[must_use]
    pub fn with_listen_address(mut self, listen_address: SocketAddr) -> Self {
        self.listen_address = listen_address;
        self
    }

    /// Get the configured listen address
    #[must_use]
    pub const fn listen_address(&self) -> SocketAddr {
        self.listen_address
    }

    /// Consume the server and return the inner router
    ///
    /// Useful for testing when the caller manages the listener.
    /// Catalog refresh is not started.
    pub fn into_router(self) -> Router {
        self.router
    }

    /// Start serving requests
    ///
    /// Blocks until the cancellation token is triggered. Catalog refresh
    /// runs in the background for the lifetime of the server.
    ///
    /// # Errors
    ///
    /// Returns an error if binding the TCP listener or serving fails
    pub async fn serve(self, shutdown: CancellationToken) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(self.listen_address).await?;
        let local_addr = listener.local_addr()?;
        tracing::info!(%local_addr, "server listening");

        let discovery = self.llm_state.start_discovery(shutdown.child_token());

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                shutdown.cancelled().await;
                tracing::info!("graceful shutdown initiated");
            })
            .await?;

        if let Err(e) = discovery.await {
            tracing::warn!(error = %e, "catalog refresher ended abnormally");
        }

        Ok(())
    }
}
