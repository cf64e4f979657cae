//! HTTP server for the conversion service

pub mod routes;
pub mod state;

use axum::Router;
use std::net::SocketAddr;
use std::time::Duration;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::config::AppConfig;
use crate::error::{Error, Result};
use state::AppState;

/// Conversion HTTP server
pub struct DocServer {
    config: AppConfig,
    state: AppState,
}

impl DocServer {
    /// Create a new server, detecting the installed conversion tools
    pub fn new(config: AppConfig) -> Result<Self> {
        let state = AppState::new(config.clone())?;
        Ok(Self { config, state })
    }

    /// Create a server over prepared state
    pub fn with_state(state: AppState) -> Self {
        Self {
            config: state.config().clone(),
            state,
        }
    }

    /// Build the router with all routes
    pub fn router(&self) -> Router {
        let router = Router::new()
            .nest("/api", routes::api_routes(self.config.server.max_upload_size))
            .merge(routes::convert_routes(self.config.server.max_upload_size))
            .with_state(self.state.clone())
            // Middleware layers (order matters - applied bottom to top)
            .layer(TraceLayer::new_for_http())
            .layer(CompressionLayer::new());

        if self.config.server.enable_cors {
            let cors = CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any);
            router.layer(cors)
        } else {
            router
        }
    }

    /// Start the eviction sweeper and serve until shutdown
    pub async fn start(self) -> Result<()> {
        let addr: SocketAddr = self
            .address()
            .parse()
            .map_err(|e| Error::Config(format!("Invalid address: {}", e)))?;

        let jobs = &self.config.jobs;
        self.state.orchestrator().spawn_sweeper(
            Duration::from_secs(jobs.sweep_interval_secs.max(1)),
            Duration::from_secs(jobs.ttl_secs),
        );
        tracing::info!(
            "Job eviction: TTL {}s, sweep every {}s",
            jobs.ttl_secs,
            jobs.sweep_interval_secs
        );

        let router = self.router();

        tracing::info!("Starting conversion server on http://{}", addr);

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| Error::Config(format!("Failed to bind: {}", e)))?;

        axum::serve(listener, router)
            .await
            .map_err(|e| Error::Internal(format!("Server error: {}", e)))?;

        Ok(())
    }

    /// Get the server address
    pub fn address(&self) -> String {
        format!("{}:{}", self.config.server.host, self.config.server.port)
    }
}
