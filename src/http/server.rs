//! HTTP server setup.
//!
//! # Responsibilities
//! - Create the Axum router with all handlers
//! - Wire up middleware (tracing, timeout, body limit, panic catch)
//! - Bind the server to a listener and serve until shutdown
//!
//! # Design Decisions
//! - Unmatched routes fall through to a single fallback that handles
//!   premium-subdomain serving and catch-all uploads
//! - A panicking handler is converted to a 500, never a dead worker

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tower_http::{catch_panic::CatchPanicLayer, timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::ServerConfig;
use crate::http::handlers;
use crate::site::store::SiteStore;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<SiteStore>,
    pub config: Arc<ServerConfig>,
}

/// Build the application router with all routes and middleware layers.
pub fn app(config: Arc<ServerConfig>, store: Arc<SiteStore>) -> Router {
    let state = AppState {
        store,
        config: config.clone(),
    };
    Router::new()
        .route(
            "/upload",
            post(handlers::handle_upload).put(handlers::handle_upload),
        )
        .route(
            "/api/upload",
            post(handlers::handle_upload).put(handlers::handle_upload),
        )
        .route("/p/{token}", get(handlers::serve_site_bare))
        .route("/p/{token}/", get(handlers::serve_site_root))
        .route("/p/{token}/{*path}", get(handlers::serve_site_file))
        .route("/api/site-info.json", get(handlers::site_info))
        .route("/api/summary.json", get(handlers::summary))
        .route("/api/sites.json", get(handlers::sites_json))
        .route("/sites", get(handlers::sites_page))
        .route("/ping", get(handlers::ping))
        .fallback(handlers::fallback)
        .with_state(state)
        .layer(DefaultBodyLimit::max(config.limits.max_upload_bytes))
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.limits.request_timeout_secs,
        )))
        .layer(TraceLayer::new_for_http())
        .layer(CatchPanicLayer::new())
}

/// HTTP server for the preview service.
pub struct HttpServer {
    router: Router,
    config: Arc<ServerConfig>,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration and registry.
    pub fn new(config: Arc<ServerConfig>, store: Arc<SiteStore>) -> Self {
        let router = app(config.clone(), store);
        Self { router, config }
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run(self, listener: TcpListener) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            public_host = %self.config.listener.public_host,
            "HTTP server starting"
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Wait for shutdown signal (Ctrl+C).
async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install Ctrl+C handler");
    tracing::info!("Shutdown signal received");
}
