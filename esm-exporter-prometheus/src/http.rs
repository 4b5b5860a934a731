//! HTTP server for the Prometheus metrics endpoint.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use esm_common::Error;
use tokio::sync::watch;
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::fetcher::DocumentSource;
use crate::scrape::Scraper;

/// Content type of the Prometheus text exposition format.
pub const CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Application state shared across handlers.
struct AppState<S> {
    scraper: Arc<Scraper<S>>,
}

impl<S> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            scraper: self.scraper.clone(),
        }
    }
}

/// Create the HTTP router.
pub fn create_router<S: DocumentSource>(scraper: Arc<Scraper<S>>, metrics_path: &str) -> Router {
    let state = AppState { scraper };

    Router::new()
        .route(metrics_path, get(metrics_handler::<S>))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Handler for the metrics endpoint. Every request runs one scrape.
async fn metrics_handler<S: DocumentSource>(State(state): State<AppState<S>>) -> Response {
    match state.scraper.scrape().await {
        Ok(outcome) => (
            StatusCode::OK,
            [("content-type", CONTENT_TYPE)],
            outcome.body,
        )
            .into_response(),
        Err(e) => (status_for(&e), format!("scrape failed: {}\n", e)).into_response(),
    }
}

/// HTTP status for a failed scrape.
fn status_for(error: &Error) -> StatusCode {
    match error {
        e if e.is_unavailable() => StatusCode::SERVICE_UNAVAILABLE,
        Error::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// HTTP server configuration.
pub struct HttpServer<S> {
    scraper: Arc<Scraper<S>>,
    listen_addr: SocketAddr,
    metrics_path: String,
}

impl<S: DocumentSource> HttpServer<S> {
    /// Create a new HTTP server.
    pub fn new(scraper: Arc<Scraper<S>>, listen_addr: SocketAddr, metrics_path: String) -> Self {
        Self {
            scraper,
            listen_addr,
            metrics_path,
        }
    }

    /// Run the HTTP server until the shutdown signal is received.
    pub async fn run(self, shutdown: watch::Receiver<bool>) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(self.listen_addr)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to bind to {}: {}", self.listen_addr, e))?;

        self.serve(listener, shutdown).await
    }

    /// Serve on an already bound listener until the shutdown signal is received.
    pub async fn serve(
        self,
        listener: tokio::net::TcpListener,
        mut shutdown: watch::Receiver<bool>,
    ) -> anyhow::Result<()> {
        let router = create_router(self.scraper, &self.metrics_path);
        let addr = listener.local_addr()?;

        info!(
            addr = %addr,
            path = %self.metrics_path,
            "HTTP server listening"
        );

        // Run server with graceful shutdown
        axum::serve(listener, router)
            .with_graceful_shutdown(async move {
                // Wait for shutdown signal
                loop {
                    if shutdown.changed().await.is_err() {
                        break;
                    }
                    if *shutdown.borrow() {
                        break;
                    }
                }
                info!("HTTP server shutting down");
            })
            .await
            .map_err(|e| anyhow::anyhow!("HTTP server error: {}", e))?;

        info!("HTTP server stopped");
        Ok(())
    }
}
