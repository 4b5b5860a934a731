//! Prometheus exporter for ESM event sources.

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use esm_common::{SessionManager, init_tracing, normalize_host_uri};
use tokio::sync::watch;
use tracing::{error, info};

use esm_exporter_prometheus::{EventSourceFetcher, ExporterArgs, HttpServer, Scraper};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = ExporterArgs::parse();
    let config = args.resolve_config()?;

    init_tracing(&config.logging)?;

    info!(
        mongodb = %normalize_host_uri(&config.mongodb.host),
        database = %config.mongodb.database,
        collection = %config.mongodb.collection,
        listen = %config.prometheus.listen,
        profile = %config.prometheus.profile,
        "Starting ESM Prometheus Exporter"
    );

    // Create shutdown signal
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let listen_addr = config.listen_addr()?;
    let sessions = Arc::new(SessionManager::new(config.mongodb.clone()));
    let scraper = Arc::new(Scraper::new(
        EventSourceFetcher::new(sessions.clone()),
        config.prometheus.profile,
    ));
    let http_server = HttpServer::new(
        scraper.clone(),
        listen_addr,
        config.prometheus.path.clone(),
    );

    // Start HTTP server
    let http_task = tokio::spawn(async move {
        if let Err(e) = http_server.run(shutdown_rx).await {
            error!("HTTP server error: {}", e);
        }
    });

    // Wait for shutdown signal
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down...");
        }
        _ = async {
            #[cfg(unix)]
            {
                match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                    Ok(mut sigterm) => {
                        sigterm.recv().await;
                    }
                    Err(e) => {
                        error!("Failed to install SIGTERM handler: {}", e);
                        std::future::pending::<()>().await;
                    }
                }
            }
            #[cfg(not(unix))]
            {
                std::future::pending::<()>().await;
            }
        } => {
            info!("Received SIGTERM, shutting down...");
        }
    }

    // Signal shutdown
    shutdown_tx.send(true)?;

    // Wait for in-flight scrapes to finish
    let _ = tokio::time::timeout(Duration::from_secs(5), http_task).await;

    sessions.close().await;

    let stats = scraper.stats();
    info!(
        scrapes = stats.scrapes,
        scrape_failures = stats.scrape_failures,
        documents = stats.documents,
        decode_errors = stats.decode_errors,
        "Final statistics"
    );

    info!("Exporter stopped");
    Ok(())
}
