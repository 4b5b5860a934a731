//! Document store session management.

use std::future::Future;
use std::time::Duration;

use mongodb::bson::{Document, doc};
use mongodb::options::{ClientOptions, Credential};
use mongodb::{Client, Collection};
use tokio::sync::Mutex;

use crate::config::StoreConfig;
use crate::error::{Error, Result};

const APP_NAME: &str = "esm-exporter";

/// Prefix a bare `host:port` with the `mongodb://` scheme.
pub fn normalize_host_uri(host: &str) -> String {
    let host = host.trim();
    if host.starts_with("mongodb://") || host.starts_with("mongodb+srv://") {
        host.to_string()
    } else {
        format!("mongodb://{}", host)
    }
}

/// Build the credential for a configuration, if any field is set.
///
/// Empty fields stay unset so the driver falls back to its defaults.
pub fn credential(config: &StoreConfig) -> Option<Credential> {
    if !config.has_credentials() {
        return None;
    }

    let non_empty = |value: &str| (!value.is_empty()).then(|| value.to_string());

    let mut credential = Credential::default();
    credential.source = non_empty(&config.auth_source);
    credential.username = non_empty(&config.username);
    credential.password = non_empty(&config.password);
    Some(credential)
}

/// Resolve driver options from the configuration.
pub async fn client_options(config: &StoreConfig) -> Result<ClientOptions> {
    let uri = normalize_host_uri(&config.host);
    let mut options = ClientOptions::parse(&uri)
        .await
        .map_err(|e| Error::Connect(format!("invalid host URI '{}': {}", uri, e)))?;

    options.app_name = Some(APP_NAME.to_string());
    options.connect_timeout = Some(config.connect_timeout());
    options.server_selection_timeout = Some(config.connect_timeout());
    if let Some(credential) = credential(config) {
        options.credential = Some(credential);
    }

    Ok(options)
}

/// Run a store operation with an upper time bound.
pub async fn bounded<T, F>(operation: &'static str, timeout: Duration, future: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    tokio::time::timeout(timeout, future)
        .await
        .map_err(|_| Error::Timeout { operation, timeout })?
}

/// Issue the `ping` liveness check.
async fn ping(client: &Client, timeout: Duration) -> Result<()> {
    bounded("ping", timeout, async {
        client
            .database("admin")
            .run_command(doc! { "ping": 1 })
            .await
            .map(|_| ())
            .map_err(|e| Error::Ping(e.to_string()))
    })
    .await
    .map_err(liveness_failure)
}

/// A ping with no reply in time counts as a failed liveness check.
fn liveness_failure(error: Error) -> Error {
    match error {
        Error::Timeout { timeout, .. } => Error::Ping(format!("no reply within {:?}", timeout)),
        other => other,
    }
}

/// Open a new client and verify it answers the liveness check.
pub async fn connect(config: &StoreConfig) -> Result<Client> {
    let options = client_options(config).await?;

    tracing::info!(
        host = %normalize_host_uri(&config.host),
        authenticated = config.has_credentials(),
        "Connecting to document store"
    );

    let client = Client::with_options(options).map_err(|e| Error::Connect(e.to_string()))?;
    ping(&client, config.operation_timeout()).await?;

    tracing::debug!("Document store answered liveness check");

    Ok(client)
}

/// A client handed out for the duration of one scrape.
pub struct StoreSession {
    client: Client,
    cached: bool,
}

impl StoreSession {
    /// Typed handle to a collection.
    pub fn collection(&self, database: &str, collection: &str) -> Collection<Document> {
        self.client.database(database).collection(collection)
    }
}

/// Hands out store sessions and takes them back.
///
/// With `reuse_connection` the underlying client (and its connection pool) is
/// kept between scrapes. Otherwise every acquire connects fresh and every
/// release shuts the client down.
pub struct SessionManager {
    config: StoreConfig,
    cached: Mutex<Option<Client>>,
}

impl SessionManager {
    pub fn new(config: StoreConfig) -> Self {
        Self {
            config,
            cached: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Acquire a live session. The liveness check always runs before returning.
    ///
    /// The cache lock is only held to read or swap the cached client, never
    /// across a ping or connect.
    pub async fn acquire(&self) -> Result<StoreSession> {
        if !self.config.reuse_connection {
            let client = connect(&self.config).await?;
            return Ok(StoreSession {
                client,
                cached: false,
            });
        }

        let cached = self.cached.lock().await.clone();

        if let Some(client) = cached {
            match ping(&client, self.config.operation_timeout()).await {
                Ok(()) => {
                    return Ok(StoreSession {
                        client,
                        cached: true,
                    });
                }
                Err(e) => {
                    tracing::warn!(
                        error = %e,
                        "Cached session failed liveness check, reconnecting"
                    );
                    self.cached.lock().await.take();
                }
            }
        }

        let client = connect(&self.config).await?;
        *self.cached.lock().await = Some(client.clone());

        Ok(StoreSession {
            client,
            cached: true,
        })
    }

    /// Return a session. Unhealthy sessions are evicted from the cache.
    pub async fn release(&self, session: StoreSession, healthy: bool) {
        if session.cached {
            if !healthy {
                self.cached.lock().await.take();
                tracing::debug!("Evicted cached document store session");
            }
        } else {
            session.client.shutdown().await;
            tracing::debug!("Closed document store session");
        }
    }

    /// Shut down the cached client, if any.
    pub async fn close(&self) {
        if let Some(client) = self.cached.lock().await.take() {
            client.shutdown().await;
            tracing::info!("Document store session closed");
        }
    }
}
