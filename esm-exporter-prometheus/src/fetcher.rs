//! Bounded retrieval of event source documents.

use std::future::Future;
use std::sync::Arc;

use esm_common::bson::{Document, doc};
use esm_common::session::bounded;
use esm_common::{Error, Result, SessionManager, StoreSession};
use futures::{Stream, TryStreamExt};
use tracing::{debug, error};

use crate::state::ScrapeState;

/// Upper bound on documents read per scrape.
pub const DOCUMENT_LIMIT: usize = 100;

/// Something that can hand the scraper a batch of raw documents.
pub trait DocumentSource: Send + Sync + 'static {
    /// Fetch at most `limit` documents.
    fn fetch(&self, limit: usize) -> impl Future<Output = Result<Vec<Document>>> + Send;
}

/// Drain a cursor completely, stopping early once `limit` documents are read.
pub async fn drain_cursor<S>(cursor: S, limit: usize) -> Result<Vec<Document>>
where
    S: Stream<Item = mongodb::error::Result<Document>>,
{
    let mut cursor = std::pin::pin!(cursor);
    let mut documents = Vec::with_capacity(limit.min(DOCUMENT_LIMIT));

    while documents.len() < limit {
        match cursor
            .try_next()
            .await
            .map_err(|e| Error::Cursor(e.to_string()))?
        {
            Some(document) => documents.push(document),
            None => break,
        }
    }

    Ok(documents)
}

/// Reads the event source collection through a [`SessionManager`].
pub struct EventSourceFetcher {
    sessions: Arc<SessionManager>,
}

impl EventSourceFetcher {
    pub fn new(sessions: Arc<SessionManager>) -> Self {
        Self { sessions }
    }

    /// Unfiltered, unsorted find capped at `limit`.
    async fn query(&self, session: &StoreSession, limit: usize) -> Result<Vec<Document>> {
        let config = self.sessions.config();
        let timeout = config.operation_timeout();
        let collection = session.collection(&config.database, &config.collection);

        let cursor = bounded("find", timeout, async {
            collection
                .find(doc! {})
                .limit(limit as i64)
                .await
                .map_err(|e| Error::Query {
                    collection: config.collection.clone(),
                    message: e.to_string(),
                })
        })
        .await?;

        bounded("cursor drain", timeout, drain_cursor(cursor, limit)).await
    }
}

impl DocumentSource for EventSourceFetcher {
    async fn fetch(&self, limit: usize) -> Result<Vec<Document>> {
        let session = self.sessions.acquire().await?;
        ScrapeState::Fetching.enter();

        let result = self.query(&session, limit).await;
        self.sessions.release(session, result.is_ok()).await;

        match &result {
            Ok(documents) => debug!(
                collection = %self.sessions.config().collection,
                documents = documents.len(),
                "Fetched event sources"
            ),
            Err(e) => error!(error = %e, "Failed to fetch event sources"),
        }

        result
    }
}
