//! Scrape lifecycle: fetch, decode, publish, render, reset.
//!
//! A scrape is driven to completion by a single call to [`Scraper::scrape`].
//! Metric values live in a [`ScrapeAccumulator`] owned by that call, so the body
//! returned always reflects exactly the documents fetched by the same scrape,
//! even when several scrapes overlap.

use std::time::Instant;

use esm_common::{DecodeError, Result};
use parking_lot::RwLock;
use tracing::{error, info, warn};

use crate::decoder::decode_all;
use crate::fetcher::{DOCUMENT_LIMIT, DocumentSource};
use crate::mapping::ExportProfile;
use crate::publisher::{ScrapeAccumulator, write_sample};
use crate::state::ScrapeState;

/// Prefix of the exporter's own metrics.
pub const SELF_METRIC_PREFIX: &str = "esm_exporter";

/// Result of one successful scrape.
#[derive(Debug)]
pub struct ScrapeOutcome {
    /// Rendered exposition body.
    pub body: String,
    /// Documents returned by the fetch stage.
    pub documents: usize,
    /// Records that decoded and were published.
    pub published: usize,
    /// Documents excluded from this scrape.
    pub decode_errors: Vec<DecodeError>,
}

/// Process-lifetime scrape statistics.
#[derive(Debug, Clone, Default)]
pub struct ExporterStats {
    /// Scrapes started.
    pub scrapes: u64,
    /// Scrapes that failed before rendering.
    pub scrape_failures: u64,
    /// Documents fetched across all scrapes.
    pub documents: u64,
    /// Documents rejected by the decoder across all scrapes.
    pub decode_errors: u64,
}

/// Drives scrapes against a document source.
pub struct Scraper<S> {
    source: S,
    profile: ExportProfile,
    stats: RwLock<ExporterStats>,
}

impl<S: DocumentSource> Scraper<S> {
    pub fn new(source: S, profile: ExportProfile) -> Self {
        Self {
            source,
            profile,
            stats: RwLock::new(ExporterStats::default()),
        }
    }

    pub fn stats(&self) -> ExporterStats {
        self.stats.read().clone()
    }

    /// Run one complete scrape and return the rendered body.
    ///
    /// Store failures abort this scrape only. Documents that fail to decode are
    /// left out and reported in the outcome.
    pub async fn scrape(&self) -> Result<ScrapeOutcome> {
        let started = Instant::now();
        self.stats.write().scrapes += 1;

        ScrapeState::Connecting.enter();
        let documents = match self.source.fetch(DOCUMENT_LIMIT).await {
            Ok(documents) => documents,
            Err(e) => {
                self.stats.write().scrape_failures += 1;
                error!(error = %e, "Scrape failed");
                ScrapeState::Idle.enter();
                return Err(e);
            }
        };
        ScrapeState::Publishing.enter();

        let fetched = documents.len().min(DOCUMENT_LIMIT);
        let (records, decode_errors) = decode_all(
            documents.iter().take(DOCUMENT_LIMIT),
            self.profile.fields(),
        );

        for e in &decode_errors {
            warn!(
                document = %e.document,
                field = e.field,
                expected = %e.expected,
                actual = %e.actual,
                "Skipping event source that failed to decode"
            );
        }

        let mut accumulator = ScrapeAccumulator::new(self.profile);
        for record in &records {
            accumulator.publish(record);
        }
        let published = records.len();

        ScrapeState::Rendering.enter();
        let stats = {
            let mut stats = self.stats.write();
            stats.documents += fetched as u64;
            stats.decode_errors += decode_errors.len() as u64;
            stats.clone()
        };

        let mut body = String::with_capacity(accumulator.series_count() * 160 + 1024);
        accumulator.render(&mut body);
        render_self_metrics(
            &mut body,
            &stats,
            fetched,
            decode_errors.len(),
            started.elapsed().as_secs_f64(),
        );

        ScrapeState::Resetting.enter();
        accumulator.reset();
        ScrapeState::Idle.enter();

        info!(
            profile = %self.profile,
            documents = fetched,
            published,
            decode_errors = decode_errors.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Scrape complete"
        );

        Ok(ScrapeOutcome {
            body,
            documents: fetched,
            published,
            decode_errors,
        })
    }
}

/// Append the exporter's own metrics.
fn render_self_metrics(
    output: &mut String,
    stats: &ExporterStats,
    documents: usize,
    decode_errors: usize,
    duration_secs: f64,
) {
    let metrics: [(&str, &str, &str, f64); 7] = [
        (
            "scrapes_total",
            "counter",
            "Scrapes started",
            stats.scrapes as f64,
        ),
        (
            "scrape_failures_total",
            "counter",
            "Scrapes that failed before rendering",
            stats.scrape_failures as f64,
        ),
        (
            "documents_total",
            "counter",
            "Event source documents fetched",
            stats.documents as f64,
        ),
        (
            "decode_errors_total",
            "counter",
            "Event source documents rejected by the decoder",
            stats.decode_errors as f64,
        ),
        (
            "scrape_documents",
            "gauge",
            "Event source documents fetched by this scrape",
            documents as f64,
        ),
        (
            "scrape_decode_errors",
            "gauge",
            "Event source documents excluded from this scrape",
            decode_errors as f64,
        ),
        (
            "scrape_duration_seconds",
            "gauge",
            "Duration of this scrape up to rendering",
            duration_secs,
        ),
    ];

    for (suffix, kind, help, value) in metrics {
        let name = format!("{}_{}", SELF_METRIC_PREFIX, suffix);
        write_sample(output, &name, kind, help, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use esm_common::Error;
    use esm_common::bson::{Document, doc};
    use std::sync::Mutex;
    use std::time::Duration;

    /// Serves one prepared batch per fetch, in order.
    struct QueuedSource {
        batches: Mutex<Vec<Result<Vec<Document>>>>,
    }

    impl QueuedSource {
        fn new(batches: Vec<Result<Vec<Document>>>) -> Self {
            let mut batches = batches;
            batches.reverse();
            Self {
                batches: Mutex::new(batches),
            }
        }
    }

    impl DocumentSource for QueuedSource {
        async fn fetch(&self, limit: usize) -> Result<Vec<Document>> {
            let batch = self.batches.lock().unwrap().pop().unwrap_or(Ok(Vec::new()));
            batch.map(|docs| docs.into_iter().take(limit).collect())
        }
    }

    fn event_source(id: &str, kind: &str, ip: &str, count: i64) -> Document {
        doc! {
            "_id": id,
            "attributes": {
                "asoc-es-type": kind,
                "asoc-es-ip": ip,
                "asoc-es-count": count,
                "asoc-es-lastSeen": 1000_i64,
            },
        }
    }

    #[tokio::test]
    async fn test_scrape_publishes_documents() {
        let scraper = Scraper::new(
            QueuedSource::new(vec![Ok(vec![event_source("a", "x", "10.0.0.1", 5)])]),
            ExportProfile::EventSource,
        );

        let outcome = scraper.scrape().await.unwrap();

        assert_eq!(outcome.documents, 1);
        assert_eq!(outcome.published, 1);
        assert!(outcome.decode_errors.is_empty());
        assert!(
            outcome
                .body
                .contains("asoc_es_count{asocestype=\"x\",asocesip=\"10.0.0.1\",")
        );
        assert!(outcome.body.contains("esm_exporter_scrapes_total 1\n"));
        assert!(outcome.body.contains("esm_exporter_scrape_documents 1\n"));
    }

    #[tokio::test]
    async fn test_sequential_scrapes_do_not_leak() {
        let scraper = Scraper::new(
            QueuedSource::new(vec![
                Ok(vec![event_source("a", "first", "10.0.0.1", 5)]),
                Ok(vec![event_source("b", "second", "10.0.0.2", 2)]),
            ]),
            ExportProfile::EventSource,
        );

        let first = scraper.scrape().await.unwrap();
        let second = scraper.scrape().await.unwrap();

        assert!(first.body.contains("asocestype=\"first\""));
        assert!(!second.body.contains("asocestype=\"first\""));
        assert!(second.body.contains("asocestype=\"second\""));
        assert!(second.body.contains("esm_exporter_scrapes_total 2\n"));
        assert!(second.body.contains("esm_exporter_documents_total 2\n"));
    }

    #[tokio::test]
    async fn test_decode_error_excludes_only_offending_document() {
        let bad = doc! { "_id": "bad", "attributes": { "asoc-es-count": "lots" } };
        let scraper = Scraper::new(
            QueuedSource::new(vec![Ok(vec![
                event_source("a", "x", "10.0.0.1", 3),
                bad,
                event_source("c", "x", "10.0.0.1", 4),
            ])]),
            ExportProfile::EventSource,
        );

        let outcome = scraper.scrape().await.unwrap();

        assert_eq!(outcome.documents, 3);
        assert_eq!(outcome.published, 2);
        assert_eq!(outcome.decode_errors.len(), 1);
        assert_eq!(outcome.decode_errors[0].document, "bad");
        assert!(outcome.body.contains("asoceslogDecoder=\"\"} 7\n"));
        assert!(outcome.body.contains("esm_exporter_scrape_decode_errors 1\n"));
        assert_eq!(scraper.stats().decode_errors, 1);
    }

    #[tokio::test]
    async fn test_store_failure_is_per_scrape() {
        let scraper = Scraper::new(
            QueuedSource::new(vec![
                Err(Error::Timeout {
                    operation: "find",
                    timeout: Duration::from_secs(10),
                }),
                Ok(vec![event_source("a", "x", "10.0.0.1", 1)]),
            ]),
            ExportProfile::EventSource,
        );

        let err = scraper.scrape().await.unwrap_err();
        assert!(matches!(err, Error::Timeout { .. }));

        let outcome = scraper.scrape().await.unwrap();
        assert_eq!(outcome.published, 1);
        assert!(outcome.body.contains("esm_exporter_scrape_failures_total 1\n"));

        let stats = scraper.stats();
        assert_eq!(stats.scrapes, 2);
        assert_eq!(stats.scrape_failures, 1);
    }

    #[tokio::test]
    async fn test_by_id_profile() {
        let scraper = Scraper::new(
            QueuedSource::new(vec![Ok(vec![event_source("a", "x", "10.0.0.1", 1)])]),
            ExportProfile::ById,
        );

        let outcome = scraper.scrape().await.unwrap();

        assert!(outcome.body.contains("asoc_es_ip{_id=\"a\"} 1000\n"));
        assert!(!outcome.body.contains("asoc_es_count"));
    }

    #[tokio::test]
    async fn test_by_id_ignores_unpublished_fields() {
        let raw = doc! {
            "_id": "a",
            "attributes": { "asoc-es-lastSeen": 1000_i64, "asoc-es-ip": 10_i32 },
        };
        let scraper = Scraper::new(
            QueuedSource::new(vec![Ok(vec![raw])]),
            ExportProfile::ById,
        );

        let outcome = scraper.scrape().await.unwrap();

        assert_eq!(outcome.published, 1);
        assert!(outcome.decode_errors.is_empty());
        assert!(outcome.body.contains("asoc_es_ip{_id=\"a\"} 1000\n"));
    }

    #[tokio::test]
    async fn test_empty_collection() {
        let scraper = Scraper::new(QueuedSource::new(vec![]), ExportProfile::EventSource);

        let outcome = scraper.scrape().await.unwrap();

        assert_eq!(outcome.documents, 0);
        assert!(
            outcome
                .body
                .lines()
                .all(|l| l.starts_with('#') || l.starts_with("esm_exporter_"))
        );
    }
}
