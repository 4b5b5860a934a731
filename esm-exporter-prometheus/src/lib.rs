//! Prometheus exporter for ESM event sources.
//!
//! Every request to the metrics endpoint runs one scrape: the event source
//! collection is read from MongoDB, each document's attribute map is decoded into
//! a fixed record, the records are accumulated into counters, and the counters
//! are rendered and discarded.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐   ┌───────────┐   ┌───────────┐   ┌─────────────┐   ┌──────────────┐
//! │   MongoDB    │──>│  Fetcher  │──>│  Decoder  │──>│  Publisher  │──>│ HTTP Server  │
//! │ (esm.event-  │   │ (≤ 100    │   │ (typed    │   │ (per-scrape │   │  (/metrics)  │
//! │  sources)    │   │  docs)    │   │  fields)  │   │  counters)  │   │              │
//! └──────────────┘   └───────────┘   └───────────┘   └─────────────┘   └──────────────┘
//! ```
//!
//! # Usage
//!
//! ```bash
//! esm-exporter-prometheus --mongoDbHostURI mongo-0:27017 --localPort 15700
//! ```
//!
//! # Configuration
//!
//! See [`config::ExporterConfig`] for configuration options.

pub mod args;
pub mod config;
pub mod decoder;
pub mod fetcher;
pub mod http;
pub mod mapping;
pub mod publisher;
pub mod scrape;
pub mod state;

pub use args::ExporterArgs;
pub use config::ExporterConfig;
pub use decoder::{DecodedRecord, decode, decode_all};
pub use fetcher::{DOCUMENT_LIMIT, DocumentSource, EventSourceFetcher};
pub use http::HttpServer;
pub use mapping::ExportProfile;
pub use publisher::ScrapeAccumulator;
pub use scrape::{ScrapeOutcome, Scraper};
