//! Prometheus metrics exporter plugin for MAD.
//!
//! This crate exposes pokestop, quest and device metrics from a running MAD
//! (Map'A'Droid) host on an HTTP `/metrics` endpoint. Metrics are computed
//! fresh on every scrape against the host's read-only interfaces, so the
//! exposition always reflects current host state.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐     ┌─────────────────┐     ┌─────────────────┐
//! │    MAD Host     │────>│  MadCollector   │────>│   HTTP Server   │
//! │ (mad-host APIs) │     │  (per scrape)   │     │   (/metrics)    │
//! └─────────────────┘     └─────────────────┘     └─────────────────┘
//! ```
//!
//! # Usage
//!
//! Run the demo binary with a configuration file:
//!
//! ```bash
//! mad-exporter-prometheus --config config.json5
//! ```
//!
//! Embedders instead build a [`plugin::ExporterPlugin`] from their host's
//! interfaces and mount it onto an existing router.
//!
//! # Configuration
//!
//! See [`config::ExporterConfig`] for configuration options.

pub mod collector;
pub mod config;
pub mod demo;
pub mod http;
pub mod mapping;
pub mod plugin;

pub use collector::{HostServices, MadCollector, ScrapeStats, SharedScrapeStats};
pub use config::ExporterConfig;
pub use http::HttpServer;
pub use plugin::{DOC_PATH, ExporterPlugin, METRICS_PATH, PluginInfo};
