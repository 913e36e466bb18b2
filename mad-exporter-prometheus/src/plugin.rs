//! Plugin registration and mounting into the host application.

use std::sync::Arc;

use axum::Router;
use parking_lot::RwLock;
use prometheus_client::metrics::info::Info;
use prometheus_client::registry::Registry;
use tracing::info;

use crate::collector::{HostServices, MadCollector, ScrapeStats, SharedScrapeStats};
use crate::config::PluginConfig;
use crate::http::{doc_router, metrics_app};
use crate::mapping::metric_name;

/// Fixed path the metrics application is mounted at.
pub const METRICS_PATH: &str = "/metrics";

/// Path of the plugin documentation page.
pub const DOC_PATH: &str = "/metrics_readme";

/// Plugin metadata, exposed on the documentation page and as an info metric.
#[derive(Debug, Clone)]
pub struct PluginInfo {
    pub name: String,
    pub version: String,
    pub description: String,
    pub author: String,
    pub url: String,
}

impl PluginInfo {
    /// Metadata of this build.
    pub fn from_build() -> Self {
        Self {
            name: env!("CARGO_PKG_NAME").to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            description: env!("CARGO_PKG_DESCRIPTION").to_string(),
            author: env!("CARGO_PKG_AUTHORS").to_string(),
            url: env!("CARGO_PKG_REPOSITORY").to_string(),
        }
    }

    fn as_labels(&self) -> Vec<(String, String)> {
        vec![
            ("name".to_string(), self.name.clone()),
            ("version".to_string(), self.version.clone()),
            ("description".to_string(), self.description.clone()),
            ("author".to_string(), self.author.clone()),
            ("url".to_string(), self.url.clone()),
        ]
    }
}

/// The exporter plugin.
///
/// Ties configuration, host services and plugin metadata together and
/// mounts the metrics endpoint, the documentation route and the collector
/// into a host application router.
pub struct ExporterPlugin {
    config: PluginConfig,
    services: HostServices,
    info: PluginInfo,
    stats: SharedScrapeStats,
}

impl ExporterPlugin {
    /// Create the plugin over the given host services.
    pub fn new(config: PluginConfig, services: HostServices) -> Self {
        Self {
            config,
            services,
            info: PluginInfo::from_build(),
            stats: Arc::new(RwLock::new(ScrapeStats::default())),
        }
    }

    /// Plugin metadata of this build.
    pub fn info(&self) -> &PluginInfo {
        &self.info
    }

    /// Handle for reading scrape statistics once the plugin is mounted.
    pub fn stats_handle(&self) -> SharedScrapeStats {
        self.stats.clone()
    }

    /// Mount the plugin into the host application.
    ///
    /// Registration happens once per process, at startup. An inactive
    /// plugin leaves the router untouched: no routes are added and no
    /// collector is registered.
    pub fn mount(self, host: Router) -> Router {
        if !self.config.active {
            info!("Plugin inactive, skipping registration");
            return host;
        }

        let mut registry = Registry::default();
        registry.register(
            metric_name(&self.config.prefix, "plugin"),
            "Plugin build metadata",
            Info::new(self.info.as_labels()),
        );

        let collector = MadCollector::with_stats(
            self.services,
            self.config.prefix.clone(),
            self.config.debug_metrics,
            self.stats,
        );
        registry.register_collector(Box::new(collector));

        info!(
            plugin = %self.info.name,
            version = %self.info.version,
            metrics_path = METRICS_PATH,
            doc_path = DOC_PATH,
            "Plugin registered"
        );

        host.merge(doc_router(self.info))
            .merge(metrics_app(Arc::new(registry)))
    }
}
