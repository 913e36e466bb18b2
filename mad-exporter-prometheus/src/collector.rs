//! Per-scrape metric collection over the host's read surface.
//!
//! The collector holds no metric state of its own: every scrape walks the
//! wired host subsystems, builds a fresh set of samples and hands them to
//! the registry encoder. Nothing carries over between scrapes.

use std::collections::BTreeSet;
use std::sync::Arc;

use parking_lot::RwLock;
use prometheus_client::collector::Collector;
use prometheus_client::encoding::{DescriptorEncoder, EncodeMetric};
use prometheus_client::metrics::MetricType;
use prometheus_client::metrics::counter::ConstCounter;
use prometheus_client::metrics::gauge::ConstGauge;
use prometheus_client::metrics::info::Info;
use prometheus_client::registry::Unit;
use tracing::{debug, error};

use mad_host::{
    AreaKind, DeviceRegistry, DeviceStatusMap, GeofenceRegistry, HostError, PoiStore, StatusKey,
};

use crate::mapping::{metric_name, sample_value};

/// Optional handles to the host subsystems the collector reads.
///
/// A subsystem the host did not wire up stays `None`; the collector skips
/// the corresponding metric group instead of failing the scrape.
#[derive(Clone, Default)]
pub struct HostServices {
    geofences: Option<Arc<dyn GeofenceRegistry>>,
    poi_store: Option<Arc<dyn PoiStore>>,
    devices: Option<Arc<dyn DeviceRegistry>>,
    device_status: Option<Arc<dyn DeviceStatusMap>>,
}

impl HostServices {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wire every subsystem from a single host object.
    pub fn for_host<H>(host: Arc<H>) -> Self
    where
        H: GeofenceRegistry + PoiStore + DeviceRegistry + DeviceStatusMap + 'static,
    {
        Self {
            geofences: Some(host.clone()),
            poi_store: Some(host.clone()),
            devices: Some(host.clone()),
            device_status: Some(host),
        }
    }

    pub fn with_geofences(mut self, registry: Arc<dyn GeofenceRegistry>) -> Self {
        self.geofences = Some(registry);
        self
    }

    pub fn with_poi_store(mut self, store: Arc<dyn PoiStore>) -> Self {
        self.poi_store = Some(store);
        self
    }

    pub fn with_devices(mut self, registry: Arc<dyn DeviceRegistry>) -> Self {
        self.devices = Some(registry);
        self
    }

    pub fn with_device_status(mut self, map: Arc<dyn DeviceStatusMap>) -> Self {
        self.device_status = Some(map);
        self
    }

    /// Names and read surfaces of the wired subsystems.
    pub fn subsystems(&self) -> Vec<(&'static str, &'static [&'static str])> {
        let mut subsystems = Vec::new();
        if let Some(registry) = &self.geofences {
            subsystems.push(("geofence_registry", registry.debug_attributes()));
        }
        if let Some(store) = &self.poi_store {
            subsystems.push(("poi_store", store.debug_attributes()));
        }
        if let Some(registry) = &self.devices {
            subsystems.push(("device_registry", registry.debug_attributes()));
        }
        if let Some(map) = &self.device_status {
            subsystems.push(("device_status_map", map.debug_attributes()));
        }
        subsystems
    }
}

impl std::fmt::Debug for HostServices {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostServices")
            .field("geofences", &self.geofences.is_some())
            .field("poi_store", &self.poi_store.is_some())
            .field("devices", &self.devices.is_some())
            .field("device_status", &self.device_status.is_some())
            .finish()
    }
}

/// Pokestop group samples gathered for one scrape.
#[derive(Debug, Clone, PartialEq)]
pub struct PokestopSamples {
    /// Number of configured pokestop areas.
    pub area_count: u64,
    /// Per-fence counts, one entry per distinct sub-fence.
    pub fences: Vec<FenceSamples>,
}

/// Counts for a single fence.
#[derive(Debug, Clone, PartialEq)]
pub struct FenceSamples {
    pub fence: String,
    pub pokestops: u64,
    pub quests: u64,
}

/// Device group samples gathered for one scrape.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceSamples {
    /// Number of configured devices.
    pub device_count: u64,
    /// Per-device samples; empty when the status map is not wired.
    pub per_device: Vec<DeviceSample>,
}

/// Status samples for a single device.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceSample {
    pub origin: String,
    /// Scan mode label value; "unknown" when the device never reported one.
    pub mode: String,
    /// 1.0 while the device has a working injection, otherwise 0.0.
    pub injected: f64,
    /// Unix time of the last delivered data; `None` before the first data.
    pub last_data: Option<f64>,
}

/// Collector statistics.
#[derive(Debug, Clone, Default)]
pub struct ScrapeStats {
    /// Total scrapes answered.
    pub scrapes: u64,
    /// Metric groups skipped because a host subsystem was not wired.
    pub groups_skipped: u64,
}

/// Shareable statistics handle, kept by the plugin after the collector
/// moves into the registry.
pub type SharedScrapeStats = Arc<RwLock<ScrapeStats>>;

/// Queried per scrape by the metrics registry.
#[derive(Debug)]
pub struct MadCollector {
    services: HostServices,
    prefix: String,
    debug_metrics: bool,
    stats: SharedScrapeStats,
}

impl MadCollector {
    /// Create a collector over the given host services.
    pub fn new(services: HostServices, prefix: impl Into<String>, debug_metrics: bool) -> Self {
        let stats = Arc::new(RwLock::new(ScrapeStats::default()));
        Self::with_stats(services, prefix, debug_metrics, stats)
    }

    /// Create a collector reporting into an existing statistics handle.
    pub fn with_stats(
        services: HostServices,
        prefix: impl Into<String>,
        debug_metrics: bool,
        stats: SharedScrapeStats,
    ) -> Self {
        Self {
            services,
            prefix: prefix.into(),
            debug_metrics,
            stats,
        }
    }

    /// Get collector statistics.
    pub fn stats(&self) -> ScrapeStats {
        self.stats.read().clone()
    }

    /// Handle for reading statistics after the collector is registered.
    pub fn stats_handle(&self) -> SharedScrapeStats {
        self.stats.clone()
    }

    fn record_group_skip(&self, group: &'static str) {
        debug!(group, "Host subsystem not wired, skipping metric group");
        self.stats.write().groups_skipped += 1;
    }

    /// Gather the pokestop group.
    ///
    /// `Ok(None)` means a required subsystem is missing and the group is
    /// skipped. A store error is an unexpected fault and fails the scrape.
    fn gather_pokestops(&self) -> Result<Option<PokestopSamples>, HostError> {
        let (Some(geofences), Some(store)) = (&self.services.geofences, &self.services.poi_store)
        else {
            self.record_group_skip("pokestops");
            return Ok(None);
        };

        let areas = geofences.areas_of_kind(AreaKind::Pokestops);
        let area_count = areas.len() as u64;

        // Several areas may reference the same sub-fence; emit each fence
        // exactly once, in sorted order.
        let mut fence_names = BTreeSet::new();
        for area in &areas {
            fence_names.extend(area.sub_fences.iter().cloned());
        }

        let mut fences = Vec::with_capacity(fence_names.len());
        for name in fence_names {
            let Some(region) = geofences.fence_coordinates(&name) else {
                debug!(fence = %name, "Fence has no known coordinates, skipping");
                continue;
            };
            let pokestops = store.pokestop_count(&region)?;
            let quests = store.quest_count(&region)?;
            fences.push(FenceSamples {
                fence: name,
                pokestops,
                quests,
            });
        }

        Ok(Some(PokestopSamples { area_count, fences }))
    }

    /// Gather the device group; `None` when the device registry is missing.
    fn gather_devices(&self) -> Option<DeviceSamples> {
        let Some(devices) = &self.services.devices else {
            self.record_group_skip("devices");
            return None;
        };

        let origins = devices.device_origins();
        let device_count = origins.len() as u64;

        let per_device = match &self.services.device_status {
            Some(status) => origins
                .iter()
                .map(|origin| {
                    let injected = status
                        .latest(origin, StatusKey::Injected)
                        .as_ref()
                        .and_then(sample_value)
                        .unwrap_or(0.0);
                    let mode = status
                        .latest(origin, StatusKey::ScanMode)
                        .and_then(|v| v.as_text().map(str::to_string))
                        .unwrap_or_else(|| "unknown".to_string());
                    let last_data = status
                        .latest(origin, StatusKey::LastData)
                        .as_ref()
                        .and_then(sample_value);
                    DeviceSample {
                        origin: origin.clone(),
                        mode,
                        injected,
                        last_data,
                    }
                })
                .collect(),
            None => {
                self.record_group_skip("device_status");
                Vec::new()
            }
        };

        Some(DeviceSamples {
            device_count,
            per_device,
        })
    }

    fn encode_pokestops(
        &self,
        encoder: &mut DescriptorEncoder,
        samples: &PokestopSamples,
    ) -> Result<(), std::fmt::Error> {
        let areas = ConstGauge::new(samples.area_count as i64);
        let name = metric_name(&self.prefix, "pokestop_areas");
        let area_encoder = encoder.encode_descriptor(
            &name,
            "Number of configured pokestop areas",
            None,
            areas.metric_type(),
        )?;
        areas.encode(area_encoder)?;

        let name = metric_name(&self.prefix, "pokestops");
        let mut stop_encoder = encoder.encode_descriptor(
            &name,
            "Pokestops known inside a fence",
            None,
            MetricType::Gauge,
        )?;
        for fence in &samples.fences {
            let labels = vec![("fence".to_string(), fence.fence.clone())];
            let gauge = ConstGauge::new(fence.pokestops as i64);
            let fence_encoder = stop_encoder.encode_family(&labels)?;
            gauge.encode(fence_encoder)?;
        }

        let name = metric_name(&self.prefix, "quests");
        let mut quest_encoder = encoder.encode_descriptor(
            &name,
            "Pokestops with an active quest inside a fence",
            None,
            MetricType::Gauge,
        )?;
        for fence in &samples.fences {
            let labels = vec![("fence".to_string(), fence.fence.clone())];
            let gauge = ConstGauge::new(fence.quests as i64);
            let fence_encoder = quest_encoder.encode_family(&labels)?;
            gauge.encode(fence_encoder)?;
        }

        Ok(())
    }

    fn encode_devices(
        &self,
        encoder: &mut DescriptorEncoder,
        samples: &DeviceSamples,
    ) -> Result<(), std::fmt::Error> {
        let count = ConstGauge::new(samples.device_count as i64);
        let name = metric_name(&self.prefix, "devices");
        let count_encoder = encoder.encode_descriptor(
            &name,
            "Number of configured devices",
            None,
            count.metric_type(),
        )?;
        count.encode(count_encoder)?;

        if samples.per_device.is_empty() {
            return Ok(());
        }

        let name = metric_name(&self.prefix, "device_injected");
        let mut injected_encoder = encoder.encode_descriptor(
            &name,
            "Whether the device currently has a working injection",
            None,
            MetricType::Gauge,
        )?;
        for device in &samples.per_device {
            let labels = vec![
                ("origin".to_string(), device.origin.clone()),
                ("mode".to_string(), device.mode.clone()),
            ];
            let gauge = ConstGauge::new(device.injected);
            let device_encoder = injected_encoder.encode_family(&labels)?;
            gauge.encode(device_encoder)?;
        }

        let name = metric_name(&self.prefix, "device_last_data");
        let mut last_data_encoder = encoder.encode_descriptor(
            &name,
            "Unix time the device last delivered data",
            Some(&Unit::Seconds),
            MetricType::Gauge,
        )?;
        for device in &samples.per_device {
            let Some(last_data) = device.last_data else {
                continue;
            };
            let labels = vec![("origin".to_string(), device.origin.clone())];
            let gauge = ConstGauge::new(last_data);
            let device_encoder = last_data_encoder.encode_family(&labels)?;
            gauge.encode(device_encoder)?;
        }

        Ok(())
    }

    fn encode_debug_info(
        &self,
        encoder: &mut DescriptorEncoder,
    ) -> Result<(), std::fmt::Error> {
        for (name, attributes) in self.services.subsystems() {
            let info = Info::new(vec![("attributes".to_string(), attributes.join(", "))]);
            let metric = metric_name(&self.prefix, &format!("subsystem_{}", name));
            let help = format!("Read calls answered by the {} subsystem", name);
            let info_encoder =
                encoder.encode_descriptor(&metric, &help, None, info.metric_type())?;
            info.encode(info_encoder)?;
        }
        Ok(())
    }
}

impl Collector for MadCollector {
    fn encode(&self, mut encoder: DescriptorEncoder) -> Result<(), std::fmt::Error> {
        let scrapes = {
            let mut stats = self.stats.write();
            stats.scrapes += 1;
            stats.scrapes
        };

        let scrape_counter = ConstCounter::new(scrapes);
        let name = metric_name(&self.prefix, "scrapes");
        let scrape_encoder = encoder.encode_descriptor(
            &name,
            "Number of scrapes answered by this collector",
            None,
            scrape_counter.metric_type(),
        )?;
        scrape_counter.encode(scrape_encoder)?;

        match self.gather_pokestops() {
            Ok(Some(samples)) => self.encode_pokestops(&mut encoder, &samples)?,
            Ok(None) => {}
            Err(err) => {
                error!(error = %err, "Pokestop store query failed during scrape");
                return Err(std::fmt::Error);
            }
        }

        if let Some(samples) = self.gather_devices() {
            self.encode_devices(&mut encoder, &samples)?;
        }

        if self.debug_metrics {
            self.encode_debug_info(&mut encoder)?;
        }

        Ok(())
    }
}
