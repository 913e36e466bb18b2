//! In-memory host backend.
//!
//! Implements every host trait over plain maps so plugins can be exercised
//! without a running MAD instance. Used by the demo binary and by tests.

use std::collections::BTreeMap;

use parking_lot::RwLock;

use crate::device::{DeviceRegistry, DeviceStatusMap, StatusKey, StatusValue};
use crate::geofence::{AreaDefinition, AreaKind, Coordinate, GeofenceRegistry, polygon_contains};
use crate::store::{PoiStore, Result};

/// Mutable status of one device.
#[derive(Debug, Clone, Default)]
pub struct DeviceState {
    pub injected: bool,
    pub mode: Option<String>,
    pub last_data: Option<i64>,
}

/// A self-contained host holding areas, fences, POIs and device state.
///
/// All collections are keyed by `BTreeMap` so iteration order is stable
/// across calls, which keeps scrape output deterministic.
#[derive(Debug, Default)]
pub struct InMemoryHost {
    areas: RwLock<Vec<AreaDefinition>>,
    fences: RwLock<BTreeMap<String, Vec<Coordinate>>>,
    pokestops: RwLock<Vec<Coordinate>>,
    quests: RwLock<Vec<Coordinate>>,
    devices: RwLock<BTreeMap<String, DeviceState>>,
}

impl InMemoryHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an area definition.
    pub fn add_area(&self, area: AreaDefinition) {
        self.areas.write().push(area);
    }

    /// Set (or replace) the polygon for a named fence.
    pub fn set_fence(&self, name: impl Into<String>, polygon: Vec<Coordinate>) {
        self.fences.write().insert(name.into(), polygon);
    }

    /// Place a pokestop at the given coordinate.
    pub fn add_pokestop(&self, at: Coordinate) {
        self.pokestops.write().push(at);
    }

    /// Mark a quest as available at the given coordinate.
    pub fn add_quest(&self, at: Coordinate) {
        self.quests.write().push(at);
    }

    /// Drop all quests, as the nightly quest reset does.
    pub fn clear_quests(&self) {
        self.quests.write().clear();
    }

    /// Add a device or replace its state wholesale.
    pub fn upsert_device(&self, origin: impl Into<String>, state: DeviceState) {
        self.devices.write().insert(origin.into(), state);
    }

    /// Remove a device from the inventory.
    pub fn remove_device(&self, origin: &str) {
        self.devices.write().remove(origin);
    }

    /// Flip the injection flag of an existing device.
    pub fn set_injected(&self, origin: &str, injected: bool) {
        if let Some(state) = self.devices.write().get_mut(origin) {
            state.injected = injected;
        }
    }

    /// Record that a device delivered data at the given Unix timestamp.
    pub fn touch_last_data(&self, origin: &str, timestamp: i64) {
        if let Some(state) = self.devices.write().get_mut(origin) {
            state.last_data = Some(timestamp);
        }
    }

    fn count_in_region(points: &[Coordinate], region: &[Coordinate]) -> u64 {
        points
            .iter()
            .filter(|p| polygon_contains(region, p))
            .count() as u64
    }
}

impl GeofenceRegistry for InMemoryHost {
    fn areas_of_kind(&self, kind: AreaKind) -> Vec<AreaDefinition> {
        self.areas
            .read()
            .iter()
            .filter(|a| a.kind == kind)
            .cloned()
            .collect()
    }

    fn fence_coordinates(&self, fence: &str) -> Option<Vec<Coordinate>> {
        self.fences.read().get(fence).cloned()
    }
}

impl DeviceRegistry for InMemoryHost {
    fn device_origins(&self) -> Vec<String> {
        self.devices.read().keys().cloned().collect()
    }
}

impl DeviceStatusMap for InMemoryHost {
    fn latest(&self, origin: &str, key: StatusKey) -> Option<StatusValue> {
        let devices = self.devices.read();
        let state = devices.get(origin)?;
        match key {
            StatusKey::Injected => Some(StatusValue::Flag(state.injected)),
            StatusKey::ScanMode => state.mode.clone().map(StatusValue::Text),
            StatusKey::LastData => state.last_data.map(StatusValue::Timestamp),
        }
    }
}

impl PoiStore for InMemoryHost {
    fn pokestop_count(&self, region: &[Coordinate]) -> Result<u64> {
        Ok(Self::count_in_region(&self.pokestops.read(), region))
    }

    fn quest_count(&self, region: &[Coordinate]) -> Result<u64> {
        Ok(Self::count_in_region(&self.quests.read(), region))
    }
}
