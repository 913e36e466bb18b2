//! MAD Host Interface
//!
//! This crate provides the read-only view plugins get of a running MAD
//! (Map'A'Droid) instance:
//!
//! - [`geofence`] - Scan areas, fence polygons and point-in-polygon tests
//! - [`device`] - Device inventory and the per-device status map
//! - [`store`] - Point-of-interest store queries and the host error type
//! - [`memory`] - A self-contained in-memory host for demos and tests
//!
//! Plugins hold each subsystem as an optional handle. A subsystem the host
//! did not wire up is simply `None`; plugins are expected to degrade rather
//! than fail when a handle is missing.

pub mod device;
pub mod geofence;
pub mod memory;
pub mod store;

// Re-export commonly used types at the crate root
pub use device::{DeviceRegistry, DeviceStatusMap, StatusKey, StatusValue};
pub use geofence::{
    AreaDefinition, AreaKind, Coordinate, GeofenceRegistry, polygon_contains,
};
pub use memory::{DeviceState, InMemoryHost};
pub use store::{HostError, PoiStore, Result};
