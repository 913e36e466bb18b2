//! Device inventory and the in-memory status map the host maintains for
//! each worker.

use serde::{Deserialize, Serialize};

/// Status entry kinds tracked per device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusKey {
    /// Whether the device currently has a working injection.
    Injected,
    /// Scan mode the device is running.
    ScanMode,
    /// Unix timestamp of the last data the device delivered.
    LastData,
}

impl StatusKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            StatusKey::Injected => "injected",
            StatusKey::ScanMode => "scan_mode",
            StatusKey::LastData => "last_data",
        }
    }
}

impl std::fmt::Display for StatusKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Value stored for a status entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StatusValue {
    Flag(bool),
    Text(String),
    Timestamp(i64),
}

impl StatusValue {
    /// The boolean form, if this value is a flag.
    pub fn as_flag(&self) -> Option<bool> {
        match self {
            StatusValue::Flag(v) => Some(*v),
            _ => None,
        }
    }

    /// The string form, if this value is text.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            StatusValue::Text(v) => Some(v),
            _ => None,
        }
    }

    /// The timestamp form, if this value is a timestamp.
    pub fn as_timestamp(&self) -> Option<i64> {
        match self {
            StatusValue::Timestamp(v) => Some(*v),
            _ => None,
        }
    }
}

impl From<bool> for StatusValue {
    fn from(v: bool) -> Self {
        StatusValue::Flag(v)
    }
}

impl From<&str> for StatusValue {
    fn from(v: &str) -> Self {
        StatusValue::Text(v.to_string())
    }
}

impl From<String> for StatusValue {
    fn from(v: String) -> Self {
        StatusValue::Text(v)
    }
}

impl From<i64> for StatusValue {
    fn from(v: i64) -> Self {
        StatusValue::Timestamp(v)
    }
}

/// Read-only device inventory exposed by the host.
pub trait DeviceRegistry: Send + Sync {
    /// Origins of all configured devices, in stable order.
    fn device_origins(&self) -> Vec<String>;

    fn debug_attributes(&self) -> &'static [&'static str] {
        &["device_origins"]
    }
}

/// Read-only view of the host's per-device status map.
///
/// The map is volatile: entries appear once a device has checked in and may
/// lag behind or be missing entirely for configured but idle devices.
pub trait DeviceStatusMap: Send + Sync {
    /// Latest value for one status entry of one device, or `None` when the
    /// device has no entry yet.
    fn latest(&self, origin: &str, key: StatusKey) -> Option<StatusValue>;

    fn debug_attributes(&self) -> &'static [&'static str] {
        &["latest"]
    }
}
