//! Geofence areas and the registry that answers fence lookups.

use serde::{Deserialize, Serialize};

/// A single WGS84 vertex of a fence polygon.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinate {
    /// Create a coordinate from latitude and longitude.
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

/// Scan mode an area is configured for.
///
/// Mirrors the area modes the host knows; the exporter only queries
/// [`AreaKind::Pokestops`] areas but the registry can answer any kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AreaKind {
    Pokestops,
    MonMitm,
    RaidsMitm,
    IvMitm,
    Idle,
}

impl AreaKind {
    /// String form used in host configuration files.
    pub fn as_str(&self) -> &'static str {
        match self {
            AreaKind::Pokestops => "pokestops",
            AreaKind::MonMitm => "mon_mitm",
            AreaKind::RaidsMitm => "raids_mitm",
            AreaKind::IvMitm => "iv_mitm",
            AreaKind::Idle => "idle",
        }
    }
}

impl std::fmt::Display for AreaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A configured scan area.
///
/// An area references one or more named sub-fences; several areas may share
/// a sub-fence, so consumers deduplicate fence names before querying.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AreaDefinition {
    /// Area name as configured in the host.
    pub name: String,

    /// Scan mode of the area.
    pub kind: AreaKind,

    /// Names of the sub-fences this area covers.
    #[serde(default)]
    pub sub_fences: Vec<String>,
}

impl AreaDefinition {
    /// Create an area with no sub-fences.
    pub fn new(name: impl Into<String>, kind: AreaKind) -> Self {
        Self {
            name: name.into(),
            kind,
            sub_fences: Vec::new(),
        }
    }

    /// Add a sub-fence to this area.
    pub fn with_sub_fence(mut self, fence: impl Into<String>) -> Self {
        self.sub_fences.push(fence.into());
        self
    }
}

/// Read-only fence lookups exposed by the host.
pub trait GeofenceRegistry: Send + Sync {
    /// All configured areas of the given kind.
    fn areas_of_kind(&self, kind: AreaKind) -> Vec<AreaDefinition>;

    /// Polygon vertices for a fence name, or `None` when the fence is
    /// unknown to the host.
    fn fence_coordinates(&self, fence: &str) -> Option<Vec<Coordinate>>;

    /// Names of the read calls this subsystem answers, for diagnostic
    /// introspection.
    fn debug_attributes(&self) -> &'static [&'static str] {
        &["areas_of_kind", "fence_coordinates"]
    }
}

/// Whether a point lies inside a fence polygon (even-odd ray casting).
///
/// Degenerate polygons with fewer than three vertices contain nothing.
pub fn polygon_contains(polygon: &[Coordinate], point: &Coordinate) -> bool {
    if polygon.len() < 3 {
        return false;
    }

    let mut inside = false;
    let mut j = polygon.len() - 1;
    for i in 0..polygon.len() {
        let a = &polygon[i];
        let b = &polygon[j];

        // Edge straddles the point's latitude; division is safe because the
        // straddle check implies a.lat != b.lat.
        if (a.lat > point.lat) != (b.lat > point.lat) {
            let crossing = (b.lon - a.lon) * (point.lat - a.lat) / (b.lat - a.lat) + a.lon;
            if point.lon < crossing {
                inside = !inside;
            }
        }
        j = i;
    }

    inside
}
