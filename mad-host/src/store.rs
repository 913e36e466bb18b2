//! Point-of-interest store queries and the host error type.

use thiserror::Error;

use crate::geofence::Coordinate;

/// Errors surfaced by host subsystems.
#[derive(Error, Debug)]
pub enum HostError {
    /// A backing store query failed.
    #[error("store query failed: {0}")]
    Query(String),

    /// I/O error talking to the host.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, HostError>;

/// Read-only point-of-interest queries exposed by the host.
///
/// Counts are taken over a fence polygon; callers pass the polygon rather
/// than a fence name so the store stays free of geofence bookkeeping.
pub trait PoiStore: Send + Sync {
    /// Number of pokestops inside the given fence polygon.
    fn pokestop_count(&self, region: &[Coordinate]) -> Result<u64>;

    /// Number of pokestops inside the polygon that still have a quest.
    fn quest_count(&self, region: &[Coordinate]) -> Result<u64>;

    fn debug_attributes(&self) -> &'static [&'static str] {
        &["pokestop_count", "quest_count"]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_host_error_display() {
        let err = HostError::Query("connection reset".to_string());
        assert_eq!(err.to_string(), "store query failed: connection reset");
    }

    #[test]
    fn test_host_error_from_io() {
        let io = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe");
        let err: HostError = io.into();
        assert!(matches!(err, HostError::Io(_)));
    }
}
