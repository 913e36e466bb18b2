//! Demo host simulation.
//!
//! Seeds an in-memory host with areas, fences, pokestops and devices, then
//! keeps mutating device and quest state so successive scrapes visibly
//! change. Lets the exporter run without a real MAD instance.

use std::sync::Arc;
use std::time::Duration;

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use tokio::sync::watch;
use tracing::debug;

use mad_host::{
    AreaDefinition, AreaKind, Coordinate, DeviceRegistry, DeviceState, InMemoryHost,
};

/// Fence names and the offset of their unit-square polygon.
const FENCES: &[(&str, f64)] = &[("downtown", 0.0), ("old-town", 10.0), ("harbor", 20.0)];

fn square(offset: f64) -> Vec<Coordinate> {
    vec![
        Coordinate::new(offset, offset),
        Coordinate::new(offset, offset + 1.0),
        Coordinate::new(offset + 1.0, offset + 1.0),
        Coordinate::new(offset + 1.0, offset),
    ]
}

fn random_point(rng: &mut SmallRng) -> Coordinate {
    let (_, offset) = FENCES[rng.random_range(0..FENCES.len())];
    Coordinate::new(
        offset + rng.random_range(0.1..0.9),
        offset + rng.random_range(0.1..0.9),
    )
}

fn now_secs() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

/// Build a host resembling a small two-area MAD setup.
///
/// The "old-town" fence is shared by both areas, so fence deduplication is
/// visible on the demo exposition straight away.
pub fn seed_host() -> Arc<InMemoryHost> {
    let host = Arc::new(InMemoryHost::new());

    host.add_area(
        AreaDefinition::new("city-north", AreaKind::Pokestops)
            .with_sub_fence("downtown")
            .with_sub_fence("old-town"),
    );
    host.add_area(
        AreaDefinition::new("city-south", AreaKind::Pokestops)
            .with_sub_fence("old-town")
            .with_sub_fence("harbor"),
    );
    for (name, offset) in FENCES {
        host.set_fence(*name, square(*offset));
    }

    let mut rng = SmallRng::from_os_rng();
    for _ in 0..40 {
        let at = random_point(&mut rng);
        host.add_pokestop(at);
        if rng.random_range(0..3) == 0 {
            host.add_quest(at);
        }
    }

    let now = now_secs();
    for (origin, mode) in [
        ("atv01", "pokestops"),
        ("atv02", "pokestops"),
        ("atv03", "mon_mitm"),
        ("atv04", "raids_mitm"),
    ] {
        host.upsert_device(
            origin,
            DeviceState {
                injected: true,
                mode: Some(mode.to_string()),
                last_data: Some(now - rng.random_range(0..600)),
            },
        );
    }

    host
}

/// Mutate device and quest state until the shutdown signal is received.
pub async fn churn(
    host: Arc<InMemoryHost>,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut rng = SmallRng::from_os_rng();
    let mut ticker = tokio::time::interval(interval);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                step(&host, &mut rng);
            }
            result = shutdown.changed() => {
                if result.is_err() || *shutdown.borrow() {
                    break;
                }
            }
        }
    }

    debug!("Demo churn stopped");
}

fn step(host: &InMemoryHost, rng: &mut SmallRng) {
    let origins = host.device_origins();
    if origins.is_empty() {
        return;
    }

    // One device checks in per tick; injections drop out now and then.
    let origin = &origins[rng.random_range(0..origins.len())];
    host.set_injected(origin, rng.random_range(0..4) != 0);
    host.touch_last_data(origin, now_secs());

    // Quests complete over the day and reappear after the nightly reset.
    match rng.random_range(0..10) {
        0 => host.clear_quests(),
        1..=4 => host.add_quest(random_point(rng)),
        _ => {}
    }

    debug!(device = %origin, "Demo host state advanced");
}
