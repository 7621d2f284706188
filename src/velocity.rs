//! Great-circle ground speed from the two most recent observations of a track.

use serde::Serialize;

use crate::tracks::Track;

/// Mean earth radius used for haversine distances.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Lower bound for the time between two observations.
pub const MIN_ELAPSED_HOURS: f64 = 0.1;

/// Haversine distance in km between two lat/lon positions given in degrees.
pub fn haversine_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let lat1_rad = lat1.to_radians();
    let lat2_rad = lat2.to_radians();
    let delta_lat = (lat2 - lat1).to_radians();
    let delta_lon = (lon2 - lon1).to_radians();

    let a = (delta_lat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (delta_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_KM * c
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SpeedEstimate {
    pub distance_km: f64,
    pub elapsed_hours: f64,
    pub speed_kmh: f64,
}

/// Speed between the latest and second-latest point.
///
/// Returns `None` for single-point tracks, which is different from a balloon
/// that did not move (`speed_kmh == 0.0`).
pub fn estimate_speed(track: &Track) -> Option<SpeedEstimate> {
    let (latest, previous) = track.most_recent_pair()?;

    let distance_km = haversine_km(latest.lat, latest.lon, previous.lat, previous.lon);
    let elapsed_hours = (f64::from(previous.hour_offset) - f64::from(latest.hour_offset))
        .abs()
        .max(MIN_ELAPSED_HOURS);

    Some(SpeedEstimate {
        distance_km,
        elapsed_hours,
        speed_kmh: distance_km / elapsed_hours,
    })
}
