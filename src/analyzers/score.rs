use crate::analyzers::utility::mean;

/// Score for a balloon whose speed exactly matches the modeled wind.
pub const MAX_SCORE: u8 = 100;

/// Points lost per km/h of speed difference.
pub const PENALTY_PER_KMH: f64 = 2.0;

/// Converts the speed difference into a match score.
///
/// `round(100 - 2 * |balloon - wind|)`, clamped to `0..=100`.
pub fn match_score(balloon_kmh: f64, wind_kmh: f64) -> u8 {
    let raw = (f64::from(MAX_SCORE) - PENALTY_PER_KMH * (balloon_kmh - wind_kmh).abs()).round();
    raw.clamp(0.0, f64::from(MAX_SCORE)) as u8
}

/// Rounded mean of all computed scores, 0 if there are none.
pub fn fleet_average(scores: impl IntoIterator<Item = u8>) -> u8 {
    let values: Vec<f64> = scores.into_iter().map(f64::from).collect();
    mean(&values).round() as u8
}
