//! Data types produced by an analysis pass.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

use crate::analyzers::score::match_score;
use crate::stats::FleetSummary;
use crate::tracks::{EntityId, Fleet};
use crate::velocity::SpeedEstimate;
use crate::wind::{PressureLevel, WindSample};

/// Outcome of correlating one balloon with the modeled wind at its level.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreResult {
    pub entity_id: EntityId,
    pub balloon_speed_kmh: f64,
    pub wind_speed_kmh: f64,
    pub score: u8,
    pub level: PressureLevel,
    pub wind_direction_deg: Option<f64>,
    pub distance_km: f64,
    pub elapsed_hours: f64,
}

impl ScoreResult {
    pub fn new(
        entity_id: EntityId,
        estimate: &SpeedEstimate,
        level: PressureLevel,
        sample: &WindSample,
    ) -> Self {
        ScoreResult {
            entity_id,
            balloon_speed_kmh: estimate.speed_kmh,
            wind_speed_kmh: sample.speed_kmh,
            score: match_score(estimate.speed_kmh, sample.speed_kmh),
            level,
            wind_direction_deg: sample.direction_deg,
            distance_km: estimate.distance_km,
            elapsed_hours: estimate.elapsed_hours,
        }
    }
}

/// Everything one pass hands to the presentation side.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub generated_at: DateTime<Utc>,
    pub fleet: Fleet,
    pub scores: BTreeMap<EntityId, ScoreResult>,
    pub summary: FleetSummary,
}
