use serde::Serialize;
use std::collections::BTreeMap;

use crate::analyzers::score::fleet_average;
use crate::analyzers::types::ScoreResult;
use crate::tracks::{EntityId, Fleet};

/// Fleet-wide figures derived from one analysis pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FleetSummary {
    pub active_count: usize,
    pub corrupt_file_count: usize,
    pub average_score: u8,

    // data quality
    pub valid_point_count: usize,
    pub rejected_point_count: usize,
    pub total_entities: usize,
    pub scored_count: usize,
}

impl FleetSummary {
    pub fn new(
        fleet: &Fleet,
        scores: &BTreeMap<EntityId, ScoreResult>,
        active_window_hours: u32,
    ) -> Self {
        FleetSummary {
            active_count: fleet.active_count(active_window_hours),
            corrupt_file_count: fleet.corrupt_file_count,
            average_score: fleet_average(scores.values().map(|s| s.score)),
            valid_point_count: fleet.valid_point_count,
            rejected_point_count: fleet.rejected_point_count,
            total_entities: fleet.tracks.len(),
            scored_count: scores.len(),
        }
    }

    pub fn pct(part: usize, total: usize) -> f64 {
        if total == 0 {
            0.0
        } else {
            (part as f64 / total as f64) * 100.0
        }
    }

    /// Share of active balloons that received a score.
    pub fn scored_pct(&self) -> f64 {
        Self::pct(self.scored_count, self.active_count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{RawSnapshot, parse_snapshot};
    use crate::wind::PressureLevel;

    fn score(id: &str, score: u8) -> (EntityId, ScoreResult) {
        let entity_id = EntityId::Named(id.to_string());
        (
            entity_id.clone(),
            ScoreResult {
                entity_id,
                balloon_speed_kmh: 0.0,
                wind_speed_kmh: 0.0,
                score,
                level: PressureLevel::Surface,
                wind_direction_deg: None,
                distance_km: 0.0,
                elapsed_hours: 1.0,
            },
        )
    }

    #[test]
    fn test_pct_with_zero_total() {
        assert_eq!(FleetSummary::pct(10, 0), 0.0);
    }

    #[test]
    fn test_pct_normal_values() {
        assert_eq!(FleetSummary::pct(50, 100), 50.0);
        assert_eq!(FleetSummary::pct(1, 4), 25.0);
    }

    #[test]
    fn test_summary_from_fleet_and_scores() {
        let fleet = Fleet::from_snapshots(vec![
            parse_snapshot(0, RawSnapshot::Text(r#"[{"id": "A", "lat": 1, "lon": 1}, {"id": "B", "lat": 1, "lon": 1}]"#.into())),
            parse_snapshot(1, RawSnapshot::Failed("500".into())),
            parse_snapshot(8, RawSnapshot::Text(r#"[{"id": "C", "lat": 1, "lon": 1}, [200, 0, 0]]"#.into())),
        ]);
        let scores: BTreeMap<_, _> = vec![score("A", 100), score("B", 70)].into_iter().collect();

        let summary = FleetSummary::new(&fleet, &scores, 3);

        assert_eq!(summary.active_count, 2);
        assert_eq!(summary.corrupt_file_count, 1);
        assert_eq!(summary.average_score, 85);
        assert_eq!(summary.valid_point_count, 3);
        assert_eq!(summary.rejected_point_count, 1);
        assert_eq!(summary.total_entities, 3);
        assert_eq!(summary.scored_pct(), 100.0);
    }

    #[test]
    fn test_summary_without_scores() {
        let summary = FleetSummary::new(&Fleet::default(), &BTreeMap::new(), 3);
        assert_eq!(summary, FleetSummary::default());
    }
}
