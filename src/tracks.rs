//! Grouping of validated points into per-balloon tracks.

use serde::{Serialize, Serializer};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use tracing::debug;

use crate::parser::ParsedSnapshot;

/// Identity of a balloon across snapshots.
///
/// `Index` is the element position inside a snapshot array and is only a
/// meaningful join key if the upstream keeps its ordering stable between hours.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EntityId {
    Named(String),
    Index(usize),
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityId::Named(name) => f.write_str(name),
            EntityId::Index(i) => write!(f, "#{i}"),
        }
    }
}

impl Serialize for EntityId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// A validated position observation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PointRecord {
    pub entity_id: EntityId,
    pub lat: f64,
    pub lon: f64,
    pub alt: Option<f64>,
    pub hour_offset: u32,
}

/// All observations of one balloon, most recent first. Never empty.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Track {
    entity_id: EntityId,
    points: Vec<PointRecord>,
}

impl Track {
    pub fn entity_id(&self) -> &EntityId {
        &self.entity_id
    }

    pub fn points(&self) -> &[PointRecord] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn latest(&self) -> &PointRecord {
        &self.points[0]
    }

    /// The latest and second-latest points, if there are two.
    pub fn most_recent_pair(&self) -> Option<(&PointRecord, &PointRecord)> {
        match self.points.as_slice() {
            [latest, previous, ..] => Some((latest, previous)),
            _ => None,
        }
    }

    /// True if the balloon was seen at an offset of at most `window_hours`.
    pub fn is_active(&self, window_hours: u32) -> bool {
        self.latest().hour_offset <= window_hours
    }
}

/// Frozen result of one ingestion pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Fleet {
    pub tracks: BTreeMap<EntityId, Track>,
    pub corrupt_file_count: usize,
    pub valid_point_count: usize,
    pub rejected_point_count: usize,
}

impl Fleet {
    /// Ingests a complete set of parsed hours in one go.
    pub fn from_snapshots(snapshots: impl IntoIterator<Item = ParsedSnapshot>) -> Self {
        let mut aggregator = TrackAggregator::new();
        for snapshot in snapshots {
            aggregator.ingest(snapshot);
        }
        aggregator.finish()
    }

    pub fn active_tracks(&self, window_hours: u32) -> impl Iterator<Item = &Track> {
        self.tracks
            .values()
            .filter(move |t| t.is_active(window_hours))
    }

    pub fn active_count(&self, window_hours: u32) -> usize {
        self.active_tracks(window_hours).count()
    }

    pub fn get(&self, id: &EntityId) -> Option<&Track> {
        self.tracks.get(id)
    }
}

/// Accumulates points while hours are being ingested.
#[derive(Debug, Default)]
pub struct TrackAggregator {
    points: HashMap<EntityId, Vec<PointRecord>>,
    corrupt_file_count: usize,
    valid_point_count: usize,
    rejected_point_count: usize,
}

impl TrackAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ingest(&mut self, snapshot: ParsedSnapshot) {
        if snapshot.is_corrupt() {
            self.corrupt_file_count += 1;
            return;
        }
        self.rejected_point_count += snapshot.rejected();

        for record in snapshot.records() {
            self.valid_point_count += 1;
            self.points
                .entry(record.entity_id.clone())
                .or_default()
                .push(record.clone());
        }
    }

    /// Sorts every track by recency and freezes the result.
    pub fn finish(self) -> Fleet {
        let tracks: BTreeMap<EntityId, Track> = self
            .points
            .into_iter()
            .map(|(entity_id, mut points)| {
                // stable, so same-hour duplicates keep their ingestion order
                points.sort_by_key(|p| p.hour_offset);
                (entity_id.clone(), Track { entity_id, points })
            })
            .collect();

        debug!(
            entities = tracks.len(),
            valid_points = self.valid_point_count,
            corrupt_files = self.corrupt_file_count,
            "Tracks aggregated"
        );

        Fleet {
            tracks,
            corrupt_file_count: self.corrupt_file_count,
            valid_point_count: self.valid_point_count,
            rejected_point_count: self.rejected_point_count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{RawSnapshot, parse_snapshot};

    fn hour(offset: u32, text: &str) -> ParsedSnapshot {
        parse_snapshot(offset, RawSnapshot::Text(text.to_string()))
    }

    #[test]
    fn test_tracks_sorted_by_recency() {
        let fleet = Fleet::from_snapshots(vec![
            hour(2, r#"[{"id": "A", "lat": 12, "lon": 0, "alt": 1}]"#),
            hour(0, r#"[{"id": "A", "lat": 10, "lon": 0, "alt": 1}]"#),
            hour(1, r#"[{"id": "A", "lat": 11, "lon": 0, "alt": 1}]"#),
        ]);

        let track = fleet.get(&EntityId::Named("A".into())).unwrap();
        let offsets: Vec<u32> = track.points().iter().map(|p| p.hour_offset).collect();
        assert_eq!(offsets, vec![0, 1, 2]);
        assert_eq!(track.latest().lat, 10.0);
    }

    #[test]
    fn test_counts_corrupt_hours_and_valid_points() {
        let fleet = Fleet::from_snapshots(vec![
            hour(0, "[[1, 2, 3], [4, 5, 6], [100, 0, 0]]"),
            parse_snapshot(1, RawSnapshot::Failed("timeout".into())),
            hour(2, "garbage"),
            hour(3, "[[1.5, 2.5, 3]]"),
        ]);

        assert_eq!(fleet.corrupt_file_count, 2);
        assert_eq!(fleet.valid_point_count, 3);
        assert_eq!(fleet.rejected_point_count, 1);
        assert_eq!(fleet.tracks.len(), 2);
        assert_eq!(fleet.get(&EntityId::Index(0)).unwrap().len(), 2);
    }

    #[test]
    fn test_active_window() {
        let fleet = Fleet::from_snapshots(vec![
            hour(3, r#"[{"id": "recent", "lat": 1, "lon": 1}]"#),
            hour(4, r#"[{"id": "stale", "lat": 1, "lon": 1}]"#),
            hour(20, r#"[{"id": "recent", "lat": 2, "lon": 2}]"#),
        ]);

        assert_eq!(fleet.tracks.len(), 2);
        assert_eq!(fleet.active_count(3), 1);
        let active: Vec<_> = fleet.active_tracks(3).map(|t| t.entity_id().to_string()).collect();
        assert_eq!(active, vec!["recent".to_string()]);
    }

    #[test]
    fn test_no_valid_point_is_lost() {
        let snapshots = vec![
            hour(0, r#"[[10, 20, 1], {"id": "A", "lat": -5, "lon": 7}, [95, 0, 0]]"#),
            hour(1, r#"[[11, 21, 1], {"id": "A", "lat": -6, "lon": 8}]"#),
        ];
        let accepted: Vec<PointRecord> = snapshots
            .iter()
            .flat_map(|s| s.records().to_vec())
            .collect();

        let fleet = Fleet::from_snapshots(snapshots);

        for record in accepted {
            let track = fleet.get(&record.entity_id).unwrap();
            assert!(track.points().iter().any(|p| p.hour_offset == record.hour_offset
                && p.lat == record.lat
                && p.lon == record.lon));
        }
    }

    #[test]
    fn test_most_recent_pair() {
        let fleet = Fleet::from_snapshots(vec![
            hour(0, r#"[{"id": "A", "lat": 1, "lon": 1}, {"id": "B", "lat": 1, "lon": 1}]"#),
            hour(1, r#"[{"id": "A", "lat": 2, "lon": 2}]"#),
        ]);

        let (latest, previous) = fleet
            .get(&EntityId::Named("A".into()))
            .unwrap()
            .most_recent_pair()
            .unwrap();
        assert_eq!((latest.hour_offset, previous.hour_offset), (0, 1));
        assert!(fleet.get(&EntityId::Named("B".into())).unwrap().most_recent_pair().is_none());
    }

    #[test]
    fn test_entity_id_display() {
        assert_eq!(EntityId::Named("W-12".into()).to_string(), "W-12");
        assert_eq!(EntityId::Index(7).to_string(), "#7");
    }
}
