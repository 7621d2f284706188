//! Parser for hourly balloon snapshots.
//!
//! A snapshot is a JSON array whose elements are either positional triples
//! `[lat, lon, alt]` or keyed objects `{id?, lat, lon, alt}`. Corruption is
//! tolerated at two levels: a payload that is missing or is not an array marks
//! the whole hour corrupt, while a bad element only drops that one point.

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::tracks::{EntityId, PointRecord};

/// One fetch result for a given hour, before any validation.
#[derive(Debug, Clone)]
pub enum RawSnapshot {
    Bytes(Vec<u8>),
    Text(String),
    Json(Value),
    /// Transport failure (network error, non-2xx, timeout, unreadable file).
    Failed(String),
}

/// What the parser made of one hour.
#[derive(Debug, Clone, PartialEq)]
pub enum SnapshotOutcome {
    Parsed {
        records: Vec<PointRecord>,
        /// elements that could not be turned into a valid point
        rejected: usize,
    },
    Corrupt {
        reason: String,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParsedSnapshot {
    pub hour_offset: u32,
    pub outcome: SnapshotOutcome,
}

impl ParsedSnapshot {
    pub fn is_corrupt(&self) -> bool {
        matches!(self.outcome, SnapshotOutcome::Corrupt { .. })
    }

    /// Accepted records; empty for a corrupt hour.
    pub fn records(&self) -> &[PointRecord] {
        match &self.outcome {
            SnapshotOutcome::Parsed { records, .. } => records,
            SnapshotOutcome::Corrupt { .. } => &[],
        }
    }

    pub fn rejected(&self) -> usize {
        match &self.outcome {
            SnapshotOutcome::Parsed { rejected, .. } => *rejected,
            SnapshotOutcome::Corrupt { .. } => 0,
        }
    }
}

/// The two wire encodings of a point.
#[derive(Deserialize)]
#[serde(untagged)]
enum WirePoint {
    Positional(Vec<Value>),
    Keyed(KeyedPoint),
}

#[derive(Deserialize)]
struct KeyedPoint {
    #[serde(default)]
    id: Option<Value>,
    #[serde(default, alias = "latitude")]
    lat: Value,
    #[serde(default, alias = "longitude")]
    lon: Value,
    #[serde(default, alias = "altitude")]
    alt: Value,
}

// numbers are kept as written, so out-of-range literals like 1e400 reach this check
fn finite(value: &Value) -> Option<f64> {
    value.as_f64().filter(|v| v.is_finite())
}

fn entity_id(id: Option<&Value>, index: usize) -> EntityId {
    match id {
        Some(Value::String(s)) if !s.is_empty() => EntityId::Named(s.clone()),
        Some(Value::Number(n)) => EntityId::Named(n.to_string()),
        _ => EntityId::Index(index),
    }
}

impl WirePoint {
    /// Canonicalizes one element. `index` is its position in the snapshot array.
    fn into_record(self, index: usize, hour_offset: u32) -> Option<PointRecord> {
        let (id, lat, lon, alt) = match self {
            WirePoint::Positional(values) => {
                let lat = values.first().and_then(finite);
                let lon = values.get(1).and_then(finite);
                let alt = values.get(2).and_then(finite);
                (EntityId::Index(index), lat, lon, alt)
            }
            WirePoint::Keyed(p) => (
                entity_id(p.id.as_ref(), index),
                finite(&p.lat),
                finite(&p.lon),
                finite(&p.alt),
            ),
        };

        // only latitude is range checked
        let lat = lat.filter(|lat| lat.abs() <= 90.0)?;
        let lon = lon?;

        Some(PointRecord {
            entity_id: id,
            lat,
            lon,
            alt,
            hour_offset,
        })
    }
}

fn corrupt(hour_offset: u32, reason: impl Into<String>) -> ParsedSnapshot {
    let reason = reason.into();
    warn!(hour = hour_offset, reason = %reason, "Corrupt snapshot");
    ParsedSnapshot {
        hour_offset,
        outcome: SnapshotOutcome::Corrupt { reason },
    }
}

/// Turns one raw payload into validated point records.
///
/// Never fails: anything that is not a JSON array yields a corrupt outcome,
/// and invalid elements are dropped and counted.
pub fn parse_snapshot(hour_offset: u32, raw: RawSnapshot) -> ParsedSnapshot {
    let decoded = match raw {
        RawSnapshot::Failed(reason) => return corrupt(hour_offset, reason),
        RawSnapshot::Bytes(bytes) => serde_json::from_slice::<Value>(&bytes),
        RawSnapshot::Text(text) => serde_json::from_str::<Value>(&text),
        RawSnapshot::Json(value) => Ok(value),
    };

    let items = match decoded {
        Ok(Value::Array(items)) => items,
        Ok(other) => {
            return corrupt(
                hour_offset,
                format!("expected an array of points, got {}", json_kind(&other)),
            );
        }
        Err(e) => return corrupt(hour_offset, format!("invalid JSON: {e}")),
    };

    let total = items.len();
    let records: Vec<PointRecord> = items
        .into_iter()
        .enumerate()
        .filter_map(|(index, item)| {
            serde_json::from_value::<WirePoint>(item)
                .ok()?
                .into_record(index, hour_offset)
        })
        .collect();
    let rejected = total - records.len();

    debug!(
        hour = hour_offset,
        accepted = records.len(),
        rejected,
        "Snapshot parsed"
    );

    ParsedSnapshot {
        hour_offset,
        outcome: SnapshotOutcome::Parsed { records, rejected },
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
