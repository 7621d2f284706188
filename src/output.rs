//! Output formatting and persistence for analysis reports.
//!
//! Supports pretty-printing, JSON serialization, and CSV append of per-balloon scores.

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info};

use crate::analyzers::types::AnalysisReport;
use crate::tracks::EntityId;
use crate::wind::PressureLevel;
use csv::WriterBuilder;
use std::fs::OpenOptions;

/// One CSV row per scored balloon.
#[derive(Debug, Serialize)]
struct ScoreRow<'a> {
    timestamp: DateTime<Utc>,
    entity_id: &'a EntityId,
    level: PressureLevel,
    balloon_speed_kmh: f64,
    wind_speed_kmh: f64,
    wind_direction_deg: Option<f64>,
    score: u8,
    distance_km: f64,
    elapsed_hours: f64,
}

/// Logs the fleet summary using Rust's debug pretty-print format.
pub fn print_pretty(report: &AnalysisReport) {
    debug!("{:#?}", report.summary);
}

/// Serializes the whole report (tracks, scores and summary) as pretty-printed JSON.
pub fn report_json(report: &AnalysisReport) -> Result<String> {
    Ok(serde_json::to_string_pretty(report)?)
}

/// Logs the report as pretty-printed JSON.
pub fn print_json(report: &AnalysisReport) -> Result<()> {
    info!("{}", report_json(report)?);
    Ok(())
}

/// Appends one row per scored balloon of `report` to a CSV file.
///
/// Writes the header only if the file does not exist yet or is empty. Returns the number of rows written.
pub fn append_record(path: &str, report: &AnalysisReport) -> Result<usize> {
    // an empty file left by a pass without scores still needs the header
    let has_rows = std::fs::metadata(path).map(|m| m.len() > 0).unwrap_or(false);
    debug!(path, has_rows, rows = report.scores.len(), "Appending CSV records");

    let file = OpenOptions::new().append(true).create(true).open(path)?;

    let mut writer = WriterBuilder::new()
        .has_headers(!has_rows) // IMPORTANT when appending
        .from_writer(file);

    for result in report.scores.values() {
        writer.serialize(ScoreRow {
            timestamp: report.generated_at,
            entity_id: &result.entity_id,
            level: result.level,
            balloon_speed_kmh: result.balloon_speed_kmh,
            wind_speed_kmh: result.wind_speed_kmh,
            wind_direction_deg: result.wind_direction_deg,
            score: result.score,
            distance_km: result.distance_km,
            elapsed_hours: result.elapsed_hours,
        })?;
    }
    writer.flush()?;

    Ok(report.scores.len())
}
