//! End-to-end pass: fetch the snapshot window, aggregate it, score it.

use std::sync::Arc;
use tracing::info;

use crate::analyzers::analyzer::{AnalysisOptions, analyze};
use crate::analyzers::types::AnalysisReport;
use crate::fetch::{SnapshotSource, fetch_snapshots};
use crate::parser::parse_snapshot;
use crate::tracks::Fleet;
use crate::wind::WindModel;

/// Fetches and parses hours `0..hours`, then freezes them into a [`Fleet`].
///
/// Aggregation only starts once every hour has settled.
pub async fn ingest<S>(source: Arc<S>, hours: u32, concurrency: usize) -> Fleet
where
    S: SnapshotSource + ?Sized + 'static,
{
    let snapshots = fetch_snapshots(source, hours, concurrency).await;
    let fleet = Fleet::from_snapshots(
        snapshots
            .into_iter()
            .map(|(hour, raw)| parse_snapshot(hour, raw)),
    );

    info!(
        entities = fleet.tracks.len(),
        valid_points = fleet.valid_point_count,
        rejected_points = fleet.rejected_point_count,
        corrupt_files = fleet.corrupt_file_count,
        "Snapshots ingested"
    );
    fleet
}

/// One complete pass. Each call starts from scratch; nothing carries over between passes.
pub async fn run_pass<S, M>(
    source: Arc<S>,
    wind: Arc<M>,
    hours: u32,
    options: &AnalysisOptions,
) -> AnalysisReport
where
    S: SnapshotSource + ?Sized + 'static,
    M: WindModel + ?Sized + 'static,
{
    let fleet = ingest(source, hours, options.concurrency).await;
    analyze(fleet, wind, options).await
}
