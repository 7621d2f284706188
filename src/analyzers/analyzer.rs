use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{Instrument, debug, info, warn};

use crate::analyzers::types::{AnalysisReport, ScoreResult};
use crate::stats::FleetSummary;
use crate::tracks::{EntityId, Fleet, Track};
use crate::velocity::{SpeedEstimate, estimate_speed};
use crate::wind::{WindModel, WindQuery, sample_wind};

#[derive(Debug, Clone, Copy)]
pub struct AnalysisOptions {
    /// Largest hour offset at which a balloon still counts as active.
    pub active_window_hours: u32,
    /// Upper bound for concurrent wind lookups.
    pub concurrency: usize,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            active_window_hours: 3,
            concurrency: 16,
        }
    }
}

/// A balloon that has a speed estimate and still needs a wind sample.
struct Candidate {
    entity_id: EntityId,
    estimate: SpeedEstimate,
    query: WindQuery,
}

fn candidate(track: &Track) -> Option<Candidate> {
    let Some(estimate) = estimate_speed(track) else {
        debug!(entity = %track.entity_id(), "Single observation, no speed estimate");
        return None;
    };
    let latest = track.latest();

    Some(Candidate {
        entity_id: track.entity_id().clone(),
        estimate,
        query: WindQuery::new(latest.lat, latest.lon, latest.alt),
    })
}

/// Runs one analysis pass over a frozen fleet.
///
/// Wind lookups for the active balloons run concurrently. Balloons without a
/// speed estimate or without a wind sample get no score and do not count
/// towards the fleet average.
#[tracing::instrument(skip_all, fields(entities = fleet.tracks.len()))]
pub async fn analyze<M>(fleet: Fleet, wind: Arc<M>, options: &AnalysisOptions) -> AnalysisReport
where
    M: WindModel + ?Sized + 'static,
{
    let candidates: Vec<Candidate> = fleet
        .active_tracks(options.active_window_hours)
        .filter_map(candidate)
        .collect();

    info!(
        active = fleet.active_count(options.active_window_hours),
        candidates = candidates.len(),
        "Requesting wind samples"
    );

    let semaphore = Arc::new(Semaphore::new(
        options.concurrency.clamp(1, Semaphore::MAX_PERMITS),
    ));
    let mut tasks = Vec::with_capacity(candidates.len());

    for c in candidates {
        let wind = wind.clone();
        let sem = semaphore.clone();
        let query = c.query;
        let span = tracing::debug_span!("wind_lookup", entity = %c.entity_id, level = %query.level);

        let task = tokio::spawn(
            async move {
                let _permit = sem.acquire_owned().await.ok()?;
                sample_wind(wind.as_ref(), &query).await
            }
            .instrument(span),
        );
        tasks.push((c, task));
    }

    let mut scores = BTreeMap::new();
    for (c, task) in tasks {
        let sample = match task.await {
            Ok(sample) => sample,
            Err(e) => {
                warn!(entity = %c.entity_id, error = %e, "Wind lookup task did not complete");
                None
            }
        };

        let Some(sample) = sample else {
            debug!(entity = %c.entity_id, "No wind sample, skipping score");
            continue;
        };

        let result = ScoreResult::new(c.entity_id.clone(), &c.estimate, c.query.level, &sample);
        debug!(
            entity = %c.entity_id,
            balloon_kmh = result.balloon_speed_kmh,
            wind_kmh = result.wind_speed_kmh,
            score = result.score,
            "Balloon scored"
        );
        scores.insert(c.entity_id, result);
    }

    let summary = FleetSummary::new(&fleet, &scores, options.active_window_hours);
    info!(
        active = summary.active_count,
        scored = summary.scored_count,
        average_score = summary.average_score,
        corrupt_files = summary.corrupt_file_count,
        "Analysis pass complete"
    );

    AnalysisReport {
        generated_at: Utc::now(),
        fleet,
        scores,
        summary,
    }
}
