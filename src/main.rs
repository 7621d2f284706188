//! CLI entry point for the balloon wind rater.
//!
//! Fetches the hourly balloon snapshots, rebuilds per-balloon tracks and
//! scores how well each balloon's ground speed matches the modeled wind.

use anyhow::Result;
use balloon_wind_rater::{
    analyzers::types::AnalysisReport,
    config::Config,
    fetch::{BasicClient, DirSnapshotSource, HttpSnapshotSource, SnapshotSource},
    infra::openmeteo::OpenMeteoClient,
    output::{append_record, print_json, print_pretty},
    pipeline::{ingest, run_pass},
    velocity::estimate_speed,
    wind::{CachedWindModel, WindModel},
};
use clap::{Parser, Subcommand};
use std::ffi::OsStr;
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "balloon_wind_rater")]
#[command(about = "Correlates balloon ground speed with modeled wind", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch the snapshot window, score every active balloon and report the fleet summary
    Analyze {
        /// Base URL or directory holding 00.json .. 23.json (overrides SNAPSHOT_SOURCE)
        #[arg(short, long)]
        source: Option<String>,

        /// CSV file to append per-balloon scores to
        #[arg(short, long)]
        output: Option<String>,

        /// Also log scores and summary as JSON
        #[arg(long, default_value_t = false)]
        json: bool,

        /// Number of analysis passes (0 = infinite)
        #[arg(short = 'n', long, default_value_t = 1)]
        passes: usize,

        /// Seconds to wait between passes
        #[arg(short, long, default_value_t = 3600)]
        interval: u64,

        /// Reuse wind samples for identical positions within a pass (overrides WIND_CACHE)
        #[arg(long, default_value_t = false)]
        wind_cache: bool,
    },
    /// Fetch the snapshot window and list the reconstructed tracks
    Tracks {
        /// Base URL or directory holding 00.json .. 23.json (overrides SNAPSHOT_SOURCE)
        #[arg(short, long)]
        source: Option<String>,

        /// Include balloons not seen within the active window
        #[arg(short, long, default_value_t = false)]
        all: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path = std::env::var("LOG_FILE_PATH")
        .unwrap_or_else(|_| "logs/balloon_wind_rater.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("balloon_wind_rater.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();
    let mut config = Config::from_env()?;

    match cli.command {
        Commands::Analyze {
            source,
            output,
            json,
            passes,
            interval,
            wind_cache,
        } => {
            if let Some(source) = source {
                config.snapshot_source = source;
            }
            config.wind_cache |= wind_cache;

            analyze_passes(&config, output.as_deref(), json, passes, interval).await?;
        }
        Commands::Tracks { source, all } => {
            if let Some(source) = source {
                config.snapshot_source = source;
            }

            list_tracks(&config, all).await?;
        }
    }

    Ok(())
}

/// Picks the HTTP or directory source depending on the configured location.
fn snapshot_source(config: &Config) -> Result<Arc<dyn SnapshotSource>> {
    let source: Arc<dyn SnapshotSource> = if config.snapshot_source_is_remote() {
        let client = BasicClient::new(config.request_timeout)?;
        Arc::new(HttpSnapshotSource::new(client, config.snapshot_source.as_str()))
    } else {
        Arc::new(DirSnapshotSource::new(&config.snapshot_source))
    };
    Ok(source)
}

/// A fresh wind model per pass, so cached samples never outlive the pass.
fn wind_model(config: &Config) -> Result<Arc<dyn WindModel>> {
    let client = OpenMeteoClient::new(
        BasicClient::new(config.request_timeout)?,
        config.wind_api_url.as_str(),
    );
    let model: Arc<dyn WindModel> = if config.wind_cache {
        Arc::new(CachedWindModel::new(client))
    } else {
        Arc::new(client)
    };
    Ok(model)
}

/// Runs `passes` analysis passes (0 = until interrupted), each replacing the previous results.
#[tracing::instrument(skip(config, output, json), fields(source = %config.snapshot_source))]
async fn analyze_passes(
    config: &Config,
    output: Option<&str>,
    json: bool,
    passes: usize,
    interval: u64,
) -> Result<()> {
    if passes == 0 {
        info!(interval, "Analyzing infinitely. Press Ctrl+C to stop.");
    }

    let source = snapshot_source(config)?;
    let options = config.analysis_options();
    let mut pass = 0;

    loop {
        if passes > 0 && pass >= passes {
            break;
        }
        pass += 1;

        info!(
            pass,
            total = if passes == 0 { None } else { Some(passes) },
            "Starting analysis pass"
        );

        let wind = wind_model(config)?;
        let report = run_pass(source.clone(), wind, config.snapshot_hours, &options).await;
        report_scores(&report);

        if json {
            print_json(&report)?;
        }
        if let Some(path) = output {
            match append_record(path, &report) {
                Ok(rows) => info!(path, rows, "Scores appended"),
                Err(e) => error!(path, error = %e, "Failed to write scores"),
            }
        }

        if passes == 0 || pass < passes {
            info!(interval, "Waiting before next pass");
            tokio::time::sleep(tokio::time::Duration::from_secs(interval)).await;
        }
    }

    Ok(())
}

fn report_scores(report: &AnalysisReport) {
    for result in report.scores.values() {
        info!(
            balloon = %result.entity_id,
            level = %result.level,
            balloon_kmh = %format!("{:.1}", result.balloon_speed_kmh),
            wind_kmh = %format!("{:.1}", result.wind_speed_kmh),
            score = result.score,
            "Balloon"
        );
    }

    let summary = &report.summary;
    info!(
        active = summary.active_count,
        scored = summary.scored_count,
        scored_pct = %format!("{:.0}", summary.scored_pct()),
        average_score = summary.average_score,
        corrupt_files = summary.corrupt_file_count,
        valid_points = summary.valid_point_count,
        "Fleet summary"
    );
    print_pretty(report);
}

/// Ingests the snapshot window and logs every (active) track.
#[tracing::instrument(skip(config), fields(source = %config.snapshot_source))]
async fn list_tracks(config: &Config, all: bool) -> Result<()> {
    let source = snapshot_source(config)?;
    let fleet = ingest(source, config.snapshot_hours, config.max_concurrency).await;
    let window = config.active_window_hours;

    for track in fleet.tracks.values() {
        let active = track.is_active(window);
        if !all && !active {
            continue;
        }
        let latest = track.latest();
        let speed_kmh = estimate_speed(track).map(|e| format!("{:.1}", e.speed_kmh));

        info!(
            balloon = %track.entity_id(),
            points = track.len(),
            active,
            latest_hour = latest.hour_offset,
            lat = latest.lat,
            lon = latest.lon,
            alt = latest.alt,
            speed_kmh = speed_kmh.as_deref().unwrap_or("n/a"),
            "Track"
        );
    }

    let single_point = fleet
        .active_tracks(window)
        .filter(|t| t.len() < 2)
        .count();

    info!(
        total = fleet.tracks.len(),
        active = fleet.active_count(window),
        single_point,
        valid_points = fleet.valid_point_count,
        rejected_points = fleet.rejected_point_count,
        corrupt_files = fleet.corrupt_file_count,
        "Track summary"
    );

    Ok(())
}
