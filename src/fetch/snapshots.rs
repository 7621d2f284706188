//! Hourly snapshot sources and the concurrent fetch of a whole window.

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{Instrument, debug, warn};

use super::{HttpClient, fetch_bytes};
use crate::parser::RawSnapshot;

/// File name of the snapshot `hour` hours old, e.g. `07.json`.
pub fn snapshot_file_name(hour: u32) -> String {
    format!("{hour:02}.json")
}

/// Anything that can deliver the raw payload of one hourly snapshot.
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    async fn fetch_hour(&self, hour: u32) -> Result<Vec<u8>>;
}

/// Fetches `{base_url}/{hh}.json` over HTTP.
pub struct HttpSnapshotSource<C> {
    client: C,
    base_url: String,
}

impl<C: HttpClient> HttpSnapshotSource<C> {
    pub fn new(client: C, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    pub fn url_for(&self, hour: u32) -> String {
        format!("{}/{}", self.base_url, snapshot_file_name(hour))
    }
}

#[async_trait]
impl<C: HttpClient> SnapshotSource for HttpSnapshotSource<C> {
    async fn fetch_hour(&self, hour: u32) -> Result<Vec<u8>> {
        let url = self.url_for(hour);
        fetch_bytes(&self.client, &url)
            .await
            .with_context(|| format!("GET {url} failed"))
    }
}

/// Reads `{dir}/{hh}.json` from a local directory, e.g. a saved copy of the feed.
pub struct DirSnapshotSource {
    dir: PathBuf,
}

impl DirSnapshotSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

#[async_trait]
impl SnapshotSource for DirSnapshotSource {
    async fn fetch_hour(&self, hour: u32) -> Result<Vec<u8>> {
        let path = self.dir.join(snapshot_file_name(hour));
        tokio::fs::read(&path)
            .await
            .with_context(|| format!("failed to read {}", path.display()))
    }
}

/// Fetches hours `0..hours` concurrently and waits for every one of them to settle.
///
/// The result has one entry per hour, ordered by offset. A failed fetch, or a task
/// that died, shows up as [`RawSnapshot::Failed`] without affecting the other hours.
#[tracing::instrument(skip(source))]
pub async fn fetch_snapshots<S>(
    source: Arc<S>,
    hours: u32,
    concurrency: usize,
) -> Vec<(u32, RawSnapshot)>
where
    S: SnapshotSource + ?Sized + 'static,
{
    let semaphore = Arc::new(Semaphore::new(concurrency.clamp(1, Semaphore::MAX_PERMITS)));
    let mut tasks = Vec::with_capacity(hours as usize);

    for hour in 0..hours {
        let source = source.clone();
        let sem = semaphore.clone();
        let span = tracing::debug_span!("fetch_snapshot", hour);

        let task = tokio::spawn(
            async move {
                let _permit = sem.acquire_owned().await?;
                source.fetch_hour(hour).await
            }
            .instrument(span),
        );
        tasks.push((hour, task));
    }

    let mut snapshots = Vec::with_capacity(tasks.len());
    for (hour, task) in tasks {
        let raw = match task.await {
            Ok(Ok(bytes)) => {
                debug!(hour, bytes = bytes.len(), "Snapshot received");
                RawSnapshot::Bytes(bytes)
            }
            Ok(Err(e)) => {
                warn!(hour, error = %format!("{e:#}"), "Snapshot fetch failed");
                RawSnapshot::Failed(format!("{e:#}"))
            }
            Err(e) => {
                warn!(hour, error = %e, "Snapshot task did not complete");
                RawSnapshot::Failed(e.to_string())
            }
        };
        snapshots.push((hour, raw));
    }

    snapshots
}
