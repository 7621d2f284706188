//! HTTP plumbing and snapshot retrieval.

mod basic;
mod client;
pub mod snapshots;

pub use basic::BasicClient;
pub use client::HttpClient;
pub use snapshots::{DirSnapshotSource, HttpSnapshotSource, SnapshotSource, fetch_snapshots};

use anyhow::Result;

/// Issues a GET for `url` and returns the body.
///
/// # Errors
///
/// Fails on transport errors and on any non-2xx status.
pub async fn fetch_bytes<C: HttpClient + ?Sized>(client: &C, url: &str) -> Result<Vec<u8>> {
    let req = reqwest::Request::new(reqwest::Method::GET, url.parse()?);

    let resp = client.execute(req).await?.error_for_status()?;
    Ok(resp.bytes().await?.to_vec())
}
