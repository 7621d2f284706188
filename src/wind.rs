//! Modeled wind at a balloon's position and altitude.
//!
//! The altitude picks one of three pressure levels; a [`WindModel`] answers the
//! query for that level. Lookup failures are absorbed here and surface as
//! "no sample" so that callers simply skip the affected balloon.

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::sync::Mutex;
use tracing::{debug, warn};

/// Altitudes with a smaller magnitude than this are taken to be kilometers.
pub const KM_ALTITUDE_LIMIT: f64 = 100.0;

pub const JET_STREAM_MIN_M: f64 = 11_000.0;
pub const MID_TROPOSPHERE_MIN_M: f64 = 5_000.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum PressureLevel {
    #[serde(rename = "200 hPa")]
    Hpa200,
    #[serde(rename = "500 hPa")]
    Hpa500,
    #[serde(rename = "10 m")]
    Surface,
}

impl PressureLevel {
    /// Level for an altitude already normalized to meters.
    pub fn for_altitude_m(altitude_m: f64) -> Self {
        if altitude_m > JET_STREAM_MIN_M {
            PressureLevel::Hpa200
        } else if altitude_m > MID_TROPOSPHERE_MIN_M {
            PressureLevel::Hpa500
        } else {
            PressureLevel::Surface
        }
    }

    /// Level for a raw reported altitude. Unknown altitudes map to the surface.
    pub fn for_reported_altitude(alt: Option<f64>) -> Self {
        alt.map(normalize_altitude_m)
            .map(Self::for_altitude_m)
            .unwrap_or(PressureLevel::Surface)
    }

    pub fn label(&self) -> &'static str {
        match self {
            PressureLevel::Hpa200 => "200 hPa",
            PressureLevel::Hpa500 => "500 hPa",
            PressureLevel::Surface => "10 m",
        }
    }

    /// Suffix of the wind model variables for this level.
    pub fn variable_suffix(&self) -> &'static str {
        match self {
            PressureLevel::Hpa200 => "200hPa",
            PressureLevel::Hpa500 => "500hPa",
            PressureLevel::Surface => "10m",
        }
    }

    pub fn speed_variable(&self) -> String {
        format!("wind_speed_{}", self.variable_suffix())
    }

    pub fn direction_variable(&self) -> String {
        format!("wind_direction_{}", self.variable_suffix())
    }
}

impl fmt::Display for PressureLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Reported altitudes come either in km or in m; small values are km.
pub fn normalize_altitude_m(alt: f64) -> f64 {
    if alt.abs() < KM_ALTITUDE_LIMIT {
        alt * 1000.0
    } else {
        alt
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindQuery {
    pub lat: f64,
    pub lon: f64,
    pub level: PressureLevel,
}

impl WindQuery {
    pub fn new(lat: f64, lon: f64, alt: Option<f64>) -> Self {
        Self {
            lat,
            lon,
            level: PressureLevel::for_reported_altitude(alt),
        }
    }
}

/// Modeled wind for the queried instant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WindSample {
    pub speed_kmh: f64,
    pub direction_deg: Option<f64>,
}

/// A source of current modeled wind.
#[async_trait]
pub trait WindModel: Send + Sync {
    async fn current_wind(&self, query: &WindQuery) -> Result<WindSample>;
}

/// Queries `model` and turns any failure into "no sample".
pub async fn sample_wind<M: WindModel + ?Sized>(model: &M, query: &WindQuery) -> Option<WindSample> {
    match model.current_wind(query).await {
        Ok(sample) if sample.speed_kmh.is_finite() => Some(sample),
        Ok(sample) => {
            warn!(
                lat = query.lat,
                lon = query.lon,
                level = %query.level,
                speed = sample.speed_kmh,
                "Discarding non-finite wind speed"
            );
            None
        }
        Err(e) => {
            warn!(
                lat = query.lat,
                lon = query.lon,
                level = %query.level,
                error = %format!("{e:#}"),
                "Wind lookup failed"
            );
            None
        }
    }
}

type CacheKey = (u64, u64, PressureLevel);

fn cache_key(query: &WindQuery) -> CacheKey {
    (query.lat.to_bits(), query.lon.to_bits(), query.level)
}

/// A [`WindModel`] wrapper that remembers successful lookups per (lat, lon, level).
///
/// Meant to live for a single analysis pass; failures are not cached.
pub struct CachedWindModel<M> {
    pub inner: M,
    cache: Mutex<HashMap<CacheKey, WindSample>>,
}

impl<M> CachedWindModel<M> {
    pub fn new(inner: M) -> Self {
        Self {
            inner,
            cache: Mutex::new(HashMap::new()),
        }
    }

    pub fn cached_count(&self) -> usize {
        self.cache.lock().map(|c| c.len()).unwrap_or(0)
    }
}

#[async_trait]
impl<M: WindModel> WindModel for CachedWindModel<M> {
    async fn current_wind(&self, query: &WindQuery) -> Result<WindSample> {
        let key = cache_key(query);
        let hit = self
            .cache
            .lock()
            .map_err(|_| anyhow!("wind cache lock poisoned"))?
            .get(&key)
            .copied();

        if let Some(sample) = hit {
            debug!(lat = query.lat, lon = query.lon, level = %query.level, "Wind cache hit");
            return Ok(sample);
        }

        let sample = self.inner.current_wind(query).await?;
        self.cache
            .lock()
            .map_err(|_| anyhow!("wind cache lock poisoned"))?
            .insert(key, sample);
        Ok(sample)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingModel {
        calls: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl WindModel for CountingModel {
        async fn current_wind(&self, query: &WindQuery) -> Result<WindSample> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                anyhow::bail!("connection refused");
            }
            Ok(WindSample {
                speed_kmh: query.lat.abs(),
                direction_deg: Some(270.0),
            })
        }
    }

    fn counting(fail: bool) -> CountingModel {
        CountingModel {
            calls: AtomicUsize::new(0),
            fail,
        }
    }

    #[test]
    fn test_normalize_altitude() {
        assert_eq!(normalize_altitude_m(12.0), 12_000.0);
        assert_eq!(normalize_altitude_m(99.9), 99_900.0);
        assert_eq!(normalize_altitude_m(100.0), 100.0);
        assert_eq!(normalize_altitude_m(15_000.0), 15_000.0);
        assert_eq!(normalize_altitude_m(-2.0), -2_000.0);
    }

    #[test]
    fn test_level_thresholds() {
        assert_eq!(PressureLevel::for_altitude_m(11_000.1), PressureLevel::Hpa200);
        assert_eq!(PressureLevel::for_altitude_m(11_000.0), PressureLevel::Hpa500);
        assert_eq!(PressureLevel::for_altitude_m(5_000.1), PressureLevel::Hpa500);
        assert_eq!(PressureLevel::for_altitude_m(5_000.0), PressureLevel::Surface);
        assert_eq!(PressureLevel::for_altitude_m(0.0), PressureLevel::Surface);
    }

    #[test]
    fn test_level_is_monotonic_in_altitude() {
        let rank = |level: PressureLevel| match level {
            PressureLevel::Surface => 0,
            PressureLevel::Hpa500 => 1,
            PressureLevel::Hpa200 => 2,
        };
        let mut previous = 0;
        for alt in (0..30_000).step_by(250) {
            let current = rank(PressureLevel::for_altitude_m(alt as f64));
            assert!(current >= previous);
            previous = current;
        }
    }

    #[test]
    fn test_km_altitude_selects_jet_stream() {
        assert_eq!(PressureLevel::for_reported_altitude(Some(12.0)), PressureLevel::Hpa200);
        assert_eq!(PressureLevel::for_reported_altitude(Some(6.0)), PressureLevel::Hpa500);
        assert_eq!(PressureLevel::for_reported_altitude(Some(4_000.0)), PressureLevel::Surface);
        assert_eq!(PressureLevel::for_reported_altitude(None), PressureLevel::Surface);
    }

    #[test]
    fn test_variable_names() {
        assert_eq!(PressureLevel::Hpa200.speed_variable(), "wind_speed_200hPa");
        assert_eq!(PressureLevel::Hpa500.direction_variable(), "wind_direction_500hPa");
        assert_eq!(PressureLevel::Surface.speed_variable(), "wind_speed_10m");
        assert_eq!(PressureLevel::Hpa200.to_string(), "200 hPa");
    }

    #[tokio::test]
    async fn test_failed_lookup_becomes_no_sample() {
        let model = counting(true);
        let query = WindQuery::new(10.0, 20.0, Some(12.0));
        assert!(sample_wind(&model, &query).await.is_none());
    }

    #[tokio::test]
    async fn test_cache_reuses_successful_lookups() {
        let model = CachedWindModel::new(counting(false));
        let query = WindQuery::new(10.0, 20.0, Some(12.0));
        let other_level = WindQuery::new(10.0, 20.0, Some(1.0));

        let first = sample_wind(&model, &query).await;
        let second = sample_wind(&model, &query).await;
        sample_wind(&model, &other_level).await;

        assert_eq!(first, second);
        assert_eq!(model.inner.calls.load(Ordering::SeqCst), 2);
        assert_eq!(model.cached_count(), 2);
    }

    #[tokio::test]
    async fn test_cache_does_not_store_failures() {
        let model = CachedWindModel::new(counting(true));
        let query = WindQuery::new(1.0, 2.0, None);

        assert!(sample_wind(&model, &query).await.is_none());
        assert!(sample_wind(&model, &query).await.is_none());
        assert_eq!(model.inner.calls.load(Ordering::SeqCst), 2);
        assert_eq!(model.cached_count(), 0);
    }
}
