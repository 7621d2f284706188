//! Wind model backed by an Open-Meteo style forecast endpoint.

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use serde_json::Value;

use crate::fetch::{HttpClient, fetch_bytes};
use crate::wind::{PressureLevel, WindModel, WindQuery, WindSample};

pub struct OpenMeteoClient<C> {
    client: C,
    base_url: String,
}

impl<C: HttpClient> OpenMeteoClient<C> {
    pub fn new(client: C, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    /// Builds the forecast request for the speed and direction variables of the query's level.
    pub fn request_url(&self, query: &WindQuery) -> Result<reqwest::Url> {
        let hourly = format!(
            "{},{}",
            query.level.speed_variable(),
            query.level.direction_variable()
        );
        let url = reqwest::Url::parse_with_params(
            &self.base_url,
            &[
                ("latitude", query.lat.to_string()),
                ("longitude", query.lon.to_string()),
                ("hourly", hourly),
                ("wind_speed_unit", "kmh".to_string()),
                ("forecast_hours", "1".to_string()),
            ],
        )
        .with_context(|| format!("invalid wind API url '{}'", self.base_url))?;
        Ok(url)
    }
}

/// Extracts the current (first) value of the level's series from a forecast response.
///
/// # Errors
///
/// Fails if the body is not JSON or carries no numeric speed for the level.
pub fn parse_wind_response(body: &[u8], level: PressureLevel) -> Result<WindSample> {
    let json: Value = serde_json::from_slice(body).context("wind response is not JSON")?;
    let hourly = &json["hourly"];

    let speed_var = level.speed_variable();
    let speed_kmh = hourly[speed_var.as_str()][0]
        .as_f64()
        .ok_or_else(|| anyhow!("wind response has no value for {speed_var}"))?;
    let direction_deg = hourly[level.direction_variable().as_str()][0].as_f64();

    Ok(WindSample {
        speed_kmh,
        direction_deg,
    })
}

#[async_trait]
impl<C: HttpClient> WindModel for OpenMeteoClient<C> {
    #[tracing::instrument(skip(self), fields(lat = query.lat, lon = query.lon, level = %query.level))]
    async fn current_wind(&self, query: &WindQuery) -> Result<WindSample> {
        let url = self.request_url(query)?;
        let body = fetch_bytes(&self.client, url.as_str()).await?;
        parse_wind_response(&body, query.level)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::BasicClient;
    use std::time::Duration;

    #[test]
    fn test_request_url_selects_level_variables() {
        let client = OpenMeteoClient::new(
            BasicClient::new(Duration::from_secs(1)).unwrap(),
            "https://api.open-meteo.com/v1/forecast",
        );
        let url = client
            .request_url(&WindQuery::new(10.5, -20.25, Some(12.0)))
            .unwrap();

        let query = url.query().unwrap();
        assert!(url.as_str().starts_with("https://api.open-meteo.com/v1/forecast?"));
        assert!(query.contains("latitude=10.5"));
        assert!(query.contains("longitude=-20.25"));
        assert!(query.contains("hourly=wind_speed_200hPa%2Cwind_direction_200hPa"));
        assert!(query.contains("wind_speed_unit=kmh"));
    }

    #[test]
    fn test_parse_takes_first_value() {
        let body = br#"{
            "latitude": 10.5,
            "hourly": {
                "time": ["2026-10-19T00:00", "2026-10-19T01:00"],
                "wind_speed_500hPa": [42.5, 50.0],
                "wind_direction_500hPa": [270, 265]
            }
        }"#;

        let sample = parse_wind_response(body, PressureLevel::Hpa500).unwrap();
        assert_eq!(sample.speed_kmh, 42.5);
        assert_eq!(sample.direction_deg, Some(270.0));
    }

    #[test]
    fn test_parse_without_direction() {
        let body = br#"{"hourly": {"wind_speed_10m": [7.2]}}"#;
        let sample = parse_wind_response(body, PressureLevel::Surface).unwrap();
        assert_eq!(sample.speed_kmh, 7.2);
        assert_eq!(sample.direction_deg, None);
    }

    #[test]
    fn test_parse_failures() {
        assert!(parse_wind_response(b"<html>", PressureLevel::Surface).is_err());
        assert!(parse_wind_response(br#"{"error": true, "reason": "bad"}"#, PressureLevel::Surface).is_err());
        // variable for a different level
        assert!(parse_wind_response(br#"{"hourly": {"wind_speed_10m": [7.2]}}"#, PressureLevel::Hpa200).is_err());
        assert!(parse_wind_response(br#"{"hourly": {"wind_speed_10m": [null]}}"#, PressureLevel::Surface).is_err());
        assert!(parse_wind_response(br#"{"hourly": {"wind_speed_10m": []}}"#, PressureLevel::Surface).is_err());
    }
}
