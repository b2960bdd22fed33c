//! OpenAQ module
//!
//! This module provides the client and payload types for retrieving
//! locations and readings from the OpenAQ v3 API. Every request carries the
//! `X-API-Key` header; v1 and v2 were retired in January 2025.

use std::time::{Duration, Instant};

use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::config::OpenAqConfig;
use crate::error::{AerisError, Result};

/// Largest search radius the API accepts, in meters.
pub const MAX_RADIUS_M: u32 = 25_000;

const USER_AGENT: &str = concat!("aeris/", env!("CARGO_PKG_VERSION"));

/// The `{meta, results}` wrapper around every v3 response.
#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
    pub meta: Option<Meta>,
    pub results: Option<Vec<T>>,
}

#[derive(Debug, Deserialize)]
pub struct Meta {
    /// A count, or a string such as `">1000"` for large result sets.
    pub found: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiLocation {
    pub id: Option<i64>,
    pub name: Option<String>,
    pub locality: Option<String>,
    pub country: Option<ApiCountry>,
    pub coordinates: Option<ApiCoordinates>,
    #[serde(default)]
    pub sensors: Vec<ApiSensor>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiCountry {
    pub code: Option<String>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct ApiCoordinates {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiSensor {
    pub id: i64,
    pub parameter: ApiParameter,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiParameter {
    pub id: Option<i64>,
    pub name: String,
    pub units: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiDatetime {
    pub utc: Option<String>,
}

/// An entry of `/locations/{id}/latest`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiLatest {
    pub datetime: Option<ApiDatetime>,
    pub value: Option<f64>,
    pub coordinates: Option<ApiCoordinates>,
    pub sensors_id: i64,
}

/// An entry of `/sensors/{id}/measurements`.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiSensorMeasurement {
    pub value: Option<f64>,
    pub parameter: ApiParameter,
    pub period: Option<ApiPeriod>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiPeriod {
    pub datetime_from: Option<ApiDatetime>,
    pub datetime_to: Option<ApiDatetime>,
}

impl ApiSensorMeasurement {
    /// End of the averaging period, falling back to its start.
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        let period = self.period.as_ref()?;
        period
            .datetime_to
            .as_ref()
            .or(period.datetime_from.as_ref())
            .and_then(|dt| dt.utc.as_deref())
            .and_then(parse_utc)
    }
}

/// Parses an RFC 3339 timestamp as reported by the API.
pub fn parse_utc(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Status codes worth another attempt.
pub fn is_retryable(status: StatusCode) -> bool {
    matches!(status.as_u16(), 429 | 500 | 502 | 503 | 504)
}

/// Client for OpenAQ API v3 with retry and exponential backoff.
#[derive(Debug, Clone)]
pub struct OpenAqClient {
    http: Client,
    base_url: String,
    max_retries: u32,
    retry_backoff: Duration,
}

impl OpenAqClient {
    /// Builds a client from configuration. Fails when no usable API key is
    /// configured.
    pub fn new(config: &OpenAqConfig) -> Result<Self> {
        let api_key = config.api_key()?;
        let mut headers = HeaderMap::new();
        let mut key = HeaderValue::from_str(api_key)
            .map_err(|_| AerisError::Config("OPENAQ_API_KEY contains invalid characters".into()))?;
        key.set_sensitive(true);
        headers.insert("X-API-Key", key);
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let http = Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .timeout(config.timeout)
            .build()?;

        info!(base_url = %config.base_url, "OpenAQ v3 client initialized");
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            max_retries: config.max_retries,
            retry_backoff: config.retry_backoff,
        })
    }

    fn backoff(&self, attempt: u32) -> Duration {
        self.retry_backoff.saturating_mul(2u32.saturating_pow(attempt))
    }

    /// Performs a GET against `path` and returns the `results` array.
    ///
    /// # Arguments
    ///
    /// * `path` - Endpoint path below the base URL, e.g. `/locations`
    /// * `query` - Query parameters
    ///
    /// # Returns
    ///
    /// The decoded results, or an empty list when the payload has none.
    async fn get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<Vec<T>> {
        let url = format!("{}{}", self.base_url, path);
        let mut attempt = 0;

        loop {
            debug!(%url, ?query, attempt, "API request");
            let started = Instant::now();
            let sent = self.http.get(&url).query(query).send().await;

            let response = match sent {
                Ok(response) => response,
                Err(e) if (e.is_timeout() || e.is_connect()) && attempt < self.max_retries => {
                    let delay = self.backoff(attempt);
                    warn!(%url, error = %e, ?delay, "request failed, retrying");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                    continue;
                }
                Err(e) => return Err(e.into()),
            };

            let status = response.status();
            debug!(
                status = status.as_u16(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "API response"
            );

            if status.is_success() {
                let body = response.text().await?;
                let envelope: Envelope<T> = serde_json::from_str(&body)?;
                if let Some(found) = envelope.meta.as_ref().and_then(|m| m.found.as_ref()) {
                    debug!(%found, "total results found");
                }
                return Ok(envelope.results.unwrap_or_else(|| {
                    warn!(%url, "response has no results field");
                    Vec::new()
                }));
            }

            if status == StatusCode::UNAUTHORIZED {
                warn!("API key authentication failed");
                return Err(AerisError::Unauthorized);
            }

            if is_retryable(status) && attempt < self.max_retries {
                let delay = self.backoff(attempt);
                if status == StatusCode::TOO_MANY_REQUESTS {
                    warn!(?delay, "rate limit exceeded, backing off");
                } else {
                    warn!(status = status.as_u16(), ?delay, "server error, retrying");
                }
                tokio::time::sleep(delay).await;
                attempt += 1;
                continue;
            }

            return Err(AerisError::Status {
                status: status.as_u16(),
                url,
            });
        }
    }

    /// Monitoring locations in a country, optionally restricted to those
    /// measuring one parameter id (2 is PM2.5).
    pub async fn locations_by_country(
        &self,
        country_iso: &str,
        limit: u32,
        parameters_id: Option<i64>,
    ) -> Result<Vec<ApiLocation>> {
        info!(country = country_iso, "fetching locations");
        let mut query = vec![("iso", country_iso.to_string()), ("limit", limit.to_string())];
        if let Some(id) = parameters_id {
            query.push(("parameters_id", id.to_string()));
        }
        let locations = self.get("/locations", &query).await?;
        info!(country = country_iso, count = locations.len(), "retrieved locations");
        Ok(locations)
    }

    /// Monitoring locations within `radius_m` of a point. The radius is capped
    /// at [`MAX_RADIUS_M`].
    pub async fn locations_by_coordinates(
        &self,
        latitude: f64,
        longitude: f64,
        radius_m: u32,
        limit: u32,
    ) -> Result<Vec<ApiLocation>> {
        let radius = radius_m.min(MAX_RADIUS_M);
        info!(latitude, longitude, radius, "fetching locations near coordinates");
        let query = [
            ("coordinates", format!("{latitude},{longitude}")),
            ("radius", radius.to_string()),
            ("limit", limit.to_string()),
        ];
        let locations = self.get("/locations", &query).await?;
        info!(count = locations.len(), "retrieved locations near coordinates");
        Ok(locations)
    }

    /// Latest reading of every sensor at a location.
    pub async fn location_latest(&self, location_id: i64) -> Result<Vec<ApiLatest>> {
        debug!(location_id, "fetching latest readings");
        self.get(&format!("/locations/{location_id}/latest"), &[]).await
    }

    /// Readings of one sensor between two instants. Defaults to the last 24
    /// hours.
    pub async fn sensor_measurements(
        &self,
        sensor_id: i64,
        date_from: Option<DateTime<Utc>>,
        date_to: Option<DateTime<Utc>>,
        limit: u32,
    ) -> Result<Vec<ApiSensorMeasurement>> {
        let date_to = date_to.unwrap_or_else(Utc::now);
        let date_from = date_from.unwrap_or(date_to - chrono::Duration::hours(24));
        info!(sensor_id, from = %date_from, to = %date_to, "fetching sensor measurements");
        let query = [
            ("date_from", date_from.to_rfc3339_opts(SecondsFormat::Secs, true)),
            ("date_to", date_to.to_rfc3339_opts(SecondsFormat::Secs, true)),
            ("limit", limit.to_string()),
        ];
        self.get(&format!("/sensors/{sensor_id}/measurements"), &query)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_locations_envelope() {
        let body = r#"{
            "meta": {"name": "openaq-api", "found": ">1000", "limit": 100},
            "results": [{
                "id": 2446,
                "name": "Pinheiros",
                "locality": "São Paulo",
                "country": {"id": 45, "code": "BR", "name": "Brazil"},
                "coordinates": {"latitude": -23.561, "longitude": -46.702},
                "sensors": [
                    {"id": 7771, "name": "pm25 µg/m³", "parameter": {"id": 2, "name": "pm25", "units": "µg/m³", "displayName": "PM2.5"}},
                    {"id": 7772, "name": "o3 ppm", "parameter": {"id": 10, "name": "o3", "units": "ppm"}}
                ]
            }]
        }"#;
        let envelope: Envelope<ApiLocation> = serde_json::from_str(body).unwrap();
        let results = envelope.results.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, Some(2446));
        assert_eq!(results[0].sensors[1].parameter.name, "o3");
        assert_eq!(
            envelope.meta.unwrap().found,
            Some(serde_json::Value::String(">1000".into()))
        );
    }

    #[test]
    fn test_missing_results_decodes_as_none() {
        let envelope: Envelope<ApiLatest> = serde_json::from_str(r#"{"meta": {}}"#).unwrap();
        assert!(envelope.results.is_none());
    }

    #[test]
    fn test_empty_envelope_decodes_without_default_results() {
        let envelope: Envelope<ApiLocation> = serde_json::from_str("{}").unwrap();
        assert!(envelope.meta.is_none());
        assert!(envelope.results.is_none());

        let envelope: Envelope<ApiLatest> =
            serde_json::from_str(r#"{"meta": {"found": 0}, "results": []}"#).unwrap();
        assert_eq!(envelope.results.map(|r| r.len()), Some(0));
    }

    #[test]
    fn test_sensor_measurement_timestamp() {
        let body = r#"{
            "value": 14.2,
            "parameter": {"id": 2, "name": "pm25", "units": "µg/m³"},
            "period": {
                "label": "raw",
                "datetimeFrom": {"utc": "2025-03-01T10:00:00Z", "local": "2025-03-01T07:00:00-03:00"},
                "datetimeTo": {"utc": "2025-03-01T11:00:00Z", "local": "2025-03-01T08:00:00-03:00"}
            }
        }"#;
        let m: ApiSensorMeasurement = serde_json::from_str(body).unwrap();
        assert_eq!(m.timestamp(), parse_utc("2025-03-01T11:00:00Z"));
        assert!(m.timestamp().is_some());
    }

    #[test]
    fn test_retryable_statuses() {
        for code in [429, 500, 502, 503, 504] {
            assert!(is_retryable(StatusCode::from_u16(code).unwrap()), "{code}");
        }
        for code in [400, 401, 404, 501] {
            assert!(!is_retryable(StatusCode::from_u16(code).unwrap()), "{code}");
        }
    }

    #[test]
    fn test_client_requires_api_key() {
        let err = OpenAqClient::new(&OpenAqConfig::default()).unwrap_err();
        assert!(matches!(err, AerisError::Config(_)));
    }
}
