//! Turns OpenAQ payloads into [`Location`] and [`Measurement`] records and
//! drives collection for the configured cities.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tracing::{error, info, warn};

use crate::cities::City;
use crate::error::Result;
use crate::models::{Location, Measurement, SOURCE_OPENAQ};
use crate::openaq::{parse_utc, ApiLatest, ApiLocation, OpenAqClient, MAX_RADIUS_M};
use crate::units::{to_table_unit, Conversion};

const DEFAULT_COUNTRY: &str = "BR";
const DEFAULT_UNIT: &str = "µg/m³";
const LOCATIONS_PER_CITY: u32 = 100;

/// Where collection reads from. Implemented by [`OpenAqClient`]; tests use an
/// in-memory source.
#[async_trait]
pub trait AirQualitySource: Send + Sync {
    async fn locations_near(
        &self,
        latitude: f64,
        longitude: f64,
        radius_m: u32,
        limit: u32,
    ) -> Result<Vec<ApiLocation>>;

    async fn location_latest(&self, location_id: i64) -> Result<Vec<ApiLatest>>;
}

#[async_trait]
impl AirQualitySource for OpenAqClient {
    async fn locations_near(
        &self,
        latitude: f64,
        longitude: f64,
        radius_m: u32,
        limit: u32,
    ) -> Result<Vec<ApiLocation>> {
        self.locations_by_coordinates(latitude, longitude, radius_m, limit)
            .await
    }

    async fn location_latest(&self, location_id: i64) -> Result<Vec<ApiLatest>> {
        OpenAqClient::location_latest(self, location_id).await
    }
}

/// Converts one API location. Returns `None` when the location lacks an id or
/// a name, or when `city_filter` is given and neither its locality nor its
/// name contains the filter (case-insensitive).
pub fn process_location(raw: &ApiLocation, city_filter: Option<&str>) -> Option<Location> {
    let locality = raw.locality.as_deref().or(raw.name.as_deref());

    if let Some(filter) = city_filter {
        let filter = filter.to_lowercase();
        match locality {
            Some(locality) if locality.to_lowercase().contains(&filter) => {}
            _ => return None,
        }
    }

    let (Some(location_id), Some(station_name)) = (raw.id, raw.name.clone()) else {
        warn!(id = ?raw.id, name = ?raw.name, "skipping incomplete location");
        return None;
    };

    Some(Location {
        location_id,
        city: locality.unwrap_or("Unknown").to_string(),
        country: raw
            .country
            .as_ref()
            .and_then(|c| c.code.clone())
            .unwrap_or_else(|| DEFAULT_COUNTRY.to_string()),
        latitude: raw.coordinates.and_then(|c| c.latitude),
        longitude: raw.coordinates.and_then(|c| c.longitude),
        station_name,
        is_active: true,
        parameters: raw
            .sensors
            .iter()
            .map(|sensor| sensor.parameter.name.clone())
            .collect(),
    })
}

pub fn process_locations(raw: &[ApiLocation], city_filter: Option<&str>) -> Vec<Location> {
    let processed: Vec<_> = raw
        .iter()
        .filter_map(|location| process_location(location, city_filter))
        .collect();
    info!(
        valid = processed.len(),
        raw = raw.len(),
        "processed locations"
    );
    processed
}

/// Converts the latest readings of one location into measurements tagged
/// with `city`. Each reading's sensor id is resolved to a parameter through
/// the location's sensor list; readings without a value, without a valid
/// timestamp or from an unknown sensor are dropped.
///
/// Pollutants with an AQI table are stored in that table's unit (ppb for
/// O3, NO2 and SO2, ppm for CO). A pollutant reported in a unit that cannot
/// be converted is dropped.
pub fn process_latest(raw: &[ApiLatest], location: &ApiLocation, city: &str) -> Vec<Measurement> {
    let Some(location_id) = location.id else {
        return Vec::new();
    };
    let sensors: HashMap<i64, _> = location
        .sensors
        .iter()
        .map(|sensor| (sensor.id, &sensor.parameter))
        .collect();
    let collected_at = Utc::now();

    raw.iter()
        .filter_map(|reading| {
            let value = reading.value?;
            let timestamp = reading
                .datetime
                .as_ref()
                .and_then(|dt| dt.utc.as_deref())
                .and_then(parse_utc)?;
            let Some(parameter) = sensors.get(&reading.sensors_id) else {
                warn!(
                    location_id,
                    sensor_id = reading.sensors_id,
                    "reading from unknown sensor"
                );
                return None;
            };
            let coordinates = reading.coordinates.or(location.coordinates);
            let reported_unit = parameter.units.as_deref().unwrap_or(DEFAULT_UNIT);
            let (value, unit) = match to_table_unit(&parameter.name, value, reported_unit) {
                Conversion::Converted { value, unit } => (value, unit.to_string()),
                Conversion::Unscored => (value, reported_unit.to_string()),
                Conversion::Unsupported => {
                    warn!(
                        location_id,
                        parameter = %parameter.name,
                        unit = reported_unit,
                        "dropping reading in unsupported unit"
                    );
                    return None;
                }
            };

            Some(Measurement {
                location_id,
                city: city.to_string(),
                timestamp,
                parameter: parameter.name.to_lowercase(),
                value,
                unit,
                latitude: coordinates.and_then(|c| c.latitude),
                longitude: coordinates.and_then(|c| c.longitude),
                source: SOURCE_OPENAQ.to_string(),
                collected_at,
            })
        })
        .collect()
}

/// Everything gathered for one city in one run.
#[derive(Debug, Clone, Default)]
pub struct CityCollection {
    pub city: String,
    pub locations: Vec<Location>,
    pub measurements: Vec<Measurement>,
}

/// Paces requests against a source and gathers per-city results.
pub struct Collector<S> {
    source: S,
    location_pause: Duration,
    city_pause: Duration,
}

impl<S: AirQualitySource> Collector<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            location_pause: Duration::from_millis(200),
            city_pause: Duration::from_secs(1),
        }
    }

    /// Overrides the pauses between locations and between cities.
    pub fn with_pauses(mut self, location_pause: Duration, city_pause: Duration) -> Self {
        self.location_pause = location_pause;
        self.city_pause = city_pause;
        self
    }

    /// Collects stations and latest readings around a city. A location whose
    /// readings cannot be fetched is skipped; failing to list locations fails
    /// the city.
    pub async fn collect_city(&self, city: &City) -> Result<CityCollection> {
        info!(city = city.name, "starting data collection");
        let raw_locations = self
            .source
            .locations_near(city.latitude, city.longitude, MAX_RADIUS_M, LOCATIONS_PER_CITY)
            .await?;

        let mut collection = CityCollection {
            city: city.name.to_string(),
            ..Default::default()
        };

        for raw in &raw_locations {
            let Some(location) = process_location(raw, Some(city.name)) else {
                continue;
            };
            match self.source.location_latest(location.location_id).await {
                Ok(latest) => collection
                    .measurements
                    .extend(process_latest(&latest, raw, city.name)),
                Err(e) => warn!(
                    city = city.name,
                    location_id = location.location_id,
                    error = %e,
                    "failed to fetch latest readings"
                ),
            }
            collection.locations.push(location);
            tokio::time::sleep(self.location_pause).await;
        }

        info!(
            city = city.name,
            measurements = collection.measurements.len(),
            locations = collection.locations.len(),
            "data collection complete"
        );
        Ok(collection)
    }

    /// Collects each city in turn. A city that fails yields an empty
    /// collection so callers still see every requested city.
    pub async fn collect_cities(&self, cities: &[&City]) -> Vec<CityCollection> {
        info!(count = cities.len(), "collecting data for cities");
        let mut results = Vec::with_capacity(cities.len());

        for (i, city) in cities.iter().enumerate() {
            if i > 0 {
                tokio::time::sleep(self.city_pause).await;
            }
            match self.collect_city(city).await {
                Ok(collection) => results.push(collection),
                Err(e) => {
                    error!(city = city.name, error = %e, "failed to collect data");
                    results.push(CityCollection {
                        city: city.name.to_string(),
                        ..Default::default()
                    });
                }
            }
        }

        info!(cities = results.len(), "multi-city collection complete");
        results
    }
}
