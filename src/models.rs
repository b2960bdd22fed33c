//! Records shared by ingestion, storage and reporting.

use chrono::{DateTime, Utc};
use serde::Serialize;

pub const SOURCE_OPENAQ: &str = "OpenAQ";

/// A monitoring station.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Location {
    pub location_id: i64,
    pub city: String,
    pub country: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub station_name: String,
    pub is_active: bool,
    /// Parameter names measured at the station, in sensor order.
    pub parameters: Vec<String>,
}

/// One reading of one parameter at one station.
#[derive(Debug, Clone, PartialEq)]
pub struct Measurement {
    pub location_id: i64,
    pub city: String,
    pub timestamp: DateTime<Utc>,
    pub parameter: String,
    pub value: f64,
    pub unit: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub source: String,
    pub collected_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewAlert {
    pub city: String,
    /// Category level name, e.g. `UNHEALTHY`.
    pub level: String,
    pub parameter: String,
    pub value: f64,
    pub threshold: f64,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Alert {
    pub id: i64,
    pub city: String,
    pub level: String,
    pub parameter: String,
    pub value: f64,
    pub threshold: f64,
    pub message: String,
    pub created_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub is_active: bool,
}

/// Aggregate of one parameter's readings over a window.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParameterStats {
    pub parameter: String,
    pub count: i64,
    pub avg: f64,
    pub min: f64,
    pub max: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_alert_json() {
        let alert = Alert {
            id: 4,
            city: "Manaus".to_string(),
            level: "UNHEALTHY".to_string(),
            parameter: "pm25".to_string(),
            value: 153.0,
            threshold: 151.0,
            message: "Some members of the general public may experience health effects."
                .to_string(),
            created_at: Utc.with_ymd_and_hms(2025, 9, 2, 18, 0, 0).unwrap(),
            resolved_at: None,
            is_active: true,
        };
        let json = serde_json::to_value(&alert).unwrap();
        assert_eq!(json["value"], 153.0);
        assert_eq!(json["created_at"], "2025-09-02T18:00:00Z");
        assert!(json["resolved_at"].is_null());
    }
}
