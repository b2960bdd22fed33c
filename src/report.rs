//! Per-city AQI summaries built from stored measurements, and their terminal
//! rendering.

use std::collections::BTreeMap;
use std::io::{self, Write};

use aqi::{
    calculate_aqi, calculate_dominant_aqi, describe_aqi, format_parameter_name, normalize_key,
    AqiDescription, Category, Color, DominantAqi,
};
use chrono::{DateTime, Utc};
use crossterm::style::{self, Stylize};
use serde::Serialize;
use tracing::warn;

use crate::models::Measurement;
use crate::units::{to_table_unit, Conversion};

/// The reading used for one parameter in a summary.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParameterReading {
    pub parameter: String,
    pub value: f64,
    pub unit: String,
    pub timestamp: DateTime<Utc>,
    /// `None` for parameters without an AQI scale, or reported in a unit
    /// that cannot be converted to the scale's unit.
    pub aqi: Option<u16>,
}

impl ParameterReading {
    fn from_measurement(m: &Measurement) -> Self {
        let parameter = normalize_key(&m.parameter);
        let (value, unit, aqi) = match to_table_unit(&parameter, m.value, &m.unit) {
            Conversion::Converted { value, unit } => {
                (value, unit.to_string(), calculate_aqi(value, &parameter))
            }
            Conversion::Unscored => (m.value, m.unit.clone(), None),
            Conversion::Unsupported => {
                warn!(
                    parameter = %m.parameter,
                    unit = %m.unit,
                    "not scoring reading in unsupported unit"
                );
                (m.value, m.unit.clone(), None)
            }
        };
        Self {
            parameter,
            value,
            unit,
            timestamp: m.timestamp,
            aqi,
        }
    }

    /// Scored readings outrank unscored ones, then newer, then higher.
    fn rank(&self) -> (bool, DateTime<Utc>, f64) {
        (self.aqi.is_some(), self.timestamp, self.value)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CitySummary {
    pub city: String,
    pub dominant: DominantAqi,
    pub description: AqiDescription,
    /// One reading per parameter, ordered by key.
    pub readings: Vec<ParameterReading>,
    /// Timestamp of the newest reading used.
    pub observed_at: DateTime<Utc>,
}

impl CitySummary {
    /// Builds a summary from any mix of stations and times. Readings are
    /// first expressed in their AQI table's unit. For each parameter the
    /// most recent scored reading is used; among readings with the same
    /// timestamp the highest value wins. Returns `None` when no reading can
    /// be scored.
    pub fn from_measurements(city: &str, measurements: &[Measurement]) -> Option<Self> {
        let mut latest: BTreeMap<String, ParameterReading> = BTreeMap::new();
        for reading in measurements.iter().map(ParameterReading::from_measurement) {
            match latest.get(&reading.parameter) {
                Some(current) if current.rank() >= reading.rank() => {}
                _ => {
                    latest.insert(reading.parameter.clone(), reading);
                }
            }
        }

        let dominant = calculate_dominant_aqi(
            latest
                .values()
                .filter(|r| r.aqi.is_some())
                .map(|r| (r.parameter.as_str(), r.value)),
        );
        if !dominant.has_data() {
            return None;
        }

        let readings: Vec<_> = latest.into_values().collect();
        let observed_at = readings.iter().map(|r| r.timestamp).max()?;

        Some(Self {
            city: city.to_string(),
            description: describe_aqi(dominant.aqi),
            dominant,
            readings,
            observed_at,
        })
    }

    pub fn category(&self) -> Category {
        self.dominant.category()
    }
}

fn swatch(color: Color) -> style::StyledContent<&'static str> {
    let (r, g, b) = color.rgb();
    "    ".on(style::Color::Rgb { r, g, b })
}

/// Writes a human-readable summary.
pub fn render(summary: &CitySummary, out: &mut impl Write) -> io::Result<()> {
    let category = summary.category();
    writeln!(out, "{}", summary.city.as_str().bold())?;
    writeln!(
        out,
        "  AQI {} {} {}",
        summary.dominant.aqi,
        swatch(category.color()),
        summary.description.category
    )?;
    writeln!(
        out,
        "  Dominant pollutant: {}",
        format_parameter_name(summary.dominant.parameter_or_unknown())
    )?;
    writeln!(
        out,
        "  Observed at {}",
        summary.observed_at.format("%Y-%m-%d %H:%M UTC")
    )?;
    writeln!(out, "  {}", summary.description.health_message)?;

    for reading in &summary.readings {
        let aqi = match reading.aqi {
            Some(aqi) => aqi.to_string(),
            None => "-".to_string(),
        };
        writeln!(
            out,
            "    {:<6} {:>9.2} {:<7} AQI {:>3}",
            format_parameter_name(&reading.parameter),
            reading.value,
            reading.unit,
            aqi
        )?;
    }
    Ok(())
}
