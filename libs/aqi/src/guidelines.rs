//! WHO 2021 air quality guideline values, for reference alongside the index.

use crate::breakpoints::Pollutant;

/// Guideline concentrations in µg/m³ for the averaging periods the WHO
/// publishes. A period without a guideline is `None`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WhoGuideline {
    pub annual: Option<f64>,
    pub day: Option<f64>,
    pub eight_hour: Option<f64>,
}

impl WhoGuideline {
    /// True when a 24-hour mean concentration is above the 24-hour guideline.
    /// Pollutants without a 24-hour guideline never exceed it.
    pub fn exceeds_daily(&self, concentration: f64) -> bool {
        self.day.is_some_and(|limit| concentration > limit)
    }
}

impl Pollutant {
    pub const fn who_guideline(self) -> Option<WhoGuideline> {
        match self {
            Pollutant::Pm25 => Some(WhoGuideline {
                annual: Some(5.0),
                day: Some(15.0),
                eight_hour: None,
            }),
            Pollutant::Pm10 => Some(WhoGuideline {
                annual: Some(15.0),
                day: Some(45.0),
                eight_hour: None,
            }),
            // Roughly 50 ppb
            Pollutant::O3 => Some(WhoGuideline {
                annual: None,
                day: None,
                eight_hour: Some(100.0),
            }),
            Pollutant::No2 => Some(WhoGuideline {
                annual: Some(10.0),
                day: Some(25.0),
                eight_hour: None,
            }),
            Pollutant::So2 => Some(WhoGuideline {
                annual: None,
                day: Some(40.0),
                eight_hour: None,
            }),
            Pollutant::Co => None,
        }
    }
}

/// Looks up the WHO guideline for a parameter key.
pub fn who_guideline(parameter: &str) -> Option<WhoGuideline> {
    Pollutant::from_key(parameter).and_then(Pollutant::who_guideline)
}
