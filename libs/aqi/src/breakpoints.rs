//! Breakpoint tables and the concentration to index interpolation.

use crate::key_matches;

/// Highest index the scale produces. Concentrations beyond a pollutant's last
/// breakpoint saturate here.
pub const MAX_AQI: u16 = 500;

/// One row of an EPA breakpoint table: the concentration range and the index
/// range it maps onto. Both ranges are inclusive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Breakpoint {
    pub conc_low: f64,
    pub conc_high: f64,
    pub aqi_low: u16,
    pub aqi_high: u16,
}

const fn bp(conc_low: f64, conc_high: f64, aqi_low: u16, aqi_high: u16) -> Breakpoint {
    Breakpoint {
        conc_low,
        conc_high,
        aqi_low,
        aqi_high,
    }
}

// AQI breakpoints, see the EPA technical assistance document:
// https://document.airnow.gov/technical-assistance-document-for-the-reporting-of-daily-air-quailty.pdf

// µg/m³, 24-hour
const PM25_BREAKPOINTS: [Breakpoint; 6] = [
    bp(0.0, 12.0, 0, 50),       // Good
    bp(12.1, 35.4, 51, 100),    // Moderate
    bp(35.5, 55.4, 101, 150),   // Unhealthy for Sensitive Groups
    bp(55.5, 150.4, 151, 200),  // Unhealthy
    bp(150.5, 250.4, 201, 300), // Very Unhealthy
    bp(250.5, 500.4, 301, 500), // Hazardous
];

// µg/m³, 24-hour
const PM10_BREAKPOINTS: [Breakpoint; 6] = [
    bp(0.0, 54.0, 0, 50),
    bp(55.0, 154.0, 51, 100),
    bp(155.0, 254.0, 101, 150),
    bp(255.0, 354.0, 151, 200),
    bp(355.0, 424.0, 201, 300),
    bp(425.0, 604.0, 301, 500),
];

// ppb, 8-hour. The 8-hour table stops at Very Unhealthy; anything above
// saturates.
const O3_BREAKPOINTS: [Breakpoint; 5] = [
    bp(0.0, 54.0, 0, 50),
    bp(55.0, 70.0, 51, 100),
    bp(71.0, 85.0, 101, 150),
    bp(86.0, 105.0, 151, 200),
    bp(106.0, 200.0, 201, 300),
];

// ppm, 8-hour
const CO_BREAKPOINTS: [Breakpoint; 6] = [
    bp(0.0, 4.4, 0, 50),
    bp(4.5, 9.4, 51, 100),
    bp(9.5, 12.4, 101, 150),
    bp(12.5, 15.4, 151, 200),
    bp(15.5, 30.4, 201, 300),
    bp(30.5, 50.4, 301, 500),
];

// ppb, 1-hour
const NO2_BREAKPOINTS: [Breakpoint; 6] = [
    bp(0.0, 53.0, 0, 50),
    bp(54.0, 100.0, 51, 100),
    bp(101.0, 360.0, 101, 150),
    bp(361.0, 649.0, 151, 200),
    bp(650.0, 1249.0, 201, 300),
    bp(1250.0, 2049.0, 301, 500),
];

// ppb, 1-hour
const SO2_BREAKPOINTS: [Breakpoint; 6] = [
    bp(0.0, 35.0, 0, 50),
    bp(36.0, 75.0, 51, 100),
    bp(76.0, 185.0, 101, 150),
    bp(186.0, 304.0, 151, 200),
    bp(305.0, 604.0, 201, 300),
    bp(605.0, 1004.0, 301, 500),
];

/// The pollutants that have a breakpoint table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Pollutant {
    Pm25,
    Pm10,
    O3,
    Co,
    No2,
    So2,
}

impl Pollutant {
    pub const ALL: [Pollutant; 6] = [
        Pollutant::Pm25,
        Pollutant::Pm10,
        Pollutant::O3,
        Pollutant::Co,
        Pollutant::No2,
        Pollutant::So2,
    ];

    /// Resolves a parameter key such as `"pm25"`, `"PM2.5"` or `"no_2"`.
    /// Matching ignores ASCII case, `.` and `_`.
    pub fn from_key(parameter: &str) -> Option<Pollutant> {
        Self::ALL
            .into_iter()
            .find(|pollutant| key_matches(parameter, pollutant.key()))
    }

    /// Canonical parameter key.
    pub const fn key(self) -> &'static str {
        match self {
            Pollutant::Pm25 => "pm25",
            Pollutant::Pm10 => "pm10",
            Pollutant::O3 => "o3",
            Pollutant::Co => "co",
            Pollutant::No2 => "no2",
            Pollutant::So2 => "so2",
        }
    }

    /// Unit the breakpoint table expects. Callers must convert beforehand.
    pub const fn unit(self) -> &'static str {
        match self {
            Pollutant::Pm25 | Pollutant::Pm10 => "µg/m³",
            Pollutant::O3 | Pollutant::No2 | Pollutant::So2 => "ppb",
            Pollutant::Co => "ppm",
        }
    }

    pub const fn breakpoints(self) -> &'static [Breakpoint] {
        match self {
            Pollutant::Pm25 => &PM25_BREAKPOINTS,
            Pollutant::Pm10 => &PM10_BREAKPOINTS,
            Pollutant::O3 => &O3_BREAKPOINTS,
            Pollutant::Co => &CO_BREAKPOINTS,
            Pollutant::No2 => &NO2_BREAKPOINTS,
            Pollutant::So2 => &SO2_BREAKPOINTS,
        }
    }

    /// Calculates the AQI for a concentration of this pollutant.
    ///
    /// Negative readings (and NaN) score 0. A reading that falls between two
    /// bands scores the lower index of the upper band, which keeps the result
    /// monotonic. Anything above the last band saturates at [`MAX_AQI`].
    pub fn aqi(self, concentration: f64) -> u16 {
        if !(concentration >= 0.0) {
            return 0;
        }

        for bp in self.breakpoints() {
            if concentration > bp.conc_high {
                continue;
            }
            if concentration < bp.conc_low {
                return bp.aqi_low;
            }

            // Linear interpolation formula from EPA documentation
            // AQI = ((AQIhigh - AQIlow) / (Chigh - Clow)) * (C - Clow) + AQIlow
            let aqi = (bp.aqi_high - bp.aqi_low) as f64 / (bp.conc_high - bp.conc_low)
                * (concentration - bp.conc_low)
                + bp.aqi_low as f64;
            return libm::round(aqi) as u16;
        }

        MAX_AQI
    }
}

/// Returns the breakpoint table for a parameter key, or `None` if the
/// parameter has no table.
pub fn get_breakpoints(parameter: &str) -> Option<&'static [Breakpoint]> {
    Pollutant::from_key(parameter).map(Pollutant::breakpoints)
}

/// Calculate the AQI for the provided concentration of a parameter.
///
/// # Arguments
///
/// * `concentration` - Concentration in the unit of the parameter's table
/// * `parameter` - Parameter key, e.g. `"pm25"`
///
/// # Returns
///
/// The index in `0..=500`, or `None` when the parameter is not one of the six
/// supported pollutants. These values may be confirmed using the calculator
/// at https://www.airnow.gov/aqi/aqi-calculator-concentration/
///
/// # Examples
///
/// ```
/// use aqi::calculate_aqi;
///
/// assert_eq!(calculate_aqi(12.0, "pm25"), Some(50));
/// assert_eq!(calculate_aqi(-3.0, "pm10"), Some(0));
/// assert_eq!(calculate_aqi(10.0, "benzene"), None);
/// ```
pub fn calculate_aqi(concentration: f64, parameter: &str) -> Option<u16> {
    Pollutant::from_key(parameter).map(|pollutant| pollutant.aqi(concentration))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_calculate_pm25_aqi() {
        // These expected values were confirmed using
        // https://www.airnow.gov/aqi/aqi-calculator-concentration/
        assert_eq!(calculate_aqi(0.0, "pm25"), Some(0));
        assert_eq!(calculate_aqi(6.0, "pm25"), Some(25));
        assert_eq!(calculate_aqi(12.0, "pm25"), Some(50));
        assert_eq!(calculate_aqi(12.1, "pm25"), Some(51));
        assert_eq!(calculate_aqi(35.4, "pm25"), Some(100));
        assert_eq!(calculate_aqi(35.5, "pm25"), Some(101));
        assert_eq!(calculate_aqi(45.0, "pm25"), Some(124));
        assert_eq!(calculate_aqi(55.4, "pm25"), Some(150));
        assert_eq!(calculate_aqi(55.5, "pm25"), Some(151));
        assert_eq!(calculate_aqi(150.4, "pm25"), Some(200));
        assert_eq!(calculate_aqi(150.5, "pm25"), Some(201));
        assert_eq!(calculate_aqi(250.4, "pm25"), Some(300));
        assert_eq!(calculate_aqi(250.5, "pm25"), Some(301));
        assert_eq!(calculate_aqi(500.0, "pm25"), Some(500));
        assert_eq!(calculate_aqi(500.4, "pm25"), Some(500));
    }

    #[test]
    fn test_calculate_other_pollutants() {
        assert_eq!(calculate_aqi(35.0, "pm10"), Some(32));
        assert_eq!(calculate_aqi(100.0, "pm10"), Some(73));
        assert_eq!(calculate_aqi(155.0, "pm10"), Some(101));
        assert_eq!(calculate_aqi(55.0, "o3"), Some(51));
        assert_eq!(calculate_aqi(150.0, "o3"), Some(247));
        assert_eq!(calculate_aqi(4.5, "co"), Some(51));
        assert_eq!(calculate_aqi(54.0, "no2"), Some(51));
        assert_eq!(calculate_aqi(36.0, "so2"), Some(51));
    }

    #[test]
    fn test_saturation() {
        assert_eq!(calculate_aqi(500.5, "pm25"), Some(500));
        assert_eq!(calculate_aqi(10_000.0, "pm25"), Some(500));
        assert_eq!(calculate_aqi(f64::INFINITY, "pm25"), Some(500));
        // O3 has no Hazardous band, so the first value past Very Unhealthy saturates.
        assert_eq!(calculate_aqi(200.0, "o3"), Some(300));
        assert_eq!(calculate_aqi(201.0, "o3"), Some(500));
        assert_eq!(calculate_aqi(2049.0, "no2"), Some(500));
        assert_eq!(calculate_aqi(2050.0, "no2"), Some(500));
    }

    #[test]
    fn test_negative_and_nan_score_zero() {
        for pollutant in Pollutant::ALL {
            assert_eq!(pollutant.aqi(-0.1), 0);
            assert_eq!(pollutant.aqi(-1000.0), 0);
            assert_eq!(pollutant.aqi(f64::NAN), 0);
        }
    }

    #[test]
    fn test_gap_between_bands_scores_next_band_floor() {
        assert_eq!(calculate_aqi(12.05, "pm25"), Some(51));
        assert_eq!(calculate_aqi(54.5, "pm10"), Some(51));
        assert_eq!(calculate_aqi(54.5, "o3"), Some(51));
        assert_eq!(calculate_aqi(4.45, "co"), Some(51));
        assert_eq!(calculate_aqi(100.5, "no2"), Some(101));
    }

    #[test]
    fn test_unknown_parameter() {
        assert_eq!(calculate_aqi(10.0, "not_a_real_pollutant"), None);
        assert_eq!(calculate_aqi(10.0, ""), None);
        assert_eq!(calculate_aqi(10.0, "ozone"), None);
        assert!(get_breakpoints("bogus").is_none());
    }

    #[test]
    fn test_key_normalization() {
        assert_eq!(Pollutant::from_key("PM2.5"), Some(Pollutant::Pm25));
        assert_eq!(Pollutant::from_key("pm_25"), Some(Pollutant::Pm25));
        assert_eq!(Pollutant::from_key("No2"), Some(Pollutant::No2));
        assert_eq!(Pollutant::from_key("S.O_2"), Some(Pollutant::So2));
        assert_eq!(Pollutant::from_key("pm 25"), None);
        assert_eq!(get_breakpoints("CO"), Some(Pollutant::Co.breakpoints()));
    }

    #[test]
    fn test_tables_are_ordered_and_disjoint() {
        for pollutant in Pollutant::ALL {
            let table = pollutant.breakpoints();
            assert_eq!(table[0].conc_low, 0.0);
            assert_eq!(table[0].aqi_low, 0);
            for bp in table {
                assert!(bp.conc_low < bp.conc_high, "{:?}", pollutant);
                assert!(bp.aqi_low < bp.aqi_high, "{:?}", pollutant);
            }
            for pair in table.windows(2) {
                assert!(pair[0].conc_high < pair[1].conc_low, "{:?}", pollutant);
                assert_eq!(pair[0].aqi_high + 1, pair[1].aqi_low, "{:?}", pollutant);
            }
        }
    }
}
