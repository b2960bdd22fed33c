//! Concentration units.
//!
//! OpenAQ stations report gases in ppm, ppb or as a mass concentration,
//! while each AQI table expects one unit (see [`Pollutant::unit`]). Readings
//! are converted here before they reach the engine. Mass/volume conversions
//! assume 25 °C and 1 atm.

use aqi::Pollutant;

/// Molar volume of an ideal gas at 25 °C and 1 atm, in litres.
const MOLAR_VOLUME_L: f64 = 24.45;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unit {
    MicrogramsPerCubicMeter,
    MilligramsPerCubicMeter,
    Ppm,
    Ppb,
}

impl Unit {
    /// Parses a unit label such as `µg/m³`, `ug/m3`, `ppm` or `ppb`.
    pub fn parse(raw: &str) -> Option<Unit> {
        let label: String = raw
            .chars()
            .filter(|c| !c.is_whitespace())
            .map(|c| match c {
                'µ' | 'μ' => 'u',
                '³' => '3',
                c => c.to_ascii_lowercase(),
            })
            .collect();
        match label.as_str() {
            "ug/m3" => Some(Unit::MicrogramsPerCubicMeter),
            "mg/m3" => Some(Unit::MilligramsPerCubicMeter),
            "ppm" => Some(Unit::Ppm),
            "ppb" => Some(Unit::Ppb),
            _ => None,
        }
    }
}

/// g/mol, for the gases with a volumetric table.
fn molar_mass(pollutant: Pollutant) -> Option<f64> {
    match pollutant {
        Pollutant::O3 => Some(48.00),
        Pollutant::No2 => Some(46.01),
        Pollutant::So2 => Some(64.07),
        Pollutant::Co => Some(28.01),
        Pollutant::Pm25 | Pollutant::Pm10 => None,
    }
}

fn to_micrograms(pollutant: Pollutant, value: f64, from: Unit) -> Option<f64> {
    match from {
        Unit::MicrogramsPerCubicMeter => Some(value),
        Unit::MilligramsPerCubicMeter => Some(value * 1000.0),
        Unit::Ppb => molar_mass(pollutant).map(|m| value * m / MOLAR_VOLUME_L),
        Unit::Ppm => molar_mass(pollutant).map(|m| value * 1000.0 * m / MOLAR_VOLUME_L),
    }
}

fn from_micrograms(pollutant: Pollutant, value: f64, to: Unit) -> Option<f64> {
    match to {
        Unit::MicrogramsPerCubicMeter => Some(value),
        Unit::MilligramsPerCubicMeter => Some(value / 1000.0),
        Unit::Ppb => molar_mass(pollutant).map(|m| value * MOLAR_VOLUME_L / m),
        Unit::Ppm => molar_mass(pollutant).map(|m| value * MOLAR_VOLUME_L / (m * 1000.0)),
    }
}

/// Converts a concentration of `pollutant` between units. Returns `None`
/// when the conversion needs a molar mass the pollutant does not have.
pub fn convert(pollutant: Pollutant, value: f64, from: Unit, to: Unit) -> Option<f64> {
    match (from, to) {
        _ if from == to => Some(value),
        (Unit::Ppm, Unit::Ppb) => Some(value * 1000.0),
        (Unit::Ppb, Unit::Ppm) => Some(value / 1000.0),
        _ => from_micrograms(pollutant, to_micrograms(pollutant, value, from)?, to),
    }
}

/// Outcome of bringing a reading to its AQI table's unit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Conversion {
    /// The parameter has no AQI table; the reading is left as is.
    Unscored,
    /// The value expressed in the table's unit.
    Converted { value: f64, unit: &'static str },
    /// The unit is unknown or cannot be converted for this pollutant.
    Unsupported,
}

/// Expresses a reading in the unit its AQI table expects.
pub fn to_table_unit(parameter: &str, value: f64, unit: &str) -> Conversion {
    let Some(pollutant) = Pollutant::from_key(parameter) else {
        return Conversion::Unscored;
    };
    let table_unit = pollutant.unit();
    let converted = Unit::parse(unit)
        .zip(Unit::parse(table_unit))
        .and_then(|(from, to)| convert(pollutant, value, from, to));
    match converted {
        Some(value) => Conversion::Converted {
            value,
            unit: table_unit,
        },
        None => Conversion::Unsupported,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn converted(parameter: &str, value: f64, unit: &str) -> (f64, &'static str) {
        match to_table_unit(parameter, value, unit) {
            Conversion::Converted { value, unit } => (value, unit),
            other => panic!("{parameter} {value} {unit}: {other:?}"),
        }
    }

    #[test]
    fn test_parse_unit_labels() {
        assert_eq!(Unit::parse("µg/m³"), Some(Unit::MicrogramsPerCubicMeter));
        assert_eq!(Unit::parse("μg/m³"), Some(Unit::MicrogramsPerCubicMeter));
        assert_eq!(Unit::parse("ug/m3"), Some(Unit::MicrogramsPerCubicMeter));
        assert_eq!(Unit::parse("mg/m³"), Some(Unit::MilligramsPerCubicMeter));
        assert_eq!(Unit::parse(" PPM "), Some(Unit::Ppm));
        assert_eq!(Unit::parse("ppb"), Some(Unit::Ppb));
        assert_eq!(Unit::parse("ppt"), None);
        assert_eq!(Unit::parse(""), None);
    }

    #[test]
    fn test_every_table_unit_parses() {
        for pollutant in Pollutant::ALL {
            assert!(Unit::parse(pollutant.unit()).is_some(), "{pollutant:?}");
        }
    }

    #[test]
    fn test_ozone_in_ppm_becomes_ppb() {
        let (value, unit) = converted("o3", 0.090, "ppm");
        assert!((value - 90.0).abs() < 1e-9);
        assert_eq!(unit, "ppb");
    }

    #[test]
    fn test_mass_concentration_of_gases() {
        // 100 µg/m³ NO2 is about 53.1 ppb.
        let (value, unit) = converted("no2", 100.0, "µg/m³");
        assert!((value - 53.14).abs() < 0.01, "{value}");
        assert_eq!(unit, "ppb");

        // 5000 µg/m³ CO is about 4.36 ppm.
        let (value, unit) = converted("co", 5000.0, "µg/m³");
        assert!((value - 4.365).abs() < 0.01, "{value}");
        assert_eq!(unit, "ppm");

        let (value, _) = converted("co", 1150.0, "ppb");
        assert!((value - 1.15).abs() < 1e-9);
    }

    #[test]
    fn test_particulates_pass_through() {
        let (value, _) = converted("pm2.5", 18.0, "ug/m3");
        assert_eq!(value, 18.0);
        let (value, _) = converted("pm10", 0.05, "mg/m³");
        assert!((value - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_unsupported_and_unscored() {
        assert_eq!(to_table_unit("pm25", 1.0, "ppm"), Conversion::Unsupported);
        assert_eq!(to_table_unit("o3", 1.0, "ppt"), Conversion::Unsupported);
        assert_eq!(to_table_unit("temperature", 24.0, "c"), Conversion::Unscored);
    }
}
