//! Combining simultaneous readings into one dominant index.

use alloc::collections::BTreeMap;
use alloc::string::{String, ToString};
use core::borrow::Borrow;

use crate::breakpoints::calculate_aqi;
use crate::category::Category;

/// Parameter reported when no reading could be scored.
pub const UNKNOWN_PARAMETER: &str = "unknown";

/// Overall index for a set of simultaneous readings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct DominantAqi {
    /// Highest individual index, 0 when nothing was scored.
    pub aqi: u16,
    /// Parameter key that produced `aqi`, as the caller supplied it.
    pub parameter: Option<String>,
    /// Index of every reading that could be scored, keyed by parameter.
    pub all: BTreeMap<String, u16>,
}

impl DominantAqi {
    /// The dominant parameter, or [`UNKNOWN_PARAMETER`].
    pub fn parameter_or_unknown(&self) -> &str {
        self.parameter.as_deref().unwrap_or(UNKNOWN_PARAMETER)
    }

    pub fn category(&self) -> Category {
        Category::from_aqi(self.aqi)
    }

    /// True when at least one reading was scored.
    pub fn has_data(&self) -> bool {
        !self.all.is_empty()
    }
}

/// Calculates the dominant (highest) AQI from multiple pollutant readings.
///
/// Readings for parameters without a breakpoint table are skipped. On equal
/// indices the lexicographically smallest key wins, so the result does not
/// depend on iteration order. If the same key appears more than once the last
/// reading is kept.
///
/// # Examples
///
/// ```
/// use aqi::calculate_dominant_aqi;
///
/// let result = calculate_dominant_aqi([("pm25", 12.0), ("pm10", 155.0), ("bogus", 1.0)]);
/// assert_eq!(result.parameter_or_unknown(), "pm10");
/// assert_eq!(result.aqi, 101);
/// assert_eq!(result.all.len(), 2);
/// ```
pub fn calculate_dominant_aqi<I, K, V>(measurements: I) -> DominantAqi
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: Borrow<f64>,
{
    let mut all = BTreeMap::new();
    for (parameter, concentration) in measurements {
        let parameter = parameter.as_ref();
        if let Some(aqi) = calculate_aqi(*concentration.borrow(), parameter) {
            all.insert(parameter.to_string(), aqi);
        }
    }

    let mut dominant: Option<(&String, u16)> = None;
    for (parameter, &aqi) in &all {
        match dominant {
            Some((_, max)) if aqi <= max => {}
            _ => dominant = Some((parameter, aqi)),
        }
    }

    let (aqi, parameter) = match dominant {
        Some((parameter, aqi)) => (aqi, Some(parameter.clone())),
        None => (0, None),
    };

    DominantAqi {
        aqi,
        parameter,
        all,
    }
}
