//! Display labels for parameter keys.

use alloc::string::{String, ToString};

/// Formats a parameter key for display, e.g. `"pm25"` becomes `"PM2.5"` and
/// `"no2"` becomes `"NO₂"`. Keys without a known label are upper-cased.
pub fn format_parameter_name(parameter: &str) -> String {
    let label = match crate::normalize_key(parameter).as_str() {
        "pm25" => "PM2.5",
        "pm10" => "PM10",
        "o3" | "ozone" => "O₃",
        "co" => "CO",
        "no2" => "NO₂",
        "so2" => "SO₂",
        _ => return parameter.to_uppercase(),
    };
    label.to_string()
}
