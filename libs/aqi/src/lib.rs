//! AQI library
//!
//! This library provides the AQI calculations used by Aeris: converting a
//! pollutant concentration into an index using the EPA breakpoint tables,
//! mapping an index to its EPA category and color, and combining several
//! simultaneous readings into a single dominant index. It supports both std
//! and no_std environments; the aggregation and formatting helpers need an
//! allocator.
//!
//! Every function here is pure. Tables are compile-time constants.

#![no_std]

extern crate alloc;

#[cfg(feature = "std")]
extern crate std;

mod breakpoints;
mod category;
mod display;
mod dominant;
mod guidelines;

pub use breakpoints::{calculate_aqi, get_breakpoints, Breakpoint, Pollutant, MAX_AQI};
pub use category::{describe_aqi, get_aqi_category, get_aqi_color, AqiDescription, Category, Color};
pub use display::format_parameter_name;
pub use dominant::{calculate_dominant_aqi, DominantAqi, UNKNOWN_PARAMETER};
pub use guidelines::{who_guideline, WhoGuideline};

fn key_chars(raw: &str) -> impl Iterator<Item = char> + '_ {
    raw.chars()
        .filter(|c| *c != '.' && *c != '_')
        .map(|c| c.to_ascii_lowercase())
}

/// Normalizes a parameter key: ASCII lowercase, with `.` and `_` removed.
/// "PM2.5", "pm_25" and "pm25" all become "pm25".
pub fn normalize_key(raw: &str) -> alloc::string::String {
    key_chars(raw).collect()
}

/// Compares a raw key against a normalized one without allocating.
pub(crate) fn key_matches(raw: &str, key: &str) -> bool {
    key_chars(raw).eq(key.chars())
}
