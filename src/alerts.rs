//! Raises alerts when a city's AQI reaches the configured category.

use aqi::Category;
use tracing::{debug, warn};

use crate::error::Result;
use crate::models::NewAlert;
use crate::report::CitySummary;
use crate::storage::Database;

/// Builds the alert a summary warrants, if its category is at least
/// `min_category`. The alert's value is the dominant AQI and its threshold
/// the lowest AQI of the category reached.
pub fn alert_for(summary: &CitySummary, min_category: Category) -> Option<NewAlert> {
    let category = summary.category();
    if category < min_category {
        return None;
    }

    Some(NewAlert {
        city: summary.city.clone(),
        level: category.level().to_string(),
        parameter: summary.dominant.parameter_or_unknown().to_string(),
        value: f64::from(summary.dominant.aqi),
        threshold: f64::from(category.range().0),
        message: category.health_message().to_string(),
    })
}

/// Stores the alert for `summary` unless the city already has an active
/// alert at the same level. Returns the new alert's id.
pub fn evaluate(db: &Database, summary: &CitySummary, min_category: Category) -> Result<Option<i64>> {
    let Some(alert) = alert_for(summary, min_category) else {
        debug!(city = %summary.city, aqi = summary.dominant.aqi, "below alert threshold");
        return Ok(None);
    };

    let active = db.active_alerts(Some(&alert.city))?;
    if active.iter().any(|existing| existing.level == alert.level) {
        debug!(city = %alert.city, level = %alert.level, "alert already active");
        return Ok(None);
    }

    warn!(
        city = %alert.city,
        level = %alert.level,
        aqi = summary.dominant.aqi,
        parameter = %alert.parameter,
        "air quality alert"
    );
    db.create_alert(&alert).map(Some)
}
