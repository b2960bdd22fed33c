//! EPA AQI categories, their colors and health messages.

/// Color enum provides colors corresponding to EPA AQI levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Color {
    Green,
    Yellow,
    Orange,
    Red,
    Purple,
    DarkPurple,
}

impl Color {
    /// Reference RGB value for the color.
    pub const fn rgb(self) -> (u8, u8, u8) {
        match self {
            Color::Green => (0x00, 0xE4, 0x00),
            Color::Yellow => (0xFF, 0xFF, 0x00),
            Color::Orange => (0xFF, 0x7E, 0x00),
            Color::Red => (0xFF, 0x00, 0x00),
            Color::Purple => (0x8F, 0x3F, 0x97),
            Color::DarkPurple => (0x7E, 0x00, 0x23),
        }
    }
}

/// The six EPA severity bands, ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "SCREAMING_SNAKE_CASE"))]
pub enum Category {
    Good,
    Moderate,
    UnhealthySensitive,
    Unhealthy,
    VeryUnhealthy,
    Hazardous,
}

impl Category {
    pub const ALL: [Category; 6] = [
        Category::Good,
        Category::Moderate,
        Category::UnhealthySensitive,
        Category::Unhealthy,
        Category::VeryUnhealthy,
        Category::Hazardous,
    ];

    /// Maps an index onto its band. Indices above 500 are Hazardous.
    pub const fn from_aqi(aqi: u16) -> Category {
        match aqi {
            0..=50 => Category::Good,
            51..=100 => Category::Moderate,
            101..=150 => Category::UnhealthySensitive,
            151..=200 => Category::Unhealthy,
            201..=300 => Category::VeryUnhealthy,
            _ => Category::Hazardous,
        }
    }

    /// Inclusive index range of the band. Hazardous nominally ends at 500 but
    /// also absorbs anything above.
    pub const fn range(self) -> (u16, u16) {
        match self {
            Category::Good => (0, 50),
            Category::Moderate => (51, 100),
            Category::UnhealthySensitive => (101, 150),
            Category::Unhealthy => (151, 200),
            Category::VeryUnhealthy => (201, 300),
            Category::Hazardous => (301, 500),
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Category::Good => "Good",
            Category::Moderate => "Moderate",
            Category::UnhealthySensitive => "Unhealthy for Sensitive Groups",
            Category::Unhealthy => "Unhealthy",
            Category::VeryUnhealthy => "Very Unhealthy",
            Category::Hazardous => "Hazardous",
        }
    }

    /// Machine-readable level name, stable across releases.
    pub const fn level(self) -> &'static str {
        match self {
            Category::Good => "GOOD",
            Category::Moderate => "MODERATE",
            Category::UnhealthySensitive => "UNHEALTHY_SENSITIVE",
            Category::Unhealthy => "UNHEALTHY",
            Category::VeryUnhealthy => "VERY_UNHEALTHY",
            Category::Hazardous => "HAZARDOUS",
        }
    }

    /// Parses a level name as produced by [`Category::level`], ignoring case.
    pub fn from_level(level: &str) -> Option<Category> {
        Self::ALL
            .into_iter()
            .find(|category| category.level().eq_ignore_ascii_case(level))
    }

    /// Reference hex color, e.g. `#00E400`.
    pub const fn hex_color(self) -> &'static str {
        match self {
            Category::Good => "#00E400",
            Category::Moderate => "#FFFF00",
            Category::UnhealthySensitive => "#FF7E00",
            Category::Unhealthy => "#FF0000",
            Category::VeryUnhealthy => "#8F3F97",
            Category::Hazardous => "#7E0023",
        }
    }

    pub const fn color(self) -> Color {
        match self {
            Category::Good => Color::Green,
            Category::Moderate => Color::Yellow,
            Category::UnhealthySensitive => Color::Orange,
            Category::Unhealthy => Color::Red,
            Category::VeryUnhealthy => Color::Purple,
            Category::Hazardous => Color::DarkPurple,
        }
    }

    pub const fn health_message(self) -> &'static str {
        match self {
            Category::Good => {
                "Air quality is satisfactory, and air pollution poses little or no risk."
            }
            Category::Moderate => {
                "Air quality is acceptable. However, there may be a risk for some people who are unusually sensitive to air pollution."
            }
            Category::UnhealthySensitive => {
                "Members of sensitive groups may experience health effects. The general public is less likely to be affected."
            }
            Category::Unhealthy => {
                "Some members of the general public may experience health effects; members of sensitive groups may experience more serious health effects."
            }
            Category::VeryUnhealthy => {
                "Health alert: The risk of health effects is increased for everyone."
            }
            Category::Hazardous => {
                "Health warning of emergency conditions: everyone is more likely to be affected."
            }
        }
    }
}

/// Everything a report needs to present one index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct AqiDescription {
    pub aqi: u16,
    pub category: &'static str,
    pub color: &'static str,
    pub level: &'static str,
    pub health_message: &'static str,
}

/// Returns the category for an index.
pub const fn get_aqi_category(aqi: u16) -> Category {
    Category::from_aqi(aqi)
}

/// Provides a Color enum variant value based on the
/// specified AQI value. Uses the ranges provided by the
/// EPA for mapping AQI to color.
///
/// # Examples
///
/// ```
/// use aqi::{calculate_aqi, get_aqi_color, Color};
///
/// let aqi = calculate_aqi(41.0, "pm25").unwrap_or(0);
/// assert_eq!(get_aqi_color(aqi), Color::Orange);
/// ```
pub const fn get_aqi_color(aqi: u16) -> Color {
    Category::from_aqi(aqi).color()
}

/// Bundles the index with its category label, color, level and health
/// message.
pub const fn describe_aqi(aqi: u16) -> AqiDescription {
    let category = Category::from_aqi(aqi);
    AqiDescription {
        aqi,
        category: category.label(),
        color: category.hex_color(),
        level: category.level(),
        health_message: category.health_message(),
    }
}
