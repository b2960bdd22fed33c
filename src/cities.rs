use crate::error::{AerisError, Result};

/// A Brazilian city with monitoring coverage. Priority 1 has the best data
/// availability; collection defaults to cities up to [`DEFAULT_MAX_PRIORITY`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct City {
    pub name: &'static str,
    pub state: &'static str,
    pub latitude: f64,
    pub longitude: f64,
    pub priority: u8,
    pub timezone: &'static str,
    pub population: u32,
}

pub const DEFAULT_MAX_PRIORITY: u8 = 4;

pub const CITIES: [City; 8] = [
    City {
        name: "São Paulo",
        state: "SP",
        latitude: -23.5505,
        longitude: -46.6333,
        priority: 1,
        timezone: "America/Sao_Paulo",
        population: 12_300_000,
    },
    City {
        name: "Rio de Janeiro",
        state: "RJ",
        latitude: -22.9068,
        longitude: -43.1729,
        priority: 2,
        timezone: "America/Sao_Paulo",
        population: 6_700_000,
    },
    City {
        name: "Belo Horizonte",
        state: "MG",
        latitude: -19.9167,
        longitude: -43.9345,
        priority: 3,
        timezone: "America/Sao_Paulo",
        population: 2_500_000,
    },
    City {
        name: "Curitiba",
        state: "PR",
        latitude: -25.4284,
        longitude: -49.2733,
        priority: 4,
        timezone: "America/Sao_Paulo",
        population: 1_900_000,
    },
    City {
        name: "Brasília",
        state: "DF",
        latitude: -15.8267,
        longitude: -47.9218,
        priority: 5,
        timezone: "America/Sao_Paulo",
        population: 3_000_000,
    },
    City {
        name: "Salvador",
        state: "BA",
        latitude: -12.9714,
        longitude: -38.5014,
        priority: 6,
        timezone: "America/Bahia",
        population: 2_900_000,
    },
    City {
        name: "Fortaleza",
        state: "CE",
        latitude: -3.7172,
        longitude: -38.5433,
        priority: 7,
        timezone: "America/Fortaleza",
        population: 2_600_000,
    },
    City {
        name: "Porto Alegre",
        state: "RS",
        latitude: -30.0346,
        longitude: -51.2177,
        priority: 8,
        timezone: "America/Sao_Paulo",
        population: 1_500_000,
    },
];

/// Finds a city by name, ignoring case and surrounding whitespace.
pub fn find(name: &str) -> Option<&'static City> {
    let wanted = name.trim().to_lowercase();
    CITIES.iter().find(|city| city.name.to_lowercase() == wanted)
}

/// Cities with priority up to and including `max_priority`, best first.
pub fn priority_cities(max_priority: u8) -> Vec<&'static City> {
    let mut cities: Vec<_> = CITIES
        .iter()
        .filter(|city| city.priority <= max_priority)
        .collect();
    cities.sort_by_key(|city| city.priority);
    cities
}

/// Resolves city names against the catalogue. An empty list selects the
/// cities up to [`DEFAULT_MAX_PRIORITY`].
pub fn resolve<S: AsRef<str>>(names: &[S]) -> Result<Vec<&'static City>> {
    if names.is_empty() {
        return Ok(priority_cities(DEFAULT_MAX_PRIORITY));
    }
    names
        .iter()
        .map(|name| {
            let name = name.as_ref();
            find(name).ok_or_else(|| AerisError::UnknownCity(name.to_string()))
        })
        .collect()
}
