use thiserror::Error;

/// Errors raised by the collection, storage and reporting layers. The AQI
/// engine itself never fails.
#[derive(Debug, Error)]
pub enum AerisError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("invalid value for {name}: {value:?}")]
    InvalidSetting { name: &'static str, value: String },

    #[error("OpenAQ rejected the API key, check OPENAQ_API_KEY")]
    Unauthorized,

    #[error("OpenAQ returned HTTP {status} for {url}")]
    Status { status: u16, url: String },

    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid JSON payload: {0}")]
    Json(#[from] serde_json::Error),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("unknown city: {0}")]
    UnknownCity(String),
}

pub type Result<T, E = AerisError> = std::result::Result<T, E>;
