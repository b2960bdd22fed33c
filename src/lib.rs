//! Air-quality collection for Brazilian cities.
//!
//! Readings are fetched from OpenAQ ([`openaq`], [`ingest`]), stored in SQLite
//! ([`storage`]) and scored with the `aqi` engine into per-city summaries
//! ([`report`]) that may raise [`alerts`].

pub mod alerts;
pub mod cities;
pub mod config;
pub mod error;
pub mod ingest;
pub mod logging;
pub mod models;
pub mod openaq;
pub mod report;
pub mod storage;
pub mod units;

pub use error::{AerisError, Result};
