//! Errors raised while pulling data from the external collaborators.
//!
//! None of these reach an API caller: the ingestion workers log them and
//! either keep the previous snapshot or clear the weather reading.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("sensor store query failed: {0}")]
    Store(#[from] sqlx::Error),

    #[error("weather request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("malformed weather response: {0}")]
    MalformedWeather(String),

    #[error("weather API key not configured")]
    WeatherDisabled,
}
