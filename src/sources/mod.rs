//! External data sources behind the ingestion adapter.
//!
//! Each collaborator is reached through a trait so the refresh workers in
//! `ingest.rs` can be driven by in-memory fakes in tests:
//! - [`SensorSource`]: most recent sensor rows, newest first
//! - [`WeatherSource`]: current conditions at a fixed coordinate

use async_trait::async_trait;

use crate::error::IngestError;
use crate::models::{SensorRecord, WeatherReading};

mod postgres;
mod weather;

pub use postgres::{listen_for_changes, PgSensorSource};
pub use weather::OpenWeatherSource;

// ---

#[async_trait]
pub trait SensorSource: Send + Sync {
    /// Fetch up to `limit` records ordered by timestamp, newest first.
    async fn fetch_snapshot(&self, limit: i64) -> Result<Vec<SensorRecord>, IngestError>;
}

#[async_trait]
pub trait WeatherSource: Send + Sync {
    async fn current(&self) -> Result<WeatherReading, IngestError>;
}
