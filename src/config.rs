//! Configuration loader for the `terra-fieldwatch` service.
//!
//! All runtime settings are read from environment variables (with optional
//! `.env` file support provided by the caller). Keeping every `env::var` call
//! in this module means the ingestion adapter and the routes only ever see a
//! typed [`Config`].
//!
use std::{env, net::SocketAddr, time::Duration};

use anyhow::{anyhow, Result};

/// Parse an optional environment variable into `$ty`, falling back to a default.
macro_rules! parse_env {
    ($var_name:expr, $ty:ty, $default:expr) => {
        env::var($var_name)
            .ok()
            .map(|v| v.trim().parse::<$ty>())
            .transpose()
            .map_err(|e| anyhow!("Invalid {}: {}", $var_name, e))?
            .unwrap_or($default)
    };
}

/// Parse a required string environment variable.
macro_rules! require_env {
    ($var_name:expr) => {
        env::var($var_name)
            .map_err(|_| anyhow!("{} must be set in .env or environment", $var_name))?
    };
}

/// Read an optional string environment variable, treating blank values as unset.
macro_rules! optional_env {
    ($var_name:expr) => {
        env::var($var_name).ok().filter(|v| !v.trim().is_empty())
    };
}

pub const DEFAULT_WEATHER_API_URL: &str = "https://api.openweathermap.org/data/2.5/weather";

/// Strongly typed application configuration.
///
/// All fields are immutable after loading, ensuring a consistent configuration
/// snapshot for the lifetime of the application.
#[derive(Debug, Clone)]
pub struct Config {
    // ---
    /// PostgreSQL connection string of the sensor store.
    pub db_url: String,

    /// Maximum number of database connections in the pool.
    pub db_pool_max: u32,

    /// Table holding the sensor rows.
    pub sensor_table: String,

    /// Number of most recent rows kept in the snapshot.
    pub snapshot_limit: i64,

    /// Fixed re-poll period for the sensor snapshot.
    pub sensor_poll: Duration,

    /// `LISTEN` channel signalled when the sensor table changes.
    pub notify_channel: String,

    /// Install the `NOTIFY` trigger on the sensor table at startup.
    pub install_change_trigger: bool,

    /// Current-conditions endpoint.
    pub weather_api_url: String,

    /// Weather API key. Weather stays unknown without one.
    pub weather_api_key: Option<String>,

    pub weather_lat: f64,
    pub weather_lon: f64,

    /// Fixed re-poll period for the weather reading.
    pub weather_poll: Duration,

    /// Prefix under which the raster overlays are served.
    pub asset_base_url: String,

    /// Address the HTTP API binds to.
    pub listen_addr: SocketAddr,
}

/// Load configuration from environment variables with defaults.
///
/// Required:
/// - `DATABASE_URL` – PostgreSQL connection string
///
/// Optional:
/// - `DB_POOL_MAX` – max DB connections (default: 5)
/// - `SENSOR_TABLE` – sensor table name (default: `sensor_data`)
/// - `SNAPSHOT_LIMIT` – rows per snapshot (default: 100)
/// - `SENSOR_POLL_SECS` – sensor re-poll period (default: 10)
/// - `SENSOR_NOTIFY_CHANNEL` – change channel (default: `sensor_data_changes`)
/// - `INSTALL_CHANGE_TRIGGER` – install the NOTIFY trigger (default: false)
/// - `WEATHER_API_URL`, `WEATHER_API_KEY`, `WEATHER_LAT`, `WEATHER_LON`
/// - `WEATHER_POLL_SECS` – weather re-poll period (default: 60)
/// - `ASSET_BASE_URL` – overlay image prefix (default: `/`)
/// - `LISTEN_ADDR` – bind address (default: `0.0.0.0:8080`)
///
/// Returns an error if any required variable is missing or invalid.
pub fn load_from_env() -> Result<Config> {
    // ---
    let db_url = require_env!("DATABASE_URL");
    let db_pool_max = parse_env!("DB_POOL_MAX", u32, 5);

    let sensor_table = optional_env!("SENSOR_TABLE").unwrap_or_else(|| "sensor_data".into());
    ensure_identifier("SENSOR_TABLE", &sensor_table)?;

    let snapshot_limit = parse_env!("SNAPSHOT_LIMIT", i64, 100);
    if snapshot_limit <= 0 {
        return Err(anyhow!("Invalid SNAPSHOT_LIMIT: must be positive"));
    }

    let sensor_poll = Duration::from_secs(parse_env!("SENSOR_POLL_SECS", u64, 10).max(1));
    let notify_channel =
        optional_env!("SENSOR_NOTIFY_CHANNEL").unwrap_or_else(|| "sensor_data_changes".into());
    ensure_identifier("SENSOR_NOTIFY_CHANNEL", &notify_channel)?;
    let install_change_trigger = parse_flag(optional_env!("INSTALL_CHANGE_TRIGGER").as_deref());

    let weather_api_url =
        optional_env!("WEATHER_API_URL").unwrap_or_else(|| DEFAULT_WEATHER_API_URL.into());
    let weather_api_key = optional_env!("WEATHER_API_KEY");
    let weather_lat = parse_env!("WEATHER_LAT", f64, 28.6139);
    let weather_lon = parse_env!("WEATHER_LON", f64, 77.2090);
    let weather_poll = Duration::from_secs(parse_env!("WEATHER_POLL_SECS", u64, 60).max(1));

    let asset_base_url = optional_env!("ASSET_BASE_URL").unwrap_or_else(|| "/".into());
    let listen_addr = parse_env!(
        "LISTEN_ADDR",
        SocketAddr,
        SocketAddr::from(([0, 0, 0, 0], 8080))
    );

    Ok(Config {
        db_url,
        db_pool_max,
        sensor_table,
        snapshot_limit,
        sensor_poll,
        notify_channel,
        install_change_trigger,
        weather_api_url,
        weather_api_key,
        weather_lat,
        weather_lon,
        weather_poll,
        asset_base_url,
        listen_addr,
    })
}

/// Table and channel names are spliced into SQL, so only plain identifiers pass.
fn ensure_identifier(var_name: &str, value: &str) -> Result<()> {
    // ---
    let mut chars = value.chars();
    let valid_start = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
    if valid_start && chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
        Ok(())
    } else {
        Err(anyhow!(
            "Invalid {}: '{}' is not a plain SQL identifier",
            var_name,
            value
        ))
    }
}

fn parse_flag(value: Option<&str>) -> bool {
    matches!(
        value.map(str::to_ascii_lowercase).as_deref(),
        Some("1") | Some("true") | Some("yes")
    )
}

/// Replace the password part of a connection string with `****`.
fn mask_db_url(db_url: &str) -> String {
    // ---
    if let Some(at_pos) = db_url.rfind('@') {
        if let Some(colon_pos) = db_url[..at_pos].rfind(':') {
            // `postgres://host@...` has the scheme colon as its only colon
            if db_url[colon_pos..].starts_with("://") {
                return db_url.to_string();
            }
            return format!("{}:****{}", &db_url[..colon_pos], &db_url[at_pos..]);
        }
    }
    db_url.to_string()
}

impl Config {
    /// Log the loaded configuration, masking the database password and API key.
    pub fn log_config(&self) {
        // ---
        let masked_key = match &self.weather_api_key {
            Some(_) => "****",
            None => "(unset, weather disabled)",
        };

        tracing::info!("Configuration loaded:");
        tracing::info!("  DATABASE_URL           : {}", mask_db_url(&self.db_url));
        tracing::info!("  DB_POOL_MAX            : {}", self.db_pool_max);
        tracing::info!("  SENSOR_TABLE           : {}", self.sensor_table);
        tracing::info!("  SNAPSHOT_LIMIT         : {}", self.snapshot_limit);
        tracing::info!("  SENSOR_POLL_SECS       : {}", self.sensor_poll.as_secs());
        tracing::info!("  SENSOR_NOTIFY_CHANNEL  : {}", self.notify_channel);
        tracing::info!("  INSTALL_CHANGE_TRIGGER : {}", self.install_change_trigger);
        tracing::info!("  WEATHER_API_URL        : {}", self.weather_api_url);
        tracing::info!("  WEATHER_API_KEY        : {}", masked_key);
        tracing::info!(
            "  WEATHER_LAT/LON        : {}, {}",
            self.weather_lat,
            self.weather_lon
        );
        tracing::info!("  WEATHER_POLL_SECS      : {}", self.weather_poll.as_secs());
        tracing::info!("  ASSET_BASE_URL         : {}", self.asset_base_url);
        tracing::info!("  LISTEN_ADDR            : {}", self.listen_addr);
    }
}
