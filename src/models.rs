//! Data models for the field monitoring pipeline.
//!
//! [`SensorRecord`] is the only type read from the store; everything else is
//! derived from a snapshot of records (and the current [`WeatherReading`]) by
//! the functions in `derivation.rs`.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

// ---

/// One observation from a field node, as stored in the sensor table.
///
/// Rows are not validated: any numeric column may be null and stays `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct SensorRecord {
    // ---
    pub node_name: Option<String>,
    pub timestamp: Option<DateTime<Utc>>,
    pub greenness: Option<f64>,
    pub soil_moisture: Option<f64>,
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
    pub light: Option<f64>,
    pub npk: Option<f64>,
}

impl SensorRecord {
    /// Greenness as displayed: the reported index, else temperature / 100.
    pub fn effective_greenness(&self) -> Option<f64> {
        self.greenness
            .or_else(|| self.temperature.map(|t| t / 100.0))
    }

    /// NPK scaled into a 0–1 pest-risk proxy.
    pub fn pest_risk(&self) -> Option<f64> {
        self.npk.map(|n| n / 100.0)
    }

    /// Node identifier, if present and non-empty.
    pub fn node(&self) -> Option<&str> {
        self.node_name.as_deref().filter(|n| !n.is_empty())
    }
}

/// Vegetation health class of a zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    Healthy,
    Moderate,
    Stress,
}

/// Per-zone summary, one per distinct node in the snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ZoneSummary {
    pub id: String,
    pub name: String,
    pub status: HealthStatus,
    pub greenness: Option<f64>,
    pub area: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    High,
    Medium,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlertEntry {
    pub id: String,
    pub title: String,
    pub zone: String,
    /// Record timestamp (RFC 3339), or the UTC time of day the weather alert was raised.
    pub timestamp: String,
    pub severity: Severity,
    pub cause: String,
    pub action: String,
}

/// One point of the overview trend chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendPoint {
    pub date: String,
    pub greenness: Option<f64>,
    pub humidity: Option<f64>,
    pub pest_risk: Option<f64>,
    pub predicted: bool,
}

/// One point of a zone's history chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ZoneHistoryPoint {
    pub date: String,
    pub greenness: Option<f64>,
    pub humidity: Option<f64>,
}

/// Latest metrics of a zone.
///
/// `measured` is false when no record of the zone is in the snapshot and the
/// values are the fixed placeholder set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ZoneMetrics {
    pub greenness: Option<f64>,
    pub moisture: Option<f64>,
    pub pest_risk: Option<f64>,
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
    pub measured: bool,
}

/// One row of a zone's sensor table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SensorReadingRow {
    pub sensor: String,
    pub value: String,
    pub status: String,
    pub last_update: String,
}

/// Current conditions at the configured coordinate.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeatherReading {
    pub temp: f64,
    pub humidity: Option<f64>,
    pub condition: Option<String>,
    pub alert: Option<String>,
}

/// Number of zones per health status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    pub healthy: usize,
    pub moderate: usize,
    pub stress: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recommendation {
    pub zone_id: String,
    pub title: String,
    pub detail: String,
}

/// Printable health report over the current snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FarmReport {
    pub generated_on: NaiveDate,
    /// Mean zone greenness scaled to 0–100.
    pub overall_health_score: Option<u32>,
    pub action_items: usize,
    pub zones: Vec<ZoneSummary>,
    pub recommendations: Vec<Recommendation>,
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;

    fn record(greenness: Option<f64>, temperature: Option<f64>) -> SensorRecord {
        // ---
        SensorRecord {
            node_name: Some("Node1".to_string()),
            timestamp: None,
            greenness,
            soil_moisture: None,
            temperature,
            humidity: None,
            light: None,
            npk: Some(42.0),
        }
    }

    #[test]
    fn greenness_falls_back_to_scaled_temperature() {
        // ---
        assert_eq!(record(Some(0.85), Some(30.0)).effective_greenness(), Some(0.85));
        assert_eq!(record(None, Some(40.0)).effective_greenness(), Some(0.4));
        assert_eq!(record(None, None).effective_greenness(), None);
    }

    #[test]
    fn pest_risk_scales_npk() {
        // ---
        assert_eq!(record(None, None).pest_risk(), Some(0.42));
    }

    #[test]
    fn empty_node_name_counts_as_absent() {
        // ---
        let mut r = record(None, None);
        assert_eq!(r.node(), Some("Node1"));
        r.node_name = Some(String::new());
        assert_eq!(r.node(), None);
        r.node_name = None;
        assert_eq!(r.node(), None);
    }

    #[test]
    fn statuses_serialize_lowercase() {
        // ---
        assert_eq!(
            serde_json::to_string(&HealthStatus::Stress).unwrap(),
            "\"stress\""
        );
        assert_eq!(serde_json::to_string(&Severity::High).unwrap(), "\"high\"");
    }
}
