//! Derivation engine: pure functions from a sensor snapshot (and the current
//! weather reading) to everything the dashboard displays.
//!
//! Nothing here caches or mutates; every value is recomputed from its inputs,
//! so calling a selector twice on the same snapshot yields the same result.

use chrono::{DateTime, SecondsFormat, Utc};

use crate::models::{
    AlertEntry, FarmReport, HealthStatus, Recommendation, SensorReadingRow, SensorRecord, Severity,
    StatusCounts, TrendPoint, WeatherReading, ZoneHistoryPoint, ZoneMetrics, ZoneSummary,
};

/// Prefix stripped from a node identifier to obtain its zone id.
pub const NODE_PREFIX: &str = "Node";

/// Number of rows in the trend and zone history series.
pub const TREND_WINDOW: usize = 10;

pub const HEALTHY_MIN_GREENNESS: f64 = 0.8;
pub const STRESS_MAX_GREENNESS: f64 = 0.7;

pub const HIGH_TEMPERATURE_C: f64 = 35.0;
pub const LOW_SOIL_MOISTURE_PCT: f64 = 30.0;
pub const BRIGHT_LIGHT_LUX: f64 = 800.0;
pub const LOW_NPK: f64 = 20.0;

/// Placeholder metrics shown for a zone without any record in the snapshot.
pub const FALLBACK_METRICS: ZoneMetrics = ZoneMetrics {
    greenness: Some(0.7),
    moisture: Some(0.6),
    pest_risk: Some(0.3),
    temperature: Some(25.0),
    humidity: Some(60.0),
    measured: false,
};

// ---

/// Classify a greenness value.
///
/// `>= 0.8` is healthy, `<= 0.7` is stress and the open interval between them
/// is moderate. Unknown and non-finite values count as zero, i.e. stress.
pub fn health_status(greenness: Option<f64>) -> HealthStatus {
    // ---
    match greenness.filter(|g| g.is_finite()) {
        Some(g) if g >= HEALTHY_MIN_GREENNESS => HealthStatus::Healthy,
        Some(g) if g > STRESS_MAX_GREENNESS => HealthStatus::Moderate,
        _ => HealthStatus::Stress,
    }
}

/// Zone id of a node identifier: the first `Node` occurrence removed.
pub fn zone_id_of(node_name: &str) -> String {
    node_name.replacen(NODE_PREFIX, "", 1)
}

fn node_name_of(zone_id: &str) -> String {
    format!("{NODE_PREFIX}{zone_id}")
}

/// One summary per distinct zone, in order of first appearance.
///
/// The snapshot is most-recent-first, so the newest record of each zone wins.
pub fn zone_summaries(snapshot: &[SensorRecord]) -> Vec<ZoneSummary> {
    // ---
    let mut zones: Vec<ZoneSummary> = Vec::new();

    for record in snapshot {
        let Some(node) = record.node() else {
            continue;
        };
        let id = zone_id_of(node);
        if zones.iter().any(|z| z.id == id) {
            continue;
        }

        let greenness = record.effective_greenness();
        zones.push(ZoneSummary {
            id,
            name: format!("{node} Field"),
            status: health_status(greenness),
            greenness,
            area: "Unknown".to_string(),
        });
    }

    zones
}

pub fn status_counts(zones: &[ZoneSummary]) -> StatusCounts {
    // ---
    zones
        .iter()
        .fold(StatusCounts::default(), |mut counts, zone| {
            match zone.status {
                HealthStatus::Healthy => counts.healthy += 1,
                HealthStatus::Moderate => counts.moderate += 1,
                HealthStatus::Stress => counts.stress += 1,
            }
            counts
        })
}

fn breaches_temperature(record: &SensorRecord) -> bool {
    record.temperature.is_some_and(|t| t > HIGH_TEMPERATURE_C)
}

fn breaches_moisture(record: &SensorRecord) -> bool {
    record.soil_moisture.is_some_and(|m| m < LOW_SOIL_MOISTURE_PCT)
}

/// One alert per record that is too hot or too dry.
///
/// Temperature wins the title, severity and advice when both thresholds are
/// crossed. Ids count up from 1 in snapshot order.
pub fn sensor_alerts(snapshot: &[SensorRecord]) -> Vec<AlertEntry> {
    // ---
    snapshot
        .iter()
        .filter(|r| breaches_temperature(r) || breaches_moisture(r))
        .enumerate()
        .map(|(idx, record)| {
            let (title, severity, cause, action) = if breaches_temperature(record) {
                (
                    "High Temperature Alert",
                    Severity::High,
                    "Temperature above safe threshold",
                    "Increase shade/irrigation",
                )
            } else {
                (
                    "Low Moisture Alert",
                    Severity::Medium,
                    "Soil moisture below safe threshold",
                    "Increase irrigation",
                )
            };

            AlertEntry {
                id: (idx + 1).to_string(),
                title: title.to_string(),
                zone: record.node_name.clone().unwrap_or_default(),
                timestamp: rfc3339_or(record.timestamp, ""),
                severity,
                cause: cause.to_string(),
                action: action.to_string(),
            }
        })
        .collect()
}

/// The synthetic all-zones alert, present only while the weather reading
/// carries an alert.
pub fn weather_alert(weather: Option<&WeatherReading>, now: DateTime<Utc>) -> Option<AlertEntry> {
    // ---
    let cause = weather?.alert.clone()?;
    Some(AlertEntry {
        id: "weather".to_string(),
        title: "Weather Alert".to_string(),
        zone: "All Zones".to_string(),
        timestamp: display_time(Some(now)),
        severity: Severity::High,
        cause,
        action: "Check weather forecast and prepare accordingly".to_string(),
    })
}

/// Weather alert (if any) followed by the sensor alerts.
pub fn alerts(
    snapshot: &[SensorRecord],
    weather: Option<&WeatherReading>,
    now: DateTime<Utc>,
) -> Vec<AlertEntry> {
    // ---
    weather_alert(weather, now)
        .into_iter()
        .chain(sensor_alerts(snapshot))
        .collect()
}

/// Overview chart: the newest ten records, oldest first.
pub fn trend_series(snapshot: &[SensorRecord]) -> Vec<TrendPoint> {
    // ---
    snapshot
        .iter()
        .take(TREND_WINDOW)
        .rev()
        .map(|record| TrendPoint {
            date: display_time(record.timestamp),
            greenness: record.effective_greenness(),
            humidity: record.humidity,
            pest_risk: record.pest_risk(),
            predicted: false,
        })
        .collect()
}

fn latest_for_zone<'a>(snapshot: &'a [SensorRecord], zone_id: &str) -> Option<&'a SensorRecord> {
    // ---
    let node = node_name_of(zone_id);
    snapshot
        .iter()
        .find(|r| r.node_name.as_deref() == Some(node.as_str()))
}

/// Latest metrics of a zone, or [`FALLBACK_METRICS`] when it has no record.
pub fn zone_metrics(snapshot: &[SensorRecord], zone_id: &str) -> ZoneMetrics {
    // ---
    match latest_for_zone(snapshot, zone_id) {
        Some(record) => ZoneMetrics {
            greenness: record.effective_greenness(),
            moisture: record.soil_moisture.map(|m| m / 100.0),
            pest_risk: record.pest_risk(),
            temperature: record.temperature,
            humidity: record.humidity,
            measured: true,
        },
        None => FALLBACK_METRICS,
    }
}

/// The zone's newest ten records, oldest first.
pub fn zone_history(snapshot: &[SensorRecord], zone_id: &str) -> Vec<ZoneHistoryPoint> {
    // ---
    let node = node_name_of(zone_id);
    let mut points: Vec<ZoneHistoryPoint> = snapshot
        .iter()
        .filter(|r| r.node_name.as_deref() == Some(node.as_str()))
        .take(TREND_WINDOW)
        .map(|record| ZoneHistoryPoint {
            date: display_time(record.timestamp),
            greenness: record.effective_greenness(),
            humidity: record.humidity,
        })
        .collect();
    points.reverse();
    points
}

const SENSOR_NAMES: [&str; 5] = [
    "Soil Moisture Sensor 1",
    "Temperature Probe",
    "Humidity Sensor",
    "Light Sensor",
    "NPK Sensor",
];

/// The zone's five-row sensor table.
pub fn sensor_readings(snapshot: &[SensorRecord], zone_id: &str) -> Vec<SensorReadingRow> {
    // ---
    let Some(record) = latest_for_zone(snapshot, zone_id) else {
        return SENSOR_NAMES
            .iter()
            .map(|name| SensorReadingRow {
                sensor: name.to_string(),
                value: "N/A".to_string(),
                status: "Unknown".to_string(),
                last_update: "N/A".to_string(),
            })
            .collect();
    };

    let last_update = rfc3339_or(record.timestamp, "N/A");
    let row = |sensor: &str, reading: Option<(String, &str)>| {
        let (value, status) = reading.unwrap_or_else(|| ("N/A".to_string(), "Unknown"));
        SensorReadingRow {
            sensor: sensor.to_string(),
            value,
            status: status.to_string(),
            last_update: last_update.clone(),
        }
    };

    vec![
        row(
            SENSOR_NAMES[0],
            record.soil_moisture.map(|m| {
                let status = if m > LOW_SOIL_MOISTURE_PCT { "Normal" } else { "Low" };
                (format!("{m}%"), status)
            }),
        ),
        row(
            SENSOR_NAMES[1],
            record.temperature.map(|t| {
                let status = if t < HIGH_TEMPERATURE_C { "Normal" } else { "High" };
                (format!("{t}°C"), status)
            }),
        ),
        row(
            SENSOR_NAMES[2],
            record.humidity.map(|h| (format!("{h}%"), "Normal")),
        ),
        row(
            SENSOR_NAMES[3],
            record.light.map(|l| {
                let status = if l > BRIGHT_LIGHT_LUX { "High" } else { "Normal" };
                (format!("{l} lux"), status)
            }),
        ),
        row(
            SENSOR_NAMES[4],
            record.npk.map(|n| {
                let status = if n > LOW_NPK { "Optimal" } else { "Low" };
                (format!("{n}"), status)
            }),
        ),
    ]
}

fn recommendation_for(zone: &ZoneSummary) -> Recommendation {
    // ---
    let (title, detail) = match zone.status {
        HealthStatus::Healthy => (
            "Maintain Current Practices",
            "Excellent health metrics. Continue current irrigation and nutrient schedule.",
        ),
        HealthStatus::Stress => (
            "Immediate Attention Required",
            "Greenness drop detected. Increase irrigation by 20% and monitor for pest activity.",
        ),
        HealthStatus::Moderate => (
            "Optimize Nutrition",
            "Consider NPK supplementation to boost growth metrics.",
        ),
    };

    Recommendation {
        zone_id: zone.id.clone(),
        title: format!("Zone {} - {}", zone.id, title),
        detail: detail.to_string(),
    }
}

/// Health report over the current snapshot.
pub fn farm_report(
    snapshot: &[SensorRecord],
    weather: Option<&WeatherReading>,
    now: DateTime<Utc>,
) -> FarmReport {
    // ---
    let zones = zone_summaries(snapshot);

    let known: Vec<f64> = zones
        .iter()
        .filter_map(|z| z.greenness)
        .filter(|g| g.is_finite())
        .collect();
    let overall_health_score = if known.is_empty() {
        None
    } else {
        let mean = known.iter().sum::<f64>() / known.len() as f64;
        Some((mean * 100.0).round().clamp(0.0, 100.0) as u32)
    };

    FarmReport {
        generated_on: now.date_naive(),
        overall_health_score,
        action_items: alerts(snapshot, weather, now).len(),
        recommendations: zones.iter().map(recommendation_for).collect(),
        zones,
    }
}

/// Wall-clock time of day for chart axes; empty when unknown.
fn display_time(ts: Option<DateTime<Utc>>) -> String {
    ts.map(|t| t.format("%H:%M:%S").to_string())
        .unwrap_or_default()
}

fn rfc3339_or(ts: Option<DateTime<Utc>>, missing: &str) -> String {
    ts.map(|t| t.to_rfc3339_opts(SecondsFormat::Secs, true))
        .unwrap_or_else(|| missing.to_string())
}
