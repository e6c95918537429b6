//! Black-box checks against a running service (`BASE_URL`, default
//! `http://localhost:8080`) connected to a live sensor store.

use anyhow::Result;
use reqwest::Client;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct ZoneSummary {
    id: String,
    name: String,
    status: String,
    greenness: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct AlertEntry {
    id: String,
    title: String,
    severity: String,
}

#[derive(Debug, Deserialize)]
struct TrendPoint {
    date: String,
}

#[derive(Debug, Deserialize)]
struct Dashboard {
    zones: Vec<ZoneSummary>,
    alerts: Vec<AlertEntry>,
    trend: Vec<TrendPoint>,
    snapshot_size: usize,
}

#[derive(Debug, Deserialize)]
struct SensorRecord {
    node_name: Option<String>,
    temperature: Option<f64>,
    soil_moisture: Option<f64>,
}

fn base_url() -> String {
    std::env::var("BASE_URL").unwrap_or_else(|_| "http://localhost:8080".into())
}

#[tokio::test]
async fn dashboard_derivations_hold() -> Result<()> {
    // ---
    let client = Client::new();
    let dashboard: Dashboard = client
        .get(format!("{}/api/dashboard", base_url()))
        .send()
        .await?
        .json()
        .await?;

    assert!(dashboard.snapshot_size <= 100, "snapshot exceeds 100 rows");
    assert_eq!(dashboard.trend.len(), dashboard.snapshot_size.min(10));

    for zone in &dashboard.zones {
        // ---
        assert!(zone.name.ends_with(" Field"), "zone {} name {}", zone.id, zone.name);
        let expected = match zone.greenness {
            Some(g) if g >= 0.8 => "healthy",
            Some(g) if g > 0.7 => "moderate",
            _ => "stress",
        };
        assert_eq!(
            zone.status, expected,
            "zone {} with greenness {:?} classified as {}",
            zone.id, zone.greenness, zone.status
        );
    }

    for alert in &dashboard.alerts {
        // ---
        let expected = match alert.title.as_str() {
            "High Temperature Alert" | "Weather Alert" => "high",
            "Low Moisture Alert" => "medium",
            other => panic!("unexpected alert title {}", other),
        };
        assert_eq!(alert.severity, expected, "alert {} severity", alert.id);
    }

    let trend_dates: Vec<&str> = dashboard
        .trend
        .iter()
        .map(|p| p.date.as_str())
        .filter(|d| !d.is_empty())
        .collect();
    assert!(trend_dates.iter().all(|d| d.len() == 8), "dates are HH:MM:SS");

    Ok(())
}

#[tokio::test]
async fn one_sensor_alert_per_breaching_row() -> Result<()> {
    // ---
    let client = Client::new();
    let rows: Vec<SensorRecord> = client
        .get(format!("{}/api/readings?limit=100", base_url()))
        .send()
        .await?
        .json()
        .await?;
    let alerts: Vec<AlertEntry> = client
        .get(format!("{}/api/alerts", base_url()))
        .send()
        .await?
        .json()
        .await?;

    let breaching = rows
        .iter()
        .filter(|r| {
            r.temperature.is_some_and(|t| t > 35.0) || r.soil_moisture.is_some_and(|m| m < 30.0)
        })
        .count();
    let sensor_alerts = alerts.iter().filter(|a| a.id != "weather").count();

    // A refresh may land between the two requests
    let fresh_rows: Vec<SensorRecord> = client
        .get(format!("{}/api/readings?limit=100", base_url()))
        .send()
        .await?
        .json()
        .await?;
    if fresh_rows.len() == rows.len() {
        assert_eq!(sensor_alerts, breaching);
    }

    Ok(())
}

#[tokio::test]
async fn filtering_works() -> Result<()> {
    // ---
    let client = Client::new();

    let url = format!("{}/api/readings?node_name=Node1&limit=10", base_url());
    let readings: Vec<SensorRecord> = client.get(&url).send().await?.json().await?;

    for reading in &readings {
        assert_eq!(reading.node_name.as_deref(), Some("Node1"), "Node filter failed");
    }
    assert!(readings.len() <= 10, "Limit filter failed");

    Ok(())
}
