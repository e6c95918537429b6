//! Overview endpoints: the combined dashboard payload plus its parts.

use axum::{
    extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

use crate::derivation;
use crate::models::{AlertEntry, StatusCounts, TrendPoint, WeatherReading, ZoneSummary};
use crate::{Config, Store};

// ---

pub fn router() -> Router<(Store, Config)> {
    // ---
    Router::new()
        .route("/api/dashboard", get(dashboard))
        .route("/api/alerts", get(alerts))
        .route("/api/trend", get(trend))
        .route("/api/weather", get(weather))
}

#[derive(Debug, Serialize)]
struct DashboardResponse {
    zones: Vec<ZoneSummary>,
    status_counts: StatusCounts,
    alerts: Vec<AlertEntry>,
    trend: Vec<TrendPoint>,
    weather: Option<WeatherReading>,
    snapshot_size: usize,
    snapshot_refreshed_at: Option<DateTime<Utc>>,
    weather_refreshed_at: Option<DateTime<Utc>>,
}

async fn dashboard(State((store, _)): State<(Store, Config)>) -> Json<DashboardResponse> {
    // ---
    let state = store.state().await;
    let zones = state.zones();
    debug!(
        "GET /api/dashboard - {} records, {} zones",
        state.snapshot.len(),
        zones.len()
    );

    Json(DashboardResponse {
        status_counts: derivation::status_counts(&zones),
        zones,
        alerts: state.alerts(Utc::now()),
        trend: state.trend(),
        weather: state.weather.clone(),
        snapshot_size: state.snapshot.len(),
        snapshot_refreshed_at: state.snapshot_refreshed_at,
        weather_refreshed_at: state.weather_refreshed_at,
    })
}

async fn alerts(State((store, _)): State<(Store, Config)>) -> Json<Vec<AlertEntry>> {
    Json(store.state().await.alerts(Utc::now()))
}

async fn trend(State((store, _)): State<(Store, Config)>) -> Json<Vec<TrendPoint>> {
    Json(store.state().await.trend())
}

/// `204 No Content` while the weather is unknown.
async fn weather(State((store, _)): State<(Store, Config)>) -> impl IntoResponse {
    // ---
    match store.state().await.weather {
        Some(reading) => (StatusCode::OK, Json(reading)).into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    }
}
