use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use tracing::debug;

use crate::derivation;
use crate::models::{SensorReadingRow, ZoneHistoryPoint, ZoneMetrics, ZoneSummary};
use crate::{Config, Store};

// ---

pub fn router() -> Router<(Store, Config)> {
    // ---
    Router::new()
        .route("/api/zones", get(list))
        .route("/api/zones/{zone_id}", get(detail))
}

async fn list(State((store, _)): State<(Store, Config)>) -> Json<Vec<ZoneSummary>> {
    Json(store.state().await.zones())
}

/// Everything the zone detail view shows.
///
/// An unknown zone is not an error: `summary` is null, the metrics are the
/// placeholder set with `measured: false`, and every sensor row reads `N/A`.
#[derive(Debug, Serialize)]
struct ZoneDetail {
    summary: Option<ZoneSummary>,
    metrics: ZoneMetrics,
    history: Vec<ZoneHistoryPoint>,
    sensor_readings: Vec<SensorReadingRow>,
}

async fn detail(
    Path(zone_id): Path<String>,
    State((store, _)): State<(Store, Config)>,
) -> Json<ZoneDetail> {
    // ---
    let state = store.state().await;
    let snapshot = state.snapshot.as_slice();
    debug!("GET /api/zones/{}", zone_id);

    Json(ZoneDetail {
        summary: state.zones().into_iter().find(|z| z.id == zone_id),
        metrics: derivation::zone_metrics(snapshot, &zone_id),
        history: derivation::zone_history(snapshot, &zone_id),
        sensor_readings: derivation::sensor_readings(snapshot, &zone_id),
    })
}
