use axum::{extract::State, routing::get, Json, Router};
use chrono::Utc;

use crate::models::FarmReport;
use crate::{Config, Store};

// ---

pub fn router() -> Router<(Store, Config)> {
    Router::new().route("/api/report", get(report))
}

async fn report(State((store, _)): State<(Store, Config)>) -> Json<FarmReport> {
    Json(store.state().await.report(Utc::now()))
}
