//! Raster overlay catalogue.
//!
//! The overlays are pre-rendered images served as-is by whatever hosts the
//! dashboard; this endpoint only tells clients where they live and which
//! ground area they cover.

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

use crate::{Config, Store};

/// `(key, label, file)` for every overlay, in display order.
const OVERLAYS: [(&str, &str, &str); 4] = [
    ("greenness", "Vegetation index", "tanjavur_2023-01-05_NDVI.png"),
    ("coverage", "True colour composite", "tanjavur_2023-01-05_EnhancedTrueColor.png"),
    ("moisture", "Water index", "tanjavur_2023-01-05_NDWI.png"),
    ("pest_risk", "Pest risk", "pest_img.png"),
];

/// South-west and north-east corners, `[lat, lon]`.
const MAP_BOUNDS: [[f64; 2]; 2] = [[10.57, 79.0], [10.617, 79.047]];

#[derive(Debug, Serialize)]
struct Overlay {
    key: &'static str,
    label: &'static str,
    url: String,
}

#[derive(Debug, Serialize)]
struct OverlayCatalogue {
    bounds: [[f64; 2]; 2],
    overlays: Vec<Overlay>,
}

pub fn router() -> Router<(Store, Config)> {
    Router::new().route("/api/overlays", get(catalogue))
}

fn join_url(base: &str, file: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), file)
}

async fn catalogue(State((_, config)): State<(Store, Config)>) -> Json<OverlayCatalogue> {
    // ---
    let overlays = OVERLAYS
        .iter()
        .map(|&(key, label, file)| Overlay {
            key,
            label,
            url: join_url(&config.asset_base_url, file),
        })
        .collect();

    Json(OverlayCatalogue {
        bounds: MAP_BOUNDS,
        overlays,
    })
}
