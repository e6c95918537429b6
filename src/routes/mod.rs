use axum::Router;

use crate::{Config, Store};

mod dashboard;
mod health;
mod overlays;
mod readings;
mod report;
mod zones;

// ---

pub fn router(store: Store, config: Config) -> Router {
    // ---
    Router::new()
        .merge(dashboard::router())
        .merge(zones::router())
        .merge(readings::router())
        .merge(report::router())
        .merge(overlays::router())
        .merge(health::router())
        .with_state((store, config))
}
