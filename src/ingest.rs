//! Ingestion adapter: keeps the store's snapshot and weather reading fresh.
//!
//! Sensor refreshes are requested from two places, the fixed-interval timer
//! and the store's change feed. Both only wake a shared [`Notify`]; a single
//! worker drains it, so refreshes never overlap and a burst of wake-ups that
//! arrives during a refresh collapses into one follow-up refresh.
//!
//! On shutdown every loop stops and in-flight fetches are dropped, so no
//! response can land in the store after teardown.

use std::{sync::Arc, time::Duration};

use chrono::Utc;
use tokio::sync::{watch, Notify};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::sources::{SensorSource, WeatherSource};
use crate::store::{Store, StoreEvent};

// ---

/// Resolve once shutdown has been signalled (or its sender is gone).
pub(crate) async fn shutdown_requested(shutdown: &mut watch::Receiver<bool>) {
    let _ = shutdown.wait_for(|stop| *stop).await;
}

pub struct Ingestor {
    store: Store,
    sensors: Arc<dyn SensorSource>,
    weather: Arc<dyn WeatherSource>,
    snapshot_limit: i64,
}

impl Ingestor {
    pub fn new(
        store: Store,
        sensors: Arc<dyn SensorSource>,
        weather: Arc<dyn WeatherSource>,
        snapshot_limit: i64,
    ) -> Self {
        Self {
            store,
            sensors,
            weather,
            snapshot_limit,
        }
    }

    /// Replace the snapshot with the newest rows. A failed query keeps the
    /// previous snapshot.
    pub async fn refresh_snapshot(&self) {
        // ---
        match self.sensors.fetch_snapshot(self.snapshot_limit).await {
            Ok(records) => {
                debug!("Snapshot refreshed with {} records", records.len());
                self.store
                    .dispatch(StoreEvent::SnapshotReplaced {
                        records,
                        at: Utc::now(),
                    })
                    .await;
            }
            Err(e) => warn!("Sensor refresh failed, keeping previous snapshot: {}", e),
        }
    }

    /// Replace the weather reading. Any failure clears it to unknown.
    pub async fn refresh_weather(&self) {
        // ---
        let reading = match self.weather.current().await {
            Ok(reading) => {
                debug!(
                    "Weather refreshed: {}°C, condition {:?}, alert {:?}",
                    reading.temp, reading.condition, reading.alert
                );
                Some(reading)
            }
            Err(e) => {
                warn!("Weather refresh failed, clearing reading: {}", e);
                None
            }
        };

        self.store
            .dispatch(StoreEvent::WeatherReplaced {
                reading,
                at: Utc::now(),
            })
            .await;
    }

    /// Spawn the sensor timer, the sensor refresh worker and the weather
    /// worker. The change feed wakes the same `trigger` from outside.
    pub fn spawn(
        self,
        trigger: Arc<Notify>,
        sensor_poll: Duration,
        weather_poll: Duration,
        shutdown: watch::Receiver<bool>,
    ) -> Vec<JoinHandle<()>> {
        // ---
        let this = Arc::new(self);

        vec![
            tokio::spawn(run_poll_timer(
                sensor_poll,
                trigger.clone(),
                shutdown.clone(),
            )),
            tokio::spawn(run_sensor_worker(this.clone(), trigger, shutdown.clone())),
            tokio::spawn(run_weather_worker(this, weather_poll, shutdown)),
        ]
    }
}

/// Wake `trigger` every `period`, starting immediately.
async fn run_poll_timer(
    period: Duration,
    trigger: Arc<Notify>,
    mut shutdown: watch::Receiver<bool>,
) {
    // ---
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => trigger.notify_one(),
            _ = shutdown_requested(&mut shutdown) => break,
        }
    }
    debug!("Sensor poll timer stopped");
}

async fn run_sensor_worker(
    ingestor: Arc<Ingestor>,
    trigger: Arc<Notify>,
    mut shutdown: watch::Receiver<bool>,
) {
    // ---
    info!("Sensor refresh worker started");
    loop {
        tokio::select! {
            _ = trigger.notified() => {}
            _ = shutdown_requested(&mut shutdown) => break,
        }
        tokio::select! {
            _ = ingestor.refresh_snapshot() => {}
            _ = shutdown_requested(&mut shutdown) => break,
        }
    }
    info!("Sensor refresh worker stopped");
}

async fn run_weather_worker(
    ingestor: Arc<Ingestor>,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    // ---
    info!("Weather worker started, polling every {}s", period.as_secs());
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = shutdown_requested(&mut shutdown) => break,
        }
        tokio::select! {
            _ = ingestor.refresh_weather() => {}
            _ = shutdown_requested(&mut shutdown) => break,
        }
    }
    info!("Weather worker stopped");
}
