//! Dashboard state container.
//!
//! The state holds exactly two inputs: the latest sensor snapshot and the
//! latest weather reading. Both are replaced whole by [`reduce`], one event at
//! a time; every displayed value is derived from a [`DashboardState`] clone
//! by the selectors in `derivation.rs`, outside the lock.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::derivation;
use crate::models::{
    AlertEntry, FarmReport, SensorRecord, TrendPoint, WeatherReading, ZoneSummary,
};

// ---

/// State change produced by the ingestion adapter.
#[derive(Debug, Clone)]
pub enum StoreEvent {
    /// A fresh snapshot, newest record first.
    SnapshotReplaced {
        records: Vec<SensorRecord>,
        at: DateTime<Utc>,
    },
    /// A fresh weather reading, or `None` when the last poll failed.
    WeatherReplaced {
        reading: Option<WeatherReading>,
        at: DateTime<Utc>,
    },
}

#[derive(Debug, Clone, Default)]
pub struct DashboardState {
    pub snapshot: Arc<Vec<SensorRecord>>,
    pub weather: Option<WeatherReading>,
    pub snapshot_refreshed_at: Option<DateTime<Utc>>,
    pub weather_refreshed_at: Option<DateTime<Utc>>,
}

/// Apply one event. Each event replaces its own input whole and leaves the
/// other untouched.
pub fn reduce(state: &DashboardState, event: StoreEvent) -> DashboardState {
    // ---
    match event {
        StoreEvent::SnapshotReplaced { records, at } => DashboardState {
            snapshot: Arc::new(records),
            snapshot_refreshed_at: Some(at),
            ..state.clone()
        },
        StoreEvent::WeatherReplaced { reading, at } => DashboardState {
            weather: reading,
            weather_refreshed_at: Some(at),
            ..state.clone()
        },
    }
}

impl DashboardState {
    pub fn zones(&self) -> Vec<ZoneSummary> {
        derivation::zone_summaries(&self.snapshot)
    }

    pub fn alerts(&self, now: DateTime<Utc>) -> Vec<AlertEntry> {
        derivation::alerts(&self.snapshot, self.weather.as_ref(), now)
    }

    pub fn trend(&self) -> Vec<TrendPoint> {
        derivation::trend_series(&self.snapshot)
    }

    pub fn report(&self, now: DateTime<Utc>) -> FarmReport {
        derivation::farm_report(&self.snapshot, self.weather.as_ref(), now)
    }
}

/// Shared handle on the dashboard state. Cheap to clone.
#[derive(Clone, Default)]
pub struct Store {
    inner: Arc<RwLock<DashboardState>>,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `event` through the reducer and publish the result.
    pub async fn dispatch(&self, event: StoreEvent) {
        // ---
        let mut guard = self.inner.write().await;
        *guard = reduce(&guard, event);
    }

    /// Copy of the current state. The snapshot itself is shared, not copied.
    pub async fn state(&self) -> DashboardState {
        self.inner.read().await.clone()
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use chrono::TimeZone;

    fn at(minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 9, 6, 12, minute, 0).unwrap()
    }

    fn record(node: &str, temperature: f64) -> SensorRecord {
        // ---
        SensorRecord {
            node_name: Some(node.to_string()),
            timestamp: Some(at(0)),
            greenness: Some(0.9),
            soil_moisture: Some(55.0),
            temperature: Some(temperature),
            humidity: Some(40.0),
            light: Some(300.0),
            npk: Some(25.0),
        }
    }

    fn rain() -> WeatherReading {
        // ---
        WeatherReading {
            temp: 24.0,
            humidity: Some(88.0),
            condition: Some("Rain".to_string()),
            alert: Some("Heavy rain forecast".to_string()),
        }
    }

    #[test]
    fn snapshot_replacement_is_whole() {
        // ---
        let first = reduce(
            &DashboardState::default(),
            StoreEvent::SnapshotReplaced {
                records: vec![record("Node1", 20.0), record("Node2", 21.0)],
                at: at(1),
            },
        );
        let second = reduce(
            &first,
            StoreEvent::SnapshotReplaced {
                records: vec![record("Node3", 22.0)],
                at: at(2),
            },
        );

        assert_eq!(first.snapshot.len(), 2);
        assert_eq!(second.snapshot.len(), 1);
        assert_eq!(second.snapshot[0].node_name.as_deref(), Some("Node3"));
        assert_eq!(second.snapshot_refreshed_at, Some(at(2)));
        assert!(second.weather.is_none());
    }

    #[test]
    fn weather_events_leave_snapshot_alone() {
        // ---
        let with_rows = reduce(
            &DashboardState::default(),
            StoreEvent::SnapshotReplaced {
                records: vec![record("Node1", 20.0)],
                at: at(1),
            },
        );
        let with_weather = reduce(
            &with_rows,
            StoreEvent::WeatherReplaced {
                reading: Some(rain()),
                at: at(2),
            },
        );

        assert!(Arc::ptr_eq(&with_rows.snapshot, &with_weather.snapshot));
        assert_eq!(with_weather.snapshot_refreshed_at, Some(at(1)));
        assert_eq!(with_weather.weather_refreshed_at, Some(at(2)));
    }

    #[test]
    fn weather_alert_clears_with_the_reading() {
        // ---
        let raining = reduce(
            &DashboardState::default(),
            StoreEvent::WeatherReplaced {
                reading: Some(rain()),
                at: at(1),
            },
        );
        assert_eq!(raining.alerts(at(1))[0].id, "weather");

        let unknown = reduce(
            &raining,
            StoreEvent::WeatherReplaced {
                reading: None,
                at: at(2),
            },
        );
        assert!(unknown.alerts(at(2)).is_empty());
    }

    #[test]
    fn persistent_breach_reappears_on_every_snapshot() {
        // ---
        let mut state = DashboardState::default();
        for minute in 1..4 {
            state = reduce(
                &state,
                StoreEvent::SnapshotReplaced {
                    records: vec![record("Node1", 39.0)],
                    at: at(minute),
                },
            );
            let alerts = state.alerts(at(minute));
            assert_eq!(alerts.len(), 1);
            assert_eq!(alerts[0].id, "1");
        }
    }

    #[tokio::test]
    async fn store_dispatch_publishes_state() {
        // ---
        let store = Store::new();
        assert!(store.state().await.snapshot.is_empty());

        store
            .dispatch(StoreEvent::SnapshotReplaced {
                records: vec![record("Node4", 20.0)],
                at: at(5),
            })
            .await;

        let state = store.state().await;
        assert_eq!(state.zones()[0].id, "4");
        assert_eq!(state.trend().len(), 1);
        assert_eq!(state.report(at(5)).zones.len(), 1);
    }
}
