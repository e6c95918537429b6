//! Sensor store access: snapshot queries and the `LISTEN` change feed.

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use sqlx::postgres::PgListener;
use sqlx::PgPool;
use tokio::sync::{watch, Notify};
use tracing::{debug, info, warn};

use super::SensorSource;
use crate::error::IngestError;
use crate::ingest::shutdown_requested;
use crate::models::SensorRecord;

/// Delay before re-opening a failed change listener.
const LISTENER_RETRY: Duration = Duration::from_secs(5);

// ---

/// Reads the newest rows of the sensor table.
///
/// Numeric columns are cast to `float8` and the timestamp to `timestamptz`, so
/// stores declaring `real`, `numeric` or a zone-less timestamp decode the same.
#[derive(Clone)]
pub struct PgSensorSource {
    pool: PgPool,
    query: String,
}

impl PgSensorSource {
    /// `table` must already be validated as a plain identifier.
    pub fn new(pool: PgPool, table: &str) -> Self {
        // ---
        let query = format!(
            r#"
            SELECT
                node_name::text          AS node_name,
                "timestamp"::timestamptz AS "timestamp",
                greenness::float8        AS greenness,
                soil_moisture::float8    AS soil_moisture,
                temperature::float8      AS temperature,
                humidity::float8         AS humidity,
                light::float8            AS light,
                npk::float8              AS npk
            FROM {table}
            ORDER BY "timestamp" DESC
            LIMIT $1
            "#
        );
        Self { pool, query }
    }
}

#[async_trait]
impl SensorSource for PgSensorSource {
    async fn fetch_snapshot(&self, limit: i64) -> Result<Vec<SensorRecord>, IngestError> {
        // ---
        let rows = sqlx::query_as::<_, SensorRecord>(&self.query)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        debug!("Fetched {} sensor rows", rows.len());
        Ok(rows)
    }
}

/// Wake `trigger` on every notification on `channel` until shutdown.
///
/// Payloads are ignored: any insert, update or delete on the sensor table
/// means "refresh". A dropped listener is re-opened after [`LISTENER_RETRY`];
/// the fixed-interval poll keeps the snapshot fresh in the meantime.
pub async fn listen_for_changes(
    pool: PgPool,
    channel: String,
    trigger: Arc<Notify>,
    mut shutdown: watch::Receiver<bool>,
) {
    // ---
    loop {
        let opened = tokio::select! {
            res = open_listener(&pool, &channel) => Some(res),
            _ = shutdown_requested(&mut shutdown) => None,
        };

        match opened {
            None => break,
            Some(Ok(mut listener)) => {
                info!("Listening for sensor table changes on '{}'", channel);
                if !forward_notifications(&mut listener, &channel, &trigger, &mut shutdown).await {
                    break;
                }
            }
            Some(Err(e)) => warn!("Change feed on '{}' unavailable: {}", channel, e),
        }

        let stopped = tokio::select! {
            _ = tokio::time::sleep(LISTENER_RETRY) => false,
            _ = shutdown_requested(&mut shutdown) => true,
        };
        if stopped {
            break;
        }
    }

    info!("Change feed stopped");
}

/// Returns `true` when the listener dropped and should be re-opened, `false`
/// on shutdown.
async fn forward_notifications(
    listener: &mut PgListener,
    channel: &str,
    trigger: &Notify,
    shutdown: &mut watch::Receiver<bool>,
) -> bool {
    // ---
    loop {
        tokio::select! {
            res = listener.recv() => match res {
                Ok(notification) => {
                    debug!(
                        "Change notification on '{}': {}",
                        notification.channel(),
                        notification.payload()
                    );
                    trigger.notify_one();
                }
                Err(e) => {
                    warn!("Change feed on '{}' dropped: {}", channel, e);
                    return true;
                }
            },
            _ = shutdown_requested(shutdown) => return false,
        }
    }
}

async fn open_listener(pool: &PgPool, channel: &str) -> Result<PgListener, sqlx::Error> {
    // ---
    let mut listener = PgListener::connect_with(pool).await?;
    listener.listen(channel).await?;
    Ok(listener)
}
