use axum::{
    extract::Query, extract::State, http::StatusCode, response::IntoResponse, routing::get, Json,
    Router,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{debug, info};

use crate::models::SensorRecord;
use crate::{Config, Store};

// ---

pub fn router() -> Router<(Store, Config)> {
    // ---
    Router::new().route("/api/readings", get(handler))
}

async fn handler(
    Query(params): Query<ReadingsQuery>,
    State((store, _)): State<(Store, Config)>,
) -> impl IntoResponse {
    // ---
    debug!("GET /api/readings - {:?}", params);

    let range = match params.timestamp_range.as_deref().map(parse_range).transpose() {
        Ok(range) => range,
        Err(msg) => {
            info!("Rejected readings query: {}", msg);
            return (StatusCode::BAD_REQUEST, Json(msg)).into_response();
        }
    };

    let state = store.state().await;
    let filtered = apply_filters(&state.snapshot, &params, range);
    debug!("GET /api/readings - returning {} rows", filtered.len());
    (StatusCode::OK, Json(filtered)).into_response()
}

/// Query parameters for filtering the current snapshot
#[derive(Debug, Default, Deserialize)]
pub struct ReadingsQuery {
    node_name: Option<String>,
    /// Timestamp range filter (e.g., "2025-09-06T00:00:00Z,2025-09-07T00:00:00Z")
    timestamp_range: Option<String>,
    limit: Option<u32>,
}

type TimeRange = (DateTime<Utc>, DateTime<Utc>);

/// Parse an inclusive `"start,end"` RFC 3339 range.
fn parse_range(raw: &str) -> Result<TimeRange, String> {
    // ---
    let (start, end) = raw
        .split_once(',')
        .ok_or_else(|| format!("timestamp_range '{}' must be 'start,end'", raw))?;

    let parse = |s: &str| {
        DateTime::parse_from_rfc3339(s.trim())
            .map(|t| t.with_timezone(&Utc))
            .map_err(|e| format!("invalid timestamp '{}': {}", s.trim(), e))
    };
    let (start, end) = (parse(start)?, parse(end)?);

    if start > end {
        return Err(format!("timestamp_range starts after it ends: '{}'", raw));
    }
    Ok((start, end))
}

/// Apply query filters to the snapshot, newest first as stored.
///
/// Rows without a timestamp never match a time range.
fn apply_filters(
    records: &[SensorRecord],
    params: &ReadingsQuery,
    range: Option<TimeRange>,
) -> Vec<SensorRecord> {
    // ---
    records
        .iter()
        .filter(|r| {
            params
                .node_name
                .as_ref()
                .map_or(true, |name| r.node_name.as_ref() == Some(name))
        })
        .filter(|r| {
            range.map_or(true, |(start, end)| {
                r.timestamp.is_some_and(|t| start <= t && t <= end)
            })
        })
        .take(params.limit.unwrap_or(1000) as usize)
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use chrono::TimeZone;

    fn record(node: &str, hour: u32) -> SensorRecord {
        // ---
        SensorRecord {
            node_name: Some(node.to_string()),
            timestamp: Some(Utc.with_ymd_and_hms(2025, 9, 6, hour, 0, 0).unwrap()),
            greenness: Some(0.8),
            soil_moisture: Some(40.0),
            temperature: Some(24.0),
            humidity: Some(50.0),
            light: Some(400.0),
            npk: Some(30.0),
        }
    }

    fn snapshot() -> Vec<SensorRecord> {
        vec![
            record("Node1", 12),
            record("Node2", 11),
            record("Node1", 10),
            record("Node2", 9),
        ]
    }

    #[test]
    fn filters_by_node_and_limit() {
        // ---
        let params = ReadingsQuery {
            node_name: Some("Node1".to_string()),
            limit: Some(1),
            ..Default::default()
        };

        let rows = apply_filters(&snapshot(), &params, None);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].timestamp.unwrap().format("%H").to_string(), "12");
    }

    #[test]
    fn filters_by_inclusive_range() {
        // ---
        let range = parse_range("2025-09-06T10:00:00Z, 2025-09-06T11:00:00Z").unwrap();
        let rows = apply_filters(&snapshot(), &ReadingsQuery::default(), Some(range));

        let nodes: Vec<&str> = rows
            .iter()
            .filter_map(|r| r.node_name.as_deref())
            .collect();
        assert_eq!(nodes, vec!["Node2", "Node1"]);
    }

    #[test]
    fn rejects_malformed_ranges() {
        // ---
        assert!(parse_range("2025-09-06T10:00:00Z").is_err());
        assert!(parse_range("yesterday,today").is_err());
        assert!(parse_range("2025-09-06T12:00:00Z,2025-09-06T10:00:00Z").is_err());
        assert!(parse_range("2025-09-06T10:00:00+05:30,2025-09-06T10:00:00Z").is_ok());
    }

    #[test]
    fn untimed_rows_never_match_a_range() {
        // ---
        let mut untimed = record("Node3", 10);
        untimed.timestamp = None;
        let range = parse_range("2025-09-06T00:00:00Z,2025-09-07T00:00:00Z").unwrap();

        assert!(apply_filters(&[untimed.clone()], &ReadingsQuery::default(), Some(range)).is_empty());
        assert_eq!(
            apply_filters(&[untimed], &ReadingsQuery::default(), None).len(),
            1
        );
    }
}
