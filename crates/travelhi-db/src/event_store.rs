//! The `events` table.
//!
//! Window queries are pushed down to `PostgreSQL`: overlap, optional
//! filters, ordering, and paging all happen in one statement.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use travelhi_core::{EventStore, EventWindow, StoreError};
use travelhi_types::{Event, EventId, EventSeverity, EventType, NewEvent};

use crate::error::{DbError, backend};
use crate::report_store::PgStore;

/// Columns selected for every event query, in [`EventRow`] order.
const EVENT_COLUMNS: &str = "id, name, description, event_type, severity, starts_at, ends_at, \
                             latitude, longitude, radius_m, location_name, source, carrier, \
                             affected_lines, is_verified, created_at, updated_at";

/// A row from the `events` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct EventRow {
    /// Auto-incremented event ID.
    pub id: i64,
    /// Display name.
    pub name: String,
    /// Optional free text.
    pub description: Option<String>,
    /// Upper-case event type name.
    pub event_type: String,
    /// Severity, 1 to 3.
    pub severity: i16,
    /// Start of the event.
    pub starts_at: DateTime<Utc>,
    /// End of the event.
    pub ends_at: DateTime<Utc>,
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
    /// Affected radius in metres.
    pub radius_m: i32,
    /// Human-readable place.
    pub location_name: Option<String>,
    /// Where the event came from.
    pub source: Option<String>,
    /// Affected transit carrier.
    pub carrier: Option<String>,
    /// Affected transit lines.
    pub affected_lines: Option<String>,
    /// Whether a moderator verified the event.
    pub is_verified: bool,
    /// Insert timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<EventRow> for Event {
    type Error = DbError;

    fn try_from(row: EventRow) -> Result<Self, Self::Error> {
        let id = row.id;
        let invalid = |what: String| DbError::InvalidRow(format!("event {id}: {what}"));

        let event_type: EventType = row.event_type.parse().map_err(|e| invalid(format!("{e}")))?;
        let severity = u8::try_from(row.severity)
            .map_err(|e| invalid(format!("severity: {e}")))
            .and_then(|raw| EventSeverity::try_from(raw).map_err(|e| invalid(format!("{e}"))))?;
        let radius_m = u32::try_from(row.radius_m).map_err(|e| invalid(format!("radius: {e}")))?;

        Ok(Self {
            id: EventId(id),
            name: row.name,
            description: row.description,
            event_type,
            severity,
            starts_at: row.starts_at,
            ends_at: row.ends_at,
            lat: row.latitude,
            lng: row.longitude,
            radius_m,
            location_name: row.location_name,
            source: row.source,
            carrier: row.carrier,
            affected_lines: row.affected_lines,
            is_verified: row.is_verified,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn to_events(rows: Vec<EventRow>) -> Result<Vec<Event>, StoreError> {
    rows.into_iter()
        .map(|row| Event::try_from(row).map_err(StoreError::from))
        .collect()
}

#[async_trait]
impl EventStore for PgStore {
    async fn insert_event(&self, event: NewEvent) -> Result<Event, StoreError> {
        let sql = format!(
            "INSERT INTO events (name, description, event_type, severity, starts_at, ends_at, \
             latitude, longitude, radius_m, location_name, source, carrier, affected_lines, is_verified) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14) \
             RETURNING {EVENT_COLUMNS}"
        );
        let radius_m = i32::try_from(event.radius_m)
            .map_err(|e| StoreError::Backend(format!("radius_m {} does not fit: {e}", event.radius_m)))?;
        let row = sqlx::query_as::<_, EventRow>(&sql)
            .bind(&event.name)
            .bind(event.description.as_deref())
            .bind(event.event_type.as_str())
            .bind(i16::from(u8::from(event.severity)))
            .bind(event.starts_at)
            .bind(event.ends_at)
            .bind(event.lat)
            .bind(event.lng)
            .bind(radius_m)
            .bind(event.location_name.as_deref())
            .bind(event.source.as_deref())
            .bind(event.carrier.as_deref())
            .bind(event.affected_lines.as_deref())
            .bind(event.is_verified)
            .fetch_one(self.pool())
            .await
            .map_err(backend)?;

        Ok(Event::try_from(row)?)
    }

    async fn list_events(&self) -> Result<Vec<Event>, StoreError> {
        let sql = format!("SELECT {EVENT_COLUMNS} FROM events ORDER BY starts_at ASC, id ASC");
        let rows = sqlx::query_as::<_, EventRow>(&sql)
            .fetch_all(self.pool())
            .await
            .map_err(backend)?;

        to_events(rows)
    }

    async fn list_events_between(&self, window: &EventWindow) -> Result<Vec<Event>, StoreError> {
        let sql = format!(
            "SELECT {EVENT_COLUMNS} FROM events \
             WHERE starts_at <= $2 AND ends_at >= $1 \
               AND ($3::TEXT IS NULL OR event_type = $3) \
               AND ($4::SMALLINT IS NULL OR severity = $4) \
               AND ($5::BOOLEAN IS NULL OR is_verified = $5) \
             ORDER BY starts_at ASC, id ASC \
             OFFSET $6 LIMIT $7"
        );
        let filter = window.filter;
        let offset = i64::try_from(window.page.skip()).unwrap_or(i64::MAX);

        let rows = sqlx::query_as::<_, EventRow>(&sql)
            .bind(window.start())
            .bind(window.end())
            .bind(filter.event_type.map(EventType::as_str))
            .bind(filter.severity.map(|s| i16::from(u8::from(s))))
            .bind(filter.is_verified)
            .bind(offset)
            .bind(i64::from(window.page.limit()))
            .fetch_all(self.pool())
            .await
            .map_err(backend)?;

        tracing::debug!(
            start = %window.start(),
            end = %window.end(),
            returned = rows.len(),
            "Event window query"
        );

        to_events(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(event_type: &str, severity: i16) -> EventRow {
        let now = Utc::now();
        EventRow {
            id: 3,
            name: String::from("Derby"),
            description: None,
            event_type: event_type.to_owned(),
            severity,
            starts_at: now,
            ends_at: now + chrono::Duration::hours(2),
            latitude: 52.23,
            longitude: 21.01,
            radius_m: 300,
            location_name: Some(String::from("Stadium")),
            source: None,
            carrier: None,
            affected_lines: None,
            is_verified: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn row_maps_to_event() {
        let event = Event::try_from(row("SPORT", 3));
        assert!(event.is_ok_and(|e| {
            e.event_type == EventType::Sport && e.severity == EventSeverity::High && e.radius_m == 300
        }));
    }

    #[test]
    fn out_of_range_severity_is_invalid_row() {
        assert!(matches!(Event::try_from(row("SPORT", 9)), Err(DbError::InvalidRow(_))));
        assert!(matches!(Event::try_from(row("SPORT", -1)), Err(DbError::InvalidRow(_))));
    }

    #[test]
    fn unknown_type_is_invalid_row() {
        assert!(matches!(Event::try_from(row("PARADE", 2)), Err(DbError::InvalidRow(_))));
    }
}
