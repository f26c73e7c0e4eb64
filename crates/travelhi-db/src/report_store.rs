//! The `reports` table.
//!
//! Reaction counters are bumped with a single `UPDATE ... RETURNING`, so
//! concurrent reactions on the same report never lose an increment.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use travelhi_core::{Page, ReportStore, StoreError};
use travelhi_types::{Coordinates, NewReport, ReactionCounter, Report, ReportCategory, ReportId};

use crate::error::{DbError, backend};
use crate::pool::Database;

/// Columns selected for every report query, in [`ReportRow`] order.
const REPORT_COLUMNS: &str = "id, category, latitude, longitude, name, description, photo_path, \
                              likes, confirmations, denials, created_at";

/// Store implementing both [`ReportStore`] and
/// [`EventStore`](travelhi_core::EventStore) against `PostgreSQL`.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Bind a store to an open pool.
    pub fn new(db: &Database) -> Self {
        Self { pool: db.pg() }
    }

    pub(crate) const fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// A row from the `reports` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ReportRow {
    /// Auto-incremented report ID.
    pub id: i64,
    /// Category name, constrained by a `CHECK`.
    pub category: String,
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
    /// Optional short title.
    pub name: Option<String>,
    /// Optional free text.
    pub description: Option<String>,
    /// Stored photo file name, if any.
    pub photo_path: Option<String>,
    /// Like counter.
    pub likes: i32,
    /// Confirmation counter.
    pub confirmations: i32,
    /// Denial counter.
    pub denials: i32,
    /// Insert timestamp.
    pub created_at: DateTime<Utc>,
}

impl TryFrom<ReportRow> for Report {
    type Error = DbError;

    fn try_from(row: ReportRow) -> Result<Self, Self::Error> {
        let category: ReportCategory = row
            .category
            .parse()
            .map_err(|e| DbError::InvalidRow(format!("report {}: {e}", row.id)))?;
        let counter = |value: i32, name: &str| {
            u32::try_from(value)
                .map_err(|e| DbError::InvalidRow(format!("report {}: {name}: {e}", row.id)))
        };

        Ok(Self {
            id: ReportId(row.id),
            category,
            location: Coordinates {
                lat: row.latitude,
                lng: row.longitude,
            },
            likes: counter(row.likes, "likes")?,
            confirmations: counter(row.confirmations, "confirmations")?,
            denials: counter(row.denials, "denials")?,
            name: row.name,
            description: row.description,
            photo: row.photo_path,
            created_at: row.created_at,
        })
    }
}

fn to_reports(rows: Vec<ReportRow>) -> Result<Vec<Report>, StoreError> {
    rows.into_iter()
        .map(|row| Report::try_from(row).map_err(StoreError::from))
        .collect()
}

/// `UPDATE` statement for one counter. The column name comes from a closed
/// set, never from request input.
fn increment_sql(counter: ReactionCounter) -> String {
    let column = counter.column();
    format!("UPDATE reports SET {column} = {column} + 1 WHERE id = $1 RETURNING {REPORT_COLUMNS}")
}

#[async_trait]
impl ReportStore for PgStore {
    async fn insert(&self, report: NewReport) -> Result<Report, StoreError> {
        let sql = format!(
            "INSERT INTO reports (category, latitude, longitude, name, description, photo_path) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING {REPORT_COLUMNS}"
        );
        let row = sqlx::query_as::<_, ReportRow>(&sql)
            .bind(report.category.as_str())
            .bind(report.location.lat)
            .bind(report.location.lng)
            .bind(report.name.as_deref())
            .bind(report.description.as_deref())
            .bind(report.photo.as_deref())
            .fetch_one(&self.pool)
            .await
            .map_err(backend)?;

        Ok(Report::try_from(row)?)
    }

    async fn get(&self, id: ReportId) -> Result<Option<Report>, StoreError> {
        let sql = format!("SELECT {REPORT_COLUMNS} FROM reports WHERE id = $1");
        let row = sqlx::query_as::<_, ReportRow>(&sql)
            .bind(id.into_inner())
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)?;

        row.map(Report::try_from).transpose().map_err(StoreError::from)
    }

    async fn list_all(&self) -> Result<Vec<Report>, StoreError> {
        let sql = format!("SELECT {REPORT_COLUMNS} FROM reports");
        let rows = sqlx::query_as::<_, ReportRow>(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(backend)?;

        to_reports(rows)
    }

    async fn list_page(&self, page: Page) -> Result<(Vec<Report>, u64), StoreError> {
        let sql = format!(
            "SELECT {REPORT_COLUMNS} FROM reports \
             ORDER BY created_at DESC, id DESC OFFSET $1 LIMIT $2"
        );
        let offset = i64::try_from(page.skip()).unwrap_or(i64::MAX);
        let rows = sqlx::query_as::<_, ReportRow>(&sql)
            .bind(offset)
            .bind(i64::from(page.limit()))
            .fetch_all(&self.pool)
            .await
            .map_err(backend)?;

        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM reports")
            .fetch_one(&self.pool)
            .await
            .map_err(backend)?;

        Ok((to_reports(rows)?, u64::try_from(total).unwrap_or(0)))
    }

    async fn increment(
        &self,
        id: ReportId,
        counter: ReactionCounter,
    ) -> Result<Option<Report>, StoreError> {
        let row = sqlx::query_as::<_, ReportRow>(&increment_sql(counter))
            .bind(id.into_inner())
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)?;

        row.map(Report::try_from).transpose().map_err(StoreError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(category: &str, likes: i32) -> ReportRow {
        ReportRow {
            id: 7,
            category: category.to_owned(),
            latitude: 52.23,
            longitude: 21.01,
            name: Some(String::from("Crash")),
            description: None,
            photo_path: Some(String::from("abc.jpg")),
            likes,
            confirmations: 1,
            denials: 0,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn row_maps_to_report() {
        let report = Report::try_from(row("traffic_jam", 4));
        assert!(report.is_ok_and(|r| {
            r.id == ReportId(7)
                && r.category == ReportCategory::TrafficJam
                && r.likes == 4
                && r.photo.as_deref() == Some("abc.jpg")
        }));
    }

    #[test]
    fn unknown_category_is_invalid_row() {
        assert!(matches!(
            Report::try_from(row("meteor", 0)),
            Err(DbError::InvalidRow(_))
        ));
    }

    #[test]
    fn negative_counter_is_invalid_row() {
        assert!(matches!(
            Report::try_from(row("police", -1)),
            Err(DbError::InvalidRow(_))
        ));
    }

    #[test]
    fn increment_targets_only_the_named_column() {
        let sql = increment_sql(ReactionCounter::Denials);
        assert!(sql.starts_with("UPDATE reports SET denials = denials + 1 WHERE id = $1"));
        assert!(!sql.contains("likes = likes"));
    }
}
