//! Database error type.
//!
//! [`DbError`] wraps the underlying [`sqlx`] errors. Inside the store trait
//! implementations it is flattened into a
//! [`StoreError`](travelhi_core::StoreError) so the services never see a
//! driver type.

use travelhi_core::StoreError;

/// Failures raised by the `PostgreSQL` layer.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// A query or connection failed.
    #[error("query failed: {0}")]
    Postgres(#[from] sqlx::Error),

    /// Applying the embedded migrations failed.
    #[error("migration failed: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A stored row could not be mapped back to a domain value.
    #[error("row does not map to a domain value: {0}")]
    InvalidRow(String),

    /// Pool settings are unusable.
    #[error("bad database settings: {0}")]
    Config(String),
}

impl From<DbError> for StoreError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::InvalidRow(msg) => Self::InvalidRow(msg),
            other => Self::Backend(other.to_string()),
        }
    }
}

/// Shorthand used by the trait implementations.
pub(crate) fn backend(err: sqlx::Error) -> StoreError {
    StoreError::from(DbError::Postgres(err))
}
