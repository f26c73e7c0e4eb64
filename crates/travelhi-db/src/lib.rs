//! `PostgreSQL` storage for Travel Hi.
//!
//! Implements the [`travelhi_core::ReportStore`] and
//! [`travelhi_core::EventStore`] traits on top of a shared [`sqlx`] pool.
//!
//! ```text
//! HTTP handlers
//!     |
//!     +-- Arc<dyn ReportStore> --+
//!     |                          +--> PgStore --> Database --> PostgreSQL
//!     +-- Arc<dyn EventStore> ---+
//! ```
//!
//! # Modules
//!
//! - [`pool`] -- connection pool, settings, and migrations
//! - [`report_store`] -- the `reports` table
//! - [`event_store`] -- the `events` table
//! - [`error`] -- data layer errors

pub mod error;
pub mod event_store;
pub mod pool;
pub mod report_store;

pub use error::DbError;
pub use event_store::EventRow;
pub use pool::{Database, PoolSettings};
pub use report_store::{PgStore, ReportRow};
