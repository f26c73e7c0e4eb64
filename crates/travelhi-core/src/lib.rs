//! Storage contracts and domain services for the Travel Hi backend.
//!
//! Handlers never talk to a database directly. They call the services in
//! this crate, which validate input first and then go through the
//! [`ReportStore`] and [`EventStore`] traits. Two implementations exist:
//! [`InMemoryStore`] here, and the `PostgreSQL` store in `travelhi-db`.
//!
//! # Architecture
//!
//! ```text
//! HTTP handler
//!     |
//!     +-- reports::create_report / get_report / list_reports / react
//!     +-- query::query_nearby (haversine filter over list_all)
//!     +-- events::create_event / events_on_day / events_around
//!             |
//!             +--> dyn ReportStore / dyn EventStore
//! ```
//!
//! # Modules
//!
//! - [`store`] -- Async storage traits
//! - [`memory`] -- In-memory store for tests and local development
//! - [`page`] -- Pagination window and paginated result
//! - [`query`] -- Proximity report query engine
//! - [`reports`] -- Report create/read/react operations
//! - [`events`] -- Scheduled event operations and time windows
//! - [`error`] -- Shared error types

pub mod error;
pub mod events;
pub mod memory;
pub mod page;
pub mod query;
pub mod reports;
pub mod store;

// Re-export primary types for convenience.
pub use error::{CoreError, StoreError};
pub use events::{EventFilter, EventWindow, events_around, events_on_day};
pub use memory::InMemoryStore;
pub use page::{Page, Paginated, DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT};
pub use query::{haversine_km, query_nearby, NearbyQuery, EARTH_RADIUS_KM};
pub use store::{EventStore, ReportStore};
