//! Async storage traits.
//!
//! The services in this crate depend only on these traits. Implementations
//! must be `Send + Sync` so they can live behind an `Arc<dyn ...>` in the
//! HTTP server state. No implementation may hold a lock across a network or
//! disk call that other requests need.

use async_trait::async_trait;
use travelhi_types::{Event, NewEvent, NewReport, ReactionCounter, Report, ReportId};

use crate::error::StoreError;
use crate::events::EventWindow;
use crate::page::Page;

/// Persistence for incident reports.
#[async_trait]
pub trait ReportStore: Send + Sync {
    /// Insert a validated report. The store assigns the id, the creation
    /// timestamp, and zeroed reaction counters.
    async fn insert(&self, report: NewReport) -> Result<Report, StoreError>;

    /// Fetch one report, or `None` if the id is unknown.
    async fn get(&self, id: ReportId) -> Result<Option<Report>, StoreError>;

    /// Every stored report, in no particular order.
    async fn list_all(&self) -> Result<Vec<Report>, StoreError>;

    /// One page of reports, newest first (ties broken by id, descending),
    /// plus the total number of stored reports.
    async fn list_page(&self, page: Page) -> Result<(Vec<Report>, u64), StoreError>;

    /// Atomically add one to a reaction counter and return the updated
    /// report, or `None` if the id is unknown.
    async fn increment(
        &self,
        id: ReportId,
        counter: ReactionCounter,
    ) -> Result<Option<Report>, StoreError>;
}

/// Persistence for scheduled events.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Insert a validated event.
    async fn insert_event(&self, event: NewEvent) -> Result<Event, StoreError>;

    /// Every stored event, ordered by start time.
    async fn list_events(&self) -> Result<Vec<Event>, StoreError>;

    /// Events overlapping the window and matching its filters, ordered by
    /// start time, with the window's page applied.
    async fn list_events_between(&self, window: &EventWindow) -> Result<Vec<Event>, StoreError>;
}
