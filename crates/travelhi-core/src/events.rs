//! Scheduled event operations and time windows.
//!
//! An event belongs to a window `[start, end]` when it overlaps it:
//! `starts_at <= end && ends_at >= start`. "By day" and "around a moment"
//! queries are both expressed as windows.

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use travelhi_types::{Event, EventSeverity, EventType, InputError, NewEvent};

use crate::error::CoreError;
use crate::page::Page;
use crate::store::EventStore;

/// Largest page the event listings accept.
pub const MAX_EVENT_LIMIT: u32 = 1000;

/// Default page size for "events on a day".
pub const DEFAULT_DAY_LIMIT: u32 = 500;

/// Default page size for "events around a moment".
pub const DEFAULT_AROUND_LIMIT: u32 = 200;

/// Default half-width of the "around" window.
pub const DEFAULT_THRESHOLD_HOURS: u32 = 3;

/// Largest accepted half-width of the "around" window.
pub const MAX_THRESHOLD_HOURS: u32 = 24;

/// Optional filters applied on top of the time window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EventFilter {
    /// Only events of this type.
    pub event_type: Option<EventType>,
    /// Only events of this severity.
    pub severity: Option<EventSeverity>,
    /// Only verified (or only unverified) events.
    pub is_verified: Option<bool>,
}

impl EventFilter {
    /// Whether an event passes every set filter.
    pub fn matches(&self, event: &Event) -> bool {
        self.event_type.is_none_or(|t| t == event.event_type)
            && self.severity.is_none_or(|s| s == event.severity)
            && self.is_verified.is_none_or(|v| v == event.is_verified)
    }
}

/// A validated time window with filters and a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventWindow {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    /// Filters applied inside the window.
    pub filter: EventFilter,
    /// Offset and limit applied after ordering by start time.
    pub page: Page,
}

impl EventWindow {
    /// Build a window.
    ///
    /// # Errors
    ///
    /// Returns [`InputError::TimeWindow`] if `end` precedes `start`.
    pub fn new(
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        filter: EventFilter,
        page: Page,
    ) -> Result<Self, InputError> {
        if end < start {
            return Err(InputError::TimeWindow);
        }
        Ok(Self {
            start,
            end,
            filter,
            page,
        })
    }

    /// The whole UTC day `[00:00:00, 23:59:59.999999]`.
    ///
    /// # Errors
    ///
    /// Returns [`InputError::TimeWindow`] if the day cannot be represented.
    pub fn day(day: NaiveDate, filter: EventFilter, page: Page) -> Result<Self, InputError> {
        let start = day.and_time(NaiveTime::MIN).and_utc();
        let end = start
            .checked_add_signed(Duration::days(1))
            .and_then(|next| next.checked_sub_signed(Duration::microseconds(1)))
            .ok_or(InputError::TimeWindow)?;
        Self::new(start, end, filter, page)
    }

    /// `[at - hours, at + hours]`.
    ///
    /// # Errors
    ///
    /// Returns [`InputError::TimeWindow`] unless `1 <= hours <= 24`.
    pub fn around(
        at: DateTime<Utc>,
        hours: u32,
        filter: EventFilter,
        page: Page,
    ) -> Result<Self, InputError> {
        if !(1..=MAX_THRESHOLD_HOURS).contains(&hours) {
            return Err(InputError::TimeWindow);
        }
        let delta = Duration::hours(i64::from(hours));
        let start = at.checked_sub_signed(delta).ok_or(InputError::TimeWindow)?;
        let end = at.checked_add_signed(delta).ok_or(InputError::TimeWindow)?;
        Self::new(start, end, filter, page)
    }

    /// Window start (inclusive).
    pub const fn start(&self) -> DateTime<Utc> {
        self.start
    }

    /// Window end (inclusive).
    pub const fn end(&self) -> DateTime<Utc> {
        self.end
    }

    /// Whether an event overlaps the window and passes the filters.
    pub fn contains(&self, event: &Event) -> bool {
        event.starts_at <= self.end && event.ends_at >= self.start && self.filter.matches(event)
    }
}

/// Validate and store a new event.
///
/// # Errors
///
/// Returns [`CoreError::Input`] before any write if the event is invalid.
pub async fn create_event(store: &dyn EventStore, event: NewEvent) -> Result<Event, CoreError> {
    event.check()?;
    let stored = store.insert_event(event).await?;
    tracing::info!(event_id = %stored.id, event_type = stored.event_type.as_str(), "Event created");
    Ok(stored)
}

/// Every stored event ordered by start time.
///
/// # Errors
///
/// Returns [`CoreError::Store`] if the store fails.
pub async fn list_events(store: &dyn EventStore) -> Result<Vec<Event>, CoreError> {
    Ok(store.list_events().await?)
}

/// Events overlapping a window.
///
/// # Errors
///
/// Returns [`CoreError::Store`] if the store fails.
pub async fn events_between(
    store: &dyn EventStore,
    window: &EventWindow,
) -> Result<Vec<Event>, CoreError> {
    Ok(store.list_events_between(window).await?)
}

/// Events overlapping one UTC day.
///
/// # Errors
///
/// Returns [`CoreError::Input`] if the day cannot be represented and
/// [`CoreError::Store`] if the store fails.
pub async fn events_on_day(
    store: &dyn EventStore,
    day: NaiveDate,
    filter: EventFilter,
    page: Page,
) -> Result<Vec<Event>, CoreError> {
    let window = EventWindow::day(day, filter, page)?;
    events_between(store, &window).await
}

/// Events overlapping `[at - hours, at + hours]`.
///
/// # Errors
///
/// Returns [`CoreError::Input`] unless `1 <= hours <= 24`, and
/// [`CoreError::Store`] if the store fails.
pub async fn events_around(
    store: &dyn EventStore,
    at: DateTime<Utc>,
    hours: u32,
    filter: EventFilter,
    page: Page,
) -> Result<Vec<Event>, CoreError> {
    let window = EventWindow::around(at, hours, filter, page)?;
    events_between(store, &window).await
}
