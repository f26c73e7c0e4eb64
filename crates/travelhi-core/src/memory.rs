//! In-memory store.
//!
//! Backs the integration tests and `storage.backend: memory` for local
//! development. Reports and events live in ordered maps guarded by
//! [`RwLock`]s; ids are assigned as one past the current maximum.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use travelhi_types::{Event, EventId, NewEvent, NewReport, ReactionCounter, Report, ReportId};

use crate::error::StoreError;
use crate::events::EventWindow;
use crate::page::Page;
use crate::query::newest_first;
use crate::store::{EventStore, ReportStore};

/// Volatile store implementing both [`ReportStore`] and [`EventStore`].
#[derive(Debug, Default)]
pub struct InMemoryStore {
    reports: RwLock<BTreeMap<ReportId, Report>>,
    events: RwLock<BTreeMap<EventId, Event>>,
}

impl InMemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored reports.
    pub async fn report_count(&self) -> usize {
        self.reports.read().await.len()
    }
}

#[async_trait]
impl ReportStore for InMemoryStore {
    async fn insert(&self, report: NewReport) -> Result<Report, StoreError> {
        let mut reports = self.reports.write().await;

        let id = reports
            .keys()
            .next_back()
            .map_or(ReportId(1), |last| ReportId(last.0.saturating_add(1)));

        // Keep creation times monotonic even if the wall clock steps back.
        let now = Utc::now();
        let created_at = reports
            .values()
            .next_back()
            .map_or(now, |last| last.created_at.max(now));

        let stored = Report {
            id,
            category: report.category,
            location: report.location,
            name: report.name,
            description: report.description,
            photo: report.photo,
            likes: 0,
            confirmations: 0,
            denials: 0,
            created_at,
        };
        reports.insert(id, stored.clone());
        Ok(stored)
    }

    async fn get(&self, id: ReportId) -> Result<Option<Report>, StoreError> {
        Ok(self.reports.read().await.get(&id).cloned())
    }

    async fn list_all(&self) -> Result<Vec<Report>, StoreError> {
        Ok(self.reports.read().await.values().cloned().collect())
    }

    async fn list_page(&self, page: Page) -> Result<(Vec<Report>, u64), StoreError> {
        let mut all: Vec<Report> = self.reports.read().await.values().cloned().collect();
        let total = u64::try_from(all.len()).unwrap_or(u64::MAX);
        all.sort_by(newest_first);
        Ok((page.apply(all), total))
    }

    async fn increment(
        &self,
        id: ReportId,
        counter: ReactionCounter,
    ) -> Result<Option<Report>, StoreError> {
        let mut reports = self.reports.write().await;
        let Some(report) = reports.get_mut(&id) else {
            return Ok(None);
        };
        let field = match counter {
            ReactionCounter::Likes => &mut report.likes,
            ReactionCounter::Confirmations => &mut report.confirmations,
            ReactionCounter::Denials => &mut report.denials,
        };
        *field = field.saturating_add(1);
        Ok(Some(report.clone()))
    }
}

#[async_trait]
impl EventStore for InMemoryStore {
    async fn insert_event(&self, event: NewEvent) -> Result<Event, StoreError> {
        let mut events = self.events.write().await;
        let id = events
            .keys()
            .next_back()
            .map_or(EventId(1), |last| EventId(last.0.saturating_add(1)));
        let now = Utc::now();

        let stored = Event {
            id,
            name: event.name,
            description: event.description,
            event_type: event.event_type,
            severity: event.severity,
            starts_at: event.starts_at,
            ends_at: event.ends_at,
            lat: event.lat,
            lng: event.lng,
            radius_m: event.radius_m,
            location_name: event.location_name,
            source: event.source,
            carrier: event.carrier,
            affected_lines: event.affected_lines,
            is_verified: event.is_verified,
            created_at: now,
            updated_at: now,
        };
        events.insert(id, stored.clone());
        Ok(stored)
    }

    async fn list_events(&self) -> Result<Vec<Event>, StoreError> {
        let mut all: Vec<Event> = self.events.read().await.values().cloned().collect();
        all.sort_by(|a, b| a.starts_at.cmp(&b.starts_at).then_with(|| a.id.cmp(&b.id)));
        Ok(all)
    }

    async fn list_events_between(&self, window: &EventWindow) -> Result<Vec<Event>, StoreError> {
        let mut matching: Vec<Event> = self
            .events
            .read()
            .await
            .values()
            .filter(|e| window.contains(e))
            .cloned()
            .collect();
        matching.sort_by(|a, b| a.starts_at.cmp(&b.starts_at).then_with(|| a.id.cmp(&b.id)));
        Ok(window.page.apply(matching))
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use travelhi_types::{Coordinates, EventSeverity, EventType, ReportCategory};

    use super::*;
    use crate::error::CoreError;
    use crate::events::{create_event, events_between, events_on_day, EventFilter};
    use crate::query::{query_nearby, NearbyQuery};
    use crate::reports::{create_report, get_report, list_reports, react};

    fn new_report(lat: f64, lng: f64) -> NewReport {
        NewReport {
            category: ReportCategory::Roadwork,
            location: Coordinates { lat, lng },
            name: Some(String::from("Lane closed")),
            description: None,
            photo: None,
        }
    }

    #[tokio::test]
    async fn inserted_reports_start_with_zero_counters() {
        let store = InMemoryStore::new();
        let report = store.insert(new_report(52.23, 21.01)).await;

        assert!(report.is_ok_and(|r| r.likes == 0 && r.confirmations == 0 && r.denials == 0));
    }

    #[tokio::test]
    async fn ids_are_unique_and_increasing() {
        let store = InMemoryStore::new();
        let a = store.insert(new_report(0.0, 0.0)).await.map(|r| r.id).ok();
        let b = store.insert(new_report(0.0, 0.0)).await.map(|r| r.id).ok();
        assert!(a < b);
    }

    #[tokio::test]
    async fn two_likes_add_exactly_two() {
        let store = InMemoryStore::new();
        let Ok(report) = create_report(&store, new_report(52.23, 21.01)).await else {
            panic!("create failed");
        };

        let _ = react(&store, report.id, ReactionCounter::Likes).await;
        let after = react(&store, report.id, ReactionCounter::Likes).await;

        assert!(after.is_ok_and(|r| r.likes == 2 && r.confirmations == 0 && r.denials == 0));
    }

    #[tokio::test]
    async fn each_counter_is_independent() {
        let store = InMemoryStore::new();
        let Ok(report) = create_report(&store, new_report(52.23, 21.01)).await else {
            panic!("create failed");
        };

        let _ = react(&store, report.id, ReactionCounter::Confirmations).await;
        let after = react(&store, report.id, ReactionCounter::Denials).await;

        assert!(after.is_ok_and(|r| r.likes == 0 && r.confirmations == 1 && r.denials == 1));
    }

    #[tokio::test]
    async fn react_on_unknown_id_is_not_found() {
        let store = InMemoryStore::new();
        let result = react(&store, ReportId(99), ReactionCounter::Likes).await;
        assert!(matches!(result, Err(CoreError::NotFound { id: 99, .. })));
    }

    #[tokio::test]
    async fn invalid_coordinates_never_reach_the_store() {
        let store = InMemoryStore::new();

        assert!(create_report(&store, new_report(91.0, 0.0)).await.is_err());
        assert!(create_report(&store, new_report(0.0, 181.0)).await.is_err());
        assert_eq!(store.report_count().await, 0);
    }

    #[tokio::test]
    async fn get_unknown_report_is_not_found() {
        let store = InMemoryStore::new();
        assert!(matches!(
            get_report(&store, ReportId(1)).await,
            Err(CoreError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn list_reports_is_newest_first_with_total() {
        let store = InMemoryStore::new();
        for _ in 0..3 {
            let _ = create_report(&store, new_report(10.0, 10.0)).await;
        }

        let page = Page::new(0, 2).unwrap_or_else(|e| panic!("valid page rejected: {e}"));
        let Ok(listed) = list_reports(&store, page).await else {
            panic!("list failed");
        };

        assert_eq!(listed.total, 3);
        let ids: Vec<i64> = listed.items.iter().map(|r| r.id.0).collect();
        assert_eq!(ids, vec![3, 2]);
    }

    #[tokio::test]
    async fn nearby_pages_are_stable_over_store() {
        let store = InMemoryStore::new();
        for i in 0..5 {
            let offset = f64::from(i) * 0.0001;
            let _ = create_report(&store, new_report(52.2297 + offset, 21.0122)).await;
        }
        let _ = create_report(&store, new_report(52.40, 21.00)).await;

        let center = Coordinates {
            lat: 52.2297,
            lng: 21.0122,
        };
        let run = |skip: u64, limit: u32| {
            let page = Page::new(skip, limit).unwrap_or_else(|e| panic!("valid page rejected: {e}"));
            NearbyQuery::new(center, 1.0, page)
                .unwrap_or_else(|e| panic!("valid query rejected: {e}"))
        };

        let first = query_nearby(&store, &run(0, 2)).await.unwrap_or_else(|e| panic!("query failed: {e}"));
        let second = query_nearby(&store, &run(2, 2)).await.unwrap_or_else(|e| panic!("query failed: {e}"));
        let whole = query_nearby(&store, &run(0, 4)).await.unwrap_or_else(|e| panic!("query failed: {e}"));

        assert_eq!(first.total, 5);
        let mut ids: Vec<ReportId> = first.items.iter().map(|r| r.id).collect();
        ids.extend(second.items.iter().map(|r| r.id));
        let whole_ids: Vec<ReportId> = whole.items.iter().map(|r| r.id).collect();
        assert_eq!(ids, whole_ids);
    }

    #[tokio::test]
    async fn events_between_applies_window_and_order() {
        let store = InMemoryStore::new();
        let base = Utc::now();
        for (offset, event_type) in [(5, EventType::Concert), (1, EventType::Strike), (30, EventType::Sport)] {
            let new = NewEvent {
                name: format!("{event_type:?}"),
                description: None,
                event_type,
                severity: EventSeverity::Medium,
                starts_at: base + Duration::hours(offset),
                ends_at: base + Duration::hours(offset + 2),
                lat: 52.23,
                lng: 21.01,
                radius_m: 300,
                location_name: None,
                source: None,
                carrier: None,
                affected_lines: None,
                is_verified: false,
            };
            let _ = create_event(&store, new).await;
        }

        let window = EventWindow::around(base + Duration::hours(3), 3, EventFilter::default(), Page::default())
            .unwrap_or_else(|e| panic!("valid window rejected: {e}"));
        let found = events_between(&store, &window)
            .await
            .unwrap_or_else(|e| panic!("window query failed: {e}"));

        let types: Vec<EventType> = found.iter().map(|e| e.event_type).collect();
        assert_eq!(types, vec![EventType::Strike, EventType::Concert]);
    }

    #[tokio::test]
    async fn events_on_day_filters_by_verification() {
        let store = InMemoryStore::new();
        let noon = chrono::NaiveDate::from_ymd_opt(2025, 10, 4)
            .and_then(|d| d.and_hms_opt(12, 0, 0))
            .map(|dt| dt.and_utc())
            .unwrap_or_else(|| panic!("fixed date is valid"));
        for is_verified in [true, false] {
            let new = NewEvent {
                name: String::from("Strike"),
                description: None,
                event_type: EventType::Strike,
                severity: EventSeverity::High,
                starts_at: noon,
                ends_at: noon + Duration::hours(1),
                lat: 52.23,
                lng: 21.01,
                radius_m: 300,
                location_name: None,
                source: None,
                carrier: None,
                affected_lines: None,
                is_verified,
            };
            let _ = create_event(&store, new).await;
        }

        let filter = EventFilter {
            is_verified: Some(true),
            ..EventFilter::default()
        };
        let day = noon.date_naive();
        let found = events_on_day(&store, day, filter, Page::default())
            .await
            .unwrap_or_else(|e| panic!("day query failed: {e}"));
        assert_eq!(found.len(), 1);
        assert!(found.iter().all(|e| e.is_verified));

        let next_day = day.succ_opt().unwrap_or(day);
        let none = events_on_day(&store, next_day, EventFilter::default(), Page::default())
            .await
            .unwrap_or_else(|e| panic!("day query failed: {e}"));
        assert!(none.is_empty());
    }
}
