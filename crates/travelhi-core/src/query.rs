//! Proximity report query engine.
//!
//! Answers "which reports lie within `radius_km` of a point", newest first,
//! paginated, with the total number of matches.
//!
//! The engine pulls the full candidate set from the store and filters it in
//! memory by great-circle distance. That is a known scaling ceiling: every
//! query touches every stored report. The `reports` table indexes latitude
//! and longitude so a bounding-box pre-filter can be pushed down later
//! without changing the results.

use std::cmp::Ordering;

use travelhi_types::{Coordinates, InputError, Report};

use crate::error::CoreError;
use crate::page::{Page, Paginated};
use crate::store::ReportStore;

/// Mean Earth radius used for haversine distances.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Radius used when the caller does not supply one.
pub const DEFAULT_RADIUS_KM: f64 = 1.0;

/// Great-circle distance between two points in kilometres.
pub fn haversine_km(from: Coordinates, to: Coordinates) -> f64 {
    let lat1 = from.lat.to_radians();
    let lat2 = to.lat.to_radians();
    let d_lat = (to.lat - from.lat).to_radians();
    let d_lng = (to.lng - from.lng).to_radians();

    let a = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lng / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    EARTH_RADIUS_KM * c
}

/// Newest first; equal timestamps fall back to the higher id first.
pub fn newest_first(a: &Report, b: &Report) -> Ordering {
    b.created_at
        .cmp(&a.created_at)
        .then_with(|| b.id.cmp(&a.id))
}

/// A validated proximity query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NearbyQuery {
    center: Coordinates,
    radius_km: f64,
    page: Page,
}

impl NearbyQuery {
    /// Validate and build a query.
    ///
    /// # Errors
    ///
    /// Returns [`InputError::Coordinates`] for an invalid center and
    /// [`InputError::Radius`] unless `radius_km` is positive and finite.
    pub fn new(center: Coordinates, radius_km: f64, page: Page) -> Result<Self, InputError> {
        let center = center.check()?;
        if !radius_km.is_finite() || radius_km <= 0.0 {
            return Err(InputError::Radius(radius_km));
        }
        Ok(Self {
            center,
            radius_km,
            page,
        })
    }

    /// The query center.
    pub const fn center(&self) -> Coordinates {
        self.center
    }

    /// The search radius in kilometres.
    pub const fn radius_km(&self) -> f64 {
        self.radius_km
    }

    /// The requested page.
    pub const fn page(&self) -> Page {
        self.page
    }
}

/// Filter, order, and paginate a candidate set.
///
/// Keeps every candidate whose distance to the center is at most the
/// radius (boundary inclusive). `total` counts all kept candidates, not
/// just the returned page.
pub fn filter_nearby(candidates: Vec<Report>, query: &NearbyQuery) -> Paginated<Report> {
    let mut matches: Vec<Report> = candidates
        .into_iter()
        .filter(|r| haversine_km(query.center, r.location) <= query.radius_km)
        .collect();

    matches.sort_by(newest_first);

    let total = u64::try_from(matches.len()).unwrap_or(u64::MAX);
    Paginated {
        items: query.page.apply(matches),
        total,
    }
}

/// Run a proximity query against a store.
///
/// # Errors
///
/// Returns [`CoreError::Store`] if the candidate set cannot be loaded.
pub async fn query_nearby(
    store: &dyn ReportStore,
    query: &NearbyQuery,
) -> Result<Paginated<Report>, CoreError> {
    let candidates = store.list_all().await?;
    let scanned = candidates.len();
    let result = filter_nearby(candidates, query);

    tracing::debug!(
        lat = query.center.lat,
        lng = query.center.lng,
        radius_km = query.radius_km,
        scanned,
        total = result.total,
        returned = result.items.len(),
        "Proximity query"
    );

    Ok(result)
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};
    use travelhi_types::{ReportCategory, ReportId};

    use super::*;

    const WARSAW: Coordinates = Coordinates {
        lat: 52.2297,
        lng: 21.0122,
    };

    fn report_at(id: i64, lat: f64, lng: f64, minutes: i64) -> Report {
        let base = Utc.with_ymd_and_hms(2025, 10, 4, 12, 0, 0).single().unwrap_or_else(|| panic!("fixed timestamp is valid"));
        Report {
            id: ReportId(id),
            category: ReportCategory::TrafficJam,
            location: Coordinates { lat, lng },
            name: None,
            description: None,
            photo: None,
            likes: 0,
            confirmations: 0,
            denials: 0,
            created_at: base + Duration::minutes(minutes),
        }
    }

    fn query(radius_km: f64, skip: u64, limit: u32) -> NearbyQuery {
        let page = Page::new(skip, limit).unwrap_or_else(|e| panic!("valid page rejected: {e}"));
        NearbyQuery::new(WARSAW, radius_km, page)
            .unwrap_or_else(|e| panic!("valid query rejected: {e}"))
    }

    #[test]
    fn haversine_of_identical_points_is_zero() {
        assert!(haversine_km(WARSAW, WARSAW).abs() < 1e-9);
    }

    #[test]
    fn haversine_warsaw_to_krakow_is_about_252_km() {
        let krakow = Coordinates {
            lat: 50.0647,
            lng: 19.9450,
        };
        let d = haversine_km(WARSAW, krakow);
        assert!((d - 252.0).abs() < 2.0, "distance was {d}");
    }

    #[test]
    fn one_km_radius_keeps_near_and_drops_far() {
        let near = report_at(1, 52.2300, 21.0125, 0);
        let far = report_at(2, 52.40, 21.00, 1);

        let result = filter_nearby(vec![near, far], &query(1.0, 0, 50));

        assert_eq!(result.total, 1);
        assert_eq!(result.items.len(), 1);
        assert_eq!(result.items.first().map(|r| r.id), Some(ReportId(1)));
    }

    #[test]
    fn no_result_exceeds_radius() {
        let candidates: Vec<Report> = (0..40)
            .map(|i| {
                let offset = f64::from(i) * 0.005;
                report_at(i64::from(i), 52.2297 + offset, 21.0122 - offset, i64::from(i))
            })
            .collect();

        let q = query(2.5, 0, 200);
        let result = filter_nearby(candidates, &q);

        assert!(result.total > 0);
        for report in &result.items {
            assert!(haversine_km(WARSAW, report.location) <= q.radius_km());
        }
    }

    #[test]
    fn boundary_distance_is_inclusive() {
        let target = report_at(1, 52.2350, 21.0122, 0);
        let exact = haversine_km(WARSAW, target.location);
        let page = Page::new(0, 10).unwrap_or_else(|e| panic!("valid page rejected: {e}"));
        let q = NearbyQuery::new(WARSAW, exact, page)
            .unwrap_or_else(|e| panic!("valid query rejected: {e}"));

        assert_eq!(filter_nearby(vec![target], &q).total, 1);
    }

    #[test]
    fn results_are_newest_first_with_id_tiebreak() {
        let older = report_at(1, 52.2297, 21.0122, 0);
        let tie_low = report_at(2, 52.2297, 21.0122, 5);
        let tie_high = report_at(3, 52.2297, 21.0122, 5);

        let result = filter_nearby(vec![older, tie_low, tie_high], &query(1.0, 0, 10));
        let ids: Vec<i64> = result.items.iter().map(|r| r.id.0).collect();

        assert_eq!(ids, vec![3, 2, 1]);
    }

    #[test]
    fn skip_beyond_total_returns_empty_page_with_total() {
        let candidates = vec![
            report_at(1, 52.2297, 21.0122, 0),
            report_at(2, 52.2298, 21.0123, 1),
        ];

        let result = filter_nearby(candidates, &query(1.0, 5, 10));

        assert!(result.items.is_empty());
        assert_eq!(result.total, 2);
    }

    #[test]
    fn no_matches_returns_zero_total() {
        let far = report_at(1, 50.0647, 19.9450, 0);
        let result = filter_nearby(vec![far], &query(1.0, 0, 10));
        assert_eq!(result, Paginated::empty());
    }

    #[test]
    fn consecutive_pages_cover_single_larger_page() {
        let candidates: Vec<Report> = (1..=6)
            .map(|i| report_at(i, 52.2297, 21.0122, i))
            .collect();

        let first = filter_nearby(candidates.clone(), &query(1.0, 0, 2));
        let second = filter_nearby(candidates.clone(), &query(1.0, 2, 2));
        let combined = filter_nearby(candidates, &query(1.0, 0, 4));

        let mut paged: Vec<ReportId> = first.items.iter().map(|r| r.id).collect();
        paged.extend(second.items.iter().map(|r| r.id));
        let single: Vec<ReportId> = combined.items.iter().map(|r| r.id).collect();

        assert_eq!(paged, single);
        assert!(first.items.iter().all(|a| second.items.iter().all(|b| a.id != b.id)));
    }

    #[test]
    fn invalid_inputs_are_rejected() {
        let page = Page::default();
        let bad_lat = Coordinates { lat: 91.0, lng: 0.0 };
        let bad_lng = Coordinates {
            lat: 0.0,
            lng: 181.0,
        };

        assert!(NearbyQuery::new(bad_lat, 1.0, page).is_err());
        assert!(NearbyQuery::new(bad_lng, 1.0, page).is_err());
        assert!(NearbyQuery::new(WARSAW, 0.0, page).is_err());
        assert!(NearbyQuery::new(WARSAW, f64::INFINITY, page).is_err());
    }
}
