//! Report create/read/react operations.
//!
//! Every operation validates its input before touching the store, so a
//! rejected request never leaves a partial report behind.

use travelhi_types::{NewReport, ReactionCounter, Report, ReportId};

use crate::error::CoreError;
use crate::page::{Page, Paginated};
use crate::store::ReportStore;

/// Validate and store a new report.
///
/// # Errors
///
/// Returns [`CoreError::Input`] (with no write performed) for invalid
/// coordinates or over-long text, and [`CoreError::Store`] if the insert
/// fails.
pub async fn create_report(store: &dyn ReportStore, report: NewReport) -> Result<Report, CoreError> {
    report.check()?;
    let stored = store.insert(report).await?;
    tracing::info!(
        report_id = %stored.id,
        category = stored.category.as_str(),
        lat = stored.location.lat,
        lng = stored.location.lng,
        has_photo = stored.photo.is_some(),
        "Report created"
    );
    Ok(stored)
}

/// Fetch a single report.
///
/// # Errors
///
/// Returns [`CoreError::NotFound`] for an unknown id.
pub async fn get_report(store: &dyn ReportStore, id: ReportId) -> Result<Report, CoreError> {
    store
        .get(id)
        .await?
        .ok_or(CoreError::NotFound {
            kind: "report",
            id: id.into_inner(),
        })
}

/// All reports, newest first.
///
/// # Errors
///
/// Returns [`CoreError::Store`] if the store fails.
pub async fn list_reports(
    store: &dyn ReportStore,
    page: Page,
) -> Result<Paginated<Report>, CoreError> {
    let (items, total) = store.list_page(page).await?;
    Ok(Paginated { items, total })
}

/// Add one to a reaction counter.
///
/// # Errors
///
/// Returns [`CoreError::NotFound`] for an unknown id.
pub async fn react(
    store: &dyn ReportStore,
    id: ReportId,
    counter: ReactionCounter,
) -> Result<Report, CoreError> {
    let report = store
        .increment(id, counter)
        .await?
        .ok_or(CoreError::NotFound {
            kind: "report",
            id: id.into_inner(),
        })?;
    tracing::debug!(
        report_id = %id,
        counter = counter.column(),
        value = report.counter(counter),
        "Reaction recorded"
    );
    Ok(report)
}
