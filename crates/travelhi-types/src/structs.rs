//! Core entity structs for the Travel Hi backend.
//!
//! Reports and events are persisted by the store; transit reports and
//! disruption predictions only exist for the duration of one request;
//! broadcasts are built once and pushed to every live session.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use validator::Validate;

use crate::enums::{
    DisruptionCategory, EventSeverity, EventType, ReactionCounter, ReportCategory, TransitMode,
};
use crate::error::InputError;
use crate::ids::{EventId, ReportId};

// ---------------------------------------------------------------------------
// Coordinates
// ---------------------------------------------------------------------------

/// A WGS84 point. Latitude first, then longitude.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Coordinates {
    /// Latitude in degrees, `-90..=90`.
    pub lat: f64,
    /// Longitude in degrees, `-180..=180`.
    pub lng: f64,
}

impl Coordinates {
    /// Build a validated point.
    ///
    /// # Errors
    ///
    /// Returns [`InputError::Coordinates`] if either value is not finite
    /// or lies outside its range.
    pub fn new(lat: f64, lng: f64) -> Result<Self, InputError> {
        Self { lat, lng }.check()
    }

    /// Re-validate a point that arrived through deserialization.
    ///
    /// # Errors
    ///
    /// Returns [`InputError::Coordinates`] on an out-of-range value.
    pub fn check(self) -> Result<Self, InputError> {
        let lat_ok = self.lat.is_finite() && (-90.0..=90.0).contains(&self.lat);
        let lng_ok = self.lng.is_finite() && (-180.0..=180.0).contains(&self.lng);
        if lat_ok && lng_ok {
            Ok(self)
        } else {
            Err(InputError::Coordinates {
                lat: self.lat,
                lng: self.lng,
            })
        }
    }
}

// ---------------------------------------------------------------------------
// Reports
// ---------------------------------------------------------------------------

/// A stored incident report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Report {
    /// Store-assigned identifier.
    pub id: ReportId,
    /// What kind of incident this is.
    #[serde(rename = "type")]
    pub category: ReportCategory,
    /// Where the incident is.
    pub location: Coordinates,
    /// Optional short title.
    pub name: Option<String>,
    /// Optional free-text description.
    pub description: Option<String>,
    /// Stored photo file name, if a photo was uploaded.
    pub photo: Option<String>,
    /// Number of likes.
    pub likes: u32,
    /// Number of confirmations.
    pub confirmations: u32,
    /// Number of denials.
    pub denials: u32,
    /// When the store accepted the report.
    pub created_at: DateTime<Utc>,
}

impl Report {
    /// Current value of one reaction counter.
    pub const fn counter(&self, counter: ReactionCounter) -> u32 {
        match counter {
            ReactionCounter::Likes => self.likes,
            ReactionCounter::Confirmations => self.confirmations,
            ReactionCounter::Denials => self.denials,
        }
    }
}

/// A report as submitted, before the store assigns id and timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct NewReport {
    /// What kind of incident this is.
    pub category: ReportCategory,
    /// Where the incident is.
    pub location: Coordinates,
    /// Optional short title.
    #[validate(length(max = 128))]
    pub name: Option<String>,
    /// Optional free-text description.
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    /// Stored photo file name.
    pub photo: Option<String>,
}

impl NewReport {
    /// Validate coordinates and text lengths.
    ///
    /// # Errors
    ///
    /// Returns [`InputError`] describing the first rejected input.
    pub fn check(&self) -> Result<(), InputError> {
        self.location.check()?;
        self.validate()?;
        Ok(())
    }
}

/// Real-time notification pushed to every live session when a report is
/// created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct ReportBroadcast {
    /// Submitter label.
    pub user: String,
    /// Human-readable text: description, else name, else a placeholder.
    pub message: String,
    /// Report latitude.
    pub lat: f64,
    /// Report longitude.
    pub lng: f64,
    /// Like count at creation time.
    pub likes: u32,
    /// ISO-8601 UTC timestamp of the broadcast.
    pub timestamp: String,
}

impl ReportBroadcast {
    /// Submitter label used while reports are anonymous.
    pub const ANONYMOUS: &'static str = "Anonymous";

    /// Message used when a report carries neither description nor name.
    pub const PLACEHOLDER: &'static str = "New report";

    /// Build the broadcast for a freshly stored report.
    pub fn from_report(report: &Report, at: DateTime<Utc>) -> Self {
        let message = report
            .description
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .or_else(|| report.name.as_deref().filter(|s| !s.trim().is_empty()))
            .unwrap_or(Self::PLACEHOLDER)
            .to_owned();

        Self {
            user: Self::ANONYMOUS.to_owned(),
            message,
            lat: report.location.lat,
            lng: report.location.lng,
            likes: report.likes,
            timestamp: at.to_rfc3339_opts(SecondsFormat::Micros, true),
        }
    }
}

// ---------------------------------------------------------------------------
// Scheduled events
// ---------------------------------------------------------------------------

/// A stored scheduled event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Event {
    /// Store-assigned identifier.
    pub id: EventId,
    /// Event name.
    pub name: String,
    /// Optional description.
    pub description: Option<String>,
    /// Kind of event.
    pub event_type: EventType,
    /// Expected impact.
    #[ts(type = "number")]
    pub severity: EventSeverity,
    /// Start of the event.
    pub starts_at: DateTime<Utc>,
    /// End of the event.
    pub ends_at: DateTime<Utc>,
    /// Latitude of the venue.
    pub lat: f64,
    /// Longitude of the venue.
    pub lng: f64,
    /// Radius of influence in metres.
    pub radius_m: u32,
    /// Human-readable venue name.
    pub location_name: Option<String>,
    /// Where the information came from.
    pub source: Option<String>,
    /// Affected transport operator.
    pub carrier: Option<String>,
    /// Affected lines as a comma-separated list (e.g. `52,A,D`).
    pub affected_lines: Option<String>,
    /// Whether an operator has verified the event.
    pub is_verified: bool,
    /// When the store accepted the event.
    pub created_at: DateTime<Utc>,
    /// Last modification time.
    pub updated_at: DateTime<Utc>,
}

/// Largest event radius, bounded by the `INTEGER` column that stores it.
pub const MAX_EVENT_RADIUS_M: u32 = 2_147_483_647;

const fn default_radius_m() -> u32 {
    300
}

/// An event as submitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[validate(schema(function = "validate_event_window"))]
pub struct NewEvent {
    /// Event name.
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    /// Optional description.
    #[serde(default)]
    pub description: Option<String>,
    /// Kind of event.
    pub event_type: EventType,
    /// Expected impact (defaults to medium).
    #[serde(default)]
    pub severity: EventSeverity,
    /// Start of the event.
    pub starts_at: DateTime<Utc>,
    /// End of the event; must be after `starts_at`.
    pub ends_at: DateTime<Utc>,
    /// Latitude of the venue.
    pub lat: f64,
    /// Longitude of the venue.
    pub lng: f64,
    /// Radius of influence in metres.
    #[serde(default = "default_radius_m")]
    #[validate(range(max = MAX_EVENT_RADIUS_M))]
    pub radius_m: u32,
    /// Human-readable venue name.
    #[serde(default)]
    #[validate(length(max = 200))]
    pub location_name: Option<String>,
    /// Where the information came from.
    #[serde(default)]
    #[validate(length(max = 100))]
    pub source: Option<String>,
    /// Affected transport operator.
    #[serde(default)]
    #[validate(length(max = 100))]
    pub carrier: Option<String>,
    /// Affected lines as a comma-separated list.
    #[serde(default)]
    #[validate(length(max = 300))]
    pub affected_lines: Option<String>,
    /// Whether an operator has verified the event.
    #[serde(default)]
    pub is_verified: bool,
}

impl NewEvent {
    /// Validate coordinates, lengths, and the time window.
    ///
    /// # Errors
    ///
    /// Returns [`InputError`] describing the first rejected input.
    pub fn check(&self) -> Result<(), InputError> {
        Coordinates::new(self.lat, self.lng)?;
        self.validate()?;
        Ok(())
    }
}

fn validate_event_window(event: &NewEvent) -> Result<(), validator::ValidationError> {
    if event.ends_at <= event.starts_at {
        return Err(validator::ValidationError::new("ends_at_before_starts_at"));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Transit disruption prediction
// ---------------------------------------------------------------------------

/// A structured transit report submitted for disruption prediction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate, TS)]
#[ts(export, export_to = "bindings/")]
pub struct TrafficReport {
    /// Transport mode.
    pub mode: TransitMode,
    /// Line number or name, if known.
    #[serde(default)]
    #[validate(length(max = 32))]
    pub line: Option<String>,
    /// City the report refers to.
    #[validate(length(min = 1, max = 100))]
    pub city: String,
    /// Reporter latitude.
    pub latitude: f64,
    /// Reporter longitude.
    pub longitude: f64,
    /// When the observation was made (defaults to now).
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
    /// What the user saw, in their own words.
    #[serde(default)]
    #[validate(length(max = 2000))]
    pub user_text: Option<String>,
}

impl TrafficReport {
    /// Validate coordinates and text lengths.
    ///
    /// # Errors
    ///
    /// Returns [`InputError`] describing the first rejected input.
    pub fn check(&self) -> Result<(), InputError> {
        Coordinates::new(self.latitude, self.longitude)?;
        self.validate()?;
        Ok(())
    }
}

/// The predicted impact of a transit report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct DisruptionPrediction {
    /// Probability of a disruption, `0.0..=1.0`.
    pub probability: f64,
    /// Kind of disruption.
    pub category: DisruptionCategory,
    /// One or two sentences explaining the estimate.
    pub reasoning: String,
    /// One sentence of advice for the traveller.
    pub recommended_action: String,
    /// Model confidence, `0.0..=1.0`.
    pub confidence: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_report() -> Report {
        Report {
            id: ReportId(1),
            category: ReportCategory::Accident,
            location: Coordinates {
                lat: 52.2297,
                lng: 21.0122,
            },
            name: Some(String::from("Crash")),
            description: None,
            photo: None,
            likes: 0,
            confirmations: 0,
            denials: 0,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn coordinates_reject_out_of_range() {
        assert!(Coordinates::new(91.0, 0.0).is_err());
        assert!(Coordinates::new(0.0, 181.0).is_err());
        assert!(Coordinates::new(f64::NAN, 0.0).is_err());
        assert!(Coordinates::new(-90.0, 180.0).is_ok());
    }

    #[test]
    fn new_report_rejects_long_name() {
        let report = NewReport {
            category: ReportCategory::Other,
            location: Coordinates { lat: 0.0, lng: 0.0 },
            name: Some("x".repeat(129)),
            description: None,
            photo: None,
        };
        assert!(matches!(report.check(), Err(InputError::Fields(_))));
    }

    #[test]
    fn report_serializes_category_as_type() {
        let json = serde_json::to_value(sample_report()).unwrap_or_default();
        assert_eq!(json["type"], "accident");
        assert_eq!(json["location"]["lng"], 21.0122);
    }

    #[test]
    fn broadcast_falls_back_to_name_then_placeholder() {
        let mut report = sample_report();
        let at = Utc::now();
        assert_eq!(ReportBroadcast::from_report(&report, at).message, "Crash");

        report.name = None;
        let broadcast = ReportBroadcast::from_report(&report, at);
        assert_eq!(broadcast.message, ReportBroadcast::PLACEHOLDER);
        assert_eq!(broadcast.user, ReportBroadcast::ANONYMOUS);
        assert!(broadcast.timestamp.ends_with('Z'));
    }

    fn derby(start: DateTime<Utc>, hours: i64) -> NewEvent {
        NewEvent {
            name: String::from("Derby"),
            description: None,
            event_type: EventType::Sport,
            severity: EventSeverity::High,
            starts_at: start,
            ends_at: start + chrono::Duration::hours(hours),
            lat: 52.0,
            lng: 21.0,
            radius_m: 300,
            location_name: None,
            source: None,
            carrier: None,
            affected_lines: None,
            is_verified: false,
        }
    }

    #[test]
    fn new_event_requires_end_after_start() {
        assert!(derby(Utc::now(), 0).check().is_err());
        assert!(derby(Utc::now(), 2).check().is_ok());
    }

    #[test]
    fn new_event_radius_must_fit_the_column() {
        let mut event = derby(Utc::now(), 2);
        event.radius_m = MAX_EVENT_RADIUS_M;
        assert!(event.check().is_ok());

        event.radius_m = u32::MAX;
        assert!(matches!(event.check(), Err(InputError::Fields(_))));
    }

    #[test]
    fn traffic_report_defaults_timestamp() {
        let json = serde_json::json!({
            "mode": "tram",
            "city": "Warszawa",
            "latitude": 52.23,
            "longitude": 21.01
        });
        let report: Result<TrafficReport, _> = serde_json::from_value(json);
        assert!(report.is_ok_and(|r| r.check().is_ok() && r.line.is_none()));
    }
}
