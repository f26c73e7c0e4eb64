//! Shared type definitions for the Travel Hi backend.
//!
//! This crate is the single source of truth for the domain types used
//! across the workspace. Types flow downstream to `TypeScript` via `ts-rs`
//! for the web client.
//!
//! # Modules
//!
//! - [`ids`] -- Type-safe identifier wrappers for stored entities
//! - [`enums`] -- Closed enumerations (report categories, counters, event types)
//! - [`structs`] -- Reports, events, transit reports, predictions, broadcasts
//! - [`error`] -- Input validation errors

pub mod enums;
pub mod error;
pub mod ids;
pub mod structs;

// Re-export all public types at crate root for convenience.
pub use enums::{
    DisruptionCategory, EventSeverity, EventType, ReactionCounter, ReportCategory, TransitMode,
};
pub use error::InputError;
pub use ids::{EventId, ReportId};
pub use structs::{
    Coordinates, DisruptionPrediction, Event, MAX_EVENT_RADIUS_M, NewEvent, NewReport, Report,
    ReportBroadcast, TrafficReport,
};
