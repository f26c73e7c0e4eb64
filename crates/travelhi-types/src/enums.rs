//! Enumeration types for the Travel Hi backend.
//!
//! Every enumeration here is closed. The wire and database representation
//! of each variant is the `snake_case` (or upper-case, for events) string
//! returned by its `as_str` method.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::InputError;

// ---------------------------------------------------------------------------
// Report categories
// ---------------------------------------------------------------------------

/// The kind of incident a user reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum ReportCategory {
    // --- Road traffic ---
    /// A collision between vehicles or with pedestrians.
    Accident,
    /// Heavy congestion.
    TrafficJam,
    /// The road is blocked.
    Roadblock,
    /// Construction work on the road.
    Roadwork,
    /// Ice, oil, or other slippery surface.
    SlipperyRoad,
    /// Debris or an object lying on the road.
    ObjectOnRoad,

    // --- Public transport ---
    /// A delayed tram, bus, metro, or train.
    Delay,

    // --- Safety ---
    /// Police presence or a checkpoint.
    Police,
    /// Anything else.
    Other,
}

impl ReportCategory {
    /// Every category, in declaration order.
    pub const ALL: [Self; 9] = [
        Self::Accident,
        Self::TrafficJam,
        Self::Roadblock,
        Self::Roadwork,
        Self::SlipperyRoad,
        Self::ObjectOnRoad,
        Self::Delay,
        Self::Police,
        Self::Other,
    ];

    /// The wire and database name of this category.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Accident => "accident",
            Self::TrafficJam => "traffic_jam",
            Self::Roadblock => "roadblock",
            Self::Roadwork => "roadwork",
            Self::SlipperyRoad => "slippery_road",
            Self::ObjectOnRoad => "object_on_road",
            Self::Delay => "delay",
            Self::Police => "police",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for ReportCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReportCategory {
    type Err = InputError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim();
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == needle)
            .ok_or_else(|| InputError::UnknownVariant {
                kind: "report category",
                value: s.to_owned(),
            })
    }
}

// ---------------------------------------------------------------------------
// Reaction counters
// ---------------------------------------------------------------------------

/// One of the three per-report reaction counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum ReactionCounter {
    /// Someone found the report useful.
    Likes,
    /// Someone confirmed the incident is still there.
    Confirmations,
    /// Someone reported the incident is gone or never existed.
    Denials,
}

impl ReactionCounter {
    /// The column (and JSON field) holding this counter.
    pub const fn column(self) -> &'static str {
        match self {
            Self::Likes => "likes",
            Self::Confirmations => "confirmations",
            Self::Denials => "denials",
        }
    }
}

// ---------------------------------------------------------------------------
// Scheduled events
// ---------------------------------------------------------------------------

/// The kind of scheduled event that may disrupt traffic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "UPPERCASE")]
#[ts(export, export_to = "bindings/")]
pub enum EventType {
    /// A concert or festival.
    Concert,
    /// A public holiday.
    Holiday,
    /// A sports match.
    Sport,
    /// A transport strike.
    Strike,
    /// A weather warning.
    Weather,
    /// Anything else.
    Other,
}

impl EventType {
    /// Every event type, in declaration order.
    pub const ALL: [Self; 6] = [
        Self::Concert,
        Self::Holiday,
        Self::Sport,
        Self::Strike,
        Self::Weather,
        Self::Other,
    ];

    /// The wire and database name of this event type.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Concert => "CONCERT",
            Self::Holiday => "HOLIDAY",
            Self::Sport => "SPORT",
            Self::Strike => "STRIKE",
            Self::Weather => "WEATHER",
            Self::Other => "OTHER",
        }
    }
}

impl FromStr for EventType {
    type Err = InputError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| InputError::UnknownVariant {
                kind: "event type",
                value: s.to_owned(),
            })
    }
}

/// How strongly an event is expected to affect traffic.
///
/// Serialized as the integers `1`, `2`, `3`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum EventSeverity {
    /// Minor local impact.
    Low,
    /// Noticeable impact (the default).
    #[default]
    Medium,
    /// City-wide impact.
    High,
}

impl TryFrom<u8> for EventSeverity {
    type Error = InputError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::Low),
            2 => Ok(Self::Medium),
            3 => Ok(Self::High),
            other => Err(InputError::UnknownVariant {
                kind: "event severity",
                value: other.to_string(),
            }),
        }
    }
}

impl From<EventSeverity> for u8 {
    fn from(severity: EventSeverity) -> Self {
        match severity {
            EventSeverity::Low => 1,
            EventSeverity::Medium => 2,
            EventSeverity::High => 3,
        }
    }
}

// ---------------------------------------------------------------------------
// Transit disruption prediction
// ---------------------------------------------------------------------------

/// Public transport mode a transit report refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export, export_to = "bindings/")]
pub enum TransitMode {
    /// Tram.
    Tram,
    /// Bus.
    Bus,
    /// Metro / underground.
    Metro,
    /// Regional or city train.
    Train,
}

impl TransitMode {
    /// The wire name of this mode.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Tram => "tram",
            Self::Bus => "bus",
            Self::Metro => "metro",
            Self::Train => "train",
        }
    }
}

/// The kind of disruption a prediction describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export, export_to = "bindings/")]
pub enum DisruptionCategory {
    /// Late running.
    Delay,
    /// Vehicle or infrastructure breakdown.
    Breakdown,
    /// An accident on the line.
    Accident,
    /// Crowding or road congestion.
    Congestion,
    /// Industrial action.
    Strike,
    /// Not enough information to tell.
    Unknown,
}
