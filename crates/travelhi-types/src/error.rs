//! Input validation errors shared by every entry point.
//!
//! Validation always happens before any store write, so an [`InputError`]
//! never leaves partial state behind.

/// A caller-supplied value was rejected.
#[derive(Debug, thiserror::Error)]
pub enum InputError {
    /// Latitude or longitude outside the valid range or not finite.
    #[error(
        "invalid coordinates ({lat}, {lng}): latitude must be between -90 and 90, longitude between -180 and 180"
    )]
    Coordinates {
        /// The rejected latitude.
        lat: f64,
        /// The rejected longitude.
        lng: f64,
    },

    /// A search radius that is not a positive finite number.
    #[error("invalid radius {0} km: must be a positive finite number")]
    Radius(f64),

    /// A page size outside `1..=max`.
    #[error("invalid limit {limit}: must be between 1 and {max}")]
    PageLimit {
        /// The rejected limit.
        limit: u32,
        /// The configured ceiling.
        max: u32,
    },

    /// A time window whose end precedes its start.
    #[error("invalid time window: end must not precede start")]
    TimeWindow,

    /// A string that does not name a known enumeration member.
    #[error("unknown {kind}: {value}")]
    UnknownVariant {
        /// Which enumeration was being parsed.
        kind: &'static str,
        /// The rejected input.
        value: String,
    },

    /// Field-level rule violations reported by `validator`.
    #[error("invalid fields: {0}")]
    Fields(#[from] validator::ValidationErrors),
}
