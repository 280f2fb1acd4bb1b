//! Error types for the decision core.

use thiserror::Error;

/// A reading supplied from outside the generator failed validation.
#[derive(Debug, Error)]
pub enum ReadingError {
    #[error("malformed reading: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("reading field `{field}` is not a finite number")]
    NonFinite { field: String },
    #[error(
        "EV station counts do not add up: {active} active + {available} available != {total} total"
    )]
    StationMismatch {
        active: u32,
        available: u32,
        total: u32,
    },
}

/// A control-surface or feed request the core refused.
///
/// All variants are recoverable: the core state is unchanged when one is
/// returned.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    InvalidReading(#[from] ReadingError),
    #[error("emergency mode is already active")]
    AlreadyInEmergency,
    #[error("emergency mode is not active")]
    NotInEmergency,
    #[error("{0} rejected while emergency mode is active")]
    EmergencyActive(&'static str),
    #[error("unknown alert id `{0}`")]
    UnknownAlert(String),
    #[error("unknown policy objective `{0}` (expected cost, emission, reliability or balanced)")]
    UnknownObjective(String),
}
