//! Error types for expression parsing, schedule construction and iteration.

use chrono::{DateTime, FixedOffset, NaiveDateTime};
use chrono_tz::Tz;
use thiserror::Error;

use crate::cron::FieldKind;
use crate::schedule::BoundKind;

/// A cron expression that cannot be turned into a recurrence.
///
/// Every variant renders as "invalid expression: ..." and names the offending
/// token.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExpressionError {
    #[error("invalid expression: expected 6 space-separated fields, found {found} in {expression:?}")]
    FieldCount { expression: String, found: usize },

    #[error("invalid expression: {token:?} is not a valid {field} field")]
    Grammar { field: FieldKind, token: String },

    #[error("invalid expression: {token:?} produces {field} values outside {min}-{max}")]
    OutOfRange {
        field: FieldKind,
        token: String,
        min: u8,
        max: u8,
    },

    #[error("invalid expression: {token:?} is an empty {field} range")]
    EmptyRange { field: FieldKind, token: String },

    #[error("invalid expression: year {token:?} must be `*` or a four-digit year")]
    InvalidYear { token: String },
}

impl ExpressionError {
    /// The token the error refers to (the whole expression for field count errors).
    #[must_use]
    pub fn token(&self) -> &str {
        match self {
            Self::FieldCount { expression, .. } => expression,
            Self::Grammar { token, .. }
            | Self::OutOfRange { token, .. }
            | Self::EmptyRange { token, .. }
            | Self::InvalidYear { token } => token,
        }
    }

    /// The field the error refers to, if it concerns a single field.
    #[must_use]
    pub fn field(&self) -> Option<FieldKind> {
        match self {
            Self::Grammar { field, .. }
            | Self::OutOfRange { field, .. }
            | Self::EmptyRange { field, .. } => Some(*field),
            Self::FieldCount { .. } | Self::InvalidYear { .. } => None,
        }
    }
}

/// Errors raised by the recurrence adapter.
#[derive(Error, Debug)]
pub enum RecurrenceError {
    /// Bounds reaching the adapter must already be naive local time.
    #[error("Invariant violation: recurrence bound {0} still carries a UTC offset")]
    ZonedBound(DateTime<FixedOffset>),

    #[error("Recurrence engine error: {0}")]
    Engine(#[from] rrule::RRuleError),
}

/// Errors raised while constructing a [`crate::Schedule`].
#[derive(Error, Debug)]
pub enum ScheduleError {
    #[error(transparent)]
    InvalidExpression(#[from] ExpressionError),

    #[error("missing timezone: {bound} bound {value} has no UTC offset")]
    MissingTimezone {
        bound: BoundKind,
        value: NaiveDateTime,
    },

    #[error("Unknown timezone: {0}")]
    UnknownTimezone(String),

    #[error(transparent)]
    Recurrence(#[from] RecurrenceError),
}

pub type ScheduleResult<T> = std::result::Result<T, ScheduleError>;

/// Errors raised while pulling the next occurrence.
///
/// The DST variants leave the schedule resumable: pulling again continues
/// with the candidate after the offending one.
#[derive(Error, Debug)]
pub enum OccurrenceError {
    /// Local time skipped by a spring-forward transition.
    #[error("Non-existent time (DST gap): {local} in timezone {timezone}")]
    NonExistentTime { local: NaiveDateTime, timezone: Tz },

    /// Local time repeated by a fall-back transition.
    #[error("Ambiguous time (DST fold): {local} in timezone {timezone}")]
    AmbiguousTime {
        local: NaiveDateTime,
        timezone: Tz,
        earliest: DateTime<Tz>,
        latest: DateTime<Tz>,
    },

    #[error(transparent)]
    Recurrence(#[from] RecurrenceError),
}

impl OccurrenceError {
    /// Whether the error comes from a DST transition rather than the engine.
    #[must_use]
    pub const fn is_dst(&self) -> bool {
        matches!(
            self,
            Self::NonExistentTime { .. } | Self::AmbiguousTime { .. }
        )
    }

    /// The local wall time that could not be localized.
    #[must_use]
    pub const fn local(&self) -> Option<NaiveDateTime> {
        match self {
            Self::NonExistentTime { local, .. } | Self::AmbiguousTime { local, .. } => Some(*local),
            Self::Recurrence(_) => None,
        }
    }
}

/// A timestamp string in neither RFC 3339 nor `YYYY-MM-DDTHH:MM:SS` form.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid timestamp {0:?}: expected RFC 3339 or YYYY-MM-DDTHH:MM:SS")]
pub struct BoundParseError(pub String);
