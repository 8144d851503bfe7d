//! Timezone-aware cron/quartz schedules.
//!
//! A [`Schedule`] turns a six-field expression, a timezone and a date range
//! into a lazy sequence of occurrences:
//!
//! ```
//! use chrono_tz::Tz;
//! use tzcron::{Bound, Schedule};
//!
//! let start: Bound = "1989-04-24T05:01:00Z".parse()?;
//! let mut fridays = Schedule::builder("0 5 * * FRI *", Tz::UTC)
//!     .with_start(start)
//!     .build()?;
//!
//! let first = fridays.advance()?.expect("schedule is infinite");
//! assert_eq!(first.to_rfc3339(), "1989-04-28T05:00:00+00:00");
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! Occurrences that land in a DST gap or overlap are reported as errors; the
//! caller decides whether to skip them and keep pulling.

pub mod cron;
pub mod error;
pub mod filter;
pub mod recurrence;
pub mod schedule;

pub use cron::{CronExpression, FieldKind, RecurrenceSpec};
pub use error::{ExpressionError, OccurrenceError, RecurrenceError, ScheduleError};
pub use filter::{FilterVerdict, OccurrenceFilter, YearFilter, predicate};
pub use schedule::{Bound, Schedule, ScheduleBuilder, ScheduleState, localize, parse_timezone};

/// A point in time localized to a schedule's timezone.
pub type Occurrence = chrono::DateTime<chrono_tz::Tz>;
