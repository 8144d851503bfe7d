//! Timezone-aware schedules.
//!
//! A [`Schedule`] localizes the naive wall-clock sequence produced by the
//! recurrence adapter into its configured zone. Local times that fall in a
//! DST gap or overlap are reported to the caller instead of being guessed;
//! pulling again continues with the next candidate.

mod bound;

use std::fmt;
use std::iter::FusedIterator;

use chrono::{DateTime, FixedOffset, LocalResult, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;

pub use bound::{Bound, BoundKind};

use crate::Occurrence;
use crate::cron::CronExpression;
use crate::error::{OccurrenceError, ScheduleError, ScheduleResult};
use crate::filter::{FilterVerdict, OccurrenceFilter};
use crate::recurrence::RecurrenceAdapter;

/// Where a schedule is in its lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleState {
    /// Built, nothing pulled yet.
    Constructed,
    /// Last pull returned an occurrence.
    Iterating,
    /// End bound reached or a filter stopped the sequence; terminal.
    Exhausted,
    /// Last pull failed; the next pull resumes after the failing candidate.
    Faulted,
}

/// ## Summary
/// Resolves an IANA timezone name.
///
/// ## Errors
/// Returns `ScheduleError::UnknownTimezone` if the name is not in the database.
pub fn parse_timezone(name: &str) -> ScheduleResult<Tz> {
    name.parse::<Tz>()
        .map_err(|_err| ScheduleError::UnknownTimezone(name.to_string()))
}

/// ## Summary
/// Attaches `timezone` to a naive local time without inferring anything.
///
/// ## Errors
/// Returns `OccurrenceError::NonExistentTime` for a time skipped by a
/// spring-forward transition and `OccurrenceError::AmbiguousTime` for a
/// time repeated by a fall-back transition.
pub fn localize(timezone: Tz, local: NaiveDateTime) -> Result<Occurrence, OccurrenceError> {
    match timezone.from_local_datetime(&local) {
        LocalResult::Single(occurrence) => Ok(occurrence),
        LocalResult::Ambiguous(earliest, latest) => Err(OccurrenceError::AmbiguousTime {
            local,
            timezone,
            earliest,
            latest,
        }),
        LocalResult::None => Err(OccurrenceError::NonExistentTime { local, timezone }),
    }
}

/// Collects the optional parts of a schedule before validating them.
pub struct ScheduleBuilder {
    expression: String,
    timezone: Tz,
    start: Option<Bound>,
    end: Option<Bound>,
    filters: Vec<Box<dyn OccurrenceFilter>>,
}

impl ScheduleBuilder {
    /// Inclusive start. Defaults to now in UTC.
    #[must_use]
    pub fn with_start(mut self, start: impl Into<Bound>) -> Self {
        self.start = Some(start.into());
        self
    }

    /// Inclusive end. Defaults to never.
    #[must_use]
    pub fn with_end(mut self, end: impl Into<Bound>) -> Self {
        self.end = Some(end.into());
        self
    }

    /// Adds a filter; filters run in insertion order, before the year filter.
    ///
    /// Every filter sees every candidate, even one an earlier filter already
    /// skipped, so a later `Stop` is never missed.
    #[must_use]
    pub fn with_filter(mut self, filter: impl OccurrenceFilter + 'static) -> Self {
        self.filters.push(Box::new(filter));
        self
    }

    /// ## Summary
    /// Validates the inputs and builds the schedule.
    ///
    /// Bounds are converted into the schedule's zone and stripped to naive
    /// local time before they reach the recurrence adapter.
    ///
    /// ## Errors
    /// Returns `ScheduleError::MissingTimezone` if a bound has no offset,
    /// `ScheduleError::InvalidExpression` if the expression does not parse and
    /// `ScheduleError::Recurrence` if the recurrence engine rejects the rule.
    #[tracing::instrument(
        skip(self),
        fields(expression = %self.expression, timezone = %self.timezone)
    )]
    pub fn build(self) -> ScheduleResult<Schedule> {
        let start = match self.start {
            Some(start) => require_zone(start, BoundKind::Start)?,
            None => Utc::now().fixed_offset(),
        };
        let end = self
            .end
            .map(|end| require_zone(end, BoundKind::End))
            .transpose()?;

        let expression = CronExpression::parse(&self.expression)?;

        let local_start = start.with_timezone(&self.timezone).naive_local();
        let local_end = end.map(|end| end.with_timezone(&self.timezone).naive_local());
        let occurrences = RecurrenceAdapter::build(
            expression.recurrence(),
            Bound::Naive(local_start),
            local_end.map(Bound::Naive),
        )?;

        let mut filters = self.filters;
        filters.push(Box::new(expression.year()));

        tracing::debug!(%local_start, ?local_end, filters = filters.len(), "Schedule constructed");
        Ok(Schedule {
            expression,
            timezone: self.timezone,
            start,
            end,
            filters,
            occurrences,
            state: ScheduleState::Constructed,
        })
    }
}

fn require_zone(bound: Bound, kind: BoundKind) -> ScheduleResult<DateTime<FixedOffset>> {
    match bound {
        Bound::Zoned(zoned) => Ok(zoned),
        Bound::Naive(value) => Err(ScheduleError::MissingTimezone { bound: kind, value }),
    }
}

/// A cron expression bound to a timezone and a date range.
///
/// Iterating yields occurrences in the schedule's zone, in chronological
/// order, until the end bound or the expression's year is passed. Schedules
/// without either are infinite.
pub struct Schedule {
    expression: CronExpression,
    timezone: Tz,
    start: DateTime<FixedOffset>,
    end: Option<DateTime<FixedOffset>>,
    filters: Vec<Box<dyn OccurrenceFilter>>,
    occurrences: RecurrenceAdapter,
    state: ScheduleState,
}

impl Schedule {
    /// Starts a builder for `expression` in `timezone`.
    #[must_use]
    pub fn builder(expression: impl Into<String>, timezone: Tz) -> ScheduleBuilder {
        ScheduleBuilder {
            expression: expression.into(),
            timezone,
            start: None,
            end: None,
            filters: Vec::new(),
        }
    }

    /// ## Summary
    /// Builds an open-ended schedule starting now.
    ///
    /// ## Errors
    /// Returns `ScheduleError::InvalidExpression` if the expression does not parse.
    pub fn new(expression: &str, timezone: Tz) -> ScheduleResult<Self> {
        Self::builder(expression, timezone).build()
    }

    #[must_use]
    pub const fn expression(&self) -> &CronExpression {
        &self.expression
    }

    #[must_use]
    pub const fn timezone(&self) -> Tz {
        self.timezone
    }

    #[must_use]
    pub const fn start(&self) -> DateTime<FixedOffset> {
        self.start
    }

    #[must_use]
    pub const fn end(&self) -> Option<DateTime<FixedOffset>> {
        self.end
    }

    #[must_use]
    pub const fn state(&self) -> ScheduleState {
        self.state
    }

    /// ## Summary
    /// Pulls the next occurrence.
    ///
    /// Returns `Ok(None)` once the sequence is over; every later pull does
    /// the same.
    ///
    /// ## Errors
    /// Returns `OccurrenceError::NonExistentTime` or
    /// `OccurrenceError::AmbiguousTime` when the next candidate falls in a DST
    /// transition, and `OccurrenceError::Recurrence` if the engine fails. The
    /// cursor has already moved past the candidate, so pulling again resumes.
    pub fn advance(&mut self) -> Result<Option<Occurrence>, OccurrenceError> {
        if self.state == ScheduleState::Exhausted {
            return Ok(None);
        }

        loop {
            let Some(next) = self.occurrences.next() else {
                tracing::debug!(expression = %self.expression, "Schedule exhausted");
                self.state = ScheduleState::Exhausted;
                return Ok(None);
            };

            let occurrence = match next
                .map_err(OccurrenceError::from)
                .and_then(|local| localize(self.timezone, local))
            {
                Ok(occurrence) => occurrence,
                Err(err) => {
                    tracing::warn!(
                        error = %err,
                        expression = %self.expression,
                        "Occurrence could not be localized"
                    );
                    self.state = ScheduleState::Faulted;
                    return Err(err);
                }
            };

            match self.verdict(&occurrence) {
                FilterVerdict::Accept => {
                    tracing::trace!(%occurrence, "Occurrence accepted");
                    self.state = ScheduleState::Iterating;
                    return Ok(Some(occurrence));
                }
                FilterVerdict::Skip => {
                    tracing::trace!(%occurrence, "Occurrence filtered out");
                }
                FilterVerdict::Stop => {
                    tracing::debug!(%occurrence, "Filter ended the schedule");
                    self.state = ScheduleState::Exhausted;
                    return Ok(None);
                }
            }
        }
    }

    /// Runs every filter so a stopping filter is never masked by an earlier skip.
    fn verdict(&self, occurrence: &Occurrence) -> FilterVerdict {
        self.filters
            .iter()
            .map(|filter| filter.check(occurrence))
            .fold(FilterVerdict::Accept, FilterVerdict::and)
    }
}

impl Iterator for Schedule {
    type Item = Result<Occurrence, OccurrenceError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.advance().transpose()
    }
}

impl FusedIterator for Schedule {}

impl fmt::Display for Schedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Cron: {} @{} [{}->",
            self.expression,
            self.timezone,
            self.start.to_rfc3339()
        )?;
        match self.end {
            Some(end) => write!(f, "{}]", end.to_rfc3339()),
            None => f.write_str("open]"),
        }
    }
}

impl fmt::Debug for Schedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schedule")
            .field("expression", &self.expression)
            .field("timezone", &self.timezone)
            .field("start", &self.start)
            .field("end", &self.end)
            .field("filters", &self.filters.len())
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}
