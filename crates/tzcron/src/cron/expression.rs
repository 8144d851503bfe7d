//! Six-field expression parsing.
//!
//! ```text
//! * * * * * *
//! | | | | | |
//! | | | | | +-- year (yyyy or * for any)
//! | | | | +---- weekday (1-7, Monday to Sunday)
//! | | | +------ month (1-12)
//! | | +-------- month-day (1-31)
//! | +---------- hour (0-23)
//! +------------ minute (0-59)
//! ```

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use super::field::FieldKind;
use crate::error::ExpressionError;
use crate::filter::YearFilter;

const FIELD_COUNT: usize = 6;

/// Per-dimension constraints handed to the recurrence engine.
///
/// `None` means the dimension is unconstrained (the token was `*`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecurrenceSpec {
    pub minutes: Option<BTreeSet<u8>>,
    pub hours: Option<BTreeSet<u8>>,
    pub month_days: Option<BTreeSet<u8>>,
    pub months: Option<BTreeSet<u8>>,
    /// 0-based, Monday = 0, unlike the 1-based expression syntax.
    pub weekdays: Option<BTreeSet<u8>>,
}

impl RecurrenceSpec {
    /// Occurrences always fire on the whole minute.
    pub const SECONDS: [u8; 1] = [0];

    fn from_fields(fields: [&str; 5]) -> Result<Self, ExpressionError> {
        let [minute, hour, month_day, month, weekday] = fields;

        Ok(Self {
            minutes: constrain(FieldKind::Minute, minute)?,
            hours: constrain(FieldKind::Hour, hour)?,
            month_days: constrain(FieldKind::MonthDay, month_day)?,
            months: constrain(FieldKind::Month, month)?,
            weekdays: constrain(FieldKind::Weekday, weekday)?
                .map(|days| days.into_iter().map(|day| day - 1).collect()),
        })
    }
}

fn constrain(kind: FieldKind, token: &str) -> Result<Option<BTreeSet<u8>>, ExpressionError> {
    if token == "*" {
        return Ok(None);
    }
    kind.spec().parse(token).map(Some)
}

fn split_fields(expression: &str) -> Result<[&str; FIELD_COUNT], ExpressionError> {
    let tokens: Vec<&str> = expression.split(' ').collect();
    <[&str; FIELD_COUNT]>::try_from(tokens).map_err(|tokens| ExpressionError::FieldCount {
        expression: expression.to_string(),
        found: tokens.len(),
    })
}

/// ## Summary
/// Parses the five scheduling fields of an expression into a [`RecurrenceSpec`].
///
/// The sixth (year) token must be present but is not interpreted here.
///
/// ## Errors
/// Returns an `ExpressionError` for a wrong field count or an invalid field.
pub fn parse_recurrence(expression: &str) -> Result<RecurrenceSpec, ExpressionError> {
    let [minute, hour, month_day, month, weekday, _year] = split_fields(expression)?;
    RecurrenceSpec::from_fields([minute, hour, month_day, month, weekday])
}

/// A parsed, immutable cron expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CronExpression {
    source: String,
    recurrence: RecurrenceSpec,
    year: YearFilter,
}

impl CronExpression {
    /// ## Summary
    /// Parses a six-field expression.
    ///
    /// ## Errors
    /// Returns an `ExpressionError` for a wrong field count, an invalid field
    /// or a year token that is neither `*` nor a year.
    pub fn parse(expression: &str) -> Result<Self, ExpressionError> {
        let [minute, hour, month_day, month, weekday, year] = split_fields(expression)?;
        let recurrence = RecurrenceSpec::from_fields([minute, hour, month_day, month, weekday])?;
        let year = YearFilter::parse(year)?;

        tracing::debug!(expression, ?recurrence, %year, "Parsed cron expression");
        Ok(Self {
            source: expression.to_string(),
            recurrence,
            year,
        })
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.source
    }

    #[must_use]
    pub const fn recurrence(&self) -> &RecurrenceSpec {
        &self.recurrence
    }

    #[must_use]
    pub const fn year(&self) -> YearFilter {
        self.year
    }
}

impl FromStr for CronExpression {
    type Err = ExpressionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for CronExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}
