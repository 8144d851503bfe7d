//! Minute-level recurrence expansion using the `rrule` crate.
//!
//! Works purely on naive local wall time: the engine is fed UTC-tagged
//! datetimes that stand in for local time, and results are stripped back to
//! `NaiveDateTime` before they leave this module.

use std::collections::VecDeque;

use chrono::{DateTime, Month, NaiveDateTime, TimeDelta, TimeZone, Timelike, Weekday};
use rrule::{Frequency, NWeekday, RRule, Tz, Unvalidated};

use crate::cron::RecurrenceSpec;
use crate::error::RecurrenceError;
use crate::schedule::Bound;

/// Occurrences requested from the engine per pull.
const BATCH_SIZE: u16 = 256;

/// Lazy, ascending sequence of naive minute-aligned timestamps.
#[derive(Debug, Clone)]
pub struct RecurrenceAdapter {
    spec: RecurrenceSpec,
    /// Inclusive lower bound of the next batch; `None` once exhausted.
    cursor: Option<NaiveDateTime>,
    until: Option<NaiveDateTime>,
    pending: VecDeque<NaiveDateTime>,
}

impl RecurrenceAdapter {
    /// ## Summary
    /// Builds the sequence for `spec` between naive local `start` and `end`
    /// (both inclusive).
    ///
    /// A start that sits on a whole second with a fractional remainder is
    /// moved one second forward, so the minute it falls in is never produced.
    /// The engine rule is validated up front.
    ///
    /// ## Errors
    /// Returns `RecurrenceError::ZonedBound` if either bound carries an
    /// offset, or `RecurrenceError::Engine` if the engine rejects the rule.
    pub fn build(
        spec: &RecurrenceSpec,
        start: Bound,
        end: Option<Bound>,
    ) -> Result<Self, RecurrenceError> {
        let start = naive_bound(start)?;
        let until = end.map(naive_bound).transpose()?;

        let start = if start.second() == 0 && start.nanosecond() != 0 {
            start + TimeDelta::seconds(1)
        } else {
            start
        };
        let start = start.with_nanosecond(0).unwrap_or(start);

        engine_rule(spec).build(engine_time(start))?;

        let cursor = match until {
            Some(until) if until < start => None,
            _ => Some(start),
        };
        tracing::trace!(%start, ?until, "Built recurrence adapter");

        Ok(Self {
            spec: spec.clone(),
            cursor,
            until,
            pending: VecDeque::new(),
        })
    }

    fn refill(&mut self) -> Result<(), RecurrenceError> {
        let Some(cursor) = self.cursor else {
            return Ok(());
        };
        if self.until.is_some_and(|until| until < cursor) {
            self.cursor = None;
            return Ok(());
        }

        let mut rule = engine_rule(&self.spec);
        if let Some(until) = self.until {
            rule = rule.until(engine_time(until));
        }
        let batch = rule.build(engine_time(cursor))?.all(BATCH_SIZE);
        tracing::trace!(%cursor, produced = batch.dates.len(), "Pulled recurrence batch");

        self.cursor = batch
            .dates
            .last()
            .map(|last| last.naive_local() + TimeDelta::minutes(1));
        self.pending
            .extend(batch.dates.iter().map(DateTime::naive_local));
        Ok(())
    }
}

impl Iterator for RecurrenceAdapter {
    type Item = Result<NaiveDateTime, RecurrenceError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.pending.is_empty() {
            if let Err(err) = self.refill() {
                self.cursor = None;
                return Some(Err(err));
            }
        }
        self.pending.pop_front().map(Ok)
    }
}

fn naive_bound(bound: Bound) -> Result<NaiveDateTime, RecurrenceError> {
    match bound {
        Bound::Naive(naive) => Ok(naive),
        Bound::Zoned(zoned) => Err(RecurrenceError::ZonedBound(zoned)),
    }
}

/// Naive local time tagged as UTC, which the engine iterates without DST.
fn engine_time(local: NaiveDateTime) -> DateTime<Tz> {
    Tz::UTC.from_utc_datetime(&local)
}

fn engine_rule(spec: &RecurrenceSpec) -> RRule<Unvalidated> {
    let mut rule = RRule::new(Frequency::Minutely).by_second(RecurrenceSpec::SECONDS.to_vec());

    if let Some(minutes) = &spec.minutes {
        rule = rule.by_minute(minutes.iter().copied().collect());
    }
    if let Some(hours) = &spec.hours {
        rule = rule.by_hour(hours.iter().copied().collect());
    }
    if let Some(month_days) = &spec.month_days {
        rule = rule.by_month_day(
            month_days
                .iter()
                .filter_map(|day| i8::try_from(*day).ok())
                .collect(),
        );
    }
    if let Some(months) = &spec.months {
        let months: Vec<Month> = months
            .iter()
            .filter_map(|month| Month::try_from(*month).ok())
            .collect();
        rule = rule.by_month(&months);
    }
    if let Some(weekdays) = &spec.weekdays {
        rule = rule.by_weekday(
            weekdays
                .iter()
                .filter_map(|day| Weekday::try_from(*day).ok())
                .map(NWeekday::Every)
                .collect(),
        );
    }

    rule
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cron::parse_recurrence;
    use chrono::{Datelike, NaiveDate, Utc};

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, s)
            .unwrap()
    }

    fn adapter(
        expression: &str,
        start: NaiveDateTime,
        end: Option<NaiveDateTime>,
    ) -> RecurrenceAdapter {
        let spec = parse_recurrence(expression).expect("valid expression");
        RecurrenceAdapter::build(&spec, Bound::Naive(start), end.map(Bound::Naive))
            .expect("adapter should build")
    }

    fn take(adapter: RecurrenceAdapter, n: usize) -> Vec<NaiveDateTime> {
        adapter
            .take(n)
            .collect::<Result<Vec<_>, _>>()
            .expect("no engine errors")
    }

    #[test]
    fn test_start_on_whole_minute_is_inclusive() {
        let start = at(2016, 1, 1, 5, 0, 0);
        assert_eq!(take(adapter("* * * * * *", start, None), 1), vec![start]);
    }

    #[test]
    fn test_fractional_start_skips_its_own_minute() {
        let start = at(2016, 1, 1, 5, 0, 0) + TimeDelta::milliseconds(500);
        assert_eq!(
            take(adapter("* * * * * *", start, None), 1),
            vec![at(2016, 1, 1, 5, 1, 0)]
        );
    }

    #[test]
    fn test_mid_minute_start_moves_to_next_minute() {
        let start = at(2016, 1, 1, 5, 0, 30);
        assert_eq!(
            take(adapter("* * * * * *", start, None), 1),
            vec![at(2016, 1, 1, 5, 1, 0)]
        );
    }

    #[test]
    fn test_sequence_spans_batches_without_gaps() {
        let start = at(2016, 1, 1, 0, 0, 0);
        let minutes = take(adapter("* * * * * *", start, None), 600);
        assert_eq!(minutes.len(), 600);
        for (i, minute) in minutes.iter().enumerate() {
            let offset = i64::try_from(i).unwrap();
            assert_eq!(*minute, start + TimeDelta::minutes(offset));
        }
    }

    #[test]
    fn test_weekday_zero_is_monday() {
        // 2016-05-30 is a Monday
        let start = at(2016, 5, 30, 0, 0, 0);
        let sundays = take(adapter("0 0 * * SUN *", start, None), 2);
        assert_eq!(sundays, vec![at(2016, 6, 5, 0, 0, 0), at(2016, 6, 12, 0, 0, 0)]);
        assert!(sundays.iter().all(|d| d.weekday() == Weekday::Sun));
    }

    #[test]
    fn test_month_day_and_weekday_must_both_match() {
        let start = at(2016, 1, 1, 0, 0, 0);
        // First Friday the 13th of 2016
        assert_eq!(
            take(adapter("0 0 13 * FRI *", start, None), 1),
            vec![at(2016, 5, 13, 0, 0, 0)]
        );
    }

    #[test]
    fn test_end_bound_is_inclusive() {
        let start = at(2016, 1, 1, 0, 0, 0);
        let end = at(2016, 1, 1, 3, 0, 0);
        let hours: Vec<_> = adapter("0 * * * * *", start, Some(end))
            .collect::<Result<_, _>>()
            .expect("no engine errors");
        assert_eq!(
            hours,
            vec![
                at(2016, 1, 1, 0, 0, 0),
                at(2016, 1, 1, 1, 0, 0),
                at(2016, 1, 1, 2, 0, 0),
                at(2016, 1, 1, 3, 0, 0),
            ]
        );
    }

    #[test]
    fn test_end_before_start_is_empty() {
        let start = at(2016, 1, 2, 0, 0, 0);
        let end = at(2016, 1, 1, 0, 0, 0);
        assert_eq!(adapter("* * * * * *", start, Some(end)).count(), 0);
    }

    #[test]
    fn test_zoned_bounds_are_rejected() {
        let spec = parse_recurrence("* * * * * *").expect("valid");
        let zoned = Bound::from(Utc::now());

        let err = RecurrenceAdapter::build(&spec, zoned, None).expect_err("zoned start");
        assert!(matches!(err, RecurrenceError::ZonedBound(_)));

        let naive = Bound::Naive(at(2016, 1, 1, 0, 0, 0));
        let err = RecurrenceAdapter::build(&spec, naive, Some(zoned)).expect_err("zoned end");
        assert!(matches!(err, RecurrenceError::ZonedBound(_)));
    }
}
