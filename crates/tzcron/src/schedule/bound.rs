//! Start and end bounds as callers supply them.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeZone};

use crate::error::BoundParseError;

const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// A timestamp that may or may not carry a UTC offset.
///
/// Schedules only accept zoned bounds; the recurrence adapter only accepts
/// naive ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bound {
    Zoned(DateTime<FixedOffset>),
    Naive(NaiveDateTime),
}

impl<Z: TimeZone> From<DateTime<Z>> for Bound {
    fn from(value: DateTime<Z>) -> Self {
        Self::Zoned(value.fixed_offset())
    }
}

impl From<NaiveDateTime> for Bound {
    fn from(value: NaiveDateTime) -> Self {
        Self::Naive(value)
    }
}

impl FromStr for Bound {
    type Err = BoundParseError;

    /// Accepts RFC 3339 (zoned) or `YYYY-MM-DDTHH:MM:SS[.fff]` (naive).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Ok(zoned) = DateTime::parse_from_rfc3339(s) {
            return Ok(Self::Zoned(zoned));
        }
        NAIVE_FORMATS
            .iter()
            .find_map(|format| NaiveDateTime::parse_from_str(s, format).ok())
            .map(Self::Naive)
            .ok_or_else(|| BoundParseError(s.to_string()))
    }
}

impl fmt::Display for Bound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Zoned(zoned) => write!(f, "{}", zoned.to_rfc3339()),
            Self::Naive(naive) => write!(f, "{}", naive.format("%Y-%m-%dT%H:%M:%S%.f")),
        }
    }
}

/// Which end of the range a bound sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundKind {
    Start,
    End,
}

impl fmt::Display for BoundKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Start => "start",
            Self::End => "end",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};

    #[test]
    fn test_parse_rfc3339_is_zoned() {
        let bound: Bound = "2015-10-25T00:00:00+01:00".parse().expect("valid");
        let Bound::Zoned(zoned) = bound else {
            panic!("expected zoned bound, got {bound:?}");
        };
        assert_eq!(zoned.offset().local_minus_utc(), 3600);
        assert_eq!(zoned.with_timezone(&Utc).to_rfc3339(), "2015-10-24T23:00:00+00:00");
    }

    #[test]
    fn test_parse_without_offset_is_naive() {
        let expected = NaiveDate::from_ymd_opt(2016, 5, 31)
            .unwrap()
            .and_hms_milli_opt(12, 30, 0, 250)
            .unwrap();
        for text in ["2016-05-31T12:30:00.250", "2016-05-31 12:30:00.250"] {
            let bound: Bound = text.parse().expect(text);
            assert_eq!(bound, Bound::Naive(expected));
        }
    }

    #[test]
    fn test_parse_garbage_fails() {
        let err = "next tuesday".parse::<Bound>().expect_err("garbage");
        assert_eq!(err, BoundParseError("next tuesday".to_string()));
    }

    #[test]
    fn test_from_any_zone_is_zoned() {
        let london = chrono_tz::Tz::Europe__London
            .with_ymd_and_hms(2016, 7, 1, 12, 0, 0)
            .unwrap();
        let bound = Bound::from(london);
        assert!(matches!(bound, Bound::Zoned(_)));
        assert_eq!(bound.to_string(), "2016-07-01T12:00:00+01:00");
    }
}
