//! Grammar shared by the five scheduling fields of a cron expression.
//!
//! Each comma-separated item is `(<number>|*)[-<number>][/<step>]`, after the
//! field's symbolic names (`JAN`, `MON`, ...) have been substituted.

use std::collections::BTreeSet;
use std::fmt;

use crate::error::ExpressionError;

/// One of the five scheduling fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    Minute,
    Hour,
    MonthDay,
    Month,
    Weekday,
}

impl FieldKind {
    /// Fields in expression order.
    pub const ALL: [Self; 5] = [
        Self::Minute,
        Self::Hour,
        Self::MonthDay,
        Self::Month,
        Self::Weekday,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Minute => "minute",
            Self::Hour => "hour",
            Self::MonthDay => "month-day",
            Self::Month => "month",
            Self::Weekday => "weekday",
        }
    }

    /// Bounds and replacement table for this field.
    #[must_use]
    pub const fn spec(self) -> &'static FieldSpec {
        match self {
            Self::Minute => &MINUTE,
            Self::Hour => &HOUR,
            Self::MonthDay => &MONTH_DAY,
            Self::Month => &MONTH,
            Self::Weekday => &WEEKDAY,
        }
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Inclusive bounds of a field plus its symbolic names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub kind: FieldKind,
    pub min: u8,
    pub max: u8,
    /// Upper-case name to numeric text, applied as substring replacements.
    pub replacements: &'static [(&'static str, &'static str)],
}

const MONTH_NAMES: &[(&str, &str)] = &[
    ("JAN", "1"),
    ("FEB", "2"),
    ("MAR", "3"),
    ("APR", "4"),
    ("MAY", "5"),
    ("JUN", "6"),
    ("JUL", "7"),
    ("AUG", "8"),
    ("SEP", "9"),
    ("OCT", "10"),
    ("NOV", "11"),
    ("DEC", "12"),
];

// Monday = 1, Sunday = 7
const WEEKDAY_NAMES: &[(&str, &str)] = &[
    ("MON", "1"),
    ("TUE", "2"),
    ("WED", "3"),
    ("THU", "4"),
    ("FRI", "5"),
    ("SAT", "6"),
    ("SUN", "7"),
];

pub const MINUTE: FieldSpec = FieldSpec {
    kind: FieldKind::Minute,
    min: 0,
    max: 59,
    replacements: &[],
};

pub const HOUR: FieldSpec = FieldSpec {
    kind: FieldKind::Hour,
    min: 0,
    max: 23,
    replacements: &[],
};

pub const MONTH_DAY: FieldSpec = FieldSpec {
    kind: FieldKind::MonthDay,
    min: 1,
    max: 31,
    replacements: &[],
};

pub const MONTH: FieldSpec = FieldSpec {
    kind: FieldKind::Month,
    min: 1,
    max: 12,
    replacements: MONTH_NAMES,
};

pub const WEEKDAY: FieldSpec = FieldSpec {
    kind: FieldKind::Weekday,
    min: 1,
    max: 7,
    replacements: WEEKDAY_NAMES,
};

/// A single list item after name substitution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Item {
    /// `None` for `*`.
    start: Option<u32>,
    end: Option<u32>,
    step: u32,
}

impl Item {
    /// Matches `(<number>|*)[-<number>][/<step>]` against the whole item.
    fn parse(item: &str) -> Option<Self> {
        let (range, step) = match item.split_once('/') {
            Some((range, step)) => (range, Some(number(step)?)),
            None => (item, None),
        };
        let (start, end) = match range.split_once('-') {
            Some((start, end)) => (start, Some(number(end)?)),
            None => (range, None),
        };
        let start = if start == "*" {
            None
        } else {
            Some(number(start)?)
        };
        let step = step.unwrap_or(1);
        if step == 0 {
            return None;
        }

        Some(Self { start, end, step })
    }
}

/// Parses a run of ASCII digits. Values too large for `u32` saturate so
/// they are reported as out of range rather than as bad grammar.
fn number(text: &str) -> Option<u32> {
    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some(text.parse::<u32>().unwrap_or(u32::MAX))
}

impl FieldSpec {
    /// ## Summary
    /// Parses a field token into the sorted set of values it selects.
    ///
    /// Comma-separated items are expanded independently and merged, so
    /// overlapping ranges deduplicate silently.
    ///
    /// ## Errors
    /// Returns `ExpressionError::Grammar` for tokens that do not match the
    /// item grammar (including empty items and a zero step),
    /// `ExpressionError::EmptyRange` for a range ending before it starts and
    /// `ExpressionError::OutOfRange` for values outside the field bounds.
    pub fn parse(&self, token: &str) -> Result<BTreeSet<u8>, ExpressionError> {
        let mut values = BTreeSet::new();
        for item in token.split(',') {
            self.expand_item(item, &mut values)?;
        }

        tracing::trace!(field = %self.kind, token, ?values, "Parsed cron field");
        Ok(values)
    }

    fn expand_item(&self, item: &str, values: &mut BTreeSet<u8>) -> Result<(), ExpressionError> {
        let normalized = self.substitute_names(item);
        let parsed = Item::parse(&normalized).ok_or_else(|| ExpressionError::Grammar {
            field: self.kind,
            token: normalized.clone(),
        })?;

        let (start, end) = match parsed.start {
            None => (u32::from(self.min), u32::from(self.max)),
            Some(start) => (start, parsed.end.unwrap_or(start)),
        };
        if end < start {
            return Err(ExpressionError::EmptyRange {
                field: self.kind,
                token: normalized,
            });
        }

        let step = usize::try_from(parsed.step).unwrap_or(usize::MAX);
        for value in (start..=end).step_by(step) {
            let value = u8::try_from(value)
                .ok()
                .filter(|value| (self.min..=self.max).contains(value))
                .ok_or_else(|| self.out_of_range(&normalized))?;
            values.insert(value);
        }

        Ok(())
    }

    fn substitute_names(&self, item: &str) -> String {
        let mut normalized = item.to_ascii_uppercase();
        for (name, number) in self.replacements {
            normalized = normalized.replace(name, number);
        }
        normalized
    }

    fn out_of_range(&self, token: &str) -> ExpressionError {
        ExpressionError::OutOfRange {
            field: self.kind,
            token: token.to_string(),
            min: self.min,
            max: self.max,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(spec: &FieldSpec, token: &str) -> Vec<u8> {
        spec.parse(token)
            .expect("token should parse")
            .into_iter()
            .collect()
    }

    #[test]
    fn test_single_value() {
        assert_eq!(values(&MINUTE, "5"), vec![5]);
        assert_eq!(values(&HOUR, "0"), vec![0]);
    }

    #[test]
    fn test_list_with_overlap_is_deduplicated_and_sorted() {
        assert_eq!(values(&HOUR, "1,3-5,4"), vec![1, 3, 4, 5]);
        assert_eq!(values(&MINUTE, "1,3-6,8"), vec![1, 3, 4, 5, 6, 8]);
        assert_eq!(values(&MINUTE, "9,1-3,0-10/2"), vec![0, 1, 2, 3, 4, 6, 8, 9, 10]);
    }

    #[test]
    fn test_wildcard_covers_field_bounds() {
        assert_eq!(values(&WEEKDAY, "*"), vec![1, 2, 3, 4, 5, 6, 7]);
        assert_eq!(values(&MONTH_DAY, "*").len(), 31);
    }

    #[test]
    fn test_step_over_wildcard_uses_full_bounds() {
        assert_eq!(values(&HOUR, "*/6"), vec![0, 6, 12, 18]);
        assert_eq!(values(&MONTH, "*/5"), vec![1, 6, 11]);
    }

    #[test]
    fn test_step_over_range_includes_end_when_aligned() {
        assert_eq!(values(&MINUTE, "10-20/5"), vec![10, 15, 20]);
        assert_eq!(values(&MINUTE, "10-21/5"), vec![10, 15, 20]);
    }

    #[test]
    fn test_names_are_case_insensitive() {
        assert_eq!(values(&WEEKDAY, "FRI"), vec![5]);
        assert_eq!(values(&WEEKDAY, "fri"), vec![5]);
        assert_eq!(values(&WEEKDAY, "Fri"), vec![5]);
        assert_eq!(values(&MONTH, "jun"), vec![6]);
    }

    #[test]
    fn test_names_substitute_inside_ranges() {
        assert_eq!(values(&MONTH, "JAN-MAR"), vec![1, 2, 3]);
        assert_eq!(values(&MONTH, "oct-dec"), vec![10, 11, 12]);
        assert_eq!(values(&WEEKDAY, "MON-FRI/2"), vec![1, 3, 5]);
    }

    #[test]
    fn test_out_of_range_values_are_rejected() {
        for (spec, token) in [
            (&MINUTE, "60"),
            (&HOUR, "24"),
            (&MONTH_DAY, "32"),
            (&MONTH_DAY, "0"),
            (&MONTH, "13"),
            (&MONTH, "0"),
            (&WEEKDAY, "0"),
            (&WEEKDAY, "8"),
            (&HOUR, "20-25"),
            (&MINUTE, "99999999999"),
        ] {
            let err = spec.parse(token).expect_err(token);
            assert!(
                matches!(err, ExpressionError::OutOfRange { field, .. } if field == spec.kind),
                "{token}: {err}"
            );
        }
    }

    #[test]
    fn test_bad_grammar_is_rejected() {
        for token in ["", "-1", "1,,2", "a", "1-", "/2", "*/0", "1-2-3", "5/2/1", " 5"] {
            let err = MINUTE.parse(token).expect_err(token);
            assert!(matches!(err, ExpressionError::Grammar { .. }), "{token}: {err}");
        }
    }

    #[test]
    fn test_names_of_other_fields_are_rejected() {
        assert!(MONTH.parse("MON").is_err());
        assert!(WEEKDAY.parse("JAN").is_err());
        assert!(WEEKDAY.parse("DOM").is_err());
        assert!(MONTH.parse("LUN").is_err());
    }

    #[test]
    fn test_reversed_range_is_rejected() {
        let err = HOUR.parse("5-3").expect_err("reversed range");
        assert_eq!(
            err,
            ExpressionError::EmptyRange {
                field: FieldKind::Hour,
                token: "5-3".to_string(),
            }
        );
    }

    #[test]
    fn test_error_message_names_field_and_token() {
        let err = MONTH.parse("13").expect_err("out of range");
        assert_eq!(
            err.to_string(),
            "invalid expression: \"13\" produces month values outside 1-12"
        );
    }

    #[test]
    fn test_kind_lookup_matches_constants() {
        for kind in FieldKind::ALL {
            assert_eq!(kind.spec().kind, kind);
        }
    }
}
