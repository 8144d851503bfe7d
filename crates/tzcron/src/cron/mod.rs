//! Cron/quartz expression grammar.

pub mod expression;
pub mod field;

pub use expression::{CronExpression, RecurrenceSpec, parse_recurrence};
pub use field::{FieldKind, FieldSpec};
