//! Recurring task rules and next-occurrence calculation.
//!
//! This crate provides:
//! - [`RecurrenceRule`]: a validated, immutable repetition pattern built from
//!   the raw template payload ([`RawRecurrence`])
//! - [`OccurrenceCalculator`]: pure next-occurrence search over hourly, daily,
//!   weekly and monthly cycles in a fixed civil-time offset
//!
//! Nothing here reads the wall clock or touches storage; the scheduler crate
//! owns orchestration.

pub mod calculator;
pub mod error;
pub mod rule;

pub use calculator::OccurrenceCalculator;
pub use error::RecurrenceError;
pub use rule::{RawRecurrence, RawType, RecurrenceRule, RecurrenceType, RuleBuilder};
