use thiserror::Error;

/// Errors produced while building a rule or searching for an occurrence.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RecurrenceError {
    #[error("Recurrence type is required")]
    MissingType,

    #[error("Unknown recurrence type '{0}'")]
    UnknownType(String),

    #[error("Interval must be at least 1, got {0}")]
    InvalidInterval(i64),

    #[error("Day of week must be in 1..=7 (Monday..Sunday), got {0}")]
    InvalidDayOfWeek(i64),

    #[error("Day of month must be in 1..=31, got {0}")]
    InvalidDayOfMonth(i64),

    #[error("Hour must be in 0..=23, got {0}")]
    InvalidHour(i64),

    #[error("Minute must be in 0..=59, got {0}")]
    InvalidMinute(i64),

    #[error("No occurrence found within {horizon_days} days of lookahead")]
    Exhausted { horizon_days: i64 },
}

impl RecurrenceError {
    /// Whether this error rejects the rule shape (as opposed to a search failure).
    pub fn is_validation(&self) -> bool {
        !matches!(self, RecurrenceError::Exhausted { .. })
    }
}

pub type Result<T> = std::result::Result<T, RecurrenceError>;
