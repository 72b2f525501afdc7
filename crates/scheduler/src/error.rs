use chrono::{DateTime, Utc};
use thiserror::Error;

use taskflow_recurrence::RecurrenceError;

use crate::repository::RepositoryError;
use crate::types::ScheduleId;

/// Error type for driver operations.
#[derive(Error, Debug)]
pub enum SchedulerError {
    #[error("Unknown schedule: {0}")]
    UnknownSchedule(ScheduleId),

    #[error("Schedule already registered: {0}")]
    DuplicateSchedule(ScheduleId),

    #[error("Schedule {0} is exhausted; update its pattern to resume")]
    ScheduleExhausted(ScheduleId),

    #[error("Recurrence error: {0}")]
    Rule(#[from] RecurrenceError),

    #[error(
        "Concurrency violation on schedule {schedule_id}: occurrence {occurrence} is not after last firing {last_fired}"
    )]
    ConcurrencyViolation {
        schedule_id: ScheduleId,
        occurrence: DateTime<Utc>,
        last_fired: DateTime<Utc>,
    },

    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),

    #[error("Lock poisoned: {0}")]
    LockPoisoned(String),

    #[error("Thread pool error: {0}")]
    ThreadPool(String),
}

pub type Result<T> = std::result::Result<T, SchedulerError>;
