//! Persistence seam between the driver and the task store.
//!
//! The driver never talks to a database directly. Hosts implement
//! [`TaskRepository`] over their template table; [`InMemoryTaskRepository`]
//! backs tests and the demo worker.

mod memory;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::types::{MaterializeTask, ScheduleId, ScheduleState};

pub use self::memory::InMemoryTaskRepository;

/// Error type for repository calls.
#[derive(Error, Debug)]
pub enum RepositoryError {
    #[error("Schedule not found: {0}")]
    NotFound(ScheduleId),

    #[error("Repository unavailable: {0}")]
    Unavailable(String),

    #[error("Lock poisoned: {0}")]
    LockPoisoned(String),
}

/// Result of a materialization request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaterializeOutcome {
    /// A new task instance was created.
    Created,
    /// The `(schedule_id, occurrence)` key was already materialized; nothing created.
    Duplicate,
}

/// Storage collaborator for schedules and materialized tasks.
///
/// Implementations must deduplicate on [`MaterializeTask::key`] so a retried
/// firing never creates a second task for the same occurrence.
pub trait TaskRepository: Send + Sync {
    /// Create one concrete task instance for an occurrence.
    fn materialize_task(&self, task: &MaterializeTask) -> Result<MaterializeOutcome, RepositoryError>;

    /// Persist the occurrence cursor of a schedule.
    fn write_cursor(
        &self,
        id: ScheduleId,
        next_execution_time: Option<DateTime<Utc>>,
        last_fired_time: Option<DateTime<Utc>>,
    ) -> Result<(), RepositoryError>;

    /// Persist the template's recurrence enable flag.
    fn write_recurrence_enabled(&self, id: ScheduleId, enabled: bool) -> Result<(), RepositoryError>;

    /// Insert or replace the full schedule record (creation and pattern edits).
    fn save_schedule(&self, state: &ScheduleState) -> Result<(), RepositoryError>;

    /// Remove a schedule record.
    fn delete_schedule(&self, id: ScheduleId) -> Result<(), RepositoryError>;

    /// Load every stored schedule, e.g. on host start.
    fn load_schedules(&self) -> Result<Vec<ScheduleState>, RepositoryError>;
}
