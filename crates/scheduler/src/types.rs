use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use taskflow_recurrence::RecurrenceRule;

use crate::error::SchedulerError;

/// Identifier of one recurring task template's schedule.
pub type ScheduleId = Uuid;

/// Opaque task template handed to the repository on every materialization.
pub type TemplatePayload = serde_json::Value;

/// Lifecycle state of a schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScheduleStatus {
    /// Waiting for `next_execution_time`.
    Active,
    /// Toggled off; `next_execution_time` is cleared.
    Disabled,
    /// No further occurrence within the lookahead. Terminal until the pattern changes.
    Exhausted,
}

/// Mutable scheduling state for one template, owned by the driver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleState {
    pub id: ScheduleId,
    pub rule: RecurrenceRule,
    /// Instant the pattern is relative to (template creation/start).
    pub anchor_time: DateTime<Utc>,
    pub next_execution_time: Option<DateTime<Utc>>,
    pub last_fired_time: Option<DateTime<Utc>>,
    pub status: ScheduleStatus,
    #[serde(default)]
    pub template: TemplatePayload,
}

impl ScheduleState {
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.status == ScheduleStatus::Active
            && self.next_execution_time.is_some_and(|next| next <= now)
    }
}

/// Input for registering a template's schedule.
#[derive(Debug, Clone, PartialEq)]
pub struct NewSchedule {
    /// Reuse an existing template id; a fresh v4 id is generated when absent.
    pub id: Option<ScheduleId>,
    pub rule: RecurrenceRule,
    pub anchor_time: DateTime<Utc>,
    pub template: TemplatePayload,
}

/// Dedup key for one materialization: a schedule fires each occurrence once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MaterializationKey {
    pub schedule_id: ScheduleId,
    pub occurrence: DateTime<Utc>,
}

/// Request to create one concrete task instance for an occurrence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterializeTask {
    pub schedule_id: ScheduleId,
    pub occurrence: DateTime<Utc>,
    pub template: TemplatePayload,
}

impl MaterializeTask {
    pub fn key(&self) -> MaterializationKey {
        MaterializationKey {
            schedule_id: self.schedule_id,
            occurrence: self.occurrence,
        }
    }
}

/// Outcome of one driver tick.
#[derive(Debug, Default)]
pub struct TickReport {
    pub now: Option<DateTime<Utc>>,
    /// Occurrences materialized (or already present in the repository).
    pub fired: Vec<MaterializationKey>,
    /// Occurrences the repository reported as already created.
    pub duplicates: usize,
    /// Schedules that ran out of occurrences during this tick.
    pub exhausted: Vec<ScheduleId>,
    /// Repository failures, concurrency violations and lock errors.
    pub errors: Vec<SchedulerError>,
}

impl TickReport {
    pub fn is_idle(&self) -> bool {
        self.fired.is_empty() && self.exhausted.is_empty() && self.errors.is_empty()
    }
}
