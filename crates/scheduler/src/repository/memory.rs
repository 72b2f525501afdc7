//! In-memory [`TaskRepository`] with `(schedule_id, occurrence)` deduplication.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, RwLock};

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::types::{MaterializationKey, MaterializeTask, ScheduleId, ScheduleState, ScheduleStatus};

use super::{MaterializeOutcome, RepositoryError, TaskRepository};

#[derive(Debug, Default)]
pub struct InMemoryTaskRepository {
    schedules: RwLock<HashMap<ScheduleId, ScheduleState>>,
    tasks: Mutex<Vec<MaterializeTask>>,
    seen: Mutex<HashSet<MaterializationKey>>,
    /// Number of upcoming `materialize_task` calls that fail (test hook).
    failures_pending: AtomicUsize,
    /// Number of upcoming `write_cursor` calls that fail (test hook).
    cursor_failures_pending: AtomicUsize,
}

impl InMemoryTaskRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `count` materializations fail with `Unavailable`.
    pub fn fail_next_materializations(&self, count: usize) {
        self.failures_pending.store(count, Ordering::SeqCst);
    }

    /// Make the next `count` cursor writes fail with `Unavailable`.
    pub fn fail_next_cursor_writes(&self, count: usize) {
        self.cursor_failures_pending.store(count, Ordering::SeqCst);
    }

    /// Snapshot of all materialized tasks, in creation order.
    pub fn tasks(&self) -> Vec<MaterializeTask> {
        self.tasks.lock().map(|t| t.clone()).unwrap_or_default()
    }

    /// Tasks materialized for one schedule, in creation order.
    pub fn tasks_for(&self, id: ScheduleId) -> Vec<MaterializeTask> {
        self.tasks()
            .into_iter()
            .filter(|t| t.schedule_id == id)
            .collect()
    }

    /// Stored record for one schedule.
    pub fn schedule(&self, id: ScheduleId) -> Option<ScheduleState> {
        self.schedules.read().ok()?.get(&id).cloned()
    }

    fn take_failure(pending: &AtomicUsize) -> bool {
        pending
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }

    fn with_record<F>(&self, id: ScheduleId, f: F) -> Result<(), RepositoryError>
    where
        F: FnOnce(&mut ScheduleState),
    {
        let mut schedules = self
            .schedules
            .write()
            .map_err(|e| RepositoryError::LockPoisoned(format!("schedules write lock: {}", e)))?;
        let record = schedules.get_mut(&id).ok_or(RepositoryError::NotFound(id))?;
        f(record);
        Ok(())
    }
}

impl TaskRepository for InMemoryTaskRepository {
    fn materialize_task(&self, task: &MaterializeTask) -> Result<MaterializeOutcome, RepositoryError> {
        if Self::take_failure(&self.failures_pending) {
            return Err(RepositoryError::Unavailable("injected failure".to_string()));
        }

        let mut seen = self
            .seen
            .lock()
            .map_err(|e| RepositoryError::LockPoisoned(format!("dedup set lock: {}", e)))?;
        if !seen.insert(task.key()) {
            debug!(schedule_id = %task.schedule_id, occurrence = %task.occurrence, "duplicate materialization ignored");
            return Ok(MaterializeOutcome::Duplicate);
        }

        self.tasks
            .lock()
            .map_err(|e| RepositoryError::LockPoisoned(format!("tasks lock: {}", e)))?
            .push(task.clone());
        Ok(MaterializeOutcome::Created)
    }

    fn write_cursor(
        &self,
        id: ScheduleId,
        next_execution_time: Option<DateTime<Utc>>,
        last_fired_time: Option<DateTime<Utc>>,
    ) -> Result<(), RepositoryError> {
        if Self::take_failure(&self.cursor_failures_pending) {
            return Err(RepositoryError::Unavailable("injected cursor failure".to_string()));
        }
        self.with_record(id, |record| {
            record.next_execution_time = next_execution_time;
            record.last_fired_time = last_fired_time;
            if next_execution_time.is_none() && record.status == ScheduleStatus::Active {
                record.status = ScheduleStatus::Exhausted;
            }
        })
    }

    fn write_recurrence_enabled(&self, id: ScheduleId, enabled: bool) -> Result<(), RepositoryError> {
        self.with_record(id, |record| {
            record.rule = record.rule.with_enabled(enabled);
            record.status = match (enabled, record.status) {
                (false, _) => ScheduleStatus::Disabled,
                (true, ScheduleStatus::Disabled) => ScheduleStatus::Active,
                (true, status) => status,
            };
        })
    }

    fn save_schedule(&self, state: &ScheduleState) -> Result<(), RepositoryError> {
        self.schedules
            .write()
            .map_err(|e| RepositoryError::LockPoisoned(format!("schedules write lock: {}", e)))?
            .insert(state.id, state.clone());
        Ok(())
    }

    fn delete_schedule(&self, id: ScheduleId) -> Result<(), RepositoryError> {
        self.schedules
            .write()
            .map_err(|e| RepositoryError::LockPoisoned(format!("schedules write lock: {}", e)))?
            .remove(&id)
            .map(|_| ())
            .ok_or(RepositoryError::NotFound(id))
    }

    fn load_schedules(&self) -> Result<Vec<ScheduleState>, RepositoryError> {
        let schedules = self
            .schedules
            .read()
            .map_err(|e| RepositoryError::LockPoisoned(format!("schedules read lock: {}", e)))?;
        Ok(schedules.values().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use uuid::Uuid;

    use taskflow_recurrence::{RecurrenceRule, RecurrenceType};

    use super::*;

    fn task(id: ScheduleId, occurrence: &str) -> MaterializeTask {
        MaterializeTask {
            schedule_id: id,
            occurrence: occurrence.parse().unwrap(),
            template: serde_json::json!({ "title": "Standup" }),
        }
    }

    fn record(id: ScheduleId) -> ScheduleState {
        ScheduleState {
            id,
            rule: RecurrenceRule::builder(RecurrenceType::Daily).build().unwrap(),
            anchor_time: Utc::now(),
            next_execution_time: None,
            last_fired_time: None,
            status: ScheduleStatus::Active,
            template: serde_json::Value::Null,
        }
    }

    #[test]
    fn materialize_dedupes_on_key() {
        let repo = InMemoryTaskRepository::new();
        let id = Uuid::new_v4();

        let first = repo.materialize_task(&task(id, "2024-01-01T09:00:00Z")).unwrap();
        let again = repo.materialize_task(&task(id, "2024-01-01T09:00:00Z")).unwrap();
        let other = repo.materialize_task(&task(id, "2024-01-02T09:00:00Z")).unwrap();

        assert_eq!(first, MaterializeOutcome::Created);
        assert_eq!(again, MaterializeOutcome::Duplicate);
        assert_eq!(other, MaterializeOutcome::Created);
        assert_eq!(repo.tasks_for(id).len(), 2);
    }

    #[test]
    fn injected_failures_are_consumed() {
        let repo = InMemoryTaskRepository::new();
        let id = Uuid::new_v4();
        repo.fail_next_materializations(1);

        assert!(repo.materialize_task(&task(id, "2024-01-01T09:00:00Z")).is_err());
        // The failed attempt did not mark the key as seen.
        assert_eq!(
            repo.materialize_task(&task(id, "2024-01-01T09:00:00Z")).unwrap(),
            MaterializeOutcome::Created
        );
    }

    #[test]
    fn cursor_and_enable_flag_update_the_record() {
        let repo = InMemoryTaskRepository::new();
        let id = Uuid::new_v4();
        repo.save_schedule(&record(id)).unwrap();

        let next = "2024-01-02T09:00:00Z".parse().unwrap();
        repo.write_cursor(id, Some(next), None).unwrap();
        assert_eq!(repo.schedule(id).unwrap().next_execution_time, Some(next));

        repo.write_recurrence_enabled(id, false).unwrap();
        let stored = repo.schedule(id).unwrap();
        assert_eq!(stored.status, ScheduleStatus::Disabled);
        assert!(!stored.rule.enabled());

        repo.write_recurrence_enabled(id, true).unwrap();
        assert_eq!(repo.schedule(id).unwrap().status, ScheduleStatus::Active);
    }

    #[test]
    fn injected_cursor_failure_leaves_record_untouched() {
        let repo = InMemoryTaskRepository::new();
        let id = Uuid::new_v4();
        repo.save_schedule(&record(id)).unwrap();
        repo.fail_next_cursor_writes(1);

        let next = "2024-01-02T09:00:00Z".parse().unwrap();
        assert!(repo.write_cursor(id, Some(next), None).is_err());
        assert_eq!(repo.schedule(id).unwrap().next_execution_time, None);

        repo.write_cursor(id, Some(next), None).unwrap();
        assert_eq!(repo.schedule(id).unwrap().next_execution_time, Some(next));
    }

    #[test]
    fn unknown_schedule_is_not_found() {
        let repo = InMemoryTaskRepository::new();
        let id = Uuid::new_v4();
        assert!(matches!(
            repo.write_cursor(id, None, None),
            Err(RepositoryError::NotFound(missing)) if missing == id
        ));
        assert!(matches!(repo.delete_schedule(id), Err(RepositoryError::NotFound(_))));
    }
}
