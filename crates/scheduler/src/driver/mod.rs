//! [`SchedulerDriver`]: owns per-template schedule state and turns due
//! occurrences into materialized tasks.
//!
//! Each schedule lives behind its own mutex. Firing holds that lock for the
//! whole fire-and-advance step, so an occurrence is materialized at most once
//! even when ticks overlap. Distinct schedules fire in parallel on a rayon pool.

mod control;
mod tick;


use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};
use uuid::Uuid;

use taskflow_core::SchedulerConfig;
use taskflow_recurrence::{OccurrenceCalculator, RecurrenceError, RecurrenceRule};

use crate::error::{Result, SchedulerError};
use crate::metrics::DriverMetrics;
use crate::repository::TaskRepository;
use crate::types::{NewSchedule, ScheduleId, ScheduleState, ScheduleStatus};

type ScheduleHandle = Arc<Mutex<ScheduleState>>;

/// Orchestrates recurring schedules against a [`TaskRepository`].
pub struct SchedulerDriver {
    pub(super) config: SchedulerConfig,
    pub(super) calculator: OccurrenceCalculator,
    pub(super) repository: Arc<dyn TaskRepository>,
    pub(super) schedules: RwLock<HashMap<ScheduleId, ScheduleHandle>>,
    pub(super) metrics: RwLock<DriverMetrics>,
    pub(super) pool: rayon::ThreadPool,
}

impl SchedulerDriver {
    pub fn new(config: SchedulerConfig, repository: Arc<dyn TaskRepository>) -> Result<Self> {
        let calculator = OccurrenceCalculator::from_config(&config);
        let num_workers = config.resolved_worker_threads();
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(num_workers)
            .thread_name(|i| format!("taskflow-tick-{}", i))
            .build()
            .map_err(|e| SchedulerError::ThreadPool(e.to_string()))?;

        info!(
            workers = num_workers,
            offset = %calculator.offset(),
            lookahead_years = calculator.lookahead_years(),
            "scheduler driver ready"
        );

        Ok(Self {
            config,
            calculator,
            repository,
            schedules: RwLock::new(HashMap::new()),
            metrics: RwLock::new(DriverMetrics::default()),
            pool,
        })
    }

    pub fn calculator(&self) -> &OccurrenceCalculator {
        &self.calculator
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Register a template's schedule and seed its first occurrence from the anchor.
    pub fn create_schedule(&self, new: NewSchedule) -> Result<ScheduleId> {
        let id = new.id.unwrap_or_else(Uuid::new_v4);
        let (status, next) = self.seed_cursor(&new.rule, new.anchor_time, new.anchor_time)?;

        // Check, save and insert under one guard so a racing create with the
        // same id cannot overwrite the stored record.
        let mut schedules = self.write_schedules()?;
        if schedules.contains_key(&id) {
            return Err(SchedulerError::DuplicateSchedule(id));
        }

        let state = ScheduleState {
            id,
            rule: new.rule,
            anchor_time: new.anchor_time,
            next_execution_time: next,
            last_fired_time: None,
            status,
            template: new.template,
        };
        self.repository.save_schedule(&state)?;
        schedules.insert(id, Arc::new(Mutex::new(state)));
        drop(schedules);

        info!(
            schedule_id = %id,
            status = ?status,
            next = ?next,
            "schedule created"
        );
        Ok(id)
    }

    /// Rebuild driver state from the repository's stored schedules.
    ///
    /// Returns the number of schedules loaded. Existing in-memory entries
    /// with the same id are replaced.
    pub fn hydrate(&self) -> Result<usize> {
        let stored = self.repository.load_schedules()?;
        let count = stored.len();

        let mut schedules = self.write_schedules()?;
        for mut state in stored {
            if state.status == ScheduleStatus::Active && state.next_execution_time.is_none() {
                let after = state.last_fired_time.unwrap_or(state.anchor_time);
                let (status, next) = self.seed_cursor(&state.rule, state.anchor_time, after)?;
                self.repository.write_cursor(state.id, next, state.last_fired_time)?;
                debug!(schedule_id = %state.id, next = ?next, "reseeded cursor on hydrate");
                state.status = status;
                state.next_execution_time = next;
            }
            schedules.insert(state.id, Arc::new(Mutex::new(state)));
        }

        info!(count, "hydrated schedules from repository");
        Ok(count)
    }

    /// Remove a schedule from the driver and the repository.
    pub fn remove_schedule(&self, id: ScheduleId) -> Result<ScheduleState> {
        let mut schedules = self.write_schedules()?;
        let handle = schedules
            .get(&id)
            .cloned()
            .ok_or(SchedulerError::UnknownSchedule(id))?;

        self.repository.delete_schedule(id)?;
        schedules.remove(&id);
        drop(schedules);

        let state = lock_schedule(&handle)?.clone();
        info!(schedule_id = %id, "schedule removed");
        Ok(state)
    }

    /// Current state of one schedule.
    pub fn snapshot(&self, id: ScheduleId) -> Result<ScheduleState> {
        let handle = self.handle(id)?;
        let state = lock_schedule(&handle)?.clone();
        Ok(state)
    }

    /// Current state of every schedule, ordered by id.
    pub fn snapshots(&self) -> Result<Vec<ScheduleState>> {
        let handles: Vec<ScheduleHandle> = self.read_schedules()?.values().cloned().collect();
        let mut out = handles
            .iter()
            .map(|h| lock_schedule(h).map(|s| s.clone()))
            .collect::<Result<Vec<_>>>()?;
        out.sort_by_key(|s| s.id);
        Ok(out)
    }

    pub fn len(&self) -> Result<usize> {
        Ok(self.read_schedules()?.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    pub fn metrics(&self) -> Result<DriverMetrics> {
        self.metrics
            .read()
            .map(|m| m.clone())
            .map_err(|e| SchedulerError::LockPoisoned(format!("metrics read lock: {}", e)))
    }

    /// Up to `limit` upcoming runs of a schedule, counted from `now` or its
    /// last firing, whichever is later. Empty unless the schedule is active.
    pub fn preview(&self, id: ScheduleId, now: DateTime<Utc>, limit: usize) -> Result<Vec<DateTime<Utc>>> {
        let state = self.snapshot(id)?;
        if state.status != ScheduleStatus::Active {
            return Ok(Vec::new());
        }
        let after = resume_after(&state, now);
        Ok(self.calculator.upcoming(&state.rule, state.anchor_time, after, limit)?)
    }

    /// Initial status and cursor for `rule`, searching strictly after `after`.
    ///
    /// Exhaustion is a status, not an error; other calculator errors propagate.
    pub(super) fn seed_cursor(
        &self,
        rule: &RecurrenceRule,
        anchor: DateTime<Utc>,
        after: DateTime<Utc>,
    ) -> Result<(ScheduleStatus, Option<DateTime<Utc>>)> {
        if !rule.enabled() {
            return Ok((ScheduleStatus::Disabled, None));
        }
        match self.calculator.next(rule, anchor, after) {
            Ok(Some(next)) => Ok((ScheduleStatus::Active, Some(next))),
            Ok(None) => Ok((ScheduleStatus::Disabled, None)),
            Err(RecurrenceError::Exhausted { horizon_days }) => {
                warn!(horizon_days, rule = %rule, "no occurrence within lookahead");
                Ok((ScheduleStatus::Exhausted, None))
            }
            Err(e) => Err(e.into()),
        }
    }

    pub(super) fn handle(&self, id: ScheduleId) -> Result<ScheduleHandle> {
        self.read_schedules()?
            .get(&id)
            .cloned()
            .ok_or(SchedulerError::UnknownSchedule(id))
    }

    fn read_schedules(
        &self,
    ) -> Result<std::sync::RwLockReadGuard<'_, HashMap<ScheduleId, ScheduleHandle>>> {
        self.schedules
            .read()
            .map_err(|e| SchedulerError::LockPoisoned(format!("schedules read lock: {}", e)))
    }

    fn write_schedules(
        &self,
    ) -> Result<std::sync::RwLockWriteGuard<'_, HashMap<ScheduleId, ScheduleHandle>>> {
        self.schedules
            .write()
            .map_err(|e| SchedulerError::LockPoisoned(format!("schedules write lock: {}", e)))
    }
}

pub(super) fn lock_schedule(handle: &Mutex<ScheduleState>) -> Result<std::sync::MutexGuard<'_, ScheduleState>> {
    handle
        .lock()
        .map_err(|e| SchedulerError::LockPoisoned(format!("schedule lock: {}", e)))
}

/// Recomputation point after a pause or edit: never before the last firing.
fn resume_after(state: &ScheduleState, now: DateTime<Utc>) -> DateTime<Utc> {
    state.last_fired_time.map_or(now, |last| last.max(now))
}
