use std::sync::Mutex;
use std::time::Instant;

use chrono::{DateTime, Utc};
use rayon::prelude::*;
use tracing::{debug, error, info, warn};

use crate::error::SchedulerError;
use crate::repository::MaterializeOutcome;
use crate::types::{MaterializationKey, MaterializeTask, ScheduleId, ScheduleState, ScheduleStatus, TickReport};

use super::{lock_schedule, SchedulerDriver};

/// What happened to one schedule during a tick.
#[derive(Default)]
struct ScheduleOutcome {
    fired: Vec<MaterializationKey>,
    duplicates: usize,
    exhausted: Option<ScheduleId>,
    errors: Vec<SchedulerError>,
    active: bool,
}

impl SchedulerDriver {
    /// Fire every due occurrence up to `now`.
    ///
    /// Each active schedule whose `next_execution_time <= now` materializes
    /// that occurrence, records it as `last_fired_time` and advances to the
    /// next occurrence. Overdue schedules catch up at most
    /// `max_catch_up_per_tick` occurrences; the remainder fire on later ticks.
    pub fn on_tick(&self, now: DateTime<Utc>) -> TickReport {
        let started = Instant::now();
        let mut report = TickReport {
            now: Some(now),
            ..TickReport::default()
        };

        let handles: Vec<_> = match self.read_schedules() {
            Ok(schedules) => schedules.values().cloned().collect(),
            Err(e) => {
                error!(error = %e, "tick aborted");
                report.errors.push(e);
                return report;
            }
        };

        let outcomes: Vec<ScheduleOutcome> = self.pool.install(|| {
            handles
                .par_iter()
                .map(|handle| self.tick_schedule(handle, now))
                .collect()
        });

        let mut active = 0;
        for outcome in outcomes {
            report.fired.extend(outcome.fired);
            report.duplicates += outcome.duplicates;
            report.exhausted.extend(outcome.exhausted);
            report.errors.extend(outcome.errors);
            if outcome.active {
                active += 1;
            }
        }
        report.fired.sort();

        let elapsed = started.elapsed();
        match self.metrics.write() {
            Ok(mut m) => {
                m.record_tick(&report, elapsed);
                m.active_schedules = active;
            }
            Err(e) => warn!(error = %e, "metrics lock poisoned; tick not recorded"),
        }

        if report.is_idle() {
            debug!(schedules = handles.len(), "tick idle");
        } else {
            info!(
                fired = report.fired.len(),
                duplicates = report.duplicates,
                exhausted = report.exhausted.len(),
                errors = report.errors.len(),
                elapsed_ms = elapsed.as_millis() as u64,
                "tick complete"
            );
        }
        report
    }

    fn tick_schedule(&self, handle: &Mutex<ScheduleState>, now: DateTime<Utc>) -> ScheduleOutcome {
        let mut outcome = ScheduleOutcome::default();
        let mut state = match lock_schedule(handle) {
            Ok(state) => state,
            Err(e) => {
                error!(error = %e, "skipping schedule");
                outcome.errors.push(e);
                return outcome;
            }
        };

        let budget = self.config.max_catch_up_per_tick.max(1);
        let mut steps = 0;
        while steps < budget && state.is_due(now) {
            steps += 1;
            let Some(occurrence) = state.next_execution_time else {
                break;
            };

            if let Some(last_fired) = state.last_fired_time.filter(|last| occurrence <= *last) {
                error!(
                    schedule_id = %state.id,
                    occurrence = %occurrence,
                    last_fired = %last_fired,
                    "occurrence does not advance past last firing; discarded"
                );
                outcome.errors.push(SchedulerError::ConcurrencyViolation {
                    schedule_id: state.id,
                    occurrence,
                    last_fired,
                });
                if !self.advance(&mut state, last_fired, &mut outcome) {
                    break;
                }
                continue;
            }

            let task = MaterializeTask {
                schedule_id: state.id,
                occurrence,
                template: state.template.clone(),
            };
            match self.repository.materialize_task(&task) {
                Ok(MaterializeOutcome::Created) => {
                    debug!(schedule_id = %state.id, occurrence = %occurrence, "task materialized");
                }
                Ok(MaterializeOutcome::Duplicate) => {
                    debug!(schedule_id = %state.id, occurrence = %occurrence, "occurrence already materialized");
                    outcome.duplicates += 1;
                }
                Err(e) => {
                    warn!(
                        schedule_id = %state.id,
                        occurrence = %occurrence,
                        error = %e,
                        "materialization failed; retrying next tick"
                    );
                    outcome.errors.push(e.into());
                    break;
                }
            }

            outcome.fired.push(task.key());
            state.last_fired_time = Some(occurrence);
            if !self.advance(&mut state, occurrence, &mut outcome) {
                break;
            }
        }

        if steps == budget && state.is_due(now) {
            debug!(
                schedule_id = %state.id,
                budget,
                "catch-up budget spent; remaining occurrences fire next tick"
            );
        }

        outcome.active = state.status == ScheduleStatus::Active;
        outcome
    }

    /// Move the cursor to the occurrence after `after` and persist it.
    ///
    /// Returns `false` once the schedule is exhausted.
    fn advance(&self, state: &mut ScheduleState, after: DateTime<Utc>, outcome: &mut ScheduleOutcome) -> bool {
        let next = match self.calculator.next(&state.rule, state.anchor_time, after) {
            Ok(next) => next,
            Err(e) => {
                warn!(schedule_id = %state.id, error = %e, "schedule exhausted");
                None
            }
        };

        state.next_execution_time = next;
        if next.is_none() {
            state.status = ScheduleStatus::Exhausted;
            outcome.exhausted = Some(state.id);
        }

        if let Err(e) = self
            .repository
            .write_cursor(state.id, state.next_execution_time, state.last_fired_time)
        {
            warn!(schedule_id = %state.id, error = %e, "cursor write failed");
            outcome.errors.push(e.into());
        }

        next.is_some()
    }
}
