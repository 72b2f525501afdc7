use chrono::{DateTime, Utc};
use tracing::{debug, error, info};

use taskflow_recurrence::RecurrenceRule;

use crate::error::{Result, SchedulerError};
use crate::types::{ScheduleId, ScheduleState, ScheduleStatus};

use super::{lock_schedule, resume_after, SchedulerDriver};

impl SchedulerDriver {
    /// Turn recurrence on or off for a schedule.
    ///
    /// Enabling recomputes from `now` (or the last firing if later), so
    /// occurrences missed while disabled are never backfilled. Disabling
    /// clears the cursor but keeps `last_fired_time` and the pattern.
    /// Repeating the current state is a no-op.
    pub fn toggle(&self, id: ScheduleId, enabled: bool, now: DateTime<Utc>) -> Result<ScheduleState> {
        let handle = self.handle(id)?;
        let mut state = lock_schedule(&handle)?;

        match (state.status, enabled) {
            (ScheduleStatus::Exhausted, _) => return Err(SchedulerError::ScheduleExhausted(id)),
            (ScheduleStatus::Active, true) | (ScheduleStatus::Disabled, false) => {
                debug!(schedule_id = %id, enabled, "toggle is a no-op");
                return Ok(state.clone());
            }
            (ScheduleStatus::Active, false) => {
                self.persist_toggle(id, false, None, state.last_fired_time)?;

                state.rule = state.rule.with_enabled(false);
                state.next_execution_time = None;
                state.status = ScheduleStatus::Disabled;
            }
            (ScheduleStatus::Disabled, true) => {
                let rule = state.rule.with_enabled(true);
                let after = resume_after(&state, now);
                let (status, next) = self.seed_cursor(&rule, state.anchor_time, after)?;

                self.persist_toggle(id, true, next, state.last_fired_time)?;

                state.rule = rule;
                state.next_execution_time = next;
                state.status = status;
            }
        }

        info!(
            schedule_id = %id,
            enabled,
            status = ?state.status,
            next = ?state.next_execution_time,
            "recurrence toggled"
        );
        Ok(state.clone())
    }

    /// Replace a schedule's pattern and recompute its cursor from `now`.
    ///
    /// The enable flag of `rule` is ignored: a disabled schedule stays
    /// disabled and only [`toggle`](Self::toggle) changes that. This is the
    /// only way out of `Exhausted`. An identical pattern leaves the schedule
    /// untouched.
    pub fn update_pattern(&self, id: ScheduleId, rule: RecurrenceRule, now: DateTime<Utc>) -> Result<ScheduleState> {
        let handle = self.handle(id)?;
        let mut state = lock_schedule(&handle)?;

        let rule = rule.with_enabled(state.status != ScheduleStatus::Disabled);
        if state.rule == rule {
            debug!(schedule_id = %id, "pattern unchanged");
            return Ok(state.clone());
        }

        let after = resume_after(&state, now);
        let (status, next) = self.seed_cursor(&rule, state.anchor_time, after)?;

        let mut updated = state.clone();
        updated.rule = rule;
        updated.next_execution_time = next;
        updated.status = status;
        self.repository.save_schedule(&updated)?;

        info!(
            schedule_id = %id,
            rule = %updated.rule,
            status = ?status,
            next = ?next,
            "pattern updated"
        );
        *state = updated;
        Ok(state.clone())
    }

    /// Write the enable flag and cursor of a toggle.
    ///
    /// When the cursor write fails the flag is restored, so the stored record
    /// keeps matching the unchanged in-memory state.
    fn persist_toggle(
        &self,
        id: ScheduleId,
        enabled: bool,
        next: Option<DateTime<Utc>>,
        last_fired: Option<DateTime<Utc>>,
    ) -> Result<()> {
        self.repository.write_recurrence_enabled(id, enabled)?;
        if let Err(e) = self.repository.write_cursor(id, next, last_fired) {
            if let Err(rollback) = self.repository.write_recurrence_enabled(id, !enabled) {
                error!(
                    schedule_id = %id,
                    error = %rollback,
                    "failed to restore recurrence flag; stored record diverges"
                );
            }
            return Err(e.into());
        }
        Ok(())
    }
}
