use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::SchedulerError;
use crate::types::TickReport;

/// Driver operational metrics.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DriverMetrics {
    /// Ticks processed since the driver started.
    pub ticks: u64,
    /// Tasks the repository created.
    pub tasks_materialized: u64,
    /// Firings the repository had already materialized.
    pub duplicates_skipped: u64,
    /// Schedules that ran out of occurrences.
    pub exhausted: u64,
    /// Firings discarded because they did not advance past the last firing.
    pub concurrency_violations: u64,
    /// Failed repository calls during ticks.
    pub repository_failures: u64,
    /// Schedules currently in the active state.
    pub active_schedules: usize,
    pub last_tick: Option<DateTime<Utc>>,
    pub last_tick_duration: Duration,
    pub avg_tick_duration: Duration,
}

impl DriverMetrics {
    /// Fold one tick's report into the counters.
    pub fn record_tick(&mut self, report: &TickReport, duration: Duration) {
        self.ticks += 1;
        self.last_tick = report.now;
        self.last_tick_duration = duration;

        let created = report.fired.len().saturating_sub(report.duplicates);
        self.tasks_materialized += created as u64;
        self.duplicates_skipped += report.duplicates as u64;
        self.exhausted += report.exhausted.len() as u64;
        for err in &report.errors {
            match err {
                SchedulerError::ConcurrencyViolation { .. } => self.concurrency_violations += 1,
                SchedulerError::Repository(_) => self.repository_failures += 1,
                _ => {}
            }
        }

        // Incremental mean: new_avg = prev_avg + (duration - prev_avg) / count
        self.avg_tick_duration = if self.ticks == 1 {
            duration
        } else {
            let prev_nanos = self.avg_tick_duration.as_nanos() as f64;
            let cur_nanos = duration.as_nanos() as f64;
            let avg_nanos = prev_nanos + (cur_nanos - prev_nanos) / self.ticks as f64;
            Duration::from_nanos(avg_nanos as u64)
        };
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;
    use crate::types::MaterializationKey;

    fn report(fired: usize, duplicates: usize) -> TickReport {
        let schedule_id = Uuid::new_v4();
        TickReport {
            now: Some(Utc::now()),
            fired: (0..fired)
                .map(|i| MaterializationKey {
                    schedule_id,
                    occurrence: Utc::now() + chrono::Duration::minutes(i as i64),
                })
                .collect(),
            duplicates,
            ..TickReport::default()
        }
    }

    #[test]
    fn record_single_tick() {
        let mut m = DriverMetrics::default();
        m.record_tick(&report(3, 1), Duration::from_millis(20));

        assert_eq!(m.ticks, 1);
        assert_eq!(m.tasks_materialized, 2);
        assert_eq!(m.duplicates_skipped, 1);
        assert!(m.last_tick.is_some());
        assert_eq!(m.avg_tick_duration, Duration::from_millis(20));
    }

    #[test]
    fn record_multiple_ticks_averages() {
        let mut m = DriverMetrics::default();
        m.record_tick(&report(0, 0), Duration::from_millis(100));
        m.record_tick(&report(0, 0), Duration::from_millis(200));

        assert_eq!(m.ticks, 2);
        let avg = m.avg_tick_duration.as_millis();
        assert!((140..=160).contains(&avg), "expected ~150ms, got {}ms", avg);
        assert_eq!(m.last_tick_duration, Duration::from_millis(200));
    }

    #[test]
    fn errors_are_counted_by_kind() {
        let mut m = DriverMetrics::default();
        let mut r = report(0, 0);
        r.errors.push(SchedulerError::ConcurrencyViolation {
            schedule_id: Uuid::new_v4(),
            occurrence: Utc::now(),
            last_fired: Utc::now(),
        });
        r.errors.push(SchedulerError::Repository(
            crate::repository::RepositoryError::Unavailable("down".into()),
        ));
        r.errors.push(SchedulerError::LockPoisoned("schedule lock".into()));
        m.record_tick(&r, Duration::from_millis(1));

        assert_eq!(m.concurrency_violations, 1);
        assert_eq!(m.repository_failures, 1);
    }
}
