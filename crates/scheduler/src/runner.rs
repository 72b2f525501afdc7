//! Periodic tick loop for a host process.
//!
//! Waits on a tokio interval and runs [`SchedulerDriver::on_tick`] on a
//! blocking thread, so the driver's std locks and rayon pool never stall the
//! async runtime.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::Notify;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::driver::SchedulerDriver;

/// Tick `driver` every `period` until `shutdown` is notified.
///
/// Returns the number of ticks completed.
pub async fn run_tick_loop(driver: Arc<SchedulerDriver>, period: Duration, shutdown: Arc<Notify>) -> u64 {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut ticks = 0u64;

    info!(period_secs = period.as_secs_f64(), "tick loop started");

    loop {
        tokio::select! {
            _ = shutdown.notified() => break,
            _ = interval.tick() => {}
        }

        let driver = Arc::clone(&driver);
        match tokio::task::spawn_blocking(move || driver.on_tick(Utc::now())).await {
            Ok(report) => {
                ticks += 1;
                for err in &report.errors {
                    warn!(error = %err, "tick error");
                }
                debug!(tick = ticks, fired = report.fired.len(), "tick finished");
            }
            Err(e) => error!(error = %e, "tick task panicked"),
        }
    }

    info!(ticks, "tick loop stopped");
    ticks
}
