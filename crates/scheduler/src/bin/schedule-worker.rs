//! schedule-worker: runs the recurring task scheduler against a YAML seed.
//!
//! Loads task templates from the seed file, registers their schedules and
//! ticks the driver until Ctrl-C. Materialized tasks are logged.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use clap::Parser;
use tokio::sync::Notify;
use tracing::{info, warn};

use taskflow_core::config::{load_dotenv, Config};
use taskflow_scheduler::seed::load_seed;
use taskflow_scheduler::{run_tick_loop, InMemoryTaskRepository, SchedulerDriver};

// ── CLI ─────────────────────────────────────────────────────────────

/// Recurring task scheduler worker.
#[derive(Parser, Debug)]
#[command(name = "schedule-worker", version, about)]
struct Cli {
    /// YAML seed file with task templates. Overrides SCHEDULER_SEED_FILE.
    #[arg(long)]
    seed: Option<PathBuf>,

    /// Seconds between ticks. Overrides SCHEDULER_TICK_SECS.
    #[arg(long)]
    tick_secs: Option<u64>,

    /// Number of upcoming runs to log per schedule at startup.
    #[arg(long, env = "SCHEDULER_PREVIEW", default_value_t = 3)]
    preview: usize,

    /// Run a single tick and exit.
    #[arg(long)]
    once: bool,
}

// ── main ────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    load_dotenv();
    let cli = Cli::parse();

    let mut config = Config::from_env();
    if let Some(secs) = cli.tick_secs {
        config.scheduler.tick_interval_secs = secs;
    }
    if let Some(seed) = cli.seed {
        config.storage.seed_file = seed;
    }
    config.log_summary();

    let repository = Arc::new(InMemoryTaskRepository::new());
    let driver = Arc::new(SchedulerDriver::new(config.scheduler.clone(), repository.clone())?);

    let now = Utc::now();
    for new in load_seed(&config.storage.seed_file, now)? {
        let label = new.rule.to_string();
        match driver.create_schedule(new) {
            Ok(id) => {
                let upcoming = driver.preview(id, now, cli.preview).unwrap_or_default();
                info!(schedule_id = %id, rule = %label, upcoming = ?upcoming, "registered schedule");
            }
            Err(e) => warn!(rule = %label, error = %e, "failed to register schedule"),
        }
    }

    if cli.once {
        let report = driver.on_tick(Utc::now());
        info!(fired = report.fired.len(), errors = report.errors.len(), "single tick complete");
        log_tasks(&repository, 0);
        return Ok(());
    }

    let shutdown = Arc::new(Notify::new());
    let loop_handle = tokio::spawn(run_tick_loop(
        Arc::clone(&driver),
        config.scheduler.tick_interval(),
        Arc::clone(&shutdown),
    ));

    // Drain materialized tasks into the log until Ctrl-C.
    let mut logged = 0;
    let mut drain = tokio::time::interval(Duration::from_secs(1));
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            _ = drain.tick() => logged = log_tasks(&repository, logged),
        }
    }

    info!("shutdown requested");
    shutdown.notify_one();
    let ticks = loop_handle.await?;
    log_tasks(&repository, logged);

    let metrics = driver.metrics()?;
    info!(
        ticks,
        materialized = metrics.tasks_materialized,
        exhausted = metrics.exhausted,
        violations = metrics.concurrency_violations,
        "schedule-worker stopped"
    );
    Ok(())
}

/// Log tasks created since index `from`; returns the new high-water mark.
fn log_tasks(repository: &InMemoryTaskRepository, from: usize) -> usize {
    let tasks = repository.tasks();
    for task in tasks.iter().skip(from) {
        info!(
            schedule_id = %task.schedule_id,
            occurrence = %task.occurrence,
            template = %task.template,
            "task materialized"
        );
    }
    tasks.len()
}
