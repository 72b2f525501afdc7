//! Recurring task scheduler driver.
//!
//! This crate provides:
//! - [`SchedulerDriver`]: per-template schedule state, due-occurrence firing,
//!   enable/disable toggling and pattern updates
//! - [`TaskRepository`]: the persistence seam the driver materializes tasks
//!   through, with an in-memory implementation
//! - [`run_tick_loop`]: the periodic tokio loop a host process runs
//! - YAML seed loading for the `schedule-worker` binary

pub mod driver;
pub mod error;
pub mod metrics;
pub mod repository;
pub mod runner;
pub mod seed;
pub mod types;

pub use driver::SchedulerDriver;
pub use error::SchedulerError;
pub use metrics::DriverMetrics;
pub use repository::{InMemoryTaskRepository, MaterializeOutcome, RepositoryError, TaskRepository};
pub use runner::run_tick_loop;
pub use types::{
    MaterializationKey, MaterializeTask, NewSchedule, ScheduleId, ScheduleState, ScheduleStatus,
    TemplatePayload, TickReport,
};
