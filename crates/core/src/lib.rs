pub mod config;
pub mod error;

pub use config::{Config, SchedulerConfig, StorageConfig};
pub use error::*;
