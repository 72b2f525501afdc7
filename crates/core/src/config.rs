use std::env;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

/// Read a profiled env var: tries {PROFILE}_{KEY} first, falls back to {KEY}.
fn profiled_env_opt(profile: &str, key: &str) -> Option<String> {
    if !profile.is_empty() {
        let prefixed = format!("{}_{}", profile, key);
        if let Some(v) = env_opt(&prefixed) {
            return Some(v);
        }
    }
    env_opt(key)
}

fn profiled_env_or(profile: &str, key: &str, default: &str) -> String {
    profiled_env_opt(profile, key).unwrap_or_else(|| default.to_string())
}

fn profiled_env_parse<T: std::str::FromStr>(profile: &str, key: &str, default: T) -> T {
    profiled_env_opt(profile, key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

// ── Top-level config ──────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Active profile name (empty = default).
    pub profile: String,
    pub scheduler: SchedulerConfig,
    pub storage: StorageConfig,
}

impl Config {
    /// Build config from environment variables (call `load_dotenv()` first).
    /// Profile is read from `TASKFLOW_PROFILE`. When set (e.g. `PROD`), every
    /// key is first looked up as `{PROFILE}_{KEY}`, falling back to `{KEY}`.
    pub fn from_env() -> Self {
        let profile = env_or("TASKFLOW_PROFILE", "").to_uppercase();
        Self::for_profile(&profile)
    }

    /// Build config for a specific named profile (empty string = default).
    pub fn for_profile(profile: &str) -> Self {
        let p = profile.to_uppercase();
        let p = p.as_str();
        Self {
            profile: p.to_string(),
            scheduler: SchedulerConfig::from_env_profiled(p),
            storage: StorageConfig::from_env_profiled(p),
        }
    }

    pub fn profile_label(&self) -> &str {
        if self.profile.is_empty() { "default" } else { &self.profile }
    }

    /// Print a summary for startup logs.
    pub fn log_summary(&self) {
        tracing::info!("Config loaded (profile: {}):", self.profile_label());
        tracing::info!(
            "  scheduler:   tick={}s, utc_offset={}min, lookahead={}y, max_catch_up={}",
            self.scheduler.tick_interval_secs,
            self.scheduler.utc_offset_minutes,
            self.scheduler.lookahead_years,
            self.scheduler.max_catch_up_per_tick,
        );
        tracing::info!("  workers:     {}", self.scheduler.resolved_worker_threads());
        tracing::info!("  storage:     seed_file={}", self.storage.seed_file.display());
    }
}

// ── Scheduler ─────────────────────────────────────────────────

/// Settings shared by the occurrence calculator and the scheduler driver.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Seconds between driver ticks.
    #[serde(default = "default_tick_interval")]
    pub tick_interval_secs: u64,
    /// Offset of the civil-time reference zone, in minutes east of UTC.
    #[serde(default)]
    pub utc_offset_minutes: i32,
    /// How far past `after` the calculator searches before giving up.
    #[serde(default = "default_lookahead_years")]
    pub lookahead_years: u32,
    /// Maximum overdue occurrences fired for one schedule in a single tick.
    #[serde(default = "default_max_catch_up")]
    pub max_catch_up_per_tick: usize,
    /// Number of worker threads for parallel ticks. 0 = available parallelism.
    #[serde(default)]
    pub worker_threads: usize,
}

fn default_tick_interval() -> u64 { 60 }
fn default_lookahead_years() -> u32 { 10 }
fn default_max_catch_up() -> usize { 16 }

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tick_interval_secs: default_tick_interval(),
            utc_offset_minutes: 0,
            lookahead_years: default_lookahead_years(),
            max_catch_up_per_tick: default_max_catch_up(),
            worker_threads: 0,
        }
    }
}

impl SchedulerConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            tick_interval_secs: profiled_env_parse(p, "SCHEDULER_TICK_SECS", default_tick_interval()),
            utc_offset_minutes: profiled_env_parse(p, "SCHEDULER_UTC_OFFSET_MINUTES", 0),
            lookahead_years: profiled_env_parse(p, "SCHEDULER_LOOKAHEAD_YEARS", default_lookahead_years()),
            max_catch_up_per_tick: profiled_env_parse(p, "SCHEDULER_MAX_CATCH_UP", default_max_catch_up()),
            worker_threads: profiled_env_parse(p, "SCHEDULER_WORKER_THREADS", 0),
        }
    }

    /// Tick period as a std duration. Never zero.
    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs(self.tick_interval_secs.max(1))
    }

    /// Resolve worker thread count (0 means use available parallelism).
    pub fn resolved_worker_threads(&self) -> usize {
        if self.worker_threads == 0 {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4)
        } else {
            self.worker_threads
        }
    }
}

// ── Storage ───────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// YAML file with the task templates loaded at worker start.
    pub seed_file: PathBuf,
}

impl StorageConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            seed_file: PathBuf::from(profiled_env_or(p, "SCHEDULER_SEED_FILE", "data/schedules.yml")),
        }
    }
}
