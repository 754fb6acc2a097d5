use serde::Deserialize;
use std::path::Path;
use tracing::warn;

use anyhow::{bail, Context, Result};
use chrono::Duration;

/// Longest accepted tick period (one day)
pub const MAX_TICK_INTERVAL_SECONDS: u64 = 86_400;
/// Longest accepted simulated advance per tick (one day)
pub const MAX_SIMULATED_STEP_SECONDS: u64 = 86_400;
/// Widest accepted back-fill spacing (one week)
pub const MAX_SEED_STEP_MINUTES: i64 = 7 * 24 * 60;
/// Most back-filled readings per farm
pub const MAX_SEED_COUNT: usize = 10_000;
/// Longest accepted history window (one year)
pub const MAX_RETENTION_HOURS: i64 = 365 * 24;

/// Complete Brooder configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BrooderConfig {
    #[serde(default)]
    pub simulation: SimulationConfig,
    #[serde(default)]
    pub persistence: PersistenceConfig,
    #[serde(default)]
    pub alerts: AlertConfig,
}

/// Sensor simulation and scheduling
#[derive(Debug, Clone, Deserialize)]
pub struct SimulationConfig {
    /// Wall-clock period of each farm's ticker (seconds)
    #[serde(default = "default_tick_interval")]
    pub tick_interval_seconds: u64,
    /// When set, each tick advances the farm's simulated clock by this much
    /// instead of stamping readings with the wall clock
    #[serde(default)]
    pub simulated_step_seconds: Option<u64>,
    /// Readings back-filled when a farm is registered
    #[serde(default = "default_seed_count")]
    pub seed_count: usize,
    /// Spacing of back-filled readings (minutes)
    #[serde(default = "default_seed_step")]
    pub seed_step_minutes: i64,
    /// History retention window (hours)
    #[serde(default = "default_retention_hours")]
    pub retention_hours: i64,
    /// Base seed for reproducible runs; farms derive their own stream from it
    #[serde(default)]
    pub rng_seed: Option<u64>,
}

fn default_tick_interval() -> u64 {
    10
}

fn default_seed_count() -> usize {
    24
}

fn default_seed_step() -> i64 {
    60
}

fn default_retention_hours() -> i64 {
    24
}

impl SimulationConfig {
    /// Reject values that would break history ordering or retention, or
    /// overflow timestamp arithmetic.
    pub fn validate(&self) -> Result<()> {
        if self.tick_interval_seconds > MAX_TICK_INTERVAL_SECONDS {
            bail!(
                "simulation.tick_interval_seconds must be at most {}, got {}",
                MAX_TICK_INTERVAL_SECONDS,
                self.tick_interval_seconds
            );
        }
        if let Some(step) = self.simulated_step_seconds {
            if step == 0 || step > MAX_SIMULATED_STEP_SECONDS {
                bail!(
                    "simulation.simulated_step_seconds must be in 1..={}, got {}",
                    MAX_SIMULATED_STEP_SECONDS,
                    step
                );
            }
        }
        if self.seed_count > MAX_SEED_COUNT {
            bail!(
                "simulation.seed_count must be at most {}, got {}",
                MAX_SEED_COUNT,
                self.seed_count
            );
        }
        if !(1..=MAX_SEED_STEP_MINUTES).contains(&self.seed_step_minutes) {
            bail!(
                "simulation.seed_step_minutes must be in 1..={}, got {}",
                MAX_SEED_STEP_MINUTES,
                self.seed_step_minutes
            );
        }
        if !(1..=MAX_RETENTION_HOURS).contains(&self.retention_hours) {
            bail!(
                "simulation.retention_hours must be in 1..={}, got {}",
                MAX_RETENTION_HOURS,
                self.retention_hours
            );
        }
        Ok(())
    }

    pub fn tick_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.tick_interval_seconds.max(1))
    }

    pub fn simulated_step(&self) -> Option<Duration> {
        self.simulated_step_seconds
            .map(|secs| Duration::seconds(secs as i64))
    }

    pub fn seed_step(&self) -> Duration {
        Duration::minutes(self.seed_step_minutes)
    }

    pub fn retention(&self) -> Duration {
        Duration::hours(self.retention_hours)
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            tick_interval_seconds: default_tick_interval(),
            simulated_step_seconds: None,
            seed_count: default_seed_count(),
            seed_step_minutes: default_seed_step(),
            retention_hours: default_retention_hours(),
            rng_seed: None,
        }
    }
}

/// Farm list storage
#[derive(Debug, Clone, Deserialize)]
pub struct PersistenceConfig {
    #[serde(default = "default_persistence_enabled")]
    pub enabled: bool,
    #[serde(default = "default_database_path")]
    pub database_path: String,
}

fn default_persistence_enabled() -> bool {
    true
}

fn default_database_path() -> String {
    "brooder.db".to_string()
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            enabled: default_persistence_enabled(),
            database_path: default_database_path(),
        }
    }
}

/// Alert fan-out
#[derive(Debug, Clone, Deserialize)]
pub struct AlertConfig {
    /// Buffered alerts per broadcast subscriber before it lags
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

fn default_channel_capacity() -> usize {
    64
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            channel_capacity: default_channel_capacity(),
        }
    }
}

impl BrooderConfig {
    pub fn validate(&self) -> Result<()> {
        self.simulation.validate()
    }

    /// Override selected fields from env vars. Unparsable or out-of-range
    /// values are ignored with a warning.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(v) = lookup("BROODER_TICK_INTERVAL_SECONDS") {
            match v.parse::<u64>() {
                Ok(n) if n <= MAX_TICK_INTERVAL_SECONDS => {
                    self.simulation.tick_interval_seconds = n
                }
                _ => warn!(value = %v, "Ignoring invalid BROODER_TICK_INTERVAL_SECONDS"),
            }
        }
        if let Some(v) = lookup("BROODER_SIMULATED_STEP_SECONDS") {
            match v.parse::<u64>() {
                Ok(n) if (1..=MAX_SIMULATED_STEP_SECONDS).contains(&n) => {
                    self.simulation.simulated_step_seconds = Some(n)
                }
                _ => warn!(value = %v, "Ignoring invalid BROODER_SIMULATED_STEP_SECONDS"),
            }
        }
        if let Some(v) = lookup("BROODER_DATABASE_PATH") {
            if !v.is_empty() {
                self.persistence.database_path = v;
            }
        }
        if let Some(v) = lookup("BROODER_PERSISTENCE_ENABLED") {
            if let Ok(b) = v.parse::<bool>() {
                self.persistence.enabled = b;
            }
        }
    }
}

/// Load configuration from TOML file
pub fn load_config(path: impl AsRef<Path>) -> Result<BrooderConfig> {
    let path = path.as_ref();
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    let config: BrooderConfig = toml::from_str(&contents)
        .with_context(|| format!("Failed to parse config file {}", path.display()))?;
    config
        .validate()
        .with_context(|| format!("Invalid config file {}", path.display()))?;
    Ok(config)
}
