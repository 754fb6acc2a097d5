//! Simulated climate sensor.
//!
//! One `SensorSimulator` exists per farm and owns its own RNG, so no two farms
//! ever share a random stream or any other state. Readings are jittered around
//! the farm's target temperature with an amplitude chosen by growth stage.

use crate::profile::{AgeProfile, AgeProfileId};
use chrono::{DateTime, Duration, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};


/// Humidity centre used for the seeded history pass
const SEED_HUMIDITY_BASE: f64 = 65.0;
/// Half-width of the seeded humidity jitter
const SEED_HUMIDITY_SPREAD: f64 = 5.0;
/// Lower bound of live humidity readings
const LIVE_HUMIDITY_BASE: f64 = 60.0;
/// Width of the live humidity band above `LIVE_HUMIDITY_BASE`
const LIVE_HUMIDITY_SPREAD: f64 = 20.0;

/// One environmental sample for a farm
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    pub timestamp: DateTime<Utc>,
    /// Whole °C
    pub temperature: i32,
    /// Relative humidity, whole percent
    pub humidity: i32,
    /// Farm target at generation time (°C)
    pub target: i32,
}

/// Per-farm generator of synthetic readings
#[derive(Debug)]
pub struct SensorSimulator {
    target_temp: i32,
    amplitude: f64,
    rng: StdRng,
}

impl SensorSimulator {
    /// Create a simulator seeded from OS entropy
    pub fn new(target_temp: i32, stage: AgeProfileId) -> Self {
        Self::with_rng(target_temp, stage, StdRng::from_entropy())
    }

    /// Create a reproducible simulator
    pub fn with_seed(target_temp: i32, stage: AgeProfileId, seed: u64) -> Self {
        Self::with_rng(target_temp, stage, StdRng::seed_from_u64(seed))
    }

    /// Build from a profile, optionally seeded
    pub fn for_profile(profile: &AgeProfile, seed: Option<u64>) -> Self {
        match seed {
            Some(seed) => Self::with_seed(profile.target_temp, profile.id, seed),
            None => Self::new(profile.target_temp, profile.id),
        }
    }

    fn with_rng(target_temp: i32, stage: AgeProfileId, rng: StdRng) -> Self {
        Self {
            target_temp,
            amplitude: noise_amplitude(stage),
            rng,
        }
    }

    pub fn target_temp(&self) -> i32 {
        self.target_temp
    }

    /// Noise half-width in °C
    pub fn amplitude(&self) -> f64 {
        self.amplitude
    }

    /// Produce the live reading for `now`.
    ///
    /// Temperature is `round(target + U[-a, a])`, humidity is
    /// `round(60 + U[0, 20])`. Values are never clamped.
    pub fn tick(&mut self, now: DateTime<Utc>) -> Reading {
        let humidity = LIVE_HUMIDITY_BASE + self.rng.gen_range(0.0..=LIVE_HUMIDITY_SPREAD);
        self.reading_at(now, humidity)
    }

    /// Produce `count` back-filled readings spaced `step` apart, oldest first,
    /// the newest stamped exactly `now`.
    ///
    /// Seeded humidity uses a narrower band (`round(65 + U[-5, 5])`) than live
    /// ticks do.
    pub fn seed_history(&mut self, now: DateTime<Utc>, count: usize, step: Duration) -> Vec<Reading> {
        (0..count)
            .rev()
            .map(|k| {
                let timestamp = now - step * k as i32;
                let humidity = SEED_HUMIDITY_BASE
                    + self
                        .rng
                        .gen_range(-SEED_HUMIDITY_SPREAD..=SEED_HUMIDITY_SPREAD);
                self.reading_at(timestamp, humidity)
            })
            .collect()
    }

    fn reading_at(&mut self, timestamp: DateTime<Utc>, humidity: f64) -> Reading {
        let noise = self.rng.gen_range(-self.amplitude..=self.amplitude);
        Reading {
            timestamp,
            temperature: (self.target_temp as f64 + noise).round() as i32,
            humidity: humidity.round() as i32,
            target: self.target_temp,
        }
    }
}

/// Temperature noise half-width for a growth stage: younger birds get a
/// steadier simulated climate.
pub fn noise_amplitude(stage: AgeProfileId) -> f64 {
    match stage {
        AgeProfileId::Chick => 2.0,
        AgeProfileId::Grower => 3.0,
        AgeProfileId::Adult => 4.0,
    }
}
