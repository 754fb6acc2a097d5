//! Per-farm state owner.
//!
//! A `FarmCell` is the single authority over one farm's configuration,
//! actuators, simulator and history. Ticks and external edits for that farm
//! serialize on its mutex; other farms are never touched.

use super::writer::PersistTrigger;
use crate::control::{self, Alert, ClimateStatus};
use crate::farm::{ActuatorField, Farm, FarmError, FarmId};
use crate::notify::NotificationSink;
use crate::sensor::{Reading, SensorSimulator};
use crate::series::{SeriesSnapshot, TimeSeries};
use chrono::{DateTime, Duration, Utc};
use std::sync::{Mutex, MutexGuard};
use tracing::debug;

/// Result of applying one reading to a farm
#[derive(Clone, Debug)]
pub(crate) struct TickOutcome {
    pub reading: Reading,
    pub alert: Option<Alert>,
    pub actuators_changed: bool,
}

struct FarmState {
    farm: Farm,
    series: TimeSeries,
    simulator: SensorSimulator,
    /// Timestamp of the newest reading; live ticks never go behind it
    cursor: DateTime<Utc>,
    /// Fixed simulated advance per tick, or `None` for wall clock
    step: Option<Duration>,
    last_tick: Option<DateTime<Utc>>,
    alert_count: u64,
    retired: bool,
}

impl FarmState {
    fn next_timestamp(&mut self) -> DateTime<Utc> {
        let next = match self.step {
            Some(step) => self.cursor + step,
            None => Utc::now().max(self.cursor),
        };
        self.cursor = next;
        next
    }

    fn apply(&mut self, reading: Reading) -> TickOutcome {
        self.cursor = self.cursor.max(reading.timestamp);
        self.last_tick = Some(reading.timestamp);
        self.series.append(reading.clone());

        let decision = control::evaluate(&reading, &self.farm.age_profile, &self.farm.actuators);
        let actuators_changed = decision.actuators != self.farm.actuators;
        self.farm.actuators = decision.actuators;

        let alert = decision
            .trigger
            .map(|trigger| Alert::for_farm(trigger, &self.farm, reading.timestamp));
        if alert.is_some() {
            self.alert_count += 1;
        }

        debug!(
            farm_id = %self.farm.id,
            temperature = reading.temperature,
            humidity = reading.humidity,
            heater = self.farm.actuators.heater_on,
            fan = self.farm.actuators.fan_on,
            mister = self.farm.actuators.mister_on,
            "Sensor reading applied"
        );

        TickOutcome {
            reading,
            alert,
            actuators_changed,
        }
    }
}

/// History back-fill and clock settings for a new cell
#[derive(Clone, Copy, Debug)]
pub(crate) struct SeedPlan {
    pub count: usize,
    pub step: Duration,
    /// Simulated advance per live tick; `None` stamps with the wall clock
    pub tick_step: Option<Duration>,
}

pub(crate) struct FarmCell {
    id: FarmId,
    state: Mutex<FarmState>,
}

impl FarmCell {
    /// Wrap a farm with its own simulator and pre-fill `seed.count` readings
    /// spaced `seed.step` apart, ending at `now`.
    pub fn new(
        farm: Farm,
        mut simulator: SensorSimulator,
        mut series: TimeSeries,
        seed: SeedPlan,
        now: DateTime<Utc>,
    ) -> Self {
        for reading in simulator.seed_history(now, seed.count, seed.step) {
            series.append(reading);
        }

        Self {
            id: farm.id.clone(),
            state: Mutex::new(FarmState {
                farm,
                series,
                simulator,
                cursor: now,
                step: seed.tick_step,
                last_tick: None,
                alert_count: 0,
                retired: false,
            }),
        }
    }

    pub fn id(&self) -> &FarmId {
        &self.id
    }

    /// A poisoned lock means a panic mid-update left this farm half-written.
    fn lock(&self) -> MutexGuard<'_, FarmState> {
        self.state.lock().expect("farm state lock poisoned")
    }

    fn live(&self) -> Result<MutexGuard<'_, FarmState>, FarmError> {
        let state = self.lock();
        if state.retired {
            return Err(FarmError::NotFound(self.id.clone()));
        }
        Ok(state)
    }

    /// Draw a reading from this farm's simulator and apply it
    pub fn tick(
        &self,
        sink: &dyn NotificationSink,
        persist: &PersistTrigger,
    ) -> Result<TickOutcome, FarmError> {
        let mut state = self.live()?;
        let timestamp = state.next_timestamp();
        let reading = state.simulator.tick(timestamp);
        let outcome = state.apply(reading);
        Self::deliver(&outcome, sink, persist);
        Ok(outcome)
    }

    /// Apply an externally produced reading
    pub fn apply_tick(
        &self,
        reading: Reading,
        sink: &dyn NotificationSink,
        persist: &PersistTrigger,
    ) -> Result<TickOutcome, FarmError> {
        let mut state = self.live()?;
        let outcome = state.apply(reading);
        Self::deliver(&outcome, sink, persist);
        Ok(outcome)
    }

    /// Runs with the state lock held, so nothing from this tick can surface
    /// after `retire()` has returned. Both calls are non-blocking.
    fn deliver(outcome: &TickOutcome, sink: &dyn NotificationSink, persist: &PersistTrigger) {
        if let Some(alert) = &outcome.alert {
            sink.notify(alert);
        }
        if outcome.actuators_changed {
            persist.mark_dirty();
        }
    }

    pub fn toggle(&self, field: ActuatorField, value: bool) -> Result<(), FarmError> {
        let mut state = self.live()?;
        state.farm.actuators.set(field, value, Utc::now());
        Ok(())
    }

    pub fn rename(&self, name: String) -> Result<(), FarmError> {
        let mut state = self.live()?;
        state.farm.name = name;
        Ok(())
    }

    /// Stop accepting ticks and edits. Waits for an in-flight tick to finish
    /// delivering. Idempotent.
    pub fn retire(&self) {
        self.lock().retired = true;
    }

    pub fn farm(&self) -> Farm {
        self.lock().farm.clone()
    }

    pub fn snapshot(&self) -> SeriesSnapshot {
        let state = self.lock();
        SeriesSnapshot::capture(&state.series, state.last_tick)
    }

    pub fn climate_status(&self) -> Option<ClimateStatus> {
        let state = self.lock();
        state
            .series
            .current()
            .map(|r| control::classify(r.temperature, &state.farm.age_profile))
    }

    pub fn alert_count(&self) -> u64 {
        self.lock().alert_count
    }
}
