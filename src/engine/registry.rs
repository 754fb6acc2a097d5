use super::cell::{FarmCell, SeedPlan};
use super::ticker::{spawn_ticker, TickerHandle};
use super::writer::{spawn_writer, PersistTrigger};
use crate::config::SimulationConfig;
use crate::control::ClimateStatus;
use crate::farm::{validate_name, ActuatorField, Farm, FarmError, FarmId};
use crate::notify::NotificationSink;
use crate::persistence::{FarmRecord, FarmStore};
use crate::profile::{self, AgeProfileId};
use crate::sensor::{Reading, SensorSimulator};
use crate::series::{SeriesSnapshot, TimeSeries};
use anyhow::{Context, Result};
use chrono::Utc;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// A registered farm: its state cell and the ticker driving it.
///
/// An entry exists exactly as long as the farm is registered, so a ticker
/// handle exists if and only if the farm does.
struct FarmEntry {
    cell: Arc<FarmCell>,
    ticker: TickerHandle,
}

/// Insertion order and selection. Only lifecycle operations take this lock;
/// the tick path never does.
#[derive(Default)]
struct Lifecycle {
    order: Vec<FarmId>,
    active: Option<FarmId>,
}

/// State shared with the persistence writer
pub(crate) struct Shared {
    farms: DashMap<FarmId, FarmEntry>,
    lifecycle: RwLock<Lifecycle>,
    store: Arc<dyn FarmStore>,
}

impl Shared {
    fn cell(&self, id: &FarmId) -> Result<Arc<FarmCell>, FarmError> {
        self.farms
            .get(id)
            .map(|entry| Arc::clone(&entry.cell))
            .ok_or_else(|| FarmError::NotFound(id.clone()))
    }

    fn lifecycle(&self) -> std::sync::RwLockReadGuard<'_, Lifecycle> {
        self.lifecycle.read().expect("registry lifecycle lock poisoned")
    }

    fn lifecycle_mut(&self) -> std::sync::RwLockWriteGuard<'_, Lifecycle> {
        self.lifecycle.write().expect("registry lifecycle lock poisoned")
    }

    fn collect(&self, lifecycle: &Lifecycle) -> Vec<Farm> {
        lifecycle
            .order
            .iter()
            .filter_map(|id| self.cell(id).ok())
            .map(|cell| cell.farm())
            .collect()
    }

    /// Farms in insertion order
    fn farms_in_order(&self) -> Vec<Farm> {
        self.collect(&self.lifecycle())
    }

    /// Write the farm list and active id to the store. Returns the farm count.
    pub(crate) fn save(&self) -> Result<usize> {
        let (records, active) = {
            let lifecycle = self.lifecycle();
            let records: Vec<FarmRecord> =
                self.collect(&lifecycle).iter().map(FarmRecord::from).collect();
            (records, lifecycle.active.clone())
        };

        self.store
            .save_all(&records, active.as_ref())
            .context("Failed to save farm state")?;
        Ok(records.len())
    }
}

/// Owns every farm, its simulator, history and ticker.
///
/// All operations are synchronous and return typed errors. Ticks for a farm
/// run on that farm's own task and lock only that farm's cell, so unrelated
/// farms never wait on each other. Persistence is deferred to a background
/// writer.
///
/// Must be created and used from within a Tokio runtime: registering a farm
/// spawns its ticker.
pub struct FarmRegistry {
    shared: Arc<Shared>,
    config: SimulationConfig,
    sink: Arc<dyn NotificationSink>,
    persist: PersistTrigger,
    writer: Mutex<Option<JoinHandle<()>>>,
    /// Per-farm RNG seed offset when `config.rng_seed` is set
    seed_offset: AtomicU64,
}

impl FarmRegistry {
    /// Create an empty registry. Fails if `config` does not validate.
    pub fn new(
        config: SimulationConfig,
        store: Arc<dyn FarmStore>,
        sink: Arc<dyn NotificationSink>,
    ) -> Result<Self> {
        config
            .validate()
            .context("Invalid simulation config")?;

        let shared = Arc::new(Shared {
            farms: DashMap::new(),
            lifecycle: RwLock::new(Lifecycle::default()),
            store,
        });
        let persist = PersistTrigger::new();
        let writer = spawn_writer(Arc::clone(&shared), persist.clone());

        Ok(Self {
            shared,
            config,
            sink,
            persist,
            writer: Mutex::new(Some(writer)),
            seed_offset: AtomicU64::new(0),
        })
    }

    /// Rebuild the registry from `store`.
    ///
    /// Restored farms keep their id, name, profile, actuator state and
    /// creation time; history is re-seeded and tickers restarted. A stored
    /// active id that no longer exists falls back to the first farm.
    pub fn restore(
        config: SimulationConfig,
        store: Arc<dyn FarmStore>,
        sink: Arc<dyn NotificationSink>,
    ) -> Result<Self> {
        config
            .validate()
            .context("Invalid simulation config")?;
        let records = store.load_farms().context("Failed to load farms")?;
        let stored_active = store
            .load_active_farm_id()
            .context("Failed to load active farm id")?;

        let registry = Self::new(config, store, sink)?;
        let now = Utc::now();

        {
            let mut lifecycle = registry.shared.lifecycle_mut();
            for record in records {
                if registry.shared.farms.contains_key(&record.id) {
                    warn!(farm_id = %record.id, "Skipping duplicate stored farm");
                    continue;
                }
                let id = record.id.clone();
                let farm = match Farm::try_from(record) {
                    Ok(farm) => farm,
                    Err(e) => {
                        warn!(farm_id = %id, error = %e, "Skipping stored farm");
                        continue;
                    }
                };
                lifecycle.order.push(farm.id.clone());
                registry.register(farm, now);
            }

            lifecycle.active = match stored_active {
                Some(id) if registry.shared.farms.contains_key(&id) => Some(id),
                _ => lifecycle.order.first().cloned(),
            };
        }

        info!(
            farms = registry.len(),
            active = ?registry.active_farm_id(),
            "Farm registry restored"
        );

        Ok(registry)
    }

    /// Build the cell for `farm`, seed its history and start its ticker.
    fn register(&self, farm: Farm, now: chrono::DateTime<Utc>) -> Arc<FarmCell> {
        let seed = self.config.rng_seed.map(|base| {
            base.wrapping_add(self.seed_offset.fetch_add(1, Ordering::Relaxed))
        });
        let simulator = SensorSimulator::for_profile(&farm.age_profile, seed);
        let series = TimeSeries::new(self.config.retention());
        let plan = SeedPlan {
            count: self.config.seed_count,
            step: self.config.seed_step(),
            tick_step: self.config.simulated_step(),
        };

        let id = farm.id.clone();
        let cell = Arc::new(FarmCell::new(farm, simulator, series, plan, now));
        let ticker = spawn_ticker(
            Arc::clone(&cell),
            Arc::clone(&self.sink),
            self.persist.clone(),
            self.config.tick_interval(),
        );

        self.shared.farms.insert(
            id,
            FarmEntry {
                cell: Arc::clone(&cell),
                ticker,
            },
        );
        cell
    }

    /// Create a farm for `stage`, seed 24h of history, start its sensor and
    /// make it the active farm.
    pub fn add_farm(&self, name: &str, stage: AgeProfileId) -> Result<Farm, FarmError> {
        let name = validate_name(name)?;
        let now = Utc::now();
        let farm = Farm::new(name, profile::lookup(stage), now);

        {
            let mut lifecycle = self.shared.lifecycle_mut();
            self.register(farm.clone(), now);
            lifecycle.order.push(farm.id.clone());
            lifecycle.active = Some(farm.id.clone());
        }

        self.persist.mark_dirty();

        info!(
            farm_id = %farm.id,
            farm = %farm.name,
            profile = %farm.age_profile.name,
            target = farm.age_profile.target_temp,
            "Farm added with isolated sensor"
        );

        Ok(farm)
    }

    /// Unregister a farm and stop its ticker before returning.
    ///
    /// If it was active, the first remaining farm (insertion order) becomes
    /// active, or none when the registry is empty.
    pub fn remove_farm(&self, id: &FarmId) -> Result<(), FarmError> {
        {
            let mut lifecycle = self.shared.lifecycle_mut();
            let (_, entry) = self
                .shared
                .farms
                .remove(id)
                .ok_or_else(|| FarmError::NotFound(id.clone()))?;

            // Any tick already past its wakeup now fails on the retired cell.
            entry.cell.retire();
            entry.ticker.stop();

            lifecycle.order.retain(|f| f != id);
            if lifecycle.active.as_ref() == Some(id) {
                lifecycle.active = lifecycle.order.first().cloned();
            }
        }

        self.persist.mark_dirty();
        info!(farm_id = %id, "Farm removed, sensor stopped");
        Ok(())
    }

    pub fn set_active(&self, id: &FarmId) -> Result<(), FarmError> {
        {
            let mut lifecycle = self.shared.lifecycle_mut();
            if !self.shared.farms.contains_key(id) {
                return Err(FarmError::NotFound(id.clone()));
            }
            lifecycle.active = Some(id.clone());
        }

        self.persist.mark_dirty();
        Ok(())
    }

    /// Set one actuator or override flag directly.
    ///
    /// Manual toggles win immediately, whether or not the matching override
    /// is set; automatic control may change the value again on the next tick
    /// unless it is.
    pub fn toggle_actuator(
        &self,
        id: &FarmId,
        field: ActuatorField,
        value: bool,
    ) -> Result<(), FarmError> {
        self.shared.cell(id)?.toggle(field, value)?;
        self.persist.mark_dirty();

        info!(farm_id = %id, field = %field, value = value, "Actuator toggled");
        Ok(())
    }

    pub fn rename_farm(&self, id: &FarmId, name: &str) -> Result<(), FarmError> {
        let name = validate_name(name)?;
        self.shared.cell(id)?.rename(name)?;
        self.persist.mark_dirty();
        Ok(())
    }

    /// Apply one reading to `id`'s farm: store it, run automatic control and
    /// forward any critical alert.
    ///
    /// Readings for an unknown or removed farm are dropped with `NotFound`.
    pub fn on_tick(&self, id: &FarmId, reading: Reading) -> Result<(), FarmError> {
        self.shared
            .cell(id)?
            .apply_tick(reading, self.sink.as_ref(), &self.persist)?;
        Ok(())
    }

    /// Tick `id`'s own simulator immediately, outside its schedule
    pub fn tick_farm(&self, id: &FarmId) -> Result<Reading, FarmError> {
        let outcome = self
            .shared
            .cell(id)?
            .tick(self.sink.as_ref(), &self.persist)?;
        Ok(outcome.reading)
    }

    /// All farms in insertion order
    pub fn list_farms(&self) -> Vec<Farm> {
        self.shared.farms_in_order()
    }

    pub fn get_farm(&self, id: &FarmId) -> Result<Farm, FarmError> {
        Ok(self.shared.cell(id)?.farm())
    }

    pub fn active_farm_id(&self) -> Option<FarmId> {
        self.shared.lifecycle().active.clone()
    }

    pub fn get_active_farm(&self) -> Option<Farm> {
        let id = self.active_farm_id()?;
        self.shared.cell(&id).ok().map(|cell| cell.farm())
    }

    /// History, current reading and connection flag for a farm.
    ///
    /// Unknown ids yield an empty, disconnected snapshot.
    pub fn get_farm_series(&self, id: &FarmId) -> SeriesSnapshot {
        match self.shared.cell(id) {
            Ok(cell) => cell.snapshot(),
            Err(_) => SeriesSnapshot::disconnected(),
        }
    }

    /// Passive status of the farm's current reading (`None` before any reading)
    pub fn climate_status(&self, id: &FarmId) -> Result<Option<ClimateStatus>, FarmError> {
        Ok(self.shared.cell(id)?.climate_status())
    }

    /// Critical alerts raised for this farm since it was registered
    pub fn alert_count(&self, id: &FarmId) -> Result<u64, FarmError> {
        Ok(self.shared.cell(id)?.alert_count())
    }

    pub fn len(&self) -> usize {
        self.shared.farms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shared.farms.is_empty()
    }

    /// True while `id`'s ticker task is running
    pub fn is_ticking(&self, id: &FarmId) -> bool {
        self.shared
            .farms
            .get(id)
            .map(|entry| !entry.ticker.is_finished())
            .unwrap_or(false)
    }

    /// Save synchronously, bypassing the background writer
    pub fn flush(&self) -> Result<()> {
        let count = self.shared.save()?;
        info!(farms = count, "Farm state flushed");
        Ok(())
    }

    /// Stop every ticker and the writer, then flush
    pub fn shutdown(&self) -> Result<()> {
        self.stop_tasks();
        self.flush()
    }

    fn stop_tasks(&self) {
        for entry in self.shared.farms.iter() {
            entry.ticker.stop();
        }
        if let Ok(mut writer) = self.writer.lock() {
            if let Some(handle) = writer.take() {
                handle.abort();
            }
        }
    }
}

impl Drop for FarmRegistry {
    fn drop(&mut self) {
        self.stop_tasks();
    }
}
