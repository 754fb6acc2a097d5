//! Farm persistence.
//!
//! The registry only needs a small key-value capability: the farm list and the
//! active farm id. Backends implement `FarmStore`; reading history is never
//! persisted.

use crate::farm::{ActuatorState, Farm, FarmId};
use crate::profile::{self, UnknownProfile};
use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Mutex;

mod store;

pub use store::SqliteStore;

/// Persisted shape of a farm. The profile is stored by id (`"growers"`) and
/// re-resolved from the catalog on load.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FarmRecord {
    pub id: FarmId,
    pub name: String,
    pub age_profile: String,
    pub actuators: ActuatorState,
    pub created_at: DateTime<Utc>,
}

impl From<&Farm> for FarmRecord {
    fn from(farm: &Farm) -> Self {
        Self {
            id: farm.id.clone(),
            name: farm.name.clone(),
            age_profile: farm.age_profile.id.as_str().to_string(),
            actuators: farm.actuators.clone(),
            created_at: farm.created_at,
        }
    }
}

impl TryFrom<FarmRecord> for Farm {
    type Error = UnknownProfile;

    fn try_from(record: FarmRecord) -> Result<Self, Self::Error> {
        Ok(Farm {
            id: record.id,
            name: record.name,
            age_profile: profile::lookup_str(&record.age_profile)?,
            actuators: record.actuators,
            created_at: record.created_at,
        })
    }
}

/// Storage collaborator for the farm registry.
///
/// Absence is not an error: a cold store yields an empty list and no active id.
pub trait FarmStore: Send + Sync {
    fn load_farms(&self) -> Result<Vec<FarmRecord>>;

    fn save_farms(&self, farms: &[FarmRecord]) -> Result<()>;

    fn load_active_farm_id(&self) -> Result<Option<FarmId>>;

    /// `None` clears the stored id
    fn save_active_farm_id(&self, id: Option<&FarmId>) -> Result<()>;

    /// Save both keys; backends may override to make this atomic
    fn save_all(&self, farms: &[FarmRecord], active: Option<&FarmId>) -> Result<()> {
        self.save_farms(farms)?;
        self.save_active_farm_id(active)
    }
}

#[derive(Default)]
struct MemoryState {
    farms: Vec<FarmRecord>,
    active: Option<FarmId>,
    saves: u64,
}

/// In-process store (tests, and runs with persistence disabled)
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `save_farms` calls so far
    pub fn save_count(&self) -> u64 {
        self.state.lock().map(|s| s.saves).unwrap_or(0)
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, MemoryState>> {
        self.state
            .lock()
            .map_err(|_| anyhow!("memory store lock poisoned"))
    }
}

impl FarmStore for MemoryStore {
    fn load_farms(&self) -> Result<Vec<FarmRecord>> {
        Ok(self.lock()?.farms.clone())
    }

    fn save_farms(&self, farms: &[FarmRecord]) -> Result<()> {
        let mut state = self.lock()?;
        state.farms = farms.to_vec();
        state.saves += 1;
        Ok(())
    }

    fn load_active_farm_id(&self) -> Result<Option<FarmId>> {
        Ok(self.lock()?.active.clone())
    }

    fn save_active_farm_id(&self, id: Option<&FarmId>) -> Result<()> {
        self.lock()?.active = id.cloned();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::farm::ActuatorField;
    use crate::profile::AgeProfileId;

    fn sample_farm(name: &str) -> Farm {
        let mut farm = Farm::new(
            name.to_string(),
            profile::lookup(AgeProfileId::Chick),
            Utc::now(),
        );
        farm.actuators
            .set(ActuatorField::FanOverride, true, Utc::now());
        farm
    }

    #[test]
    fn test_record_round_trip() {
        let farm = sample_farm("Coop1");
        let record = FarmRecord::from(&farm);
        assert_eq!(record.age_profile, "chicks");

        let back = Farm::try_from(record).unwrap();
        assert_eq!(back, farm);
    }

    #[test]
    fn test_record_with_unknown_profile() {
        let mut record = FarmRecord::from(&sample_farm("Coop1"));
        record.age_profile = "ducklings".to_string();
        assert_eq!(
            Farm::try_from(record),
            Err(UnknownProfile("ducklings".to_string()))
        );
    }

    #[test]
    fn test_memory_store_cold_start() {
        let store = MemoryStore::new();
        assert!(store.load_farms().unwrap().is_empty());
        assert!(store.load_active_farm_id().unwrap().is_none());
    }

    #[test]
    fn test_memory_store_save_all() {
        let store = MemoryStore::new();
        let farm = sample_farm("Coop1");
        let records = vec![FarmRecord::from(&farm)];

        store.save_all(&records, Some(&farm.id)).unwrap();

        assert_eq!(store.load_farms().unwrap(), records);
        assert_eq!(store.load_active_farm_id().unwrap(), Some(farm.id.clone()));
        assert_eq!(store.save_count(), 1);

        store.save_active_farm_id(None).unwrap();
        assert!(store.load_active_farm_id().unwrap().is_none());
    }
}
