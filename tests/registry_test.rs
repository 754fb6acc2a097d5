// Integration tests for the farm registry against real collaborators:
// SQLite persistence and the broadcast alert notifier.

use brooder::config::SimulationConfig;
use brooder::control::{AlertKind, Severity};
use brooder::notify::BroadcastNotifier;
use brooder::persistence::{FarmStore, SqliteStore};
use brooder::sensor::Reading;
use brooder::{ActuatorField, AgeProfileId, FarmError, FarmRegistry};
use chrono::{Duration, Utc};
use std::sync::Arc;
use tempfile::TempDir;

// ── Helpers ──────────────────────────────────────────────────────────────────

fn config() -> SimulationConfig {
    SimulationConfig {
        tick_interval_seconds: 3600,
        rng_seed: Some(42),
        ..SimulationConfig::default()
    }
}

fn open_store(dir: &TempDir) -> Arc<SqliteStore> {
    let path = dir.path().join("farms.db");
    Arc::new(SqliteStore::new(path.to_str().unwrap()).expect("open farm db"))
}

fn reading_at(temperature: i32, offset_secs: i64) -> Reading {
    Reading {
        timestamp: Utc::now() + Duration::seconds(offset_secs),
        temperature,
        humidity: 72,
        target: 0,
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_farms_survive_restart() {
    let dir = TempDir::new().unwrap();

    let (chick_id, grower_id) = {
        let registry = FarmRegistry::restore(
            config(),
            open_store(&dir),
            Arc::new(BroadcastNotifier::new(8)),
        )
        .unwrap();
        assert!(registry.is_empty());

        let chick = registry.add_farm("Nursery", AgeProfileId::Chick).unwrap();
        let grower = registry.add_farm("Coop1", AgeProfileId::Grower).unwrap();
        registry
            .toggle_actuator(&chick.id, ActuatorField::MistOverride, true)
            .unwrap();
        registry.set_active(&chick.id).unwrap();
        registry.shutdown().unwrap();
        (chick.id, grower.id)
    };

    let registry = FarmRegistry::restore(
        config(),
        open_store(&dir),
        Arc::new(BroadcastNotifier::new(8)),
    )
    .unwrap();

    let names: Vec<String> = registry.list_farms().into_iter().map(|f| f.name).collect();
    assert_eq!(names, vec!["Nursery", "Coop1"]);
    assert_eq!(registry.active_farm_id(), Some(chick_id.clone()));
    assert!(registry.get_farm(&chick_id).unwrap().actuators.mist_override);
    assert_eq!(
        registry.get_farm(&grower_id).unwrap().age_profile.id,
        AgeProfileId::Grower
    );

    // History is rebuilt rather than stored
    assert_eq!(registry.get_farm_series(&grower_id).readings.len(), 24);
}

#[tokio::test]
async fn test_removal_is_persisted() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);

    let registry =
        FarmRegistry::new(config(), store.clone(), Arc::new(BroadcastNotifier::new(8))).unwrap();
    let keep = registry.add_farm("Keep", AgeProfileId::Adult).unwrap();
    let drop_me = registry.add_farm("Drop", AgeProfileId::Adult).unwrap();

    registry.remove_farm(&drop_me.id).unwrap();
    registry.flush().unwrap();

    let saved = store.load_farms().unwrap();
    assert_eq!(saved.len(), 1);
    assert_eq!(saved[0].id, keep.id);
    assert_eq!(store.load_active_farm_id().unwrap(), Some(keep.id.clone()));

    registry.remove_farm(&keep.id).unwrap();
    registry.flush().unwrap();
    assert!(store.load_farms().unwrap().is_empty());
    assert!(store.load_active_farm_id().unwrap().is_none());
}

#[tokio::test]
async fn test_critical_alerts_are_broadcast() {
    let dir = TempDir::new().unwrap();
    let notifier = Arc::new(BroadcastNotifier::new(8));
    let mut rx = notifier.subscribe();

    let registry = FarmRegistry::new(config(), open_store(&dir), notifier.clone()).unwrap();
    let farm = registry.add_farm("Coop1", AgeProfileId::Grower).unwrap();

    // Above range but not critical: actuators move, nothing is pushed
    registry.on_tick(&farm.id, reading_at(34, 1)).unwrap();
    assert!(rx.try_recv().is_err());

    registry.on_tick(&farm.id, reading_at(37, 2)).unwrap();
    let alert = rx.recv().await.unwrap();
    assert_eq!(alert.severity, Severity::Critical);
    assert_eq!(alert.kind, AlertKind::Cooling);
    assert_eq!(alert.farm_id, farm.id);
    assert_eq!(alert.farm_name, "Coop1");
    assert_eq!(alert.threshold_range.to_string(), "28-32°C");
    assert_eq!(alert.title(), "Critical Temperature Alert - Coop1!");
    assert_eq!(notifier.published(), 1);

    let actuators = registry.get_farm(&farm.id).unwrap().actuators;
    assert!(actuators.fan_on);
    assert!(actuators.mister_on);
}

#[tokio::test]
async fn test_removed_farm_stays_removed() {
    let dir = TempDir::new().unwrap();
    let registry = FarmRegistry::new(
        config(),
        open_store(&dir),
        Arc::new(BroadcastNotifier::new(8)),
    )
    .unwrap();
    let farm = registry.add_farm("Short-lived", AgeProfileId::Chick).unwrap();
    registry.remove_farm(&farm.id).unwrap();

    for i in 0..5 {
        assert_eq!(
            registry.on_tick(&farm.id, reading_at(10, i)),
            Err(FarmError::NotFound(farm.id.clone()))
        );
    }
    assert!(registry.get_farm(&farm.id).is_err());
    assert!(registry.list_farms().is_empty());
    assert!(registry.active_farm_id().is_none());
}
