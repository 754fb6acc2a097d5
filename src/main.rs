use anyhow::{Context, Result};
use brooder::config::{load_config, BrooderConfig};
use brooder::notify::BroadcastNotifier;
use brooder::persistence::{FarmStore, MemoryStore, SqliteStore};
use brooder::profile;
use brooder::FarmRegistry;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{info, warn};

/// Period of the status summary log
const STATUS_INTERVAL_SECS: u64 = 60;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing subscriber
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "brooder=info".into()),
        )
        .init();

    info!("Brooder starting...");

    // Optional config file path as the only argument
    let mut config = match std::env::args().nth(1) {
        Some(path) => load_config(&path)?,
        None => BrooderConfig::default(),
    };
    config.apply_env_overrides();
    config.validate().context("Invalid configuration")?;

    info!(
        tick_interval_secs = config.simulation.tick_interval_seconds,
        persistence = config.persistence.enabled,
        database_path = %config.persistence.database_path,
        "Configuration loaded"
    );

    let store: Arc<dyn FarmStore> = if config.persistence.enabled {
        Arc::new(
            SqliteStore::new(&config.persistence.database_path)
                .context("Failed to initialize farm store")?,
        )
    } else {
        Arc::new(MemoryStore::new())
    };

    let notifier = Arc::new(BroadcastNotifier::new(config.alerts.channel_capacity));
    let mut alerts = notifier.subscribe();

    let registry = FarmRegistry::restore(config.simulation.clone(), store, notifier.clone())
        .context("Failed to restore farms")?;

    // Cold start: one demo farm per age profile
    if registry.is_empty() {
        for p in profile::list() {
            let farm = registry.add_farm(&format!("{} House", p.name), p.id)?;
            info!(farm_id = %farm.id, farm = %farm.name, "Demo farm created");
        }
    }

    let alert_logger = tokio::spawn(async move {
        loop {
            match alerts.recv().await {
                Ok(alert) => warn!(
                    farm_id = %alert.farm_id,
                    farm = %alert.farm_name,
                    "{}: {}",
                    alert.title(),
                    alert.message()
                ),
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped = skipped, "Alert logger lagged")
                }
                Err(RecvError::Closed) => break,
            }
        }
    });

    let mut status = interval(std::time::Duration::from_secs(STATUS_INTERVAL_SECS));
    status.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = status.tick() => {
                for farm in registry.list_farms() {
                    let series = registry.get_farm_series(&farm.id);
                    let climate = registry.climate_status(&farm.id).ok().flatten();
                    info!(
                        farm = %farm.name,
                        profile = %farm.age_profile.name,
                        temperature = series.current.as_ref().map(|r| r.temperature),
                        humidity = series.current.as_ref().map(|r| r.humidity),
                        status = ?climate,
                        heater = farm.actuators.heater_on,
                        fan = farm.actuators.fan_on,
                        mister = farm.actuators.mister_on,
                        alerts = registry.alert_count(&farm.id).unwrap_or(0),
                        "Farm status"
                    );
                }
            }
            result = &mut shutdown => {
                result.context("Failed to listen for ctrl_c signal")?;
                info!("Shutdown signal received");
                break;
            }
        }
    }

    // Graceful shutdown
    registry.shutdown()?;
    alert_logger.abort();
    info!(alerts = notifier.published(), "Brooder stopped");

    Ok(())
}
