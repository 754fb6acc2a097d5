// Age profiles (reference climate bands)
pub mod profile;

// Per-farm sensor simulation
pub mod sensor;

// Rolling reading history
pub mod series;

// Control evaluation and alerts
pub mod control;

// Farm model and errors
pub mod farm;

// Registry, tickers and deferred persistence
pub mod engine;

// Farm storage backends
pub mod persistence;

// Alert delivery
pub mod notify;

// Configuration
pub mod config;

pub use engine::FarmRegistry;
pub use farm::{ActuatorField, ActuatorState, Farm, FarmError, FarmId};
pub use profile::{AgeProfile, AgeProfileId};
