use crate::profile::AgeProfile;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;


/// Longest accepted farm display name (characters, after trimming)
pub const MAX_NAME_LEN: usize = 64;

/// Farm identifier (UUIDv7 string, time-ordered)
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FarmId(String);

impl FarmId {
    /// Allocate a fresh, globally unique id
    pub fn generate() -> Self {
        FarmId(Uuid::now_v7().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FarmId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for FarmId {
    fn from(s: &str) -> Self {
        FarmId(s.to_string())
    }
}

impl From<String> for FarmId {
    fn from(s: String) -> Self {
        FarmId(s)
    }
}

/// Actuator and override flags for one farm
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ActuatorState {
    pub auto_mode: bool,
    pub heater_on: bool,
    pub safety_grill_on: bool,
    pub fan_on: bool,
    pub mister_on: bool,
    pub heat_override: bool,
    pub fan_override: bool,
    pub mist_override: bool,
    pub last_update: DateTime<Utc>,
}

impl ActuatorState {
    /// Automatic mode on, every actuator and override off
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            auto_mode: true,
            heater_on: false,
            safety_grill_on: false,
            fan_on: false,
            mister_on: false,
            heat_override: false,
            fan_override: false,
            mist_override: false,
            last_update: now,
        }
    }

    pub fn get(&self, field: ActuatorField) -> bool {
        match field {
            ActuatorField::AutoMode => self.auto_mode,
            ActuatorField::Heater => self.heater_on,
            ActuatorField::SafetyGrill => self.safety_grill_on,
            ActuatorField::Fan => self.fan_on,
            ActuatorField::Mister => self.mister_on,
            ActuatorField::HeatOverride => self.heat_override,
            ActuatorField::FanOverride => self.fan_override,
            ActuatorField::MistOverride => self.mist_override,
        }
    }

    /// Set one flag unconditionally and stamp `last_update`
    pub fn set(&mut self, field: ActuatorField, value: bool, now: DateTime<Utc>) {
        let slot = match field {
            ActuatorField::AutoMode => &mut self.auto_mode,
            ActuatorField::Heater => &mut self.heater_on,
            ActuatorField::SafetyGrill => &mut self.safety_grill_on,
            ActuatorField::Fan => &mut self.fan_on,
            ActuatorField::Mister => &mut self.mister_on,
            ActuatorField::HeatOverride => &mut self.heat_override,
            ActuatorField::FanOverride => &mut self.fan_override,
            ActuatorField::MistOverride => &mut self.mist_override,
        };
        *slot = value;
        self.last_update = now;
    }
}

/// The eight externally togglable flags of `ActuatorState`
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActuatorField {
    AutoMode,
    Heater,
    SafetyGrill,
    Fan,
    Mister,
    HeatOverride,
    FanOverride,
    MistOverride,
}

impl ActuatorField {
    pub const ALL: [ActuatorField; 8] = [
        ActuatorField::AutoMode,
        ActuatorField::Heater,
        ActuatorField::SafetyGrill,
        ActuatorField::Fan,
        ActuatorField::Mister,
        ActuatorField::HeatOverride,
        ActuatorField::FanOverride,
        ActuatorField::MistOverride,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ActuatorField::AutoMode => "auto_mode",
            ActuatorField::Heater => "heater",
            ActuatorField::SafetyGrill => "safety_grill",
            ActuatorField::Fan => "fan",
            ActuatorField::Mister => "mister",
            ActuatorField::HeatOverride => "heat_override",
            ActuatorField::FanOverride => "fan_override",
            ActuatorField::MistOverride => "mist_override",
        }
    }
}

impl fmt::Display for ActuatorField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActuatorField {
    type Err = FarmError;

    /// Accepts the snake_case names plus the dashboard's legacy control keys
    /// (`heatLampActive`, `manualFanOverride`, ...).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "auto_mode" | "autoMode" => Ok(ActuatorField::AutoMode),
            "heater" | "heatLampActive" => Ok(ActuatorField::Heater),
            "safety_grill" | "safetyGrillActive" => Ok(ActuatorField::SafetyGrill),
            "fan" | "fanRunning" => Ok(ActuatorField::Fan),
            "mister" | "mistSprayerActive" => Ok(ActuatorField::Mister),
            "heat_override" | "manualHeatOverride" => Ok(ActuatorField::HeatOverride),
            "fan_override" | "manualFanOverride" => Ok(ActuatorField::FanOverride),
            "mist_override" | "manualMistOverride" => Ok(ActuatorField::MistOverride),
            other => Err(FarmError::Validation(format!(
                "unknown actuator field '{}'",
                other
            ))),
        }
    }
}

/// One independently controlled climate zone
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Farm {
    pub id: FarmId,
    pub name: String,
    /// Fixed at creation; a different stage means a new farm
    pub age_profile: AgeProfile,
    pub actuators: ActuatorState,
    pub created_at: DateTime<Utc>,
}

impl Farm {
    /// Build a new farm with a fresh id and default actuator state.
    ///
    /// `name` must already be validated (see [`validate_name`]).
    pub fn new(name: String, age_profile: AgeProfile, now: DateTime<Utc>) -> Self {
        Self {
            id: FarmId::generate(),
            name,
            age_profile,
            actuators: ActuatorState::new(now),
            created_at: now,
        }
    }
}

/// Trim and check a farm display name
pub fn validate_name(name: &str) -> Result<String, FarmError> {
    let trimmed = name.trim();

    if trimmed.is_empty() {
        return Err(FarmError::Validation("farm name must not be empty".to_string()));
    }
    if trimmed.chars().count() > MAX_NAME_LEN {
        return Err(FarmError::Validation(format!(
            "farm name must be at most {} characters",
            MAX_NAME_LEN
        )));
    }

    Ok(trimmed.to_string())
}

/// Errors returned by farm registry operations
#[derive(Debug, Clone, PartialEq)]
pub enum FarmError {
    /// Rejected input; nothing was changed
    Validation(String),
    /// No farm with this id is registered
    NotFound(FarmId),
}

impl fmt::Display for FarmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FarmError::Validation(msg) => write!(f, "validation failed: {}", msg),
            FarmError::NotFound(id) => write!(f, "farm '{}' not found", id),
        }
    }
}

impl std::error::Error for FarmError {}
