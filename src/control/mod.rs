//! Climate control decisions.
//!
//! `evaluate` is a total, pure function from (reading, profile, actuator state)
//! to the next actuator state plus an optional critical alert. It never reads or
//! writes anything outside its arguments.
//!
//! Thresholds, all on the whole-degree temperature `t`:
//!
//! ```text
//!   t < min - 3        critical low   -> heater + grill, critical/heating alert
//!   t < min            below range    -> heater + grill
//!   min <= t <= max    optimal        -> everything off
//!   t > max            above range    -> fan
//!   t > max + 2        emergency      -> fan + mister
//!   t > max + 3        critical high  -> fan + mister, critical/cooling alert
//! ```

use crate::farm::{ActuatorState, Farm, FarmId};
use crate::profile::AgeProfile;
use crate::sensor::Reading;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[cfg(test)]
mod tests;

/// Degrees outside the band at which an excursion becomes critical
pub const CRITICAL_MARGIN: i32 = 3;
/// Degrees above max at which the mister joins the fan
pub const MIST_MARGIN: i32 = 2;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Critical,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertKind {
    Heating,
    Cooling,
}

/// Passive classification of a temperature against a profile band
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClimateStatus {
    Optimal,
    BelowRange,
    AboveRange,
    CriticalLow,
    CriticalHigh,
}

impl ClimateStatus {
    /// `None` when optimal; range excursions are warnings, critical ones critical
    pub fn severity(&self) -> Option<Severity> {
        match self {
            ClimateStatus::Optimal => None,
            ClimateStatus::BelowRange | ClimateStatus::AboveRange => Some(Severity::Warning),
            ClimateStatus::CriticalLow | ClimateStatus::CriticalHigh => Some(Severity::Critical),
        }
    }

    /// Which corrective action the status calls for
    pub fn action(&self) -> Option<AlertKind> {
        match self {
            ClimateStatus::Optimal => None,
            ClimateStatus::BelowRange | ClimateStatus::CriticalLow => Some(AlertKind::Heating),
            ClimateStatus::AboveRange | ClimateStatus::CriticalHigh => Some(AlertKind::Cooling),
        }
    }
}

/// Classify a whole-degree temperature against a profile band
pub fn classify(temperature: i32, profile: &AgeProfile) -> ClimateStatus {
    if temperature < profile.min_temp - CRITICAL_MARGIN {
        ClimateStatus::CriticalLow
    } else if temperature < profile.min_temp {
        ClimateStatus::BelowRange
    } else if temperature > profile.max_temp + CRITICAL_MARGIN {
        ClimateStatus::CriticalHigh
    } else if temperature > profile.max_temp {
        ClimateStatus::AboveRange
    } else {
        ClimateStatus::Optimal
    }
}

/// Critical excursion detected by `evaluate`, not yet tied to a farm
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Trigger {
    pub severity: Severity,
    pub kind: AlertKind,
    pub temperature: i32,
}

/// Output of one evaluation
#[derive(Clone, Debug, PartialEq)]
pub struct Decision {
    pub actuators: ActuatorState,
    pub trigger: Option<Trigger>,
}

/// Compute the next actuator state for `reading`.
///
/// Manual mode returns `state` untouched. In automatic mode each actuator
/// group whose override flag is set is left as it is. `last_update` moves to
/// the reading's timestamp only when some flag actually changed.
///
/// The alert does not depend on `auto_mode`: a critical excursion is reported
/// either way.
pub fn evaluate(reading: &Reading, profile: &AgeProfile, state: &ActuatorState) -> Decision {
    let t = reading.temperature;
    let needs_heating = t < profile.min_temp;
    let needs_cooling = t > profile.max_temp;

    let mut next = state.clone();

    if state.auto_mode {
        if !state.heat_override {
            next.heater_on = needs_heating;
            next.safety_grill_on = needs_heating;
        }
        if !state.fan_override {
            next.fan_on = needs_cooling;
        }
        if !state.mist_override {
            next.mister_on = needs_cooling && t > profile.max_temp + MIST_MARGIN;
        }

        if flags_differ(state, &next) {
            next.last_update = reading.timestamp;
        }
    }

    // Heating is checked first; both cannot hold while min < max.
    let trigger = if needs_heating && t < profile.min_temp - CRITICAL_MARGIN {
        Some(Trigger {
            severity: Severity::Critical,
            kind: AlertKind::Heating,
            temperature: t,
        })
    } else if needs_cooling && t > profile.max_temp + CRITICAL_MARGIN {
        Some(Trigger {
            severity: Severity::Critical,
            kind: AlertKind::Cooling,
            temperature: t,
        })
    } else {
        None
    };

    Decision {
        actuators: next,
        trigger,
    }
}

fn flags_differ(a: &ActuatorState, b: &ActuatorState) -> bool {
    a.heater_on != b.heater_on
        || a.safety_grill_on != b.safety_grill_on
        || a.fan_on != b.fan_on
        || a.mister_on != b.mister_on
}

/// Inclusive band an alert was raised against
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThresholdRange {
    pub min: i32,
    pub max: i32,
}

impl fmt::Display for ThresholdRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}°C", self.min, self.max)
    }
}

/// Critical excursion surfaced to the notification sink. Never stored.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub severity: Severity,
    pub kind: AlertKind,
    pub farm_id: FarmId,
    pub farm_name: String,
    pub profile_name: String,
    pub temperature: i32,
    pub threshold_range: ThresholdRange,
    pub timestamp: DateTime<Utc>,
}

impl Alert {
    /// Tag a trigger with the farm it came from
    pub fn for_farm(trigger: Trigger, farm: &Farm, timestamp: DateTime<Utc>) -> Self {
        Self {
            severity: trigger.severity,
            kind: trigger.kind,
            farm_id: farm.id.clone(),
            farm_name: farm.name.clone(),
            profile_name: farm.age_profile.name.clone(),
            temperature: trigger.temperature,
            threshold_range: ThresholdRange {
                min: farm.age_profile.min_temp,
                max: farm.age_profile.max_temp,
            },
            timestamp,
        }
    }

    pub fn title(&self) -> String {
        format!("Critical Temperature Alert - {}!", self.farm_name)
    }

    pub fn message(&self) -> String {
        let (level, action) = match self.kind {
            AlertKind::Cooling => ("high", "cooling"),
            AlertKind::Heating => ("low", "heating"),
        };
        format!(
            "Temperature {}°C is dangerously {} for {} ({}) - Emergency {} activated",
            self.temperature, level, self.profile_name, self.threshold_range, action
        )
    }
}
