use super::*;
use crate::farm::{ActuatorField, Farm};
use crate::profile::{self, AgeProfileId};
use chrono::Duration;

fn grower() -> AgeProfile {
    profile::lookup(AgeProfileId::Grower)
}

fn t0() -> DateTime<Utc> {
    DateTime::from_timestamp(1_700_000_000, 0).unwrap()
}

fn reading(temperature: i32) -> Reading {
    Reading {
        timestamp: t0() + Duration::seconds(10),
        temperature,
        humidity: 70,
        target: 30,
    }
}

fn auto_state() -> ActuatorState {
    ActuatorState::new(t0())
}

#[test]
fn test_boundaries_are_in_range() {
    let p = grower();
    for t in [p.min_temp, p.max_temp] {
        let d = evaluate(&reading(t), &p, &auto_state());
        assert!(!d.actuators.heater_on);
        assert!(!d.actuators.safety_grill_on);
        assert!(!d.actuators.fan_on);
        assert!(!d.actuators.mister_on);
        assert!(d.trigger.is_none());
        assert_eq!(classify(t, &p), ClimateStatus::Optimal);
    }
}

#[test]
fn test_below_range_heats_with_grill_mirrored() {
    let p = grower();
    let d = evaluate(&reading(p.min_temp - 1), &p, &auto_state());
    assert!(d.actuators.heater_on);
    assert!(d.actuators.safety_grill_on);
    assert!(!d.actuators.fan_on);
    assert!(d.trigger.is_none());
}

#[test]
fn test_slightly_above_range_fans_without_mister() {
    let p = grower();
    let d = evaluate(&reading(p.max_temp + 1), &p, &auto_state());
    assert!(d.actuators.fan_on);
    assert!(!d.actuators.mister_on);
    assert!(!d.actuators.heater_on);
    assert!(d.trigger.is_none());
}

#[test]
fn test_mister_engages_above_max_plus_two() {
    let p = grower();
    let at_two = evaluate(&reading(p.max_temp + 2), &p, &auto_state());
    assert!(!at_two.actuators.mister_on);

    let at_three = evaluate(&reading(p.max_temp + 3), &p, &auto_state());
    assert!(at_three.actuators.mister_on);
    assert!(at_three.trigger.is_none(), "max+3 is not yet critical");
}

#[test]
fn test_critical_high() {
    let p = grower();
    let d = evaluate(&reading(p.max_temp + 4), &p, &auto_state());
    assert!(d.actuators.fan_on);
    assert!(d.actuators.mister_on);

    let trigger = d.trigger.expect("critical cooling alert");
    assert_eq!(trigger.severity, Severity::Critical);
    assert_eq!(trigger.kind, AlertKind::Cooling);
    assert_eq!(trigger.temperature, p.max_temp + 4);
}

#[test]
fn test_critical_low() {
    let p = grower();
    let d = evaluate(&reading(p.min_temp - 4), &p, &auto_state());
    assert!(d.actuators.heater_on);

    let trigger = d.trigger.expect("critical heating alert");
    assert_eq!(trigger.kind, AlertKind::Heating);

    let edge = evaluate(&reading(p.min_temp - 3), &p, &auto_state());
    assert!(edge.trigger.is_none());
}

#[test]
fn test_heat_override_is_immune() {
    let p = grower();
    let mut state = auto_state();
    state.set(ActuatorField::HeatOverride, true, t0());

    for t in [p.min_temp - 1, p.min_temp - 5, p.min_temp - 10] {
        let d = evaluate(&reading(t), &p, &state);
        assert!(!d.actuators.heater_on);
        assert!(!d.actuators.safety_grill_on);
        state = d.actuators;
    }

    // manual setting survives cold readings too
    state.set(ActuatorField::Heater, true, t0());
    let d = evaluate(&reading(p.max_temp), &p, &state);
    assert!(d.actuators.heater_on);
    assert!(!d.actuators.safety_grill_on);
}

#[test]
fn test_fan_and_mist_overrides_are_independent() {
    let p = grower();
    let mut state = auto_state();
    state.set(ActuatorField::FanOverride, true, t0());

    let d = evaluate(&reading(p.max_temp + 4), &p, &state);
    assert!(!d.actuators.fan_on, "fan held by override");
    assert!(d.actuators.mister_on, "mister still automatic");

    let mut state = auto_state();
    state.set(ActuatorField::MistOverride, true, t0());
    let d = evaluate(&reading(p.max_temp + 4), &p, &state);
    assert!(d.actuators.fan_on);
    assert!(!d.actuators.mister_on);
}

#[test]
fn test_manual_mode_freezes_state() {
    let p = grower();
    let mut state = auto_state();
    state.set(ActuatorField::AutoMode, false, t0());
    state.set(ActuatorField::Mister, true, t0());
    let frozen = state.clone();

    for t in [10, p.min_temp, 31, p.max_temp + 1, 45] {
        let d = evaluate(&reading(t), &p, &state);
        assert_eq!(d.actuators, frozen);
    }
}

#[test]
fn test_manual_mode_still_reports_critical() {
    let p = grower();
    let mut state = auto_state();
    state.set(ActuatorField::AutoMode, false, t0());

    let d = evaluate(&reading(p.max_temp + 5), &p, &state);
    assert_eq!(d.actuators, state);
    assert_eq!(d.trigger.unwrap().kind, AlertKind::Cooling);
}

#[test]
fn test_last_update_moves_only_on_change() {
    let p = grower();
    let state = auto_state();

    let idle = evaluate(&reading(30), &p, &state);
    assert_eq!(idle.actuators.last_update, t0());

    let hot = evaluate(&reading(p.max_temp + 1), &p, &state);
    assert_eq!(hot.actuators.last_update, reading(0).timestamp);
}

#[test]
fn test_classify_all_bands() {
    let p = grower(); // 28..=32
    assert_eq!(classify(24, &p), ClimateStatus::CriticalLow);
    assert_eq!(classify(25, &p), ClimateStatus::BelowRange);
    assert_eq!(classify(27, &p), ClimateStatus::BelowRange);
    assert_eq!(classify(30, &p), ClimateStatus::Optimal);
    assert_eq!(classify(33, &p), ClimateStatus::AboveRange);
    assert_eq!(classify(35, &p), ClimateStatus::AboveRange);
    assert_eq!(classify(36, &p), ClimateStatus::CriticalHigh);

    assert_eq!(ClimateStatus::Optimal.severity(), None);
    assert_eq!(ClimateStatus::AboveRange.severity(), Some(Severity::Warning));
    assert_eq!(ClimateStatus::CriticalLow.severity(), Some(Severity::Critical));
    assert_eq!(ClimateStatus::CriticalLow.action(), Some(AlertKind::Heating));
}

#[test]
fn test_alert_tagging_and_message() {
    let farm = Farm::new("Coop1".to_string(), grower(), t0());
    let trigger = Trigger {
        severity: Severity::Critical,
        kind: AlertKind::Cooling,
        temperature: 37,
    };

    let alert = Alert::for_farm(trigger, &farm, t0());
    assert_eq!(alert.farm_id, farm.id);
    assert_eq!(alert.farm_name, "Coop1");
    assert_eq!(alert.threshold_range, ThresholdRange { min: 28, max: 32 });
    assert_eq!(alert.title(), "Critical Temperature Alert - Coop1!");
    assert_eq!(
        alert.message(),
        "Temperature 37°C is dangerously high for Growers (28-32°C) - Emergency cooling activated"
    );
}
