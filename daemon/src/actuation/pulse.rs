//! A single key-repeat pulse

use tracing::warn;

use super::{ActuationError, KeyActuator};
use crate::bindings::{Key, KeyCombo};

/// Fire one repetition of `combo`
///
/// Modifiers go down in listed order, the main key is tapped, then the
/// modifiers come up in reverse order. Every step is attempted even when an
/// earlier one fails, so a failed press never leaves a modifier held.
/// Returns the failures that occurred.
pub fn pulse(actuator: &dyn KeyActuator, combo: &KeyCombo) -> Vec<(Key, ActuationError)> {
    let mut failures = Vec::new();
    let mut record = |key: &Key, result: Result<(), ActuationError>| {
        if let Err(e) = result {
            warn!(key = %key, error = %e, "key actuation failed");
            failures.push((key.clone(), e));
        }
    };

    for key in combo.modifiers() {
        record(key, actuator.press(key));
    }

    let main = combo.main_key();
    record(main, actuator.tap(main));

    for key in combo.modifiers().iter().rev() {
        record(key, actuator.release(key));
    }

    failures
}

/// Release every modifier of `combo` in reverse order, ignoring failures
pub fn release_modifiers(actuator: &dyn KeyActuator, combo: &KeyCombo) {
    for key in combo.modifiers().iter().rev() {
        if let Err(e) = actuator.release(key) {
            warn!(key = %key, error = %e, "modifier release failed");
        }
    }
}
