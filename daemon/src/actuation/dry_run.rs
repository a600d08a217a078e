//! Logging actuator for hosts without native key events

use tracing::info;

use super::{virtual_keycode, ActuationError, KeyActuator};
use crate::bindings::Key;

/// Logs key events instead of posting them
///
/// Unknown key names still fail, so bindings can be checked on hosts
/// without native actuation.
#[derive(Debug, Default, Clone, Copy)]
pub struct DryRunActuator;

impl DryRunActuator {
    fn log(&self, action: &'static str, key: &Key) -> Result<(), ActuationError> {
        let code = virtual_keycode(key).ok_or_else(|| ActuationError::UnknownKey(key.to_string()))?;
        info!(action, key = %key, code, "dry-run key event");
        Ok(())
    }
}

impl KeyActuator for DryRunActuator {
    fn press(&self, key: &Key) -> Result<(), ActuationError> {
        self.log("press", key)
    }

    fn release(&self, key: &Key) -> Result<(), ActuationError> {
        self.log("release", key)
    }

    fn tap(&self, key: &Key) -> Result<(), ActuationError> {
        self.log("tap", key)
    }
}
