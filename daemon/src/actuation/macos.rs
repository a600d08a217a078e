//! Native key events via Quartz `CGEvent`

use core_graphics::event::{CGEvent, CGEventTapLocation, CGKeyCode};
use core_graphics::event_source::{CGEventSource, CGEventSourceStateID};
use tracing::trace;

use super::{virtual_keycode, ActuationError, KeyActuator};
use crate::bindings::Key;

/// Posts synthetic keyboard events at the HID tap location
///
/// Requires the Accessibility permission for the daemon binary.
#[derive(Debug, Default)]
pub struct CgEventActuator;

impl CgEventActuator {
    pub fn new() -> Self {
        Self
    }

    fn post(&self, key: &Key, keydown: bool) -> Result<(), ActuationError> {
        let code: CGKeyCode =
            virtual_keycode(key).ok_or_else(|| ActuationError::UnknownKey(key.to_string()))?;

        let source = CGEventSource::new(CGEventSourceStateID::HIDSystemState)
            .map_err(|_| ActuationError::EventCreation(key.to_string()))?;
        let event = CGEvent::new_keyboard_event(source, code, keydown)
            .map_err(|_| ActuationError::EventCreation(key.to_string()))?;

        event.post(CGEventTapLocation::HID);
        trace!(key = %key, code, keydown, "key event posted");
        Ok(())
    }
}

impl KeyActuator for CgEventActuator {
    fn press(&self, key: &Key) -> Result<(), ActuationError> {
        self.post(key, true)
    }

    fn release(&self, key: &Key) -> Result<(), ActuationError> {
        self.post(key, false)
    }
}
