//! Recording actuator double for tests

use std::collections::HashSet;
use std::sync::Mutex;

use super::{ActuationError, KeyActuator};
use crate::bindings::Key;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyCall {
    Press(String),
    Release(String),
    Tap(String),
}

/// Records every call; keys registered with `fail_on` return an error
/// (the call is still recorded)
#[derive(Default)]
pub struct RecordingActuator {
    calls: Mutex<Vec<KeyCall>>,
    failing: Mutex<HashSet<String>>,
}

impl RecordingActuator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_on(&self, key: &str) {
        self.failing.lock().unwrap().insert(key.to_string());
    }

    pub fn calls(&self) -> Vec<KeyCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.calls.lock().unwrap().clear();
    }

    pub fn taps(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, KeyCall::Tap(_)))
            .count()
    }

    pub fn taps_of(&self, key: &str) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, KeyCall::Tap(k) if k == key))
            .count()
    }

    fn record(&self, call: KeyCall, key: &Key) -> Result<(), ActuationError> {
        self.calls.lock().unwrap().push(call);
        if self.failing.lock().unwrap().contains(key.as_str()) {
            Err(ActuationError::EventCreation(key.to_string()))
        } else {
            Ok(())
        }
    }
}

impl KeyActuator for RecordingActuator {
    fn press(&self, key: &Key) -> Result<(), ActuationError> {
        self.record(KeyCall::Press(key.to_string()), key)
    }

    fn release(&self, key: &Key) -> Result<(), ActuationError> {
        self.record(KeyCall::Release(key.to_string()), key)
    }

    fn tap(&self, key: &Key) -> Result<(), ActuationError> {
        self.record(KeyCall::Tap(key.to_string()), key)
    }
}
