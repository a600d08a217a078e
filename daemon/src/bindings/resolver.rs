//! Stable gesture to keybinding lookup

use std::sync::Arc;

use super::{Keybinding, Profile};
use crate::gesture::StableGestureEvent;

/// Resolves stable gestures against the active profile snapshot
#[derive(Debug, Clone)]
pub struct BindingResolver {
    profile: Arc<Profile>,
}

impl BindingResolver {
    pub fn new(profile: Arc<Profile>) -> Self {
        Self { profile }
    }

    /// Swap in a new snapshot, returning the old one
    pub fn replace(&mut self, profile: Arc<Profile>) -> Arc<Profile> {
        std::mem::replace(&mut self.profile, profile)
    }

    /// First enabled binding in list order matching the event's gesture and hand
    pub fn resolve(&self, event: &StableGestureEvent) -> Option<&Keybinding> {
        if event.gesture.is_none() {
            return None;
        }
        self.profile
            .bindings
            .iter()
            .find(|b| b.matches(event.gesture, event.handedness))
    }
}
