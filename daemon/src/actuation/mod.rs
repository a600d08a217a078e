//! Key actuation
//!
//! The controller owns the single repeat task that re-triggers the bound
//! key combination while a gesture is held. OS key events go through the
//! [`KeyActuator`] capability so the platform backend can be swapped out.

mod controller;
mod dry_run;
mod keycodes;
#[cfg(target_os = "macos")]
mod macos;
mod pulse;
#[cfg(test)]
pub(crate) mod testing;

pub use controller::{ActuationController, ActuationSettings, ActuationState, StopReason};
pub use dry_run::DryRunActuator;
pub use keycodes::virtual_keycode;
#[cfg(target_os = "macos")]
pub use macos::CgEventActuator;

use std::sync::Arc;

use tracing::info;

use crate::bindings::Key;

/// Errors from OS-level key calls
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ActuationError {
    #[error("no key code for {0}")]
    UnknownKey(String),

    // Only the CGEvent backend builds native events
    #[cfg_attr(not(target_os = "macos"), allow(dead_code))]
    #[error("failed to create keyboard event for {0}")]
    EventCreation(String),
}

/// Opaque press/hold/release capability provided by the platform
///
/// Implementations must return quickly; they are called from the repeat
/// task on every tick.
pub trait KeyActuator: Send + Sync {
    fn press(&self, key: &Key) -> Result<(), ActuationError>;
    fn release(&self, key: &Key) -> Result<(), ActuationError>;

    /// Press and release `key`
    fn tap(&self, key: &Key) -> Result<(), ActuationError> {
        self.press(key)?;
        self.release(key)
    }
}

/// Pick the actuator backend for this platform
pub fn platform_actuator(dry_run: bool) -> Arc<dyn KeyActuator> {
    if dry_run {
        info!("key actuation in dry-run mode");
        return Arc::new(DryRunActuator);
    }

    #[cfg(target_os = "macos")]
    {
        info!("key actuation via CGEvent");
        Arc::new(CgEventActuator::new())
    }

    #[cfg(not(target_os = "macos"))]
    {
        tracing::warn!("no native key actuation on this platform, falling back to dry-run");
        Arc::new(DryRunActuator)
    }
}
