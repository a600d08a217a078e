//! Events emitted by the gesture pipeline
//!
//! Fire-and-forget notifications for UI display: stable gesture changes and
//! actuation session transitions. Delivered over a broadcast channel.

use serde::{Deserialize, Serialize};

use crate::actuation::StopReason;
use crate::gesture::GestureType;
use crate::landmarks::Handedness;

/// Events emitted by the pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PipelineEvent {
    /// The stabilized gesture changed (including back to `none`)
    StableGestureChanged {
        gesture: GestureType,
        handedness: Handedness,
        timestamp_ms: u64,
    },

    /// An actuation session began repeating a binding
    ActuationStarted {
        binding_id: String,
        description: String,
        key_combo: String,
        gesture: GestureType,
        handedness: Handedness,
    },

    /// The actuation session ended
    ActuationStopped {
        binding_id: String,
        reason: StopReason,
        /// How long the session was active
        duration_ms: u64,
    },

    /// An OS key call failed; the session keeps going
    ActuationFailed {
        binding_id: String,
        key: String,
        error: String,
    },

    /// A new active binding set was installed
    BindingsReplaced {
        profile: String,
        bindings: usize,
    },
}

impl std::fmt::Display for PipelineEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PipelineEvent::StableGestureChanged { gesture, handedness, .. } => {
                write!(f, "STABLE_GESTURE {} ({})", gesture, handedness)
            }
            PipelineEvent::ActuationStarted { binding_id, key_combo, .. } => {
                write!(f, "ACTUATION_STARTED {} [{}]", binding_id, key_combo)
            }
            PipelineEvent::ActuationStopped { binding_id, reason, duration_ms } => {
                write!(f, "ACTUATION_STOPPED {} {} ({}ms)", binding_id, reason, duration_ms)
            }
            PipelineEvent::ActuationFailed { binding_id, key, .. } => {
                write!(f, "ACTUATION_FAILED {} key={}", binding_id, key)
            }
            PipelineEvent::BindingsReplaced { profile, bindings } => {
                write!(f, "BINDINGS_REPLACED {} ({} bindings)", profile, bindings)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serialization() {
        let event = PipelineEvent::ActuationStopped {
            binding_id: "b1".to_string(),
            reason: StopReason::Released,
            duration_ms: 1500,
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"actuation_stopped\""));
        assert!(json.contains("\"reason\":\"released\""));
        assert!(json.contains("1500"));
    }

    #[test]
    fn test_event_deserialization() {
        let json = r#"{"type":"stable_gesture_changed","gesture":"fist","handedness":"left","timestamp_ms":3}"#;
        let event: PipelineEvent = serde_json::from_str(json).unwrap();
        assert_eq!(
            event,
            PipelineEvent::StableGestureChanged {
                gesture: GestureType::Fist,
                handedness: Handedness::Left,
                timestamp_ms: 3,
            }
        );
        assert_eq!(event.to_string(), "STABLE_GESTURE fist (left)");
    }
}
