//! Gesture classification and temporal stabilization
//!
//! Per-frame classification is noisy; the stabilizer turns the sample
//! stream into edge-triggered "stable gesture changed" events.

mod classifier;
mod stabilizer;

pub use classifier::{GestureClassifier, DEFAULT_ACCEPTANCE_THRESHOLD};
pub use stabilizer::{StableGestureEvent, TemporalStabilizer};

use serde::{Deserialize, Serialize};

use crate::landmarks::Handedness;

/// Recognized gesture types, plus `None` for "nothing recognized"
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GestureType {
    #[default]
    None,
    Fist,
    OpenPalm,
    Pointing,
    PeaceSign,
    ThumbsUp,
    ThumbsDown,
    OkSign,
    RockOn,
}

impl GestureType {
    /// Wire name of the gesture
    pub fn as_str(&self) -> &'static str {
        match self {
            GestureType::None => "none",
            GestureType::Fist => "fist",
            GestureType::OpenPalm => "open_palm",
            GestureType::Pointing => "pointing",
            GestureType::PeaceSign => "peace_sign",
            GestureType::ThumbsUp => "thumbs_up",
            GestureType::ThumbsDown => "thumbs_down",
            GestureType::OkSign => "ok_sign",
            GestureType::RockOn => "rock_on",
        }
    }

    pub fn is_none(&self) -> bool {
        *self == GestureType::None
    }
}

impl std::fmt::Display for GestureType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One hand's classification for one frame
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GestureSample {
    pub gesture: GestureType,
    pub confidence: f32,
    pub handedness: Handedness,
    pub timestamp_ms: u64,
}

impl GestureSample {
    /// A "nothing recognized" sample
    pub fn none(handedness: Handedness, timestamp_ms: u64) -> Self {
        Self {
            gesture: GestureType::None,
            confidence: 0.0,
            handedness,
            timestamp_ms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gesture_serialization() {
        let json = serde_json::to_string(&GestureType::ThumbsDown).unwrap();
        assert_eq!(json, "\"thumbs_down\"");

        let parsed: GestureType = serde_json::from_str("\"ok_sign\"").unwrap();
        assert_eq!(parsed, GestureType::OkSign);
    }

    #[test]
    fn test_display_matches_wire_name() {
        assert_eq!(GestureType::RockOn.to_string(), "rock_on");
        assert_eq!(GestureType::None.to_string(), "none");
    }
}
