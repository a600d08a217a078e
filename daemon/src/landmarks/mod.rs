//! Hand landmark input types
//!
//! A landmark frame is one detected hand: 21 ordered points in normalized
//! image space (y grows downward) plus the handedness label assigned by the
//! inference collaborator.

mod fingers;

pub use fingers::{extract_finger_state, FingerState};

use serde::{Deserialize, Serialize};

/// Number of points in a hand skeleton
pub const LANDMARK_COUNT: usize = 21;

pub const WRIST: usize = 0;
pub const THUMB_MCP: usize = 2;
pub const THUMB_TIP: usize = 4;
pub const INDEX_PIP: usize = 6;
pub const INDEX_TIP: usize = 8;
pub const MIDDLE_PIP: usize = 10;
pub const MIDDLE_TIP: usize = 12;
pub const RING_PIP: usize = 14;
pub const RING_TIP: usize = 16;
pub const PINKY_PIP: usize = 18;
pub const PINKY_TIP: usize = 20;

/// A single 3-D point locating a hand joint or fingertip
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
    #[serde(default)]
    pub z: f32,
}

impl Landmark {
    #[cfg(test)]
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Euclidean distance to another landmark
    pub fn distance(&self, other: &Landmark) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }

    fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

/// Which hand a detection belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Handedness {
    Left,
    Right,
}

impl std::fmt::Display for Handedness {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Handedness::Left => write!(f, "left"),
            Handedness::Right => write!(f, "right"),
        }
    }
}

/// One hand's landmarks for a single camera frame
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LandmarkFrame {
    pub landmarks: Vec<Landmark>,
    pub handedness: Handedness,
    /// Detector-level confidence for this hand
    #[serde(default = "default_score")]
    pub score: f32,
}

fn default_score() -> f32 {
    1.0
}

impl LandmarkFrame {
    /// Borrow the landmarks as a fixed-size skeleton
    ///
    /// Fails when fewer than 21 points are present or any coordinate is not
    /// a finite number. Extra trailing points are ignored.
    pub fn skeleton(&self) -> Result<&[Landmark; LANDMARK_COUNT], LandmarkError> {
        let points = self
            .landmarks
            .get(..LANDMARK_COUNT)
            .ok_or(LandmarkError::InvalidLandmarkSet {
                count: self.landmarks.len(),
            })?;

        if let Some(index) = points.iter().position(|p| !p.is_finite()) {
            return Err(LandmarkError::NonFiniteCoordinate { index });
        }

        points
            .try_into()
            .map_err(|_| LandmarkError::InvalidLandmarkSet {
                count: points.len(),
            })
    }
}

/// A single inference result: 0-2 detected hands
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InferenceFrame {
    #[serde(default)]
    pub hands: Vec<LandmarkFrame>,
    /// Capture timestamp in milliseconds, supplied by the inference side
    pub timestamp_ms: u64,
}

/// Malformed landmark input
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LandmarkError {
    #[error("invalid landmark set: expected 21 points, got {count}")]
    InvalidLandmarkSet { count: usize },

    #[error("invalid landmark set: point {index} has a non-finite coordinate")]
    NonFiniteCoordinate { index: usize },
}
