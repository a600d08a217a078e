//! Per-finger extension flags derived from landmark geometry

use serde::{Deserialize, Serialize};

use super::{
    Handedness, LandmarkError, LandmarkFrame, INDEX_PIP, INDEX_TIP, MIDDLE_PIP, MIDDLE_TIP,
    PINKY_PIP, PINKY_TIP, RING_PIP, RING_TIP, THUMB_MCP, THUMB_TIP,
};

/// Which fingers are extended
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FingerState {
    pub thumb: bool,
    pub index: bool,
    pub middle: bool,
    pub ring: bool,
    pub pinky: bool,
}

impl FingerState {
    pub const fn new(thumb: bool, index: bool, middle: bool, ring: bool, pinky: bool) -> Self {
        Self {
            thumb,
            index,
            middle,
            ring,
            pinky,
        }
    }

    /// Number of extended fingers
    pub fn extended_count(&self) -> usize {
        [self.thumb, self.index, self.middle, self.ring, self.pinky]
            .iter()
            .filter(|&&extended| extended)
            .count()
    }

    /// Check that exactly the given fingers are extended
    pub fn is_exactly(
        &self,
        thumb: bool,
        index: bool,
        middle: bool,
        ring: bool,
        pinky: bool,
    ) -> bool {
        *self == Self::new(thumb, index, middle, ring, pinky)
    }
}

/// Derive finger extension flags for one hand
///
/// Non-thumb fingers are extended when the tip sits above (smaller y) its
/// PIP joint. The thumb moves laterally, so it is compared on x against its
/// MCP joint, mirrored by handedness.
pub fn extract_finger_state(frame: &LandmarkFrame) -> Result<FingerState, LandmarkError> {
    let points = frame.skeleton()?;
    let above = |tip: usize, pip: usize| points[tip].y < points[pip].y;

    let thumb_tip = points[THUMB_TIP].x;
    let thumb_mcp = points[THUMB_MCP].x;
    let thumb = match frame.handedness {
        Handedness::Right => thumb_tip < thumb_mcp,
        Handedness::Left => thumb_tip > thumb_mcp,
    };

    Ok(FingerState {
        thumb,
        index: above(INDEX_TIP, INDEX_PIP),
        middle: above(MIDDLE_TIP, MIDDLE_PIP),
        ring: above(RING_TIP, RING_PIP),
        pinky: above(PINKY_TIP, PINKY_PIP),
    })
}
