//! Heuristic gesture classifier
//!
//! Checks run in a fixed order and the first one that detects its gesture
//! with confidence above the acceptance threshold wins. Several gestures are
//! geometric subsets of others, so the order is the tie-break policy for
//! overlapping poses and must not be rearranged casually. New gestures are
//! added by appending a [`GestureCheck`].

use tracing::trace;

use super::{GestureSample, GestureType};
use crate::landmarks::{
    extract_finger_state, FingerState, Handedness, Landmark, LandmarkError, LandmarkFrame,
    LANDMARK_COUNT, INDEX_TIP, THUMB_TIP, WRIST,
};

/// Confidence a check must exceed to be accepted
pub const DEFAULT_ACCEPTANCE_THRESHOLD: f32 = 0.8;

/// Maximum thumb-tip to index-tip distance for an OK sign (normalized)
const OK_SIGN_PINCH_DISTANCE: f32 = 0.05;

/// Everything a check may look at for one hand
#[derive(Debug, Clone, Copy)]
pub struct HandPose<'a> {
    pub fingers: FingerState,
    pub landmarks: &'a [Landmark; LANDMARK_COUNT],
    pub handedness: Handedness,
}

/// Outcome of a single gesture check
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CheckResult {
    pub detected: bool,
    pub confidence: f32,
}

impl CheckResult {
    /// Detected with `hit` confidence when `detected`, otherwise `miss`
    fn score(detected: bool, hit: f32, miss: f32) -> Self {
        Self {
            detected,
            confidence: if detected { hit } else { miss },
        }
    }
}

/// A named gesture rule
#[derive(Clone, Copy)]
pub struct GestureCheck {
    pub gesture: GestureType,
    pub evaluate: fn(&HandPose<'_>) -> CheckResult,
}

impl std::fmt::Debug for GestureCheck {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GestureCheck")
            .field("gesture", &self.gesture)
            .finish()
    }
}

/// Built-in checks in priority order
pub const BUILTIN_CHECKS: &[GestureCheck] = &[
    GestureCheck {
        gesture: GestureType::Fist,
        evaluate: fist,
    },
    GestureCheck {
        gesture: GestureType::OpenPalm,
        evaluate: open_palm,
    },
    GestureCheck {
        gesture: GestureType::Pointing,
        evaluate: pointing,
    },
    GestureCheck {
        gesture: GestureType::PeaceSign,
        evaluate: peace_sign,
    },
    GestureCheck {
        gesture: GestureType::ThumbsUp,
        evaluate: thumbs_up,
    },
    GestureCheck {
        gesture: GestureType::ThumbsDown,
        evaluate: thumbs_down,
    },
    GestureCheck {
        gesture: GestureType::OkSign,
        evaluate: ok_sign,
    },
    GestureCheck {
        gesture: GestureType::RockOn,
        evaluate: rock_on,
    },
];

fn fist(pose: &HandPose<'_>) -> CheckResult {
    CheckResult::score(pose.fingers.extended_count() == 0, 0.95, 0.2)
}

fn open_palm(pose: &HandPose<'_>) -> CheckResult {
    CheckResult::score(pose.fingers.extended_count() == 5, 0.95, 0.2)
}

fn pointing(pose: &HandPose<'_>) -> CheckResult {
    CheckResult::score(pose.fingers.is_exactly(false, true, false, false, false), 0.9, 0.3)
}

fn peace_sign(pose: &HandPose<'_>) -> CheckResult {
    CheckResult::score(pose.fingers.is_exactly(false, true, true, false, false), 0.9, 0.3)
}

fn thumbs_up(pose: &HandPose<'_>) -> CheckResult {
    let thumb_only = pose.fingers.is_exactly(true, false, false, false, false);
    let raised = pose.landmarks[THUMB_TIP].y < pose.landmarks[WRIST].y;
    CheckResult::score(thumb_only && raised, 0.9, 0.3)
}

fn thumbs_down(pose: &HandPose<'_>) -> CheckResult {
    let thumb_only = pose.fingers.is_exactly(true, false, false, false, false);
    let lowered = pose.landmarks[THUMB_TIP].y > pose.landmarks[WRIST].y;
    CheckResult::score(thumb_only && lowered, 0.9, 0.3)
}

fn ok_sign(pose: &HandPose<'_>) -> CheckResult {
    let pinch = pose.landmarks[THUMB_TIP].distance(&pose.landmarks[INDEX_TIP]);
    let f = &pose.fingers;
    let others_up = f.middle && f.ring && f.pinky;
    CheckResult::score(pinch < OK_SIGN_PINCH_DISTANCE && others_up, 0.85, 0.3)
}

fn rock_on(pose: &HandPose<'_>) -> CheckResult {
    let f = &pose.fingers;
    CheckResult::score(f.thumb && f.index && f.pinky && !f.middle && !f.ring, 0.85, 0.3)
}

/// Ordered first-match classifier
#[derive(Debug, Clone)]
pub struct GestureClassifier {
    checks: Vec<GestureCheck>,
    threshold: f32,
}

impl Default for GestureClassifier {
    fn default() -> Self {
        Self::new(DEFAULT_ACCEPTANCE_THRESHOLD)
    }
}

impl GestureClassifier {
    /// Create a classifier with the built-in checks
    pub fn new(threshold: f32) -> Self {
        Self::with_checks(BUILTIN_CHECKS.to_vec(), threshold)
    }

    /// Create a classifier with a custom ordered check list
    pub fn with_checks(checks: Vec<GestureCheck>, threshold: f32) -> Self {
        Self { checks, threshold }
    }

    /// Classify one hand of one frame
    pub fn classify(
        &self,
        frame: &LandmarkFrame,
        timestamp_ms: u64,
    ) -> Result<GestureSample, LandmarkError> {
        let landmarks = frame.skeleton()?;
        let fingers = extract_finger_state(frame)?;
        let pose = HandPose {
            fingers,
            landmarks,
            handedness: frame.handedness,
        };

        let (gesture, confidence) = self.classify_pose(&pose);
        Ok(GestureSample {
            gesture,
            confidence,
            handedness: frame.handedness,
            timestamp_ms,
        })
    }

    /// Run the ordered checks, stopping at the first accepted one
    pub fn classify_pose(&self, pose: &HandPose<'_>) -> (GestureType, f32) {
        for check in &self.checks {
            let result = (check.evaluate)(pose);
            if result.detected && result.confidence > self.threshold {
                trace!(
                    gesture = %check.gesture,
                    hand = %pose.handedness,
                    confidence = result.confidence,
                    fingers = ?pose.fingers,
                    "gesture check accepted"
                );
                return (check.gesture, result.confidence);
            }
        }
        (GestureType::None, 0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::landmarks::fixtures::HandBuilder;
    use crate::landmarks::{
        INDEX_PIP, MIDDLE_PIP, MIDDLE_TIP, PINKY_PIP, PINKY_TIP, RING_PIP, RING_TIP,
    };

    fn classify(frame: LandmarkFrame) -> GestureSample {
        GestureClassifier::default().classify(&frame, 7).unwrap()
    }

    #[test]
    fn test_fist() {
        let sample = classify(HandBuilder::right().build());
        assert_eq!(sample.gesture, GestureType::Fist);
        assert_eq!(sample.confidence, 0.95);
        assert_eq!(sample.handedness, Handedness::Right);
        assert_eq!(sample.timestamp_ms, 7);
    }

    #[test]
    fn test_open_palm() {
        let sample = classify(HandBuilder::right().all_extended().build());
        assert_eq!(sample.gesture, GestureType::OpenPalm);
    }

    #[test]
    fn test_pointing_and_peace() {
        let pointing = HandBuilder::right().extend(INDEX_PIP, INDEX_TIP).build();
        assert_eq!(classify(pointing).gesture, GestureType::Pointing);

        let peace = HandBuilder::right()
            .extend(INDEX_PIP, INDEX_TIP)
            .extend(MIDDLE_PIP, MIDDLE_TIP)
            .build();
        assert_eq!(classify(peace).gesture, GestureType::PeaceSign);
    }

    #[test]
    fn test_thumbs_up_and_down() {
        let up = HandBuilder::right().thumb_out().thumb_tip_y(0.40).build();
        assert_eq!(classify(up).gesture, GestureType::ThumbsUp);

        let down = HandBuilder::right().thumb_out().thumb_tip_y(0.95).build();
        assert_eq!(classify(down).gesture, GestureType::ThumbsDown);
    }

    #[test]
    fn test_ok_sign_wins() {
        // Thumb tip 0.03 from the index tip, other three fingers up
        let index_tip = Landmark::new(0.44, 0.62, 0.0);
        let frame = HandBuilder::right()
            .set(INDEX_TIP, index_tip)
            .set(THUMB_TIP, Landmark::new(0.47, 0.62, 0.0))
            .extend(MIDDLE_PIP, MIDDLE_TIP)
            .extend(RING_PIP, RING_TIP)
            .extend(PINKY_PIP, PINKY_TIP)
            .build();

        let landmarks = frame.skeleton().unwrap();
        let pose = HandPose {
            fingers: extract_finger_state(&frame).unwrap(),
            landmarks,
            handedness: frame.handedness,
        };
        let result = ok_sign(&pose);
        assert!(result.detected);
        assert_eq!(result.confidence, 0.85);

        let sample = classify(frame);
        assert_eq!(sample.gesture, GestureType::OkSign);
        assert_eq!(sample.confidence, 0.85);
    }

    #[test]
    fn test_rock_on() {
        let frame = HandBuilder::right()
            .thumb_out()
            .extend(INDEX_PIP, INDEX_TIP)
            .extend(PINKY_PIP, PINKY_TIP)
            .build();
        assert_eq!(classify(frame).gesture, GestureType::RockOn);
    }

    #[test]
    fn test_unrecognized_pose_is_none() {
        // Index + ring matches no rule
        let frame = HandBuilder::right()
            .extend(INDEX_PIP, INDEX_TIP)
            .extend(RING_PIP, RING_TIP)
            .build();
        let sample = classify(frame);
        assert_eq!(sample.gesture, GestureType::None);
        assert_eq!(sample.confidence, 0.0);
    }

    #[test]
    fn test_order_is_tie_break() {
        fn always(_: &HandPose<'_>) -> CheckResult {
            CheckResult { detected: true, confidence: 0.99 }
        }
        let checks = vec![
            GestureCheck {
        gesture: GestureType::RockOn,
        evaluate: always,
    },
            GestureCheck {
        gesture: GestureType::Fist,
        evaluate: fist,
    },
        ];
        let classifier = GestureClassifier::with_checks(checks, DEFAULT_ACCEPTANCE_THRESHOLD);
        let sample = classifier.classify(&HandBuilder::right().build(), 0).unwrap();
        assert_eq!(sample.gesture, GestureType::RockOn);
    }

    #[test]
    fn test_threshold_is_strict() {
        fn borderline(_: &HandPose<'_>) -> CheckResult {
            CheckResult { detected: true, confidence: 0.8 }
        }
        let checks = vec![GestureCheck { gesture: GestureType::Fist, evaluate: borderline }];
        let classifier = GestureClassifier::with_checks(checks, 0.8);
        let sample = classifier.classify(&HandBuilder::right().build(), 0).unwrap();
        assert_eq!(sample.gesture, GestureType::None);
    }

    #[test]
    fn test_malformed_frame_is_error() {
        let frame = LandmarkFrame {
            landmarks: vec![Landmark::default(); 3],
            handedness: Handedness::Left,
            score: 1.0,
        };
        assert!(GestureClassifier::default().classify(&frame, 0).is_err());
    }
}
