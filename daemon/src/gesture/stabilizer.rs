//! Temporal stabilization of per-frame classifications
//!
//! Keeps a bounded FIFO of recent samples and confirms a gesture once the
//! most recent `window` samples agree on its type. Only confirmed changes
//! are emitted, so a single-frame flicker cannot flip the stable gesture.
//!
//! A single focal stream is tracked: the pipeline feeds one sample per
//! frame, taken from the most recently observed hand.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{GestureSample, GestureType};
use crate::landmarks::Handedness;

/// Default number of samples retained
pub const DEFAULT_HISTORY: usize = 5;

/// Default number of consecutive agreeing samples needed for confirmation
pub const DEFAULT_WINDOW: usize = 3;

/// A confirmed transition of the stable gesture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StableGestureEvent {
    pub gesture: GestureType,
    pub handedness: Handedness,
    pub timestamp_ms: u64,
}

#[derive(Debug)]
pub struct TemporalStabilizer {
    history: VecDeque<GestureSample>,
    capacity: usize,
    window: usize,
    /// Last emitted stable event; `None` until something non-none has been confirmed
    stable: Option<StableGestureEvent>,
}

impl Default for TemporalStabilizer {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY, DEFAULT_WINDOW)
    }
}

impl TemporalStabilizer {
    /// Create a stabilizer; the window is clamped to `1..=capacity`
    pub fn new(capacity: usize, window: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            history: VecDeque::with_capacity(capacity),
            capacity,
            window: window.clamp(1, capacity),
            stable: None,
        }
    }

    /// The last confirmed stable gesture type
    pub fn stable_gesture(&self) -> GestureType {
        self.stable.map(|e| e.gesture).unwrap_or_default()
    }

    /// The last emitted stable event, if any
    pub fn last_event(&self) -> Option<StableGestureEvent> {
        self.stable
    }

    #[cfg(test)]
    fn history_len(&self) -> usize {
        self.history.len()
    }

    /// Feed one sample; returns an event only when the stable gesture changes
    ///
    /// Consensus looks at gesture type only. A confirmed non-none gesture is
    /// also emitted when it moves to the other hand, so that hand-constrained
    /// bindings are re-resolved.
    pub fn push(&mut self, sample: GestureSample) -> Option<StableGestureEvent> {
        if self.history.len() == self.capacity {
            self.history.pop_front();
        }
        self.history.push_back(sample);

        let confirmed = self.confirmed()?;
        let unchanged = match self.stable {
            // A release is a release whichever hand it is attributed to
            Some(prev) if confirmed.is_none() => prev.gesture.is_none(),
            Some(prev) => prev.gesture == confirmed && prev.handedness == sample.handedness,
            None => confirmed.is_none(),
        };
        if unchanged {
            return None;
        }

        let event = StableGestureEvent {
            gesture: confirmed,
            handedness: sample.handedness,
            timestamp_ms: sample.timestamp_ms,
        };

        debug!(
            from = %self.stable_gesture(),
            to = %confirmed,
            hand = %sample.handedness,
            "stable gesture changed"
        );

        self.stable = Some(event);
        Some(event)
    }

    /// The type shared by the most recent `window` samples, if they agree
    fn confirmed(&self) -> Option<GestureType> {
        if self.history.len() < self.window {
            return None;
        }

        let mut recent = self.history.iter().rev().take(self.window);
        let first = recent.next()?.gesture;
        recent.all(|s| s.gesture == first).then_some(first)
    }
}
