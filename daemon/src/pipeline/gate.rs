//! In-flight guard for frame processing
//!
//! At most one frame is in flight. A frame that arrives while another is
//! still being processed is dropped rather than queued.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone, Default)]
pub struct FrameGate {
    busy: Arc<AtomicBool>,
    dropped: Arc<AtomicU64>,
}

impl FrameGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the gate, or count a dropped frame if it is already held
    pub fn try_acquire(&self) -> Option<FramePermit> {
        if self.busy.swap(true, Ordering::AcqRel) {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            return None;
        }
        Some(FramePermit {
            busy: Arc::clone(&self.busy),
        })
    }

    #[cfg(test)]
    fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Frames dropped since startup
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

/// Held while a frame is in flight; releases the gate on drop
#[derive(Debug)]
pub struct FramePermit {
    busy: Arc<AtomicBool>,
}

impl Drop for FramePermit {
    fn drop(&mut self) {
        self.busy.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_frame_dropped_while_in_flight() {
        let gate = FrameGate::new();
        let permit = gate.try_acquire().unwrap();
        assert!(gate.is_busy());
        assert!(gate.try_acquire().is_none());
        assert_eq!(gate.dropped(), 1);

        drop(permit);
        assert!(!gate.is_busy());
        assert!(gate.try_acquire().is_some());
        assert_eq!(gate.dropped(), 1);
    }

    #[test]
    fn test_clones_share_state() {
        let gate = FrameGate::new();
        let other = gate.clone();
        let _permit = gate.try_acquire().unwrap();
        assert!(other.try_acquire().is_none());
        assert_eq!(gate.dropped(), 1);
    }
}
