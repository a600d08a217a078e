//! The gesture pipeline proper

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};

use super::handle::PipelineCommand;
use crate::actuation::{ActuationController, ActuationState, KeyActuator, StopReason};
use crate::bindings::{BindingResolver, Profile, ProfileCommand, ProfileError, ProfileStore};
use crate::config::PipelineSettings;
use crate::events::PipelineEvent;
use crate::gesture::{
    GestureClassifier, GestureSample, GestureType, StableGestureEvent, TemporalStabilizer,
};
use crate::landmarks::{Handedness, InferenceFrame};

/// Snapshot of pipeline state for status queries
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineStatus {
    pub active_profile: String,
    pub stable_gesture: GestureType,
    pub stable_hand: Option<Handedness>,
    pub actuation: ActuationState,
    pub frames_processed: u64,
    /// Hands skipped because their landmark set was malformed
    pub hands_discarded: u64,
}

pub struct GesturePipeline {
    classifier: GestureClassifier,
    stabilizer: TemporalStabilizer,
    store: ProfileStore,
    resolver: BindingResolver,
    controller: ActuationController,
    min_detection_score: f32,
    /// Hand used for the `none` sample fed on empty frames
    last_hand: Handedness,
    frames_processed: u64,
    hands_discarded: u64,
    event_tx: broadcast::Sender<PipelineEvent>,
}

impl GesturePipeline {
    pub fn new(
        settings: &PipelineSettings,
        actuator: Arc<dyn KeyActuator>,
        event_tx: broadcast::Sender<PipelineEvent>,
    ) -> Self {
        let store = ProfileStore::new();
        let resolver = BindingResolver::new(store.active());
        Self {
            classifier: GestureClassifier::new(settings.acceptance_threshold),
            stabilizer: TemporalStabilizer::new(
                settings.history_capacity,
                settings.consensus_window,
            ),
            store,
            resolver,
            controller: ActuationController::new(actuator, settings.actuation, event_tx.clone()),
            min_detection_score: settings.min_detection_score,
            last_hand: Handedness::Right,
            frames_processed: 0,
            hands_discarded: 0,
            event_tx,
        }
    }

    pub fn status(&self) -> PipelineStatus {
        let stable = self.stabilizer.last_event();
        PipelineStatus {
            active_profile: self.store.active_name().to_string(),
            stable_gesture: self.stabilizer.stable_gesture(),
            stable_hand: stable.filter(|e| !e.gesture.is_none()).map(|e| e.handedness),
            actuation: self.controller.state(),
            frames_processed: self.frames_processed,
            hands_discarded: self.hands_discarded,
        }
    }

    /// Process one inference result
    ///
    /// Hands below the detection score are ignored. A frame with no hands
    /// left feeds a `none` sample so that a hand leaving view releases the
    /// gesture. Malformed hands are discarded without producing a sample.
    /// With two valid hands only the later one in the frame is sampled.
    pub async fn process_frame(&mut self, frame: &InferenceFrame) {
        self.frames_processed += 1;

        let hands: Vec<_> = frame
            .hands
            .iter()
            .filter(|h| h.score >= self.min_detection_score)
            .collect();

        if hands.is_empty() {
            let sample = GestureSample::none(self.last_hand, frame.timestamp_ms);
            self.observe(sample).await;
            return;
        }

        // Last valid hand in frame order wins; the others are not sampled
        let mut latest = None;
        for hand in hands {
            match self.classifier.classify(hand, frame.timestamp_ms) {
                Ok(sample) => latest = Some(sample),
                Err(e) => {
                    self.hands_discarded += 1;
                    debug!(error = %e, hand = %hand.handedness, "discarding hand");
                }
            }
        }

        if let Some(sample) = latest {
            self.last_hand = sample.handedness;
            self.observe(sample).await;
        }
    }

    async fn observe(&mut self, sample: GestureSample) {
        if let Some(event) = self.stabilizer.push(sample) {
            self.on_stable(event).await;
        }
    }

    async fn on_stable(&mut self, event: StableGestureEvent) {
        info!(gesture = %event.gesture, hand = %event.handedness, "stable gesture");
        let _ = self.event_tx.send(PipelineEvent::StableGestureChanged {
            gesture: event.gesture,
            handedness: event.handedness,
            timestamp_ms: event.timestamp_ms,
        });

        let resolved = self.resolver.resolve(&event).cloned();
        if resolved.is_none() && !event.gesture.is_none() {
            debug!(gesture = %event.gesture, "no binding for gesture");
        }
        self.controller
            .on_stable_gesture(resolved.as_ref(), event.gesture, event.handedness)
            .await;
    }

    /// Apply a configuration edit and install the new snapshot if needed
    pub async fn configure(&mut self, command: ProfileCommand) -> Result<(), ProfileError> {
        if let Some(snapshot) = self.store.apply(command)? {
            self.install(snapshot).await;
        }
        Ok(())
    }

    /// Swap the resolver's binding set and re-resolve the held gesture
    async fn install(&mut self, snapshot: Arc<Profile>) {
        info!(
            profile = %snapshot.name,
            bindings = snapshot.bindings.len(),
            "binding set replaced"
        );
        let _ = self.event_tx.send(PipelineEvent::BindingsReplaced {
            profile: snapshot.name.clone(),
            bindings: snapshot.bindings.len(),
        });
        self.resolver.replace(snapshot);

        let stable = self.stabilizer.last_event();
        let resolved = stable.and_then(|e| self.resolver.resolve(&e).cloned());
        let (gesture, hand) = stable
            .map(|e| (e.gesture, e.handedness))
            .unwrap_or((GestureType::None, self.last_hand));
        self.controller
            .on_bindings_replaced(resolved.as_ref(), gesture, hand)
            .await;
    }

    /// Stop any session and release held keys
    pub async fn shutdown(&mut self) {
        if self.controller.stop(StopReason::Shutdown).await {
            info!("actuation session stopped for shutdown");
        }
    }

    /// Process commands until the channel closes or shutdown is requested
    pub async fn run(&mut self, mut command_rx: mpsc::Receiver<PipelineCommand>) {
        info!("pipeline started in Idle state");

        while let Some(command) = command_rx.recv().await {
            match command {
                PipelineCommand::Frame { frame, permit } => {
                    self.process_frame(&frame).await;
                    drop(permit);
                }
                PipelineCommand::Configure { command, reply } => {
                    let result = self.configure(command).await;
                    if let Err(e) = &result {
                        warn!(error = %e, "configuration edit rejected");
                    }
                    let _ = reply.send(result);
                }
                PipelineCommand::ListProfiles { reply } => {
                    let _ = reply.send(self.store.listing());
                }
                PipelineCommand::Status { reply } => {
                    let _ = reply.send(self.status());
                }
                PipelineCommand::Shutdown { reply } => {
                    self.shutdown().await;
                    let _ = reply.send(());
                    break;
                }
            }
        }

        self.shutdown().await;
        info!("pipeline stopped");
    }
}
