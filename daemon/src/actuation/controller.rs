//! Actuation state machine
//!
//! Two states: Idle and Active. Active owns exactly one repeat task that
//! pulses the bound key combination at a fixed cadence. The old task is
//! always stopped and joined before a new one is spawned, so two sessions
//! never overlap.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use super::pulse::{pulse, release_modifiers};
use super::KeyActuator;
use crate::bindings::{KeyCombo, Keybinding};
use crate::events::PipelineEvent;
use crate::gesture::GestureType;
use crate::landmarks::Handedness;

/// Timing for the repeat task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActuationSettings {
    /// Time between pulses
    pub repeat_interval: Duration,
    /// How long to wait for the repeat task to finish before aborting it
    pub stop_timeout: Duration,
}

impl Default for ActuationSettings {
    fn default() -> Self {
        Self {
            repeat_interval: Duration::from_millis(100),
            stop_timeout: Duration::from_millis(250),
        }
    }
}

/// Externally visible controller state
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ActuationState {
    #[default]
    Idle,
    Active {
        binding_id: String,
        description: String,
        key_combo: String,
    },
}

impl std::fmt::Display for ActuationState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ActuationState::Idle => write!(f, "Idle"),
            ActuationState::Active { binding_id, .. } => write!(f, "Active({})", binding_id),
        }
    }
}

/// Why a session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// The stable gesture became `none`
    Released,
    /// The stable gesture changed to one with a different or no binding
    GestureChanged,
    /// The bound keybinding was deleted, disabled, edited, or its profile switched away
    BindingInvalidated,
    /// The daemon is shutting down
    Shutdown,
}

impl std::fmt::Display for StopReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StopReason::Released => write!(f, "released"),
            StopReason::GestureChanged => write!(f, "gesture_changed"),
            StopReason::BindingInvalidated => write!(f, "binding_invalidated"),
            StopReason::Shutdown => write!(f, "shutdown"),
        }
    }
}

/// A live actuation session
struct Session {
    binding: Keybinding,
    started_at: Instant,
    stop_tx: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

/// Starts and stops the key-repeat effect for the resolved binding
pub struct ActuationController {
    actuator: Arc<dyn KeyActuator>,
    settings: ActuationSettings,
    session: Option<Session>,
    event_tx: broadcast::Sender<PipelineEvent>,
}

impl ActuationController {
    pub fn new(
        actuator: Arc<dyn KeyActuator>,
        settings: ActuationSettings,
        event_tx: broadcast::Sender<PipelineEvent>,
    ) -> Self {
        Self {
            actuator,
            settings,
            session: None,
            event_tx,
        }
    }

    pub fn state(&self) -> ActuationState {
        match &self.session {
            None => ActuationState::Idle,
            Some(session) => ActuationState::Active {
                binding_id: session.binding.id.clone(),
                description: session.binding.label(),
                key_combo: session.binding.key_combo.to_string(),
            },
        }
    }

    pub fn is_active(&self) -> bool {
        self.session.is_some()
    }

    /// The binding the current session is driving
    pub fn bound(&self) -> Option<&Keybinding> {
        self.session.as_ref().map(|s| &s.binding)
    }

    /// React to a new stable gesture and its resolved binding
    ///
    /// The same binding while Active is a no-op. Anything else stops the
    /// current session first and then starts the new one, if any.
    pub async fn on_stable_gesture(
        &mut self,
        resolved: Option<&Keybinding>,
        gesture: GestureType,
        handedness: Handedness,
    ) {
        let reason = if gesture.is_none() {
            StopReason::Released
        } else {
            StopReason::GestureChanged
        };
        self.transition(resolved, gesture, handedness, reason).await;
    }

    /// Re-check the session after the binding set was replaced
    pub async fn on_bindings_replaced(
        &mut self,
        resolved: Option<&Keybinding>,
        gesture: GestureType,
        handedness: Handedness,
    ) {
        if self.is_active() {
            self.transition(resolved, gesture, handedness, StopReason::BindingInvalidated)
                .await;
        }
    }

    async fn transition(
        &mut self,
        resolved: Option<&Keybinding>,
        gesture: GestureType,
        handedness: Handedness,
        reason: StopReason,
    ) {
        if let (Some(current), Some(next)) = (self.bound(), resolved) {
            if current == next {
                debug!(binding = %next.id, "binding unchanged, session continues");
                return;
            }
        }

        self.stop(reason).await;

        if let Some(binding) = resolved {
            self.start(binding.clone(), gesture, handedness);
        }
    }

    /// Stop the current session, if any
    ///
    /// Signals the repeat task, waits for it (aborting after the stop
    /// timeout), then releases the outgoing binding's modifiers in reverse
    /// order. Returns whether a session was stopped.
    pub async fn stop(&mut self, reason: StopReason) -> bool {
        let Some(session) = self.session.take() else {
            return false;
        };

        let _ = session.stop_tx.send(());
        let mut task = session.task;
        if time::timeout(self.settings.stop_timeout, &mut task).await.is_err() {
            warn!(binding = %session.binding.id, "repeat task did not stop in time, aborting");
            task.abort();
        }

        release_modifiers(self.actuator.as_ref(), &session.binding.key_combo);

        let duration_ms = session.started_at.elapsed().as_millis() as u64;
        info!(
            from = "Active",
            to = "Idle",
            binding = %session.binding.id,
            %reason,
            duration_ms,
            "actuation stopped"
        );

        let _ = self.event_tx.send(PipelineEvent::ActuationStopped {
            binding_id: session.binding.id,
            reason,
            duration_ms,
        });
        true
    }

    fn start(&mut self, binding: Keybinding, gesture: GestureType, handedness: Handedness) {
        let (stop_tx, stop_rx) = oneshot::channel();
        let task = tokio::spawn(repeat(
            Arc::clone(&self.actuator),
            binding.id.clone(),
            binding.key_combo.clone(),
            self.settings.repeat_interval,
            stop_rx,
            self.event_tx.clone(),
        ));

        info!(
            from = "Idle",
            to = "Active",
            binding = %binding.id,
            keys = %binding.key_combo,
            %gesture,
            hand = %handedness,
            "actuation started"
        );

        let _ = self.event_tx.send(PipelineEvent::ActuationStarted {
            binding_id: binding.id.clone(),
            description: binding.label(),
            key_combo: binding.key_combo.to_string(),
            gesture,
            handedness,
        });

        self.session = Some(Session {
            binding,
            started_at: Instant::now(),
            stop_tx,
            task,
        });
    }
}

/// Repeat task body: pulse immediately, then once per interval, until stopped
///
/// Failed key calls are reported and retried on the next tick.
async fn repeat(
    actuator: Arc<dyn KeyActuator>,
    binding_id: String,
    combo: KeyCombo,
    period: Duration,
    mut stop_rx: oneshot::Receiver<()>,
    event_tx: broadcast::Sender<PipelineEvent>,
) {
    let mut ticker = time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = &mut stop_rx => break,
            _ = ticker.tick() => {
                for (key, error) in pulse(actuator.as_ref(), &combo) {
                    let _ = event_tx.send(PipelineEvent::ActuationFailed {
                        binding_id: binding_id.clone(),
                        key: key.to_string(),
                        error: error.to_string(),
                    });
                }
            }
        }
    }

    debug!(binding = %binding_id, "repeat task finished");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actuation::testing::{KeyCall, RecordingActuator};
    use crate::bindings::HandConstraint;

    fn binding(id: &str, combo: &str) -> Keybinding {
        crate::bindings::binding(id, GestureType::Fist, combo, HandConstraint::Any)
    }

    fn controller() -> (
        ActuationController,
        Arc<RecordingActuator>,
        broadcast::Receiver<PipelineEvent>,
    ) {
        let actuator = Arc::new(RecordingActuator::new());
        let (tx, rx) = broadcast::channel(256);
        let controller =
            ActuationController::new(actuator.clone(), ActuationSettings::default(), tx);
        (controller, actuator, rx)
    }

    fn drain(rx: &mut broadcast::Receiver<PipelineEvent>) -> Vec<PipelineEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    fn count_starts(events: &[PipelineEvent]) -> usize {
        events
            .iter()
            .filter(|e| matches!(e, PipelineEvent::ActuationStarted { .. }))
            .count()
    }

    fn count_stops(events: &[PipelineEvent]) -> usize {
        events
            .iter()
            .filter(|e| matches!(e, PipelineEvent::ActuationStopped { .. }))
            .count()
    }

    #[tokio::test(start_paused = true)]
    async fn test_taps_immediately_then_every_interval() {
        let (mut c, actuator, _rx) = controller();
        let space = binding("b1", "space");

        c.on_stable_gesture(Some(&space), GestureType::Fist, Handedness::Right)
            .await;
        assert!(c.is_active());

        time::sleep(Duration::from_millis(10)).await;
        assert_eq!(actuator.taps_of("space"), 1);

        time::sleep(Duration::from_millis(340)).await;
        assert_eq!(actuator.taps_of("space"), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_release_stops_exactly_once() {
        let (mut c, actuator, mut rx) = controller();
        let space = binding("b1", "space");

        c.on_stable_gesture(Some(&space), GestureType::Fist, Handedness::Right)
            .await;
        time::sleep(Duration::from_millis(250)).await;
        c.on_stable_gesture(None, GestureType::None, Handedness::Right)
            .await;
        assert_eq!(c.state(), ActuationState::Idle);

        let taps = actuator.taps();
        time::sleep(Duration::from_millis(500)).await;
        assert_eq!(actuator.taps(), taps);

        let events = drain(&mut rx);
        assert_eq!(count_starts(&events), 1);
        assert_eq!(count_stops(&events), 1);
        assert!(events.iter().any(|e| matches!(
            e,
            PipelineEvent::ActuationStopped { reason: StopReason::Released, .. }
        )));

        // A second release while Idle is silent
        c.on_stable_gesture(None, GestureType::None, Handedness::Right)
            .await;
        assert_eq!(count_stops(&drain(&mut rx)), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_same_binding_is_idempotent() {
        let (mut c, actuator, mut rx) = controller();
        let space = binding("b1", "space");

        c.on_stable_gesture(Some(&space), GestureType::Fist, Handedness::Right)
            .await;
        time::sleep(Duration::from_millis(50)).await;
        c.on_stable_gesture(Some(&space), GestureType::Fist, Handedness::Left)
            .await;
        time::sleep(Duration::from_millis(200)).await;

        // One timer: ticks at 0, 100, 200
        assert_eq!(actuator.taps_of("space"), 3);
        let events = drain(&mut rx);
        assert_eq!(count_starts(&events), 1);
        assert_eq!(count_stops(&events), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_switch_is_stop_then_start() {
        let (mut c, actuator, mut rx) = controller();
        let a = binding("a", "ctrl+a");
        let b = binding("b", "b");

        c.on_stable_gesture(Some(&a), GestureType::Fist, Handedness::Right)
            .await;
        time::sleep(Duration::from_millis(150)).await;
        c.on_stable_gesture(Some(&b), GestureType::OpenPalm, Handedness::Right)
            .await;
        time::sleep(Duration::from_millis(300)).await;

        let calls = actuator.calls();
        let first_b = calls
            .iter()
            .position(|c| *c == KeyCall::Tap("b".into()))
            .unwrap();
        assert!(calls[first_b..].iter().all(|c| *c != KeyCall::Tap("a".into())));
        // ctrl released after the last A pulse and before B begins
        assert_eq!(calls[first_b - 1], KeyCall::Release("ctrl".into()));

        let events = drain(&mut rx);
        let kinds: Vec<&str> = events
            .iter()
            .filter_map(|e| match e {
                PipelineEvent::ActuationStarted { .. } => Some("start"),
                PipelineEvent::ActuationStopped { .. } => Some("stop"),
                _ => None,
            })
            .collect();
        assert_eq!(kinds, vec!["start", "stop", "start"]);
        assert_eq!(c.bound().unwrap().id, "b");
    }

    #[tokio::test(start_paused = true)]
    async fn test_failures_do_not_stop_session() {
        let (mut c, actuator, mut rx) = controller();
        actuator.fail_on("space");
        let space = binding("b1", "space");

        c.on_stable_gesture(Some(&space), GestureType::Fist, Handedness::Right)
            .await;
        time::sleep(Duration::from_millis(250)).await;

        assert!(c.is_active());
        assert_eq!(actuator.taps_of("space"), 3);
        let failures = drain(&mut rx)
            .into_iter()
            .filter(|e| matches!(e, PipelineEvent::ActuationFailed { .. }))
            .count();
        assert_eq!(failures, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalidation_releases_modifiers() {
        let (mut c, actuator, mut rx) = controller();
        let combo = binding("b1", "ctrl+shift+s");

        c.on_stable_gesture(Some(&combo), GestureType::Fist, Handedness::Right)
            .await;
        time::sleep(Duration::from_millis(50)).await;
        actuator.clear();

        c.on_bindings_replaced(None, GestureType::Fist, Handedness::Right)
            .await;
        assert!(!c.is_active());
        assert_eq!(
            actuator.calls(),
            vec![
                KeyCall::Release("shift".into()),
                KeyCall::Release("ctrl".into()),
            ]
        );

        time::sleep(Duration::from_millis(300)).await;
        assert_eq!(actuator.taps(), 0);

        let events = drain(&mut rx);
        assert!(events.iter().any(|e| matches!(
            e,
            PipelineEvent::ActuationStopped { reason: StopReason::BindingInvalidated, .. }
        )));
    }

    #[tokio::test(start_paused = true)]
    async fn test_bindings_replaced_while_idle_does_nothing() {
        let (mut c, actuator, _rx) = controller();
        let space = binding("b1", "space");

        c.on_bindings_replaced(Some(&space), GestureType::Fist, Handedness::Right)
            .await;
        time::sleep(Duration::from_millis(200)).await;
        assert!(!c.is_active());
        assert!(actuator.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_edited_binding_restarts() {
        let (mut c, actuator, _rx) = controller();
        let before = binding("b1", "space");
        let after = binding("b1", "enter");

        c.on_stable_gesture(Some(&before), GestureType::Fist, Handedness::Right)
            .await;
        time::sleep(Duration::from_millis(50)).await;
        c.on_bindings_replaced(Some(&after), GestureType::Fist, Handedness::Right)
            .await;
        time::sleep(Duration::from_millis(50)).await;

        assert_eq!(actuator.taps_of("enter"), 1);
        assert_eq!(c.bound().unwrap().key_combo.to_string(), "enter");
    }
}
