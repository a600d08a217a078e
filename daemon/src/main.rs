//! gesture-keys-daemon: turns hand-landmark frames into held key combinations
//!
//! This daemon runs in the background and provides:
//! - Per-frame gesture classification from 21-point hand landmarks
//! - Temporal stabilization into edge-triggered gesture changes
//! - Profile-based gesture to key-combination bindings
//! - A key-repeat actuation session while a bound gesture is held
//! - IPC for frame submission, configuration and event subscription
//!
//! Camera capture and the landmark model live in a separate inference
//! client that submits frames over the socket.

mod actuation;
mod bindings;
mod config;
mod events;
mod gesture;
mod ipc;
mod landmarks;
mod lifecycle;
mod pipeline;

use anyhow::Result;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::actuation::platform_actuator;
use crate::config::Config;
use crate::events::PipelineEvent;
use crate::ipc::Server;
use crate::lifecycle::ShutdownSignal;
use crate::pipeline::{FrameGate, GesturePipeline, PipelineHandle};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info"))
        )
        .init();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "gesture-keys-daemon starting"
    );

    // Load configuration
    let config = Config::load()?;
    config.ensure_dirs()?;
    info!(?config.socket_path, dry_run = config.dry_run, "configuration loaded");

    let mut shutdown = ShutdownSignal::new()?;

    // IPC server -> pipeline
    let (command_tx, command_rx) = mpsc::channel(64);
    // Pipeline -> subscribers (IPC clients, log sink)
    let (event_tx, _event_rx) = broadcast::channel::<PipelineEvent>(256);

    let actuator = platform_actuator(config.dry_run);
    let mut pipeline = GesturePipeline::new(&config.pipeline, actuator, event_tx.clone());
    let handle = PipelineHandle::new(command_tx, FrameGate::new());

    let server = Server::new(&config.socket_path, handle.clone(), event_tx.clone())?;

    let mut log_rx = event_tx.subscribe();

    info!("daemon initialized, entering main loop");

    let pipeline_task = tokio::spawn(async move { pipeline.run(command_rx).await });

    // Main event loop
    tokio::select! {
        // Run the IPC server (accepts client connections)
        result = server.run() => {
            if let Err(e) = result {
                error!(?e, "IPC server error");
            }
        }

        // Observability sink for pipeline events
        _ = async {
            loop {
                match log_rx.recv().await {
                    Ok(event @ PipelineEvent::ActuationFailed { .. }) => {
                        // Already logged at warn by the repeat task
                        debug!(%event, "pipeline event");
                    }
                    Ok(event) => {
                        info!(%event, "pipeline event");
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!(skipped = n, "event log receiver lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        break;
                    }
                }
            }
        } => {
            info!("event log sink exited");
        }

        // Wait for shutdown signal
        signal = shutdown.wait() => {
            info!(signal, "shutdown signal received");
        }
    }

    // Cleanup
    info!("shutting down...");

    // Release any held keys before the process goes away
    if let Err(e) = handle.shutdown().await {
        warn!(?e, "pipeline already stopped");
    }
    if let Err(e) = pipeline_task.await {
        error!(?e, "pipeline task failed");
    }
    server.shutdown().await;

    info!("gesture-keys-daemon stopped");

    Ok(())
}
