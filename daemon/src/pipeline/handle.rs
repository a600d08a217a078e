//! Command channel into the pipeline task

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, oneshot};
use tracing::debug;

use super::gate::{FrameGate, FramePermit};
use super::processor::PipelineStatus;
use crate::bindings::{ProfileCommand, ProfileError, ProfileListing};
use crate::landmarks::InferenceFrame;

/// Commands processed sequentially by the pipeline task
#[derive(Debug)]
pub enum PipelineCommand {
    Frame {
        frame: InferenceFrame,
        permit: FramePermit,
    },
    Configure {
        command: ProfileCommand,
        reply: oneshot::Sender<Result<(), ProfileError>>,
    },
    ListProfiles {
        reply: oneshot::Sender<ProfileListing>,
    },
    Status {
        reply: oneshot::Sender<PipelineStatus>,
    },
    Shutdown {
        reply: oneshot::Sender<()>,
    },
}

/// Whether a submitted frame was taken or dropped by the in-flight guard
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrameOutcome {
    Accepted,
    Dropped,
}

/// Cloneable sender side of the pipeline
#[derive(Debug, Clone)]
pub struct PipelineHandle {
    command_tx: mpsc::Sender<PipelineCommand>,
    gate: FrameGate,
}

impl PipelineHandle {
    pub fn new(command_tx: mpsc::Sender<PipelineCommand>, gate: FrameGate) -> Self {
        Self { command_tx, gate }
    }

    pub fn frames_dropped(&self) -> u64 {
        self.gate.dropped()
    }

    /// Hand a frame to the pipeline unless one is already in flight
    pub async fn submit_frame(&self, frame: InferenceFrame) -> Result<FrameOutcome> {
        let Some(permit) = self.gate.try_acquire() else {
            debug!(timestamp_ms = frame.timestamp_ms, "frame dropped, previous still in flight");
            return Ok(FrameOutcome::Dropped);
        };

        self.command_tx
            .send(PipelineCommand::Frame { frame, permit })
            .await
            .map_err(|_| anyhow::anyhow!("pipeline is not running"))?;
        Ok(FrameOutcome::Accepted)
    }

    pub async fn configure(&self, command: ProfileCommand) -> Result<Result<(), ProfileError>> {
        self.request(|reply| PipelineCommand::Configure { command, reply })
            .await
    }

    pub async fn list_profiles(&self) -> Result<ProfileListing> {
        self.request(|reply| PipelineCommand::ListProfiles { reply })
            .await
    }

    pub async fn status(&self) -> Result<PipelineStatus> {
        self.request(|reply| PipelineCommand::Status { reply }).await
    }

    /// Ask the pipeline to stop its session and exit
    pub async fn shutdown(&self) -> Result<()> {
        self.request(|reply| PipelineCommand::Shutdown { reply })
            .await
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<T>) -> PipelineCommand,
    ) -> Result<T> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.command_tx
            .send(build(reply_tx))
            .await
            .map_err(|_| anyhow::anyhow!("pipeline is not running"))?;
        reply_rx.await.context("pipeline dropped the request")
    }
}
