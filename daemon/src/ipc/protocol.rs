//! IPC message protocol definitions
//!
//! All messages are JSON-encoded, prefixed with a 4-byte little-endian length.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::actuation::ActuationState;
use crate::bindings::{Keybinding, Profile, ProfileCommand, ProfileListing};
use crate::events::PipelineEvent;
use crate::gesture::GestureType;
use crate::landmarks::{Handedness, LandmarkFrame};
use crate::pipeline::PipelineStatus;

/// Largest accepted message body
pub const MAX_MESSAGE_LEN: usize = 1024 * 1024;

/// Requests from clients to the daemon
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Request {
    /// Ping to check connectivity
    Ping,

    /// Request current daemon status
    GetStatus,

    /// Subscribe to pipeline event notifications
    Subscribe,

    /// One inference result (0-2 hands)
    SubmitFrame {
        #[serde(default)]
        hands: Vec<LandmarkFrame>,
        timestamp_ms: u64,
    },

    ListProfiles,

    UpsertProfile { profile: Profile },

    DeleteProfile { name: String },

    SetActiveProfile { name: String },

    UpsertBinding { profile: String, binding: Keybinding },

    DeleteBinding { profile: String, id: String },

    /// Set `enabled`, or flip it when omitted
    ToggleBinding {
        profile: String,
        id: String,
        #[serde(default)]
        enabled: Option<bool>,
    },
}

impl Request {
    /// The configuration edit this request carries, if any
    pub fn into_profile_command(self) -> Option<ProfileCommand> {
        let command = match self {
            Request::UpsertProfile { profile } => ProfileCommand::UpsertProfile(profile),
            Request::DeleteProfile { name } => ProfileCommand::DeleteProfile(name),
            Request::SetActiveProfile { name } => ProfileCommand::SetActiveProfile(name),
            Request::UpsertBinding { profile, binding } => {
                ProfileCommand::UpsertBinding { profile, binding }
            }
            Request::DeleteBinding { profile, id } => ProfileCommand::DeleteBinding { profile, id },
            Request::ToggleBinding { profile, id, enabled } => {
                ProfileCommand::ToggleBinding { profile, id, enabled }
            }
            _ => return None,
        };
        Some(command)
    }
}

/// Responses and notifications from daemon to clients
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Response {
    /// Current daemon status
    Status(DaemonStatus),

    /// Pong response to ping
    Pong,

    /// Subscription confirmed
    Subscribed,

    /// Frame handed to the pipeline
    FrameAccepted,

    /// Frame dropped because another is still being processed
    FrameDropped,

    /// Stored profiles
    Profiles(ProfileListing),

    /// Configuration edit applied
    Ok,

    /// Pushed to subscribed clients
    Notification { event: PipelineEvent },

    /// Error response
    Error { code: String, message: String },
}

impl Response {
    pub fn error(code: &str, message: impl Into<String>) -> Self {
        Response::Error {
            code: code.to_string(),
            message: message.into(),
        }
    }
}

/// Full daemon status snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DaemonStatus {
    /// Daemon version
    pub version: String,

    /// Uptime in seconds
    pub uptime_secs: u64,

    pub active_profile: String,

    pub stable_gesture: GestureType,

    pub stable_hand: Option<Handedness>,

    pub actuation: ActuationState,

    pub frames_processed: u64,

    /// Frames dropped by the in-flight guard
    pub frames_dropped: u64,

    pub hands_discarded: u64,
}

impl DaemonStatus {
    pub fn new(pipeline: PipelineStatus, uptime_secs: u64, frames_dropped: u64) -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            uptime_secs,
            active_profile: pipeline.active_profile,
            stable_gesture: pipeline.stable_gesture,
            stable_hand: pipeline.stable_hand,
            actuation: pipeline.actuation,
            frames_processed: pipeline.frames_processed,
            frames_dropped,
            hands_discarded: pipeline.hands_discarded,
        }
    }
}

/// Read one length-prefixed message body; `None` on clean EOF
pub async fn read_message<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Option<Vec<u8>>> {
    let mut len_buf = [0u8; 4];
    match reader.read_exact(&mut len_buf).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    }

    let len = u32::from_le_bytes(len_buf) as usize;
    anyhow::ensure!(len <= MAX_MESSAGE_LEN, "message too large: {len} bytes");

    let mut body = vec![0u8; len];
    reader
        .read_exact(&mut body)
        .await
        .context("truncated message body")?;
    Ok(Some(body))
}

/// Send a length-prefixed JSON message
pub async fn write_message<W, T>(writer: &mut W, msg: &T) -> Result<()>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    let msg_bytes = serde_json::to_vec(msg)?;
    let msg_len = (msg_bytes.len() as u32).to_le_bytes();

    writer.write_all(&msg_len).await?;
    writer.write_all(&msg_bytes).await?;
    writer.flush().await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_serialization() {
        let req = Request::ToggleBinding {
            profile: "default".to_string(),
            id: "b1".to_string(),
            enabled: None,
        };
        let json = serde_json::to_string(&req).unwrap();
        assert!(json.contains("toggle_binding"));

        let parsed: Request =
            serde_json::from_str(r#"{"type":"toggle_binding","profile":"p","id":"b1"}"#).unwrap();
        assert!(matches!(
            parsed.into_profile_command(),
            Some(ProfileCommand::ToggleBinding { enabled: None, .. })
        ));
    }

    #[test]
    fn test_submit_frame_parsing() {
        let json = r#"{"type":"submit_frame","timestamp_ms":12,"hands":[{"handedness":"left","landmarks":[{"x":0.1,"y":0.2}]}]}"#;
        let req: Request = serde_json::from_str(json).unwrap();
        match req {
            Request::SubmitFrame { hands, timestamp_ms } => {
                assert_eq!(timestamp_ms, 12);
                assert_eq!(hands[0].handedness, Handedness::Left);
                assert_eq!(hands[0].score, 1.0);
                assert_eq!(hands[0].landmarks[0].z, 0.0);
            }
            other => panic!("unexpected request {other:?}"),
        }
    }

    #[test]
    fn test_non_config_requests_carry_no_command() {
        assert!(Request::Ping.into_profile_command().is_none());
        assert!(Request::ListProfiles.into_profile_command().is_none());
    }

    #[test]
    fn test_notification_serialization() {
        let resp = Response::Notification {
            event: PipelineEvent::BindingsReplaced {
                profile: "default".to_string(),
                bindings: 2,
            },
        };
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.starts_with(r#"{"type":"notification","event":{"type":"bindings_replaced""#));
    }

    #[tokio::test]
    async fn test_message_framing() {
        let (mut client, mut server) = tokio::io::duplex(1024);
        write_message(&mut client, &Request::Ping).await.unwrap();
        drop(client);

        let body = read_message(&mut server).await.unwrap().unwrap();
        let req: Request = serde_json::from_slice(&body).unwrap();
        assert!(matches!(req, Request::Ping));
        assert!(read_message(&mut server).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_oversized_message_rejected() {
        let (mut client, mut server) = tokio::io::duplex(64);
        let len = (MAX_MESSAGE_LEN as u32 + 1).to_le_bytes();
        client.write_all(&len).await.unwrap();
        assert!(read_message(&mut server).await.is_err());
    }
}
