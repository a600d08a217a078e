//! Unix domain socket server for IPC
//!
//! Serves the inference client (frame submission) and the configuration
//! surface (profile edits, status), and pushes pipeline events to
//! subscribed clients.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::UnixListener;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, error, info, trace, warn};

use super::protocol::{read_message, write_message, DaemonStatus, Request, Response};
use crate::events::PipelineEvent;
use crate::landmarks::InferenceFrame;
use crate::pipeline::{FrameOutcome, PipelineHandle};

/// IPC Server handling client connections
pub struct Server {
    socket_path: PathBuf,
    listener: Option<UnixListener>,
    context: Arc<ClientContext>,
    shutdown_tx: broadcast::Sender<()>,
}

/// What every client handler needs
struct ClientContext {
    pipeline: PipelineHandle,
    events: broadcast::Sender<PipelineEvent>,
    start_time: Instant,
}

impl Server {
    /// Bind the socket and create a server
    pub fn new(
        socket_path: &Path,
        pipeline: PipelineHandle,
        events: broadcast::Sender<PipelineEvent>,
    ) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = socket_path.parent() {
            std::fs::create_dir_all(parent)
                .context("failed to create socket directory")?;
        }

        // Remove stale socket if it exists
        if socket_path.exists() {
            std::fs::remove_file(socket_path)
                .context("failed to remove stale socket")?;
        }

        let listener = UnixListener::bind(socket_path)
            .context("failed to bind Unix socket")?;

        // Set socket permissions to owner-only (0600)
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(socket_path, std::fs::Permissions::from_mode(0o600))?;
        }

        let (shutdown_tx, _) = broadcast::channel(1);

        info!(?socket_path, "IPC server listening");

        Ok(Self {
            socket_path: socket_path.to_owned(),
            listener: Some(listener),
            context: Arc::new(ClientContext::new(pipeline, events)),
            shutdown_tx,
        })
    }

    /// Run the server, accepting connections
    pub async fn run(&self) -> Result<()> {
        let listener = self.listener.as_ref()
            .context("server not initialized")?;

        loop {
            match listener.accept().await {
                Ok((stream, _addr)) => {
                    debug!("client connected");
                    let context = Arc::clone(&self.context);
                    let mut shutdown_rx = self.shutdown_tx.subscribe();

                    tokio::spawn(async move {
                        tokio::select! {
                            result = handle_client(stream, context) => {
                                if let Err(e) = result {
                                    warn!(?e, "client handler error");
                                }
                            }
                            _ = shutdown_rx.recv() => {
                                debug!("client handler shutting down");
                            }
                        }
                    });
                }
                Err(e) => {
                    error!(?e, "accept error");
                }
            }
        }
    }

    /// Gracefully shutdown the server
    pub async fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());

        // Remove socket file
        if self.socket_path.exists() {
            if let Err(e) = std::fs::remove_file(&self.socket_path) {
                warn!(?e, "failed to remove socket file");
            }
        }

        info!("IPC server shutdown complete");
    }
}

impl ClientContext {
    fn new(pipeline: PipelineHandle, events: broadcast::Sender<PipelineEvent>) -> Self {
        Self {
            pipeline,
            events,
            start_time: Instant::now(),
        }
    }
}

/// Handle a single client connection
///
/// Reading happens on a separate task so that a partially read message is
/// never lost when a notification is written in between.
async fn handle_client<S>(stream: S, context: Arc<ClientContext>) -> Result<()>
where
    S: AsyncRead + AsyncWrite + Send + 'static,
{
    let (mut reader, mut writer) = tokio::io::split(stream);
    let (body_tx, mut body_rx) = mpsc::channel::<Result<Vec<u8>>>(16);

    let reader_task = tokio::spawn(async move {
        loop {
            match read_message(&mut reader).await {
                Ok(Some(body)) => {
                    if body_tx.send(Ok(body)).await.is_err() {
                        break;
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    let _ = body_tx.send(Err(e)).await;
                    break;
                }
            }
        }
    });

    let mut subscription: Option<broadcast::Receiver<PipelineEvent>> = None;

    let result = loop {
        tokio::select! {
            message = body_rx.recv() => {
                let body = match message {
                    None => {
                        debug!("client disconnected");
                        break Ok(());
                    }
                    Some(Err(e)) => break Err(e),
                    Some(Ok(body)) => body,
                };

                let response = match serde_json::from_slice::<Request>(&body) {
                    Ok(Request::Subscribe) => {
                        subscription = Some(context.events.subscribe());
                        debug!("client subscribed to notifications");
                        Response::Subscribed
                    }
                    Ok(request) => process_request(request, &context).await,
                    Err(e) => {
                        warn!(error = %e, "failed to parse request");
                        Response::error("bad_request", e.to_string())
                    }
                };

                if let Err(e) = write_message(&mut writer, &response).await {
                    break Err(e);
                }
            }

            event = next_event(&mut subscription) => {
                match event {
                    Ok(event) => {
                        let notification = Response::Notification { event };
                        if let Err(e) = write_message(&mut writer, &notification).await {
                            break Err(e);
                        }
                    }
                    Err(RecvError::Lagged(n)) => {
                        warn!(skipped = n, "subscriber lagged, notifications dropped");
                    }
                    Err(RecvError::Closed) => {
                        subscription = None;
                    }
                }
            }
        }
    };

    reader_task.abort();
    result
}

/// Next event for a subscribed client; never resolves when not subscribed
async fn next_event(
    subscription: &mut Option<broadcast::Receiver<PipelineEvent>>,
) -> Result<PipelineEvent, RecvError> {
    match subscription {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

/// Process a request and return a response
async fn process_request(request: Request, context: &ClientContext) -> Response {
    match request {
        Request::Ping => Response::Pong,

        Request::Subscribe => Response::Subscribed,

        Request::GetStatus => match context.pipeline.status().await {
            Ok(status) => Response::Status(DaemonStatus::new(
                status,
                context.start_time.elapsed().as_secs(),
                context.pipeline.frames_dropped(),
            )),
            Err(e) => Response::error("unavailable", e.to_string()),
        },

        Request::SubmitFrame { hands, timestamp_ms } => {
            trace!(hands = hands.len(), timestamp_ms, "frame received");
            let frame = InferenceFrame { hands, timestamp_ms };
            match context.pipeline.submit_frame(frame).await {
                Ok(FrameOutcome::Accepted) => Response::FrameAccepted,
                Ok(FrameOutcome::Dropped) => Response::FrameDropped,
                Err(e) => Response::error("unavailable", e.to_string()),
            }
        }

        Request::ListProfiles => match context.pipeline.list_profiles().await {
            Ok(listing) => Response::Profiles(listing),
            Err(e) => Response::error("unavailable", e.to_string()),
        },

        edit => {
            debug!(?edit, "configuration request");
            let Some(command) = edit.into_profile_command() else {
                return Response::error("bad_request", "unsupported request");
            };
            match context.pipeline.configure(command).await {
                Ok(Ok(())) => Response::Ok,
                Ok(Err(e)) => Response::error(e.code(), e.to_string()),
                Err(e) => Response::error("unavailable", e.to_string()),
            }
        }
    }
}
