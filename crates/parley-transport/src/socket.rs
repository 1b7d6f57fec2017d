// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Persistent WebSocket connection to the chat backend.
//!
//! One background task owns the socket. Outgoing frames arrive over an
//! mpsc channel, incoming frames are decoded and forwarded as
//! [`TransportEvent`]s. When the stream ends for any reason the task
//! emits `Disconnected` and exits; reconnection policy lives in the
//! engine, not here.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use futures::{SinkExt, StreamExt};
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tracing::{debug, warn};

use parley_codec::{classify_init, convert_message};
use parley_core::{ChatConfig, ParleyError, TransportEvent};

use crate::frames::{ERROR_CODE_TOKEN_REJECTED, IncomingFrame, OutgoingFrame};

struct SocketHandle {
    frame_tx: mpsc::Sender<OutgoingFrame>,
    task: JoinHandle<()>,
}

/// Socket connection owner. `connect` replaces any previous connection.
pub struct Socket {
    handle: Mutex<Option<SocketHandle>>,
    connected: Arc<AtomicBool>,
    event_tx: mpsc::Sender<TransportEvent>,
}

impl Socket {
    pub fn new(event_tx: mpsc::Sender<TransportEvent>) -> Self {
        Self {
            handle: Mutex::new(None),
            connected: Arc::new(AtomicBool::new(false)),
            event_tx,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    /// Opens the socket, sends the init frame, and spawns the read/write
    /// loop. Any previous connection is torn down first.
    pub async fn connect(
        &self,
        url: &str,
        token: Option<&str>,
        config: &ChatConfig,
    ) -> Result<(), ParleyError> {
        self.disconnect().await;

        let (ws, _response) = connect_async(url).await.map_err(|e| {
            ParleyError::Transport {
                message: format!("socket connect to {url} failed: {e}"),
                source: Some(Box::new(e)),
            }
        })?;
        debug!(%url, "socket connected");

        let (frame_tx, frame_rx) = mpsc::channel(64);
        let init = OutgoingFrame::ChatInit {
            token: token.map(str::to_string),
            company_id: config.company_id.clone(),
            channel_id: config.channel_id.clone(),
        };
        frame_tx
            .send(init)
            .await
            .map_err(|_| ParleyError::transport("socket task unavailable"))?;

        self.connected.store(true, Ordering::Release);
        let task = tokio::spawn(run_loop(
            ws,
            frame_rx,
            self.event_tx.clone(),
            Arc::clone(&self.connected),
        ));

        *self.handle.lock().await = Some(SocketHandle { frame_tx, task });
        let _ = self.event_tx.send(TransportEvent::Connected).await;
        Ok(())
    }

    /// Queues a frame for the socket task.
    pub async fn send(&self, frame: OutgoingFrame) -> Result<(), ParleyError> {
        let handle = self.handle.lock().await;
        let handle = handle.as_ref().ok_or(ParleyError::Disconnected)?;
        if !self.is_connected() {
            return Err(ParleyError::Disconnected);
        }
        handle
            .frame_tx
            .send(frame)
            .await
            .map_err(|_| ParleyError::Disconnected)
    }

    /// Tears down the current connection, if any. Idempotent.
    pub async fn disconnect(&self) {
        if let Some(handle) = self.handle.lock().await.take() {
            self.connected.store(false, Ordering::Release);
            handle.task.abort();
            let _ = self.event_tx.send(TransportEvent::Disconnected).await;
            debug!("socket disconnected");
        }
    }
}

type WsStream =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

async fn run_loop(
    ws: WsStream,
    mut frame_rx: mpsc::Receiver<OutgoingFrame>,
    event_tx: mpsc::Sender<TransportEvent>,
    connected: Arc<AtomicBool>,
) {
    let (mut ws_tx, mut ws_rx) = ws.split();

    loop {
        tokio::select! {
            frame = frame_rx.recv() => {
                let Some(frame) = frame else { break };
                let text = match serde_json::to_string(&frame) {
                    Ok(text) => text,
                    Err(e) => {
                        warn!(error = %e, "dropping unencodable frame");
                        continue;
                    }
                };
                if let Err(e) = ws_tx.send(WsMessage::Text(text.into())).await {
                    let _ = event_tx
                        .send(TransportEvent::Error(Arc::new(ParleyError::Transport {
                            message: format!("frame write failed: {e}"),
                            source: Some(Box::new(e)),
                        })))
                        .await;
                    break;
                }
            }
            msg = ws_rx.next() => {
                match msg {
                    Some(Ok(WsMessage::Text(text))) => {
                        handle_frame(&text, &event_tx).await;
                    }
                    Some(Ok(WsMessage::Ping(_) | WsMessage::Pong(_))) => {}
                    Some(Ok(WsMessage::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        let _ = event_tx
                            .send(TransportEvent::Error(Arc::new(ParleyError::Transport {
                                message: format!("socket read failed: {e}"),
                                source: Some(Box::new(e)),
                            })))
                            .await;
                        break;
                    }
                }
            }
        }
    }

    if connected.swap(false, Ordering::AcqRel) {
        let _ = event_tx.send(TransportEvent::Disconnected).await;
    }
}

async fn handle_frame(text: &str, event_tx: &mpsc::Sender<TransportEvent>) {
    let frame: IncomingFrame = match serde_json::from_str(text) {
        Ok(frame) => frame,
        Err(e) => {
            warn!(error = %e, "dropping undecodable frame");
            return;
        }
    };

    let event = match frame {
        IncomingFrame::ChatInited(init) => match classify_init(&init) {
            Ok(parley_codec::InitOutcome::Chat(chat)) => TransportEvent::ChatInited(chat),
            Ok(parley_codec::InitOutcome::OfflineForm { settings, init }) => {
                TransportEvent::OfflineForm { settings, init }
            }
            Err(e) => TransportEvent::Error(Arc::new(e)),
        },
        IncomingFrame::MessageNew { message } => match convert_message(&message) {
            Ok(messages) => TransportEvent::MessagesReceived {
                messages,
                historical: false,
            },
            Err(e) => TransportEvent::Error(Arc::new(e)),
        },
        IncomingFrame::MessageChanged { message } => match convert_message(&message) {
            Ok(mut messages) if !messages.is_empty() => {
                TransportEvent::MessageUpdated(messages.remove(0))
            }
            Ok(_) => return,
            Err(e) => TransportEvent::Error(Arc::new(e)),
        },
        IncomingFrame::FeedbackSent => TransportEvent::Feedback,
        IncomingFrame::ClientSet => TransportEvent::SetEmailSuccess,
        IncomingFrame::Error { code, message } => {
            if code == Some(ERROR_CODE_TOKEN_REJECTED) {
                TransportEvent::TokenError
            } else {
                TransportEvent::Error(Arc::new(ParleyError::Protocol(format!(
                    "server error {}: {}",
                    code.map_or_else(|| "?".to_string(), |c| c.to_string()),
                    message.unwrap_or_default()
                ))))
            }
        }
    };
    let _ = event_tx.send(event).await;
}
