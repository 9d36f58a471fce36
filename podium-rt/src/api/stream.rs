//! WebSocket streaming gateway
//!
//! One bidirectional connection per client at a per-session path.
//! Inbound messages drive ingestion; feedback rides opportunistically
//! on whichever inbound message crosses the 1-second cadence threshold
//! and is fanned out to every connection registered on the session.
//!
//! Per-message failure policy: malformed messages are logged and
//! dropped with the connection left open; an unknown session tears the
//! stream down after a best-effort error message; analyzer failures
//! skip the modality for that message.

use crate::api::server::AppContext;
use crate::engine::FeedbackEngine;
use axum::{
    extract::{
        ws::{Message, WebSocket},
        Path, State, WebSocketUpgrade,
    },
    response::Response,
};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use podium_common::protocol::{ClientMessage, ServerMessage};
use podium_common::time::now_ms;
use podium_common::{Error, Result};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;
use tracing::{info, warn};

/// Buffered outbound messages per session broadcast channel
const SESSION_CHANNEL_CAPACITY: usize = 64;

/// Maps session ids to the broadcast channel shared by all of that
/// session's live connections
pub struct ConnectionRegistry {
    inner: Mutex<HashMap<String, broadcast::Sender<ServerMessage>>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self { inner: Mutex::new(HashMap::new()) }
    }

    /// Register one connection; all registrations for a session share
    /// one channel so every connection sees every feedback message
    pub fn register(
        &self,
        session_id: &str,
    ) -> (broadcast::Sender<ServerMessage>, broadcast::Receiver<ServerMessage>) {
        let mut inner = self.inner.lock().expect("connection registry poisoned");
        let tx = inner
            .entry(session_id.to_string())
            .or_insert_with(|| broadcast::channel(SESSION_CHANNEL_CAPACITY).0)
            .clone();
        let rx = tx.subscribe();
        (tx, rx)
    }

    /// Drop the session's channel entry once its last receiver is gone
    ///
    /// Callers must drop their receiver before unregistering. The
    /// session itself is untouched; only `stop` ends a session.
    pub fn unregister(&self, session_id: &str) {
        let mut inner = self.inner.lock().expect("connection registry poisoned");
        if let Some(tx) = inner.get(session_id) {
            if tx.receiver_count() == 0 {
                inner.remove(session_id);
            }
        }
    }

    /// Live connections for a session
    pub fn connection_count(&self, session_id: &str) -> usize {
        self.inner
            .lock()
            .expect("connection registry poisoned")
            .get(session_id)
            .map(|tx| tx.receiver_count())
            .unwrap_or(0)
    }
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Output of handling one inbound message
#[derive(Debug, Default)]
pub struct HandlerOutput {
    /// Replies to the originating connection only
    pub replies: Vec<ServerMessage>,
    /// Message for every connection on the session
    pub broadcast: Option<ServerMessage>,
}

/// Per-connection protocol state: dispatches inbound messages and owns
/// the feedback cadence gate
///
/// Kept separate from the socket loop so the protocol is testable
/// without a transport.
pub struct StreamHandler {
    engine: Arc<FeedbackEngine>,
    session_id: String,
    interval_ms: i64,
    last_feedback_ms: i64,
}

impl StreamHandler {
    pub fn new(engine: Arc<FeedbackEngine>, session_id: String, interval_ms: i64) -> Self {
        Self {
            engine,
            session_id,
            interval_ms,
            last_feedback_ms: 0,
        }
    }

    /// Handle one inbound message
    ///
    /// Errors with `is_fatal_to_stream()` require connection teardown;
    /// all others mean the single message is dropped.
    pub async fn handle(&mut self, msg: ClientMessage) -> Result<HandlerOutput> {
        let mut output = HandlerOutput::default();

        match &msg {
            ClientMessage::Heartbeat { timestamp_ms } => {
                // Heartbeats never touch session state
                output.replies.push(ServerMessage::Ack {
                    timestamp_ms: *timestamp_ms,
                    status: None,
                });
            }

            ClientMessage::Frame { timestamp_ms, frame_number, data } => {
                let frame = BASE64
                    .decode(data)
                    .map_err(|e| Error::InvalidInput(format!("frame data: {}", e)))?;

                match self
                    .engine
                    .process_frame(&self.session_id, &frame, *timestamp_ms, *frame_number)
                    .await
                {
                    Ok(Some(_)) => {}
                    Ok(None) => {
                        // Shed by the sampling gate; tell the client so
                        // load-shedding is distinguishable from failure
                        output.replies.push(ServerMessage::Ack {
                            timestamp_ms: *timestamp_ms,
                            status: Some("skipped".to_string()),
                        });
                    }
                    Err(e @ Error::NotFound(_)) => return Err(e),
                    Err(e) => {
                        // No vision metrics this cycle; connection continues
                        warn!("vision analysis failed for {}: {}", self.session_id, e);
                    }
                }
            }

            ClientMessage::Audio { timestamp_ms, sample_rate, data } => {
                let pcm = BASE64
                    .decode(data)
                    .map_err(|e| Error::InvalidInput(format!("audio data: {}", e)))?;

                match self
                    .engine
                    .process_audio(&self.session_id, &pcm, *timestamp_ms, *sample_rate)
                    .await
                {
                    Ok(_) => {}
                    Err(e @ Error::NotFound(_)) => return Err(e),
                    Err(e) => {
                        warn!("audio analysis failed for {}: {}", self.session_id, e);
                    }
                }
            }
        }

        if let Some(feedback) = self.maybe_emit_feedback(msg.timestamp_ms()).await? {
            output.broadcast = Some(feedback);
        }
        Ok(output)
    }

    /// Emit a feedback message if the cadence interval has elapsed and
    /// at least one metric snapshot is available
    async fn maybe_emit_feedback(&mut self, msg_timestamp_ms: i64) -> Result<Option<ServerMessage>> {
        // Client timestamp when supplied, wall clock otherwise
        let now = if msg_timestamp_ms > 0 { msg_timestamp_ms } else { now_ms() };
        if now - self.last_feedback_ms < self.interval_ms {
            return Ok(None);
        }
        if !self.engine.has_latest_metrics(&self.session_id)? {
            return Ok(None);
        }

        let feedback = self
            .engine
            .generate_feedback(&self.session_id, None, None, Some(now))
            .await?;
        self.last_feedback_ms = now;

        Ok(Some(ServerMessage::Feedback {
            timestamp_ms: feedback.timestamp_ms,
            scores: feedback.scores,
            metrics: feedback.metrics,
            suggestions: feedback.suggestions,
            trends: feedback.trends,
        }))
    }
}

/// GET /api/v1/feedback/stream/:session_id — upgrade to WebSocket
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Path(session_id): Path<String>,
    State(ctx): State<AppContext>,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, session_id, ctx))
}

async fn handle_socket(socket: WebSocket, session_id: String, ctx: AppContext) {
    let (feedback_tx, feedback_rx) = ctx.registry.register(&session_id);
    info!(
        "stream connected for session {} ({} connections)",
        session_id,
        ctx.registry.connection_count(&session_id)
    );

    let (mut sink, stream) = socket.split();
    let connected = ServerMessage::Connected {
        session_id: session_id.clone(),
        message: "WebSocket connection established".to_string(),
    };
    if !send_message(&mut sink, &connected).await {
        drop(feedback_rx);
        ctx.registry.unregister(&session_id);
        return;
    }

    let handler = StreamHandler::new(
        Arc::clone(&ctx.engine),
        session_id.clone(),
        ctx.feedback_interval_ms,
    );
    connection_loop(handler, &mut sink, stream, feedback_tx, feedback_rx).await;

    // Cleanup runs on every exit path; the Session itself is untouched
    ctx.registry.unregister(&session_id);
    info!("stream disconnected for session {}", session_id);
}

async fn connection_loop(
    mut handler: StreamHandler,
    sink: &mut SplitSink<WebSocket, Message>,
    mut stream: SplitStream<WebSocket>,
    feedback_tx: broadcast::Sender<ServerMessage>,
    mut feedback_rx: broadcast::Receiver<ServerMessage>,
) {
    loop {
        tokio::select! {
            inbound = stream.next() => {
                match inbound {
                    Some(Ok(Message::Text(text))) => {
                        if !handle_text(&mut handler, sink, &feedback_tx, &text).await {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    // Pings are answered by axum; binary frames are not
                    // part of the protocol
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        warn!("stream transport error: {}", e);
                        break;
                    }
                }
            }
            fanned_out = feedback_rx.recv() => {
                match fanned_out {
                    Ok(msg) => {
                        if !send_message(sink, &msg).await {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!("stream lagged, {} feedback messages dropped", skipped);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        }
    }
}

/// Process one text frame; returns false when the connection must close
async fn handle_text(
    handler: &mut StreamHandler,
    sink: &mut SplitSink<WebSocket, Message>,
    feedback_tx: &broadcast::Sender<ServerMessage>,
    text: &str,
) -> bool {
    let msg: ClientMessage = match serde_json::from_str(text) {
        Ok(msg) => msg,
        Err(e) => {
            // Malformed message is dropped; connection stays open
            warn!("malformed stream message ignored: {}", e);
            return true;
        }
    };

    match handler.handle(msg).await {
        Ok(output) => {
            for reply in &output.replies {
                if !send_message(sink, reply).await {
                    return false;
                }
            }
            if let Some(feedback) = output.broadcast {
                // Delivered to this connection through its own
                // subscription, along with every sibling connection
                let _ = feedback_tx.send(feedback);
            }
            true
        }
        Err(e) if e.is_fatal_to_stream() => {
            let report = ServerMessage::Error { message: e.to_string() };
            // Best-effort; the connection is closing either way
            let _ = send_message(sink, &report).await;
            false
        }
        Err(e) => {
            warn!("stream message dropped: {}", e);
            true
        }
    }
}

async fn send_message(sink: &mut SplitSink<WebSocket, Message>, msg: &ServerMessage) -> bool {
    let json = match serde_json::to_string(msg) {
        Ok(json) => json,
        Err(e) => {
            warn!("outbound serialization failed: {}", e);
            return true;
        }
    };
    sink.send(Message::Text(json)).await.is_ok()
}
