//! The `/ws` handler: one task tree per connection (spec.md §4.4, §5).
//!
//! A connection is torn down by three independent watchdogs racing in a
//! single `tokio::select!`: the client read loop, a 25 s keepalive ping,
//! and a 60 s inactivity timeout. Everything written to the socket funnels
//! through one `mpsc` channel into a single writer task, so a control
//! message is never interleaved mid-frame with audio.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message as WsFrame, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::Response;
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use uuid::Uuid;

use voice_gateway_core::{SessionState, FRAME_BYTES};
use voice_gateway_pipeline::{OutboundEvent, TurnOrchestrator};

use crate::session::{FrameOutcome, Session, SessionConfig};
use crate::ws_message::WsMessage;

/// Inactivity window after which a session is torn down (spec.md §5).
const SESSION_TIMEOUT: Duration = Duration::from_secs(60);
/// Keepalive cadence to defeat idle-timeout proxies (spec.md §4.4).
const KEEPALIVE_INTERVAL: Duration = Duration::from_secs(25);
/// Outbound channel depth; a slow client applies backpressure here before
/// the 2 s write-timeout in [`run_writer`] trips.
const OUTBOUND_CHANNEL_CAPACITY: usize = 64;
/// Upper bound on a single outbound write (spec.md §5's slow-consumer cap).
const WRITE_TIMEOUT: Duration = Duration::from_secs(2);

/// Shared, cloneable application state handed to every connection.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<TurnOrchestrator>,
    pub language_hint: Arc<str>,
    pub voice_id: Arc<str>,
}

pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let session_id = Uuid::new_v4().to_string();
    let session = Arc::new(Session::new(
        session_id.clone(),
        SessionConfig {
            language_hint: state.language_hint.to_string(),
            voice_id: state.voice_id.to_string(),
        },
        Arc::clone(&state.orchestrator),
    ));

    let (outbound_tx, outbound_rx) = mpsc::channel::<OutboundEvent>(OUTBOUND_CHANNEL_CAPACITY);
    let (sink, mut stream) = socket.split();
    let writer = tokio::spawn(run_writer(sink, outbound_rx, Arc::clone(&session)));

    session.accept();
    let _ = outbound_tx
        .send(OutboundEvent::Status(SessionState::UserSpeaking))
        .await;

    let mut keepalive = tokio::time::interval(KEEPALIVE_INTERVAL);
    keepalive.tick().await; // first tick fires immediately; skip it

    loop {
        let idle_budget = SESSION_TIMEOUT.saturating_sub(session.last_activity().elapsed());
        tokio::select! {
            _ = tokio::time::sleep(idle_budget) => {
                if session.last_activity().elapsed() >= SESSION_TIMEOUT {
                    session.cancel_current_turn();
                    let _ = outbound_tx.send(OutboundEvent::Timeout).await;
                    break;
                }
            }
            _ = keepalive.tick() => {
                if outbound_tx.send(OutboundEvent::Ping).await.is_err() {
                    break;
                }
            }
            frame = stream.next() => {
                match frame {
                    Some(Ok(WsFrame::Binary(bytes))) => {
                        handle_inbound_audio(&session, &bytes, &outbound_tx).await;
                    }
                    Some(Ok(WsFrame::Text(_))) => {
                        // Reserved for future client-initiated controls (spec.md §6); none defined yet.
                    }
                    Some(Ok(WsFrame::Ping(_) | WsFrame::Pong(_))) => {}
                    Some(Ok(WsFrame::Close(_))) | None => break,
                    Some(Err(e)) => {
                        tracing::warn!(session_id = %session_id, error = %e, "websocket read error");
                        break;
                    }
                }
            }
        }
    }

    session.cancel_current_turn();
    drop(outbound_tx);
    let _ = writer.await;
    tracing::debug!(session_id = %session_id, "session closed");
}

async fn handle_inbound_audio(session: &Arc<Session>, frame: &[u8], outbound: &mpsc::Sender<OutboundEvent>) {
    if frame.len() != FRAME_BYTES {
        tracing::warn!(len = frame.len(), expected = FRAME_BYTES, "dropping malformed audio frame");
        return;
    }
    match session.observe_frame(frame) {
        FrameOutcome::None => {}
        FrameOutcome::BargeIn => {
            let _ = outbound.send(OutboundEvent::Interrupt).await;
        }
        FrameOutcome::TurnEnd(voiced_buffer) => {
            session.start_turn(voiced_buffer, outbound.clone());
        }
    }
}

/// The connection's single writer: owns the sink, drains `rx`, and maps
/// each [`OutboundEvent`] to a text or binary frame. Exits (and drops the
/// socket) if a write stalls past [`WRITE_TIMEOUT`] or the socket errors.
async fn run_writer(
    mut sink: futures::stream::SplitSink<WebSocket, WsFrame>,
    mut rx: mpsc::Receiver<OutboundEvent>,
    session: Arc<Session>,
) {
    while let Some(event) = rx.recv().await {
        let frame = match event {
            OutboundEvent::AudioChunk(bytes) => {
                session.touch();
                WsFrame::Binary(bytes)
            }
            OutboundEvent::Status(state) => text_frame(&WsMessage::Status { state: state.into() }),
            OutboundEvent::Transcript { text } => text_frame(&WsMessage::Transcript { text }),
            OutboundEvent::TtsText { text } => text_frame(&WsMessage::TtsText { text, has_audio: true }),
            OutboundEvent::AudioStart => text_frame(&WsMessage::AudioStart),
            OutboundEvent::AudioEnd => text_frame(&WsMessage::AudioEnd),
            OutboundEvent::Interrupt => text_frame(&WsMessage::Interrupt),
            OutboundEvent::Error { message } => text_frame(&WsMessage::Error { message }),
            OutboundEvent::Ping => text_frame(&WsMessage::Ping),
            OutboundEvent::Timeout => text_frame(&WsMessage::Status {
                state: crate::ws_message::WireState::Timeout,
            }),
        };
        if tokio::time::timeout(WRITE_TIMEOUT, sink.send(frame)).await.is_err() {
            tracing::warn!("outbound write stalled past timeout, tearing down session");
            break;
        }
    }
    let _ = sink.close().await;
}

fn text_frame(msg: &WsMessage) -> WsFrame {
    WsFrame::Text(serde_json::to_string(msg).expect("WsMessage serialization is infallible"))
}
