//! A single connection's state (spec.md §3, §4.4).
//!
//! `Session` owns the state machine, the silence detector, conversation
//! memory, and the handle to whichever turn is currently in flight. Only
//! the gateway's read loop and the turn-completion task touch it; no lock
//! is held across an `.await` boundary longer than the time needed to read
//! or mutate one field.

use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;
use tokio::sync::mpsc;

use voice_gateway_core::{ConversationMemory, Message, MessageRole, Role, SessionState};
use voice_gateway_pipeline::{
    CancellationToken, DetectorEvent, OutboundEvent, SilenceDetector, SilenceDetectorConfig, StateMachine,
    TurnOrchestrator, TurnOutcome,
};

/// Per-session vendor selection; everything else a turn needs comes from
/// the shared [`TurnOrchestrator`].
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub language_hint: String,
    pub voice_id: String,
}

/// One browser connection. Created on accept, dropped on close.
pub struct Session {
    pub id: String,
    config: SessionConfig,
    state: Arc<StateMachine>,
    detector: Arc<SilenceDetector>,
    memory: Arc<Mutex<ConversationMemory>>,
    orchestrator: Arc<TurnOrchestrator>,
    /// Set for the duration of an in-flight turn; barge-in cancels it and
    /// clears it immediately so the next inbound frame is treated as
    /// speech without waiting for the orchestrator's own async teardown.
    current_turn: Arc<Mutex<Option<CancellationToken>>>,
    last_activity: Arc<Mutex<Instant>>,
}

impl Session {
    pub fn new(id: impl Into<String>, config: SessionConfig, orchestrator: Arc<TurnOrchestrator>) -> Self {
        let id = id.into();
        Self {
            state: Arc::new(StateMachine::new(id.clone())),
            id,
            config,
            detector: Arc::new(SilenceDetector::new(SilenceDetectorConfig::default())),
            memory: Arc::new(Mutex::new(ConversationMemory::new())),
            orchestrator,
            current_turn: Arc::new(Mutex::new(None)),
            last_activity: Arc::new(Mutex::new(Instant::now())),
        }
    }

    pub fn current_state(&self) -> SessionState {
        self.state.current()
    }

    pub fn last_activity(&self) -> Instant {
        *self.last_activity.lock()
    }

    /// Bump last-activity. Called when a frame classifies as voiced or an
    /// assistant audio chunk is emitted (spec.md §3) — never on frame
    /// arrival alone, or the inactivity watchdog would never fire against
    /// a stream of pure silence.
    pub(crate) fn touch(&self) {
        *self.last_activity.lock() = Instant::now();
    }

    /// IDLE -> USER_SPEAKING on accept (spec.md §4.1): called once, right
    /// after the WebSocket upgrade, before any frame is read.
    pub fn accept(&self) -> bool {
        self.state.transition_to(SessionState::UserSpeaking)
    }

    /// True while a turn is running; frames are routed to barge-in
    /// detection rather than turn-end detection.
    fn turn_in_flight(&self) -> bool {
        self.current_turn.lock().is_some()
    }

    /// Feed one 640-byte inbound audio frame. Returns `Some(buffer)` if the
    /// frame triggered a turn-end and the caller should start a turn; the
    /// barge-in path is handled internally (it only needs the frame, not a
    /// return value).
    pub fn observe_frame(&self, frame: &[u8]) -> FrameOutcome {
        if self.turn_in_flight() {
            if self.detector.observe_ai_active(frame) == DetectorEvent::BargeIn {
                self.touch();
                self.barge_in(frame);
                return FrameOutcome::BargeIn;
            }
            return FrameOutcome::None;
        }
        let voiced = self.detector.is_voiced(frame);
        let event = self.detector.observe_user_speaking(frame);
        if voiced {
            self.touch();
        }
        match event {
            DetectorEvent::TurnEnd => FrameOutcome::TurnEnd(self.detector.take_voiced_buffer_and_reset()),
            _ => FrameOutcome::None,
        }
    }

    /// Cancel the in-flight turn and seed the next voiced buffer with the
    /// triggering frame (spec.md §4.3 cancellation step 5). Idempotent:
    /// a second barge-in frame arriving before the cancelled turn's async
    /// teardown completes finds `current_turn` already cleared and takes
    /// the `observe_user_speaking` path in [`Session::observe_frame`]
    /// instead of calling this again.
    fn barge_in(&self, frame: &[u8]) {
        let cancel = self.current_turn.lock().take();
        if let Some(cancel) = cancel {
            cancel.cancel();
        }
        self.detector.observe_user_speaking(frame);
    }

    /// Start a turn for a just-finished voiced buffer. Transitions to
    /// `AI_PROCESSING`, spawns the orchestrator's run, and spawns a small
    /// completion task that commits to memory and clears `current_turn`.
    /// `emit` forwards every [`OutboundEvent`] the turn produces to the
    /// session's writer; returns once the turn has been handed off, not
    /// once it completes.
    pub fn start_turn(&self, voiced_buffer: Vec<u8>, emit: mpsc::Sender<OutboundEvent>) {
        if !self.state.transition_to(SessionState::AiProcessing) {
            return;
        }
        let _ = emit.try_send(OutboundEvent::Status(SessionState::AiProcessing));

        let cancel = CancellationToken::new();
        *self.current_turn.lock() = Some(cancel.clone());

        let orchestrator = Arc::clone(&self.orchestrator);
        let state = Arc::clone(&self.state);
        let memory = Arc::clone(&self.memory);
        let current_turn = Arc::clone(&self.current_turn);
        let history = history_messages(&self.memory.lock());
        let language_hint = self.config.language_hint.clone();
        let voice_id = self.config.voice_id.clone();

        tokio::spawn(async move {
            let outcome = orchestrator
                .run_turn(voiced_buffer, &language_hint, &voice_id, &history, state, cancel, emit)
                .await;
            *current_turn.lock() = None;
            if let Ok(TurnOutcome::Committed { user_text, assistant_text }) = outcome {
                if let Err(e) = memory.lock().commit_turn(user_text, assistant_text) {
                    tracing::error!(error = %e, "turn committed but memory append was rejected");
                }
            }
        });
    }

    /// Force a barge-in-equivalent cancellation without a triggering frame
    /// (used by the inactivity watchdog to unwind an in-flight turn before
    /// tearing the connection down).
    pub fn cancel_current_turn(&self) {
        if let Some(cancel) = self.current_turn.lock().take() {
            cancel.cancel();
        }
    }
}

/// What happened to a just-observed inbound frame, from the gateway's
/// point of view.
pub enum FrameOutcome {
    None,
    BargeIn,
    TurnEnd(Vec<u8>),
}

fn history_messages(memory: &ConversationMemory) -> Vec<Message> {
    memory
        .entries()
        .iter()
        .map(|e| Message {
            role: match e.role {
                Role::User => MessageRole::User,
                Role::Assistant => MessageRole::Assistant,
            },
            text: e.text.clone(),
        })
        .collect()
}
