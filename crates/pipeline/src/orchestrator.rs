//! Drives one conversational turn: STT → LLM → TTS, bridged by a bounded
//! sentence queue, with barge-in cancellation (spec.md §4.3).

use std::sync::Arc;

use tokio::sync::mpsc;

use voice_gateway_core::{LanguageModel, Message, SessionState, SpeechToText, TextToSpeech};

use crate::cancellation::CancellationToken;
use crate::sentence_splitter::SentenceSplitter;
use crate::state_machine::StateMachine;
use crate::{PipelineError, Result};

/// Sentence queue depth between the LLM producer and the TTS consumer.
const SENTENCE_QUEUE_CAPACITY: usize = 8;

const FALLBACK_UTTERANCE: &str = "Sorry, I didn't catch that.";

/// System prompt fixed per spec.md §4.5: short spoken answers, no markdown.
pub const SYSTEM_PROMPT: &str =
    "You are a helpful voice assistant. Respond in 1-2 short spoken sentences. \
     Do not use markdown or lists. Answer directly.";

/// Events the orchestrator emits for the gateway to forward to the client.
/// Writes to the client socket are serialized through the `Session`, not
/// here — the orchestrator only ever produces these, never writes the
/// socket itself.
#[derive(Debug, Clone)]
pub enum OutboundEvent {
    Status(SessionState),
    Transcript { text: String },
    AudioStart,
    AudioChunk(Vec<u8>),
    TtsText { text: String },
    AudioEnd,
    Interrupt,
    /// A non-fatal turn-level error surfaced to the client as a toast
    /// (spec.md §7): the session stays alive, only the current turn aborts.
    Error { message: String },
    /// Keepalive sent by the gateway itself, not by a turn; carried on the
    /// same channel so it shares the single-writer ordering guarantee.
    Ping,
    /// Session inactivity timeout (spec.md §5): `TIMEOUT` has no
    /// `SessionState` counterpart, so it is its own event rather than a
    /// `Status(SessionState)`.
    Timeout,
}

/// Result of running one turn to completion (or to cancellation).
#[derive(Debug)]
pub enum TurnOutcome {
    /// TTS consumer finished without interruption: commit to memory.
    Committed {
        user_text: String,
        assistant_text: String,
    },
    /// STT returned an empty transcript: no memory append, no audio.
    AbortedEmptyStt,
    /// STT failed twice: a fixed fallback utterance was spoken instead of
    /// calling the LLM; not recorded in memory.
    SttFailed,
    /// A barge-in cancelled the turn mid-flight; nothing is committed.
    Cancelled,
}

enum QueueItem {
    Sentence(String),
    End,
}

pub struct TurnOrchestrator {
    stt: Arc<dyn SpeechToText>,
    llm: Arc<dyn LanguageModel>,
    tts: Arc<dyn TextToSpeech>,
}

impl TurnOrchestrator {
    pub fn new(stt: Arc<dyn SpeechToText>, llm: Arc<dyn LanguageModel>, tts: Arc<dyn TextToSpeech>) -> Self {
        Self { stt, llm, tts }
    }

    /// Run one full turn. Assumes the caller has already transitioned the
    /// session into `AI_PROCESSING`.
    pub async fn run_turn(
        &self,
        voiced_buffer: Vec<u8>,
        language_hint: &str,
        voice_id: &str,
        history: &[Message],
        state: Arc<StateMachine>,
        cancel: CancellationToken,
        outbound: mpsc::Sender<OutboundEvent>,
    ) -> Result<TurnOutcome> {
        // The STT adapter itself performs the one silent retry on transport
        // error (spec.md §4.6); an error reaching here is a permanent
        // failure after that retry already happened.
        let transcript = match self.stt.transcribe(&voiced_buffer, language_hint).await {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(error = %e, "stt permanently failed, speaking fallback");
                self.speak_fallback(voice_id, Arc::clone(&state), &cancel, &outbound).await?;
                return Ok(TurnOutcome::SttFailed);
            }
        };

        if transcript.trim().is_empty() {
            state.transition_to(SessionState::UserSpeaking);
            let _ = outbound.send(OutboundEvent::Status(SessionState::UserSpeaking)).await;
            return Ok(TurnOutcome::AbortedEmptyStt);
        }

        let _ = outbound
            .send(OutboundEvent::Transcript {
                text: transcript.clone(),
            })
            .await;

        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(Message::system(SYSTEM_PROMPT));
        messages.extend(history.iter().cloned());
        messages.push(Message::user(transcript.clone()));

        let (queue_tx, queue_rx) = mpsc::channel::<QueueItem>(SENTENCE_QUEUE_CAPACITY);

        let llm = Arc::clone(&self.llm);
        let producer_cancel = cancel.clone();
        let producer_outbound = outbound.clone();
        let mut producer =
            tokio::spawn(async move { Self::run_llm_producer(llm, messages, queue_tx, producer_cancel, producer_outbound).await });

        let tts = Arc::clone(&self.tts);
        let consumer_cancel = cancel.clone();
        let voice_id = voice_id.to_string();
        let consumer_outbound = outbound.clone();
        let consumer_state = Arc::clone(&state);
        let mut consumer = tokio::spawn(async move {
            Self::run_tts_consumer(tts, voice_id, queue_rx, consumer_cancel, consumer_outbound, consumer_state).await
        });

        tokio::select! {
            _ = cancel.cancelled() => {
                let _ = outbound.send(OutboundEvent::Interrupt).await;
                let grace = std::time::Duration::from_millis(200);
                let _ = tokio::time::timeout(grace, &mut producer).await;
                let _ = tokio::time::timeout(grace, &mut consumer).await;
                state.transition_to(SessionState::UserSpeaking);
                let _ = outbound.send(OutboundEvent::Status(SessionState::UserSpeaking)).await;
                Ok(TurnOutcome::Cancelled)
            }
            result = Self::join_turn(&mut producer, &mut consumer, transcript, &state, &outbound) => result,
        }
    }

    async fn join_turn(
        producer: &mut tokio::task::JoinHandle<String>,
        consumer: &mut tokio::task::JoinHandle<bool>,
        user_text: String,
        state: &StateMachine,
        outbound: &mpsc::Sender<OutboundEvent>,
    ) -> Result<TurnOutcome> {
        let assistant_text = producer.await.map_err(|e| PipelineError::Llm(e.to_string()))?;
        let committed = consumer.await.map_err(|e| PipelineError::Tts(e.to_string()))?;
        if !committed {
            // The two subtasks can observe cancellation and return before the
            // `cancel.cancelled()` branch in `run_turn`'s select wins the
            // race against this one (both become ready at once), so the
            // state transition here is not optional: it is the only place
            // that covers this interleaving.
            state.transition_to(SessionState::UserSpeaking);
            let _ = outbound.send(OutboundEvent::Status(SessionState::UserSpeaking)).await;
            return Ok(TurnOutcome::Cancelled);
        }
        state.transition_to(SessionState::UserSpeaking);
        let _ = outbound.send(OutboundEvent::Status(SessionState::UserSpeaking)).await;
        Ok(TurnOutcome::Committed {
            user_text,
            assistant_text,
        })
    }

    /// Speak the fixed fallback utterance after STT fails twice: skip the
    /// LLM, run only TTS, never touch memory.
    async fn speak_fallback(
        &self,
        voice_id: &str,
        state: Arc<StateMachine>,
        cancel: &CancellationToken,
        outbound: &mpsc::Sender<OutboundEvent>,
    ) -> Result<()> {
        let (tx, rx) = mpsc::channel(SENTENCE_QUEUE_CAPACITY);
        let _ = tx.send(QueueItem::Sentence(FALLBACK_UTTERANCE.to_string())).await;
        let _ = tx.send(QueueItem::End).await;
        drop(tx);
        Self::run_tts_consumer(
            Arc::clone(&self.tts),
            voice_id.to_string(),
            rx,
            cancel.clone(),
            outbound.clone(),
            Arc::clone(&state),
        )
        .await;
        state.transition_to(SessionState::UserSpeaking);
        let _ = outbound.send(OutboundEvent::Status(SessionState::UserSpeaking)).await;
        Ok(())
    }

    /// Stream LLM tokens into the sentence splitter, pushing every
    /// completed sentence onto the queue (honoring cancellation at the
    /// blocking `send`), flushing a trailing sentence at stream end, and
    /// finally closing with a sentinel. Returns the full assembled text.
    async fn run_llm_producer(
        llm: Arc<dyn LanguageModel>,
        messages: Vec<Message>,
        queue_tx: mpsc::Sender<QueueItem>,
        cancel: CancellationToken,
        outbound: mpsc::Sender<OutboundEvent>,
    ) -> String {
        let splitter = SentenceSplitter::new();
        let mut pending_assistant_text = String::new();

        let mut stream = match llm.stream(messages).await {
            Ok(s) => s,
            Err(e) => {
                tracing::error!(error = %e, "llm stream failed to open");
                let _ = outbound
                    .send(OutboundEvent::Error {
                        message: "the assistant is temporarily unavailable".to_string(),
                    })
                    .await;
                let _ = queue_tx.send(QueueItem::End).await;
                return pending_assistant_text;
            }
        };

        use futures::StreamExt;
        loop {
            if cancel.is_cancelled() {
                return pending_assistant_text;
            }
            let next = tokio::select! {
                _ = cancel.cancelled() => None,
                item = stream.next() => item,
            };
            let Some(token_result) = next else {
                break;
            };
            let token = match token_result {
                Ok(t) => t,
                Err(e) => {
                    tracing::error!(error = %e, "llm token stream error");
                    let _ = outbound
                        .send(OutboundEvent::Error {
                            message: "the assistant response was interrupted".to_string(),
                        })
                        .await;
                    break;
                }
            };
            pending_assistant_text.push_str(&token);
            for sentence in splitter.push(&token) {
                if Self::enqueue(&queue_tx, QueueItem::Sentence(sentence), &cancel).await.is_err() {
                    return pending_assistant_text;
                }
            }
        }

        if let Some(tail) = splitter.flush() {
            let _ = Self::enqueue(&queue_tx, QueueItem::Sentence(tail), &cancel).await;
        }
        let _ = queue_tx.send(QueueItem::End).await;
        pending_assistant_text
    }

    async fn enqueue(tx: &mpsc::Sender<QueueItem>, item: QueueItem, cancel: &CancellationToken) -> std::result::Result<(), ()> {
        tokio::select! {
            _ = cancel.cancelled() => Err(()),
            res = tx.send(item) => res.map_err(|_| ()),
        }
    }

    /// Drain the sentence queue, speaking each sentence through TTS and
    /// forwarding audio chunks. Returns `true` if the queue ran to its
    /// sentinel without cancellation (i.e. the turn should be committed).
    async fn run_tts_consumer(
        tts: Arc<dyn TextToSpeech>,
        voice_id: String,
        mut queue_rx: mpsc::Receiver<QueueItem>,
        cancel: CancellationToken,
        outbound: mpsc::Sender<OutboundEvent>,
        state: Arc<StateMachine>,
    ) -> bool {
        use futures::StreamExt;

        let mut audio_started = false;

        loop {
            if cancel.is_cancelled() {
                return false;
            }
            let next = tokio::select! {
                _ = cancel.cancelled() => None,
                item = queue_rx.recv() => item,
            };
            let Some(item) = next else {
                return false;
            };

            match item {
                QueueItem::End => {
                    let _ = outbound.send(OutboundEvent::AudioEnd).await;
                    return true;
                }
                QueueItem::Sentence(sentence) => {
                    let _ = outbound
                        .send(OutboundEvent::TtsText {
                            text: sentence.clone(),
                        })
                        .await;
                    let mut chunk_stream = match tts.stream(&sentence, &voice_id).await {
                        Ok(s) => s,
                        Err(e) => {
                            tracing::error!(error = %e, "tts stream failed to open");
                            continue;
                        }
                    };
                    loop {
                        if cancel.is_cancelled() {
                            return false;
                        }
                        let next_chunk = tokio::select! {
                            _ = cancel.cancelled() => None,
                            chunk = chunk_stream.next() => chunk,
                        };
                        let Some(chunk_result) = next_chunk else {
                            break;
                        };
                        let chunk = match chunk_result {
                            Ok(c) => c,
                            Err(e) => {
                                tracing::error!(error = %e, "tts chunk error");
                                break;
                            }
                        };
                        if !audio_started {
                            state.transition_to(SessionState::AiSpeaking);
                            let _ = outbound.send(OutboundEvent::Status(SessionState::AiSpeaking)).await;
                            let _ = outbound.send(OutboundEvent::AudioStart).await;
                            audio_started = true;
                        }
                        if cancel.is_cancelled() {
                            return false;
                        }
                        if outbound.send(OutboundEvent::AudioChunk(chunk)).await.is_err() {
                            return false;
                        }
                    }
                }
            }
        }
    }
}
