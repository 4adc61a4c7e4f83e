//! Turn-taking, barge-in, and sentence-streaming engine.
//!
//! This crate owns everything in the voice gateway that is not "talk to a
//! vendor over HTTP" ([`voice_gateway_clients`]) or "own the socket"
//! (the server crate): the silence/barge-in detector, the sentence
//! splitter, the state machine guard, the cancellation signal, and the
//! turn orchestrator that ties them together.

pub mod cancellation;
pub mod error;
pub mod orchestrator;
pub mod sentence_splitter;
pub mod silence_detector;
pub mod state_machine;

pub use cancellation::CancellationToken;
pub use error::{PipelineError, Result};
pub use orchestrator::{OutboundEvent, TurnOrchestrator, TurnOutcome, SYSTEM_PROMPT};
pub use sentence_splitter::SentenceSplitter;
pub use silence_detector::{DetectorEvent, SilenceDetector, SilenceDetectorConfig};
pub use state_machine::StateMachine;
