//! Domain types shared by the voice gateway's pipeline, clients, and server
//! crates: session state, conversation memory, audio-frame constants, the
//! crate-wide error type, and the STT/LLM/TTS adapter traits.

pub mod audio;
pub mod conversation;
pub mod error;
pub mod state;
pub mod traits;

pub use audio::{rms, FRAME_BYTES, FRAME_MS, FRAME_SAMPLES, MAX_VOICED_BUFFER_BYTES, SAMPLE_RATE_HZ};
pub use conversation::{ConversationMemory, MemoryEntry, Role};
pub use error::{CoreError, Result};
pub use state::SessionState;
pub use traits::{LanguageModel, Message, MessageRole, SpeechToText, TextToSpeech};
