//! Thin `reqwest`-based adapters to the three external vendors: Sarvam
//! (speech-to-text), OpenAI (streaming chat completion), and ElevenLabs
//! (streaming text-to-speech). Each adapter implements the corresponding
//! trait from `voice_gateway_core` and is the only place in the gateway
//! that talks HTTP to that vendor.

mod elevenlabs_tts;
mod error;
mod openai_llm;
mod sarvam_stt;
mod wav;

pub use elevenlabs_tts::ElevenLabsTtsClient;
pub use error::{ClientError, Result};
pub use openai_llm::OpenAiLlmClient;
pub use sarvam_stt::SarvamSttClient;
