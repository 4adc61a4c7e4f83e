//! Pipeline-crate error type.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Core(#[from] voice_gateway_core::CoreError),

    #[error("speech-to-text failed: {0}")]
    Stt(String),

    #[error("language model failed: {0}")]
    Llm(String),

    #[error("text-to-speech failed: {0}")]
    Tts(String),
}

pub type Result<T> = std::result::Result<T, PipelineError>;
