//! Crate-wide error type

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("invalid state transition: {from:?} -> {to:?}")]
    InvalidTransition { from: String, to: String },

    #[error("conversation memory invariant violated: {0}")]
    MemoryInvariant(String),

    /// An STT/LLM/TTS adapter failure, already classified and stringified
    /// by the crate that owns the vendor-specific error type.
    #[error("external adapter error: {0}")]
    Adapter(String),
}

pub type Result<T> = std::result::Result<T, CoreError>;
