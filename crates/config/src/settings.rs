//! Gateway settings, built once and explicitly (spec.md §6, §9).
//!
//! `Settings::from_env` is the only constructor. It is called exactly once,
//! from `main()`, after `dotenvy::dotenv()` has had a chance to populate the
//! process environment. Nothing in this crate reads `std::env::var` at
//! module-load time (no `once_cell`/`lazy_static` statics) — doing so would
//! race `dotenvy` and silently fall back to defaults when a `.env` file is
//! present but not yet loaded.

use crate::error::{ConfigError, Result};

const DEFAULT_PORT: u16 = 8000;

/// The wire protocol carries no client-supplied language field (spec.md
/// §6), so every session shares one STT language hint, fixed at startup.
const DEFAULT_LANGUAGE_HINT: &str = "en-IN";

/// Everything the gateway needs to talk to its three upstream vendors and
/// to bind its own listener.
#[derive(Debug, Clone)]
pub struct Settings {
    pub sarvam_api_key: String,
    pub openai_api_key: String,
    pub elevenlabs_api_key: String,
    pub elevenlabs_voice_id: String,
    pub port: u16,
    pub stt_language_hint: String,
}

impl Settings {
    /// Read all fields from the current process environment.
    ///
    /// The four API credentials are required; a missing one is a startup
    /// failure (spec.md §6's CLI surface: non-zero exit on missing
    /// credential). `PORT` and `STT_LANGUAGE_HINT` are optional.
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            sarvam_api_key: required_var("SARVAM_API_KEY")?,
            openai_api_key: required_var("OPENAI_API_KEY")?,
            elevenlabs_api_key: required_var("ELEVENLABS_API_KEY")?,
            elevenlabs_voice_id: required_var("ELEVENLABS_VOICE_ID")?,
            port: optional_port("PORT", DEFAULT_PORT)?,
            stt_language_hint: optional_var("STT_LANGUAGE_HINT", DEFAULT_LANGUAGE_HINT),
        })
    }
}

fn optional_var(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

fn required_var(name: &str) -> Result<String> {
    match std::env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        Ok(_) => Err(ConfigError::MissingVar(name.to_string())),
        Err(std::env::VarError::NotPresent) => Err(ConfigError::MissingVar(name.to_string())),
        Err(std::env::VarError::NotUnicode(_)) => Err(ConfigError::NotUnicode {
            name: name.to_string(),
        }),
    }
}

fn optional_port(name: &str, default: u16) -> Result<u16> {
    match std::env::var(name) {
        Ok(value) => value.parse::<u16>().map_err(|source| ConfigError::InvalidValue {
            name: name.to_string(),
            source,
        }),
        Err(_) => Ok(default),
    }
}
