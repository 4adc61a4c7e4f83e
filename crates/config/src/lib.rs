//! Environment-driven configuration for the voice conversation gateway.

pub mod error;
pub mod settings;

pub use error::{ConfigError, Result};
pub use settings::Settings;
