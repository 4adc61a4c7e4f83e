//! Startup configuration errors (spec.md §6, §7).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingVar(String),

    #[error("environment variable {name} is not valid UTF-8")]
    NotUnicode { name: String },

    #[error("invalid value for {name}: {source}")]
    InvalidValue {
        name: String,
        #[source]
        source: std::num::ParseIntError,
    },
}

pub type Result<T> = std::result::Result<T, ConfigError>;
