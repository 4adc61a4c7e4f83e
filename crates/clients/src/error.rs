//! Vendor error taxonomy (spec.md §7).

use thiserror::Error;
use voice_gateway_core::CoreError;

#[derive(Error, Debug)]
pub enum ClientError {
    /// Socket reset, write timeout, or other connection-level failure.
    #[error("transport error talking to {vendor}: {source}")]
    Transport {
        vendor: &'static str,
        #[source]
        source: reqwest::Error,
    },

    /// HTTP 5xx or a reset mid-stream. Callers may retry once.
    #[error("{vendor} returned a transient upstream error (status {status})")]
    UpstreamTransient { vendor: &'static str, status: u16 },

    /// HTTP 4xx. Not retried; surfaced to the caller as a permanent failure.
    #[error("{vendor} returned a permanent upstream error (status {status}): {body}")]
    UpstreamPermanent {
        vendor: &'static str,
        status: u16,
        body: String,
    },

    #[error("failed to decode {1} response: {0}")]
    Decode(String, &'static str),
}

impl ClientError {
    /// Classify an HTTP status code into the transient/permanent split
    /// from spec.md §7 (5xx transient, 4xx permanent).
    pub fn from_status(vendor: &'static str, status: reqwest::StatusCode, body: String) -> Self {
        if status.is_server_error() {
            ClientError::UpstreamTransient {
                vendor,
                status: status.as_u16(),
            }
        } else {
            ClientError::UpstreamPermanent {
                vendor,
                status: status.as_u16(),
                body,
            }
        }
    }

    pub fn is_transient(&self) -> bool {
        matches!(self, ClientError::Transport { .. } | ClientError::UpstreamTransient { .. })
    }
}

impl From<ClientError> for CoreError {
    fn from(e: ClientError) -> Self {
        CoreError::Adapter(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;
