//! Axum HTTP/WebSocket gateway that owns one [`Session`] per connection
//! (spec.md §4.4).
//!
//! This crate is the outermost layer: it accepts connections, reads/writes
//! the `/ws` wire protocol, and wires the three vendor adapters into a
//! [`voice_gateway_pipeline::TurnOrchestrator`] per session. It contains no
//! turn-taking logic of its own — that lives in `voice_gateway_pipeline`.

pub mod error;
pub mod gateway;
pub mod http;
pub mod session;
pub mod ws_message;

pub use error::ServerError;
pub use http::build_router;
pub use session::{Session, SessionConfig};
pub use ws_message::WsMessage;
