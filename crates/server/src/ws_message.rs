//! JSON control messages sent to the client over the `/ws` text channel
//! (spec.md §6).

use serde::Serialize;
use voice_gateway_core::SessionState;

/// A session state the client can observe, including the timeout
/// teardown state which has no `SessionState` counterpart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireState {
    Idle,
    UserSpeaking,
    AiProcessing,
    AiSpeaking,
    Timeout,
}

impl From<SessionState> for WireState {
    fn from(s: SessionState) -> Self {
        match s {
            SessionState::Idle => WireState::Idle,
            SessionState::UserSpeaking => WireState::UserSpeaking,
            SessionState::AiProcessing => WireState::AiProcessing,
            SessionState::AiSpeaking => WireState::AiSpeaking,
        }
    }
}

impl WireState {
    fn as_str(&self) -> &'static str {
        match self {
            WireState::Idle => "IDLE",
            WireState::UserSpeaking => "USER_SPEAKING",
            WireState::AiProcessing => "AI_PROCESSING",
            WireState::AiSpeaking => "AI_SPEAKING",
            WireState::Timeout => "TIMEOUT",
        }
    }
}

impl Serialize for WireState {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WsMessage {
    Status { state: WireState },
    Transcript { text: String },
    TtsText { text: String, has_audio: bool },
    AudioStart,
    AudioEnd,
    Interrupt,
    Error { message: String },
    Ping,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_serializes_with_screaming_snake_case_state() {
        let msg = WsMessage::Status {
            state: SessionState::AiProcessing.into(),
        };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "status");
        assert_eq!(json["state"], "AI_PROCESSING");
    }

    #[test]
    fn timeout_state_has_no_session_state_counterpart() {
        let msg = WsMessage::Status { state: WireState::Timeout };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["state"], "TIMEOUT");
    }

    #[test]
    fn tts_text_includes_has_audio_flag() {
        let msg = WsMessage::TtsText {
            text: "hi".into(),
            has_audio: false,
        };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "tts_text");
        assert_eq!(json["has_audio"], false);
    }

    #[test]
    fn unit_variants_serialize_with_only_a_type_tag() {
        let json = serde_json::to_value(WsMessage::AudioStart).unwrap();
        assert_eq!(json, serde_json::json!({ "type": "audio_start" }));
    }
}
