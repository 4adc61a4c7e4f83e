//! The four-state turn controller (spec.md §4.1).

use serde::{Deserialize, Serialize};

/// Session turn-taking state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionState {
    #[default]
    Idle,
    UserSpeaking,
    AiProcessing,
    AiSpeaking,
}

impl SessionState {
    /// Name used in the `status` wire message.
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionState::Idle => "IDLE",
            SessionState::UserSpeaking => "USER_SPEAKING",
            SessionState::AiProcessing => "AI_PROCESSING",
            SessionState::AiSpeaking => "AI_SPEAKING",
        }
    }

    /// Check whether the transition matrix in spec.md §4.1 allows moving to
    /// `target`. Teardown ("any" -> out of band) is not represented here;
    /// callers tear down the session directly rather than transitioning.
    pub fn can_transition_to(&self, target: SessionState) -> bool {
        use SessionState::*;
        matches!(
            (self, target),
            (Idle, UserSpeaking)
                | (UserSpeaking, AiProcessing)
                | (AiProcessing, AiSpeaking)
                | (AiProcessing, UserSpeaking)
                | (AiSpeaking, UserSpeaking)
        )
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
