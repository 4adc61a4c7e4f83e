//! Thin, logged wrapper around [`voice_gateway_core::SessionState`]
//! (spec.md §4.1).
//!
//! Transitions are serialized through a single-threaded event path per
//! session already (the gateway's read loop and the turn orchestrator never
//! run concurrently against the same session's state), so a plain
//! `parking_lot::Mutex` is enough here; no extra synchronization is added
//! on top of the guard the state matrix itself provides.

use parking_lot::Mutex;
use voice_gateway_core::SessionState;

pub struct StateMachine {
    session_id: String,
    state: Mutex<SessionState>,
}

impl StateMachine {
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            state: Mutex::new(SessionState::default()),
        }
    }

    pub fn current(&self) -> SessionState {
        *self.state.lock()
    }

    /// Attempt to move to `target`. Illegal transitions are rejected
    /// silently (a logged warning, not an error) since the matrix
    /// guarantees they cannot occur if callers follow the rules; this is a
    /// defense-in-depth check, not the primary guard.
    pub fn transition_to(&self, target: SessionState) -> bool {
        let mut state = self.state.lock();
        if !state.can_transition_to(target) {
            tracing::warn!(
                session_id = %self.session_id,
                from = %*state,
                to = %target,
                "rejected illegal state transition"
            );
            return false;
        }
        tracing::debug!(session_id = %self.session_id, from = %*state, to = %target, "state transition");
        *state = target;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use SessionState::*;

    #[test]
    fn legal_transition_updates_state() {
        let sm = StateMachine::new("s1");
        assert!(sm.transition_to(UserSpeaking));
        assert_eq!(sm.current(), UserSpeaking);
    }

    #[test]
    fn illegal_transition_is_rejected_and_state_unchanged() {
        let sm = StateMachine::new("s1");
        assert!(!sm.transition_to(AiSpeaking));
        assert_eq!(sm.current(), Idle);
    }

    #[test]
    fn full_happy_path_sequence() {
        let sm = StateMachine::new("s1");
        assert!(sm.transition_to(UserSpeaking));
        assert!(sm.transition_to(AiProcessing));
        assert!(sm.transition_to(AiSpeaking));
        assert!(sm.transition_to(UserSpeaking));
        assert_eq!(sm.current(), UserSpeaking);
    }
}
