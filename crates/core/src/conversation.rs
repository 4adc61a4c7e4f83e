//! Append-only conversation memory (spec.md §3, §4.5).

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

/// Role of a memory entry's speaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// A single committed memory entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryEntry {
    pub role: Role,
    pub text: String,
}

/// Ordered, append-only `(role, text)` history for one session.
///
/// Invariant: entries alternate `User, Assistant, User, Assistant, ...`
/// starting with `User`. A `User` entry is appended only with a non-empty
/// transcript; an `Assistant` entry is appended only as part of a
/// turn-commit, together with its preceding `User` entry, so the two are
/// always added atomically via [`ConversationMemory::commit_turn`].
/// Interrupted assistant responses are never recorded.
#[derive(Debug, Clone, Default)]
pub struct ConversationMemory {
    entries: Vec<MemoryEntry>,
}

impl ConversationMemory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one committed turn: the user's transcript followed by the
    /// assistant's full response text. Both are added or neither is.
    pub fn commit_turn(&mut self, user_text: impl Into<String>, assistant_text: impl Into<String>) -> Result<()> {
        let user_text = user_text.into();
        if user_text.trim().is_empty() {
            return Err(CoreError::MemoryInvariant(
                "refusing to commit an empty user transcript".into(),
            ));
        }
        self.entries.push(MemoryEntry {
            role: Role::User,
            text: user_text,
        });
        self.entries.push(MemoryEntry {
            role: Role::Assistant,
            text: assistant_text.into(),
        });
        Ok(())
    }

    pub fn entries(&self) -> &[MemoryEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn turn_count(&self) -> usize {
        self.entries.len() / 2
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commit_appends_both_entries_atomically() {
        let mut mem = ConversationMemory::new();
        mem.commit_turn("hello", "hi there").unwrap();
        assert_eq!(mem.entries().len(), 2);
        assert_eq!(mem.entries()[0].role, Role::User);
        assert_eq!(mem.entries()[1].role, Role::Assistant);
        assert_eq!(mem.turn_count(), 1);
    }

    #[test]
    fn empty_user_transcript_is_rejected_and_commits_nothing() {
        let mut mem = ConversationMemory::new();
        assert!(mem.commit_turn("", "reply").is_err());
        assert!(mem.is_empty());
    }

    #[test]
    fn alternation_holds_across_multiple_turns() {
        let mut mem = ConversationMemory::new();
        mem.commit_turn("one", "a").unwrap();
        mem.commit_turn("two", "b").unwrap();
        let roles: Vec<Role> = mem.entries().iter().map(|e| e.role).collect();
        assert_eq!(
            roles,
            vec![Role::User, Role::Assistant, Role::User, Role::Assistant]
        );
    }
}
