//! In-memory conversation sessions.
//!
//! Append-only turn history keyed by session id. Sessions exist to give
//! the chat model continuity; they are not persisted across restarts.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::generation::ChatMessage;

#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: Mutex<HashMap<String, Vec<ChatMessage>>>,
}

impl SessionStore {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of a session's history, oldest turn first.
    #[inline]
    pub fn history(&self, session_id: &str) -> Vec<ChatMessage> {
        self.sessions
            .lock()
            .map(|sessions| sessions.get(session_id).cloned().unwrap_or_default())
            .unwrap_or_default()
    }

    /// Append a completed user/assistant exchange to a session.
    #[inline]
    pub fn append_exchange(&self, session_id: &str, user: ChatMessage, assistant: ChatMessage) {
        if let Ok(mut sessions) = self.sessions.lock() {
            let history = sessions.entry(session_id.to_string()).or_default();
            history.push(user);
            history.push(assistant);
        }
    }

    /// Whether a session has any recorded turns.
    #[inline]
    pub fn has_history(&self, session_id: &str) -> bool {
        self.sessions
            .lock()
            .map(|sessions| sessions.get(session_id).is_some_and(|h| !h.is_empty()))
            .unwrap_or(false)
    }

    /// Clear one session. Returns true if it existed.
    #[inline]
    pub fn clear(&self, session_id: &str) -> bool {
        self.sessions
            .lock()
            .map(|mut sessions| sessions.remove(session_id).is_some())
            .unwrap_or(false)
    }

    /// Clear every session.
    #[inline]
    pub fn clear_all(&self) {
        if let Ok(mut sessions) = self.sessions.lock() {
            sessions.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn history_starts_empty() {
        let store = SessionStore::new();
        assert!(store.history("s1").is_empty());
        assert!(!store.has_history("s1"));
    }

    #[test]
    fn exchanges_accumulate_in_order() {
        let store = SessionStore::new();
        store.append_exchange("s1", ChatMessage::user("q1"), ChatMessage::assistant("a1"));
        store.append_exchange("s1", ChatMessage::user("q2"), ChatMessage::assistant("a2"));

        let history = store.history("s1");
        assert_eq!(history.len(), 4);
        assert_eq!(history[0].content, "q1");
        assert_eq!(history[3].content, "a2");
        assert!(store.has_history("s1"));
    }

    #[test]
    fn sessions_are_isolated() {
        let store = SessionStore::new();
        store.append_exchange("s1", ChatMessage::user("q"), ChatMessage::assistant("a"));

        assert!(store.history("s2").is_empty());
    }

    #[test]
    fn clear_removes_only_named_session() {
        let store = SessionStore::new();
        store.append_exchange("s1", ChatMessage::user("q"), ChatMessage::assistant("a"));
        store.append_exchange("s2", ChatMessage::user("q"), ChatMessage::assistant("a"));

        assert!(store.clear("s1"));
        assert!(!store.clear("s1"));
        assert!(store.history("s1").is_empty());
        assert!(!store.history("s2").is_empty());

        store.clear_all();
        assert!(store.history("s2").is_empty());
    }
}
