//! Conversation state owned by the controller

use crate::events::Turn;
use serde::Serialize;

/// Everything a renderer needs to draw the conversation.
///
/// Fields are read-only outside the crate; the controller is the single writer.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ConversationState {
    turns: Vec<Turn>,
    session_id: Option<String>,
    last_error: Option<String>,
    /// Sequence number of the outstanding exchange, if any
    in_flight: Option<u64>,
    /// Survives `reset` so a sequence number is never reused
    #[serde(skip)]
    next_sequence: u64,
}

impl ConversationState {
    pub fn new() -> Self {
        Self::default()
    }

    /// State for a conversation continuing a known server session
    pub fn with_session(session_id: impl Into<String>) -> Self {
        let mut state = Self::default();
        state.assign_session(session_id.into());
        state
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn pending(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub(crate) fn in_flight(&self) -> Option<u64> {
        self.in_flight
    }

    pub(crate) fn push_turn(&mut self, turn: Turn) {
        self.turns.push(turn);
    }

    pub(crate) fn pop_turn(&mut self) -> Option<Turn> {
        self.turns.pop()
    }

    /// Marks a new exchange outstanding and returns its sequence number
    pub(crate) fn issue(&mut self) -> u64 {
        self.next_sequence += 1;
        self.in_flight = Some(self.next_sequence);
        self.next_sequence
    }

    pub(crate) fn settle(&mut self) {
        self.in_flight = None;
    }

    /// First write wins. Returns whether the id was taken.
    pub(crate) fn assign_session(&mut self, session_id: String) -> bool {
        if self.session_id.is_some() || session_id.is_empty() {
            return false;
        }
        self.session_id = Some(session_id);
        true
    }

    pub(crate) fn set_error(&mut self, message: String) {
        self.last_error = Some(message);
    }

    pub(crate) fn take_error(&mut self) -> Option<String> {
        self.last_error.take()
    }

    /// Back to an empty conversation. The sequence counter keeps counting.
    pub(crate) fn reset(&mut self) {
        self.turns.clear();
        self.session_id = None;
        self.last_error = None;
        self.in_flight = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_is_first_write_wins() {
        let mut state = ConversationState::new();
        assert!(!state.assign_session(String::new()));
        assert!(state.assign_session("abc".to_string()));
        assert!(!state.assign_session("xyz".to_string()));
        assert_eq!(state.session_id(), Some("abc"));
    }

    #[test]
    fn reset_keeps_sequence_monotonic() {
        let mut state = ConversationState::new();
        let first = state.issue();
        state.push_turn(Turn::user("hi"));
        state.set_error("boom".to_string());
        state.reset();

        assert!(state.is_empty());
        assert!(!state.pending());
        assert_eq!(state.last_error(), None);
        assert!(state.issue() > first);
    }
}
