use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Notifications published by the conversation controller after each state change
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversationEvent {
    /// A turn was appended to the transcript
    TurnAppended { role: ConversationRole },

    /// The optimistic user turn of a failed exchange was removed
    TurnRolledBack,

    /// An exchange started or finished
    PendingChanged { pending: bool },

    /// The server assigned the conversation its session identifier
    SessionAssigned { session_id: String },

    /// An exchange failed with a user-visible message
    ErrorRaised { message: String },

    /// The error notice was dismissed
    ErrorDismissed,

    /// The conversation was reset
    Cleared,

    /// A result arrived for an exchange that is no longer current
    StaleResultDiscarded { sequence: u64 },
}

/// Author of a turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConversationRole {
    User,
    Assistant,
}

impl ConversationRole {
    pub fn display_name(&self) -> &'static str {
        match self {
            ConversationRole::User => "You",
            ConversationRole::Assistant => "Socrates",
        }
    }
}

impl fmt::Display for ConversationRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConversationRole::User => f.write_str("user"),
            ConversationRole::Assistant => f.write_str("assistant"),
        }
    }
}

/// One message in the conversation, tagged with its author.
///
/// Turns are immutable once created; only the controller constructs them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    role: ConversationRole,
    content: String,
    timestamp: DateTime<Utc>,
}

impl Turn {
    pub(crate) fn new(role: ConversationRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    pub(crate) fn user(content: impl Into<String>) -> Self {
        Self::new(ConversationRole::User, content)
    }

    pub(crate) fn assistant(content: impl Into<String>) -> Self {
        Self::new(ConversationRole::Assistant, content)
    }

    pub fn role(&self) -> ConversationRole {
        self.role
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    /// Creation time, used for display only
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}
