//! Event types carried by the dispatcher.

use std::fmt;

use serde::Serialize;

/// The closed set of event kinds the system emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    NewConversation,
    NewUserMessage,
    NewAgentMessage,
    DeleteConversation,
}

impl EventKind {
    /// All kinds, in the order the streaming notifier subscribes to them.
    pub const ALL: [EventKind; 4] = [
        EventKind::NewConversation,
        EventKind::NewUserMessage,
        EventKind::NewAgentMessage,
        EventKind::DeleteConversation,
    ];
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NewConversation => write!(f, "NEW_CONVERSATION"),
            Self::NewUserMessage => write!(f, "NEW_USER_MESSAGE"),
            Self::NewAgentMessage => write!(f, "NEW_AGENT_MESSAGE"),
            Self::DeleteConversation => write!(f, "DELETE_CONVERSATION"),
        }
    }
}

impl std::str::FromStr for EventKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "NEW_CONVERSATION" => Ok(Self::NewConversation),
            "NEW_USER_MESSAGE" => Ok(Self::NewUserMessage),
            "NEW_AGENT_MESSAGE" => Ok(Self::NewAgentMessage),
            "DELETE_CONVERSATION" => Ok(Self::DeleteConversation),
            _ => Err(format!("Unknown event kind: {}", s)),
        }
    }
}

/// A published event with its payload.
///
/// One variant per [`EventKind`], so consumers dispatch exhaustively instead
/// of looking payload fields up by name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChatEvent {
    /// A conversation was created.
    NewConversation { conversation_id: i64 },
    /// A user's message was persisted to a conversation.
    NewUserMessage { conversation_id: i64, text: String },
    /// The agent's response was persisted to a conversation.
    NewAgentMessage { conversation_id: i64, text: String },
    /// A conversation was deleted by its owner.
    DeleteConversation { conversation_id: i64 },
}

impl ChatEvent {
    /// Kind of this event.
    pub fn kind(&self) -> EventKind {
        match self {
            Self::NewConversation { .. } => EventKind::NewConversation,
            Self::NewUserMessage { .. } => EventKind::NewUserMessage,
            Self::NewAgentMessage { .. } => EventKind::NewAgentMessage,
            Self::DeleteConversation { .. } => EventKind::DeleteConversation,
        }
    }
}
