//! Normalized realtime event vocabulary.
//!
//! Push payloads from the three subscription streams are normalized into
//! these shapes before they reach the conversation manager; adapters never
//! touch the canonical message list directly.

use core::fmt;
use core::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::conversation::message::{MessageRecord, Reaction};

/// Lifecycle status of a conversation on the agent side.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversationStatus {
    /// The AI is answering.
    Active,
    /// A human support agent has taken over answering duties.
    HumanTakeover,
    /// The conversation was closed on the agent side.
    Resolved,
}

impl ConversationStatus {
    /// Stable string form for wire payloads.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::HumanTakeover => "human_takeover",
            Self::Resolved => "resolved",
        }
    }

    /// Whether a human is currently answering.
    #[must_use]
    pub const fn is_takeover(self) -> bool {
        matches!(self, Self::HumanTakeover)
    }
}

impl fmt::Display for ConversationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConversationStatus {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "active" => Ok(Self::Active),
            "human_takeover" => Ok(Self::HumanTakeover),
            "resolved" => Ok(Self::Resolved),
            _ => Err(value.to_owned()),
        }
    }
}

/// Patch event for an existing message. Only `reactions` and `read_at`
/// ever change after append; `None` leaves a field untouched.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MessageUpdate {
    /// Id of the message to patch.
    pub id: String,
    /// Replacement reactions, when they changed.
    pub reactions: Option<Vec<Reaction>>,
    /// Read timestamp, when it changed.
    pub read_at: Option<DateTime<Utc>>,
}

/// Typing-indicator event from the agent side.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct TypingEvent {
    /// Whether a human is currently typing.
    pub active: bool,
    /// Display name of the typing agent, sent when typing starts.
    pub agent_name: Option<String>,
}

/// Union of everything the streams can tell the conversation manager.
#[derive(Clone, Debug)]
pub enum ConversationEvent {
    /// A new row was inserted on the backend.
    MessageInserted(MessageRecord),
    /// An existing row's mutable fields changed.
    MessageUpdated(MessageUpdate),
    /// The typing indicator changed.
    Typing(TypingEvent),
    /// The conversation status changed.
    StatusChanged(ConversationStatus),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trip() {
        for status in [
            ConversationStatus::Active,
            ConversationStatus::HumanTakeover,
            ConversationStatus::Resolved,
        ] {
            assert_eq!(status.as_str().parse(), Ok(status));
        }
        assert!(ConversationStatus::from_str("archived").is_err());
    }

    #[test]
    fn test_only_takeover_flags_takeover() {
        assert!(ConversationStatus::HumanTakeover.is_takeover());
        assert!(!ConversationStatus::Active.is_takeover());
        assert!(!ConversationStatus::Resolved.is_takeover());
    }
}
