//! Message model and boundary validation of backend metadata.

use core::fmt;
use core::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::ids::opaque_id;

/// Author role of a message.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageRole {
    /// The visitor typing into the widget.
    User,
    /// The agent side: AI or a human who has taken over.
    Assistant,
}

impl MessageRole {
    /// Stable string form for storage and wire payloads.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

impl fmt::Display for MessageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MessageRole {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "user" => Ok(Self::User),
            "assistant" => Ok(Self::Assistant),
            _ => Err(value.to_owned()),
        }
    }
}

/// An emoji reaction attached to a message.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct Reaction {
    /// The emoji itself.
    pub emoji: String,
    /// Identifiers of everyone who reacted with it.
    #[serde(default)]
    pub reactor_ids: Vec<String>,
}

/// A link-preview card extracted from message content.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct LinkPreview {
    /// Target URL.
    pub url: String,
    /// Page title, when resolved.
    #[serde(default)]
    pub title: Option<String>,
    /// Page description, when resolved.
    #[serde(default)]
    pub description: Option<String>,
    /// Preview image URL, when resolved.
    #[serde(default)]
    pub image: Option<String>,
}

/// Validated view of the free-form metadata blob backend rows carry.
///
/// Validation happens here at the boundary; unknown or malformed fields
/// default instead of propagating loosely-typed JSON through the runtime.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MessageMetadata {
    /// Reactions keyed by emoji.
    pub reactions: Vec<Reaction>,
    /// Raw sender type tag (`ai`, `human`, `agent`).
    pub sender_type: Option<String>,
    /// Human sender display name.
    pub sender_name: Option<String>,
    /// Human sender avatar URL.
    pub sender_avatar: Option<String>,
    /// When the visitor read the message.
    pub read_at: Option<DateTime<Utc>>,
    /// Link previews extracted by the send pipeline.
    pub link_previews: Vec<LinkPreview>,
}

impl MessageMetadata {
    /// Validate a raw metadata blob, field by field.
    #[must_use]
    pub fn from_value(value: Option<&Value>) -> Self {
        let Some(Value::Object(map)) = value else {
            return Self::default();
        };

        let reactions = map
            .get("reactions")
            .and_then(|raw| serde_json::from_value(raw.clone()).ok())
            .unwrap_or_default();
        let link_previews = map
            .get("link_previews")
            .and_then(|raw| serde_json::from_value(raw.clone()).ok())
            .unwrap_or_default();
        let read_at = map
            .get("read_at")
            .and_then(Value::as_str)
            .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
            .map(|ts| ts.with_timezone(&Utc));

        Self {
            reactions,
            sender_type: map
                .get("sender_type")
                .and_then(Value::as_str)
                .map(str::to_owned),
            sender_name: map
                .get("sender_name")
                .and_then(Value::as_str)
                .map(str::to_owned),
            sender_avatar: map
                .get("sender_avatar")
                .and_then(Value::as_str)
                .map(str::to_owned),
            read_at,
            link_previews,
        }
    }

    /// Whether the sender was a human agent rather than the AI.
    #[must_use]
    pub fn is_human_sender(&self) -> bool {
        matches!(self.sender_type.as_deref(), Some("human" | "agent"))
    }
}

/// A backend message row, as returned by the history fetch and the
/// realtime insert stream.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MessageRecord {
    /// Backend row id.
    pub id: String,
    /// Author role.
    pub role: MessageRole,
    /// Message text.
    pub content: String,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Free-form metadata blob, validated via [`MessageMetadata`].
    #[serde(default)]
    pub metadata: Option<Value>,
}

/// A message in the canonical in-memory timeline.
///
/// Immutable after append except `reactions`, `read`, and `read_at`, which
/// realtime update events patch in place by id.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Message identifier (backend row id or a client-generated one).
    pub id: String,
    /// Author role.
    pub role: MessageRole,
    /// Message text.
    pub content: String,
    /// Creation timestamp.
    pub timestamp: DateTime<Utc>,
    /// Whether the sender was a human agent rather than the AI.
    #[serde(default)]
    pub is_human: bool,
    /// Human sender display name, when `is_human`.
    #[serde(default)]
    pub sender_name: Option<String>,
    /// Human sender avatar URL, when `is_human`.
    #[serde(default)]
    pub sender_avatar: Option<String>,
    /// Whether the visitor has read the message.
    #[serde(default)]
    pub read: bool,
    /// When the visitor read the message.
    #[serde(default)]
    pub read_at: Option<DateTime<Utc>>,
    /// Emoji reactions, patched in place by realtime updates.
    #[serde(default)]
    pub reactions: Vec<Reaction>,
    /// Link previews rendered as cards above the text.
    #[serde(default)]
    pub link_previews: Vec<LinkPreview>,
    /// Local system notice ("X has joined"); never sent to the backend and
    /// never counted as unread.
    #[serde(default)]
    pub is_system_notice: bool,
}

impl Message {
    /// Build a visitor-authored message for the local send path.
    #[must_use]
    pub fn visitor(content: impl Into<String>) -> Self {
        Self::local(MessageRole::User, content)
    }

    /// Build an AI-authored message for the local send path.
    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::local(MessageRole::Assistant, content)
    }

    /// Build a local system notice. Pre-marked read so it never counts as
    /// unread, and flagged so the UI skips timestamp rendering.
    #[must_use]
    pub fn system_notice(content: impl Into<String>) -> Self {
        Self {
            read: true,
            is_system_notice: true,
            ..Self::local(MessageRole::Assistant, content)
        }
    }

    fn local(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            id: opaque_id("msg-"),
            role,
            content: content.into(),
            timestamp: Utc::now(),
            is_human: false,
            sender_name: None,
            sender_avatar: None,
            read: role == MessageRole::User,
            read_at: None,
            reactions: Vec::new(),
            link_previews: Vec::new(),
            is_system_notice: false,
        }
    }

    /// Map a backend row into the timeline shape, validating its metadata.
    #[must_use]
    pub fn from_record(record: &MessageRecord) -> Self {
        let metadata = MessageMetadata::from_value(record.metadata.as_ref());
        let is_human = metadata.is_human_sender();
        Self {
            id: record.id.clone(),
            role: record.role,
            content: record.content.clone(),
            timestamp: record.created_at,
            is_human,
            sender_name: metadata.sender_name,
            sender_avatar: metadata.sender_avatar,
            read: record.role == MessageRole::User || metadata.read_at.is_some(),
            read_at: metadata.read_at,
            reactions: metadata.reactions,
            link_previews: metadata.link_previews,
            is_system_notice: false,
        }
    }

    /// Whether this message counts toward the unread badge.
    #[must_use]
    pub fn is_unread(&self) -> bool {
        self.role == MessageRole::Assistant && !self.read && !self.is_system_notice
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_metadata_from_full_blob() {
        let blob = json!({
            "reactions": [{"emoji": "👍", "reactor_ids": ["v-1"]}],
            "sender_type": "human",
            "sender_name": "Dana",
            "sender_avatar": "https://cdn.example.com/dana.png",
            "read_at": "2026-08-01T12:00:00Z",
            "link_previews": [{"url": "https://example.com"}],
        });
        let metadata = MessageMetadata::from_value(Some(&blob));
        assert!(metadata.is_human_sender());
        assert_eq!(metadata.sender_name.as_deref(), Some("Dana"));
        assert_eq!(metadata.reactions.len(), 1);
        assert_eq!(metadata.link_previews.len(), 1);
        assert!(metadata.read_at.is_some());
    }

    #[test]
    fn test_metadata_malformed_fields_default() {
        let blob = json!({
            "reactions": "not-a-list",
            "sender_type": 42,
            "read_at": "yesterday",
        });
        let metadata = MessageMetadata::from_value(Some(&blob));
        assert_eq!(metadata, MessageMetadata::default());
        assert!(!metadata.is_human_sender());
    }

    #[test]
    fn test_metadata_absent_defaults() {
        assert_eq!(MessageMetadata::from_value(None), MessageMetadata::default());
        let scalar = json!("just a string");
        assert_eq!(
            MessageMetadata::from_value(Some(&scalar)),
            MessageMetadata::default()
        );
    }

    #[test]
    fn test_from_record_maps_human_sender() {
        let record = MessageRecord {
            id: "m-1".to_owned(),
            role: MessageRole::Assistant,
            content: "Hello!".to_owned(),
            created_at: Utc::now(),
            metadata: Some(json!({"sender_type": "human", "sender_name": "Dana"})),
        };
        let message = Message::from_record(&record);
        assert!(message.is_human);
        assert_eq!(message.sender_name.as_deref(), Some("Dana"));
        assert!(message.is_unread());
    }

    #[test]
    fn test_system_notice_never_unread() {
        let notice = Message::system_notice("Dana has joined the conversation");
        assert!(notice.is_system_notice);
        assert!(!notice.is_unread());
    }

    #[test]
    fn test_visitor_messages_start_read() {
        let message = Message::visitor("hi");
        assert!(message.read);
        assert!(!message.is_unread());
    }
}
