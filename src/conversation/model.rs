//! Conversation model for the persisted multi-conversation list.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::conversation::message::Message;
use crate::core::ids::ConversationId;

/// A conversation entry: ordered messages plus derived list metadata.
///
/// Insertion order is chronological order. `updated_at` and `preview` are
/// recomputed on every message change; `created_at` is fixed at first
/// creation and never changes on update.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    /// Conversation identifier.
    pub id: ConversationId,
    /// Ordered message sequence.
    pub messages: Vec<Message>,
    /// First-creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last-change timestamp, recomputed on every mutation.
    pub updated_at: DateTime<Utc>,
    /// Truncated content of the last message, for the conversation list UI.
    pub preview: String,
}

impl Conversation {
    /// Create an empty conversation.
    #[must_use]
    pub fn new(id: ConversationId) -> Self {
        let now = Utc::now();
        Self {
            id,
            messages: Vec::new(),
            created_at: now,
            updated_at: now,
            preview: String::new(),
        }
    }

    /// Recompute the derived fields from the current message sequence.
    pub fn refresh(&mut self, preview_max_chars: usize) {
        match self.messages.last() {
            Some(last) => {
                self.updated_at = last.timestamp.max(self.updated_at);
                self.preview = truncate_preview(&last.content, preview_max_chars);
            }
            None => self.preview.clear(),
        }
    }

    /// Messages counting toward the unread badge.
    #[must_use]
    pub fn unread_count(&self) -> usize {
        self.messages
            .iter()
            .filter(|message| message.is_unread())
            .count()
    }
}

/// Truncate preview text on a character boundary, appending an ellipsis
/// when content was dropped.
#[must_use]
pub fn truncate_preview(content: &str, max_chars: usize) -> String {
    if content.chars().count() <= max_chars {
        return content.to_owned();
    }
    let mut preview: String = content.chars().take(max_chars).collect();
    preview.push('…');
    preview
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_refresh_tracks_last_message() {
        let mut conversation = Conversation::new(ConversationId::new_local());
        let created_at = conversation.created_at;

        conversation.messages.push(Message::visitor("first"));
        conversation.messages.push(Message::assistant("second"));
        conversation.refresh(80);

        assert_eq!(conversation.preview, "second");
        assert_eq!(conversation.created_at, created_at);
        assert!(conversation.updated_at >= created_at);
    }

    #[test]
    fn test_truncate_preview_char_boundary() {
        assert_eq!(truncate_preview("short", 80), "short");
        assert_eq!(truncate_preview("hello world", 5), "hello…");
        // Multibyte content truncates on characters, not bytes.
        assert_eq!(truncate_preview("héllo wörld", 5), "héllo…");
    }

    #[test]
    fn test_unread_count_skips_notices_and_visitor_messages() {
        let mut conversation = Conversation::new(ConversationId::new_local());
        conversation.messages.push(Message::visitor("hi"));
        conversation.messages.push(Message::assistant("hello"));
        conversation
            .messages
            .push(Message::system_notice("Dana has joined the conversation"));

        assert_eq!(conversation.unread_count(), 1);
    }
}
