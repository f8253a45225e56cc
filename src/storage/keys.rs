//! Storage key namespacing.
//!
//! Every key is scoped by agent (and conversation where relevant) so one
//! browser profile can host several embedded widgets without cross-tenant
//! collision.

use crate::core::ids::{AgentKey, ConversationId};

/// Global session identifier key (shared across agents on purpose).
pub const SESSION_ID: &str = "veranda_session_id";

/// Per-agent visitor identifier key.
#[must_use]
pub fn visitor_id(agent: &AgentKey) -> String {
    format!("veranda_visitor_{agent}")
}

/// Per-agent multi-conversation list key.
#[must_use]
pub fn conversations(agent: &AgentKey) -> String {
    format!("veranda_conversations_{agent}")
}

/// Legacy single-flat-message-list key, migrated away on first mount.
#[must_use]
pub fn legacy_messages(agent: &AgentKey) -> String {
    format!("veranda_messages_{agent}")
}

/// Per-agent active conversation id key.
#[must_use]
pub fn active_conversation(agent: &AgentKey) -> String {
    format!("veranda_active_conversation_{agent}")
}

/// Per-conversation takeover-notice-shown flag key.
#[must_use]
pub fn takeover_notice(agent: &AgentKey, conversation: &ConversationId) -> String {
    format!("veranda_takeover_notice_{agent}_{conversation}")
}

/// Per-conversation last-read timestamp key.
#[must_use]
pub fn last_read(agent: &AgentKey, conversation: &ConversationId) -> String {
    format!("veranda_last_read_{agent}_{conversation}")
}

/// Per-agent stored location selection key.
#[must_use]
pub fn location(agent: &AgentKey) -> String {
    format!("veranda_location_{agent}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys_are_agent_scoped() {
        let a = AgentKey::new("a");
        let b = AgentKey::new("b");
        assert_ne!(visitor_id(&a), visitor_id(&b));
        assert_ne!(conversations(&a), conversations(&b));
        assert_ne!(location(&a), location(&b));
    }

    #[test]
    fn test_keys_are_conversation_scoped() {
        let agent = AgentKey::new("a");
        let c1 = ConversationId::parse("local-1");
        let c2 = ConversationId::parse("local-2");
        assert_ne!(takeover_notice(&agent, &c1), takeover_notice(&agent, &c2));
        assert_ne!(last_read(&agent, &c1), last_read(&agent, &c2));
    }
}
