//! Visitor identity and per-conversation session flags.
//!
//! A typed facade over [`KeyValueStore`] owning the keys for session and
//! visitor identifiers, the active conversation id, takeover-notice flags,
//! and last-read timestamps. Identifiers are opaque random strings
//! (timestamp plus random suffix); uniqueness is best-effort.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::core::ids::{opaque_id, AgentKey, ConversationId};
use crate::storage::{keys, KeyValueStore};

/// Marker value for boolean flags in string storage.
const FLAG_SET: &str = "1";

/// Typed facade over durable client storage for identity and flags.
#[derive(Clone)]
pub struct SessionStore {
    storage: Arc<dyn KeyValueStore>,
}

impl SessionStore {
    /// Create a store over the given storage backend.
    #[must_use]
    pub fn new(storage: Arc<dyn KeyValueStore>) -> Self {
        Self { storage }
    }

    /// Return the cross-reload session identifier, creating one on first use.
    #[must_use]
    pub fn get_or_create_session_id(&self) -> String {
        if let Some(existing) = self.storage.get(keys::SESSION_ID) {
            return existing;
        }
        let id = opaque_id("s-");
        self.storage.put(keys::SESSION_ID, &id);
        debug!("created session id {id}");
        id
    }

    /// Return the per-agent visitor identifier, creating one on first use.
    ///
    /// Scoped per agent so one browser is a distinct visitor per embedding
    /// site.
    #[must_use]
    pub fn get_or_create_visitor_id(&self, agent: &AgentKey) -> String {
        let key = keys::visitor_id(agent);
        if let Some(existing) = self.storage.get(&key) {
            return existing;
        }
        let id = opaque_id("v-");
        self.storage.put(&key, &id);
        debug!("created visitor id {id} for agent {agent}");
        id
    }

    /// Whether the "human has joined" notice was already shown for this
    /// conversation's current takeover episode.
    #[must_use]
    pub fn has_takeover_notice_been_shown(
        &self,
        agent: &AgentKey,
        conversation: &ConversationId,
    ) -> bool {
        self.storage
            .get(&keys::takeover_notice(agent, conversation))
            .is_some()
    }

    /// Record that the takeover notice was shown.
    pub fn mark_takeover_notice_shown(&self, agent: &AgentKey, conversation: &ConversationId) {
        self.storage
            .put(&keys::takeover_notice(agent, conversation), FLAG_SET);
    }

    /// Reset the takeover-notice flag so a future takeover episode shows
    /// the notice again.
    pub fn clear_takeover_notice(&self, agent: &AgentKey, conversation: &ConversationId) {
        self.storage
            .remove(&keys::takeover_notice(agent, conversation));
    }

    /// Restore the previously active conversation id, if any.
    #[must_use]
    pub fn active_conversation(&self, agent: &AgentKey) -> Option<ConversationId> {
        self.storage
            .get(&keys::active_conversation(agent))
            .map(|raw| ConversationId::parse(&raw))
    }

    /// Persist the active conversation id so a returning visitor resumes it.
    pub fn set_active_conversation(&self, agent: &AgentKey, conversation: &ConversationId) {
        self.storage
            .put(&keys::active_conversation(agent), &conversation.to_string());
    }

    /// Forget the active conversation id.
    pub fn clear_active_conversation(&self, agent: &AgentKey) {
        self.storage.remove(&keys::active_conversation(agent));
    }

    /// Last time this conversation's messages were marked read.
    #[must_use]
    pub fn last_read_at(
        &self,
        agent: &AgentKey,
        conversation: &ConversationId,
    ) -> Option<DateTime<Utc>> {
        let raw = self.storage.get(&keys::last_read(agent, conversation))?;
        DateTime::parse_from_rfc3339(&raw)
            .ok()
            .map(|ts| ts.with_timezone(&Utc))
    }

    /// Record a successful read-receipt timestamp.
    pub fn set_last_read_at(
        &self,
        agent: &AgentKey,
        conversation: &ConversationId,
        at: DateTime<Utc>,
    ) {
        self.storage
            .put(&keys::last_read(agent, conversation), &at.to_rfc3339());
    }
}
