//! Canonical conversation state for the active visitor/agent pair.
//!
//! The manager is the only owner of the in-memory message timeline and the
//! conversation list. Everything else — realtime adapters, the send path,
//! the host UI — talks to it through its methods and the normalized
//! [`ConversationEvent`] vocabulary. Every timeline mutation recomputes and
//! persists the conversation list, so durable storage is eventually
//! consistent with memory and never ahead of it.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Utc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::conversation::backend::{ConversationBackend, TakeoverAgent};
use crate::conversation::effects::{
    effect_channel, ScrollBehavior, View, WidgetEffect,
};
use crate::conversation::message::{Message, MessageRecord, MessageRole};
use crate::conversation::model::Conversation;
use crate::core::config::WidgetConfig;
use crate::core::errors::{WidgetError, WidgetResult};
use crate::core::ids::ConversationId;
use crate::realtime::events::{ConversationEvent, ConversationStatus, MessageUpdate, TypingEvent};
use crate::session::SessionStore;
use crate::storage::{keys, KeyValueStore};

/// Fallback display name when a takeover agent has no profile.
const FALLBACK_AGENT_NAME: &str = "A team member";

#[derive(Debug, Default)]
struct ManagerState {
    active: Option<ConversationId>,
    messages: Vec<Message>,
    conversations: Vec<Conversation>,
    widget_open: bool,
    view: View,
    typing: bool,
    typing_agent: Option<String>,
    takeover: bool,
    takeover_agent: Option<TakeoverAgent>,
    // Conversations already scrolled once: first show jumps, later ones glide.
    scrolled: HashSet<String>,
}

/// Owner of the canonical message timeline and conversation list.
pub struct ConversationManager {
    config: WidgetConfig,
    storage: Arc<dyn KeyValueStore>,
    session: SessionStore,
    backend: Arc<dyn ConversationBackend>,
    state: Mutex<ManagerState>,
    effects: mpsc::UnboundedSender<WidgetEffect>,
    read_receipt_task: Mutex<Option<JoinHandle<()>>>,
}

impl ConversationManager {
    /// Create a manager and the effect channel the host UI drains.
    #[must_use]
    pub fn new(
        config: WidgetConfig,
        storage: Arc<dyn KeyValueStore>,
        backend: Arc<dyn ConversationBackend>,
    ) -> (Self, mpsc::UnboundedReceiver<WidgetEffect>) {
        let (effects, effects_rx) = effect_channel();
        let session = SessionStore::new(Arc::clone(&storage));
        let manager = Self {
            config,
            storage,
            session,
            backend,
            state: Mutex::new(ManagerState::default()),
            effects,
            read_receipt_task: Mutex::new(None),
        };
        (manager, effects_rx)
    }

    /// Restore persisted state on mount: conversation list, legacy-format
    /// migration, and the previously active conversation.
    pub async fn restore(self: &Arc<Self>) {
        let stored = self
            .storage
            .get(&keys::conversations(&self.config.agent))
            .and_then(|raw| match serde_json::from_str::<Vec<Conversation>>(&raw) {
                Ok(conversations) => Some(conversations),
                Err(err) => {
                    warn!("discarding corrupt conversation list: {err}");
                    None
                }
            })
            .unwrap_or_default();
        {
            let mut state = self.lock_state();
            state.conversations = stored;
        }

        self.migrate_legacy();

        if let Some(id) = self.session.active_conversation(&self.config.agent) {
            self.activate(id).await;
        }
    }

    /// Make a conversation active, loading its history when needed.
    ///
    /// A canonical id with an empty in-memory timeline triggers exactly one
    /// history fetch; while messages are non-empty the fetch never repeats
    /// (use [`Self::clear_messages`] to force one). A response arriving
    /// after the active id changed again is dropped.
    pub async fn activate(self: &Arc<Self>, id: ConversationId) {
        let needs_fetch = {
            let mut state = self.lock_state();
            state.active = Some(id.clone());
            let known = state
                .conversations
                .iter()
                .find(|conversation| conversation.id == id)
                .map(|conversation| conversation.messages.clone())
                .unwrap_or_default();
            state.messages = known;
            if !state.messages.is_empty() {
                self.emit_scroll_locked(&mut state);
            }
            id.is_canonical() && state.messages.is_empty()
        };
        self.session.set_active_conversation(&self.config.agent, &id);

        if needs_fetch {
            match self.backend.fetch_messages(&id).await {
                Ok(records) => {
                    let mut state = self.lock_state();
                    // Stale guard: the visitor may have switched again while
                    // the fetch was in flight.
                    if state.active.as_ref() == Some(&id) && state.messages.is_empty() {
                        state.messages = records.iter().map(Message::from_record).collect();
                        if !state.messages.is_empty() {
                            self.after_mutation_locked(&mut state, true);
                        }
                    }
                }
                Err(err) => warn!("history fetch failed for {id}: {err}"),
            }
        }

        self.schedule_read_receipts();
    }

    /// Append a message from the local send path.
    ///
    /// Deduplicates by id; a duplicate append is a no-op.
    pub fn append_message(self: &Arc<Self>, message: Message) {
        {
            let mut state = self.lock_state();
            if state
                .messages
                .iter()
                .any(|existing| existing.id == message.id)
            {
                debug!("dropping duplicate append for message {}", message.id);
                return;
            }
            state.messages.push(message);
            self.after_mutation_locked(&mut state, true);
        }
        self.schedule_read_receipts();
    }

    /// Empty the in-memory timeline so the next activation refetches.
    pub fn clear_messages(&self) {
        let mut state = self.lock_state();
        state.messages.clear();
    }

    /// Replace the active local placeholder id with the backend-issued
    /// canonical id, permanently.
    ///
    /// # Errors
    /// Returns an error if the replacement id is not canonical.
    pub fn promote_conversation(&self, canonical: ConversationId) -> WidgetResult<()> {
        if !canonical.is_canonical() {
            return Err(WidgetError::NotCanonical(canonical.to_string()));
        }

        {
            let mut state = self.lock_state();
            let Some(previous) = state.active.clone() else {
                return Ok(());
            };
            if previous == canonical {
                return Ok(());
            }
            state.active = Some(canonical.clone());
            if let Some(entry) = state
                .conversations
                .iter_mut()
                .find(|conversation| conversation.id == previous)
            {
                entry.id = canonical.clone();
            }
            if state.scrolled.remove(&previous.to_string()) {
                state.scrolled.insert(canonical.to_string());
            }
            self.persist_conversations_locked(&state);
        }

        self.session
            .set_active_conversation(&self.config.agent, &canonical);
        info!("conversation promoted to canonical id {canonical}");
        Ok(())
    }

    /// Apply a normalized realtime event.
    pub async fn handle_event(self: &Arc<Self>, event: ConversationEvent) {
        match event {
            ConversationEvent::MessageInserted(record) => self.handle_insert(record),
            ConversationEvent::MessageUpdated(update) => self.handle_update(&update),
            ConversationEvent::Typing(typing) => self.handle_typing(typing),
            ConversationEvent::StatusChanged(status) => self.handle_status(status).await,
        }
    }

    /// Widget opened or closed.
    pub fn set_widget_open(self: &Arc<Self>, open: bool) {
        {
            let mut state = self.lock_state();
            state.widget_open = open;
            if open && !state.messages.is_empty() {
                self.emit_scroll_locked(&mut state);
            }
        }
        self.schedule_read_receipts();
    }

    /// The visitor switched widget surfaces.
    pub fn set_view(self: &Arc<Self>, view: View) {
        {
            let mut state = self.lock_state();
            state.view = view;
            if view == View::Messages && !state.messages.is_empty() {
                self.emit_scroll_locked(&mut state);
            }
        }
        self.schedule_read_receipts();
    }

    /// Abort owned background work. Call on unmount.
    pub fn dispose(&self) {
        if let Some(task) = self.lock_task().take() {
            task.abort();
        }
    }

    // ----- snapshots for the host UI -----

    /// Current timeline of the active conversation.
    #[must_use]
    pub fn messages(&self) -> Vec<Message> {
        self.lock_state().messages.clone()
    }

    /// Conversation list for the visitor, most recent first.
    #[must_use]
    pub fn conversations(&self) -> Vec<Conversation> {
        self.lock_state().conversations.clone()
    }

    /// Active conversation id, if any.
    #[must_use]
    pub fn active_conversation(&self) -> Option<ConversationId> {
        self.lock_state().active.clone()
    }

    /// Whether a human agent is currently typing.
    #[must_use]
    pub fn is_typing(&self) -> bool {
        self.lock_state().typing
    }

    /// Display name of the typing agent, when known.
    #[must_use]
    pub fn typing_agent(&self) -> Option<String> {
        self.lock_state().typing_agent.clone()
    }

    /// Whether a human takeover is in effect.
    #[must_use]
    pub fn takeover_active(&self) -> bool {
        self.lock_state().takeover
    }

    /// Display identity of the takeover agent, when known.
    #[must_use]
    pub fn takeover_agent(&self) -> Option<TakeoverAgent> {
        self.lock_state().takeover_agent.clone()
    }

    // ----- event handlers -----

    fn handle_insert(self: &Arc<Self>, record: MessageRecord) {
        let mut message = Message::from_record(&record);
        {
            let mut state = self.lock_state();
            if state
                .messages
                .iter()
                .any(|existing| existing.id == message.id)
            {
                debug!("dropping duplicate realtime insert {}", message.id);
                return;
            }

            if message.is_human {
                state.takeover_agent = Some(TakeoverAgent {
                    name: message
                        .sender_name
                        .clone()
                        .unwrap_or_else(|| FALLBACK_AGENT_NAME.to_owned()),
                    avatar: message.sender_avatar.clone(),
                });
            }
            state.typing = false;
            state.typing_agent = None;

            if state.widget_open && state.view == View::Messages {
                message.read = true;
                message.read_at = Some(Utc::now());
            }
            state.messages.push(message);
            self.after_mutation_locked(&mut state, true);
        }
        let _ = self.effects.send(WidgetEffect::PlayNotificationSound);
        self.schedule_read_receipts();
    }

    fn handle_update(&self, update: &MessageUpdate) {
        let mut state = self.lock_state();
        let Some(message) = state
            .messages
            .iter_mut()
            .find(|message| message.id == update.id)
        else {
            // An update racing ahead of its insert has nothing to patch.
            debug!("ignoring update for unknown message {}", update.id);
            return;
        };

        if let Some(reactions) = &update.reactions {
            message.reactions = reactions.clone();
        }
        if let Some(read_at) = update.read_at {
            message.read = true;
            message.read_at = Some(read_at);
        }
        self.after_mutation_locked(&mut state, false);
    }

    fn handle_typing(&self, typing: TypingEvent) {
        let mut state = self.lock_state();
        state.typing = typing.active;
        if typing.active {
            if let Some(name) = typing.agent_name {
                state.typing_agent = Some(name);
            }
        }
    }

    async fn handle_status(self: &Arc<Self>, status: ConversationStatus) {
        let (was_takeover, conversation) = {
            let state = self.lock_state();
            (state.takeover, state.active.clone())
        };

        if status.is_takeover() {
            if was_takeover {
                return;
            }
            {
                let mut state = self.lock_state();
                state.takeover = true;
            }
            let Some(conversation) = conversation else {
                return;
            };
            if self
                .session
                .has_takeover_notice_been_shown(&self.config.agent, &conversation)
            {
                return;
            }

            let takeover_agent = match self.backend.fetch_takeover_agent(&conversation).await {
                Ok(agent) => agent,
                Err(err) => {
                    warn!("takeover agent lookup failed: {err}");
                    None
                }
            };
            self.session
                .mark_takeover_notice_shown(&self.config.agent, &conversation);

            let name = takeover_agent
                .as_ref()
                .map_or(FALLBACK_AGENT_NAME, |agent| agent.name.as_str());
            let notice = Message::system_notice(format!("{name} has joined the conversation"));

            let mut state = self.lock_state();
            if state.active.as_ref() == Some(&conversation) {
                if let Some(agent) = takeover_agent {
                    state.takeover_agent = Some(agent);
                }
                state.messages.push(notice);
                self.after_mutation_locked(&mut state, true);
            }
        } else if was_takeover {
            {
                let mut state = self.lock_state();
                state.takeover = false;
                state.takeover_agent = None;
            }
            if let Some(conversation) = conversation {
                self.session
                    .clear_takeover_notice(&self.config.agent, &conversation);
            }
        }
    }

    // ----- read receipts -----

    /// Debounce, then mark unread assistant messages read on the backend.
    /// Re-triggering replaces the pending timer.
    fn schedule_read_receipts(self: &Arc<Self>) {
        {
            let state = self.lock_state();
            let gated = state.widget_open
                && state.view == View::Messages
                && state
                    .active
                    .as_ref()
                    .is_some_and(ConversationId::is_canonical);
            if !gated {
                return;
            }
        }

        let manager = Arc::clone(self);
        let debounce = self.config.read_receipt_debounce;
        let mut task = self.lock_task();
        if let Some(previous) = task.take() {
            previous.abort();
        }
        *task = Some(tokio::spawn(async move {
            tokio::time::sleep(debounce).await;
            manager.flush_read_receipts().await;
        }));
    }

    async fn flush_read_receipts(&self) {
        let conversation = {
            let state = self.lock_state();
            let gated = state.widget_open && state.view == View::Messages;
            match &state.active {
                Some(id) if gated && id.is_canonical() => id.clone(),
                _ => return,
            }
        };

        match self
            .backend
            .mark_messages_read(&conversation, MessageRole::User)
            .await
        {
            Ok(outcome) if outcome.success => {
                let now = Utc::now();
                {
                    let mut state = self.lock_state();
                    if state.active.as_ref() == Some(&conversation) {
                        for message in &mut state.messages {
                            if message.is_unread() {
                                message.read = true;
                                message.read_at = Some(now);
                            }
                        }
                        self.after_mutation_locked(&mut state, false);
                    }
                }
                self.session
                    .set_last_read_at(&self.config.agent, &conversation, now);
                debug!("marked {} messages read for {conversation}", outcome.updated);
            }
            Ok(_) => debug!("backend declined mark-read for {conversation}"),
            Err(err) => warn!("mark-read failed for {conversation}: {err}"),
        }
    }

    // ----- internals -----

    fn lock_state(&self) -> MutexGuard<'_, ManagerState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn lock_task(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        match self.read_receipt_task.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Recompute the conversation-list entry for the active conversation,
    /// persist the whole list, and optionally request a scroll.
    fn after_mutation_locked(&self, state: &mut ManagerState, emit_scroll: bool) {
        let Some(active) = state.active.clone() else {
            return;
        };

        let messages = state.messages.clone();
        if let Some(entry) = state
            .conversations
            .iter_mut()
            .find(|conversation| conversation.id == active)
        {
            entry.messages = messages;
            entry.refresh(self.config.preview_max_chars);
        } else {
            let mut entry = Conversation::new(active);
            if let Some(first) = messages.first() {
                entry.created_at = first.timestamp;
            }
            entry.messages = messages;
            entry.refresh(self.config.preview_max_chars);
            state.conversations.insert(0, entry);
        }

        self.persist_conversations_locked(state);
        if emit_scroll {
            self.emit_scroll_locked(state);
        }
    }

    fn persist_conversations_locked(&self, state: &ManagerState) {
        match serde_json::to_string(&state.conversations) {
            Ok(json) => self
                .storage
                .put(&keys::conversations(&self.config.agent), &json),
            Err(err) => warn!("failed to persist conversation list: {err}"),
        }
    }

    fn emit_scroll_locked(&self, state: &mut ManagerState) {
        if !(state.widget_open && state.view == View::Messages) {
            return;
        }
        let Some(active) = &state.active else {
            return;
        };
        let behavior = if state.scrolled.insert(active.to_string()) {
            ScrollBehavior::Instant
        } else {
            ScrollBehavior::Smooth
        };
        let _ = self.effects.send(WidgetEffect::ScrollToBottom { behavior });
    }

    /// Migrate the old single-flat-message-list storage format into the
    /// multi-conversation format, irreversibly.
    fn migrate_legacy(&self) {
        let key = keys::legacy_messages(&self.config.agent);
        let Some(raw) = self.storage.get(&key) else {
            return;
        };
        self.storage.remove(&key);

        let messages = match serde_json::from_str::<Vec<Message>>(&raw) {
            Ok(messages) => messages,
            Err(err) => {
                warn!("discarding corrupt legacy message store: {err}");
                return;
            }
        };
        if messages.is_empty() {
            return;
        }

        let id = self
            .session
            .active_conversation(&self.config.agent)
            .unwrap_or_else(ConversationId::new_local);

        let mut state = self.lock_state();
        if state
            .conversations
            .iter()
            .any(|conversation| conversation.id == id)
        {
            return;
        }
        let mut entry = Conversation::new(id.clone());
        if let Some(first) = messages.first() {
            entry.created_at = first.timestamp;
        }
        entry.messages = messages;
        entry.refresh(self.config.preview_max_chars);
        state.conversations.insert(0, entry);
        self.persist_conversations_locked(&state);
        info!("migrated legacy message store into conversation {id}");
    }
}

impl Drop for ConversationManager {
    fn drop(&mut self) {
        self.dispose();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::backend::InMemoryBackend;
    use crate::core::ids::AgentKey;
    use crate::storage::MemoryKeyValueStore;
    use serde_json::json;
    use std::time::Duration;

    const CANONICAL: &str = "0a6e7cbe-53c1-4cde-bb5a-1d9d0a9c3f42";

    struct Harness {
        manager: Arc<ConversationManager>,
        storage: Arc<MemoryKeyValueStore>,
        backend: Arc<InMemoryBackend>,
        effects: mpsc::UnboundedReceiver<WidgetEffect>,
    }

    fn harness() -> Harness {
        let storage = Arc::new(MemoryKeyValueStore::new());
        let backend = Arc::new(InMemoryBackend::new());
        let config = WidgetConfig::new(AgentKey::new("agent-1"))
            .with_read_receipt_debounce(Duration::from_millis(10));
        let (manager, effects) = ConversationManager::new(
            config,
            Arc::clone(&storage) as Arc<dyn KeyValueStore>,
            Arc::clone(&backend) as Arc<dyn ConversationBackend>,
        );
        Harness {
            manager: Arc::new(manager),
            storage,
            backend,
            effects,
        }
    }

    fn record(id: &str, role: MessageRole, content: &str) -> MessageRecord {
        MessageRecord {
            id: id.to_owned(),
            role,
            content: content.to_owned(),
            created_at: Utc::now(),
            metadata: None,
        }
    }

    fn human_record(id: &str, content: &str, name: &str) -> MessageRecord {
        MessageRecord {
            metadata: Some(json!({"sender_type": "human", "sender_name": name})),
            ..record(id, MessageRole::Assistant, content)
        }
    }

    #[tokio::test]
    async fn test_history_fetched_exactly_once() {
        let h = harness();
        let id = ConversationId::parse(CANONICAL);
        h.backend.seed_history(
            &id,
            vec![
                record("m-1", MessageRole::User, "hi"),
                record("m-2", MessageRole::Assistant, "hello"),
            ],
        );

        h.manager.activate(id.clone()).await;
        assert_eq!(h.manager.messages().len(), 2);
        assert_eq!(h.backend.fetch_calls(), 1);

        // Re-activation while messages are non-empty must not refetch.
        h.manager.activate(id.clone()).await;
        h.manager.activate(id).await;
        assert_eq!(h.backend.fetch_calls(), 1);
    }

    #[tokio::test]
    async fn test_clear_messages_forces_refetch() {
        let h = harness();
        let id = ConversationId::parse(CANONICAL);
        h.backend
            .seed_history(&id, vec![record("m-1", MessageRole::Assistant, "hello")]);

        h.manager.activate(id.clone()).await;
        h.manager.clear_messages();
        // The persisted list still holds the messages; wipe it so the next
        // activation starts empty.
        {
            let mut state = h.manager.lock_state();
            state.conversations.clear();
        }
        h.manager.activate(id).await;
        assert_eq!(h.backend.fetch_calls(), 2);
    }

    #[tokio::test]
    async fn test_local_id_never_touches_backend() {
        let h = harness();
        h.manager.activate(ConversationId::new_local()).await;
        assert_eq!(h.backend.fetch_calls(), 0);
        assert!(h.manager.messages().is_empty());
    }

    #[tokio::test]
    async fn test_appends_persist_conversation_list() {
        let h = harness();
        let id = ConversationId::new_local();
        h.manager.activate(id.clone()).await;

        h.manager.append_message(Message::visitor("one"));
        h.manager.append_message(Message::assistant("two"));
        h.manager.append_message(Message::assistant("three"));

        let raw = h
            .storage
            .get("veranda_conversations_agent-1")
            .unwrap_or_default();
        let Ok(persisted) = serde_json::from_str::<Vec<Conversation>>(&raw) else {
            panic!("persisted list must parse");
        };
        assert_eq!(persisted.len(), 1);
        assert_eq!(persisted[0].id, id);
        assert_eq!(persisted[0].messages.len(), 3);
        assert_eq!(persisted[0].preview, "three");
    }

    #[tokio::test]
    async fn test_created_at_preserved_across_updates() {
        let h = harness();
        let id = ConversationId::new_local();
        h.manager.activate(id.clone()).await;
        h.manager.append_message(Message::visitor("one"));
        let created_at = h.manager.conversations()[0].created_at;

        h.manager.append_message(Message::assistant("two"));
        let entry = &h.manager.conversations()[0];
        assert_eq!(entry.created_at, created_at);
        assert!(entry.updated_at >= created_at);
    }

    #[tokio::test]
    async fn test_realtime_insert_dedupes_by_id() {
        let h = harness();
        h.manager.activate(ConversationId::parse(CANONICAL)).await;

        let insert = ConversationEvent::MessageInserted(human_record("m-9", "hi there", "Dana"));
        h.manager.handle_event(insert.clone()).await;
        h.manager.handle_event(insert).await;

        assert_eq!(h.manager.messages().len(), 1);
        let agent = h.manager.takeover_agent();
        assert_eq!(agent.map(|agent| agent.name), Some("Dana".to_owned()));
    }

    #[tokio::test]
    async fn test_insert_clears_typing_indicator() {
        let h = harness();
        h.manager.activate(ConversationId::parse(CANONICAL)).await;
        h.manager
            .handle_event(ConversationEvent::Typing(TypingEvent {
                active: true,
                agent_name: Some("Dana".to_owned()),
            }))
            .await;
        assert!(h.manager.is_typing());
        assert_eq!(h.manager.typing_agent().as_deref(), Some("Dana"));

        h.manager
            .handle_event(ConversationEvent::MessageInserted(human_record(
                "m-1", "hello", "Dana",
            )))
            .await;
        assert!(!h.manager.is_typing());
    }

    #[tokio::test]
    async fn test_update_for_unknown_id_is_noop() {
        let h = harness();
        h.manager.activate(ConversationId::parse(CANONICAL)).await;
        h.manager
            .handle_event(ConversationEvent::MessageInserted(human_record(
                "m-1", "hello", "Dana",
            )))
            .await;
        let before = h.manager.messages();

        h.manager
            .handle_event(ConversationEvent::MessageUpdated(MessageUpdate {
                id: "missing".to_owned(),
                reactions: Some(vec![crate::conversation::message::Reaction {
                    emoji: "👍".to_owned(),
                    reactor_ids: vec!["v-1".to_owned()],
                }]),
                read_at: Some(Utc::now()),
            }))
            .await;

        assert_eq!(h.manager.messages(), before);
    }

    #[tokio::test]
    async fn test_update_patches_reactions_and_read_at_only() {
        let h = harness();
        h.manager.activate(ConversationId::parse(CANONICAL)).await;
        h.manager
            .handle_event(ConversationEvent::MessageInserted(human_record(
                "m-1", "hello", "Dana",
            )))
            .await;

        let read_at = Utc::now();
        h.manager
            .handle_event(ConversationEvent::MessageUpdated(MessageUpdate {
                id: "m-1".to_owned(),
                reactions: Some(vec![crate::conversation::message::Reaction {
                    emoji: "🎉".to_owned(),
                    reactor_ids: vec!["v-1".to_owned()],
                }]),
                read_at: Some(read_at),
            }))
            .await;

        let messages = h.manager.messages();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].content, "hello");
        assert_eq!(messages[0].reactions.len(), 1);
        assert_eq!(messages[0].read_at, Some(read_at));
        assert!(messages[0].read);
    }

    #[tokio::test]
    async fn test_takeover_notice_shown_exactly_once_per_episode() {
        let h = harness();
        let id = ConversationId::parse(CANONICAL);
        h.backend.set_takeover_agent(Some(TakeoverAgent {
            name: "Dana".to_owned(),
            avatar: None,
        }));
        h.manager.activate(id).await;

        let takeover = ConversationEvent::StatusChanged(ConversationStatus::HumanTakeover);
        h.manager.handle_event(takeover.clone()).await;
        h.manager.handle_event(takeover.clone()).await;

        let notices: Vec<_> = h
            .manager
            .messages()
            .into_iter()
            .filter(|message| message.is_system_notice)
            .collect();
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].content, "Dana has joined the conversation");
        assert!(h.manager.takeover_active());

        // Leaving takeover resets the marker; the next episode notifies again.
        h.manager
            .handle_event(ConversationEvent::StatusChanged(ConversationStatus::Active))
            .await;
        assert!(!h.manager.takeover_active());
        h.manager.handle_event(takeover).await;
        let notices = h
            .manager
            .messages()
            .into_iter()
            .filter(|message| message.is_system_notice)
            .count();
        assert_eq!(notices, 2);
    }

    #[tokio::test]
    async fn test_read_receipts_flush_after_debounce() {
        let h = harness();
        let id = ConversationId::parse(CANONICAL);
        h.backend
            .seed_history(&id, vec![record("m-1", MessageRole::Assistant, "hello")]);

        h.manager.set_widget_open(true);
        h.manager.set_view(View::Messages);
        h.manager.activate(id).await;
        assert!(!h.manager.messages()[0].read);

        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(h.backend.mark_read_calls(), 1);
        assert!(h.manager.messages()[0].read);
    }

    #[tokio::test]
    async fn test_read_receipts_skip_local_ids() {
        let h = harness();
        h.manager.set_widget_open(true);
        h.manager.set_view(View::Messages);
        h.manager.activate(ConversationId::new_local()).await;
        h.manager.append_message(Message::assistant("hello"));

        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(h.backend.mark_read_calls(), 0);
    }

    #[tokio::test]
    async fn test_scroll_instant_then_smooth() {
        let mut h = harness();
        h.manager.set_widget_open(true);
        h.manager.set_view(View::Messages);
        h.manager.activate(ConversationId::new_local()).await;

        h.manager.append_message(Message::visitor("one"));
        h.manager.append_message(Message::assistant("two"));

        let mut scrolls = Vec::new();
        while let Ok(effect) = h.effects.try_recv() {
            if let WidgetEffect::ScrollToBottom { behavior } = effect {
                scrolls.push(behavior);
            }
        }
        assert_eq!(scrolls[0], ScrollBehavior::Instant);
        assert!(scrolls[1..]
            .iter()
            .all(|behavior| *behavior == ScrollBehavior::Smooth));
    }

    #[tokio::test]
    async fn test_legacy_migration_is_one_way() {
        let h = harness();
        let legacy = vec![Message::visitor("old one"), Message::assistant("old two")];
        let json = serde_json::to_string(&legacy).unwrap_or_default();
        h.storage.put("veranda_messages_agent-1", &json);

        h.manager.restore().await;
        assert_eq!(h.storage.get("veranda_messages_agent-1"), None);
        let conversations = h.manager.conversations();
        assert_eq!(conversations.len(), 1);
        assert_eq!(conversations[0].messages.len(), 2);
        assert_eq!(conversations[0].preview, "old two");

        // A second restore must not resurrect or duplicate the legacy data.
        h.manager.restore().await;
        assert_eq!(h.manager.conversations().len(), 1);
    }

    #[tokio::test]
    async fn test_corrupt_legacy_store_is_discarded() {
        let h = harness();
        h.storage.put("veranda_messages_agent-1", "{corrupt");
        h.manager.restore().await;
        assert_eq!(h.storage.get("veranda_messages_agent-1"), None);
        assert!(h.manager.conversations().is_empty());
    }

    #[tokio::test]
    async fn test_returning_visitor_resumes_conversation() {
        let h = harness();
        let id = ConversationId::parse(CANONICAL);
        h.backend
            .seed_history(&id, vec![record("m-1", MessageRole::Assistant, "welcome back")]);
        h.storage.put("veranda_active_conversation_agent-1", CANONICAL);

        h.manager.restore().await;
        assert_eq!(h.manager.active_conversation(), Some(id));
        assert_eq!(h.manager.messages().len(), 1);
        assert_eq!(h.backend.fetch_calls(), 1);
    }

    #[tokio::test]
    async fn test_promote_conversation_replaces_local_id() {
        let h = harness();
        let local = ConversationId::new_local();
        h.manager.activate(local.clone()).await;
        h.manager.append_message(Message::visitor("hi"));

        let canonical = ConversationId::parse(CANONICAL);
        assert!(h.manager.promote_conversation(canonical.clone()).is_ok());
        assert_eq!(h.manager.active_conversation(), Some(canonical.clone()));
        assert_eq!(h.manager.conversations()[0].id, canonical);
        assert_eq!(
            h.storage.get("veranda_active_conversation_agent-1"),
            Some(CANONICAL.to_owned())
        );

        // Promoting to a local id is refused.
        assert!(h
            .manager
            .promote_conversation(ConversationId::new_local())
            .is_err());
    }
}
