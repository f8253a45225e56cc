//! Message stream adapter.

use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;
use tracing::debug;

use crate::conversation::message::{MessageMetadata, MessageRole};
use crate::core::ids::ConversationId;
use crate::realtime::events::ConversationEvent;
use crate::realtime::transport::{ChannelHandle, RealtimeTransport};

/// Normalizes message inserts/updates into [`ConversationEvent`]s.
///
/// AI-authored inserts are dropped here: the local send path already
/// appended them optimistically, so only human-authored rows flow through.
/// Updates forward untouched; the manager patches `reactions`/`read_at` by
/// id and ignores unknown ids.
pub struct MessageStreamAdapter {
    transport: Arc<dyn RealtimeTransport>,
    events: mpsc::UnboundedSender<ConversationEvent>,
    handle: Mutex<Option<ChannelHandle>>,
}

impl MessageStreamAdapter {
    /// Create a detached adapter.
    #[must_use]
    pub fn new(
        transport: Arc<dyn RealtimeTransport>,
        events: mpsc::UnboundedSender<ConversationEvent>,
    ) -> Self {
        Self {
            transport,
            events,
            handle: Mutex::new(None),
        }
    }

    /// Subscribe to a conversation's message stream, replacing any previous
    /// subscription. Local placeholder ids are a no-op: at most one live
    /// subscription exists at any time, and only for canonical ids.
    pub fn attach(&self, conversation: &ConversationId) {
        self.detach();
        if !conversation.is_canonical() {
            debug!("skipping message stream for non-canonical id {conversation}");
            return;
        }

        let insert_events = self.events.clone();
        let update_events = self.events.clone();
        let handle = self.transport.subscribe_messages(
            conversation,
            Box::new(move |record| {
                let metadata = MessageMetadata::from_value(record.metadata.as_ref());
                if record.role == MessageRole::Assistant && !metadata.is_human_sender() {
                    // AI replies are already on the timeline via the send path.
                    return;
                }
                let _ = insert_events.send(ConversationEvent::MessageInserted(record));
            }),
            Box::new(move |update| {
                let _ = update_events.send(ConversationEvent::MessageUpdated(update));
            }),
        );
        *self.lock_handle() = Some(handle);
    }

    /// Tear down the live subscription, if any.
    pub fn detach(&self) {
        if let Some(handle) = self.lock_handle().take() {
            self.transport.unsubscribe(handle);
        }
    }

    /// Whether a subscription is currently live.
    #[must_use]
    pub fn is_attached(&self) -> bool {
        self.lock_handle().is_some()
    }

    fn lock_handle(&self) -> std::sync::MutexGuard<'_, Option<ChannelHandle>> {
        match self.handle.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl Drop for MessageStreamAdapter {
    fn drop(&mut self) {
        self.detach();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::message::MessageRecord;
    use crate::realtime::transport::InMemoryTransport;
    use chrono::Utc;
    use serde_json::json;

    fn canonical() -> ConversationId {
        ConversationId::parse("0a6e7cbe-53c1-4cde-bb5a-1d9d0a9c3f42")
    }

    fn record(id: &str, metadata: Option<serde_json::Value>) -> MessageRecord {
        MessageRecord {
            id: id.to_owned(),
            role: MessageRole::Assistant,
            content: "hello".to_owned(),
            created_at: Utc::now(),
            metadata,
        }
    }

    #[tokio::test]
    async fn test_ai_inserts_are_dropped() {
        let transport = Arc::new(InMemoryTransport::new());
        let (tx, mut rx) = mpsc::unbounded_channel();
        let adapter = MessageStreamAdapter::new(Arc::clone(&transport) as _, tx);
        let conversation = canonical();
        adapter.attach(&conversation);

        transport.emit_insert(&conversation, &record("m-ai", None));
        assert!(rx.try_recv().is_err());

        transport.emit_insert(
            &conversation,
            &record("m-human", Some(json!({"sender_type": "human"}))),
        );
        assert!(matches!(
            rx.try_recv(),
            Ok(ConversationEvent::MessageInserted(received)) if received.id == "m-human"
        ));
    }

    #[tokio::test]
    async fn test_reattach_keeps_single_subscription() {
        let transport = Arc::new(InMemoryTransport::new());
        let (tx, _rx) = mpsc::unbounded_channel();
        let adapter = MessageStreamAdapter::new(Arc::clone(&transport) as _, tx);

        adapter.attach(&canonical());
        adapter.attach(&canonical());
        assert_eq!(transport.live_subscriptions(), 1);

        adapter.detach();
        assert_eq!(transport.live_subscriptions(), 0);
        assert!(!adapter.is_attached());
    }

    #[tokio::test]
    async fn test_local_id_is_noop() {
        let transport = Arc::new(InMemoryTransport::new());
        let (tx, _rx) = mpsc::unbounded_channel();
        let adapter = MessageStreamAdapter::new(Arc::clone(&transport) as _, tx);

        adapter.attach(&ConversationId::new_local());
        assert_eq!(transport.live_subscriptions(), 0);
        assert!(!adapter.is_attached());
    }
}
