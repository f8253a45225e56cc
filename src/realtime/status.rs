//! Conversation-status stream adapter.

use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;
use tracing::debug;

use crate::core::ids::ConversationId;
use crate::realtime::events::ConversationEvent;
use crate::realtime::transport::{ChannelHandle, RealtimeTransport};

/// Forwards status changes as [`ConversationEvent::StatusChanged`].
///
/// Takeover-episode semantics (notice once per episode, reset on leaving)
/// live in the conversation manager; this adapter only normalizes.
pub struct StatusStreamAdapter {
    transport: Arc<dyn RealtimeTransport>,
    events: mpsc::UnboundedSender<ConversationEvent>,
    handle: Mutex<Option<ChannelHandle>>,
}

impl StatusStreamAdapter {
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

    /// Subscribe to a conversation's status stream, replacing any previous
    /// subscription. Local placeholder ids are a no-op.
    pub fn attach(&self, conversation: &ConversationId) {
        self.detach();
        if !conversation.is_canonical() {
            debug!("skipping status stream for non-canonical id {conversation}");
            return;
        }

        let events = self.events.clone();
        let handle = self.transport.subscribe_status(
            conversation,
            Box::new(move |status| {
                let _ = events.send(ConversationEvent::StatusChanged(status));
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

impl Drop for StatusStreamAdapter {
    fn drop(&mut self) {
        self.detach();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::realtime::events::ConversationStatus;
    use crate::realtime::transport::InMemoryTransport;

    #[tokio::test]
    async fn test_status_changes_are_forwarded() {
        let transport = Arc::new(InMemoryTransport::new());
        let (tx, mut rx) = mpsc::unbounded_channel();
        let adapter = StatusStreamAdapter::new(Arc::clone(&transport) as _, tx);
        let conversation = ConversationId::parse("0a6e7cbe-53c1-4cde-bb5a-1d9d0a9c3f42");
        adapter.attach(&conversation);

        transport.emit_status(&conversation, ConversationStatus::HumanTakeover);
        assert!(matches!(
            rx.try_recv(),
            Ok(ConversationEvent::StatusChanged(ConversationStatus::HumanTakeover))
        ));
    }

    #[tokio::test]
    async fn test_detach_on_drop() {
        let transport = Arc::new(InMemoryTransport::new());
        let (tx, _rx) = mpsc::unbounded_channel();
        {
            let adapter = StatusStreamAdapter::new(Arc::clone(&transport) as _, tx);
            adapter.attach(&ConversationId::parse(
                "0a6e7cbe-53c1-4cde-bb5a-1d9d0a9c3f42",
            ));
            assert_eq!(transport.live_subscriptions(), 1);
        }
        assert_eq!(transport.live_subscriptions(), 0);
    }
}
